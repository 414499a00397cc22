//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of mail-backup.
//
// mail-backup is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// mail-backup is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// mail-backup. If not, see <http://www.gnu.org/licenses/>.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::backup::session::SessionCounters;

#[derive(Error, Debug)]
pub enum Error {
    /// The configuration is unusable. Raised before any I/O happens.
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Path pattern '{pattern}' references unknown attribute '{name}'")]
    UnknownAttribute { pattern: String, name: String },
    #[error("Path pattern '{pattern}' is malformed: {reason}")]
    MalformedPattern {
        pattern: String,
        reason: &'static str,
    },
    #[error("IMAP: {0}")]
    Transport(#[from] imap::error::Error),
    #[error("{0}")]
    Connect(String),
    #[error(transparent)]
    Tls(#[from] openssl::error::ErrorStack),
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(openssl::ssl::Error),
    #[error("{}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A fatal error which terminated a backup session, along with the counts
/// that had been accumulated up to that point.
#[derive(Error, Debug)]
#[error("{cause} ({counters} before the failure)")]
pub struct SessionError {
    pub counters: SessionCounters,
    /// The folder being processed when the error occurred, if any.
    pub folder: Option<String>,
    #[source]
    pub cause: Error,
}

pub trait FsContext {
    type Coerced;

    /// Convert an I/O error into `Error::Filesystem` naming `path`.
    fn on_path(self, path: impl AsRef<Path>) -> Self::Coerced;
}

impl<R> FsContext for Result<R, io::Error> {
    type Coerced = Result<R, Error>;

    fn on_path(self, path: impl AsRef<Path>) -> Result<R, Error> {
        self.map_err(|source| Error::Filesystem {
            path: path.as_ref().to_owned(),
            source,
        })
    }
}

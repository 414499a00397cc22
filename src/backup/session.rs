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

use std::fmt;
use std::path::Path;

use chrono::prelude::*;
use log::info;

use super::folder_config::FolderConfig;
use super::folder_sync::{FolderOutcome, FolderSync};
use super::transport::Transport;
use crate::support::error::SessionError;
use crate::support::shutdown::Cancellation;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionCounters {
    /// Messages looked at.
    pub found: usize,
    /// Messages written to disk.
    pub saved: usize,
    /// Messages already backed up, or left alone by policy.
    pub skipped: usize,
}

impl fmt::Display for SessionCounters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} of {} saved; {} skipped",
            self.saved, self.found, self.skipped
        )
    }
}

/// Back up `folders`, in order, over `transport`.
///
/// Relative folder paths are placed beneath `pivot`. The session stops early,
/// but successfully, once `cancellation` is observed. Any other problem ends
/// the session with an error carrying the counts gathered so far.
pub fn run_session(
    transport: &mut dyn Transport,
    folders: &[FolderConfig],
    pivot: &Path,
    cancellation: &Cancellation,
) -> Result<SessionCounters, SessionError> {
    run_session_on(
        transport,
        folders,
        pivot,
        cancellation,
        Local::now().naive_local().date(),
    )
}

fn run_session_on(
    transport: &mut dyn Transport,
    folders: &[FolderConfig],
    pivot: &Path,
    cancellation: &Cancellation,
    today: NaiveDate,
) -> Result<SessionCounters, SessionError> {
    let remote_folders =
        transport.list_folders().map_err(|cause| SessionError {
            counters: SessionCounters::default(),
            folder: None,
            cause,
        })?;
    info!("found mail folders: {}", remote_folders.join(", "));

    let mut sync = FolderSync::new(pivot, cancellation, today);
    for folder in folders {
        if cancellation.is_cancelled() {
            break;
        }

        match sync.sync(transport, folder, &remote_folders) {
            Ok(FolderOutcome::Done) | Ok(FolderOutcome::Missing) => (),
            Ok(FolderOutcome::Aborted) => break,
            Err(cause) => {
                return Err(SessionError {
                    counters: sync.counters(),
                    folder: Some(folder.name.clone()),
                    cause,
                })
            }
        }
    }

    let counters = sync.counters();
    if cancellation.is_cancelled() {
        info!("shutdown requested; {}.", counters);
    } else {
        info!("{}.", counters);
    }
    Ok(counters)
}

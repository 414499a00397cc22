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

use std::path::Path;

use log::{error, info};

use crate::backup::folder_config::FolderConfig;
use crate::backup::session::run_session;
use crate::remote::ImapTransport;
use crate::support::shutdown;
use crate::support::sysexits::*;
use crate::support::system_config::ImapConfig;

pub(super) fn backup(
    imap: &ImapConfig,
    password: &str,
    trace: bool,
    folders: &[FolderConfig],
    pivot: &Path,
) {
    let cancellation = match shutdown::install_signal_handlers() {
        Ok(cancellation) => cancellation,
        Err(e) => {
            error!("Failed to install signal handlers: {}", e);
            EX_OSERR.exit()
        }
    };

    info!(
        "Backing up {} folder(s) from {}",
        folders.len(),
        imap.host_info()
    );

    let mut transport = match ImapTransport::connect(imap, password, trace) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to connect to {}: {}", imap.host_info(), e);
            Sysexit::from(&e).exit()
        }
    };

    let result = run_session(&mut transport, folders, pivot, &cancellation);
    // Log out before exiting, which skips destructors
    drop(transport);

    match result {
        Ok(counters) if cancellation.is_cancelled() => {
            info!("aborted: {}", counters)
        }
        Ok(counters) => info!("success: {}", counters),
        Err(e) => {
            match e.folder {
                Some(ref folder) => {
                    error!("folder '{}' - failed: {}", folder, e)
                }
                None => error!("failed: {}", e),
            }
            Sysexit::from(&e.cause).exit()
        }
    }
}

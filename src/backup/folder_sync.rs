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

//! Backing up a single remote folder.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::attributes::AttributeSet;
use super::collision::{self, Decision};
use super::folder_config::FolderConfig;
use super::message::MessageRecord;
use super::path_pattern::join_with_base;
use super::session::SessionCounters;
use super::transport::Transport;
use crate::support::error::{Error, FsContext};
use crate::support::file_ops::{self, IgnoreKinds};
use crate::support::shutdown::Cancellation;

/// How the processing of one folder ended, if it didn't fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderOutcome {
    /// Every message was looked at.
    Done,
    /// The folder does not exist on the server.
    Missing,
    /// Cancellation was requested before all messages were looked at.
    Aborted,
}

/// Backs up folders into files beneath a base directory.
///
/// Counts accumulate across calls to `sync`, so one `FolderSync` carries the
/// totals of a whole session, including a folder that failed part-way.
pub struct FolderSync<'a> {
    pivot: &'a Path,
    cancellation: &'a Cancellation,
    today: NaiveDate,
    counters: SessionCounters,
}

impl<'a> FolderSync<'a> {
    pub fn new(
        pivot: &'a Path,
        cancellation: &'a Cancellation,
        today: NaiveDate,
    ) -> Self {
        FolderSync {
            pivot,
            cancellation,
            today,
            counters: SessionCounters::default(),
        }
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Back up every message of `folder` not already saved.
    ///
    /// `remote_folders` is the list of folders which exist on the server.
    pub fn sync(
        &mut self,
        transport: &mut dyn Transport,
        folder: &FolderConfig,
        remote_folders: &[String],
    ) -> Result<FolderOutcome, Error> {
        let log_prefix = format!("folder '{}' - ", folder.name);

        if !remote_folders.iter().any(|f| *f == folder.name) {
            warn!("{}does not exist on the server, skipped.", log_prefix);
            return Ok(FolderOutcome::Missing);
        }

        transport.select_folder(&folder.name)?;

        let since = folder.since_date(self.today);
        match since {
            Some(since) => info!(
                "{}backing up messages since {}.",
                log_prefix,
                since.format("%Y-%m-%d")
            ),
            None => info!("{}backing up all messages.", log_prefix),
        }

        let start = self.counters;
        let mut messages = transport.fetch_messages(since)?;
        loop {
            // Checked before the next fetch so nothing is downloaded in vain
            if self.cancellation.is_cancelled() {
                info!("{}shutdown requested, stopping.", log_prefix);
                return Ok(FolderOutcome::Aborted);
            }

            let message = match messages.next() {
                Some(message) => message?,
                None => break,
            };
            self.counters.found += 1;
            self.save(folder, message, &log_prefix)?;
        }

        info!(
            "{}{} of {} saved; {} skipped.",
            log_prefix,
            self.counters.saved - start.saved,
            self.counters.found - start.found,
            self.counters.skipped - start.skipped
        );
        Ok(FolderOutcome::Done)
    }

    fn save(
        &mut self,
        folder: &FolderConfig,
        message: MessageRecord,
        log_prefix: &str,
    ) -> Result<(), Error> {
        let attributes = AttributeSet::extract(&message);
        let rendered = folder.pattern.render(&attributes);
        let joined = join_with_base(self.pivot, &rendered);
        let target = file_ops::resolve_real_path(&joined).on_path(&joined)?;

        let decision = collision::resolve(
            &target,
            &message.content,
            folder.policy,
            log_prefix,
        )
        .on_path(&target)?;

        let path = match decision {
            Decision::Skip => {
                self.counters.skipped += 1;
                return Ok(());
            }
            Decision::WriteAt(path) => {
                create_parent(&path)?;
                path
            }
            Decision::RemoveThenWriteAt(path) => {
                create_parent(&path)?;
                info!("{}remove former mail ({}).", log_prefix, path.display());
                fs::remove_file(&path).ignore_not_found().on_path(&path)?;
                path
            }
        };

        file_ops::spit(&path, false, 0o644, &message.content)
            .on_path(&path)?;
        self.counters.saved += 1;
        debug!(
            "{}saved UID {} as {}.",
            log_prefix,
            message.uid,
            path.display()
        );
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).on_path(parent),
        None => Ok(()),
    }
}

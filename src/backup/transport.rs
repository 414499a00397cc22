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

use chrono::NaiveDate;

use super::message::MessageRecord;
use crate::support::error::Error;

/// A lazily-evaluated sequence of messages from the selected folder.
pub type MessageIter<'a> =
    Box<dyn Iterator<Item = Result<MessageRecord, Error>> + 'a>;

/// Read-only access to a remote mail store.
///
/// The session owns exactly one of these for its whole lifetime.
pub trait Transport {
    /// Return the names of all folders on the server.
    fn list_folders(&mut self) -> Result<Vec<String>, Error>;

    /// Make `name` the folder that `fetch_messages` reads from.
    fn select_folder(&mut self, name: &str) -> Result<(), Error>;

    /// Iterate the messages of the selected folder, optionally only those
    /// dated on or after `since`.
    ///
    /// Each message is fetched when the iterator is advanced, so a failure
    /// part-way through shows up as an `Err` item.
    fn fetch_messages(
        &mut self,
        since: Option<NaiveDate>,
    ) -> Result<MessageIter<'_>, Error>;
}

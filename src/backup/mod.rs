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

//! The backup engine.
//!
//! Messages are read through a `Transport`, named by rendering a folder's
//! path pattern with the message's attributes, and written beneath the
//! configured base directory unless an identical copy is already there.

pub mod attributes;
pub mod collision;
pub mod folder_config;
pub mod folder_sync;
pub mod message;
pub mod path_pattern;
pub mod session;
pub mod transport;

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

use chrono::prelude::*;

use super::collision::CollisionPolicy;
use super::path_pattern::PathPattern;
use crate::support::error::Error;
use crate::support::system_config::RawFolderConfig;

/// A validated `[[folders]]` entry.
#[derive(Clone, Debug)]
pub struct FolderConfig {
    pub name: String,
    pub pattern: PathPattern,
    /// Only messages from this many days back are fetched. `None` means all.
    pub last_days: Option<u32>,
    pub policy: CollisionPolicy,
}

impl FolderConfig {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, Error> {
        Ok(FolderConfig {
            name: name.into(),
            pattern: PathPattern::parse(pattern)?,
            last_days: None,
            policy: CollisionPolicy::default(),
        })
    }

    /// The earliest date to fetch, or `None` to fetch everything.
    pub fn since_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        let days = chrono::Duration::days(self.last_days?.into());
        today.checked_sub_signed(days)
    }
}

/// Validate all the raw folder entries.
///
/// Every problem is collected, so the user sees the full list of things to
/// fix rather than one at a time.
pub fn parse_folder_configs(
    raw: &[RawFolderConfig],
) -> Result<Vec<FolderConfig>, Error> {
    if raw.is_empty() {
        return Err(Error::Config("no [[folders]] configured".to_owned()));
    }

    let mut problems = Vec::<String>::new();
    let mut ret = Vec::with_capacity(raw.len());

    for (ix, entry) in raw.iter().enumerate() {
        let label = match entry.name {
            Some(ref name) if !name.trim().is_empty() => {
                format!("folder #{} ('{}')", ix + 1, name)
            }
            _ => format!("folder #{}", ix + 1),
        };

        match parse_one(entry) {
            Ok(config) => ret.push(config),
            Err(mut errs) => {
                problems.extend(
                    errs.drain(..).map(|e| format!("{}: {}", label, e)),
                );
            }
        }
    }

    if problems.is_empty() {
        Ok(ret)
    } else {
        Err(Error::Config(problems.join("; ")))
    }
}

fn parse_one(raw: &RawFolderConfig) -> Result<FolderConfig, Vec<String>> {
    let mut errs = Vec::new();

    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if name.is_none() {
        errs.push("missing or empty 'name'".to_owned());
    }

    let pattern = match raw.path.as_deref().filter(|s| !s.trim().is_empty()) {
        None => {
            errs.push("missing or empty 'path'".to_owned());
            None
        }
        Some(path) => match PathPattern::parse(path) {
            Ok(p) => Some(p),
            Err(e) => {
                errs.push(e.to_string());
                None
            }
        },
    };

    let policy = match raw.when_exists.as_deref() {
        None => CollisionPolicy::default(),
        Some(s) => s.parse::<CollisionPolicy>().unwrap_or_else(|()| {
            errs.push(format!(
                "unknown 'when_exists' value '{}' \
                 (expected compare, overwrite, or skip)",
                s
            ));
            CollisionPolicy::default()
        }),
    };

    // Zero or negative means no limit
    let last_days = raw
        .last_days
        .filter(|&d| d > 0)
        .map(|d| d.min(i64::from(u32::MAX)) as u32);

    match (name, pattern) {
        (Some(name), Some(pattern)) if errs.is_empty() => Ok(FolderConfig {
            name: name.to_owned(),
            pattern,
            last_days,
            policy,
        }),
        _ => Err(errs),
    }
}

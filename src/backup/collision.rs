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

//! Deciding what to do when the rendered path of a message is already taken.
//!
//! Two different messages can easily render to the same name (same minute,
//! same truncated subject), and the same message is seen again on every run.
//! The byte content is what tells these cases apart: a file with identical
//! content means the message is already backed up, anything else means a
//! different message owns that name and we need another slot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};

/// How many slots, including the original path, are probed before giving up.
pub const MAX_SLOT_ATTEMPTS: u32 = 5;

/// What to do when a file already exists at the rendered path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Compare content; skip if identical, otherwise find a free `.N` slot.
    Compare,
    /// Replace the existing file.
    Overwrite,
    /// Leave the existing file alone and don't save the message.
    Skip,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Compare
    }
}

impl FromStr for CollisionPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("compare") {
            Ok(CollisionPolicy::Compare)
        } else if s.eq_ignore_ascii_case("overwrite") {
            Ok(CollisionPolicy::Overwrite)
        } else if s.eq_ignore_ascii_case("skip") {
            Ok(CollisionPolicy::Skip)
        } else {
            Err(())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    WriteAt(PathBuf),
    RemoveThenWriteAt(PathBuf),
    Skip,
}

pub fn resolve(
    target: &Path,
    content: &[u8],
    policy: CollisionPolicy,
    log_prefix: &str,
) -> io::Result<Decision> {
    if !target.is_file() {
        return Ok(Decision::WriteAt(target.to_owned()));
    }

    Ok(match policy {
        CollisionPolicy::Overwrite => {
            Decision::RemoveThenWriteAt(target.to_owned())
        }
        CollisionPolicy::Skip => {
            debug!("{}skip existing file ({}).", log_prefix, target.display());
            Decision::Skip
        }
        CollisionPolicy::Compare => {
            match find_slot(target, content, log_prefix)? {
                Some(slot) => Decision::WriteAt(slot),
                None => Decision::Skip,
            }
        }
    })
}

/// Find where `content` should be written, starting at `target`.
///
/// Returns the first candidate slot that is free, or `None` if `content` is
/// already present in one of the slots before it, or if every slot is taken
/// by something else.
pub fn find_slot(
    target: &Path,
    content: &[u8],
    log_prefix: &str,
) -> io::Result<Option<PathBuf>> {
    for attempt in 0..MAX_SLOT_ATTEMPTS {
        let candidate = slot_path(target, attempt);
        if !candidate.is_file() {
            return Ok(Some(candidate));
        }

        if fs::read(&candidate)? == content {
            if 0 == attempt {
                debug!(
                    "{}skip existing mail ({}).",
                    log_prefix,
                    target.display()
                );
            } else {
                debug!(
                    "{}skip existing mail (expected: {}, found as: {}).",
                    log_prefix,
                    target.display(),
                    candidate.display()
                );
            }
            return Ok(None);
        }
    }

    warn!(
        "{}cannot find other path for existing mail ({}). \
         {} attempts exceeded!",
        log_prefix,
        target.display(),
        MAX_SLOT_ATTEMPTS
    );
    Ok(None)
}

/// The path of slot `attempt`: the target itself for 0, otherwise
/// `name.N.ext` with N = attempt + 1.
pub fn slot_path(target: &Path, attempt: u32) -> PathBuf {
    if 0 == attempt {
        return target.to_owned();
    }

    let mut name = target.file_stem().unwrap_or_default().to_owned();
    name.push(format!(".{}", attempt + 1));
    if let Some(extension) = target.extension() {
        name.push(".");
        name.push(extension);
    }

    target.with_file_name(name)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_slot_path() {
        assert_eq!(
            PathBuf::from("/a/orig.eml"),
            slot_path(Path::new("/a/orig.eml"), 0)
        );
        assert_eq!(
            PathBuf::from("/a/orig.2.eml"),
            slot_path(Path::new("/a/orig.eml"), 1)
        );
        assert_eq!(
            PathBuf::from("/a/orig.5.no-eml"),
            slot_path(Path::new("/a/orig.no-eml"), 4)
        );
        assert_eq!(
            PathBuf::from("/a/archive.tar.3.gz"),
            slot_path(Path::new("/a/archive.tar.gz"), 2)
        );
        assert_eq!(
            PathBuf::from("/a/noext.2"),
            slot_path(Path::new("/a/noext"), 1)
        );
        assert_eq!(
            PathBuf::from("/a/.hidden.2"),
            slot_path(Path::new("/a/.hidden"), 1)
        );
    }

    #[test]
    fn identical_content_is_skipped() {
        let root = TempDir::new().unwrap();
        let orig = root.path().join("orig.no-eml");
        fs::write(&orig, b"\x00\x11\x0F").unwrap();

        assert_eq!(None, find_slot(&orig, b"\x00\x11\x0F", "").unwrap());
    }

    #[test]
    fn different_content_gets_next_slot() {
        let root = TempDir::new().unwrap();
        let orig = root.path().join("orig.no-eml");
        fs::write(&orig, b"\x00\x11\x11\x11\x0F").unwrap();

        let expected = root.path().join("orig.2.no-eml");
        assert_eq!(
            Some(expected.clone()),
            find_slot(&orig, b"\x00\x11\x0F", "").unwrap()
        );
        assert!(!expected.is_file());
    }

    #[test]
    fn match_in_later_slot_is_skipped() {
        let root = TempDir::new().unwrap();
        let orig = root.path().join("orig.eml");
        fs::write(&orig, b"a").unwrap();
        fs::write(root.path().join("orig.2.eml"), b"b").unwrap();
        fs::write(root.path().join("orig.3.eml"), b"c").unwrap();

        assert_eq!(None, find_slot(&orig, b"c", "").unwrap());
        assert_eq!(
            Some(root.path().join("orig.4.eml")),
            find_slot(&orig, b"d", "").unwrap()
        );
    }

    #[test]
    fn exhausted_slots_give_up() {
        let root = TempDir::new().unwrap();
        let orig = root.path().join("orig.eml");
        for attempt in 0..MAX_SLOT_ATTEMPTS {
            fs::write(slot_path(&orig, attempt), format!("{}", attempt))
                .unwrap();
        }

        assert_eq!(None, find_slot(&orig, b"new", "").unwrap());
        assert!(!root.path().join("orig.6.eml").exists());
    }

    #[test]
    fn resolve_by_policy() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("x.eml");

        for &policy in &[
            CollisionPolicy::Compare,
            CollisionPolicy::Overwrite,
            CollisionPolicy::Skip,
        ] {
            assert_eq!(
                Decision::WriteAt(target.clone()),
                resolve(&target, b"new", policy, "").unwrap()
            );
        }

        fs::write(&target, b"old").unwrap();
        assert_eq!(
            Decision::RemoveThenWriteAt(target.clone()),
            resolve(&target, b"new", CollisionPolicy::Overwrite, "").unwrap()
        );
        assert_eq!(
            Decision::Skip,
            resolve(&target, b"new", CollisionPolicy::Skip, "").unwrap()
        );
        assert_eq!(
            Decision::WriteAt(root.path().join("x.2.eml")),
            resolve(&target, b"new", CollisionPolicy::Compare, "").unwrap()
        );
        assert_eq!(
            Decision::Skip,
            resolve(&target, b"old", CollisionPolicy::Compare, "").unwrap()
        );
    }

    #[test]
    fn parse_policy() {
        assert_eq!(Ok(CollisionPolicy::Compare), "compare".parse());
        assert_eq!(Ok(CollisionPolicy::Overwrite), " OverWrite ".parse());
        assert_eq!(Ok(CollisionPolicy::Skip), "skip".parse());
        assert_eq!(Err(()), "replace".parse::<CollisionPolicy>());
        assert_eq!(CollisionPolicy::Compare, CollisionPolicy::default());
    }

    proptest! {
        #[test]
        fn slot_is_free_or_content_present(
            existing in prop::collection::vec(0u8..4, 0..6),
            content in 0u8..4,
        ) {
            let root = TempDir::new().unwrap();
            let orig = root.path().join("m.eml");
            for (attempt, &byte) in existing.iter().enumerate() {
                fs::write(slot_path(&orig, attempt as u32), [byte]).unwrap();
            }

            match find_slot(&orig, &[content], "").unwrap() {
                Some(slot) => prop_assert!(!slot.exists()),
                None => prop_assert!(
                    existing.len() >= MAX_SLOT_ATTEMPTS as usize
                        || existing.contains(&content)),
            }
        }
    }
}

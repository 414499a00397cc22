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

//! Miscellaneous functions for working with files.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

/// Write `data` into the file at `path`, atomically.
///
/// The file is first staged in the same directory as `path`, so a crash never
/// leaves a truncated file under the final name.
///
/// If `overwrite` is true, this will replace anything already at `path`. If
/// false, the call will fail if `path` already exists.
pub fn spit(
    path: impl AsRef<Path>,
    overwrite: bool,
    mode: u32,
    data: &[u8],
) -> io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tf = tempfile::NamedTempFile::new_in(dir)?;
    tf.as_file_mut().write_all(data)?;
    chmod(tf.path(), mode)?;
    tf.as_file_mut().sync_all()?;
    if overwrite {
        tf.persist(path)?;
    } else {
        tf.persist_noclobber(path)?;
    }
    Ok(())
}

pub fn chmod(path: impl AsRef<Path>, mode: u32) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

/// Make `path` absolute and canonical, like `realpath -m`.
///
/// The deepest ancestor of `path` which exists is canonicalised (resolving
/// symlinks). Whatever remains is appended lexically, with `.` dropped and
/// `..` popping a component, so this works for files which have not been
/// created yet.
pub fn resolve_real_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    let path = if path.is_absolute() {
        path.to_owned()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = path.as_path();
    let mut missing = Vec::new();
    let mut base = loop {
        match existing.canonicalize() {
            Ok(canon) => break canon,
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(Component::Normal(name));
                        existing = parent;
                    }
                    // `..` or `.` as the last component; let the lexical pass
                    // handle it
                    (Some(parent), None) => {
                        missing.push(
                            existing
                                .components()
                                .next_back()
                                .unwrap_or(Component::CurDir),
                        );
                        existing = parent;
                    }
                    (None, _) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    };

    for component in missing.into_iter().rev() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                base.pop();
            }
            other => base.push(other.as_os_str()),
        }
    }

    Ok(base)
}

/// Make `path` absolute without touching the filesystem, like Python's
/// `os.path.abspath`: `.` is dropped and `..` pops the previous component,
/// even if that component is a symlink.
pub fn absolute_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    let path = if path.is_absolute() {
        path.to_owned()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut ret = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => {
                ret.pop();
            }
            other => ret.push(other.as_os_str()),
        }
    }

    Ok(ret)
}

pub trait IgnoreKinds {
    fn ignore_not_found(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_not_found(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(R::default()),
            Err(e) => Err(e),
        }
    }
}

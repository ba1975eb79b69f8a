//
//  Copyright (C) 2022-2024  Chase Ruskin
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

/// Lexically normalizes paths into a single absolute form without touching the
/// file system (symlinks are not resolved).
pub trait Standardize {
    fn standardize<T>(p: T) -> PathBuf
    where
        T: AsRef<Path>;
}

impl Standardize for PathBuf {
    fn standardize<T>(p: T) -> PathBuf
    where
        T: AsRef<Path>,
    {
        let p = p.as_ref();
        let absolute = match p.is_relative() {
            true => match std::env::current_dir() {
                Ok(cwd) => cwd.join(p),
                Err(_) => p.to_path_buf(),
            },
            false => p.to_path_buf(),
        };
        normalize(&absolute)
    }
}

/// Removes `.` components and folds `..` components into their parents.
pub fn normalize(p: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for comp in p.components() {
        match comp {
            Component::CurDir => (),
            Component::ParentDir => {
                // never pop beyond the root
                if result.file_name().is_some() {
                    result.pop();
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Resolves `s` against `root` if it is relative, then normalizes it.
pub fn resolve_rel_path<T>(root: &Path, s: T) -> PathBuf
where
    T: AsRef<Path>,
{
    let p = s.as_ref();
    match p.is_relative() {
        true => normalize(&root.join(p)),
        false => normalize(p),
    }
}

/// Checks if `p` is an existing directory that holds at least one entry.
pub fn is_nonempty_dir(p: &Path) -> bool {
    match std::fs::read_dir(p) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

/// Collects every file beneath `dir`, in a stable (sorted) order.
///
/// Version control metadata directories are skipped.
pub fn gather_files(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(false)
        .git_ignore(false)
        .filter_entry(|e| {
            let name = e.file_name();
            name != ".git" && name != ".svn"
        })
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    walker
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .map(|e| e.into_path())
        .collect()
}

/// Deletes the directory `dir` and everything inside it.
pub fn remove_tree(dir: &Path) -> Result<(), fs_extra::error::Error> {
    fs_extra::remove_items(&[dir])
}

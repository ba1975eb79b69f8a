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

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    #[error("invalid module url {0:?}: {1}")]
    InvalidUrl(String, String),
    #[error("local module directory {0:?} does not exist")]
    MissingLocal(PathBuf),
    #[error("failed to run `{0}` in {1:?}: {2}")]
    SpawnFailed(String, PathBuf, String),
    #[error("`{0}` in {1:?} exited with error code {2}{}", format_stderr(.3))]
    CommandFailed(String, PathBuf, i32, String),
    #[error("`{0}` in {1:?} was terminated by a signal")]
    Terminated(String, PathBuf),
    #[error("`{0}` in {1:?} did not finish within {2} seconds")]
    TimedOut(String, PathBuf, u64),
    #[error("`{0}` in {1:?} was cancelled")]
    Cancelled(String, PathBuf),
    #[error("failed to read the revision of {0:?} from the output of `{1}`")]
    NoRevision(PathBuf, String),
    #[error("failed to prepare directory {0:?}: {1}")]
    Directory(PathBuf, String),
    #[error("local module {0:?} cannot be removed from disk")]
    CannotRemoveLocal(String),
}

fn format_stderr(s: &str) -> String {
    match s.trim().is_empty() {
        true => String::new(),
        false => format!(": {}", s.trim()),
    }
}

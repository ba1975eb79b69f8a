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

use crate::core::lang::lexer::Position;
use std::path::PathBuf;
use thiserror::Error;

/// An error raised while reading or running a manifest script.
#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("{0}: invalid syntax: {1}")]
    Syntax(Position, String),
    #[error("{0}: {1}")]
    Runtime(Position, String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("failed to read manifest {0:?}: {1}")]
    Unreadable(PathBuf, String),
    #[error("{0:?}:{1}")]
    Script(PathBuf, ScriptError),
    #[error("{0:?}: option \"{1}\" expects {2} but got {3}")]
    TypeMismatch(PathBuf, String, String, String),
    #[error("{0:?}: option \"{1}\" does not accept key \"{2}\" (expecting one of: {})", .3.join(", "))]
    DisallowedKey(PathBuf, String, String, Vec<String>),
    #[error("{0:?}: option \"action\" must be \"simulation\" or \"synthesis\" but got \"{1}\"")]
    InvalidAction(PathBuf, String),
    #[error("{0:?}: listed file {1:?} does not exist")]
    MissingFile(PathBuf, PathBuf),
    #[error("{0:?}: invalid file pattern \"{1}\": {2}")]
    BadPattern(PathBuf, String, String),
    #[error("directory {0:?} holds both manifest.py and Manifest.py")]
    AmbiguousManifest(PathBuf),
}

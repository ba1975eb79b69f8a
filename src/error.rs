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

use crate::core::fetch::error::FetchError;
use crate::core::manifest::error::ManifestError;
use crate::core::solver::SolveError;
use crate::util::anyerror::CodeFault;
use colored::Colorize;
use std::{fmt::Display, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("project root {0:?} does not exist or is not a directory")]
    MissingRoot(PathBuf),
    #[error("{0}")]
    Manifest(#[from] ManifestError),
    #[error("failed to fetch module {0}: {1}{2}")]
    Fetch(String, FetchError, Hint),
    #[error("modules remain unfetched after discovery: {}", .0.join(", "))]
    Unfetched(Vec<String>),
    #[error("fetching was cancelled")]
    Cancelled,
    #[error("{0}")]
    Analysis(#[from] CodeFault),
    #[error("{0}")]
    Solve(#[from] SolveError),
    #[error("failed to load configuration {0:?}: {1}{2}")]
    Config(PathBuf, LastError, Hint),
    #[error("failed to locate the home directory{0}")]
    MissingHome(Hint),
}

#[derive(Debug, PartialEq)]
pub struct LastError(pub String);

impl Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Error::lowerize(self.0.to_string()))
    }
}

impl Error {
    pub fn lowerize(s: String) -> String {
        // get the first word
        let first_word = match s.split_whitespace().next() {
            Some(w) => w,
            None => return s,
        };
        // retain punctuation if the first word is all-caps and longer than 1 character
        if first_word.len() > 1
            && first_word
                .chars()
                .find(|c| c.is_ascii_lowercase() == true)
                .is_none()
        {
            s.to_string()
        } else {
            s.char_indices()
                .map(|(i, c)| if i == 0 { c.to_ascii_lowercase() } else { c })
                .collect()
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Hint {
    VerboseLog,
    ModuleUrl,
    SetHome,
    ConfigFields,
}

impl Display for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::VerboseLog => "set HDLWEAVE_LOG=debug to see every command that was ran",
            Self::ModuleUrl => {
                "check the \"modules\" entry of the manifest that declares this module"
            }
            Self::SetHome => "set HDLWEAVE_HOME to the directory that stores the global configuration",
            Self::ConfigFields => {
                "see the [general], [fetch], [solver] and [verilog] tables for the accepted fields"
            }
        };
        write!(
            f,
            "\n\n{}: {}",
            "hint".green(),
            Error::lowerize(message.to_string())
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lowerize() {
        assert_eq!(Error::lowerize("Failed to read".to_string()), "failed to read");
        assert_eq!(Error::lowerize("IO error".to_string()), "IO error");
        assert_eq!(Error::lowerize(String::new()), "");
    }
}

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

use super::lexer::Position;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("failed to read source file: {0}")]
    Unreadable(String),
    #[error("{0}: include file {1:?} not found (searched {2:?})")]
    MissingInclude(Position, String, Vec<PathBuf>),
    #[error("{0}: include of {1:?} forms a cycle")]
    IncludeCycle(Position, PathBuf),
    #[error("{0}: include nesting exceeds the limit of {1} levels")]
    IncludeDepthExceeded(Position, usize),
    #[error("{0}: macro expansion depth exceeded the limit of {1} (expanding {})", .2.join(" -> "))]
    MacroDepthExceeded(Position, usize, Vec<String>),
    #[error("{0}: missing closing parenthesis for arguments of macro `{1}")]
    UnclosedMacroArgs(Position, String),
    #[error("{0}: expecting a macro name after `{1}")]
    MissingMacroName(Position, String),
    #[error("{0}: expecting a file name after `include")]
    MissingIncludeName(Position),
    #[error("{0}: `{1} without a matching `ifdef or `ifndef")]
    UnbalancedConditional(Position, String),
    #[error("{0}: `{1} is missing its closing `endif")]
    UnterminatedConditional(Position, String),
    #[error("{0}: protected region is missing its end_protected pragma")]
    UnterminatedProtected(Position),
    #[error("{0}: missing closing sequence for block comment (*/)")]
    UnclosedBlockComment(Position),
}

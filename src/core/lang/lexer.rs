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

use std::fmt::Display;

#[derive(Debug, PartialEq, Clone)]
pub struct Token<T> {
    position: Position,
    ttype: T,
}

impl<T> Token<T> {
    /// Creates a new token.
    pub fn new(ttype: T, loc: Position) -> Self {
        Self {
            position: loc,
            ttype: ttype,
        }
    }

    pub fn as_type(&self) -> &T {
        &self.ttype
    }

    /// Transforms the token into its type.
    pub fn take(self) -> T {
        self.ttype
    }

    /// Decouples the position and token into their separate structs.
    pub fn decouple(self) -> (Position, T) {
        (self.position, self.ttype)
    }

    /// Returns the position in the file where the token was captured.
    pub fn locate(&self) -> &Position {
        &self.position
    }
}

#[derive(Debug, PartialEq)]
pub struct TokenError<T: Display> {
    position: Position,
    err: T,
}

impl<T: Display> TokenError<T> {
    /// Creates a new `TokenError` struct at position `loc` with error `T`.
    pub fn new(err: T, loc: Position) -> Self {
        Self {
            position: loc,
            err: err,
        }
    }

    pub fn locate(&self) -> &Position {
        &self.position
    }

    pub fn into_err(self) -> T {
        self.err
    }
}

impl<T: Display> Display for TokenError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.position, self.err)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, PartialOrd, Ord, Default)]
/// (Line, Col)
pub struct Position(usize, usize);

impl Position {
    /// Creates a new `Position` struct as line 1, col 0.
    pub fn new() -> Self {
        Position(1, 0)
    }

    /// Creates a `Position` struct at a particular location `line`:`col`.
    pub fn place(line: usize, col: usize) -> Self {
        Self(line, col)
    }

    /// Increments the column counter by 1. If the current char `c` is a newline,
    /// it will then drop down to the next line.
    pub fn step(&mut self, c: &char) {
        self.1 += 1;
        if c == &'\n' {
            self.0 += 1;
            self.1 = 0;
        }
    }

    /// Access the line (`.0`) number.
    pub fn line(&self) -> usize {
        self.0
    }

    /// Access the col (`.1`) number.
    pub fn col(&self) -> usize {
        self.1
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

/// Helps keep the current position in the contents as the characters are consumed.
///
/// Unlike a plain `Peekable`, any number of characters can be looked ahead.
pub struct TrainCar {
    contents: Vec<char>,
    index: usize,
    loc: Position,
}

impl TrainCar {
    /// Creates a new `TrainCar` struct with an initial position (1, 0) and a
    /// train `s`.
    pub fn new(s: &str) -> Self {
        Self {
            contents: s.chars().collect(),
            index: 0,
            loc: Position::new(),
        }
    }

    /// Takes the next char and steps the `Position` marker accordingly, if a
    /// char exists.
    pub fn consume(&mut self) -> Option<char> {
        let c = *self.contents.get(self.index)?;
        self.index += 1;
        self.loc.step(&c);
        Some(c)
    }

    /// Takes the next char only if it equals `c`.
    pub fn consume_if(&mut self, c: char) -> bool {
        match self.peek() {
            Some(d) if d == &c => {
                self.consume();
                true
            }
            _ => false,
        }
    }

    /// References the next char, if it exists.
    pub fn peek(&self) -> Option<&char> {
        self.contents.get(self.index)
    }

    /// References the char `n` places past the next char, if it exists.
    pub fn peek_at(&self, n: usize) -> Option<&char> {
        self.contents.get(self.index + n)
    }

    /// Access the position of the last consumed character.
    pub fn locate(&self) -> &Position {
        &self.loc
    }

    /// Checks if every character has been consumed.
    pub fn is_empty(&self) -> bool {
        self.index >= self.contents.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn moving_position() {
        let mut pos = Position::new();
        assert_eq!(pos, Position::place(1, 0));
        pos.step(&'a');
        assert_eq!(pos, Position::place(1, 1));
        pos.step(&'\n');
        assert_eq!(pos, Position::place(2, 0));
        assert_eq!(Position::place(2, 5) > Position::place(1, 9), true);
    }

    #[test]
    fn train_lookahead() {
        let mut train = TrainCar::new("ab\nc");
        assert_eq!(train.peek(), Some(&'a'));
        assert_eq!(train.peek_at(2), Some(&'\n'));
        assert_eq!(train.consume_if('b'), false);
        assert_eq!(train.consume(), Some('a'));
        assert_eq!(train.consume_if('b'), true);
        train.consume();
        assert_eq!(train.locate(), &Position::place(2, 0));
        assert_eq!(train.consume(), Some('c'));
        assert_eq!(train.is_empty(), true);
        assert_eq!(train.consume(), None);
    }
}

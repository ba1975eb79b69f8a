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

use super::error::ScriptError;
use crate::core::lang::lexer::{Position, Token, TrainCar};

#[derive(Debug, PartialEq, Clone)]
pub enum ScriptToken {
    Name(String),
    Str(String),
    Int(i64),
    Assign,
    PlusAssign,
    Plus,
    Minus,
    EqEq,
    NotEq,
    Colon,
    Comma,
    ParenL,
    ParenR,
    BracketL,
    BracketR,
    BraceL,
    BraceR,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl ScriptToken {
    pub fn check_name(&self, kw: &str) -> bool {
        match self {
            Self::Name(n) => n == kw,
            _ => false,
        }
    }
}

impl std::fmt::Display for ScriptToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "'{}'", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Assign => write!(f, "="),
            Self::PlusAssign => write!(f, "+="),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Colon => write!(f, ":"),
            Self::Comma => write!(f, ","),
            Self::ParenL => write!(f, "("),
            Self::ParenR => write!(f, ")"),
            Self::BracketL => write!(f, "["),
            Self::BracketR => write!(f, "]"),
            Self::BraceL => write!(f, "{{"),
            Self::BraceR => write!(f, "}}"),
            Self::Newline => write!(f, "end of line"),
            Self::Indent => write!(f, "indent"),
            Self::Dedent => write!(f, "dedent"),
            Self::Eof => write!(f, "end of file"),
        }
    }
}

/// Tokenizes a manifest script, producing explicit indentation tokens.
///
/// Line breaks inside brackets and after a trailing backslash do not end a
/// logical line.
pub fn tokenize(s: &str) -> Result<Vec<Token<ScriptToken>>, ScriptError> {
    let mut train = TrainCar::new(s);
    let mut tokens: Vec<Token<ScriptToken>> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut nesting = 0usize;
    let mut at_line_start = true;

    loop {
        if at_line_start == true && nesting == 0 {
            // measure the indentation of the next non-blank line
            let mut width = 0;
            while let Some(c) = train.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width += 8 - (width % 8),
                    '\r' | '\x0c' => (),
                    _ => break,
                }
                train.consume();
            }
            match train.peek() {
                Some('\n') => {
                    train.consume();
                    continue;
                }
                Some('#') => {
                    skip_comment(&mut train);
                    continue;
                }
                None => break,
                _ => (),
            }
            at_line_start = false;
            let loc = next_position(&train);
            let current = *indents.last().unwrap_or(&0);
            if width > current {
                indents.push(width);
                tokens.push(Token::new(ScriptToken::Indent, loc));
            } else {
                while width < *indents.last().unwrap_or(&0) {
                    indents.pop();
                    tokens.push(Token::new(ScriptToken::Dedent, loc.clone()));
                }
                if width != *indents.last().unwrap_or(&0) {
                    return Err(ScriptError::Syntax(
                        loc,
                        "unindent does not match any outer indentation level".to_string(),
                    ));
                }
            }
        }

        let c = match train.consume() {
            Some(c) => c,
            None => break,
        };
        let loc = train.locate().clone();
        let tk = match c {
            ' ' | '\t' | '\r' | '\x0c' => continue,
            '#' => {
                skip_comment(&mut train);
                continue;
            }
            '\n' => {
                if nesting == 0 {
                    at_line_start = true;
                    tokens.push(Token::new(ScriptToken::Newline, loc));
                }
                continue;
            }
            '\\' => {
                train.consume_if('\r');
                match train.consume_if('\n') {
                    true => continue,
                    false => {
                        return Err(ScriptError::Syntax(
                            loc,
                            "unexpected character after line continuation".to_string(),
                        ))
                    }
                }
            }
            '"' | '\'' => ScriptToken::Str(read_string(&mut train, c, false, &loc)?),
            'r' | 'R' if train.peek() == Some(&'"') || train.peek() == Some(&'\'') => {
                let quote = train.consume().unwrap_or('"');
                ScriptToken::Str(read_string(&mut train, quote, true, &loc)?)
            }
            c if c.is_alphabetic() == true || c == '_' => {
                let mut word = String::from(c);
                while let Some(d) = train.peek() {
                    if d.is_alphanumeric() == false && d != &'_' {
                        break;
                    }
                    word.push(*d);
                    train.consume();
                }
                ScriptToken::Name(word)
            }
            c if c.is_ascii_digit() == true => {
                let mut word = String::from(c);
                while let Some(d) = train.peek() {
                    if d.is_ascii_digit() == false && d != &'_' {
                        break;
                    }
                    word.push(*d);
                    train.consume();
                }
                match word.replace('_', "").parse::<i64>() {
                    Ok(i) => ScriptToken::Int(i),
                    Err(e) => return Err(ScriptError::Syntax(loc, e.to_string())),
                }
            }
            '=' => match train.consume_if('=') {
                true => ScriptToken::EqEq,
                false => ScriptToken::Assign,
            },
            '!' if train.consume_if('=') == true => ScriptToken::NotEq,
            '+' => match train.consume_if('=') {
                true => ScriptToken::PlusAssign,
                false => ScriptToken::Plus,
            },
            '-' => ScriptToken::Minus,
            ':' => ScriptToken::Colon,
            ',' => ScriptToken::Comma,
            '(' | '[' | '{' => {
                nesting += 1;
                match c {
                    '(' => ScriptToken::ParenL,
                    '[' => ScriptToken::BracketL,
                    _ => ScriptToken::BraceL,
                }
            }
            ')' | ']' | '}' => {
                nesting = nesting.saturating_sub(1);
                match c {
                    ')' => ScriptToken::ParenR,
                    ']' => ScriptToken::BracketR,
                    _ => ScriptToken::BraceR,
                }
            }
            _ => {
                return Err(ScriptError::Syntax(
                    loc,
                    format!("unsupported character '{}'", c),
                ))
            }
        };
        tokens.push(Token::new(tk, loc));
    }

    let loc = next_position(&train);
    if tokens.last().map(|t| t.as_type() != &ScriptToken::Newline).unwrap_or(false) {
        tokens.push(Token::new(ScriptToken::Newline, loc.clone()));
    }
    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token::new(ScriptToken::Dedent, loc.clone()));
    }
    tokens.push(Token::new(ScriptToken::Eof, loc));
    Ok(tokens)
}

/// Returns the position of the next character to be consumed.
fn next_position(train: &TrainCar) -> Position {
    let loc = train.locate();
    Position::place(loc.line(), loc.col() + 1)
}

fn skip_comment(train: &mut TrainCar) {
    while let Some(c) = train.peek() {
        if c == &'\n' {
            break;
        }
        train.consume();
    }
}

/// Reads a string literal whose opening quote was already taken.
fn read_string(
    train: &mut TrainCar,
    quote: char,
    raw: bool,
    loc: &Position,
) -> Result<String, ScriptError> {
    // triple-quoted strings may span lines
    let triple = train.peek() == Some(&quote) && train.peek_at(1) == Some(&quote);
    if triple == true {
        train.consume();
        train.consume();
    } else if train.peek() == Some(&quote) {
        // empty string
        train.consume();
        return Ok(String::new());
    }
    let mut text = String::new();
    while let Some(c) = train.consume() {
        if c == quote {
            if triple == false {
                return Ok(text);
            }
            if train.peek() == Some(&quote) && train.peek_at(1) == Some(&quote) {
                train.consume();
                train.consume();
                return Ok(text);
            }
            text.push(c);
        } else if c == '\\' && raw == false {
            match train.consume() {
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('\\') => text.push('\\'),
                Some('\'') => text.push('\''),
                Some('"') => text.push('"'),
                Some('\n') => (),
                Some(d) => {
                    text.push('\\');
                    text.push(d);
                }
                None => break,
            }
        } else if c == '\n' && triple == false {
            break;
        } else {
            text.push(c);
        }
    }
    Err(ScriptError::Syntax(
        loc.clone(),
        "unterminated string literal".to_string(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(s: &str) -> Vec<ScriptToken> {
        tokenize(s).unwrap().into_iter().map(|t| t.take()).collect()
    }

    fn name(s: &str) -> ScriptToken {
        ScriptToken::Name(s.to_string())
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            kinds("files = ['a.vhd', \"b.vhd\"]  # comment"),
            vec![
                name("files"),
                ScriptToken::Assign,
                ScriptToken::BracketL,
                ScriptToken::Str("a.vhd".to_string()),
                ScriptToken::Comma,
                ScriptToken::Str("b.vhd".to_string()),
                ScriptToken::BracketR,
                ScriptToken::Newline,
                ScriptToken::Eof,
            ]
        );
    }

    #[test]
    fn indentation_blocks() {
        let src = "if x:\n    a = 1\n\n    # note\n    b += 2\nc = 3\n";
        assert_eq!(
            kinds(src),
            vec![
                name("if"),
                name("x"),
                ScriptToken::Colon,
                ScriptToken::Newline,
                ScriptToken::Indent,
                name("a"),
                ScriptToken::Assign,
                ScriptToken::Int(1),
                ScriptToken::Newline,
                name("b"),
                ScriptToken::PlusAssign,
                ScriptToken::Int(2),
                ScriptToken::Newline,
                ScriptToken::Dedent,
                name("c"),
                ScriptToken::Assign,
                ScriptToken::Int(3),
                ScriptToken::Newline,
                ScriptToken::Eof,
            ]
        );
    }

    #[test]
    fn brackets_join_lines() {
        let src = "modules = {\n  'local': [\n    '../a',\n  ],\n}\nx = 1 + \\\n 2";
        let tokens = kinds(src);
        assert_eq!(tokens.iter().filter(|t| t == &&ScriptToken::Newline).count(), 2);
        assert!(tokens.contains(&ScriptToken::Int(2)));
    }

    #[test]
    fn string_forms() {
        assert_eq!(
            kinds(r#"a = 'it\'s' + """multi
line""" + r'\d' + ''"#)[2..9],
            [
                ScriptToken::Str("it's".to_string()),
                ScriptToken::Plus,
                ScriptToken::Str("multi\nline".to_string()),
                ScriptToken::Plus,
                ScriptToken::Str("\\d".to_string()),
                ScriptToken::Plus,
                ScriptToken::Str(String::new()),
            ]
        );
    }

    #[test]
    fn bad_input() {
        assert_eq!(
            tokenize("x = 'open").unwrap_err(),
            ScriptError::Syntax(Position::place(1, 5), "unterminated string literal".to_string())
        );
        assert!(matches!(tokenize("x = 1 * 2"), Err(ScriptError::Syntax(_, _))));
        assert!(matches!(
            tokenize("if x:\n    a = 1\n  b = 2\n"),
            Err(ScriptError::Syntax(_, _))
        ));
    }
}

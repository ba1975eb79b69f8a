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

use super::super::error::ParseError;
use super::super::lexer::{Position, Token, TrainCar};

#[derive(Debug, PartialEq, Clone)]
pub enum VhdlToken {
    /// A basic identifier or reserved word, stored lower-cased.
    Word(String),
    /// An extended identifier (`\name\`), stored as written.
    Extended(String),
    Delimiter(Delimiter),
    /// Any abstract, character, string, or bit-string literal.
    Literal,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Delimiter {
    Dot,
    Colon,
    VarAssign,
    Terminator,
    Comma,
    ParenL,
    ParenR,
    Other,
}

impl VhdlToken {
    /// Checks if the token is the (case-insensitive) word `kw`.
    pub fn check_word(&self, kw: &str) -> bool {
        match self {
            Self::Word(w) => w == kw,
            _ => false,
        }
    }

    pub fn check_delimiter(&self, d: Delimiter) -> bool {
        match self {
            Self::Delimiter(e) => e == &d,
            _ => false,
        }
    }

    /// Casts the token to a name usable as a design unit identifier.
    ///
    /// Reserved words are not names.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Word(w) => match is_keyword(w) {
                true => None,
                false => Some(w),
            },
            Self::Extended(e) => Some(e),
            _ => None,
        }
    }
}

/// Breaks VHDL source code into tokens.
///
/// Comments are discarded and the contents of literals are not retained, so
/// later stages cannot be fooled by unit names written inside them.
pub fn tokenize(s: &str) -> Result<Vec<Token<VhdlToken>>, ParseError> {
    let mut train = TrainCar::new(s);
    let mut tokens = Vec::new();
    while let Some(c) = train.consume() {
        if c.is_whitespace() == true {
            continue;
        }
        let loc = train.locate().clone();
        let next = train.peek().copied();
        let tk = if c == '-' && next == Some('-') {
            // single-line comment
            while let Some(d) = train.consume() {
                if d == '\n' {
                    break;
                }
            }
            continue;
        } else if c == '/' && next == Some('*') {
            consume_block_comment(&mut train, loc)?;
            continue;
        } else if c.is_ascii_alphabetic() == true {
            let mut word = String::from(c.to_ascii_lowercase());
            while let Some(d) = train.peek() {
                if d.is_ascii_alphanumeric() == true || d == &'_' {
                    word.push(d.to_ascii_lowercase());
                    train.consume();
                } else {
                    break;
                }
            }
            VhdlToken::Word(word)
        } else if c == '\\' {
            let mut word = String::new();
            while let Some(d) = train.consume() {
                if d == '\\' {
                    // a doubled backslash is an escaped backslash
                    if train.consume_if('\\') == true {
                        word.push('\\');
                    } else {
                        break;
                    }
                } else {
                    word.push(d);
                }
            }
            VhdlToken::Extended(word)
        } else if c == '"' {
            consume_string(&mut train, '"');
            VhdlToken::Literal
        } else if c == '\'' && train.peek_at(1) == Some(&'\'') {
            // character literal
            train.consume();
            train.consume();
            VhdlToken::Literal
        } else if c.is_ascii_digit() == true {
            while let Some(d) = train.peek() {
                if d.is_ascii_alphanumeric() == true || d == &'_' || d == &'.' || d == &'#' {
                    train.consume();
                } else {
                    break;
                }
            }
            VhdlToken::Literal
        } else {
            VhdlToken::Delimiter(match c {
                '.' => Delimiter::Dot,
                ':' => match train.consume_if('=') {
                    true => Delimiter::VarAssign,
                    false => Delimiter::Colon,
                },
                ';' => Delimiter::Terminator,
                ',' => Delimiter::Comma,
                '(' => Delimiter::ParenL,
                ')' => Delimiter::ParenR,
                _ => Delimiter::Other,
            })
        };
        tokens.push(Token::new(tk, loc));
    }
    Ok(tokens)
}

fn consume_block_comment(train: &mut TrainCar, loc: Position) -> Result<(), ParseError> {
    // take the opening '*'
    train.consume();
    while let Some(c) = train.consume() {
        if c == '*' && train.consume_if('/') == true {
            return Ok(());
        }
    }
    Err(ParseError::UnclosedBlockComment(loc))
}

fn consume_string(train: &mut TrainCar, quote: char) {
    while let Some(c) = train.consume() {
        if c == quote {
            // a doubled quote is an escaped quote
            if train.consume_if(quote) == false {
                break;
            }
        } else if c == '\n' {
            // strings cannot span lines; recover at the line end
            break;
        }
    }
}

/// Checks if `word` (lower-cased) is a VHDL-2008 reserved word.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

const KEYWORDS: &[&str] = &[
    "abs", "access", "after", "alias", "all", "and", "architecture", "array", "assert",
    "assume", "assume_guarantee", "attribute", "begin", "block", "body", "buffer", "bus",
    "case", "component", "configuration", "constant", "context", "cover", "default",
    "disconnect", "downto", "else", "elsif", "end", "entity", "exit", "fairness", "file",
    "for", "force", "function", "generate", "generic", "group", "guarded", "if", "impure",
    "in", "inertial", "inout", "is", "label", "library", "linkage", "literal", "loop", "map",
    "mod", "nand", "new", "next", "nor", "not", "null", "of", "on", "open", "or", "others",
    "out", "package", "parameter", "port", "postponed", "procedure", "process", "property",
    "protected", "pure", "range", "record", "register", "reject", "release", "rem", "report",
    "restrict", "restrict_guarantee", "return", "rol", "ror", "select", "sequence",
    "severity", "shared", "signal", "sla", "sll", "sra", "srl", "strong", "subtype", "then",
    "to", "transport", "type", "unaffected", "units", "until", "use", "variable", "vmode",
    "vprop", "vunit", "wait", "when", "while", "with", "xnor", "xor",
];

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(s: &str) -> Vec<VhdlToken> {
        tokenize(s).unwrap().into_iter().map(|t| t.take()).collect()
    }

    #[test]
    fn keywords_are_sorted() {
        let mut sorted = KEYWORDS.to_vec();
        sorted.sort();
        assert_eq!(sorted, KEYWORDS.to_vec());
        assert_eq!(is_keyword("entity"), true);
        assert_eq!(is_keyword("adder"), false);
    }

    #[test]
    fn comments_and_strings_vanish() {
        let tokens = kinds(
            "-- entity fake is\nreport \"entity other is\"; /* package p is */ x <= '1';",
        );
        assert_eq!(
            tokens,
            vec![
                VhdlToken::Word("report".to_string()),
                VhdlToken::Literal,
                VhdlToken::Delimiter(Delimiter::Terminator),
                VhdlToken::Word("x".to_string()),
                VhdlToken::Delimiter(Delimiter::Other),
                VhdlToken::Delimiter(Delimiter::Other),
                VhdlToken::Literal,
                VhdlToken::Delimiter(Delimiter::Terminator),
            ]
        );
    }

    #[test]
    fn case_folding_and_extended() {
        let tokens = kinds("Use IEEE.Std_Logic_1164.ALL; \\My Unit\\");
        assert_eq!(tokens[0], VhdlToken::Word("use".to_string()));
        assert_eq!(tokens[1], VhdlToken::Word("ieee".to_string()));
        assert_eq!(tokens[2], VhdlToken::Delimiter(Delimiter::Dot));
        assert_eq!(tokens[3], VhdlToken::Word("std_logic_1164".to_string()));
        assert_eq!(tokens[7], VhdlToken::Extended("My Unit".to_string()));
    }

    #[test]
    fn attribute_tick_is_not_a_literal() {
        let tokens = kinds("a'range");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], VhdlToken::Delimiter(Delimiter::Other));
    }

    #[test]
    fn unclosed_block_comment() {
        assert_eq!(
            tokenize("x /* never closed").unwrap_err(),
            ParseError::UnclosedBlockComment(Position::place(1, 3))
        );
    }
}

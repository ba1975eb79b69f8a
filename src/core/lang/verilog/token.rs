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

use super::preprocess::{INCLUDE_BEGIN, INCLUDE_END};
use crate::core::lang::lexer::TrainCar;

#[derive(Debug, PartialEq, Clone)]
pub enum VerilogToken {
    /// A simple identifier or keyword.
    Identifier(String),
    /// An escaped identifier, without its leading backslash.
    Escaped(String),
    /// A system task, function, or `$unit`.
    System(String),
    ScopeResolution,
    Symbol(char),
    /// Any number or string literal.
    Literal,
    IncludeBegin,
    IncludeEnd,
}

impl VerilogToken {
    pub fn check_symbol(&self, c: char) -> bool {
        self == &Self::Symbol(c)
    }

    pub fn check_keyword(&self, kw: &str) -> bool {
        match self {
            Self::Identifier(w) => w == kw,
            _ => false,
        }
    }

    /// Casts the token to a user-defined name, if it is one.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Identifier(w) => match super::keyword::is_keyword(w) {
                true => None,
                false => Some(w),
            },
            Self::Escaped(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            Self::Identifier(w) => match super::keyword::is_keyword(w) {
                true => Some(w),
                false => None,
            },
            _ => None,
        }
    }
}

/// Breaks preprocessed Verilog text into tokens.
///
/// Attribute instances `(* ... *)` are dropped.
pub fn tokenize(s: &str) -> Vec<VerilogToken> {
    let mut train = TrainCar::new(s);
    let mut tokens = Vec::new();
    while let Some(c) = train.consume() {
        if c.is_whitespace() == true {
            continue;
        }
        let tk = if c == INCLUDE_BEGIN {
            VerilogToken::IncludeBegin
        } else if c == INCLUDE_END {
            VerilogToken::IncludeEnd
        } else if c.is_ascii_alphabetic() == true || c == '_' {
            VerilogToken::Identifier(read_word(&mut train, c))
        } else if c == '$' {
            VerilogToken::System(read_word(&mut train, c))
        } else if c == '\\' {
            let mut word = String::new();
            while let Some(d) = train.peek() {
                if d.is_whitespace() == true {
                    break;
                }
                word.push(*d);
                train.consume();
            }
            VerilogToken::Escaped(word)
        } else if c.is_ascii_digit() == true {
            read_word(&mut train, c);
            if train.peek() == Some(&'\'') {
                train.consume();
                read_based(&mut train);
            }
            VerilogToken::Literal
        } else if c == '\'' && is_base(&train) == true {
            read_based(&mut train);
            VerilogToken::Literal
        } else if c == '"' {
            while let Some(d) = train.consume() {
                if d == '\\' {
                    train.consume();
                } else if d == '"' || d == '\n' {
                    break;
                }
            }
            VerilogToken::Literal
        } else if c == ':' && train.consume_if(':') == true {
            VerilogToken::ScopeResolution
        } else if c == '(' && train.peek() == Some(&'*') && train.peek_at(1) != Some(&')') {
            // attribute instance
            train.consume();
            while let Some(d) = train.consume() {
                if d == '*' && train.consume_if(')') == true {
                    break;
                }
            }
            continue;
        } else {
            VerilogToken::Symbol(c)
        };
        tokens.push(tk);
    }
    tokens
}

fn read_word(train: &mut TrainCar, first: char) -> String {
    let mut word = String::from(first);
    while let Some(d) = train.peek() {
        if d.is_ascii_alphanumeric() == false && d != &'_' && d != &'$' && d != &'.' {
            break;
        }
        // a '.' only continues real numbers
        if d == &'.' && first.is_ascii_digit() == false {
            break;
        }
        word.push(*d);
        train.consume();
    }
    word
}

/// Checks if a `'` starts a based number or an unbased unsized literal.
fn is_base(train: &TrainCar) -> bool {
    let base = |c: Option<&char>| match c {
        Some(c) => "bodhBODH".contains(*c),
        None => false,
    };
    match train.peek() {
        Some(c) if "01xXzZ".contains(*c) => true,
        Some(c) if c == &'s' || c == &'S' => base(train.peek_at(1)),
        c => base(c),
    }
}

fn read_based(train: &mut TrainCar) {
    if let Some(c) = train.peek() {
        if c == &'s' || c == &'S' {
            train.consume();
        }
    }
    train.consume();
    // the base may be separated from its digits
    while let Some(d) = train.peek() {
        if d == &'\n' || d.is_whitespace() == false {
            break;
        }
        train.consume();
    }
    while let Some(d) = train.peek() {
        if d.is_ascii_alphanumeric() == false && d != &'_' && d != &'?' {
            break;
        }
        train.consume();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ident(s: &str) -> VerilogToken {
        VerilogToken::Identifier(s.to_string())
    }

    #[test]
    fn identifiers_and_symbols() {
        let tokens = tokenize("fifo #(.W(8)) u_fifo (.clk(clk));");
        assert_eq!(tokens[0], ident("fifo"));
        assert_eq!(tokens[1], VerilogToken::Symbol('#'));
        assert_eq!(tokens[6], VerilogToken::Literal);
        assert_eq!(tokens[9], ident("u_fifo"));
    }

    #[test]
    fn numbers() {
        let tokens = tokenize("assign x = 8'hFF + 'b1 + 4 'sd 3 + 1.5e3 + '1;");
        let literals = tokens.iter().filter(|t| t == &&VerilogToken::Literal).count();
        assert_eq!(literals, 6);
        assert!(tokens.iter().all(|t| t != &ident("hFF")));
    }

    #[test]
    fn casts_keep_the_tick() {
        let tokens = tokenize("int'(x)");
        assert_eq!(
            tokens,
            vec![
                ident("int"),
                VerilogToken::Symbol('\''),
                VerilogToken::Symbol('('),
                ident("x"),
                VerilogToken::Symbol(')'),
            ]
        );
    }

    #[test]
    fn scope_and_system_names() {
        let tokens = tokenize("pkg::T $display $unit::x \\esc[0] ");
        assert_eq!(tokens[0], ident("pkg"));
        assert_eq!(tokens[1], VerilogToken::ScopeResolution);
        assert_eq!(tokens[3], VerilogToken::System("$display".to_string()));
        assert_eq!(tokens[4], VerilogToken::System("$unit".to_string()));
        assert_eq!(tokens[7], VerilogToken::Escaped("esc[0]".to_string()));
    }

    #[test]
    fn attributes_are_dropped() {
        let tokens = tokenize("(* keep = 1 *) wire w; always @(*) begin end");
        assert_eq!(tokens[0], ident("wire"));
        assert!(tokens.contains(&VerilogToken::Symbol('*')));
    }

    #[test]
    fn strings_are_opaque() {
        let tokens = tokenize("$display(\"module fake (\\\"x\\\")\");");
        assert_eq!(tokens.iter().filter(|t| t.as_name().is_some()).count(), 0);
    }
}

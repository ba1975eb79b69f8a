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

//! A sandboxed interpreter for the small Python subset manifests are written in.
//!
//! Supported statements are plain and augmented assignment, `print(...)`,
//! `pass`, and `if`/`elif`/`else` blocks. Everything else (imports, loops,
//! function definitions, calls other than `print`) is rejected while parsing,
//! so a manifest can never reach outside of its own bindings.

use super::error::ScriptError;
use super::token::{tokenize, ScriptToken};
use super::value::{OptionMap, Value};
use crate::core::lang::lexer::{Position, Token};
use indexmap::IndexMap;

const RESERVED: &[&str] = &[
    "and", "as", "assert", "break", "class", "continue", "def", "del", "elif", "else", "except",
    "exec", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda", "not", "or",
    "pass", "raise", "return", "try", "while", "with", "yield",
];

#[derive(Debug, PartialEq, Clone)]
enum Stmt {
    Assign(Position, String, Expr),
    AugAssign(Position, String, Expr),
    Print(Vec<Expr>),
    Pass,
    If(Vec<(Expr, Vec<Stmt>)>, Vec<Stmt>),
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Eq,
    NotEq,
    In,
    NotIn,
}

#[derive(Debug, PartialEq, Clone)]
enum Expr {
    Literal(Value),
    Name(Position, String),
    List(Vec<Expr>),
    Dict(Position, Vec<(Expr, Expr)>),
    Binary(Position, BinOp, Box<Expr>, Box<Expr>),
    Neg(Position, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Subscript(Position, Box<Expr>, Box<Expr>),
}

/// The bindings left behind by a script along with everything it printed.
#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub bindings: OptionMap,
    pub printed: Vec<String>,
}

/// Parses and runs `source` with `context` as its initial bindings.
pub fn run(source: &str, context: OptionMap) -> Result<Outcome, ScriptError> {
    let program = Parser::new(tokenize(source)?).parse_program()?;
    let mut interp = Interpreter {
        env: context,
        printed: Vec::new(),
    };
    interp.exec_block(&program)?;
    Ok(Outcome {
        bindings: interp.env,
        printed: interp.printed,
    })
}

struct Parser {
    tokens: Vec<Token<ScriptToken>>,
    index: usize,
}

impl Parser {
    fn new(tokens: Vec<Token<ScriptToken>>) -> Self {
        Self {
            tokens: tokens,
            index: 0,
        }
    }

    fn peek(&self) -> &ScriptToken {
        self.tokens
            .get(self.index)
            .map(|t| t.as_type())
            .unwrap_or(&ScriptToken::Eof)
    }

    fn peek_at(&self, n: usize) -> &ScriptToken {
        self.tokens
            .get(self.index + n)
            .map(|t| t.as_type())
            .unwrap_or(&ScriptToken::Eof)
    }

    fn position(&self) -> Position {
        self.tokens
            .get(self.index)
            .or(self.tokens.last())
            .map(|t| t.locate().clone())
            .unwrap_or_default()
    }

    fn advance(&mut self) -> ScriptToken {
        let tk = self.peek().clone();
        if self.index < self.tokens.len() {
            self.index += 1;
        }
        tk
    }

    fn error<T>(&self, msg: String) -> Result<T, ScriptError> {
        Err(ScriptError::Syntax(self.position(), msg))
    }

    fn expect(&mut self, tk: ScriptToken) -> Result<(), ScriptError> {
        match self.peek() == &tk {
            true => {
                self.advance();
                Ok(())
            }
            false => self.error(format!("expecting '{}' but found '{}'", tk, self.peek())),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut stmts = Vec::new();
        while self.peek() != &ScriptToken::Eof {
            if self.peek() == &ScriptToken::Newline {
                self.advance();
                continue;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ScriptError> {
        if self.peek().check_name("if") {
            return self.parse_if();
        }
        let stmt = self.parse_simple()?;
        match self.peek() {
            ScriptToken::Newline => {
                self.advance();
                Ok(stmt)
            }
            ScriptToken::Eof | ScriptToken::Dedent => Ok(stmt),
            other => self.error(format!("unexpected '{}' after statement", other)),
        }
    }

    fn parse_simple(&mut self) -> Result<Stmt, ScriptError> {
        let pos = self.position();
        let name = match self.peek() {
            ScriptToken::Name(n) => n.clone(),
            other => return self.error(format!("unexpected '{}'", other)),
        };
        if name == "pass" {
            self.advance();
            return Ok(Stmt::Pass);
        }
        if name == "print" && self.peek_at(1) == &ScriptToken::ParenL {
            self.advance();
            self.advance();
            let args = self.parse_sequence(ScriptToken::ParenR)?;
            return Ok(Stmt::Print(args));
        }
        if RESERVED.contains(&name.as_str()) == true {
            return self.error(format!("'{}' statements are not supported in manifests", name));
        }
        self.advance();
        match self.advance() {
            ScriptToken::Assign => Ok(Stmt::Assign(pos, name, self.parse_expr()?)),
            ScriptToken::PlusAssign => Ok(Stmt::AugAssign(pos, name, self.parse_expr()?)),
            ScriptToken::ParenL => self.error(format!(
                "calling '{}' is not supported in manifests",
                name
            )),
            other => self.error(format!("expecting assignment to '{}' but found '{}'", name, other)),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ScriptError> {
        let mut branches = Vec::new();
        let mut otherwise = Vec::new();
        // take 'if'
        self.advance();
        let cond = self.parse_expr()?;
        self.expect(ScriptToken::Colon)?;
        branches.push((cond, self.parse_block()?));
        loop {
            if self.peek().check_name("elif") {
                self.advance();
                let cond = self.parse_expr()?;
                self.expect(ScriptToken::Colon)?;
                branches.push((cond, self.parse_block()?));
            } else if self.peek().check_name("else") {
                self.advance();
                self.expect(ScriptToken::Colon)?;
                otherwise = self.parse_block()?;
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If(branches, otherwise))
    }

    /// Parses either an indented suite or a single statement on the same line.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if self.peek() != &ScriptToken::Newline {
            let stmt = self.parse_simple()?;
            self.expect(ScriptToken::Newline)?;
            return Ok(vec![stmt]);
        }
        self.advance();
        self.expect(ScriptToken::Indent)?;
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                ScriptToken::Dedent => {
                    self.advance();
                    break;
                }
                ScriptToken::Eof => break,
                ScriptToken::Newline => {
                    self.advance();
                }
                _ => stmts.push(self.parse_statement()?),
            }
        }
        Ok(stmts)
    }

    /// Parses comma separated expressions up to the closing token `end`.
    fn parse_sequence(&mut self, end: ScriptToken) -> Result<Vec<Expr>, ScriptError> {
        let mut items = Vec::new();
        while self.peek() != &end {
            items.push(self.parse_expr()?);
            if self.peek() == &ScriptToken::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(end)?;
        Ok(items)
    }

    fn parse_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_and()?;
        while self.peek().check_name("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_not()?;
        while self.peek().check_name("and") {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ScriptError> {
        if self.peek().check_name("not") {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ScriptError> {
        let lhs = self.parse_sum()?;
        let pos = self.position();
        let op = match self.peek() {
            ScriptToken::EqEq => BinOp::Eq,
            ScriptToken::NotEq => BinOp::NotEq,
            t if t.check_name("in") => BinOp::In,
            t if t.check_name("not") && self.peek_at(1).check_name("in") => {
                self.advance();
                BinOp::NotIn
            }
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_sum()?;
        Ok(Expr::Binary(pos, op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_sum(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let pos = self.position();
            let op = match self.peek() {
                ScriptToken::Plus => BinOp::Add,
                ScriptToken::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(pos, op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        if self.peek() == &ScriptToken::Minus {
            let pos = self.position();
            self.advance();
            return Ok(Expr::Neg(pos, Box::new(self.parse_unary()?)));
        }
        let mut expr = self.parse_atom()?;
        while self.peek() == &ScriptToken::BracketL {
            let pos = self.position();
            self.advance();
            let index = self.parse_expr()?;
            self.expect(ScriptToken::BracketR)?;
            expr = Expr::Subscript(pos, Box::new(expr), Box::new(index));
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, ScriptError> {
        let pos = self.position();
        match self.advance() {
            ScriptToken::Str(s) => {
                // adjacent literals are joined
                let mut text = s;
                while let ScriptToken::Str(next) = self.peek() {
                    text.push_str(next);
                    self.advance();
                }
                Ok(Expr::Literal(Value::Str(text)))
            }
            ScriptToken::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            ScriptToken::Name(n) => match n.as_str() {
                "True" => Ok(Expr::Literal(Value::Bool(true))),
                "False" => Ok(Expr::Literal(Value::Bool(false))),
                "None" => Ok(Expr::Literal(Value::None)),
                _ if RESERVED.contains(&n.as_str()) => {
                    Err(ScriptError::Syntax(pos, format!("unexpected keyword '{}'", n)))
                }
                _ if self.peek() == &ScriptToken::ParenL => Err(ScriptError::Syntax(
                    pos,
                    format!("calling '{}' is not supported in manifests", n),
                )),
                _ => Ok(Expr::Name(pos, n)),
            },
            ScriptToken::BracketL => Ok(Expr::List(self.parse_sequence(ScriptToken::BracketR)?)),
            ScriptToken::ParenL => {
                if self.peek() == &ScriptToken::ParenR {
                    self.advance();
                    return Ok(Expr::List(Vec::new()));
                }
                let first = self.parse_expr()?;
                match self.peek() {
                    ScriptToken::ParenR => {
                        self.advance();
                        Ok(first)
                    }
                    ScriptToken::Comma => {
                        // a tuple evaluates to a list
                        self.advance();
                        let mut items = vec![first];
                        items.extend(self.parse_sequence(ScriptToken::ParenR)?);
                        Ok(Expr::List(items))
                    }
                    other => Err(ScriptError::Syntax(
                        self.position(),
                        format!("expecting ')' but found '{}'", other),
                    )),
                }
            }
            ScriptToken::BraceL => {
                let mut entries = Vec::new();
                while self.peek() != &ScriptToken::BraceR {
                    let key = self.parse_expr()?;
                    self.expect(ScriptToken::Colon)?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if self.peek() == &ScriptToken::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(ScriptToken::BraceR)?;
                Ok(Expr::Dict(pos, entries))
            }
            other => Err(ScriptError::Syntax(
                pos,
                format!("unexpected '{}' in expression", other),
            )),
        }
    }
}

struct Interpreter {
    env: OptionMap,
    printed: Vec<String>,
}

impl Interpreter {
    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<(), ScriptError> {
        for stmt in stmts {
            self.exec(stmt)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Pass => (),
            Stmt::Assign(_, name, expr) => {
                let value = self.eval(expr)?;
                self.env.insert(name.clone(), value);
            }
            Stmt::AugAssign(pos, name, expr) => {
                let current = match self.env.get(name) {
                    Some(v) => v.clone(),
                    None => return Err(undefined(pos, name)),
                };
                let value = add(pos, current, self.eval(expr)?)?;
                self.env.insert(name.clone(), value);
            }
            Stmt::Print(args) => {
                let mut parts = Vec::with_capacity(args.len());
                for a in args {
                    parts.push(self.eval(a)?.to_string());
                }
                self.printed.push(parts.join(" "));
            }
            Stmt::If(branches, otherwise) => {
                for (cond, body) in branches {
                    if self.eval(cond)?.is_truthy() == true {
                        return self.exec_block(body);
                    }
                }
                self.exec_block(otherwise)?;
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<Value, ScriptError> {
        Ok(match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Name(pos, n) => match self.env.get(n) {
                Some(v) => v.clone(),
                None => return Err(undefined(pos, n)),
            },
            Expr::List(items) => Value::List(
                items
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<Result<Vec<Value>, ScriptError>>()?,
            ),
            Expr::Dict(pos, entries) => {
                let mut map = IndexMap::new();
                for (k, v) in entries {
                    let key = match self.eval(k)? {
                        Value::Str(s) => s,
                        other => {
                            return Err(ScriptError::Runtime(
                                pos.clone(),
                                format!("dictionary keys must be str, not {}", other.type_name()),
                            ))
                        }
                    };
                    map.insert(key, self.eval(v)?);
                }
                Value::Dict(map)
            }
            Expr::Not(e) => Value::Bool(self.eval(e)?.is_truthy() == false),
            Expr::And(l, r) => {
                let lhs = self.eval(l)?;
                match lhs.is_truthy() {
                    true => self.eval(r)?,
                    false => lhs,
                }
            }
            Expr::Or(l, r) => {
                let lhs = self.eval(l)?;
                match lhs.is_truthy() {
                    true => lhs,
                    false => self.eval(r)?,
                }
            }
            Expr::Neg(pos, e) => match self.eval(e)? {
                Value::Int(i) => Value::Int(i.checked_neg().ok_or_else(|| overflow(pos))?),
                other => {
                    return Err(ScriptError::Runtime(
                        pos.clone(),
                        format!("bad operand type for unary -: '{}'", other.type_name()),
                    ))
                }
            },
            Expr::Binary(pos, op, l, r) => {
                let lhs = self.eval(l)?;
                let rhs = self.eval(r)?;
                match op {
                    BinOp::Add => add(pos, lhs, rhs)?,
                    BinOp::Sub => match (lhs, rhs) {
                        (Value::Int(a), Value::Int(b)) => {
                            Value::Int(a.checked_sub(b).ok_or_else(|| overflow(pos))?)
                        }
                        (a, b) => return Err(unsupported(pos, "-", &a, &b)),
                    },
                    BinOp::Eq => Value::Bool(lhs == rhs),
                    BinOp::NotEq => Value::Bool(lhs != rhs),
                    BinOp::In => Value::Bool(contains(pos, &rhs, &lhs)?),
                    BinOp::NotIn => Value::Bool(contains(pos, &rhs, &lhs)? == false),
                }
            }
            Expr::Subscript(pos, target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                subscript(pos, target, index)?
            }
        })
    }
}

fn undefined(pos: &Position, name: &str) -> ScriptError {
    ScriptError::Runtime(pos.clone(), format!("name '{}' is not defined", name))
}

fn overflow(pos: &Position) -> ScriptError {
    ScriptError::Runtime(pos.clone(), "integer overflow".to_string())
}

fn unsupported(pos: &Position, op: &str, a: &Value, b: &Value) -> ScriptError {
    ScriptError::Runtime(
        pos.clone(),
        format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op,
            a.type_name(),
            b.type_name()
        ),
    )
}

fn add(pos: &Position, lhs: Value, rhs: Value) -> Result<Value, ScriptError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(b)
            .map(Value::Int)
            .ok_or_else(|| overflow(pos)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (a, b) => Err(unsupported(pos, "+", &a, &b)),
    }
}

fn contains(pos: &Position, container: &Value, item: &Value) -> Result<bool, ScriptError> {
    match (container, item) {
        (Value::List(l), _) => Ok(l.contains(item)),
        (Value::Dict(d), Value::Str(k)) => Ok(d.contains_key(k)),
        (Value::Str(s), Value::Str(sub)) => Ok(s.contains(sub.as_str())),
        _ => Err(ScriptError::Runtime(
            pos.clone(),
            format!(
                "'in' is not supported between '{}' and '{}'",
                item.type_name(),
                container.type_name()
            ),
        )),
    }
}

fn subscript(pos: &Position, target: Value, index: Value) -> Result<Value, ScriptError> {
    let out_of_range = || ScriptError::Runtime(pos.clone(), "index out of range".to_string());
    match (target, index) {
        (Value::List(l), Value::Int(i)) => {
            let i = match i < 0 {
                true => l.len() as i64 + i,
                false => i,
            };
            match i < 0 {
                true => Err(out_of_range()),
                false => l.into_iter().nth(i as usize).ok_or_else(out_of_range),
            }
        }
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let i = match i < 0 {
                true => chars.len() as i64 + i,
                false => i,
            };
            match i < 0 {
                true => Err(out_of_range()),
                false => chars
                    .get(i as usize)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(out_of_range),
            }
        }
        (Value::Dict(mut d), Value::Str(k)) => d
            .swap_remove(&k)
            .ok_or_else(|| ScriptError::Runtime(pos.clone(), format!("key '{}' not found", k))),
        (t, i) => Err(ScriptError::Runtime(
            pos.clone(),
            format!("'{}' cannot be indexed by '{}'", t.type_name(), i.type_name()),
        )),
    }
}

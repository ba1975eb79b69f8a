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
use super::super::lexer::{Position, TrainCar};
use super::super::AnalysisOptions;
use crate::util::filesystem::Standardize;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Marks the start of text that was pulled in by an `include directive.
pub const INCLUDE_BEGIN: char = '\u{1}';
/// Marks the end of text that was pulled in by an `include directive.
pub const INCLUDE_END: char = '\u{2}';

/// Compiler directives that are dropped along with the rest of their line.
const LINE_DIRECTIVES: &[&str] = &[
    "begin_keywords",
    "default_decay_time",
    "default_nettype",
    "default_trireg_strength",
    "line",
    "timescale",
    "unconnected_drive",
];

/// Compiler directives that are dropped without arguments.
const BARE_DIRECTIVES: &[&str] = &[
    "accelerate",
    "celldefine",
    "delay_mode_distributed",
    "delay_mode_path",
    "delay_mode_unit",
    "delay_mode_zero",
    "end_keywords",
    "endcelldefine",
    "endprotect",
    "noaccelerate",
    "nounconnected_drive",
    "protect",
    "resetall",
];

#[derive(Debug, PartialEq)]
pub struct Preprocessed {
    pub text: String,
    /// Normalized paths of every included file, in the order first seen.
    pub includes: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
struct Macro {
    /// Formal arguments with their optional default text.
    params: Option<Vec<(String, Option<String>)>>,
    body: String,
}

#[derive(Debug)]
struct Conditional {
    directive: String,
    position: Position,
    active: bool,
    taken: bool,
}

pub struct Preprocessor<'a> {
    opts: &'a AnalysisOptions,
    include_dirs: &'a [PathBuf],
    macros: HashMap<String, Macro>,
    includes: IndexSet<PathBuf>,
    chain: Vec<PathBuf>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(include_dirs: &'a [PathBuf], opts: &'a AnalysisOptions) -> Self {
        let macros = opts
            .get_defines()
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    Macro {
                        params: None,
                        body: v.clone(),
                    },
                )
            })
            .collect();
        Self {
            opts: opts,
            include_dirs: include_dirs,
            macros: macros,
            includes: IndexSet::new(),
            chain: Vec::new(),
        }
    }

    /// Preprocesses `source`, which was read from `path`.
    pub fn run(mut self, path: &Path, source: &str) -> Result<Preprocessed, ParseError> {
        let path = PathBuf::standardize(path);
        self.chain.push(path.clone());
        let text = self.process(&path, source)?;
        Ok(Preprocessed {
            text: text,
            includes: self.includes.into_iter().collect(),
        })
    }

    fn process(&mut self, path: &Path, source: &str) -> Result<String, ParseError> {
        let stripped = strip_comments(source)?;
        let mut train = TrainCar::new(&stripped);
        let mut out = String::with_capacity(stripped.len());
        let mut conds: Vec<Conditional> = Vec::new();

        while let Some(c) = train.consume() {
            let active = conds.last().map(|f| f.active).unwrap_or(true);
            if c == '`' && is_ident_start(train.peek()) == true {
                let pos = train.locate().clone();
                let name = read_identifier(&mut train);
                match name.as_str() {
                    "ifdef" | "ifndef" => {
                        let m = read_macro_name(&mut train, &name, &pos)?;
                        let (active, taken) = match active {
                            true => {
                                let cond = self.macros.contains_key(&m) == (name == "ifdef");
                                (cond, cond)
                            }
                            // a disabled parent keeps every branch disabled
                            false => (false, true),
                        };
                        conds.push(Conditional {
                            directive: name.clone(),
                            position: pos,
                            active: active,
                            taken: taken,
                        });
                    }
                    "elsif" => {
                        let m = read_macro_name(&mut train, &name, &pos)?;
                        let defined = self.macros.contains_key(&m);
                        let top = conds
                            .last_mut()
                            .ok_or_else(|| ParseError::UnbalancedConditional(pos.clone(), name.clone()))?;
                        top.active = top.taken == false && defined == true;
                        top.taken = top.taken || top.active;
                    }
                    "else" => {
                        let top = conds
                            .last_mut()
                            .ok_or_else(|| ParseError::UnbalancedConditional(pos.clone(), name.clone()))?;
                        top.active = top.taken == false;
                        top.taken = true;
                    }
                    "endif" => {
                        if conds.pop().is_none() {
                            return Err(ParseError::UnbalancedConditional(pos.clone(), name.clone()));
                        }
                    }
                    _ if active == false => (),
                    "define" => self.parse_define(&mut train, &pos, &mut out)?,
                    "undef" => {
                        let m = read_macro_name(&mut train, &name, &pos)?;
                        self.macros.remove(&m);
                    }
                    "undefineall" => self.macros.clear(),
                    "include" => {
                        let text = self.include(&mut train, path, &pos)?;
                        out.push(INCLUDE_BEGIN);
                        out.push_str(&text);
                        out.push(INCLUDE_END);
                    }
                    "pragma" => skip_pragma(&mut train, &pos)?,
                    "__FILE__" => out.push_str(&format!("\"{}\"", path.display())),
                    "__LINE__" => out.push_str(&pos.line().to_string()),
                    d if LINE_DIRECTIVES.contains(&d) => skip_line(&mut train),
                    d if BARE_DIRECTIVES.contains(&d) => (),
                    _ => {
                        // undefined macros expand to nothing
                        if let Some(mac) = self.macros.get(&name).cloned() {
                            let args = match mac.params.is_some() {
                                true => Some(read_args(&mut train, &name, &pos)?),
                                false => None,
                            };
                            let mut chain = vec![name.clone()];
                            out.push_str(&self.expand(&mac, args, &pos, &mut chain)?);
                        }
                    }
                }
                continue;
            }
            if active == false {
                // directives inside disabled strings are only text
                if c == '"' {
                    let mut skipped = String::new();
                    copy_string(&mut train, &mut skipped);
                    skipped.chars().filter(|d| d == &'\n').for_each(|d| out.push(d));
                }
                // keep line structure of disabled regions
                if c == '\n' {
                    out.push(c);
                }
                continue;
            }
            out.push(c);
            if c == '"' {
                copy_string(&mut train, &mut out);
            }
        }
        match conds.pop() {
            Some(top) => Err(ParseError::UnterminatedConditional(
                top.position,
                top.directive,
            )),
            None => Ok(out),
        }
    }

    fn parse_define(
        &mut self,
        train: &mut TrainCar,
        pos: &Position,
        out: &mut String,
    ) -> Result<(), ParseError> {
        let name = read_macro_name(train, "define", pos)?;
        // formal arguments must immediately follow the name
        let params = match train.consume_if('(') {
            true => {
                let list = read_balanced(train)
                    .ok_or_else(|| ParseError::UnclosedMacroArgs(pos.clone(), name.clone()))?;
                Some(
                    list.into_iter()
                        .filter(|p| p.is_empty() == false)
                        .map(|p| match p.split_once('=') {
                            Some((n, d)) => (n.trim().to_string(), Some(d.trim().to_string())),
                            None => (p, None),
                        })
                        .collect(),
                )
            }
            false => None,
        };
        let mut body = String::new();
        while let Some(c) = train.peek() {
            if c == &'\n' {
                break;
            }
            let c = train.consume().unwrap_or_default();
            if c == '\\' {
                train.consume_if('\r');
                if train.consume_if('\n') == true {
                    body.push('\n');
                    out.push('\n');
                    continue;
                }
            }
            body.push(c);
        }
        self.macros.insert(
            name,
            Macro {
                params: params,
                body: body.trim().to_string(),
            },
        );
        Ok(())
    }

    /// Expands a macro and every macro its text refers to.
    ///
    /// `chain` holds the names currently being expanded, outermost first.
    fn expand(
        &self,
        mac: &Macro,
        args: Option<Vec<String>>,
        pos: &Position,
        chain: &mut Vec<String>,
    ) -> Result<String, ParseError> {
        let limit = self.opts.get_max_macro_depth();
        if chain.len() > limit {
            return Err(ParseError::MacroDepthExceeded(
                pos.clone(),
                limit,
                chain.clone(),
            ));
        }
        let text = match &mac.params {
            Some(params) => substitute(&mac.body, params, &args.unwrap_or_default()),
            None => mac.body.clone(),
        };
        let mut train = TrainCar::new(&text);
        let mut out = String::with_capacity(text.len());
        while let Some(c) = train.consume() {
            if c == '`' {
                if train.consume_if('`') == true {
                    // token pasting
                    continue;
                } else if train.consume_if('"') == true {
                    out.push('"');
                    continue;
                } else if is_ident_start(train.peek()) == true {
                    let name = read_identifier(&mut train);
                    if let Some(inner) = self.macros.get(&name) {
                        let args = match inner.params.is_some() {
                            true => Some(read_args(&mut train, &name, pos)?),
                            false => None,
                        };
                        chain.push(name);
                        out.push_str(&self.expand(inner, args, pos, chain)?);
                        chain.pop();
                    }
                    continue;
                }
            }
            out.push(c);
            if c == '"' {
                copy_string(&mut train, &mut out);
            }
        }
        Ok(out)
    }

    fn include(
        &mut self,
        train: &mut TrainCar,
        current: &Path,
        pos: &Position,
    ) -> Result<String, ParseError> {
        skip_blanks(train);
        let name = match train.consume() {
            Some('"') => read_until(train, '"'),
            Some('<') => read_until(train, '>'),
            _ => None,
        }
        .ok_or_else(|| ParseError::MissingIncludeName(pos.clone()))?;

        let target = self.resolve_include(current, &name, pos)?;
        if self.chain.contains(&target) == true {
            return Err(ParseError::IncludeCycle(pos.clone(), target));
        }
        let limit = self.opts.get_max_include_depth();
        // the chain holds the top-level file too
        if self.chain.len() > limit {
            return Err(ParseError::IncludeDepthExceeded(pos.clone(), limit));
        }
        let source = std::fs::read_to_string(&target)
            .map_err(|e| ParseError::Unreadable(format!("{}: {}", target.display(), e)))?;
        self.includes.insert(target.clone());
        self.chain.push(target.clone());
        let text = self.process(&target, &source)?;
        self.chain.pop();
        Ok(text)
    }

    /// Searches the including file's directory, then every include directory.
    fn resolve_include(
        &self,
        current: &Path,
        name: &str,
        pos: &Position,
    ) -> Result<PathBuf, ParseError> {
        let name_path = Path::new(name);
        let candidates: Vec<PathBuf> = match name_path.is_absolute() {
            true => vec![name_path.to_path_buf()],
            false => current
                .parent()
                .into_iter()
                .chain(self.include_dirs.iter().map(|d| d.as_path()))
                .map(|d| d.join(name_path))
                .collect(),
        };
        match candidates.iter().find(|c| c.is_file()) {
            Some(found) => Ok(PathBuf::standardize(found)),
            None => Err(ParseError::MissingInclude(
                pos.clone(),
                name.to_string(),
                candidates,
            )),
        }
    }
}

/// Replaces comments with blanks so positions in the remaining text are
/// unchanged. String literals are kept intact.
pub fn strip_comments(source: &str) -> Result<String, ParseError> {
    let mut train = TrainCar::new(source);
    let mut out = String::with_capacity(source.len());
    while let Some(c) = train.consume() {
        if c == '"' {
            out.push(c);
            copy_string(&mut train, &mut out);
        } else if c == '/' && train.peek() == Some(&'/') {
            out.push(' ');
            while let Some(d) = train.peek() {
                if d == &'\n' {
                    break;
                }
                train.consume();
                out.push(' ');
            }
        } else if c == '/' && train.peek() == Some(&'*') {
            let pos = train.locate().clone();
            train.consume();
            out.push_str("  ");
            let mut closed = false;
            while let Some(d) = train.consume() {
                if d == '*' && train.consume_if('/') == true {
                    out.push_str("  ");
                    closed = true;
                    break;
                }
                out.push(match d {
                    '\n' => '\n',
                    _ => ' ',
                });
            }
            if closed == false {
                return Err(ParseError::UnclosedBlockComment(pos));
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Replaces formal arguments in `body` with the actual arguments.
fn substitute(body: &str, params: &[(String, Option<String>)], args: &[String]) -> String {
    let lookup = |word: &str| -> Option<String> {
        let i = params.iter().position(|(p, _)| p == word)?;
        match args.get(i).filter(|a| a.is_empty() == false) {
            Some(a) => Some(a.clone()),
            None => Some(params[i].1.clone().unwrap_or_default()),
        }
    };
    let mut train = TrainCar::new(body);
    let mut out = String::with_capacity(body.len());
    // the char before the current one, `None` right after a token paste
    let mut prev: Option<char> = None;
    while let Some(c) = train.consume() {
        if c == '`' {
            out.push(c);
            match train.consume_if('`') {
                true => {
                    out.push('`');
                    prev = None;
                }
                false => prev = Some(c),
            }
            continue;
        }
        if c == '"' && prev != Some('`') {
            out.push(c);
            copy_string(&mut train, &mut out);
            prev = Some('"');
            continue;
        }
        if is_ident_start(Some(&c)) == true {
            let mut word = String::from(c);
            while let Some(d) = train.peek() {
                if is_ident_char(d) == false {
                    break;
                }
                word.push(*d);
                train.consume();
            }
            // directive and macro names are never arguments
            match prev == Some('`') {
                true => out.push_str(&word),
                false => out.push_str(&lookup(&word).unwrap_or(word)),
            }
            prev = out.chars().last();
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn is_ident_start(c: Option<&char>) -> bool {
    match c {
        Some(c) => c.is_ascii_alphabetic() || c == &'_',
        None => false,
    }
}

fn is_ident_char(c: &char) -> bool {
    c.is_ascii_alphanumeric() || c == &'_' || c == &'$'
}

fn read_identifier(train: &mut TrainCar) -> String {
    let mut word = String::new();
    while let Some(c) = train.peek() {
        if is_ident_char(c) == false {
            break;
        }
        word.push(*c);
        train.consume();
    }
    word
}

/// Skips spaces and tabs, but not line breaks.
fn skip_blanks(train: &mut TrainCar) {
    while let Some(c) = train.peek() {
        if c == &'\n' || c.is_whitespace() == false {
            break;
        }
        train.consume();
    }
}

fn skip_line(train: &mut TrainCar) {
    while let Some(c) = train.peek() {
        if c == &'\n' {
            break;
        }
        train.consume();
    }
}

fn read_line(train: &mut TrainCar) -> String {
    let mut line = String::new();
    while let Some(c) = train.peek() {
        if c == &'\n' {
            break;
        }
        line.push(*c);
        train.consume();
    }
    line
}

fn read_macro_name(train: &mut TrainCar, directive: &str, pos: &Position) -> Result<String, ParseError> {
    skip_blanks(train);
    match is_ident_start(train.peek()) {
        true => Ok(read_identifier(train)),
        false => Err(ParseError::MissingMacroName(pos.clone(), directive.to_string())),
    }
}

fn read_until(train: &mut TrainCar, end: char) -> Option<String> {
    let mut text = String::new();
    while let Some(c) = train.consume() {
        if c == end {
            return Some(text);
        } else if c == '\n' {
            return None;
        }
        text.push(c);
    }
    None
}

/// Copies the rest of a string literal whose opening quote was already taken.
fn copy_string(train: &mut TrainCar, out: &mut String) {
    while let Some(c) = train.consume() {
        out.push(c);
        if c == '\\' {
            if let Some(d) = train.consume() {
                out.push(d);
            }
        } else if c == '"' || c == '\n' {
            break;
        }
    }
}

/// Reads a parenthesized, comma separated list whose opening parenthesis was
/// already taken. Returns `None` if the list is never closed.
fn read_balanced(train: &mut TrainCar) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    while let Some(c) = train.consume() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' if depth == 0 => {
                items.push(current.trim().to_string());
                return Some(items);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
            }
            '"' => {
                current.push(c);
                copy_string(train, &mut current);
            }
            _ => current.push(c),
        }
    }
    None
}

/// Reads the actual arguments of a macro that declares formal arguments.
fn read_args(train: &mut TrainCar, name: &str, pos: &Position) -> Result<Vec<String>, ParseError> {
    while let Some(c) = train.peek() {
        if c.is_whitespace() == false {
            break;
        }
        train.consume();
    }
    match train.consume_if('(') {
        true => read_balanced(train)
            .ok_or_else(|| ParseError::UnclosedMacroArgs(pos.clone(), name.to_string())),
        false => Ok(Vec::new()),
    }
}

/// Drops a `pragma line, along with the whole region it opens if it begins
/// protected (encrypted) text.
fn skip_pragma(train: &mut TrainCar, pos: &Position) -> Result<(), ParseError> {
    let line = read_line(train);
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.first() != Some(&"protect") || words.contains(&"begin_protected") == false {
        return Ok(());
    }
    while train.is_empty() == false {
        train.consume();
        let next = read_line(train);
        let words: Vec<&str> = next.split_whitespace().collect();
        if words.first() == Some(&"`pragma") && words.contains(&"end_protected") {
            return Ok(());
        }
    }
    Err(ParseError::UnterminatedProtected(pos.clone()))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;

    fn run(src: &str) -> Result<String, ParseError> {
        let opts = AnalysisOptions::new();
        Preprocessor::new(&[], &opts)
            .run(Path::new("/virtual/top.v"), src)
            .map(|p| p.text)
    }

    fn squash(s: &str) -> String {
        s.split_whitespace().collect::<Vec<&str>>().join(" ")
    }

    #[test]
    fn strips_comments_but_not_strings() {
        let text = strip_comments("a // b\nc /* d\ne */ f \"// g\"").unwrap();
        assert_eq!(text, "a     \nc     \n     f \"// g\"");
        assert_eq!(
            strip_comments("x /* open").unwrap_err(),
            ParseError::UnclosedBlockComment(Position::place(1, 3))
        );
    }

    #[test]
    fn conditionals() {
        let src = "`define USE_FAST\n`ifdef USE_FAST\nfast\n`elsif OTHER\nother\n`else\nslow\n`endif\n`ifndef USE_FAST\nnot_fast\n`endif\n";
        assert_eq!(squash(&run(src).unwrap()), "fast");
    }

    #[test]
    fn nested_disabled_conditionals() {
        let src = "`ifdef NOPE\n`ifdef ALSO\na\n`else\nb\n`endif\n`else\nc\n`endif";
        assert_eq!(squash(&run(src).unwrap()), "c");
    }

    #[test]
    fn strings_in_disabled_regions_hide_directives() {
        let src = "`ifdef NOPE\n$display(\"`endif\");\n$display(\"\\\"`else\");\ndead\n`else\nlive\n`endif\n";
        assert_eq!(squash(&run(src).unwrap()), "live");
        // an active string keeps its text
        let src = "`ifndef NOPE\n$display(\"`endif\");\n`endif\n";
        assert_eq!(squash(&run(src).unwrap()), "$display(\"`endif\");");
    }

    #[test]
    fn unbalanced_conditionals() {
        assert_eq!(
            run("`endif").unwrap_err(),
            ParseError::UnbalancedConditional(Position::place(1, 1), "endif".to_string())
        );
        assert!(matches!(
            run("`else\n"),
            Err(ParseError::UnbalancedConditional(_, _))
        ));
        assert_eq!(
            run("\n`ifdef X\nfoo").unwrap_err(),
            ParseError::UnterminatedConditional(Position::place(2, 1), "ifdef".to_string())
        );
    }

    #[test]
    fn macro_with_arguments() {
        let src = "`define INST(T, N, W = 8) T #(.WIDTH(W)) N (.clk(clk));\n`INST(fifo, u_fifo)\n`INST(ram, u_ram, 16)";
        assert_eq!(
            squash(&run(src).unwrap()),
            "fifo #(.WIDTH(8)) u_fifo (.clk(clk)); ram #(.WIDTH(16)) u_ram (.clk(clk));"
        );
    }

    #[test]
    fn macro_continuation_and_nesting() {
        let src = "`define A adder\n`define B(x) `A x \\\n (.a(a))\n`B(u0);\n`undef A\n`B(u1);";
        assert_eq!(squash(&run(src).unwrap()), "adder u0 (.a(a)); u1 (.a(a));");
    }

    #[test]
    fn string_macros_and_pasting() {
        let src = "`define STR(x) `\"x`\"\n`define CAT(a, b) a``b\n`STR(hi) `CAT(my, _mod)";
        assert_eq!(squash(&run(src).unwrap()), "\"hi\" my_mod");
    }

    #[test]
    fn macro_depth_is_bounded() {
        let opts = AnalysisOptions::new().max_macro_depth(4);
        let err = Preprocessor::new(&[], &opts)
            .run(Path::new("/virtual/top.v"), "`define A `B\n`define B `A\n`A")
            .unwrap_err();
        assert_eq!(
            err,
            ParseError::MacroDepthExceeded(
                Position::place(3, 1),
                4,
                vec!["A", "B", "A", "B", "A"]
                    .into_iter()
                    .map(String::from)
                    .collect()
            )
        );
        assert!(err.to_string().contains("A -> B -> A -> B -> A"));
    }

    #[test]
    fn initial_defines() {
        let mut defines = BTreeMap::new();
        defines.insert("WIDTH".to_string(), "32".to_string());
        let opts = AnalysisOptions::new().defines(defines);
        let out = Preprocessor::new(&[], &opts)
            .run(Path::new("/virtual/top.v"), "`ifdef WIDTH\nw = `WIDTH;\n`endif")
            .unwrap();
        assert_eq!(squash(&out.text), "w = 32;");
    }

    #[test]
    fn dropped_directives() {
        let src = "`timescale 1ns/1ps\n`default_nettype none\n`resetall\nmodule m; endmodule\n`UNDEFINED";
        assert_eq!(squash(&run(src).unwrap()), "module m; endmodule");
    }

    #[test]
    fn protected_regions_are_dropped() {
        let src = "a\n`pragma protect begin_protected\n`pragma protect data_block\nXyZ==\n`pragma protect end_protected\nb";
        assert_eq!(squash(&run(src).unwrap()), "a b");
        assert!(matches!(
            run("`pragma protect begin_protected\nXyZ"),
            Err(ParseError::UnterminatedProtected(_))
        ));
        assert_eq!(squash(&run("`pragma once\nc").unwrap()), "c");
    }

    #[test]
    fn includes_are_inlined() {
        let dir = tempfile::tempdir().unwrap();
        let inc = dir.path().join("inc");
        fs::create_dir(&inc).unwrap();
        fs::write(inc.join("defs.vh"), "`define W 4\n`include \"more.vh\"\n").unwrap();
        fs::write(inc.join("more.vh"), "wire [`W-1:0] bus;\n").unwrap();
        let top = dir.path().join("top.v");
        let dirs = vec![inc.clone()];
        let opts = AnalysisOptions::new();
        let out = Preprocessor::new(&dirs, &opts)
            .run(&top, "`include \"defs.vh\"\nassign x = `W;\n")
            .unwrap();
        assert_eq!(
            out.includes,
            vec![
                PathBuf::standardize(inc.join("defs.vh")),
                PathBuf::standardize(inc.join("more.vh"))
            ]
        );
        let text: String = out
            .text
            .chars()
            .filter(|c| c != &INCLUDE_BEGIN && c != &INCLUDE_END)
            .collect();
        assert_eq!(squash(&text), "wire [4-1:0] bus; assign x = 4;");
    }

    #[test]
    fn include_failures() {
        let dir = tempfile::tempdir().unwrap();
        let top = dir.path().join("top.v");
        let opts = AnalysisOptions::new();
        assert!(matches!(
            Preprocessor::new(&[], &opts).run(&top, "`include \"nowhere.vh\""),
            Err(ParseError::MissingInclude(_, _, _))
        ));
        assert!(matches!(
            Preprocessor::new(&[], &opts).run(&top, "`include nowhere.vh"),
            Err(ParseError::MissingIncludeName(_))
        ));

        fs::write(dir.path().join("a.vh"), "`include \"b.vh\"\n").unwrap();
        fs::write(dir.path().join("b.vh"), "`include \"a.vh\"\n").unwrap();
        assert!(matches!(
            Preprocessor::new(&[], &opts).run(&top, "`include \"a.vh\""),
            Err(ParseError::IncludeCycle(_, _))
        ));

        fs::write(dir.path().join("c.vh"), "`include \"d.vh\"\n").unwrap();
        fs::write(dir.path().join("d.vh"), "wire d;\n").unwrap();
        let shallow = AnalysisOptions::new().max_include_depth(1);
        assert_eq!(
            Preprocessor::new(&[], &shallow)
                .run(&top, "`include \"c.vh\"")
                .unwrap_err(),
            ParseError::IncludeDepthExceeded(Position::place(1, 1), 1)
        );
    }
}

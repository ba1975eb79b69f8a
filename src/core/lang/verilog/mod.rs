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

pub mod keyword;
pub mod preprocess;
pub mod token;

use super::error::ParseError;
use super::relation::{qualify, Relation, RelationKind, RelationSet};
use super::{AnalysisOptions, Dialect, Extraction};
use preprocess::Preprocessor;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use token::VerilogToken;

/// The package every SystemVerilog compilation unit imports implicitly.
const BUILTIN_PACKAGE: &str = "std";

/// Preprocesses and scans a Verilog or SystemVerilog file.
///
/// The file uses `include on every file it pulls in. Header files never
/// provide design units; those belong to the files that include them.
pub fn extract(
    path: &Path,
    source: &str,
    dialect: Dialect,
    library: &str,
    include_dirs: &[PathBuf],
    opts: &AnalysisOptions,
) -> Result<Extraction, ParseError> {
    let pre = Preprocessor::new(include_dirs, opts).run(path, source)?;
    let tokens = token::tokenize(&pre.text);
    let mut relations = VerilogExtractor::new(&tokens, library, dialect.is_header()).run();
    for inc in &pre.includes {
        relations.insert(Relation::uses(
            RelationKind::Include,
            inc.to_string_lossy().to_string(),
        ));
    }
    Ok(Extraction {
        relations: relations,
        includes: pre.includes,
    })
}

struct VerilogExtractor<'a> {
    tokens: &'a [VerilogToken],
    library: &'a str,
    is_header: bool,
    /// Classes and typedefs declared in this file; `NAME::` on them is not a
    /// package reference.
    local_types: HashSet<&'a str>,
    relations: RelationSet,
}

impl<'a> VerilogExtractor<'a> {
    fn new(tokens: &'a [VerilogToken], library: &'a str, is_header: bool) -> Self {
        Self {
            tokens: tokens,
            library: library,
            is_header: is_header,
            local_types: HashSet::new(),
            relations: RelationSet::new(),
        }
    }

    fn get(&self, i: usize) -> Option<&'a VerilogToken> {
        self.tokens.get(i)
    }

    fn is_symbol(&self, i: usize, c: char) -> bool {
        self.get(i).map(|t| t.check_symbol(c)).unwrap_or(false)
    }

    fn is_keyword(&self, i: usize, kw: &str) -> bool {
        self.get(i).map(|t| t.check_keyword(kw)).unwrap_or(false)
    }

    fn name_at(&self, i: usize) -> Option<&'a str> {
        self.get(i)?.as_name()
    }

    fn run(mut self) -> RelationSet {
        self.collect_local_types();
        let tokens = self.tokens;
        // units declared in included text belong to the compilation unit
        let provides = self.is_header == false;
        for (i, tk) in tokens.iter().enumerate() {
            match tk {
                VerilogToken::Identifier(w) => {
                    if keyword::is_design_element(w) == true {
                        if provides == true {
                            self.parse_design_element(i);
                        }
                    } else if w == "package" {
                        if let (true, Some(name)) = (provides, self.declared_name(i + 1)) {
                            let name = qualify(None, name, self.library);
                            self.relations.insert(Relation::provide(RelationKind::Package, name));
                        }
                    } else if self.get(i + 1) == Some(&VerilogToken::ScopeResolution) {
                        self.parse_scope(i);
                    } else {
                        self.parse_instantiation(i);
                    }
                }
                VerilogToken::Escaped(_) => self.parse_instantiation(i),
                _ => (),
            }
        }
        self.relations
    }

    /// Skips a lifetime qualifier and returns the declared name at `i`.
    fn declared_name(&self, i: usize) -> Option<&'a str> {
        match self.is_keyword(i, "automatic") || self.is_keyword(i, "static") {
            true => self.name_at(i + 1),
            false => self.name_at(i),
        }
    }

    fn parse_design_element(&mut self, i: usize) {
        // `virtual interface` and `interface class` are not design elements
        if i > 0 && self.is_keyword(i - 1, "virtual") {
            return;
        }
        if self.is_keyword(i + 1, "class") {
            return;
        }
        if let Some(name) = self.declared_name(i + 1) {
            let name = qualify(None, name, self.library);
            self.relations
                .insert(Relation::provide(RelationKind::Architecture, name));
        }
    }

    /// Records `NAME::` as a package use.
    fn parse_scope(&mut self, i: usize) {
        // only the leftmost name of a scope chain can be a package
        if i > 0 && self.get(i - 1) == Some(&VerilogToken::ScopeResolution) {
            return;
        }
        let name = match self.name_at(i) {
            Some(n) => n,
            None => return,
        };
        if name == BUILTIN_PACKAGE || self.local_types.contains(name) == true {
            return;
        }
        let name = qualify(None, name, self.library);
        self.relations.insert(Relation::uses(RelationKind::Package, name));
    }

    /// Records `TYPE [#(...)] INST [range] (` as a module use.
    fn parse_instantiation(&mut self, i: usize) {
        let unit = match self.name_at(i) {
            Some(n) => n,
            None => return,
        };
        if self.at_statement_start(i) == false {
            return;
        }
        let mut j = i + 1;
        if self.is_symbol(j, '#') {
            j += 1;
            j = match self.is_symbol(j, '(') {
                true => self.skip_group(j, '(', ')'),
                false => j + 1,
            };
        }
        if self.name_at(j).is_none() {
            return;
        }
        j += 1;
        while self.is_symbol(j, '[') {
            j = self.skip_group(j, '[', ']');
        }
        if self.is_symbol(j, '(') {
            let name = qualify(None, unit, self.library);
            self.relations
                .insert(Relation::uses(RelationKind::Architecture, name));
        }
    }

    /// Checks if the token at `i` can begin a module item.
    fn at_statement_start(&self, i: usize) -> bool {
        if i == 0 {
            return true;
        }
        match &self.tokens[i - 1] {
            VerilogToken::Symbol(';') | VerilogToken::Symbol(')') | VerilogToken::Symbol(':') => {
                true
            }
            VerilogToken::IncludeBegin | VerilogToken::IncludeEnd => true,
            VerilogToken::Identifier(w) => match w.as_str() {
                "begin" | "generate" | "else" => true,
                kw if kw.starts_with("end") && keyword::is_keyword(kw) => true,
                // a named block: `begin : label`
                _ => i >= 3 && self.is_symbol(i - 2, ':') && self.is_keyword(i - 3, "begin"),
            },
            _ => false,
        }
    }

    /// Returns the index after the group that opens at `i`.
    fn skip_group(&self, i: usize, open: char, close: char) -> usize {
        let mut depth = 0usize;
        let mut j = i;
        while j < self.tokens.len() {
            if self.is_symbol(j, open) {
                depth += 1;
            } else if self.is_symbol(j, close) {
                depth -= 1;
                if depth == 0 {
                    return j + 1;
                }
            }
            j += 1;
        }
        j
    }

    /// Finds the classes and type definitions declared in this file.
    fn collect_local_types(&mut self) {
        let mut i = 0;
        while i < self.tokens.len() {
            if self.is_keyword(i, "class") {
                if let Some(name) = self.declared_name(i + 1) {
                    self.local_types.insert(name);
                }
            } else if self.is_keyword(i, "typedef") {
                // the declared name is the last one before the closing ';'
                let mut depth = 0isize;
                let mut last = None;
                let mut j = i + 1;
                while let Some(t) = self.get(j) {
                    match t {
                        VerilogToken::Symbol('{') | VerilogToken::Symbol('(') => depth += 1,
                        VerilogToken::Symbol('}') | VerilogToken::Symbol(')') => depth -= 1,
                        VerilogToken::Symbol(';') if depth <= 0 => break,
                        _ => {
                            if depth <= 0 {
                                if let Some(n) = t.as_name() {
                                    last = Some(n);
                                }
                            }
                        }
                    }
                    j += 1;
                }
                if let Some(name) = last {
                    self.local_types.insert(name);
                }
                i = j;
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn scan(src: &str, dialect: Dialect) -> RelationSet {
        extract(
            Path::new("/virtual/src.sv"),
            src,
            dialect,
            "lib",
            &[],
            &AnalysisOptions::new(),
        )
        .unwrap()
        .relations
    }

    fn provide(kind: RelationKind, name: &str) -> Relation {
        Relation::provide(kind, name.to_string())
    }

    fn uses(kind: RelationKind, name: &str) -> Relation {
        Relation::uses(kind, name.to_string())
    }

    #[test]
    fn modules_and_instances() {
        let src = r#"
`timescale 1ns/1ps
module Top #(parameter W = 8) (input clk, output [W-1:0] q);
    wire [W-1:0] d;
    Counter #(.W(W)) u_cnt (.clk(clk), .q(d));
    Reg r0 [3:0] (clk, d, q);
    and g1 (q[0], d[0], d[1]);
    always @(posedge clk) begin
        $display("Fake u_fake (x)");
    end
    generate
        if (W > 4) begin : wide
            Widener u_w (.d(d));
        end
    endgenerate
endmodule

macromodule helper; endmodule
"#;
        let rels = scan(src, Dialect::Verilog);
        let expected: RelationSet = vec![
            provide(RelationKind::Architecture, "lib.top"),
            provide(RelationKind::Architecture, "lib.helper"),
            uses(RelationKind::Architecture, "lib.counter"),
            uses(RelationKind::Architecture, "lib.reg"),
            uses(RelationKind::Architecture, "lib.widener"),
        ]
        .into_iter()
        .collect();
        assert_eq!(rels, expected);
    }

    #[test]
    fn functions_are_not_instances() {
        let src = "module m; function my_t f(input x); endfunction\n initial do_it(1);\nendmodule";
        let rels = scan(src, Dialect::SystemVerilog);
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn packages_and_scopes() {
        let src = r#"
package automatic defs_pkg;
    typedef struct packed { logic a; } pair_t;
endpackage

class Base; static function int f(); return 1; endfunction endclass
typedef enum { A, B } mode_t;

module top;
    import defs_pkg::*;
    import std::*;
    logic [bus_pkg::WIDTH-1:0] data;
    int x = Base::f();
    mode_t m = mode_t'(0);
    virtual interface bus_if vif;
endmodule

interface bus_if; endinterface
interface class Printable; endclass
"#;
        let rels = scan(src, Dialect::SystemVerilog);
        let expected: RelationSet = vec![
            provide(RelationKind::Package, "lib.defs_pkg"),
            provide(RelationKind::Architecture, "lib.top"),
            provide(RelationKind::Architecture, "lib.bus_if"),
            uses(RelationKind::Package, "lib.defs_pkg"),
            uses(RelationKind::Package, "lib.bus_pkg"),
        ]
        .into_iter()
        .collect();
        assert_eq!(rels, expected);
    }

    #[test]
    fn macro_generated_instances() {
        let src = "`define MAKE(T) T u_``T (.clk(clk));\nmodule top; `MAKE(fifo) endmodule";
        let rels = scan(src, Dialect::Verilog);
        assert!(rels.contains(&uses(RelationKind::Architecture, "lib.fifo")));
    }

    #[test]
    fn headers_provide_no_units() {
        let rels = scan(
            "module in_header; sub u (.a(a)); endmodule\npackage hp; endpackage",
            Dialect::SystemVerilogHeader,
        );
        let expected: RelationSet = vec![uses(RelationKind::Architecture, "lib.sub")]
            .into_iter()
            .collect();
        assert_eq!(rels, expected);
    }

    #[test]
    fn include_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let defs = dir.path().join("defs.vh");
        let extra = dir.path().join("extra.vh");
        fs::write(&defs, "`include \"extra.vh\"\n`define LEAF leaf\n").unwrap();
        fs::write(&extra, "module hidden; endmodule\n").unwrap();
        let top = dir.path().join("top.v");
        let src = "`include \"defs.vh\"\nmodule top; `LEAF u (); endmodule\n";
        let ex = extract(&top, src, Dialect::Verilog, "work", &[], &AnalysisOptions::new())
            .unwrap();
        assert_eq!(ex.includes, vec![defs.clone(), extra.clone()]);
        let expected: RelationSet = vec![
            uses(RelationKind::Include, &defs.to_string_lossy()),
            uses(RelationKind::Include, &extra.to_string_lossy()),
            provide(RelationKind::Architecture, "work.hidden"),
            provide(RelationKind::Architecture, "work.top"),
            uses(RelationKind::Architecture, "work.leaf"),
        ]
        .into_iter()
        .collect();
        assert_eq!(ex.relations, expected);
    }
}

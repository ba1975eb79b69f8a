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

pub mod token;

use super::error::ParseError;
use super::relation::{qualify, Relation, RelationKind, RelationSet};
use token::{Delimiter, VhdlToken};

/// Collects the design units a VHDL file declares and the units it refers to.
///
/// Names are qualified with `library` wherever the source says `work` or
/// leaves the library out.
pub fn extract(source: &str, library: &str) -> Result<RelationSet, ParseError> {
    let tokens: Vec<VhdlToken> = token::tokenize(source)?
        .into_iter()
        .map(|t| t.take())
        .collect();
    Ok(VhdlExtractor::new(&tokens, library).run())
}

struct VhdlExtractor<'a> {
    tokens: &'a [VhdlToken],
    library: &'a str,
    relations: RelationSet,
    in_architecture: bool,
}

impl<'a> VhdlExtractor<'a> {
    fn new(tokens: &'a [VhdlToken], library: &'a str) -> Self {
        Self {
            tokens: tokens,
            library: library,
            relations: RelationSet::new(),
            in_architecture: false,
        }
    }

    fn get(&self, i: usize) -> Option<&'a VhdlToken> {
        self.tokens.get(i)
    }

    fn is_word(&self, i: usize, kw: &str) -> bool {
        self.get(i).map(|t| t.check_word(kw)).unwrap_or(false)
    }

    fn is_delimiter(&self, i: usize, d: Delimiter) -> bool {
        self.get(i).map(|t| t.check_delimiter(d)).unwrap_or(false)
    }

    fn name_at(&self, i: usize) -> Option<&'a str> {
        self.get(i)?.as_name()
    }

    fn provide(&mut self, kind: RelationKind, unit: &str) {
        let name = qualify(None, unit, self.library);
        self.relations.insert(Relation::provide(kind, name));
    }

    fn uses(&mut self, kind: RelationKind, lib: Option<&str>, unit: &str) {
        let name = qualify(lib, unit, self.library);
        self.relations.insert(Relation::uses(kind, name));
    }

    /// Reads a dotted name starting at `i`.
    ///
    /// Returns the name parts and the index of the token after the name.
    fn selected_name(&self, mut i: usize) -> (Vec<&'a str>, usize) {
        let mut parts = Vec::new();
        loop {
            match self.get(i) {
                Some(VhdlToken::Word(w)) => parts.push(w.as_str()),
                Some(VhdlToken::Extended(e)) => parts.push(e.as_str()),
                _ => break,
            }
            i += 1;
            match self.is_delimiter(i, Delimiter::Dot) {
                true => i += 1,
                false => break,
            }
        }
        (parts, i)
    }

    fn run(mut self) -> RelationSet {
        let mut i = 0;
        while i < self.tokens.len() {
            // closing statements restate the unit kind
            let after_end = i > 0 && self.is_word(i - 1, "end");
            i = if after_end == true {
                i + 1
            } else if self.is_word(i, "use") {
                self.parse_use_clause(i + 1)
            } else if self.is_word(i, "context") {
                self.parse_context(i + 1)
            } else if self.is_word(i, "package") {
                self.parse_package(i + 1)
            } else if self.is_word(i, "entity") && self.is_word(i + 2, "is") {
                if let Some(name) = self.name_at(i + 1) {
                    self.provide(RelationKind::Entity, name);
                }
                self.in_architecture = false;
                i + 3
            } else if self.is_word(i, "architecture") && self.is_word(i + 2, "of") {
                if let Some(entity) = self.name_at(i + 3) {
                    self.provide(RelationKind::Architecture, entity);
                    self.uses(RelationKind::Entity, None, entity);
                }
                self.in_architecture = true;
                i + 4
            } else if self.is_word(i, "configuration") && self.is_word(i + 2, "of") {
                if let Some(entity) = self.name_at(i + 3) {
                    self.uses(RelationKind::Entity, None, entity);
                }
                self.in_architecture = false;
                i + 4
            } else if self.in_architecture == true
                && self.is_delimiter(i + 1, Delimiter::Colon)
                && self.name_at(i).is_some()
            {
                self.parse_instantiation(i + 2)
            } else {
                i + 1
            };
        }
        self.relations
    }

    /// Handles `use L.U.x, ...;` and the binding form `use entity L.U`.
    fn parse_use_clause(&mut self, mut i: usize) -> usize {
        if self.is_word(i, "entity") {
            let (parts, next) = self.selected_name(i + 1);
            self.use_design_unit(&parts);
            return next;
        }
        if self.is_word(i, "configuration") {
            return i + 1;
        }
        loop {
            let (parts, next) = self.selected_name(i);
            if parts.len() >= 2 && parts[1] != "all" {
                self.uses(RelationKind::Package, Some(parts[0]), parts[1]);
            }
            i = next;
            match self.is_delimiter(i, Delimiter::Comma) {
                true => i += 1,
                false => break,
            }
        }
        i
    }

    /// Handles both the context declaration and the context reference.
    fn parse_context(&mut self, i: usize) -> usize {
        if self.is_word(i + 1, "is") {
            if let Some(name) = self.name_at(i) {
                self.provide(RelationKind::Package, name);
            }
            return i + 2;
        }
        let mut i = i;
        loop {
            let (parts, next) = self.selected_name(i);
            if parts.len() >= 2 {
                self.uses(RelationKind::Package, Some(parts[0]), parts[1]);
            }
            i = next;
            match self.is_delimiter(i, Delimiter::Comma) {
                true => i += 1,
                false => break,
            }
        }
        i
    }

    fn parse_package(&mut self, i: usize) -> usize {
        self.in_architecture = false;
        if self.is_word(i, "body") {
            if let Some(name) = self.name_at(i + 1) {
                self.uses(RelationKind::Package, None, name);
            }
            return i + 2;
        }
        let name = match (self.name_at(i), self.is_word(i + 1, "is")) {
            (Some(n), true) => n,
            _ => return i,
        };
        self.provide(RelationKind::Package, name);
        // package instantiation: `package P is new L.G generic map (...)`
        if self.is_word(i + 2, "new") {
            let (parts, next) = self.selected_name(i + 3);
            match parts.len() {
                0 => (),
                1 => self.uses(RelationKind::Package, None, parts[0]),
                _ => self.uses(RelationKind::Package, Some(parts[0]), parts[1]),
            }
            return next;
        }
        i + 2
    }

    /// Called with `i` pointing after `label :`.
    fn parse_instantiation(&mut self, i: usize) -> usize {
        if self.is_word(i, "entity") {
            let (parts, next) = self.selected_name(i + 1);
            self.use_design_unit(&parts);
            return next;
        }
        let start = match self.is_word(i, "component") {
            true => i + 1,
            false => i,
        };
        // reserved words begin processes, blocks, generates, and declarations
        if self.name_at(start).is_none() {
            return i;
        }
        let (parts, next) = self.selected_name(start);
        if self.is_word(next, "port") || self.is_word(next, "generic") {
            self.use_design_unit(&parts);
        }
        next
    }

    fn use_design_unit(&mut self, parts: &[&str]) {
        match parts.len() {
            0 => (),
            1 => self.uses(RelationKind::Architecture, None, parts[0]),
            _ => self.uses(RelationKind::Architecture, Some(parts[0]), parts[1]),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rel(provide: bool, kind: RelationKind, name: &str) -> Relation {
        match provide {
            true => Relation::provide(kind, name.to_string()),
            false => Relation::uses(kind, name.to_string()),
        }
    }

    #[test]
    fn entity_and_architecture() {
        let src = r#"
library ieee;
use ieee.std_logic_1164.all;
use work.util_pkg.all;

entity Adder is
    port (a, b : in std_logic; y : out std_logic);
end entity Adder;

architecture rtl of adder is
    signal s : std_logic := '0';
begin
    u0 : half_adder port map (a => a, b => b, s => s);
    u1 : entity work.xor_gate(rtl) port map (a, b, y);
    u2 : component and_gate generic map (W => 1) port map (a, b, s);
    gen : for i in 0 to 1 generate
    end generate;
    p : process (a) begin end process;
end architecture rtl;
"#;
        let rels = extract(src, "mylib").unwrap();
        let expected: RelationSet = vec![
            rel(false, RelationKind::Package, "ieee.std_logic_1164"),
            rel(false, RelationKind::Package, "mylib.util_pkg"),
            rel(true, RelationKind::Entity, "mylib.adder"),
            rel(true, RelationKind::Architecture, "mylib.adder"),
            rel(false, RelationKind::Entity, "mylib.adder"),
            rel(false, RelationKind::Architecture, "mylib.half_adder"),
            rel(false, RelationKind::Architecture, "mylib.xor_gate"),
            rel(false, RelationKind::Architecture, "mylib.and_gate"),
        ]
        .into_iter()
        .collect();
        assert_eq!(rels, expected);
    }

    #[test]
    fn packages_and_bodies() {
        let src = r#"
package Defs is
    constant W : natural := 8;
end package Defs;

package body defs is
end package body;

package inst is new other.generic_pkg generic map (N => 4);
"#;
        let rels = extract(src, "lib").unwrap();
        assert!(rels.contains(&rel(true, RelationKind::Package, "lib.defs")));
        assert!(rels.contains(&rel(false, RelationKind::Package, "lib.defs")));
        assert!(rels.contains(&rel(true, RelationKind::Package, "lib.inst")));
        assert!(rels.contains(&rel(false, RelationKind::Package, "other.generic_pkg")));
        assert_eq!(rels.len(), 4);
    }

    #[test]
    fn contexts() {
        let src = "context bundle is\n library ieee; use ieee.numeric_std.all;\nend context;\ncontext work.bundle;";
        let rels = extract(src, "lib").unwrap();
        assert!(rels.contains(&rel(true, RelationKind::Package, "lib.bundle")));
        assert!(rels.contains(&rel(false, RelationKind::Package, "lib.bundle")));
        assert!(rels.contains(&rel(false, RelationKind::Package, "ieee.numeric_std")));
    }

    #[test]
    fn multiple_use_clauses() {
        let rels = extract("use ieee.math_real.all, Work.Types;", "lib").unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels.contains(&rel(false, RelationKind::Package, "lib.types")));
        assert!(rels.contains(&rel(false, RelationKind::Package, "ieee.math_real")));
    }

    #[test]
    fn commented_units_are_ignored() {
        let src = "-- entity ghost is\n/* package phantom is */\nentity real is end;";
        let rels = extract(src, "lib").unwrap();
        assert_eq!(rels.len(), 1);
        assert!(rels.contains(&rel(true, RelationKind::Entity, "lib.real")));
    }

    #[test]
    fn ports_outside_architectures_are_not_instances() {
        let src = "entity e is port (clk : in bit); end entity;";
        let rels = extract(src, "lib").unwrap();
        assert_eq!(rels.len(), 1);
    }
}

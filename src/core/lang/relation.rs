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

use serde_derive::Serialize;
use std::collections::BTreeSet;
use std::fmt::Display;

/// The library name that always refers to the library of the file using it.
pub const WORK_LIBRARY: &str = "work";

pub type RelationSet = BTreeSet<Relation>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Provide,
    Use,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Entity,
    Package,
    /// A VHDL architecture or a Verilog module; both are instantiated the same way.
    Architecture,
    Include,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Entity => "entity",
                Self::Package => "package",
                Self::Architecture => "module",
                Self::Include => "include",
            }
        )
    }
}

/// A named capability that a source file either exposes or requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Relation {
    direction: Direction,
    kind: RelationKind,
    name: String,
}

impl Relation {
    pub fn provide(kind: RelationKind, name: String) -> Self {
        Self {
            direction: Direction::Provide,
            kind: kind,
            name: name,
        }
    }

    pub fn uses(kind: RelationKind, name: String) -> Self {
        Self {
            direction: Direction::Use,
            kind: kind,
            name: name,
        }
    }

    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    pub fn get_kind(&self) -> RelationKind {
        self.kind
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn is_use(&self) -> bool {
        self.direction == Direction::Use
    }

    pub fn is_provide(&self) -> bool {
        self.direction == Direction::Provide
    }

    /// Checks if `self` (a use) is satisfied by `other` (a provide).
    pub fn is_satisfied_by(&self, other: &Relation) -> bool {
        self.is_use() && other.is_provide() && self.kind == other.kind && self.name == other.name
    }

    /// Returns the matching provide relation for a use.
    pub fn to_provide(&self) -> Relation {
        Relation::provide(self.kind, self.name.clone())
    }

    /// References the library component of a `library.unit` name.
    ///
    /// Include relations never have a library.
    pub fn get_library(&self) -> Option<&str> {
        match self.kind {
            RelationKind::Include => None,
            _ => self.name.split_once('.').map(|(lib, _)| lib),
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = match self.direction {
            Direction::Provide => "provides",
            Direction::Use => "uses",
        };
        write!(f, "{} {} {}", dir, self.kind, self.name)
    }
}

/// Builds a normalized `library.unit` name.
///
/// A `library` of `work` is replaced by the file's `own` library.
pub fn qualify(library: Option<&str>, unit: &str, own: &str) -> String {
    let lib = match library {
        Some(l) if l.eq_ignore_ascii_case(WORK_LIBRARY) == false => l,
        _ => own,
    };
    format!("{}.{}", lib.to_lowercase(), unit.to_lowercase())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn qualify_resolves_work() {
        assert_eq!(qualify(Some("work"), "Foo", "mylib"), "mylib.foo");
        assert_eq!(qualify(Some("WORK"), "foo", "mylib"), "mylib.foo");
        assert_eq!(qualify(None, "foo", "mylib"), "mylib.foo");
        assert_eq!(qualify(Some("IEEE"), "Numeric_Std", "mylib"), "ieee.numeric_std");
    }

    #[test]
    fn satisfaction_needs_kind_and_name() {
        let u = Relation::uses(RelationKind::Package, "lib.pkg".to_string());
        let p = Relation::provide(RelationKind::Package, "lib.pkg".to_string());
        let e = Relation::provide(RelationKind::Entity, "lib.pkg".to_string());
        assert_eq!(u.is_satisfied_by(&p), true);
        assert_eq!(u.is_satisfied_by(&e), false);
        assert_eq!(p.is_satisfied_by(&u), false);
        assert_eq!(u.to_provide(), p);
        assert_eq!(u.get_library(), Some("lib"));
        assert_ne!(u, p);
    }

    #[test]
    fn includes_have_no_library() {
        let r = Relation::uses(RelationKind::Include, "/rtl/defs.vh".to_string());
        assert_eq!(r.get_library(), None);
        assert_eq!(r.to_string(), "uses include /rtl/defs.vh");
    }
}

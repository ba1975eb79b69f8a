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

use indexmap::IndexMap;
use serde_derive::Serialize;
use std::fmt::Display;

/// Maps option names to their resolved values, in the order they were bound.
pub type OptionMap = IndexMap<String, Value>;

/// A value produced by a manifest script.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Dict(IndexMap<String, Value>),
}

impl Value {
    /// Returns the script-level name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
        }
    }

    pub fn is_none(&self) -> bool {
        self == &Self::None
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Evaluates the value in a boolean context.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => s.is_empty() == false,
            Self::List(l) => l.is_empty() == false,
            Self::Dict(d) => d.is_empty() == false,
        }
    }

    /// Flattens a `str` or a `list` of `str` into a list of strings.
    ///
    /// Returns `None` if any element is not a string.
    pub fn to_str_list(&self) -> Option<Vec<String>> {
        match self {
            Self::None => Some(Vec::new()),
            Self::Str(s) => Some(vec![s.clone()]),
            Self::List(l) => l.iter().map(|v| v.as_str().map(String::from)).collect(),
            _ => None,
        }
    }

    /// Writes the value the way the script's `repr` shows it.
    fn write_repr(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            _ => write!(f, "{}", self),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(i) => write!(f, "{}", i),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    v.write_repr(f)?;
                }
                write!(f, "]")
            }
            Self::Dict(d) => {
                write!(f, "{{")?;
                for (i, (k, v)) in d.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}': ", k)?;
                    v.write_repr(f)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Vec<&str>> for Value {
    fn from(l: Vec<&str>) -> Self {
        Self::List(l.into_iter().map(Value::from).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_like_a_script() {
        let mut d = IndexMap::new();
        d.insert("local".to_string(), Value::from(vec!["../a", "b"]));
        let v = Value::List(vec![Value::Int(1), Value::Bool(true), Value::None, Value::Dict(d)]);
        assert_eq!(v.to_string(), "[1, True, None, {'local': ['../a', 'b']}]");
        assert_eq!(Value::from("plain").to_string(), "plain");
    }

    #[test]
    fn string_lists() {
        assert_eq!(Value::from("a.vhd").to_str_list(), Some(vec!["a.vhd".to_string()]));
        assert_eq!(Value::None.to_str_list(), Some(vec![]));
        assert_eq!(Value::List(vec![Value::Int(1)]).to_str_list(), None);
        assert_eq!(Value::Int(3).to_str_list(), None);
    }

    #[test]
    fn truthiness() {
        assert_eq!(Value::Str(String::new()).is_truthy(), false);
        assert_eq!(Value::List(vec![Value::None]).is_truthy(), true);
        assert_eq!(Value::Int(0).is_truthy(), false);
    }

    #[test]
    fn serializes_as_plain_json() {
        let v = Value::List(vec![Value::from("x"), Value::None, Value::Int(2)]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[\"x\",null,2]");
    }
}

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

use super::value::{OptionMap, Value};
use std::fmt::Display;

/// Names that start with this prefix are private to the manifest declaring them.
pub const PRIVATE_PREFIX: &str = "__";

/// Options that describe a single module and are never inherited by its children.
pub const PURGE_SET: [&str; 6] = [
    "modules",
    "files",
    "include_dirs",
    "library",
    "incl_makefiles",
    "sim_only_files",
];

/// The keys accepted by the `modules` option, one per module source kind.
pub const MODULE_KEYS: [&str; 4] = ["local", "svn", "git", "git_submodule"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionType {
    None,
    Bool,
    Int,
    Str,
    List,
    Dict,
}

impl OptionType {
    fn of(value: &Value) -> Self {
        match value {
            Value::None => Self::None,
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Str(_) => Self::Str,
            Value::List(_) => Self::List,
            Value::Dict(_) => Self::Dict,
        }
    }
}

impl Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "None",
                Self::Bool => "bool",
                Self::Int => "int",
                Self::Str => "str",
                Self::List => "list",
                Self::Dict => "dict",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    None,
    Str(&'static str),
    EmptyList,
    EmptyDict,
}

impl DefaultValue {
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::None,
            Self::Str(s) => Value::Str(s.to_string()),
            Self::EmptyList => Value::List(Vec::new()),
            Self::EmptyDict => Value::Dict(Default::default()),
        }
    }
}

/// The declaration of one recognized manifest option.
#[derive(Debug, PartialEq)]
pub struct OptionSpec {
    name: &'static str,
    types: &'static [OptionType],
    default: DefaultValue,
    keys: Option<&'static [&'static str]>,
}

impl OptionSpec {
    const fn new(name: &'static str, types: &'static [OptionType], default: DefaultValue) -> Self {
        Self {
            name: name,
            types: types,
            default: default,
            keys: None,
        }
    }

    const fn with_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn get_name(&self) -> &'static str {
        self.name
    }

    pub fn get_default(&self) -> Value {
        self.default.to_value()
    }

    pub fn get_keys(&self) -> Option<&'static [&'static str]> {
        self.keys
    }

    /// Checks if `value` carries one of the accepted types.
    ///
    /// `None` is always accepted for options that default to `None`.
    pub fn accepts(&self, value: &Value) -> bool {
        (value.is_none() == true && self.default == DefaultValue::None)
            || self.types.contains(&OptionType::of(value))
    }

    /// Lists the accepted types, for error messages.
    pub fn describe_types(&self) -> String {
        self.types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<String>>()
            .join(" or ")
    }
}

use OptionType as T;

const STR: &[OptionType] = &[T::Str];
const STR_OR_LIST: &[OptionType] = &[T::Str, T::List];
const LIST: &[OptionType] = &[T::List];
const DICT: &[OptionType] = &[T::Dict];

/// Every option a manifest may set with a fixed meaning.
pub const SCHEMA: &[OptionSpec] = &[
    // fetching
    OptionSpec::new("fetchto", STR, DefaultValue::None),
    OptionSpec::new("fetch_pre_cmd", STR, DefaultValue::Str("")),
    OptionSpec::new("fetch_post_cmd", STR, DefaultValue::Str("")),
    OptionSpec::new("modules", DICT, DefaultValue::EmptyDict).with_keys(&MODULE_KEYS),
    // sources
    OptionSpec::new("files", STR_OR_LIST, DefaultValue::EmptyList),
    OptionSpec::new("include_dirs", STR_OR_LIST, DefaultValue::EmptyList),
    OptionSpec::new("library", STR, DefaultValue::Str("work")),
    OptionSpec::new("incl_makefiles", STR_OR_LIST, DefaultValue::EmptyList),
    OptionSpec::new("sim_only_files", STR_OR_LIST, DefaultValue::EmptyList),
    OptionSpec::new("language", STR, DefaultValue::None),
    // flow selection
    OptionSpec::new("action", STR, DefaultValue::Str("")),
    OptionSpec::new("top_module", STR, DefaultValue::None),
    // simulation
    OptionSpec::new("sim_top", STR, DefaultValue::None),
    OptionSpec::new("sim_tool", STR, DefaultValue::None),
    OptionSpec::new("sim_path", STR, DefaultValue::None),
    OptionSpec::new("sim_pre_cmd", STR, DefaultValue::None),
    OptionSpec::new("sim_post_cmd", STR, DefaultValue::None),
    OptionSpec::new("vcom_opt", STR, DefaultValue::None),
    OptionSpec::new("vlog_opt", STR, DefaultValue::None),
    OptionSpec::new("vmap_opt", STR, DefaultValue::None),
    OptionSpec::new("vsim_opt", STR, DefaultValue::None),
    OptionSpec::new("ghdl_opt", STR, DefaultValue::None),
    OptionSpec::new("iverilog_opt", STR, DefaultValue::None),
    // synthesis
    OptionSpec::new("syn_top", STR, DefaultValue::None),
    OptionSpec::new("syn_tool", STR, DefaultValue::None),
    OptionSpec::new("syn_path", STR, DefaultValue::None),
    OptionSpec::new("syn_device", STR, DefaultValue::None),
    OptionSpec::new("syn_grade", STR, DefaultValue::None),
    OptionSpec::new("syn_package", STR, DefaultValue::None),
    OptionSpec::new("syn_family", STR, DefaultValue::None),
    OptionSpec::new("syn_project", STR, DefaultValue::None),
    OptionSpec::new("syn_properties", LIST, DefaultValue::None),
    OptionSpec::new("syn_pre_project_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_post_project_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_pre_synthesize_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_post_synthesize_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_pre_translate_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_post_translate_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_pre_map_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_post_map_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_pre_par_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_post_par_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_pre_bitstream_cmd", STR, DefaultValue::None),
    OptionSpec::new("syn_post_bitstream_cmd", STR, DefaultValue::None),
];

pub fn lookup(name: &str) -> Option<&'static OptionSpec> {
    SCHEMA.iter().find(|s| s.name == name)
}

/// A reason a set of bindings does not fit the schema.
#[derive(Debug, PartialEq)]
pub enum SchemaViolation {
    /// (option, expected, found)
    TypeMismatch(String, String, String),
    /// (option, key, allowed)
    DisallowedKey(String, String, Vec<String>),
}

/// Checks `bindings` against the schema and fills in defaults.
///
/// Private names are dropped; unrecognized names pass through untouched.
pub fn validate(bindings: OptionMap) -> Result<OptionMap, SchemaViolation> {
    let mut options: OptionMap = SCHEMA
        .iter()
        .map(|s| (s.name.to_string(), s.get_default()))
        .collect();
    for (name, value) in bindings {
        if name.starts_with(PRIVATE_PREFIX) == true {
            continue;
        }
        if let Some(spec) = lookup(&name) {
            if spec.accepts(&value) == false {
                return Err(SchemaViolation::TypeMismatch(
                    name,
                    spec.describe_types(),
                    value.type_name().to_string(),
                ));
            }
            if let (Some(keys), Some(dict)) = (spec.get_keys(), value.as_dict()) {
                if let Some(bad) = dict.keys().find(|k| keys.contains(&k.as_str()) == false) {
                    return Err(SchemaViolation::DisallowedKey(
                        name.clone(),
                        bad.clone(),
                        keys.iter().map(|k| k.to_string()).collect(),
                    ));
                }
            }
        }
        options.insert(name, value);
    }
    Ok(options)
}

/// Builds the context a child module's manifest runs with.
pub fn inherit(parent: &OptionMap) -> OptionMap {
    parent
        .iter()
        .filter(|(k, _)| PURGE_SET.contains(&k.as_str()) == false)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

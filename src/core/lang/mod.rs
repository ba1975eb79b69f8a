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

//! Source relation extractors for the supported hardware description languages.

pub mod error;
pub mod lexer;
pub mod relation;
pub mod verilog;
pub mod vhdl;

use error::ParseError;
use relation::{Relation, RelationKind, RelationSet};
use serde_derive::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_MACRO_DEPTH: usize = 64;
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Vhdl,
    Verilog,
    SystemVerilog,
    VerilogHeader,
    SystemVerilogHeader,
    /// A file the extractors do not read (constraints, scripts, ...).
    Other,
}

impl Dialect {
    /// Determines the dialect from the file extension.
    pub fn from_path(p: &Path) -> Self {
        let ext = p
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "vhd" | "vhdl" | "vho" => Self::Vhdl,
            "v" | "vo" | "vm" => Self::Verilog,
            "sv" => Self::SystemVerilog,
            "vh" => Self::VerilogHeader,
            "svh" => Self::SystemVerilogHeader,
            _ => Self::Other,
        }
    }

    pub fn is_vhdl(&self) -> bool {
        self == &Self::Vhdl
    }

    pub fn is_verilog_family(&self) -> bool {
        match self {
            Self::Verilog | Self::SystemVerilog | Self::VerilogHeader | Self::SystemVerilogHeader => {
                true
            }
            _ => false,
        }
    }

    pub fn is_system_verilog(&self) -> bool {
        match self {
            Self::SystemVerilog | Self::SystemVerilogHeader => true,
            _ => false,
        }
    }

    pub fn is_header(&self) -> bool {
        match self {
            Self::VerilogHeader | Self::SystemVerilogHeader => true,
            _ => false,
        }
    }

    /// Checks if the dialect is read by an extractor.
    pub fn is_hdl(&self) -> bool {
        self != &Self::Other
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Vhdl => "vhdl",
                Self::Verilog => "verilog",
                Self::SystemVerilog => "systemverilog",
                Self::VerilogHeader => "verilog header",
                Self::SystemVerilogHeader => "systemverilog header",
                Self::Other => "other",
            }
        )
    }
}

/// Settings shared by every analyzed file.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    include_dirs: Vec<PathBuf>,
    defines: BTreeMap<String, String>,
    max_macro_depth: usize,
    max_include_depth: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            defines: BTreeMap::new(),
            max_macro_depth: DEFAULT_MAX_MACRO_DEPTH,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the include directories searched after a module's own directories.
    pub fn include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    /// Sets the macros defined before preprocessing begins.
    pub fn defines(mut self, defines: BTreeMap<String, String>) -> Self {
        self.defines = defines;
        self
    }

    pub fn max_macro_depth(mut self, depth: usize) -> Self {
        self.max_macro_depth = depth;
        self
    }

    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    pub fn get_include_dirs(&self) -> &Vec<PathBuf> {
        &self.include_dirs
    }

    pub fn get_defines(&self) -> &BTreeMap<String, String> {
        &self.defines
    }

    pub fn get_max_macro_depth(&self) -> usize {
        self.max_macro_depth
    }

    pub fn get_max_include_depth(&self) -> usize {
        self.max_include_depth
    }
}

/// The result of analyzing a single source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub relations: RelationSet,
    /// Every file pulled in by `include, directly or transitively.
    pub includes: Vec<PathBuf>,
}

/// Reads the file at `path` and collects its relations.
///
/// `include_dirs` are the owning module's include directories; they are
/// searched before the globally configured ones.
pub fn extract(
    path: &Path,
    dialect: Dialect,
    library: &str,
    include_dirs: &[PathBuf],
    opts: &AnalysisOptions,
) -> Result<Extraction, ParseError> {
    if dialect.is_hdl() == false {
        return Ok(Extraction::default());
    }
    let source = std::fs::read_to_string(path)
        .map_err(|e| ParseError::Unreadable(format!("{}: {}", path.display(), e)))?;
    match dialect {
        Dialect::Vhdl => Ok(Extraction {
            relations: vhdl::extract(&source, library)?,
            includes: Vec::new(),
        }),
        _ => {
            let dirs: Vec<PathBuf> = include_dirs
                .iter()
                .chain(opts.get_include_dirs().iter())
                .cloned()
                .collect();
            let mut result = verilog::extract(path, &source, dialect, library, &dirs, opts)?;
            // every verilog-family file may be the target of an include
            result.relations.insert(Relation::provide(
                RelationKind::Include,
                path.to_string_lossy().to_string(),
            ));
            Ok(result)
        }
    }
}

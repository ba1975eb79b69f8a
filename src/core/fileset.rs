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

use crate::core::lang::relation::{Relation, RelationSet};
use crate::core::lang::Dialect;
use crate::core::module::ModuleId;
use indexmap::IndexMap;
use serde_derive::Serialize;
use std::path::{Path, PathBuf};

/// A single source file along with what analysis learned about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    path: PathBuf,
    module: ModuleId,
    library: String,
    dialect: Dialect,
    sim_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    relations: Option<RelationSet>,
    includes: Vec<PathBuf>,
}

impl SourceFile {
    pub fn new(path: PathBuf, module: ModuleId, library: &str) -> Self {
        Self {
            dialect: Dialect::from_path(&path),
            path: path,
            module: module,
            library: library.to_lowercase(),
            sim_only: false,
            relations: None,
            includes: Vec::new(),
        }
    }

    pub fn sim_only(mut self, flag: bool) -> Self {
        self.sim_only = flag;
        self
    }

    pub fn get_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn get_module(&self) -> ModuleId {
        self.module
    }

    pub fn get_library(&self) -> &str {
        &self.library
    }

    pub fn get_dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn is_sim_only(&self) -> bool {
        self.sim_only
    }

    pub fn is_analyzed(&self) -> bool {
        self.relations.is_some()
    }

    /// References the extracted relations, or `None` before analysis.
    pub fn get_relations(&self) -> Option<&RelationSet> {
        self.relations.as_ref()
    }

    pub fn get_includes(&self) -> &Vec<PathBuf> {
        &self.includes
    }

    pub fn set_analysis(&mut self, relations: RelationSet, includes: Vec<PathBuf>) {
        self.relations = Some(relations);
        self.includes = includes;
    }

    /// Adds relations learned after the file's own analysis (from the files it includes).
    pub fn extend_relations<I: IntoIterator<Item = Relation>>(&mut self, more: I) {
        if let Some(r) = &mut self.relations {
            r.extend(more);
        }
    }

    /// Checks if the file uses anything at all.
    pub fn has_uses(&self) -> bool {
        self.relations
            .as_ref()
            .map(|r| r.iter().any(|rel| rel.is_use()))
            .unwrap_or(false)
    }
}

/// An insertion-ordered set of source files, unique by path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileSet {
    files: IndexMap<PathBuf, SourceFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `file` unless a file with the same path is already held.
    pub fn insert(&mut self, file: SourceFile) -> bool {
        if self.files.contains_key(&file.path) == true {
            return false;
        }
        self.files.insert(file.path.clone(), file);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        self.files.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut SourceFile> {
        self.files.get_mut(path)
    }

    /// Accesses a file by its discovery index.
    pub fn get_index(&self, i: usize) -> Option<&SourceFile> {
        self.files.get_index(i).map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SourceFile> {
        self.files.values_mut()
    }

    /// Keeps only the files of the given dialect.
    pub fn filter_dialect(&self, dialect: Dialect) -> Vec<&SourceFile> {
        self.iter().filter(|f| f.dialect == dialect).collect()
    }
}

impl FromIterator<SourceFile> for FileSet {
    fn from_iter<T: IntoIterator<Item = SourceFile>>(iter: T) -> Self {
        let mut set = Self::new();
        iter.into_iter().for_each(|f| {
            set.insert(f);
        });
        set
    }
}

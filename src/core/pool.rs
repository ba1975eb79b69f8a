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

use crate::core::fetch::error::FetchError;
use crate::core::fileset::{FileSet, SourceFile};
use crate::core::module::{Module, ModuleId};
use crate::util::filesystem;
use std::collections::HashMap;

/// Every module of a project, keyed by canonical url.
///
/// The first module is the top module. Modules are only ever appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulePool {
    modules: Vec<Module>,
    urls: HashMap<String, ModuleId>,
}

impl ModulePool {
    /// Creates a pool holding only the top module.
    pub fn new(top: Module) -> Self {
        let mut urls = HashMap::new();
        urls.insert(top.get_url().to_string(), 0);
        Self {
            modules: vec![top],
            urls: urls,
        }
    }

    /// Adds `module` to the pool unless its url is already present.
    ///
    /// The new module is linked as a child of its parent.
    pub fn insert(&mut self, module: Module) -> Option<ModuleId> {
        if self.urls.contains_key(module.get_url()) == true {
            return None;
        }
        let id = self.modules.len();
        self.urls.insert(module.get_url().to_string(), id);
        if let Some(parent) = module.get_parent().and_then(|p| self.modules.get_mut(p)) {
            parent.add_child(id);
        }
        self.modules.push(module);
        Some(id)
    }

    /// Records `child` as declared by `parent`, even when another module
    /// discovered it first.
    pub fn link(&mut self, parent: ModuleId, child: ModuleId) {
        if parent == child {
            return;
        }
        if let Some(m) = self.modules.get_mut(parent) {
            m.add_child(child);
        }
    }

    pub fn find(&self, url: &str) -> Option<ModuleId> {
        self.urls.get(url).copied()
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id)
    }

    pub fn get_top_module(&self) -> &Module {
        &self.modules[0]
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules.iter().enumerate()
    }

    pub fn is_everything_fetched(&self) -> bool {
        self.modules.iter().all(|m| m.is_fetched() == true)
    }

    /// Lists the modules that come from a version control system.
    pub fn get_fetchable_modules(&self) -> Vec<ModuleId> {
        self.iter()
            .filter(|(_, m)| m.get_kind().is_vcs() == true)
            .map(|(i, _)| i)
            .collect()
    }

    /// Lists module ids in depth-first order from the top module, children in
    /// declaration order.
    pub fn walk(&self) -> Vec<ModuleId> {
        let mut order = Vec::with_capacity(self.modules.len());
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            if order.contains(&id) == true {
                continue;
            }
            order.push(id);
            if let Some(m) = self.modules.get(id) {
                m.get_children().iter().rev().for_each(|c| stack.push(*c));
            }
        }
        order
    }

    fn collect_files(&self, with_sim_only: bool) -> FileSet {
        let mut set = FileSet::new();
        for id in self.walk() {
            let m = &self.modules[id];
            let sim_only = m.get_sim_only_files();
            for path in m.get_files() {
                let flagged = sim_only.contains(&path);
                if flagged == true && with_sim_only == false {
                    continue;
                }
                set.insert(SourceFile::new(path, id, m.get_library()).sim_only(flagged));
            }
            if with_sim_only == true {
                for path in sim_only {
                    set.insert(SourceFile::new(path, id, m.get_library()).sim_only(true));
                }
            }
        }
        set
    }

    /// Gathers the files needed for the top module's action.
    ///
    /// Simulation-only files are left out when the top module synthesizes.
    pub fn build_file_set(&self) -> FileSet {
        let synthesis = self.get_top_module().get_action() == Some("synthesis");
        self.collect_files(synthesis == false)
    }

    /// Gathers every file of every module.
    pub fn build_complete_file_set(&self) -> FileSet {
        self.collect_files(true)
    }

    /// Deletes a fetched remote module's directory and marks it pending again.
    pub fn remove_from_disk(&mut self, id: ModuleId) -> Result<bool, FetchError> {
        let m = match self.modules.get_mut(id) {
            Some(m) => m,
            None => return Ok(false),
        };
        if m.get_kind().is_vcs() == false {
            return Err(FetchError::CannotRemoveLocal(m.get_url().to_string()));
        }
        let path = match m.get_path().filter(|p| p.exists() == true).cloned() {
            Some(p) => p,
            None => {
                m.set_pending();
                return Ok(false);
            }
        };
        tracing::info!("removing {} from {:?}", m, path);
        filesystem::remove_tree(&path)
            .map_err(|e| FetchError::Directory(path.clone(), e.to_string()))?;
        m.set_pending();
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::manifest::value::{OptionMap, Value};
    use crate::core::module::{ModuleRef, SourceKind};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn local(url: &str, parent: ModuleId, dir: &Path) -> Module {
        let r = ModuleRef {
            kind: SourceKind::Local,
            url: url.to_string(),
        };
        Module::from_ref(&r, parent, dir, dir).unwrap()
    }

    #[test]
    fn one_module_per_url() {
        let mut pool = ModulePool::new(Module::root(Path::new("/proj")));
        assert_eq!(pool.insert(local("a", 0, Path::new("/proj"))), Some(1));
        assert_eq!(pool.insert(local("./a/", 0, Path::new("/proj"))), None);
        assert_eq!(pool.insert(local("../proj/b", 1, Path::new("/proj/a"))), Some(2));
        // the top module itself cannot be added twice
        assert_eq!(pool.insert(local("..", 1, Path::new("/proj/a"))), None);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(0).unwrap().get_children(), &vec![1]);
        assert_eq!(pool.get(1).unwrap().get_children(), &vec![2]);
        assert_eq!(pool.find("/proj/b"), Some(2));
        assert_eq!(pool.walk(), vec![0, 1, 2]);
        // a repeated declaration is still recorded on its declarer
        pool.link(1, 0);
        pool.link(2, 2);
        assert_eq!(pool.get(1).unwrap().get_children(), &vec![2, 0]);
        assert_eq!(pool.get(2).unwrap().get_children().len(), 0);
        assert_eq!(pool.walk(), vec![0, 1, 2]);
        assert_eq!(pool.is_everything_fetched(), false);
        assert_eq!(pool.get_fetchable_modules().len(), 0);
    }

    #[test]
    fn file_sets_follow_the_action() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("top.vhd"), "").unwrap();
        fs::write(root.join("tb.vhd"), "").unwrap();
        let mut top = Module::root(root);
        let mut opts = OptionMap::new();
        opts.insert("files".to_string(), Value::from("top.vhd"));
        opts.insert("sim_only_files".to_string(), Value::from("tb.vhd"));
        opts.insert("action".to_string(), Value::from("synthesis"));
        top.evaluate(opts).unwrap();
        let pool = ModulePool::new(top);

        let files: Vec<PathBuf> = pool.build_file_set().iter().map(|f| f.get_path().clone()).collect();
        assert_eq!(files, vec![root.join("top.vhd")]);
        let all = pool.build_complete_file_set();
        assert_eq!(all.len(), 2);
        assert_eq!(all.get(&root.join("tb.vhd")).unwrap().is_sim_only(), true);
    }

    #[test]
    fn removing_remote_modules() {
        let dir = tempdir().unwrap();
        let mut pool = ModulePool::new(Module::root(dir.path()));
        let r = ModuleRef {
            kind: SourceKind::GitRepo,
            url: "https://host/ip.git".to_string(),
        };
        let mut m = Module::from_ref(&r, 0, dir.path(), dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("ip")).unwrap();
        fs::write(dir.path().join("ip/a.v"), "").unwrap();
        m.set_fetched(None);
        let id = pool.insert(m).unwrap();
        assert_eq!(pool.get_fetchable_modules(), vec![id]);
        assert_eq!(pool.is_everything_fetched(), true);

        assert_eq!(pool.remove_from_disk(id).unwrap(), true);
        assert_eq!(dir.path().join("ip").exists(), false);
        assert_eq!(pool.is_everything_fetched(), false);
        assert!(matches!(
            pool.remove_from_disk(0),
            Err(FetchError::CannotRemoveLocal(_))
        ));
    }
}

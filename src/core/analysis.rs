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

//! Extracts the relations of every file in a file set.

use crate::core::fileset::{FileSet, SourceFile};
use crate::core::lang::relation::Relation;
use crate::core::lang::{self, AnalysisOptions, Dialect};
use crate::core::pool::ModulePool;
use crate::util::anyerror::CodeFault;
use rayon::prelude::*;
use std::path::PathBuf;

/// A file waiting for its relations to be extracted.
struct Pending {
    path: PathBuf,
    dialect: Dialect,
    library: String,
    include_dirs: Vec<PathBuf>,
}

/// Analyzes every file of `files` that has not been analyzed yet.
///
/// Files run in parallel; their results are written back once all of them
/// finished. Include targets missing from the set are added to it, owned by
/// the module of the first file that includes them, and analyzed as well.
pub fn analyze(
    files: &mut FileSet,
    pool: &ModulePool,
    opts: &AnalysisOptions,
) -> Result<(), CodeFault> {
    loop {
        let pending: Vec<Pending> = files
            .iter()
            .filter(|f| f.is_analyzed() == false)
            .map(|f| Pending {
                path: f.get_path().clone(),
                dialect: f.get_dialect(),
                library: f.get_library().to_string(),
                include_dirs: pool
                    .get(f.get_module())
                    .map(|m| m.get_include_dirs())
                    .unwrap_or_default(),
            })
            .collect();
        if pending.is_empty() == true {
            break;
        }
        tracing::debug!("analyzing {} file(s)", pending.len());

        let results: Vec<_> = pending
            .par_iter()
            .map(|p| lang::extract(&p.path, p.dialect, &p.library, &p.include_dirs, opts))
            .collect();

        for (p, result) in pending.iter().zip(results) {
            let ex = result.map_err(|e| CodeFault::new(p.path.clone(), e))?;
            let owner = files.get(&p.path).map(|f| f.get_module()).unwrap_or(0);
            for inc in &ex.includes {
                if files.contains(inc) == false {
                    tracing::debug!("adding include file {:?} from {:?}", inc, p.path);
                    files.insert(SourceFile::new(inc.clone(), owner, &p.library));
                }
            }
            if let Some(f) = files.get_mut(&p.path) {
                f.set_analysis(ex.relations, ex.includes);
            }
        }
    }
    propagate_includes(files);
    Ok(())
}

/// Gives every file the uses of each file it transitively includes.
fn propagate_includes(files: &mut FileSet) {
    let updates: Vec<(PathBuf, Vec<Relation>)> = files
        .iter()
        .filter(|f| f.get_includes().is_empty() == false)
        .map(|f| {
            let inherited = f
                .get_includes()
                .iter()
                .filter_map(|inc| files.get(inc))
                .filter_map(|inc| inc.get_relations())
                .flat_map(|rels| rels.iter().filter(|r| r.is_use()).cloned())
                .collect();
            (f.get_path().clone(), inherited)
        })
        .collect();
    for (path, uses) in updates {
        if let Some(f) = files.get_mut(&path) {
            f.extend_relations(uses);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::lang::relation::RelationKind;
    use crate::core::manifest::value::{OptionMap, Value};
    use crate::core::module::Module;
    use std::fs;
    use tempfile::tempdir;

    fn pool_with(root: &std::path::Path, files: Vec<&str>, include_dirs: Vec<&str>) -> ModulePool {
        let mut top = Module::root(root);
        let mut opts = OptionMap::new();
        opts.insert("files".to_string(), Value::from(files));
        opts.insert("include_dirs".to_string(), Value::from(include_dirs));
        top.evaluate(opts).unwrap();
        ModulePool::new(top)
    }

    #[test]
    fn analyzes_every_file_once() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.vhd"), "entity a is end entity;\n").unwrap();
        fs::write(root.join("pins.xdc"), "set_property x\n").unwrap();
        let pool = pool_with(root, vec!["a.vhd", "pins.xdc"], vec![]);
        let mut files = pool.build_file_set();
        analyze(&mut files, &pool, &AnalysisOptions::new()).unwrap();
        let a = files.get(&root.join("a.vhd")).unwrap();
        assert!(a
            .get_relations()
            .unwrap()
            .contains(&Relation::provide(RelationKind::Entity, "work.a".to_string())));
        assert_eq!(files.get(&root.join("pins.xdc")).unwrap().get_relations().unwrap().len(), 0);

        // analyzed files are skipped on a second pass
        fs::remove_file(root.join("a.vhd")).unwrap();
        analyze(&mut files, &pool, &AnalysisOptions::new()).unwrap();
    }

    #[test]
    fn include_targets_join_the_set() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("inc")).unwrap();
        fs::write(root.join("inc/defs.vh"), "`include \"types.vh\"\n").unwrap();
        fs::write(root.join("inc/types.vh"), "fifo #(.W(8)) u_fifo ();\n").unwrap();
        fs::write(root.join("top.v"), "`include \"defs.vh\"\nmodule top; endmodule\n").unwrap();
        let pool = pool_with(root, vec!["top.v"], vec!["inc"]);
        let mut files = pool.build_file_set();
        analyze(&mut files, &pool, &AnalysisOptions::new()).unwrap();

        assert_eq!(files.len(), 3);
        let defs = files.get(&root.join("inc/defs.vh")).unwrap();
        assert_eq!(defs.get_module(), 0);
        assert_eq!(defs.is_analyzed(), true);
        // the header picks up the uses of the header it includes
        assert!(defs
            .get_relations()
            .unwrap()
            .contains(&Relation::uses(RelationKind::Architecture, "work.fifo".to_string())));

        let top = files.get(&root.join("top.v")).unwrap();
        let rels = top.get_relations().unwrap();
        for name in ["inc/defs.vh", "inc/types.vh"] {
            assert!(rels.contains(&Relation::uses(
                RelationKind::Include,
                root.join(name).to_string_lossy().to_string()
            )));
        }
        assert!(rels.contains(&Relation::uses(RelationKind::Architecture, "work.fifo".to_string())));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("bad.v"), "`ifdef A\nmodule m; endmodule\n").unwrap();
        let pool = pool_with(root, vec!["bad.v"], vec![]);
        let mut files = pool.build_file_set();
        let err = analyze(&mut files, &pool, &AnalysisOptions::new()).unwrap_err();
        assert_eq!(err.as_source_file(), Some(&root.join("bad.v")));
    }
}

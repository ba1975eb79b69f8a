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

//! Runs every stage from module discovery to the ordered file list.

use crate::core::analysis;
use crate::core::builder::Builder;
use crate::core::context::Context;
use crate::core::fetch::runner::Runner;
use crate::core::fileset::FileSet;
use crate::core::pool::ModulePool;
use crate::core::solver::{self, Solution};
use crate::error::Error;

/// Everything learned about a project in one run.
#[derive(Debug)]
pub struct Plan {
    pool: ModulePool,
    files: FileSet,
    solution: Solution,
}

impl Plan {
    /// Fetches and evaluates the project at the context's root, then analyzes
    /// and orders its files.
    ///
    /// With `complete`, every file of every module is kept regardless of the
    /// top module's action.
    pub fn create(ctx: &Context, runner: &dyn Runner, complete: bool) -> Result<Self, Error> {
        let settings = ctx.fetch_settings();
        let pool = Builder::new(&settings, runner)
            .jobs(ctx.jobs())
            .materialize(ctx.get_root())?;
        tracing::info!("discovered {} module(s)", pool.len());

        let mut files = match complete {
            true => pool.build_complete_file_set(),
            false => pool.build_file_set(),
        };
        analysis::analyze(&mut files, &pool, &ctx.analysis_options())?;
        let solution = solver::solve(&files, &ctx.std_libs())?;
        Ok(Self {
            pool: pool,
            files: files,
            solution: solution,
        })
    }

    pub fn get_pool(&self) -> &ModulePool {
        &self.pool
    }

    pub fn get_files(&self) -> &FileSet {
        &self.files
    }

    pub fn get_solution(&self) -> &Solution {
        &self.solution
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::fetch::runner::test::FakeRunner;
    use crate::core::lang::relation::{Relation, RelationKind};
    use crate::core::solver::{Dependency, SolveError};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn context(root: &std::path::Path) -> Context {
        Context::new().root(Some(root))
    }

    #[test]
    fn vhdl_project_in_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("ip/core")).unwrap();
        fs::write(
            root.join("manifest.py"),
            "files = [\"b.vhd\", \"a.vhd\"]\nmodules = {\"local\": [\"ip/core\"]}\n",
        )
        .unwrap();
        fs::write(root.join("a.vhd"), "package a_pkg is\nend package;\n").unwrap();
        fs::write(
            root.join("b.vhd"),
            r#"library ieee;
use ieee.std_logic_1164.all;
use work.a_pkg.all;

entity b is
end entity;

architecture rtl of b is
begin
    u0 : entity corelib.core port map (clk => clk);
end architecture;
"#,
        )
        .unwrap();
        fs::write(
            root.join("ip/core/manifest.py"),
            "library = \"corelib\"\nfiles = \"core.vhd\"\n",
        )
        .unwrap();
        fs::write(
            root.join("ip/core/core.vhd"),
            "entity core is\nend entity;\narchitecture rtl of core is\nbegin\nend architecture;\n",
        )
        .unwrap();

        let runner = FakeRunner::new();
        let plan = Plan::create(&context(root), &runner, false).unwrap();
        assert_eq!(plan.get_pool().len(), 2);
        assert_eq!(plan.get_files().len(), 3);
        let order: Vec<PathBuf> = plan.get_solution().get_order().clone();
        assert_eq!(
            order,
            vec![root.join("a.vhd"), root.join("ip/core/core.vhd"), root.join("b.vhd")]
        );
        assert_eq!(plan.get_solution().get_warnings().len(), 0);
        assert_eq!(
            plan.get_files().get(&root.join("ip/core/core.vhd")).unwrap().get_library(),
            "corelib"
        );
        // nothing had to be fetched
        assert_eq!(runner.history().len(), 0);
    }

    #[test]
    fn cycles_fail_the_plan() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("manifest.py"), "files = [\"x.vhd\", \"y.vhd\"]\n").unwrap();
        fs::write(root.join("x.vhd"), "use work.y.all;\npackage x is\nend package;\n").unwrap();
        fs::write(root.join("y.vhd"), "use work.x.all;\npackage y is\nend package;\n").unwrap();
        let runner = FakeRunner::new();
        match Plan::create(&context(root), &runner, true) {
            Err(Error::Solve(SolveError::Cycle(c))) => {
                assert_eq!(c.0, vec![vec![root.join("x.vhd"), root.join("y.vhd")]])
            }
            other => panic!("unexpected result {:?}", other.map(|p| p.solution)),
        }
    }

    #[test]
    fn include_dirs_order_headers_first() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("inc")).unwrap();
        fs::write(
            root.join("manifest.py"),
            "files = \"foo.v\"\ninclude_dirs = [\"inc\"]\n",
        )
        .unwrap();
        fs::write(root.join("inc/bar.vh"), "`define WIDTH 8\n").unwrap();
        fs::write(
            root.join("foo.v"),
            "`include \"bar.vh\"\nmodule foo; wire [`WIDTH-1:0] w; endmodule\n",
        )
        .unwrap();

        let runner = FakeRunner::new();
        let plan = Plan::create(&context(root), &runner, false).unwrap();
        let bar = root.join("inc/bar.vh");
        let foo = root.join("foo.v");
        assert_eq!(plan.get_solution().get_order(), &vec![bar.clone(), foo.clone()]);
        assert_eq!(
            plan.get_solution().get_edges(),
            &vec![Dependency {
                provider: bar.clone(),
                user: foo,
                relation: Relation::uses(
                    RelationKind::Include,
                    bar.to_string_lossy().into_owned()
                ),
            }]
        );
        assert_eq!(plan.get_solution().get_warnings().len(), 0);
    }

    #[test]
    fn modules_declared_in_headers_belong_to_the_includer() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("manifest.py"), "files = [\"top.v\", \"wrap.v\"]\n").unwrap();
        fs::write(root.join("top.v"), "module top; hidden u (.a(a)); endmodule\n").unwrap();
        fs::write(root.join("wrap.v"), "`include \"cells.vh\"\n").unwrap();
        fs::write(root.join("cells.vh"), "module hidden (input a); endmodule\n").unwrap();

        let runner = FakeRunner::new();
        let plan = Plan::create(&context(root), &runner, false).unwrap();
        assert_eq!(
            plan.get_solution().get_order(),
            &vec![root.join("cells.vh"), root.join("wrap.v"), root.join("top.v")]
        );
        assert!(plan.get_solution().get_edges().contains(&Dependency {
            provider: root.join("wrap.v"),
            user: root.join("top.v"),
            relation: Relation::uses(RelationKind::Architecture, String::from("work.hidden")),
        }));
        assert_eq!(plan.get_solution().get_warnings().len(), 0);
    }
}

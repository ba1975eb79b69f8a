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

use super::helps::fetch;
use crate::core::builder::Builder;
use crate::core::context::Context;
use crate::core::fetch::runner::ProcessRunner;
use crate::core::pool::ModulePool;

use cliproc::{cli, proc, stage::*};
use cliproc::{Cli, Help, Subcommand};

#[derive(Debug, PartialEq)]
pub struct Fetch {}

impl Subcommand<Context> for Fetch {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(fetch::HELP))?;
        Ok(Fetch {})
    }

    fn execute(self, c: &Context) -> proc::Result {
        let settings = c.fetch_settings();
        let runner = ProcessRunner::new(settings.get_timeout());
        let pool = Builder::new(&settings, &runner)
            .jobs(c.jobs())
            .materialize(c.get_root())?;
        println!("{}", Self::format_table(&pool));
        Ok(())
    }
}

impl Fetch {
    /// Lists each module as a row of kind, revision, and location.
    pub fn format_table(pool: &ModulePool) -> String {
        let header = format!("{:<14}{:<14}{}\n", "Kind", "Revision", "Location");
        let mut body = String::new();
        for (_, m) in pool.iter() {
            let location = m
                .get_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| m.get_url().to_string());
            let rev: String = m.get_revision().unwrap_or("-").chars().take(12).collect();
            body.push_str(&format!(
                "{:<14}{:<14}{}\n",
                m.get_kind().to_string(),
                rev,
                location
            ));
        }
        header + &body
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::module::Module;
    use std::path::Path;

    #[test]
    fn table_lists_every_module() {
        let pool = ModulePool::new(Module::root(Path::new("/proj")));
        assert_eq!(
            Fetch::format_table(&pool),
            "Kind          Revision      Location\nlocal         -             /proj\n"
        );
    }
}

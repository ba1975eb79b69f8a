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

use super::helps::clean;
use crate::core::builder::Builder;
use crate::core::context::Context;
use crate::core::fetch::runner::ProcessRunner;

use cliproc::{cli, proc, stage::*};
use cliproc::{Cli, Help, Subcommand};

#[derive(Debug, PartialEq)]
pub struct Clean {}

impl Subcommand<Context> for Clean {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(clean::HELP))?;
        Ok(Clean {})
    }

    fn execute(self, c: &Context) -> proc::Result {
        let settings = c.fetch_settings();
        let runner = ProcessRunner::new(settings.get_timeout());
        let mut pool = Builder::new(&settings, &runner)
            .jobs(c.jobs())
            .materialize(c.get_root())?;
        for id in pool.get_fetchable_modules() {
            if pool.remove_from_disk(id)? == true {
                if let Some(m) = pool.get(id) {
                    println!("info: removed {}", m);
                }
            }
        }
        Ok(())
    }
}

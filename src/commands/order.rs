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

use super::helps::order;
use crate::core::context::Context;
use crate::core::fetch::runner::ProcessRunner;
use crate::core::plan::Plan;

use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Help, Subcommand};

#[derive(Debug, PartialEq)]
pub struct Order {
    complete: bool,
    json: bool,
}

impl Subcommand<Context> for Order {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(order::HELP))?;
        Ok(Order {
            complete: cli.check(Arg::flag("complete"))?,
            json: cli.check(Arg::flag("json"))?,
        })
    }

    fn execute(self, c: &Context) -> proc::Result {
        let runner = ProcessRunner::new(c.fetch_settings().get_timeout());
        let plan = Plan::create(c, &runner, self.complete)?;
        match self.json {
            true => println!("{}", serde_json::to_string_pretty(plan.get_solution())?),
            false => plan
                .get_solution()
                .get_order()
                .iter()
                .for_each(|p| println!("{}", p.display())),
        }
        Ok(())
    }
}

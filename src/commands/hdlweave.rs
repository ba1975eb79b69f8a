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

use super::clean::Clean;
use super::fetch::Fetch;
use super::helps::hdlweave;
use super::order::Order;
use crate::core::config::CONFIG_FILE;
use crate::core::context::{self, Context};
use std::path::PathBuf;

use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Command, Help, Subcommand};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, PartialEq)]
pub struct Hdlweave {
    version: bool,
    root: Option<PathBuf>,
    command: Option<HdlweaveSubcommand>,
}

impl Command for Hdlweave {
    fn interpret(cli: &mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(hdlweave::HELP))?;
        Ok(Hdlweave {
            version: cli.check(Arg::flag("version"))?,
            root: cli.get(Arg::option("root").value("dir"))?,
            command: cli.nest(Arg::subcommand("command"))?,
        })
    }

    fn execute(self) -> proc::Result {
        // prioritize version information
        if self.version == true {
            println!("hdlweave {}", VERSION);
            return Ok(());
        }
        match self.command {
            Some(c) => {
                let context = Context::new()
                    .home(context::HOME_VAR)?
                    .root(self.root.as_deref())
                    .settings(CONFIG_FILE)?;
                c.execute(&context)
            }
            None => Ok(println!("{}", hdlweave::HELP)),
        }
    }
}

#[derive(Debug, PartialEq)]
enum HdlweaveSubcommand {
    Order(Order),
    Fetch(Fetch),
    Clean(Clean),
}

impl Subcommand<Context> for HdlweaveSubcommand {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        match cli.select(&["order", "fetch", "clean"])?.as_ref() {
            "order" => Ok(HdlweaveSubcommand::Order(Order::interpret(cli)?)),
            "fetch" => Ok(HdlweaveSubcommand::Fetch(Fetch::interpret(cli)?)),
            "clean" => Ok(HdlweaveSubcommand::Clean(Clean::interpret(cli)?)),
            _ => panic!("an unimplemented command was passed through!"),
        }
    }

    fn execute(self, context: &Context) -> proc::Result {
        match self {
            HdlweaveSubcommand::Order(c) => c.execute(context),
            HdlweaveSubcommand::Fetch(c) => c.execute(context),
            HdlweaveSubcommand::Clean(c) => c.execute(context),
        }
    }
}

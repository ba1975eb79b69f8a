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

pub const HELP: &str = r#"Hdlweave discovers the modules of an hdl project and orders its files.

Usage:
    hdlweave [options] [command]

Commands:
    order           print the project's files in compile order
    fetch           place every module of the project on disk
    clean           remove the checked out sources of remote modules

Options:
    --root <dir>    project directory holding the top manifest
    --version       print the version and exit
    --help, -h      print help information

Set HDLWEAVE_LOG (for example HDLWEAVE_LOG=debug) to control logging.
"#;

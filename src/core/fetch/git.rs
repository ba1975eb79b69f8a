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

use super::error::FetchError;
use super::runner::{Command, Runner};
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// A series of git commands run through subprocesses.
pub struct Git<'a> {
    command: String,
    runner: &'a dyn Runner,
    cancel: &'a AtomicBool,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn Runner, cancel: &'a AtomicBool) -> Self {
        Self {
            command: String::from("git"),
            runner: runner,
            cancel: cancel,
        }
    }

    /// Sets the command for calling git.
    pub fn command(mut self, s: &str) -> Self {
        self.command = s.to_string();
        self
    }

    fn exec(&self, args: &[&str], dir: &Path) -> Result<String, FetchError> {
        let cmd = Command::new(&self.command).args(args).dir(dir);
        self.runner.run(&cmd, self.cancel)
    }

    /// Clones the repository `url` into the directory `name` under `dir`.
    pub fn clone(&self, url: &str, name: &str, dir: &Path) -> Result<(), FetchError> {
        self.exec(&["clone", url, name], dir).map(|_| ())
    }

    /// Brings the checkout at `dir` up to date with its remote.
    pub fn pull(&self, dir: &Path) -> Result<(), FetchError> {
        self.exec(&["pull"], dir).map(|_| ())
    }

    /// Downloads remote objects without touching the working tree.
    pub fn fetch(&self, dir: &Path) -> Result<(), FetchError> {
        self.exec(&["fetch", "--all", "--tags"], dir).map(|_| ())
    }

    pub fn checkout(&self, target: &str, dir: &Path) -> Result<(), FetchError> {
        self.exec(&["checkout", target], dir).map(|_| ())
    }

    /// Runs `git submodule update --init <path>` from the superproject at `dir`.
    pub fn submodule_update(&self, path: &str, dir: &Path) -> Result<(), FetchError> {
        self.exec(&["submodule", "update", "--init", path], dir)
            .map(|_| ())
    }

    /// Reads the commit currently checked out at `dir`.
    pub fn head(&self, dir: &Path) -> Result<String, FetchError> {
        let out = self.exec(&["rev-parse", "HEAD"], dir)?;
        match out.trim() {
            "" => Err(FetchError::NoRevision(
                dir.to_path_buf(),
                format!("{} rev-parse HEAD", self.command),
            )),
            rev => Ok(rev.to_string()),
        }
    }
}

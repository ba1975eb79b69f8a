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

/// A series of svn commands run through subprocesses.
pub struct Svn<'a> {
    command: String,
    runner: &'a dyn Runner,
    cancel: &'a AtomicBool,
}

impl<'a> Svn<'a> {
    pub fn new(runner: &'a dyn Runner, cancel: &'a AtomicBool) -> Self {
        Self {
            command: String::from("svn"),
            runner: runner,
            cancel: cancel,
        }
    }

    /// Sets the command for calling svn.
    pub fn command(mut self, s: &str) -> Self {
        self.command = s.to_string();
        self
    }

    fn exec(&self, args: &[&str], dir: &Path) -> Result<String, FetchError> {
        let cmd = Command::new(&self.command).args(args).dir(dir);
        self.runner.run(&cmd, self.cancel)
    }

    /// Checks out `url` into the directory `name` under `dir`, optionally pinned
    /// to `revision`.
    pub fn checkout(
        &self,
        url: &str,
        revision: Option<&str>,
        name: &str,
        dir: &Path,
    ) -> Result<(), FetchError> {
        let mut args = vec!["checkout"];
        if let Some(rev) = revision {
            args.extend(["-r", rev]);
        }
        args.extend([url, name]);
        self.exec(&args, dir).map(|_| ())
    }

    pub fn update(&self, revision: Option<&str>, dir: &Path) -> Result<(), FetchError> {
        let mut args = vec!["update"];
        if let Some(rev) = revision {
            args.extend(["-r", rev]);
        }
        self.exec(&args, dir).map(|_| ())
    }

    /// Reads the revision of the working copy at `dir` from `svn info`.
    pub fn revision(&self, dir: &Path) -> Result<String, FetchError> {
        let out = self.exec(&["info"], dir)?;
        parse_revision(&out).ok_or_else(|| {
            FetchError::NoRevision(dir.to_path_buf(), format!("{} info", self.command))
        })
    }
}

/// Finds the value of the `Revision:` line of `svn info` output.
fn parse_revision(info: &str) -> Option<String> {
    info.lines()
        .filter_map(|l| l.strip_prefix("Revision:"))
        .map(|r| r.trim().to_string())
        .find(|r| r.is_empty() == false)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn revision_from_info() {
        let info = "Path: .\nURL: svn://host/repo/ip\nRevision: 1234\nNode Kind: directory\n";
        assert_eq!(parse_revision(info), Some("1234".to_string()));
        assert_eq!(parse_revision("Path: .\n"), None);
    }
}

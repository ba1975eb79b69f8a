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

//! Backends that place a remote module's sources on disk.

pub mod error;
pub mod git;
pub mod runner;
pub mod svn;

use crate::core::module::{Module, SourceKind};
use crate::util::filesystem;
use error::FetchError;
use git::Git;
use runner::{Command, Runner};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use svn::Svn;

/// Default time limit for a single external command, in seconds.
pub const DEFAULT_TIMEOUT: u64 = 600;

/// Settings shared by every fetch backend.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    git: String,
    svn: String,
    timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            git: String::from("git"),
            svn: String::from("svn"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }
}

impl FetchSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn git(mut self, s: &str) -> Self {
        self.git = s.to_string();
        self
    }

    pub fn svn(mut self, s: &str) -> Self {
        self.svn = s.to_string();
        self
    }

    pub fn timeout(mut self, d: Duration) -> Self {
        self.timeout = d;
        self
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

/// Places the sources of `module` on disk and returns the revision now
/// checked out, if the source kind has one.
///
/// `origin` is the directory of the module that declared `module`.
pub fn fetch(
    module: &Module,
    origin: &Path,
    settings: &FetchSettings,
    runner: &dyn Runner,
    cancel: &AtomicBool,
) -> Result<Option<String>, FetchError> {
    let dest = match module.get_path() {
        Some(p) => p,
        None => {
            return Err(FetchError::InvalidUrl(
                module.get_raw_url().to_string(),
                "module has no destination".to_string(),
            ))
        }
    };
    tracing::info!("fetching {} into {:?}", module, dest);
    match module.get_kind() {
        SourceKind::Local => match dest.is_dir() {
            true => Ok(None),
            false => Err(FetchError::MissingLocal(dest.clone())),
        },
        SourceKind::GitRepo => {
            let git = Git::new(runner, cancel).command(&settings.git);
            fetch_git(&git, module, dest)
        }
        SourceKind::SvnRepo => {
            let svn = Svn::new(runner, cancel).command(&settings.svn);
            fetch_svn(&svn, module, dest)
        }
        SourceKind::GitSubmodule => {
            let git = Git::new(runner, cancel).command(&settings.git);
            git.submodule_update(module.get_raw_url(), origin)?;
            Ok(Some(git.head(dest)?))
        }
    }
}

/// Splits a destination into the directory to run from and the name to create.
fn split_dest(dest: &Path) -> Result<(&Path, String), FetchError> {
    match (dest.parent(), dest.file_name()) {
        (Some(parent), Some(name)) => {
            std::fs::create_dir_all(parent)
                .map_err(|e| FetchError::Directory(parent.to_path_buf(), e.to_string()))?;
            Ok((parent, name.to_string_lossy().to_string()))
        }
        _ => Err(FetchError::Directory(
            dest.to_path_buf(),
            "destination has no parent directory".to_string(),
        )),
    }
}

fn fetch_git(git: &Git, module: &Module, dest: &Path) -> Result<Option<String>, FetchError> {
    if filesystem::is_nonempty_dir(dest) == false {
        let (dir, name) = split_dest(dest)?;
        git.clone(module.get_url(), &name, dir)?;
    } else if module.get_revision().is_some() {
        // a pinned checkout is detached and cannot be pulled
        git.fetch(dest)?;
    } else {
        git.pull(dest)?;
    }
    if let Some(branch) = module.get_branch() {
        git.checkout(branch, dest)?;
    }
    if let Some(rev) = module.get_revision() {
        git.checkout(rev, dest)?;
    }
    Ok(Some(git.head(dest)?))
}

fn fetch_svn(svn: &Svn, module: &Module, dest: &Path) -> Result<Option<String>, FetchError> {
    match filesystem::is_nonempty_dir(dest) {
        true => svn.update(module.get_revision(), dest)?,
        false => {
            let (dir, name) = split_dest(dest)?;
            svn.checkout(module.get_url(), module.get_revision(), &name, dir)?
        }
    }
    Ok(Some(svn.revision(dest)?))
}

/// Runs a manifest's shell hook (`fetch_pre_cmd`, `fetch_post_cmd`) inside `dir`.
pub fn run_hook(
    line: &str,
    dir: &Path,
    runner: &dyn Runner,
    cancel: &AtomicBool,
) -> Result<(), FetchError> {
    tracing::info!("running hook `{}` in {:?}", line, dir);
    runner.run(&Command::shell(line).dir(dir), cancel).map(|_| ())
}

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

use crate::core::config::{Config, Configs, Locality};
use crate::core::fetch::FetchSettings;
use crate::core::lang::AnalysisOptions;
use crate::error::{Error, Hint, LastError};
use crate::util::filesystem::Standardize;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the directory of the global configuration.
pub const HOME_VAR: &str = "HDLWEAVE_HOME";
/// Environment variable holding the log filter.
pub const LOG_VAR: &str = "HDLWEAVE_LOG";
/// Directory inside a project root that stores its local configuration.
pub const LOCAL_DIR: &str = ".hdlweave";

/// Everything a run needs to know about its surroundings.
#[derive(Debug, PartialEq)]
pub struct Context {
    home_path: PathBuf,
    root: PathBuf,
    config: Config,
}

impl Context {
    pub fn new() -> Context {
        Context {
            home_path: env::temp_dir(),
            root: PathBuf::standardize("."),
            config: Config::new(),
        }
    }

    /// Sets the home directory. By default this is `$HOME/.hdlweave`, unless
    /// the environment variable `key` names another directory.
    pub fn home(mut self, key: &str) -> Result<Context, Error> {
        self.home_path = match env::var(key) {
            Ok(s) => PathBuf::standardize(s),
            Err(_) => match home::home_dir() {
                Some(p) => p.join(LOCAL_DIR),
                None => return Err(Error::MissingHome(Hint::SetHome)),
            },
        };
        Ok(self)
    }

    /// Sets the project root; defaults to the current working directory.
    pub fn root(mut self, dir: Option<&Path>) -> Context {
        if let Some(d) = dir {
            self.root = PathBuf::standardize(d);
        }
        self
    }

    /// Reads the global configuration file `s` under the home directory and
    /// the local one under the project root, when they exist.
    pub fn settings(mut self, s: &str) -> Result<Context, Error> {
        let global = self.home_path.join(s);
        let local = self.root.join(LOCAL_DIR).join(s);
        let mut configs = Configs::new();
        for (path, lvl) in [(global, Locality::Global), (local, Locality::Local)] {
            if path.is_file() == false {
                continue;
            }
            tracing::debug!("loading configuration {:?}", path);
            configs = configs
                .load(path.clone(), lvl)
                .map_err(|e| Error::Config(path, LastError(e.to_string()), Hint::ConfigFields))?;
        }
        self.config = Config::from(configs);
        Ok(self)
    }

    pub fn get_home_path(&self) -> &PathBuf {
        &self.home_path
    }

    pub fn get_root(&self) -> &PathBuf {
        &self.root
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        self.config.get_fetch_settings()
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        self.config.get_analysis_options()
    }

    pub fn jobs(&self) -> usize {
        self.config.get_jobs()
    }

    pub fn std_libs(&self) -> Vec<String> {
        self.config.get_std_libs()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::config::CONFIG_FILE;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn local_settings_override_global() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        let root = dir.path().join("proj");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(root.join(LOCAL_DIR)).unwrap();
        fs::write(home.join(CONFIG_FILE), "[general]\njobs = 3\n[solver]\nstd-libs = [\"ieee\"]\n").unwrap();
        fs::write(root.join(LOCAL_DIR).join(CONFIG_FILE), "[general]\njobs = 5\n").unwrap();

        let mut ctx = Context::new().root(Some(root.as_path()));
        ctx.home_path = home;
        let ctx = ctx.settings(CONFIG_FILE).unwrap();
        assert_eq!(ctx.get_root(), &root);
        assert_eq!(ctx.jobs(), 5);
        assert_eq!(ctx.std_libs(), vec!["ieee"]);
    }

    #[test]
    fn missing_files_keep_defaults() {
        let dir = tempdir().unwrap();
        let mut ctx = Context::new().root(Some(dir.path()));
        ctx.home_path = dir.path().join("nowhere");
        let ctx = ctx.settings(CONFIG_FILE).unwrap();
        assert_eq!(ctx.get_config(), &Config::new());
        assert_eq!(ctx.analysis_options(), AnalysisOptions::new());
    }

    #[test]
    fn bad_settings_name_the_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(LOCAL_DIR)).unwrap();
        let path = dir.path().join(LOCAL_DIR).join(CONFIG_FILE);
        fs::write(&path, "[fetch]\nretries = 3\n").unwrap();
        let mut ctx = Context::new().root(Some(dir.path()));
        ctx.home_path = dir.path().join("nowhere");
        match ctx.settings(CONFIG_FILE) {
            Err(Error::Config(p, _, Hint::ConfigFields)) => assert_eq!(p, path),
            other => panic!("unexpected result {:?}", other),
        }
    }
}

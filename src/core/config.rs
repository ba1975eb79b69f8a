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

use crate::core::fetch::{FetchSettings, DEFAULT_TIMEOUT};
use crate::core::lang::AnalysisOptions;
use crate::core::solver::DEFAULT_STD_LIBS;
use crate::util::anyerror::AnyError;
use crate::util::filesystem;
use crate::util::filesystem::Standardize;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";

pub trait FromFile: Sized {
    fn from_file(path: &Path) -> Result<Self, Box<dyn Error>>;
}

#[derive(Debug, PartialEq, Clone)]
pub enum Locality {
    Global,
    Local,
    Other,
}

#[derive(Debug, PartialEq)]
pub struct Configs {
    inner: Vec<(PathBuf, Config, Locality)>,
}

impl Configs {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Reads `file` and every file it (transitively) includes.
    ///
    /// A file is only ever read once.
    pub fn load(self, file: PathBuf, lvl: Locality) -> Result<Self, Box<dyn Error>> {
        // remember what paths are already loaded
        let mut set: HashSet<PathBuf> = self.inner.iter().map(|(p, _, _)| p.clone()).collect();
        let mut configs = self.inner;

        let mut to_process = vec![(PathBuf::standardize(file), lvl)];
        let mut i = 0;
        while let Some((path, local)) = to_process.get(i).cloned() {
            i += 1;
            if set.insert(path.clone()) == false {
                continue;
            }
            let cfg = Config::from_file(&path)?;
            let base = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
            // access its neighboring files (check "include" key)
            for next in cfg.get_includes() {
                let std_next = filesystem::resolve_rel_path(&base, next);
                if set.contains(&std_next) == false {
                    to_process.push((std_next, Locality::Other));
                }
            }
            configs.push((path, cfg, local));
        }
        Ok(Self { inner: configs })
    }

    /// Lists the files that were read, in read order.
    pub fn get_paths(&self) -> Vec<&PathBuf> {
        self.inner.iter().map(|(p, _, _)| p).collect()
    }
}

impl From<Configs> for Config {
    /// Transform the multi-layered configurations into a single level.
    ///
    /// This function processes configurations in the following order:
    /// 1. LOCAL
    /// 2. GLOBAL
    /// 3. INCLUDES (first to last)
    ///
    /// Once a value is set (not None), then it will not be overridden by any
    /// configuration file later in the processing order.
    fn from(value: Configs) -> Self {
        let mut single = Config::new();
        let mut value = value;
        // process local file
        let local = value.inner.iter().position(|p| p.2 == Locality::Local);
        if let Some(i) = local {
            single.append(value.inner.remove(i).1);
        }
        // process global file
        let global = value.inner.iter().position(|p| p.2 == Locality::Global);
        if let Some(i) = global {
            single.append(value.inner.remove(i).1);
        }
        // process includes in the order they were read
        value.inner.into_iter().for_each(|p| {
            single.append(p.1);
        });
        single
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct General {
    jobs: Option<usize>,
}

impl General {
    /// Merges any populated data from `rhs` into attributes that do not already
    /// have data defined in `self`.
    pub fn merge(&mut self, rhs: Option<Self>) {
        if let Some(rhs) = rhs {
            if self.jobs.is_none() {
                self.jobs = rhs.jobs;
            }
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fetch {
    /// Seconds a single `git`/`svn` command may run.
    timeout: Option<u64>,
    git: Option<String>,
    svn: Option<String>,
}

impl Fetch {
    pub fn merge(&mut self, rhs: Option<Self>) {
        if let Some(rhs) = rhs {
            if self.timeout.is_none() {
                self.timeout = rhs.timeout;
            }
            if self.git.is_none() {
                self.git = rhs.git;
            }
            if self.svn.is_none() {
                self.svn = rhs.svn;
            }
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Solver {
    #[serde(rename = "std-libs")]
    std_libs: Option<Vec<String>>,
}

impl Solver {
    pub fn merge(&mut self, rhs: Option<Self>) {
        if let Some(rhs) = rhs {
            if self.std_libs.is_none() {
                self.std_libs = rhs.std_libs;
            }
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Verilog {
    #[serde(rename = "include-dirs")]
    include_dirs: Option<Vec<PathBuf>>,
    defines: Option<BTreeMap<String, String>>,
    #[serde(rename = "max-macro-depth")]
    max_macro_depth: Option<usize>,
    #[serde(rename = "max-include-depth")]
    max_include_depth: Option<usize>,
}

impl Verilog {
    pub fn merge(&mut self, rhs: Option<Self>) {
        if let Some(rhs) = rhs {
            if self.include_dirs.is_none() {
                self.include_dirs = rhs.include_dirs;
            }
            // defines combine key by key
            if let Some(more) = rhs.defines {
                let v = self.defines.get_or_insert_with(BTreeMap::new);
                for (key, val) in more {
                    v.entry(key).or_insert(val);
                }
            }
            if self.max_macro_depth.is_none() {
                self.max_macro_depth = rhs.max_macro_depth;
            }
            if self.max_include_depth.is_none() {
                self.max_include_depth = rhs.max_include_depth;
            }
        }
    }

    /// Anchors relative include directories at `base`.
    fn set_root(&mut self, base: &Path) {
        if let Some(dirs) = &mut self.include_dirs {
            dirs.iter_mut()
                .for_each(|d| *d = filesystem::resolve_rel_path(base, &*d));
        }
    }
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    include: Option<Vec<PathBuf>>,
    general: Option<General>,
    fetch: Option<Fetch>,
    solver: Option<Solver>,
    verilog: Option<Verilog>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the new information to the existing configuration to combine data.
    ///
    /// If there is already existing data in `self`, then it has precedence
    /// over any incoming data from `rhs`.
    pub fn append(&mut self, rhs: Self) {
        match &mut self.include {
            Some(v) => v.append(&mut rhs.include.unwrap_or_default()),
            None => self.include = rhs.include,
        }
        // combine '[general]' table
        match &mut self.general {
            Some(v) => v.merge(rhs.general),
            None => self.general = rhs.general,
        }
        // combine '[fetch]' table
        match &mut self.fetch {
            Some(v) => v.merge(rhs.fetch),
            None => self.fetch = rhs.fetch,
        }
        // combine '[solver]' table
        match &mut self.solver {
            Some(v) => v.merge(rhs.solver),
            None => self.solver = rhs.solver,
        }
        // combine '[verilog]' table
        match &mut self.verilog {
            Some(v) => v.merge(rhs.verilog),
            None => self.verilog = rhs.verilog,
        }
    }

    pub fn get_includes(&self) -> Vec<&PathBuf> {
        match &self.include {
            Some(i) => i.iter().collect(),
            None => Vec::new(),
        }
    }

    /// Returns the number of parallel fetch workers, at least one.
    pub fn get_jobs(&self) -> usize {
        self.general
            .as_ref()
            .and_then(|g| g.jobs)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    pub fn get_fetch_settings(&self) -> FetchSettings {
        let mut settings = FetchSettings::new();
        if let Some(f) = &self.fetch {
            if let Some(git) = &f.git {
                settings = settings.git(git);
            }
            if let Some(svn) = &f.svn {
                settings = settings.svn(svn);
            }
            settings = settings.timeout(Duration::from_secs(f.timeout.unwrap_or(DEFAULT_TIMEOUT)));
        }
        settings
    }

    pub fn get_std_libs(&self) -> Vec<String> {
        match self.solver.as_ref().and_then(|s| s.std_libs.as_ref()) {
            Some(libs) => libs.iter().map(|l| l.to_lowercase()).collect(),
            None => DEFAULT_STD_LIBS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn get_analysis_options(&self) -> AnalysisOptions {
        let mut opts = AnalysisOptions::new();
        if let Some(v) = &self.verilog {
            if let Some(dirs) = &v.include_dirs {
                opts = opts.include_dirs(dirs.clone());
            }
            if let Some(defines) = &v.defines {
                opts = opts.defines(defines.clone());
            }
            if let Some(n) = v.max_macro_depth {
                opts = opts.max_macro_depth(n);
            }
            if let Some(n) = v.max_include_depth {
                opts = opts.max_include_depth(n);
            }
        }
        opts
    }
}

impl FromStr for Config {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl FromFile for Config {
    fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        // verify the path exists
        if path.is_file() == false {
            return Err(AnyError(format!(
                "failed to locate configuration file \"{}\"",
                path.display()
            )))?;
        }
        let contents = std::fs::read_to_string(&path)?;
        match Self::from_str(&contents) {
            Ok(mut r) => {
                let base = PathBuf::standardize(path)
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_default();
                if let Some(v) = &mut r.verilog {
                    v.set_root(&base);
                }
                Ok(r)
            }
            Err(e) => Err(AnyError(format!(
                "failed to parse \"{}\" file: {}",
                path.display(),
                e
            )))?,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const C_0: &str = r#"
# This is a blank configuration file.
"#;

    const C_1: &str = r#"
include = ["shared/config.toml"]

[general]
jobs = 4

[fetch]
timeout = 30
git = "/opt/git/bin/git"

[solver]
std-libs = ["IEEE", "std", "unisim"]

[verilog]
include-dirs = ["rtl/include"]
defines = { SIMULATION = "1", WIDTH = "32" }
max-macro-depth = 16
"#;

    #[test]
    fn parse_empty_config() {
        assert_eq!(Config::from_str(C_0).unwrap(), Config::new());
    }

    #[test]
    fn parse_basic_config() {
        let cfg = Config::from_str(C_1).unwrap();
        assert_eq!(cfg.get_jobs(), 4);
        assert_eq!(cfg.get_std_libs(), vec!["ieee", "std", "unisim"]);
        assert_eq!(cfg.get_fetch_settings().get_timeout(), Duration::from_secs(30));
        let opts = cfg.get_analysis_options();
        assert_eq!(opts.get_max_macro_depth(), 16);
        assert_eq!(opts.get_defines().get("WIDTH"), Some(&"32".to_string()));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::from_str("[general]\nbuild-dir = \"out\"\n").is_err());
        assert!(Config::from_str("[plugins]\n").is_err());
    }

    #[test]
    fn linked_configs() {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home");
        let proj = dir.path().join("proj");
        fs::create_dir_all(home.join("shared")).unwrap();
        fs::create_dir_all(proj.join(".hdlweave")).unwrap();
        fs::write(
            home.join(CONFIG_FILE),
            "include = [\"shared/config.toml\"]\n[fetch]\ngit = \"global-git\"\n[general]\njobs = 2\n",
        )
        .unwrap();
        // the included file points back at the global one
        fs::write(
            home.join("shared/config.toml"),
            "include = [\"../config.toml\"]\n[fetch]\nsvn = \"shared-svn\"\ngit = \"shared-git\"\n[verilog]\ninclude-dirs = [\"inc\"]\n",
        )
        .unwrap();
        fs::write(proj.join(".hdlweave").join(CONFIG_FILE), "[general]\njobs = 8\n").unwrap();

        let configs = Configs::new()
            .load(home.join(CONFIG_FILE), Locality::Global)
            .unwrap()
            .load(proj.join(".hdlweave").join(CONFIG_FILE), Locality::Local)
            .unwrap();
        assert_eq!(configs.get_paths().len(), 3);

        let cfg = Config::from(configs);
        assert_eq!(cfg.get_jobs(), 8);
        let fetch = cfg.fetch.as_ref().unwrap();
        assert_eq!(fetch.git.as_deref(), Some("global-git"));
        assert_eq!(fetch.svn.as_deref(), Some("shared-svn"));
        assert_eq!(
            cfg.get_analysis_options().get_include_dirs(),
            &vec![home.join("shared/inc")]
        );
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        assert!(Configs::new()
            .load(dir.path().join(CONFIG_FILE), Locality::Global)
            .is_err());
    }
}

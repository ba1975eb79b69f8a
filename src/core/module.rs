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

use crate::core::fetch::error::FetchError;
use crate::core::manifest::value::{OptionMap, Value};
use crate::core::manifest::{self, error::ManifestError};
use crate::util::filesystem;
use serde_derive::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Index of a module within its pool.
pub type ModuleId = usize;

/// Separates a git url from its pinned branch.
pub const BRANCH_SEPARATOR: &str = "::";
/// Separates a git url from its pinned revision.
pub const GIT_REVISION_SEPARATOR: &str = "@@";
/// Separates an svn url from its pinned revision.
pub const SVN_REVISION_SEPARATOR: char = '@';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    GitRepo,
    SvnRepo,
    GitSubmodule,
}

impl SourceKind {
    /// Maps a key of the `modules` manifest option to its source kind.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "local" => Some(Self::Local),
            "git" => Some(Self::GitRepo),
            "svn" => Some(Self::SvnRepo),
            "git_submodule" => Some(Self::GitSubmodule),
            _ => None,
        }
    }

    /// Checks if the module's sources come from a version control system.
    pub fn is_vcs(&self) -> bool {
        self != &Self::Local
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Local => "local",
                Self::GitRepo => "git",
                Self::SvnRepo => "svn",
                Self::GitSubmodule => "git_submodule",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchState {
    Pending,
    Fetched,
}

/// Settings used when the module is the top of a synthesis run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SynthesisConfig {
    pub top: Option<String>,
    pub tool: Option<String>,
    pub path: Option<String>,
    pub device: Option<String>,
    pub grade: Option<String>,
    pub package: Option<String>,
    pub family: Option<String>,
    pub project: Option<String>,
    pub properties: Vec<Value>,
    /// Stage hooks, keyed by option name (`syn_pre_map_cmd`, ...).
    pub hooks: Vec<(String, String)>,
}

impl SynthesisConfig {
    fn from_options(opts: &OptionMap) -> Option<Self> {
        let get = |name: &str| opts.get(name).and_then(|v| v.as_str()).map(String::from);
        let cfg = Self {
            top: get("syn_top").or_else(|| get("top_module")),
            tool: get("syn_tool"),
            path: get("syn_path"),
            device: get("syn_device"),
            grade: get("syn_grade"),
            package: get("syn_package"),
            family: get("syn_family"),
            project: get("syn_project"),
            properties: opts
                .get("syn_properties")
                .and_then(|v| v.as_list())
                .cloned()
                .unwrap_or_default(),
            hooks: opts
                .iter()
                .filter(|(k, _)| k.starts_with("syn_") && k.ends_with("_cmd"))
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
        };
        match cfg == Self::default() {
            true => None,
            false => Some(cfg),
        }
    }
}

/// Settings used when the module is the top of a simulation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SimulationConfig {
    pub top: Option<String>,
    pub tool: Option<String>,
    pub path: Option<String>,
    pub pre_cmd: Option<String>,
    pub post_cmd: Option<String>,
    /// Extra tool flags, keyed by option name (`vcom_opt`, ...).
    pub tool_options: Vec<(String, String)>,
}

impl SimulationConfig {
    fn from_options(opts: &OptionMap) -> Option<Self> {
        let get = |name: &str| opts.get(name).and_then(|v| v.as_str()).map(String::from);
        let cfg = Self {
            top: get("sim_top").or_else(|| get("top_module")),
            tool: get("sim_tool"),
            path: get("sim_path"),
            pre_cmd: get("sim_pre_cmd"),
            post_cmd: get("sim_post_cmd"),
            tool_options: [
                "vcom_opt",
                "vlog_opt",
                "vmap_opt",
                "vsim_opt",
                "ghdl_opt",
                "iverilog_opt",
            ]
            .iter()
            .filter_map(|k| get(*k).map(|v| (k.to_string(), v)))
            .collect(),
        };
        match cfg == Self::default() {
            true => None,
            false => Some(cfg),
        }
    }
}

/// A reference to another module found in a manifest's `modules` option.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRef {
    pub kind: SourceKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    url: String,
    raw_url: String,
    kind: SourceKind,
    path: Option<PathBuf>,
    state: FetchState,
    branch: Option<String>,
    revision: Option<String>,
    parent: Option<ModuleId>,
    children: Vec<ModuleId>,
    options: Option<OptionMap>,
    synthesis: Option<SynthesisConfig>,
    simulation: Option<SimulationConfig>,
}

impl Module {
    fn blank(kind: SourceKind, url: String, raw_url: String) -> Self {
        Self {
            url: url,
            raw_url: raw_url,
            kind: kind,
            path: None,
            state: FetchState::Pending,
            branch: None,
            revision: None,
            parent: None,
            children: Vec::new(),
            options: None,
            synthesis: None,
            simulation: None,
        }
    }

    /// Creates the top module, which is always a local directory that is
    /// already present.
    pub fn root(dir: &Path) -> Self {
        let path = filesystem::normalize(dir);
        let url = path.to_string_lossy().to_string();
        let mut m = Self::blank(SourceKind::Local, url.clone(), url);
        m.path = Some(path);
        m.state = FetchState::Fetched;
        m
    }

    /// Creates a module from a reference declared by the module at `parent`.
    ///
    /// `parent_dir` is the declaring module's directory and `fetchto` is the
    /// directory remote modules are placed into.
    pub fn from_ref(
        r: &ModuleRef,
        parent: ModuleId,
        parent_dir: &Path,
        fetchto: &Path,
    ) -> Result<Self, FetchError> {
        let raw = r.url.trim();
        if raw.is_empty() == true {
            return Err(FetchError::InvalidUrl(
                r.url.clone(),
                "url is empty".to_string(),
            ));
        }
        let mut m = match r.kind {
            SourceKind::Local | SourceKind::GitSubmodule => {
                let path = filesystem::resolve_rel_path(parent_dir, raw);
                let mut m = Self::blank(
                    r.kind,
                    path.to_string_lossy().to_string(),
                    raw.to_string(),
                );
                m.path = Some(path);
                m
            }
            SourceKind::GitRepo => {
                let (rest, revision) = split_suffix(raw, GIT_REVISION_SEPARATOR);
                let (base, branch) = split_suffix(rest, BRANCH_SEPARATOR);
                let url = canonicalize_url(base);
                let mut m = Self::blank(r.kind, url.clone(), raw.to_string());
                m.branch = branch.map(String::from);
                m.revision = revision.map(String::from);
                m.path = Some(fetchto.join(basename(&url)?));
                m
            }
            SourceKind::SvnRepo => {
                let (base, revision) = split_svn_revision(raw);
                let url = canonicalize_url(base);
                let mut m = Self::blank(r.kind, url.clone(), raw.to_string());
                m.revision = revision.map(String::from);
                m.path = Some(fetchto.join(basename(&url)?));
                m
            }
        };
        m.parent = Some(parent);
        Ok(m)
    }

    /// Canonical url: the normalized absolute path for local modules, the
    /// bare repository url for remote ones.
    pub fn get_url(&self) -> &str {
        &self.url
    }

    /// The url exactly as written in the declaring manifest.
    pub fn get_raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn get_kind(&self) -> SourceKind {
        self.kind
    }

    pub fn get_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn get_state(&self) -> FetchState {
        self.state
    }

    pub fn is_fetched(&self) -> bool {
        self.state == FetchState::Fetched
    }

    pub fn get_branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn get_revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn get_parent(&self) -> Option<ModuleId> {
        self.parent
    }

    pub fn get_children(&self) -> &Vec<ModuleId> {
        &self.children
    }

    pub fn get_options(&self) -> Option<&OptionMap> {
        self.options.as_ref()
    }

    pub fn get_synthesis(&self) -> Option<&SynthesisConfig> {
        self.synthesis.as_ref()
    }

    pub fn get_simulation(&self) -> Option<&SimulationConfig> {
        self.simulation.as_ref()
    }

    pub fn is_evaluated(&self) -> bool {
        self.options.is_some()
    }

    pub(crate) fn add_child(&mut self, child: ModuleId) {
        if self.children.contains(&child) == false {
            self.children.push(child);
        }
    }

    /// Records a successful fetch along with the revision now on disk.
    pub(crate) fn set_fetched(&mut self, revision: Option<String>) {
        self.state = FetchState::Fetched;
        if revision.is_some() == true {
            self.revision = revision;
        }
    }

    pub(crate) fn set_pending(&mut self) {
        self.state = FetchState::Pending;
    }

    /// Checks if the module's sources are already present on disk.
    ///
    /// A local module that is missing is an error since nothing can fetch it.
    pub fn is_resident(&self) -> Result<bool, FetchError> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(false),
        };
        match self.kind {
            SourceKind::Local => match path.is_dir() {
                true => Ok(true),
                false => Err(FetchError::MissingLocal(path.clone())),
            },
            _ => Ok(filesystem::is_nonempty_dir(path)),
        }
    }

    /// Evaluates the module's manifest with the inherited `context`.
    ///
    /// Evaluating an already-evaluated module returns the existing options.
    pub fn evaluate(&mut self, context: OptionMap) -> Result<&OptionMap, ManifestError> {
        if self.options.is_none() {
            let dir = self.path.clone().unwrap_or_default();
            let options = evaluate_dir(&dir, context)?;
            self.set_options(options);
        }
        // the branch above guarantees a value
        Ok(self.options.get_or_insert_with(OptionMap::new))
    }

    /// Stores the result of evaluating the module's manifest elsewhere.
    pub(crate) fn set_options(&mut self, options: OptionMap) {
        if self.options.is_some() {
            return;
        }
        self.synthesis = SynthesisConfig::from_options(&options);
        self.simulation = SimulationConfig::from_options(&options);
        self.options = Some(options);
    }

    fn get_str(&self, name: &str) -> Option<&str> {
        self.options
            .as_ref()
            .and_then(|o| o.get(name))
            .and_then(|v| v.as_str())
    }

    fn get_paths(&self, name: &str) -> Vec<PathBuf> {
        self.options
            .as_ref()
            .and_then(|o| o.get(name))
            .and_then(|v| v.to_str_list())
            .unwrap_or_default()
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    pub fn get_library(&self) -> &str {
        self.get_str("library")
            .unwrap_or(crate::core::lang::relation::WORK_LIBRARY)
    }

    pub fn get_action(&self) -> Option<&str> {
        self.get_str("action").filter(|a| a.is_empty() == false)
    }

    pub fn get_files(&self) -> Vec<PathBuf> {
        self.get_paths("files")
    }

    pub fn get_sim_only_files(&self) -> Vec<PathBuf> {
        self.get_paths("sim_only_files")
    }

    pub fn get_include_dirs(&self) -> Vec<PathBuf> {
        self.get_paths("include_dirs")
    }

    pub fn get_incl_makefiles(&self) -> Vec<PathBuf> {
        self.get_paths("incl_makefiles")
    }

    pub fn get_fetch_pre_cmd(&self) -> Option<&str> {
        self.get_str("fetch_pre_cmd").filter(|c| c.is_empty() == false)
    }

    pub fn get_fetch_post_cmd(&self) -> Option<&str> {
        self.get_str("fetch_post_cmd").filter(|c| c.is_empty() == false)
    }

    /// Directory that remote modules referenced by this module are fetched into.
    ///
    /// Defaults to the module's own directory.
    pub fn get_fetchto(&self) -> PathBuf {
        match self.get_str("fetchto") {
            Some(f) => PathBuf::from(f),
            None => self.path.clone().unwrap_or_default(),
        }
    }

    /// Lists every module referenced by the `modules` option, in declaration order.
    pub fn get_references(&self) -> Vec<ModuleRef> {
        let modules = match self
            .options
            .as_ref()
            .and_then(|o| o.get("modules"))
            .and_then(|v| v.as_dict())
        {
            Some(m) => m,
            None => return Vec::new(),
        };
        modules
            .iter()
            .filter_map(|(key, urls)| SourceKind::from_key(key).map(|kind| (kind, urls)))
            .flat_map(|(kind, urls)| {
                urls.to_str_list()
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |url| ModuleRef {
                        kind: kind,
                        url: url,
                    })
            })
            .collect()
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}

/// Locates and evaluates the manifest inside `dir`.
pub fn evaluate_dir(dir: &Path, context: OptionMap) -> Result<OptionMap, ManifestError> {
    let manifest = manifest::find_manifest(dir)?;
    manifest::evaluate(dir, manifest.as_deref(), context)
}

/// Strips trailing slashes and a `.git` suffix from a repository url.
pub fn canonicalize_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url).to_string()
}

/// Splits `s` at the last occurrence of `sep`.
fn split_suffix<'a>(s: &'a str, sep: &str) -> (&'a str, Option<&'a str>) {
    match s.rsplit_once(sep) {
        Some((base, suffix)) if suffix.is_empty() == false => (base, Some(suffix)),
        Some((base, _)) => (base, None),
        None => (s, None),
    }
}

/// Splits an svn url from its `@revision` pin.
///
/// An `@` that is followed by more path is part of the url (`user@host/...`).
fn split_svn_revision(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once(SVN_REVISION_SEPARATOR) {
        Some((base, rev)) if rev.contains('/') == false && rev.is_empty() == false => {
            (base, Some(rev))
        }
        _ => (s, None),
    }
}

/// Takes the last path segment of a repository url.
fn basename(url: &str) -> Result<String, FetchError> {
    match url.rsplit(|c| c == '/' || c == ':').next() {
        Some(name) if name.is_empty() == false => Ok(name.to_string()),
        _ => Err(FetchError::InvalidUrl(
            url.to_string(),
            "cannot determine the repository name".to_string(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use indexmap::IndexMap;
    use std::fs;
    use tempfile::tempdir;

    fn git(url: &str) -> ModuleRef {
        ModuleRef {
            kind: SourceKind::GitRepo,
            url: url.to_string(),
        }
    }

    #[test]
    fn git_urls() {
        let m = Module::from_ref(
            &git("https://host/group/cores.git/::dev@@4f2a"),
            0,
            Path::new("/work"),
            Path::new("/deps"),
        )
        .unwrap();
        assert_eq!(m.get_url(), "https://host/group/cores");
        assert_eq!(m.get_branch(), Some("dev"));
        assert_eq!(m.get_revision(), Some("4f2a"));
        assert_eq!(m.get_path(), Some(&PathBuf::from("/deps/cores")));
        assert_eq!(m.get_parent(), Some(0));
        assert_eq!(m.is_fetched(), false);

        let m = Module::from_ref(&git("git@host:cores.git"), 0, Path::new("/w"), Path::new("/d"))
            .unwrap();
        assert_eq!(m.get_url(), "git@host:cores");
        assert_eq!(m.get_branch(), None);
        assert_eq!(m.get_path(), Some(&PathBuf::from("/d/cores")));
    }

    #[test]
    fn svn_urls() {
        let r = ModuleRef {
            kind: SourceKind::SvnRepo,
            url: "svn://user@host/repo/trunk/ip@120".to_string(),
        };
        let m = Module::from_ref(&r, 0, Path::new("/w"), Path::new("/d")).unwrap();
        assert_eq!(m.get_url(), "svn://user@host/repo/trunk/ip");
        assert_eq!(m.get_revision(), Some("120"));
        assert_eq!(m.get_path(), Some(&PathBuf::from("/d/ip")));

        let r = ModuleRef {
            kind: SourceKind::SvnRepo,
            url: "svn://user@host/repo/".to_string(),
        };
        let m = Module::from_ref(&r, 0, Path::new("/w"), Path::new("/d")).unwrap();
        assert_eq!(m.get_url(), "svn://user@host/repo");
        assert_eq!(m.get_revision(), None);
    }

    #[test]
    fn local_urls_are_normalized() {
        let r = ModuleRef {
            kind: SourceKind::Local,
            url: "../shared/./fifo/".to_string(),
        };
        let m = Module::from_ref(&r, 3, Path::new("/proj/top"), Path::new("/d")).unwrap();
        assert_eq!(m.get_url(), "/proj/shared/fifo");
        assert_eq!(m.get_path(), Some(&PathBuf::from("/proj/shared/fifo")));
        assert!(matches!(m.is_resident(), Err(FetchError::MissingLocal(_))));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("top.vhd"), "").unwrap();
        fs::write(
            dir.path().join("manifest.py"),
            "files = 'top.vhd'\nsim_tool = 'ghdl'\nsim_top = 'tb'\nmodules = {'local': ['a', 'b'], 'git': 'https://h/x.git'}\n",
        )
        .unwrap();
        let mut m = Module::root(dir.path());
        let first = m.evaluate(OptionMap::new()).unwrap().clone();
        fs::write(dir.path().join("manifest.py"), "library = 'other'\n").unwrap();
        let mut ctx = OptionMap::new();
        ctx.insert("x".to_string(), Value::Int(1));
        let second = m.evaluate(ctx).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(m.get_library(), "work");
        assert_eq!(m.get_files(), vec![dir.path().join("top.vhd")]);
        assert_eq!(
            m.get_references(),
            vec![
                ModuleRef { kind: SourceKind::Local, url: "a".to_string() },
                ModuleRef { kind: SourceKind::Local, url: "b".to_string() },
                ModuleRef { kind: SourceKind::GitRepo, url: "https://h/x.git".to_string() },
            ]
        );
        let sim = m.get_simulation().unwrap();
        assert_eq!(sim.tool.as_deref(), Some("ghdl"));
        assert_eq!(sim.top.as_deref(), Some("tb"));
        assert_eq!(m.get_synthesis(), None);
        assert_eq!(m.get_fetchto(), dir.path().to_path_buf());
    }

    #[test]
    fn synthesis_settings() {
        let mut opts = OptionMap::new();
        opts.insert("syn_device".to_string(), Value::from("xc7a35t"));
        opts.insert("syn_pre_map_cmd".to_string(), Value::from("echo map"));
        opts.insert("syn_properties".to_string(), Value::List(vec![Value::Dict(IndexMap::new())]));
        let cfg = SynthesisConfig::from_options(&opts).unwrap();
        assert_eq!(cfg.device.as_deref(), Some("xc7a35t"));
        assert_eq!(cfg.hooks, vec![("syn_pre_map_cmd".to_string(), "echo map".to_string())]);
        assert_eq!(cfg.properties.len(), 1);
        assert_eq!(SimulationConfig::from_options(&opts), None);
    }
}

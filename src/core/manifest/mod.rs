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

//! Evaluates a module's manifest script into a validated option map.

pub mod error;
pub mod schema;
pub mod script;
pub mod token;
pub mod value;

use crate::core::lang::Dialect;
use crate::util::filesystem;
use error::ManifestError;
use schema::SchemaViolation;
use std::path::{Path, PathBuf};
use value::{OptionMap, Value};

pub use schema::inherit;

/// Accepted manifest file names, in lookup order.
pub const MANIFEST_FILES: [&str; 2] = ["manifest.py", "Manifest.py"];

/// File extensions taken when a `files` entry names a directory.
const AUX_EXTENSIONS: [&str; 14] = [
    "xdc", "ucf", "sdc", "tcl", "xci", "xco", "qip", "qsys", "ngc", "bmm", "mif", "coe", "lpf",
    "pdc",
];

/// Options holding a path or list of paths relative to the module directory.
const PATH_LISTS: [&str; 4] = ["files", "include_dirs", "incl_makefiles", "sim_only_files"];

pub const ACTIONS: [&str; 2] = ["simulation", "synthesis"];

/// Locates the manifest file directly inside `dir`.
///
/// Errors if more than one accepted name is present.
pub fn find_manifest(dir: &Path) -> Result<Option<PathBuf>, ManifestError> {
    let names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => return Ok(None),
    };
    let found: Vec<&str> = MANIFEST_FILES
        .iter()
        .filter(|m| names.iter().any(|n| n == *m))
        .map(|m| *m)
        .collect();
    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(dir.join(found[0]))),
        _ => Err(ManifestError::AmbiguousManifest(dir.to_path_buf())),
    }
}

/// Evaluates the manifest of the module rooted at `dir`.
///
/// When `manifest` is `None` the module has no script and only the schema
/// defaults and `context` apply.
pub fn evaluate(
    dir: &Path,
    manifest: Option<&Path>,
    context: OptionMap,
) -> Result<OptionMap, ManifestError> {
    let (bindings, origin) = match manifest {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| ManifestError::Unreadable(path.to_path_buf(), e.to_string()))?;
            let outcome = script::run(&source, context)
                .map_err(|e| ManifestError::Script(path.to_path_buf(), e))?;
            for line in &outcome.printed {
                tracing::info!("{}: {}", path.display(), line);
            }
            (outcome.bindings, path.to_path_buf())
        }
        None => (context, dir.to_path_buf()),
    };

    let mut options = schema::validate(bindings).map_err(|v| match v {
        SchemaViolation::TypeMismatch(name, expected, got) => {
            ManifestError::TypeMismatch(origin.clone(), name, expected, got)
        }
        SchemaViolation::DisallowedKey(name, key, allowed) => {
            ManifestError::DisallowedKey(origin.clone(), name, key, allowed)
        }
    })?;

    check_action(&options, &origin)?;
    check_modules(&options, &origin)?;

    if let Some(fetchto) = options.get("fetchto").and_then(|v| v.as_str()) {
        let resolved = filesystem::resolve_rel_path(dir, fetchto);
        options.insert(
            "fetchto".to_string(),
            Value::Str(resolved.to_string_lossy().to_string()),
        );
    }

    for name in PATH_LISTS {
        let entries = match options.get(name).and_then(|v| v.to_str_list()) {
            Some(e) => e,
            // a list holding something other than str
            None => {
                return Err(ManifestError::TypeMismatch(
                    origin.clone(),
                    name.to_string(),
                    "str or list of str".to_string(),
                    "list".to_string(),
                ))
            }
        };
        let paths = match name {
            "files" | "sim_only_files" => resolve_files(dir, &entries, &origin)?,
            _ => entries
                .iter()
                .map(|e| filesystem::resolve_rel_path(dir, e))
                .collect(),
        };
        options.insert(
            name.to_string(),
            Value::List(
                paths
                    .into_iter()
                    .map(|p| Value::Str(p.to_string_lossy().to_string()))
                    .collect(),
            ),
        );
    }
    Ok(options)
}

fn check_action(options: &OptionMap, origin: &Path) -> Result<(), ManifestError> {
    match options.get("action").and_then(|v| v.as_str()) {
        Some(a) if a.is_empty() == false && ACTIONS.contains(&a) == false => Err(
            ManifestError::InvalidAction(origin.to_path_buf(), a.to_string()),
        ),
        _ => Ok(()),
    }
}

/// Every entry of `modules` must be a `str` or a list of `str`.
fn check_modules(options: &OptionMap, origin: &Path) -> Result<(), ManifestError> {
    if let Some(modules) = options.get("modules").and_then(|v| v.as_dict()) {
        for (key, value) in modules {
            if value.is_none() == true || value.to_str_list().is_none() == true {
                return Err(ManifestError::TypeMismatch(
                    origin.to_path_buf(),
                    format!("modules['{}']", key),
                    "str or list of str".to_string(),
                    value.type_name().to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn is_pattern(s: &str) -> bool {
    s.contains(|c: char| c == '*' || c == '?' || c == '[')
}

/// Checks if a file found while walking a listed directory is a source file.
fn is_recognized(p: &Path) -> bool {
    if Dialect::from_path(p).is_hdl() == true {
        return true;
    }
    match p.extension().and_then(|e| e.to_str()) {
        Some(ext) => AUX_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Expands `files`-like entries into existing absolute file paths.
fn resolve_files(
    dir: &Path,
    entries: &[String],
    origin: &Path,
) -> Result<Vec<PathBuf>, ManifestError> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut push = |p: PathBuf| {
        if files.contains(&p) == false {
            files.push(p);
        }
    };
    for entry in entries {
        let path = filesystem::resolve_rel_path(dir, entry);
        if is_pattern(entry) == true {
            let pattern = path.to_string_lossy().to_string();
            let matches = glob::glob(&pattern).map_err(|e| {
                ManifestError::BadPattern(origin.to_path_buf(), entry.clone(), e.to_string())
            })?;
            let mut found: Vec<PathBuf> = matches
                .filter_map(|m| m.ok())
                .filter(|m| m.is_file())
                .map(|m| filesystem::normalize(&m))
                .collect();
            if found.is_empty() == true {
                return Err(ManifestError::MissingFile(origin.to_path_buf(), path));
            }
            found.sort();
            found.into_iter().for_each(&mut push);
        } else if path.is_dir() == true {
            filesystem::gather_files(&path)
                .into_iter()
                .filter(|f| is_recognized(f))
                .for_each(&mut push);
        } else if path.is_file() == true {
            push(path);
        } else {
            return Err(ManifestError::MissingFile(origin.to_path_buf(), path));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn strs(v: &Value) -> Vec<String> {
        v.to_str_list().unwrap()
    }

    #[test]
    fn finds_a_single_manifest() {
        let dir = tempdir().unwrap();
        assert_eq!(find_manifest(dir.path()).unwrap(), None);
        fs::write(dir.path().join("Manifest.py"), "").unwrap();
        assert_eq!(
            find_manifest(dir.path()).unwrap(),
            Some(dir.path().join("Manifest.py"))
        );
    }

    #[test]
    fn two_manifests_are_ambiguous() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("manifest.py"), "").unwrap();
        fs::write(dir.path().join("Manifest.py"), "").unwrap();
        // case-insensitive file systems hold only one of the two
        let names = fs::read_dir(dir.path()).unwrap().count();
        if names == 2 {
            assert_eq!(
                find_manifest(dir.path()).unwrap_err(),
                ManifestError::AmbiguousManifest(dir.path().to_path_buf())
            );
        }
    }

    #[test]
    fn resolves_paths_against_module_dir() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("rtl/sub")).unwrap();
        fs::write(root.join("top.vhd"), "").unwrap();
        fs::write(root.join("rtl/a.vhd"), "").unwrap();
        fs::write(root.join("rtl/sub/b.sv"), "").unwrap();
        fs::write(root.join("rtl/sub/notes.txt"), "").unwrap();
        fs::write(root.join("rtl/pins.xdc"), "").unwrap();
        let manifest = root.join("manifest.py");
        fs::write(
            &manifest,
            "files = ['top.vhd', 'rtl']\ninclude_dirs = 'inc'\nfetchto = '../deps'\naction = 'simulation'\n",
        )
        .unwrap();
        let opts = evaluate(root, Some(&manifest), OptionMap::new()).unwrap();
        assert_eq!(
            strs(opts.get("files").unwrap()),
            vec![
                root.join("top.vhd").to_string_lossy().to_string(),
                root.join("rtl/a.vhd").to_string_lossy().to_string(),
                root.join("rtl/pins.xdc").to_string_lossy().to_string(),
                root.join("rtl/sub/b.sv").to_string_lossy().to_string(),
            ]
        );
        assert_eq!(
            strs(opts.get("include_dirs").unwrap()),
            vec![root.join("inc").to_string_lossy().to_string()]
        );
        let parent = root.parent().unwrap();
        assert_eq!(
            opts.get("fetchto").unwrap().as_str(),
            parent.join("deps").to_str()
        );
    }

    #[test]
    fn globs_and_missing_files() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("b.v"), "").unwrap();
        fs::write(root.join("a.v"), "").unwrap();
        let manifest = root.join("manifest.py");
        fs::write(&manifest, "files = '*.v'\n").unwrap();
        let opts = evaluate(root, Some(&manifest), OptionMap::new()).unwrap();
        assert_eq!(
            strs(opts.get("files").unwrap()),
            vec![
                root.join("a.v").to_string_lossy().to_string(),
                root.join("b.v").to_string_lossy().to_string(),
            ]
        );

        fs::write(&manifest, "files = ['a.v', 'gone.v']\n").unwrap();
        assert_eq!(
            evaluate(root, Some(&manifest), OptionMap::new()).unwrap_err(),
            ManifestError::MissingFile(manifest.clone(), root.join("gone.v"))
        );
    }

    #[test]
    fn rejects_bad_actions_and_module_values() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let manifest = root.join("manifest.py");
        fs::write(&manifest, "action = 'build'\n").unwrap();
        assert_eq!(
            evaluate(root, Some(&manifest), OptionMap::new()).unwrap_err(),
            ManifestError::InvalidAction(manifest.clone(), "build".to_string())
        );
        fs::write(&manifest, "modules = {'local': 3}\n").unwrap();
        assert!(matches!(
            evaluate(root, Some(&manifest), OptionMap::new()),
            Err(ManifestError::TypeMismatch(_, _, _, _))
        ));
        fs::write(&manifest, "modules = {'ftp': 'x'}\n").unwrap();
        assert!(matches!(
            evaluate(root, Some(&manifest), OptionMap::new()),
            Err(ManifestError::DisallowedKey(_, _, _, _))
        ));
        fs::write(&manifest, "files = [\n").unwrap();
        assert!(matches!(
            evaluate(root, Some(&manifest), OptionMap::new()),
            Err(ManifestError::Script(_, _))
        ));
    }

    #[test]
    fn children_inherit_all_but_module_options() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.vhd"), "").unwrap();
        let manifest = root.join("manifest.py");
        fs::write(
            &manifest,
            "files = 'a.vhd'\nlibrary = 'mylib'\nsim_tool = 'ghdl'\ntarget = 'xilinx'\n__tmp = 1\nmodules = {'local': 'child'}\n",
        )
        .unwrap();
        let parent = evaluate(root, Some(&manifest), OptionMap::new()).unwrap();

        let child_dir = root.join("child");
        fs::create_dir(&child_dir).unwrap();
        let child_manifest = child_dir.join("manifest.py");
        fs::write(
            &child_manifest,
            "if target == 'xilinx':\n    syn_device = 'xc7a35t'\n",
        )
        .unwrap();
        let child = evaluate(&child_dir, Some(&child_manifest), inherit(&parent)).unwrap();
        assert_eq!(child.get("library"), Some(&Value::from("work")));
        assert_eq!(child.get("files"), Some(&Value::List(vec![])));
        assert_eq!(child.get("modules").unwrap().as_dict().unwrap().len(), 0);
        assert_eq!(child.get("sim_tool"), Some(&Value::from("ghdl")));
        assert_eq!(child.get("syn_device"), Some(&Value::from("xc7a35t")));
        assert_eq!(child.contains_key("__tmp"), false);
    }

    #[test]
    fn missing_manifest_uses_context() {
        let dir = tempdir().unwrap();
        let mut ctx = OptionMap::new();
        ctx.insert("sim_tool".to_string(), Value::from("modelsim"));
        let opts = evaluate(dir.path(), None, ctx).unwrap();
        assert_eq!(opts.get("sim_tool"), Some(&Value::from("modelsim")));
        assert_eq!(opts.get("library"), Some(&Value::from("work")));
    }
}

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

//! Orders a file set so that every file follows the files it depends on.

use crate::core::fileset::{FileSet, SourceFile};
use crate::core::lang::relation::Relation;
use crate::util::graph::NodeIndex;
use crate::util::graphmap::GraphMap;
use serde_derive::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Libraries whose units are provided by the tools, not by the project.
pub const DEFAULT_STD_LIBS: &[&str] = &[
    "std",
    "ieee",
    "ieee_proposed",
    "synopsys",
    "vl",
    "unisim",
    "unimacro",
    "unifast",
    "simprim",
    "secureip",
    "xilinxcorelib",
    "altera",
    "altera_mf",
    "altera_lnsim",
    "lpm",
    "sgate",
];

/// A dependency that could not be pinned to exactly one file.
///
/// Warnings never stop a solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "lowercase")]
pub enum RelationWarning {
    Unresolved {
        file: PathBuf,
        relation: Relation,
    },
    Ambiguous {
        file: PathBuf,
        relation: Relation,
        providers: Vec<PathBuf>,
    },
}

impl RelationWarning {
    pub fn get_file(&self) -> &PathBuf {
        match self {
            Self::Unresolved { file, .. } => file,
            Self::Ambiguous { file, .. } => file,
        }
    }

    /// Formats the warning as a single-line JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Display for RelationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved { file, relation } => {
                write!(f, "{:?} {}, but nothing provides it", file, relation)
            }
            Self::Ambiguous {
                file,
                relation,
                providers,
            } => {
                write!(f, "{:?} {}, which is provided by {} files:", file, relation, providers.len())?;
                for p in providers {
                    write!(f, " {:?}", p)?;
                }
                Ok(())
            }
        }
    }
}

/// The files that depend on each other in a circle, one list per cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct CycleError(pub Vec<Vec<PathBuf>>);

impl Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dependency cycle detected between files")?;
        for (i, set) in self.0.iter().enumerate() {
            write!(f, "\n  cycle {}:", i + 1)?;
            for p in set {
                write!(f, " {:?}", p)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("file {0:?} must be analyzed before it can be ordered")]
    NotAnalyzed(PathBuf),
    #[error("{0}")]
    Cycle(#[from] CycleError),
}

/// An edge from the file that provides `relation` to the file that uses it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dependency {
    pub provider: PathBuf,
    pub user: PathBuf,
    pub relation: Relation,
}

/// The outcome of ordering a file set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    order: Vec<PathBuf>,
    edges: Vec<Dependency>,
    warnings: Vec<RelationWarning>,
}

impl Solution {
    /// References the files in compile order.
    pub fn get_order(&self) -> &Vec<PathBuf> {
        &self.order
    }

    pub fn get_edges(&self) -> &Vec<Dependency> {
        &self.edges
    }

    pub fn get_warnings(&self) -> &Vec<RelationWarning> {
        &self.warnings
    }

    /// Formats every warning as one JSON object per line.
    pub fn warnings_to_json(&self) -> String {
        self.warnings
            .iter()
            .map(|w| w.to_json())
            .collect::<Vec<String>>()
            .join("\n")
    }
}

/// Orders the analyzed files of `files` so providers come before their users.
///
/// Units of the libraries listed in `std_libs` are expected to be missing.
/// Each call builds a fresh graph, so solving again after the file set
/// changed gives a fresh answer.
pub fn solve(files: &FileSet, std_libs: &[String]) -> Result<Solution, SolveError> {
    let mut graph: GraphMap<PathBuf, &SourceFile, Relation> = GraphMap::new();
    let mut providers: HashMap<&Relation, Vec<NodeIndex>> = HashMap::new();

    for file in files.iter() {
        let relations = file
            .get_relations()
            .ok_or_else(|| SolveError::NotAnalyzed(file.get_path().clone()))?;
        let index = graph.add_node(file.get_path().clone(), file);
        for rel in relations.iter().filter(|r| r.is_provide()) {
            providers.entry(rel).or_insert_with(Vec::new).push(index);
        }
    }

    let mut warnings = Vec::new();
    let mut edges = Vec::new();
    for (user, file) in files.iter().enumerate() {
        let relations = match file.get_relations() {
            Some(r) => r,
            None => continue,
        };
        for rel in relations.iter().filter(|r| r.is_use()) {
            let wanted = rel.to_provide();
            // the file satisfies its own use
            if relations.contains(&wanted) == true {
                continue;
            }
            let found: Vec<NodeIndex> = providers
                .get(&wanted)
                .map(|v| v.iter().copied().filter(|p| *p != user).collect())
                .unwrap_or_default();
            match found.len() {
                0 => {
                    let is_std = rel
                        .get_library()
                        .map(|lib| std_libs.iter().any(|s| s.eq_ignore_ascii_case(lib)))
                        .unwrap_or(false);
                    if is_std == false {
                        warnings.push(RelationWarning::Unresolved {
                            file: file.get_path().clone(),
                            relation: rel.clone(),
                        });
                    }
                }
                n => {
                    if n > 1 {
                        warnings.push(RelationWarning::Ambiguous {
                            file: file.get_path().clone(),
                            relation: rel.clone(),
                            providers: found.iter().map(|p| path_of(&graph, *p)).collect(),
                        });
                    }
                    for p in found {
                        if graph.add_edge_by_index(p, user, rel.clone()).is_ok() == true {
                            edges.push(Dependency {
                                provider: path_of(&graph, p),
                                user: file.get_path().clone(),
                                relation: rel.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    for w in &warnings {
        tracing::warn!("{}", w);
    }

    let has_uses: Vec<bool> = files.iter().map(|f| f.has_uses()).collect();
    let order = graph
        .get_graph()
        .topological_sort_by_key(|i| (has_uses[i], i))
        .map_err(|sccs| {
            CycleError(
                sccs.into_iter()
                    .map(|set| set.into_iter().map(|i| path_of(&graph, i)).collect())
                    .collect(),
            )
        })?;

    Ok(Solution {
        order: order.into_iter().map(|i| path_of(&graph, i)).collect(),
        edges: edges,
        warnings: warnings,
    })
}

fn path_of<V, E>(graph: &GraphMap<PathBuf, V, E>, index: NodeIndex) -> PathBuf {
    graph.get_key_by_index(index).cloned().unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::lang::relation::{RelationKind, RelationSet};

    fn file(path: &str, library: &str, rels: Vec<Relation>) -> SourceFile {
        let mut f = SourceFile::new(PathBuf::from(path), 0, library);
        f.set_analysis(rels.into_iter().collect::<RelationSet>(), Vec::new());
        f
    }

    fn provide(kind: RelationKind, name: &str) -> Relation {
        Relation::provide(kind, name.to_string())
    }

    fn uses(kind: RelationKind, name: &str) -> Relation {
        Relation::uses(kind, name.to_string())
    }

    fn std_libs() -> Vec<String> {
        DEFAULT_STD_LIBS.iter().map(|s| s.to_string()).collect()
    }

    fn order(sol: &Solution) -> Vec<&str> {
        sol.get_order().iter().map(|p| p.to_str().unwrap()).collect()
    }

    #[test]
    fn providers_come_first() {
        let files: FileSet = vec![
            file(
                "/top.vhd",
                "work",
                vec![
                    provide(RelationKind::Entity, "work.top"),
                    uses(RelationKind::Entity, "work.alu"),
                    uses(RelationKind::Package, "work.types"),
                    uses(RelationKind::Package, "ieee.std_logic_1164"),
                ],
            ),
            file(
                "/alu.vhd",
                "work",
                vec![
                    provide(RelationKind::Entity, "work.alu"),
                    uses(RelationKind::Package, "work.types"),
                ],
            ),
            file("/types.vhd", "work", vec![provide(RelationKind::Package, "work.types")]),
            file("/util.vhd", "work", vec![provide(RelationKind::Package, "work.util")]),
        ]
        .into_iter()
        .collect();
        let sol = solve(&files, &std_libs()).unwrap();
        // files without uses come first, by discovery index
        assert_eq!(order(&sol), vec!["/types.vhd", "/util.vhd", "/alu.vhd", "/top.vhd"]);
        assert_eq!(sol.get_edges().len(), 3);
        assert_eq!(sol.get_warnings().len(), 0);
    }

    #[test]
    fn uses_resolve_within_the_library() {
        let files: FileSet = vec![
            file("/a/top.vhd", "mylib", vec![uses(RelationKind::Package, "mylib.pkg")]),
            file("/b/pkg.vhd", "other", vec![provide(RelationKind::Package, "other.pkg")]),
            file("/a/pkg.vhd", "mylib", vec![provide(RelationKind::Package, "mylib.pkg")]),
        ]
        .into_iter()
        .collect();
        let sol = solve(&files, &std_libs()).unwrap();
        assert_eq!(order(&sol), vec!["/b/pkg.vhd", "/a/pkg.vhd", "/a/top.vhd"]);
        assert_eq!(
            sol.get_edges(),
            &vec![Dependency {
                provider: PathBuf::from("/a/pkg.vhd"),
                user: PathBuf::from("/a/top.vhd"),
                relation: uses(RelationKind::Package, "mylib.pkg"),
            }]
        );
    }

    #[test]
    fn internal_and_missing_uses() {
        let files: FileSet = vec![file(
            "/top.vhd",
            "work",
            vec![
                provide(RelationKind::Entity, "work.top"),
                provide(RelationKind::Package, "work.local_pkg"),
                uses(RelationKind::Package, "work.local_pkg"),
                uses(RelationKind::Package, "ieee.numeric_std"),
                uses(RelationKind::Architecture, "work.missing"),
            ],
        )]
        .into_iter()
        .collect();
        let sol = solve(&files, &std_libs()).unwrap();
        assert_eq!(
            sol.get_warnings(),
            &vec![RelationWarning::Unresolved {
                file: PathBuf::from("/top.vhd"),
                relation: uses(RelationKind::Architecture, "work.missing"),
            }]
        );
        assert_eq!(
            sol.warnings_to_json(),
            r#"{"warning":"unresolved","file":"/top.vhd","relation":{"direction":"use","kind":"architecture","name":"work.missing"}}"#
        );

        // without an allow-list the standard library is reported too
        let sol = solve(&files, &[]).unwrap();
        assert_eq!(sol.get_warnings().len(), 2);
    }

    #[test]
    fn ambiguous_providers() {
        let files: FileSet = vec![
            file("/top.v", "work", vec![uses(RelationKind::Architecture, "work.fifo")]),
            file("/fifo_a.v", "work", vec![provide(RelationKind::Architecture, "work.fifo")]),
            file("/fifo_b.v", "work", vec![provide(RelationKind::Architecture, "work.fifo")]),
        ]
        .into_iter()
        .collect();
        let sol = solve(&files, &std_libs()).unwrap();
        assert_eq!(order(&sol), vec!["/fifo_a.v", "/fifo_b.v", "/top.v"]);
        assert_eq!(sol.get_edges().len(), 2);
        match &sol.get_warnings()[..] {
            [RelationWarning::Ambiguous { providers, .. }] => assert_eq!(
                providers,
                &vec![PathBuf::from("/fifo_a.v"), PathBuf::from("/fifo_b.v")]
            ),
            w => panic!("unexpected warnings {:?}", w),
        }
    }

    #[test]
    fn cycles_are_reported() {
        let files: FileSet = vec![
            file("/base.vhd", "work", vec![provide(RelationKind::Package, "work.base")]),
            file(
                "/a.vhd",
                "work",
                vec![
                    provide(RelationKind::Package, "work.a"),
                    uses(RelationKind::Package, "work.b"),
                    uses(RelationKind::Package, "work.base"),
                ],
            ),
            file(
                "/b.vhd",
                "work",
                vec![
                    provide(RelationKind::Package, "work.b"),
                    uses(RelationKind::Package, "work.a"),
                ],
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            solve(&files, &std_libs()).unwrap_err(),
            SolveError::Cycle(CycleError(vec![vec![
                PathBuf::from("/a.vhd"),
                PathBuf::from("/b.vhd")
            ]]))
        );
    }

    #[test]
    fn solving_is_repeatable() {
        let mut files: FileSet = vec![
            file("/top.vhd", "work", vec![uses(RelationKind::Entity, "work.core")]),
            file("/core.vhd", "work", vec![provide(RelationKind::Entity, "work.core")]),
        ]
        .into_iter()
        .collect();
        let first = solve(&files, &std_libs()).unwrap();
        assert_eq!(solve(&files, &std_libs()).unwrap(), first);

        files.insert(SourceFile::new(PathBuf::from("/new.vhd"), 0, "work"));
        assert_eq!(
            solve(&files, &std_libs()).unwrap_err(),
            SolveError::NotAnalyzed(PathBuf::from("/new.vhd"))
        );
        files
            .get_mut(&PathBuf::from("/new.vhd"))
            .unwrap()
            .set_analysis(RelationSet::new(), Vec::new());
        let sol = solve(&files, &std_libs()).unwrap();
        assert_eq!(order(&sol), vec!["/core.vhd", "/new.vhd", "/top.vhd"]);
    }
}

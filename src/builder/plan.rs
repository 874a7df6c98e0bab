//! Build order planning.
//!
//! Every library version in the manifest becomes one plan entry. By default
//! entries run in declaration order. A version may also name libraries it
//! `depends_on`; those are then guaranteed to come first. Among entries
//! that are ready at the same time, the one declared first wins, so a
//! manifest without prerequisites plans to exactly its declaration order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use thiserror::Error;

use crate::core::manifest::{Manifest, VersionConfig};

/// The manifest can't be put in a valid build order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("`{library}-{version}` depends on unknown library `{dependency}`")]
    UnknownDependency {
        library: String,
        version: String,
        dependency: String,
    },

    #[error("prerequisite cycle between {}", members.join(", "))]
    Cycle { members: Vec<String> },
}

/// One library version in build order.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry<'m> {
    pub library: &'m str,
    pub version: &'m str,
    #[serde(skip)]
    pub config: &'m VersionConfig,
    /// Position in the manifest.
    pub declared_index: usize,
}

/// Library versions in the order they will be processed.
#[derive(Debug, Clone)]
pub struct BuildPlan<'m> {
    entries: Vec<PlanEntry<'m>>,
}

impl<'m> BuildPlan<'m> {
    /// Order every library version in the manifest.
    pub fn new(manifest: &'m Manifest) -> Result<Self, PlanError> {
        let declared: Vec<PlanEntry<'m>> = manifest
            .libraries()
            .flat_map(|(library, versions)| {
                versions.iter().map(move |(version, config)| (library, version, config))
            })
            .enumerate()
            .map(|(declared_index, (library, version, config))| PlanEntry {
                library,
                version: version.as_str(),
                config,
                declared_index,
            })
            .collect();

        // Node indices match declaration indices.
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(declared.len(), 0);
        for entry in &declared {
            graph.add_node(entry.declared_index);
        }

        for entry in &declared {
            for dependency in &entry.config.depends_on {
                let providers: Vec<_> = declared
                    .iter()
                    .filter(|e| e.library == dependency.as_str())
                    .map(|e| e.declared_index)
                    .collect();

                if providers.is_empty() {
                    return Err(PlanError::UnknownDependency {
                        library: entry.library.to_string(),
                        version: entry.version.to_string(),
                        dependency: dependency.clone(),
                    });
                }

                for provider in providers {
                    graph.update_edge(
                        NodeIndex::new(provider),
                        NodeIndex::new(entry.declared_index),
                        (),
                    );
                }
            }
        }

        let order = stable_topological_order(&graph).ok_or_else(|| PlanError::Cycle {
            members: cycle_members(&graph, &declared),
        })?;

        let mut slots: Vec<Option<PlanEntry<'m>>> = declared.into_iter().map(Some).collect();
        let entries = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        Ok(BuildPlan { entries })
    }

    pub fn entries(&self) -> &[PlanEntry<'m>] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry<'m>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Kahn's algorithm, always taking the earliest-declared ready node.
/// Returns `None` if the graph has a cycle.
fn stable_topological_order(graph: &DiGraph<usize, ()>) -> Option<Vec<usize>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for next in graph.neighbors_directed(NodeIndex::new(index), Direction::Outgoing) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(next.index()));
            }
        }
    }

    (order.len() == graph.node_count()).then_some(order)
}

fn cycle_members(graph: &DiGraph<usize, ()>, declared: &[PlanEntry<'_>]) -> Vec<String> {
    let mut members: Vec<usize> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(|n| n.index())
        .collect();
    members.sort_unstable();

    members
        .into_iter()
        .map(|i| format!("{}-{}", declared[i].library, declared[i].version))
        .collect()
}

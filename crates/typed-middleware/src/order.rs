//! Deterministic topological ordering (Kahn's algorithm)
//!
//! The "must run before" relation points from a dependency to each of its
//! dependents. When several components are ready at once, the one with the
//! smallest id (earliest discovered) runs first, so unchanged input always
//! produces the same order.

use std::collections::BTreeSet;

use tracing::trace;

use crate::error::{CompileError, Result};
use crate::graph::{ComponentId, DependencyGraph};

/// Invocation order: every component after all of its dependencies
pub fn order(graph: &DependencyGraph) -> Result<Vec<ComponentId>> {
    let count = graph.len();

    // in_degree[u] = number of dependencies u still waits on
    let mut in_degree = vec![0usize; count];
    let mut dependents: Vec<Vec<ComponentId>> = vec![Vec::new(); count];
    for component in graph.components() {
        for dep in &component.dependencies {
            in_degree[component.id.0] += 1;
            if let Some(list) = dependents.get_mut(dep.0) {
                list.push(component.id);
            }
        }
    }

    let mut ready: BTreeSet<ComponentId> = graph
        .components()
        .iter()
        .filter(|c| in_degree[c.id.0] == 0)
        .map(|c| c.id)
        .collect();

    let mut sorted = Vec::with_capacity(count);
    while let Some(id) = ready.pop_first() {
        trace!(id = id.0, "ordered component");
        sorted.push(id);

        for dependent in &dependents[id.0] {
            let degree = &mut in_degree[dependent.0];
            *degree -= 1;
            if *degree == 0 {
                ready.insert(*dependent);
            }
        }
    }

    if sorted.len() < count {
        let unresolved: Vec<String> = graph
            .components()
            .iter()
            .filter(|c| in_degree[c.id.0] > 0)
            .map(|c| c.key())
            .collect();
        let capability = unresolved.first().cloned().unwrap_or_default();
        return Err(CompileError::CyclicDependency {
            capability,
            chain: unresolved,
        });
    }

    Ok(sorted)
}

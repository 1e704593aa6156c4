//! Kahn's-algorithm dependency ordering over a task configuration map.
//!
//! The planner is used only to validate acyclicity and to seed the order in
//! which supervisor threads are launched; at runtime readiness is driven by
//! each task's ready latch, not by this serial order, so independent
//! dependency chains still make progress concurrently.

use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::config::TaskConfig;
use crate::error::ConfigError;

/// Returns a linear ordering in which every task appears after all of its
/// dependencies, tie-broken by insertion order of `tasks` (and therefore
/// deterministic across runs given identical input).
///
/// Fails with [`ConfigError::Cycle`] if the graph is not acyclic; the
/// returned task names are those left over once no more zero-in-degree
/// nodes remain, i.e. the tasks participating in (or downstream of) a
/// cycle.
pub fn topological_order(
    tasks: &IndexMap<String, TaskConfig>,
) -> Result<Vec<String>, ConfigError> {
    let mut in_degree: IndexMap<&str, usize> = tasks
        .values()
        .map(|cfg| (cfg.name.as_str(), cfg.depends_on.len()))
        .collect();

    let mut children: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for cfg in tasks.values() {
        for dep in &cfg.depends_on {
            children
                .entry(dep.as_str())
                .or_default()
                .push(cfg.name.as_str());
        }
    }

    let mut queue: VecDeque<&str> = tasks
        .keys()
        .map(String::as_str)
        .filter(|name| in_degree[name] == 0)
        .collect();

    let mut order = Vec::with_capacity(tasks.len());
    while let Some(name) = queue.pop_front() {
        order.push(name.to_string());
        if let Some(downstream) = children.get(name) {
            for &child in downstream {
                let degree = in_degree.get_mut(child).expect("child in in_degree map");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    if order.len() != tasks.len() {
        let remaining: Vec<String> = tasks
            .keys()
            .filter(|name| !order.contains(name))
            .cloned()
            .collect();
        return Err(ConfigError::Cycle(remaining));
    }

    Ok(order)
}

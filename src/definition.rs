use std::collections::VecDeque;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::{proposition::Proposition, types::*};

/// Topologically orders a dependency graph mapping each node to the set of
/// nodes it depends on.
///
/// Dependencies precede their dependents in the output; references to nodes
/// absent from the graph are treated as already satisfied. A cyclic graph has
/// no valid order and yields `None`. The order is deterministic in the
/// graph's insertion order (Kahn's algorithm over an ordered queue).
///
/// # Example
/// ```
/// use indexmap::IndexMap;
/// use lemmata::topological_sort;
///
/// let mut graph = IndexMap::new();
/// graph.insert('a', vec!['b']);
/// graph.insert('b', vec!['c']);
/// graph.insert('c', vec![]);
/// assert_eq!(topological_sort(&graph), Some(vec!['c', 'b', 'a']));
///
/// let mut cyclic = IndexMap::new();
/// cyclic.insert('a', vec!['b']);
/// cyclic.insert('b', vec!['a']);
/// assert_eq!(topological_sort(&cyclic), None);
/// ```
pub fn topological_sort<T: Copy + Eq + Hash>(graph: &IndexMap<T, Vec<T>>) -> Option<Vec<T>> {
    let mut in_degrees: IndexMap<T, usize> = IndexMap::with_capacity(graph.len());
    for (&node, dependencies) in graph {
        let degree = dependencies
            .iter()
            .filter(|dep| graph.contains_key(*dep))
            .count();
        in_degrees.insert(node, degree);
    }
    let mut dependents: IndexMap<T, Vec<T>> = IndexMap::with_capacity(graph.len());
    for (&node, dependencies) in graph {
        for dep in dependencies {
            if graph.contains_key(dep) {
                dependents.entry(*dep).or_default().push(node);
            }
        }
    }

    let mut queue: VecDeque<T> = in_degrees
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(graph.len());
    while let Some(node) = queue.pop_front() {
        order.push(node);
        if let Some(users) = dependents.get(&node) {
            for user in users.clone() {
                if let Some(degree) = in_degrees.get_mut(&user) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(user);
                    }
                }
            }
        }
    }

    if order.len() == graph.len() {
        Some(order)
    } else {
        None
    }
}

/// The auxiliary symbols a lemma's `apply` introduces, each with its defining
/// equality and the symbols that equality mentions.
///
/// [`conclude`][crate::conclude] emits the defining statements in dependency
/// order before the candidate that uses them; a cyclic graph marks the lemma
/// as ill-formed.
#[derive(Debug, Clone, Default)]
pub struct DefinitionGraph<P> {
    definitions: IndexMap<Variable, (P, Vec<Variable>)>,
}

impl<P: Proposition> DefinitionGraph<P> {
    pub fn new() -> Self {
        DefinitionGraph {
            definitions: IndexMap::new(),
        }
    }

    /// Adds the defining equality for `symbol`, declaring which other
    /// auxiliary symbols its body mentions. Re-inserting a symbol replaces
    /// its definition.
    pub fn insert(&mut self, symbol: Variable, defining: P, mentions: Vec<Variable>) {
        self.definitions.insert(symbol, (defining, mentions));
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn defining(&self, symbol: Variable) -> Option<&P> {
        self.definitions.get(&symbol).map(|(defining, _)| defining)
    }

    /// The emission order, or the cycle participants as the error value
    pub fn sorted(&self) -> Result<Vec<Variable>, Vec<Variable>> {
        let graph: IndexMap<Variable, Vec<Variable>> = self
            .definitions
            .iter()
            .map(|(&symbol, (_, mentions))| (symbol, mentions.clone()))
            .collect();
        match topological_sort(&graph) {
            Some(order) => Ok(order),
            None => {
                let ordered: IndexSet<Variable> = {
                    // every symbol left unemitted participates in or depends
                    // on a cycle
                    let partial = partial_order(&graph);
                    self.definitions
                        .keys()
                        .copied()
                        .filter(|s| !partial.contains(s))
                        .collect()
                };
                Err(ordered.into_iter().collect())
            }
        }
    }
}

fn partial_order(graph: &IndexMap<Variable, Vec<Variable>>) -> IndexSet<Variable> {
    let mut emitted = IndexSet::new();
    let mut progressed = true;
    while progressed {
        progressed = false;
        for (&node, dependencies) in graph {
            if emitted.contains(&node) {
                continue;
            }
            let ready = dependencies
                .iter()
                .all(|dep| !graph.contains_key(dep) || emitted.contains(dep));
            if ready {
                emitted.insert(node);
                progressed = true;
            }
        }
    }
    emitted
}

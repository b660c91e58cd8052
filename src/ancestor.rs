use std::collections::BTreeSet;

use crate::{
    error::EngineError,
    graph::Graph,
    propagate::Worklist,
    proposition::Proposition,
    statement::{Justification, Status},
    types::*,
};

impl<P: Proposition> Graph<P> {
    /// The set of root statements reachable from `id` by repeatedly following
    /// `equivalent` edges.
    ///
    /// A single target is followed unconditionally; a candidate list branches
    /// into its still-conjectured members only. A statement with no
    /// `equivalent` edge is its own root.
    pub fn equivalent_ancestor(&self, id: StatementId) -> BTreeSet<StatementId> {
        self.ancestors(id, false)
    }

    /// Like [`equivalent_ancestor`][Self::equivalent_ancestor], but a
    /// statement without an `equivalent` edge additionally follows its
    /// `given` edge (hypothesis sets branch into conjectured members only)
    pub fn given_ancestor(&self, id: StatementId) -> BTreeSet<StatementId> {
        self.ancestors(id, true)
    }

    fn ancestors(&self, id: StatementId, follow_given: bool) -> BTreeSet<StatementId> {
        let mut roots = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let node = self.node(current);
            let slot = if follow_given {
                node.equivalent.as_ref().or(node.given.as_ref())
            } else {
                node.equivalent.as_ref()
            };
            match slot {
                None => {
                    roots.insert(current);
                }
                Some(Justification::One(target)) => stack.push(*target),
                Some(Justification::All(ids)) => stack.extend(
                    ids.iter()
                        .copied()
                        .filter(|id| self.current_status(*id) == Status::Conjectured),
                ),
            }
        }
        roots
    }

    /// Collapses two independently derived proof branches into a shared
    /// equivalence.
    ///
    /// Takes the union of both ancestor sets and looks for one member able to
    /// absorb the others as its `equivalent` target: a member carrying an
    /// open induction is skipped, a member carrying a `given` can only hand
    /// that hypothesis over to a sole partner. After a successful merge,
    /// every statement that was a necessary hypothesis of either branch gets
    /// an induction-closure attempt, since the closure it was waiting on may
    /// just have been satisfied.
    pub(crate) fn set_equivalence_relationship(
        &mut self,
        a: StatementId,
        b: StatementId,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        let mut union = self.equivalent_ancestor(a);
        union.extend(self.equivalent_ancestor(b));
        let members: Vec<StatementId> = union.iter().copied().collect();

        let mut merged = false;
        for &absorber in &members {
            if self.node(absorber).derivative.is_some() {
                continue;
            }
            let rest: Vec<StatementId> =
                members.iter().copied().filter(|m| *m != absorber).collect();
            if rest.is_empty() {
                continue;
            }
            if let Some(incoming) = self.node(absorber).given.clone() {
                if let [partner] = rest[..] {
                    // absorber <=> partner <= union of both hypothesis sets
                    let mut ids: Vec<StatementId> = match &self.node(partner).given {
                        Some(existing) => existing.ids().to_vec(),
                        None => Vec::new(),
                    };
                    for id in incoming.ids() {
                        if !ids.contains(id) {
                            ids.push(*id);
                        }
                    }
                    let justification = if let [sole] = ids[..] {
                        Justification::One(sole)
                    } else {
                        Justification::All(ids)
                    };
                    self.node_mut(partner).given = Some(justification);
                    merged = true;
                    break;
                }
                continue;
            }
            let justification = if rest.len() == 1 {
                Justification::One(rest[0])
            } else {
                Justification::All(rest)
            };
            let target = if self.node(absorber).equivalent.is_none() {
                Some(absorber)
            } else {
                let roots = self.equivalent_ancestor(absorber);
                match (roots.len(), roots.iter().next()) {
                    (1, Some(root)) if self.node(*root).equivalent.is_none() => Some(*root),
                    _ => None,
                }
            };
            let target = target.filter(|t| !self.node(*t).constant);
            if let Some(target) = target {
                self.set_equivalent(target, justification)?;
                merged = true;
                break;
            }
        }

        if merged {
            let mut hypotheses = BTreeSet::new();
            for &member in &members {
                hypotheses.extend(self.hypothesis(member));
            }
            for hypothesis in hypotheses {
                self.try_close(hypothesis, worklist)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    fn plain(graph: &mut Graph<Expression>, a: Identifier, b: Identifier) -> StatementId {
        graph
            .statement(Expression::equality(
                &Expression::variable(a),
                &Expression::variable(b),
            ))
            .finish()
            .unwrap()
    }

    #[test]
    fn roots_stop_at_missing_edges() {
        let mut graph = Graph::new();
        let root = plain(&mut graph, 0, 1);
        let mid = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(0),
            ))
            .equivalent(root)
            .finish()
            .unwrap();
        let roots = graph.equivalent_ancestor(mid);
        assert_eq!(roots.into_iter().collect::<Vec<_>>(), vec![root]);
    }

    #[test]
    fn list_edges_branch_into_open_members() {
        let mut graph = Graph::new();
        let open = plain(&mut graph, 0, 1);
        let closed = plain(&mut graph, 2, 3);
        graph.set_status(closed, Status::ProvenTrue).unwrap();
        let derived = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(3),
            ))
            .equivalent_all(vec![open, closed])
            .finish()
            .unwrap();
        let roots = graph.equivalent_ancestor(derived);
        assert_eq!(roots.into_iter().collect::<Vec<_>>(), vec![open]);
    }

    #[test]
    fn given_ancestor_follows_single_hypothesis_hops() {
        let mut graph = Graph::new();
        let hypo = plain(&mut graph, 0, 1);
        let derived = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(0),
            ))
            .given(hypo)
            .finish()
            .unwrap();
        let roots = graph.given_ancestor(derived);
        assert_eq!(roots.into_iter().collect::<Vec<_>>(), vec![hypo]);
        // equivalent_ancestor must not follow the hypothesis edge
        let roots = graph.equivalent_ancestor(derived);
        assert_eq!(roots.into_iter().collect::<Vec<_>>(), vec![derived]);
    }

    #[test]
    fn merge_is_transitive() {
        let mut graph = Graph::new();
        let a = plain(&mut graph, 0, 1);
        let b = plain(&mut graph, 1, 2);
        let c = plain(&mut graph, 2, 0);

        let mut worklist = Worklist::new();
        graph
            .set_equivalence_relationship(a, b, &mut worklist)
            .unwrap();
        graph
            .set_equivalence_relationship(b, c, &mut worklist)
            .unwrap();
        graph.drain(worklist).unwrap();

        let root_a = graph.equivalent_ancestor(a);
        let root_c = graph.equivalent_ancestor(c);
        assert_eq!(root_a.len(), 1);
        assert_eq!(root_a, root_c);
    }

    #[test]
    fn merge_unions_the_hypotheses_of_both_roots() {
        let mut graph = Graph::new();
        let h1 = plain(&mut graph, 0, 1);
        let h2 = plain(&mut graph, 2, 3);
        let a = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(2),
            ))
            .given(h1)
            .finish()
            .unwrap();
        let b = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(3),
            ))
            .given(h2)
            .finish()
            .unwrap();

        let mut worklist = Worklist::new();
        graph
            .set_equivalence_relationship(a, b, &mut worklist)
            .unwrap();
        graph.drain(worklist).unwrap();

        let merged = graph.given_of(b);
        assert!(merged.contains(&h1));
        assert!(merged.contains(&h2));
        assert_eq!(graph.given_of(a), vec![h1]);
    }
}

use std::collections::BTreeSet;

use crate::{
    error::EngineError,
    proposition::Proposition,
    statement::{Derivative, Justification, Status, StatementBuilder, StatementNode},
    types::*,
};

/// The relation graph of a single proof run.
///
/// Owns every statement produced during the run; statements reference each
/// other through [`StatementId`] arena indices. No statement is ever removed,
/// the run itself is the unit of lifetime.
#[derive(Debug, Clone)]
pub struct Graph<P: Proposition> {
    nodes: Vec<StatementNode<P>>,
}

impl<P: Proposition> Graph<P> {
    pub fn new() -> Self {
        Graph { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: StatementId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Starts building a statement owned by this graph (see
    /// [`StatementBuilder`])
    pub fn statement(&mut self, proposition: P) -> StatementBuilder<'_, P> {
        StatementBuilder::new(self, proposition)
    }

    pub fn proposition(&self, id: StatementId) -> &P {
        &self.node(id).proposition
    }

    /// Whether the statement was born as a recognized tautology or
    /// contradiction
    pub fn is_constant(&self, id: StatementId) -> bool {
        self.node(id).constant
    }

    /// The explicitly recorded status of a statement (see [`current_status`]
    /// for the status implied by its relations)
    ///
    /// [`current_status`]: Self::current_status
    pub fn status(&self, id: StatementId) -> Status {
        self.node(id).status
    }

    pub fn has_equivalent(&self, id: StatementId) -> bool {
        self.node(id).equivalent.is_some()
    }

    /// The statements a statement is conditioned on, empty if it has no
    /// `given` edge
    pub fn given_of(&self, id: StatementId) -> Vec<StatementId> {
        match &self.node(id).given {
            Some(justification) => justification.ids().to_vec(),
            None => Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, node: StatementNode<P>) -> StatementId {
        self.nodes.push(node);
        StatementId(self.nodes.len() - 1)
    }

    pub(crate) fn node(&self, id: StatementId) -> &StatementNode<P> {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: StatementId) -> &mut StatementNode<P> {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn check(&self, id: StatementId) -> Result<(), EngineError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(EngineError::UnjustifiedRelation(id))
        }
    }

    /// Writes an `equivalent` edge synthesized by the engine.
    ///
    /// Never overwrites an existing edge and never targets a
    /// tautology/contradiction node.
    pub(crate) fn set_equivalent(
        &mut self,
        id: StatementId,
        justification: Justification,
    ) -> Result<(), EngineError> {
        let node = self.node(id);
        if node.constant || node.equivalent.is_some() {
            return Err(EngineError::UnjustifiedRelation(id));
        }
        self.node_mut(id).equivalent = Some(justification);
        Ok(())
    }

    /// Whether `from` can reach `to` by following `equivalent` edges through
    /// every list member. Callers use this to refuse an edge that would close
    /// an equivalence cycle.
    pub(crate) fn reaches_equivalent(&self, from: StatementId, to: StatementId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(slot) = &self.node(current).equivalent {
                stack.extend_from_slice(slot.ids());
            }
        }
        false
    }

    /// Records a substituted instance into the induction run a template
    /// carries for `var`.
    ///
    /// # Errors
    /// [`EngineError::UnjustifiedRelation`] if either id is unknown, the
    /// template carries no induction run for `var`, or `value` lies outside
    /// the run's bounds.
    pub fn record_instance(
        &mut self,
        template: StatementId,
        var: Variable,
        value: Value,
        instance: StatementId,
    ) -> Result<(), EngineError> {
        self.check(template)?;
        self.check(instance)?;
        let run = match &mut self.node_mut(template).derivative {
            Some(Derivative::Induction(runs)) => match runs.get_mut(&var) {
                Some(run) => run,
                None => return Err(EngineError::UnjustifiedRelation(template)),
            },
            _ => return Err(EngineError::UnjustifiedRelation(template)),
        };
        if value < run.min || run.max.map_or(false, |max| value > max) {
            return Err(EngineError::UnjustifiedRelation(instance));
        }
        run.instances.insert(value, instance);
        Ok(())
    }

    /// The sibling branches of a case-split statement, if it carries any
    pub(crate) fn branches(&self, id: StatementId) -> Option<Vec<StatementId>> {
        match &self.node(id).derivative {
            Some(Derivative::Branches(branches)) => Some(branches.clone()),
            _ => None,
        }
    }

    pub(crate) fn clear_derivative(&mut self, id: StatementId) {
        self.node_mut(id).derivative = None;
    }

    /// The status a statement currently has, computed through its driving
    /// relation slot.
    ///
    /// Exactly one slot drives at a time, in the fixed order `equivalent`,
    /// `given`, `substituent`, `imply`, `counterpart`; without any slot the
    /// statement's own explicit status is authoritative.
    pub fn current_status(&self, id: StatementId) -> Status {
        let mut visited = BTreeSet::new();
        self.status_through(id, &mut visited)
    }

    fn status_through(&self, id: StatementId, visited: &mut BTreeSet<StatementId>) -> Status {
        let node = self.node(id);
        if node.status.is_determined() {
            return node.status;
        }
        // a revisited open statement contributes nothing new
        if !visited.insert(id) {
            return Status::Conjectured;
        }
        if let Some(equivalent) = &node.equivalent {
            return match equivalent {
                Justification::One(target) => self.status_through(*target, visited),
                Justification::All(ids) => {
                    let statuses: Vec<Status> =
                        ids.iter().map(|id| self.status_through(*id, visited)).collect();
                    if statuses.contains(&Status::ProvenTrue) {
                        Status::ProvenTrue
                    } else if statuses.contains(&Status::Conjectured) {
                        Status::Conjectured
                    } else {
                        Status::ProvenFalse
                    }
                }
            };
        }
        if let Some(given) = &node.given {
            let all_proven = given
                .ids()
                .iter()
                .all(|id| self.status_through(*id, visited) == Status::ProvenTrue);
            return if all_proven {
                Status::ProvenTrue
            } else {
                Status::Conjectured
            };
        }
        if let Some(substituent) = node.substituent {
            return self.status_through(substituent, visited);
        }
        if node.imply.is_some() {
            return Status::Conjectured;
        }
        if let Some(counterpart) = node.counterpart {
            // read the explicit field here, the pair references each other
            return match self.node(counterpart).status {
                Status::ProvenTrue => Status::ProvenFalse,
                Status::ProvenFalse => Status::ProvenTrue,
                Status::Conjectured => Status::Conjectured,
            };
        }
        node.status
    }

    /// The transitive set of statements whose open induction this statement's
    /// proof is still waiting on.
    ///
    /// Derived, not stored: an instance of a template with a multi-instance
    /// run contributes that template; otherwise the query follows the
    /// `equivalent`-or-`given` chain.
    pub fn hypothesis(&self, id: StatementId) -> BTreeSet<StatementId> {
        let mut result = BTreeSet::new();
        let mut stack = vec![id];
        let mut visited = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let node = self.node(current);
            if let Some(template) = node.substituent {
                if let Some(Derivative::Induction(map)) = &self.node(template).derivative {
                    if map.values().any(|run| run.instances.len() > 1) {
                        result.insert(template);
                    }
                }
                continue;
            }
            if let Some(slot) = node.equivalent.as_ref().or(node.given.as_ref()) {
                stack.extend_from_slice(slot.ids());
            }
        }
        result
    }

    /// Whether `id` resolves to `other` by following `equivalent` edges,
    /// branching only into a sole conjectured list member
    pub fn is_equivalent_of(&self, mut id: StatementId, other: StatementId) -> bool {
        let mut visited = BTreeSet::new();
        loop {
            if id == other {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            id = match &self.node(id).equivalent {
                None => return false,
                Some(Justification::One(target)) => *target,
                Some(Justification::All(ids)) => {
                    let mut open = ids
                        .iter()
                        .filter(|id| self.current_status(**id) == Status::Conjectured);
                    match (open.next(), open.next()) {
                        (Some(sole), None) => *sole,
                        _ => return false,
                    }
                }
            };
        }
    }

    /// Whether `id`'s derivation chain is conditional on exactly the
    /// hypothesis `given`, with every other hypothesis of the chain already
    /// closed
    pub fn is_given_by(&self, id: StatementId, given: StatementId) -> bool {
        let mut visited = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let node = self.node(current);
            match &node.given {
                Some(Justification::One(g)) if *g == given => return true,
                Some(Justification::All(ids)) => {
                    for (i, g) in ids.iter().enumerate() {
                        if *g != given {
                            continue;
                        }
                        let rest_closed = ids.iter().enumerate().all(|(j, other)| {
                            j == i || self.current_status(*other) == Status::ProvenTrue
                        });
                        if rest_closed {
                            return true;
                        }
                    }
                }
                _ => {}
            }
            // keep walking toward the derivation's roots
            if let Some(slot) = node.equivalent.as_ref().or(node.given.as_ref()) {
                match slot {
                    Justification::One(target) => stack.push(*target),
                    Justification::All(ids) => stack.extend(
                        ids.iter()
                            .copied()
                            .filter(|m| self.current_status(*m) == Status::Conjectured),
                    ),
                }
            }
        }
        false
    }
}

impl<P: Proposition> Default for Graph<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::statement::InstanceRun;

    fn var_eq(graph: &mut Graph<Expression>, a: Identifier, b: Identifier) -> StatementId {
        let lhs = Expression::variable(a);
        let rhs = Expression::variable(b);
        graph
            .statement(Expression::equality(&lhs, &rhs))
            .finish()
            .unwrap()
    }

    #[test]
    fn given_status_is_conjunctive() {
        let mut graph = Graph::new();
        let h1 = var_eq(&mut graph, 0, 1);
        let h2 = var_eq(&mut graph, 2, 3);
        let cand = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(3),
            ))
            .given_all(vec![h1, h2])
            .finish()
            .unwrap();
        assert_eq!(graph.current_status(cand), Status::Conjectured);
        graph.set_status(h1, Status::ProvenTrue).unwrap();
        assert_eq!(graph.current_status(cand), Status::Conjectured);
        graph.set_status(h2, Status::ProvenTrue).unwrap();
        assert_eq!(graph.current_status(cand), Status::ProvenTrue);
    }

    #[test]
    fn equivalent_status_follows_any_proven_path() {
        let mut graph = Graph::new();
        let a = var_eq(&mut graph, 0, 1);
        let b = var_eq(&mut graph, 1, 2);
        let derived = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(2),
            ))
            .equivalent_all(vec![a, b])
            .finish()
            .unwrap();
        assert_eq!(graph.current_status(derived), Status::Conjectured);
        graph.set_status(b, Status::ProvenTrue).unwrap();
        assert_eq!(graph.current_status(derived), Status::ProvenTrue);
    }

    #[test]
    fn is_equivalent_of_walks_single_edges() {
        let mut graph = Graph::new();
        let root = var_eq(&mut graph, 0, 1);
        let mid = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(0),
            ))
            .equivalent(root)
            .finish()
            .unwrap();
        let leaf = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(1),
            ))
            .equivalent(mid)
            .finish()
            .unwrap();
        assert!(graph.is_equivalent_of(leaf, root));
        assert!(graph.is_equivalent_of(leaf, mid));
        assert!(!graph.is_equivalent_of(root, leaf));
    }

    #[test]
    fn is_given_by_sees_direct_and_chained_hypotheses() {
        let mut graph = Graph::new();
        let hypo = var_eq(&mut graph, 0, 1);
        let derived = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(0),
            ))
            .given(hypo)
            .finish()
            .unwrap();
        let restated = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(1),
            ))
            .equivalent(derived)
            .finish()
            .unwrap();
        assert!(graph.is_given_by(derived, hypo));
        assert!(graph.is_given_by(restated, hypo));
        assert!(!graph.is_given_by(hypo, derived));
    }

    #[test]
    fn status_query_tolerates_equivalence_cycles() {
        let mut graph = Graph::new();
        let a = var_eq(&mut graph, 0, 1);
        let b = var_eq(&mut graph, 2, 3);
        graph.node_mut(a).equivalent = Some(Justification::One(b));
        graph.node_mut(b).equivalent = Some(Justification::One(a));
        assert_eq!(graph.current_status(a), Status::Conjectured);
        assert_eq!(graph.current_status(b), Status::Conjectured);
        assert!(graph.reaches_equivalent(a, b));
        assert!(graph.reaches_equivalent(b, a));
    }

    #[test]
    fn recorded_instances_respect_the_domain() {
        let mut graph = Graph::new();
        let template = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(1),
            ))
            .induction(0, InstanceRun::new(0, Some(1)))
            .finish()
            .unwrap();
        let instance = var_eq(&mut graph, 2, 3);
        assert_eq!(
            graph.record_instance(template, 0, 2, instance),
            Err(EngineError::UnjustifiedRelation(instance))
        );
        assert_eq!(
            graph.record_instance(template, 1, 0, instance),
            Err(EngineError::UnjustifiedRelation(template))
        );
        assert_eq!(
            graph.record_instance(instance, 0, 0, template),
            Err(EngineError::UnjustifiedRelation(instance))
        );
        graph.record_instance(template, 0, 1, instance).unwrap();
    }
}

use std::collections::VecDeque;

use crate::{
    error::EngineError,
    graph::Graph,
    proposition::Proposition,
    statement::{Justification, Status},
    types::*,
};

/// The pending determinations of one propagation pass
pub(crate) type Worklist = VecDeque<(StatementId, Status)>;

impl<P: Proposition> Graph<P> {
    /// Assigns a determined status to a statement and cascades the
    /// determination through the relation graph.
    ///
    /// Re-propagating an already applied determination is a no-op, so a prove
    /// script may revisit the same statement via a different syntactic path.
    ///
    /// # Errors
    /// * `InconsistentProof` - the statement, or a counterpart reached during
    /// the cascade, is already determined with the opposite status
    /// * `UnjustifiedRelation` - `id` does not belong to this graph
    ///
    /// # Panics
    /// Panics if `status` is `Conjectured`; a statement is never explicitly
    /// re-opened.
    pub fn set_status(&mut self, id: StatementId, status: Status) -> Result<(), EngineError> {
        if !status.is_determined() {
            panic!("a statement cannot be assigned Conjectured");
        }
        self.check(id)?;
        let mut worklist = Worklist::new();
        worklist.push_back((id, status));
        self.drain(worklist)
    }

    pub(crate) fn drain(&mut self, mut worklist: Worklist) -> Result<(), EngineError> {
        while let Some((id, status)) = worklist.pop_front() {
            self.determine(id, status, &mut worklist)?;
        }
        Ok(())
    }

    /// One worklist step: writes the status and cascades through the driving
    /// relation slot, which is consumed in the process.
    fn determine(
        &mut self,
        id: StatementId,
        status: Status,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        let node = self.node(id);
        if node.status == status {
            return Ok(());
        }
        if node.status.is_determined() {
            return Err(EngineError::InconsistentProof(id, node.status, status));
        }
        let derived = self.current_status(id);
        if derived.is_determined() && derived != status {
            return Err(EngineError::InconsistentProof(id, derived, status));
        }

        self.node_mut(id).status = status;
        self.cascade(id, status, worklist)
    }

    /// Cascades an already recorded determination through the driving
    /// relation slot, which is consumed in the process. Also used to replay
    /// the slots of a statement born determined, whose construction never
    /// went through [`determine`][Self::determine].
    pub(crate) fn cascade(
        &mut self,
        id: StatementId,
        status: Status,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        if let Some(equivalent) = self.node_mut(id).equivalent.take() {
            return self.cascade_equivalent(equivalent, status, worklist);
        }
        if let Some(given) = self.node_mut(id).given.take() {
            return self.cascade_given(given, status, worklist);
        }
        if let Some(imply) = self.node_mut(id).imply.take() {
            return self.cascade_imply(imply, status, worklist);
        }
        if let Some(counterpart) = self.node_mut(id).counterpart.take() {
            return self.cascade_counterpart(counterpart, status, worklist);
        }
        Ok(())
    }

    /// Propagation through `equivalent`: a single target receives the same
    /// determination; a candidate list is resolved by promotion when one
    /// member is left open, or by the pairwise equivalence merge.
    fn cascade_equivalent(
        &mut self,
        equivalent: Justification,
        status: Status,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        match equivalent {
            Justification::One(target) => {
                worklist.push_back((target, status));
                Ok(())
            }
            Justification::All(ids) => {
                let open = self.open_members(&ids);
                match status {
                    Status::ProvenTrue => match open[..] {
                        [sole] => {
                            worklist.push_back((sole, Status::ProvenTrue));
                            Ok(())
                        }
                        // wider candidate lists resolve member by member
                        [a, b] => self.set_equivalence_relationship(a, b, worklist),
                        _ => Ok(()),
                    },
                    Status::ProvenFalse => {
                        if let Some(proven) = ids
                            .iter()
                            .find(|id| self.current_status(**id) == Status::ProvenTrue)
                        {
                            return Err(EngineError::InconsistentProof(
                                *proven,
                                Status::ProvenTrue,
                                Status::ProvenFalse,
                            ));
                        }
                        let falsified = ids
                            .iter()
                            .any(|id| self.current_status(*id) == Status::ProvenFalse);
                        if let ([sole], false) = (&open[..], falsified) {
                            worklist.push_back((*sole, Status::ProvenFalse));
                        }
                        Ok(())
                    }
                    Status::Conjectured => unreachable!(),
                }
            }
        }
    }

    /// Propagation through `given` is single-hypothesis elimination: a
    /// proven-true outcome only attempts to close the hypothesis' outstanding
    /// induction, a proven-false outcome falsifies a sole open hypothesis.
    fn cascade_given(
        &mut self,
        given: Justification,
        status: Status,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        match given {
            Justification::One(hypothesis) => match status {
                Status::ProvenTrue => self.try_close(hypothesis, worklist),
                Status::ProvenFalse => {
                    worklist.push_back((hypothesis, Status::ProvenFalse));
                    Ok(())
                }
                Status::Conjectured => unreachable!(),
            },
            Justification::All(ids) => {
                let open = self.open_members(&ids);
                match status {
                    Status::ProvenTrue => match open[..] {
                        // a single open hypothesis cannot be deduced from its
                        // consequence alone
                        [_] => Ok(()),
                        [a, b] => self.set_equivalence_relationship(a, b, worklist),
                        _ => Ok(()),
                    },
                    Status::ProvenFalse => {
                        if let [sole] = open[..] {
                            worklist.push_back((sole, Status::ProvenFalse));
                        }
                        Ok(())
                    }
                    Status::Conjectured => unreachable!(),
                }
            }
        }
    }

    /// Propagation through `imply`: truth transfers to every open branch
    /// target; falsity eliminates this branch from the target's case split
    /// (resolution by elimination).
    fn cascade_imply(
        &mut self,
        imply: Justification,
        status: Status,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        for &target in imply.ids() {
            match status {
                Status::ProvenTrue => {
                    if self.current_status(target) == Status::Conjectured {
                        worklist.push_back((target, Status::ProvenTrue));
                    }
                }
                Status::ProvenFalse => self.eliminate_branch(target, worklist)?,
                Status::Conjectured => unreachable!(),
            }
        }
        Ok(())
    }

    /// A branch of the case split `target` was disproven: if the disjunction
    /// itself is established and exactly one sibling remains open, that
    /// sibling must hold; if the disjunction is open, re-derive its status
    /// from the branches.
    fn eliminate_branch(
        &mut self,
        target: StatementId,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        let branches = match self.branches(target) {
            Some(branches) => branches,
            None => return Ok(()),
        };
        let statuses: Vec<Status> = branches
            .iter()
            .map(|id| self.current_status(*id))
            .collect();
        match self.current_status(target) {
            Status::ProvenTrue => {
                if statuses.contains(&Status::ProvenTrue) {
                    return Ok(());
                }
                let open: Vec<StatementId> = branches
                    .iter()
                    .zip(&statuses)
                    .filter(|(_, s)| **s == Status::Conjectured)
                    .map(|(id, _)| *id)
                    .collect();
                if let [sole] = open[..] {
                    self.clear_derivative(target);
                    worklist.push_back((sole, Status::ProvenTrue));
                }
                Ok(())
            }
            Status::Conjectured => {
                if statuses.contains(&Status::ProvenTrue) {
                    worklist.push_back((target, Status::ProvenTrue));
                } else if statuses.iter().all(|s| *s == Status::ProvenFalse) {
                    worklist.push_back((target, Status::ProvenFalse));
                }
                Ok(())
            }
            Status::ProvenFalse => Ok(()),
        }
    }

    /// Propagation through `counterpart`: the symmetric negation link. The
    /// pair must never claim `ProvenTrue` on both sides.
    fn cascade_counterpart(
        &mut self,
        counterpart: StatementId,
        status: Status,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        let forced = status.negated();
        match self.current_status(counterpart) {
            s if s == forced => Ok(()),
            Status::Conjectured => {
                worklist.push_back((counterpart, forced));
                Ok(())
            }
            other => Err(EngineError::InconsistentProof(counterpart, other, forced)),
        }
    }

    fn open_members(&self, ids: &[StatementId]) -> Vec<StatementId> {
        ids.iter()
            .copied()
            .filter(|id| self.current_status(*id) == Status::Conjectured)
            .collect()
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
    fn propagation_is_idempotent() {
        let mut graph = Graph::new();
        let root = plain(&mut graph, 0, 1);
        let derived = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(0),
            ))
            .equivalent(root)
            .finish()
            .unwrap();
        graph.set_status(derived, Status::ProvenTrue).unwrap();
        let after_once = graph.clone();
        graph.set_status(derived, Status::ProvenTrue).unwrap();
        assert_eq!(graph.current_status(root), Status::ProvenTrue);
        assert_eq!(
            after_once.current_status(derived),
            graph.current_status(derived)
        );
    }

    #[test]
    fn equivalence_chain_transfers_determination() {
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
        let leaf = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(1),
            ))
            .equivalent(mid)
            .finish()
            .unwrap();
        graph.set_status(leaf, Status::ProvenFalse).unwrap();
        assert_eq!(graph.current_status(root), Status::ProvenFalse);
        assert_eq!(graph.current_status(mid), Status::ProvenFalse);
    }

    #[test]
    fn counterpart_pair_is_symmetric() {
        let mut graph = Graph::new();
        let counter1 = plain(&mut graph, 0, 1);
        let counter2 = graph
            .statement(Expression::equality(
                &Expression::variable(1),
                &Expression::variable(2),
            ))
            .counterpart(counter1)
            .finish()
            .unwrap();

        graph.set_status(counter1, Status::ProvenTrue).unwrap();
        assert_eq!(graph.current_status(counter2), Status::ProvenFalse);
        assert_eq!(
            graph.set_status(counter1, Status::ProvenFalse),
            Err(EngineError::InconsistentProof(
                counter1,
                Status::ProvenTrue,
                Status::ProvenFalse
            ))
        );
    }

    #[test]
    fn contradiction_is_fatal() {
        let mut graph = Graph::new();
        let s = plain(&mut graph, 0, 1);
        graph.set_status(s, Status::ProvenTrue).unwrap();
        assert_eq!(
            graph.set_status(s, Status::ProvenFalse),
            Err(EngineError::InconsistentProof(
                s,
                Status::ProvenTrue,
                Status::ProvenFalse
            ))
        );
    }

    #[test]
    fn contradicting_a_derived_determination_is_fatal() {
        let mut graph = Graph::new();
        let m1 = plain(&mut graph, 0, 1);
        let m2 = plain(&mut graph, 2, 3);
        let derived = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(3),
            ))
            .equivalent_all(vec![m1, m2])
            .finish()
            .unwrap();
        graph.set_status(m1, Status::ProvenTrue).unwrap();
        assert_eq!(graph.current_status(derived), Status::ProvenTrue);
        assert_eq!(
            graph.set_status(derived, Status::ProvenFalse),
            Err(EngineError::InconsistentProof(
                derived,
                Status::ProvenTrue,
                Status::ProvenFalse
            ))
        );
    }

    #[test]
    fn branch_elimination_promotes_last_open_sibling() {
        let mut graph = Graph::new();
        let left = plain(&mut graph, 0, 1);
        let right = plain(&mut graph, 2, 3);
        let split = graph
            .statement(Expression::equality(
                &Expression::variable(0),
                &Expression::variable(3),
            ))
            .branches(vec![left, right])
            .finish()
            .unwrap();
        graph.node_mut(left).imply = Some(Justification::One(split));
        graph.node_mut(right).imply = Some(Justification::One(split));
        graph.set_status(split, Status::ProvenTrue).unwrap();

        graph.set_status(left, Status::ProvenFalse).unwrap();
        assert_eq!(graph.current_status(right), Status::ProvenTrue);
    }

    quickcheck! {
        fn long_chain_propagates_without_recursion(len: u8) -> bool {
            let mut graph = Graph::new();
            let mut prev = graph
                .statement(Expression::equality(
                    &Expression::variable(0),
                    &Expression::variable(1),
                ))
                .finish()
                .unwrap();
            let root = prev;
            for _ in 0..len {
                prev = graph
                    .statement(Expression::equality(
                        &Expression::variable(1),
                        &Expression::variable(0),
                    ))
                    .equivalent(prev)
                    .finish()
                    .unwrap();
            }
            graph.set_status(prev, Status::ProvenTrue).unwrap();
            graph.current_status(root) == Status::ProvenTrue
        }
    }
}

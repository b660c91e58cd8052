use std::collections::BTreeSet;

use crate::{
    error::EngineError,
    graph::Graph,
    propagate::Worklist,
    proposition::Proposition,
    statement::{Derivative, InstanceRun, Justification, Status},
    types::*,
};

impl<P: Proposition> Graph<P> {
    /// Attempts to close the outstanding derivative of a templated statement.
    ///
    /// For a case split this fires when every branch has been proven true.
    /// For an induction it fires when each variable's instance run satisfies
    /// the closure conditions of [`run_closes`][Self::run_closes]. Firing
    /// consumes the derivative and marks the template `ProvenTrue`; anything
    /// short of closure is a silent no-op, the detection pass is simply
    /// re-run after the next relevant status change.
    pub fn try_close(
        &mut self,
        template: StatementId,
        worklist: &mut Worklist,
    ) -> Result<(), EngineError> {
        self.check(template)?;
        let closes = match &self.node(template).derivative {
            None => false,
            Some(Derivative::Branches(branches)) => branches
                .iter()
                .all(|id| self.current_status(*id) == Status::ProvenTrue),
            Some(Derivative::Induction(map)) => {
                !map.is_empty()
                    && map
                        .iter()
                        .all(|(_, run)| self.run_closes(template, run))
            }
        };
        if closes {
            self.clear_derivative(template);
            worklist.push_back((template, Status::ProvenTrue));
        }
        Ok(())
    }

    /// [`try_close`][Self::try_close] as a standalone pass, draining its own
    /// worklist
    pub fn close_induction(&mut self, template: StatementId) -> Result<(), EngineError> {
        let mut worklist = Worklist::new();
        self.try_close(template, &mut worklist)?;
        self.drain(worklist)
    }

    /// Whether one instance run constitutes a completed induction argument:
    ///
    /// * the substitution offsets form a contiguous chain starting at the
    ///   domain's lower bound, reaching the upper bound if there is one;
    /// * the base instance is `ProvenTrue`;
    /// * every later instance is `ProvenTrue` itself or justified only by the
    ///   template and instances at strictly smaller offsets;
    /// * a one-value domain closes trivially on its proven base, an unbounded
    ///   domain requires at least one inductive step.
    fn run_closes(&self, template: StatementId, run: &InstanceRun) -> bool {
        let keys: Vec<Value> = run.instances.keys().copied().collect();
        match keys.first() {
            Some(first) if *first == run.min => {}
            _ => return false,
        }
        if keys.windows(2).any(|pair| pair[1] != pair[0] + 1) {
            return false;
        }
        match run.max {
            Some(max) => {
                if keys.last() != Some(&max) {
                    return false;
                }
            }
            None => {
                if keys.len() < 2 {
                    return false;
                }
            }
        }
        for (&key, &instance) in &run.instances {
            match self.current_status(instance) {
                Status::ProvenTrue => continue,
                Status::ProvenFalse => return false,
                Status::Conjectured => {
                    if key == run.min {
                        // an unproven base case keeps the induction open
                        return false;
                    }
                    if !self.instance_justified(instance, key, template, run) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// The inductive-step discipline: the instance's own justification slot
    /// must resolve, in its entirety, to the template or to strictly earlier
    /// instances.
    fn instance_justified(
        &self,
        instance: StatementId,
        key: Value,
        template: StatementId,
        run: &InstanceRun,
    ) -> bool {
        let node = self.node(instance);
        let slot = match node.equivalent.as_ref().or(node.given.as_ref()) {
            Some(slot) => slot,
            None => return false,
        };
        slot.ids()
            .iter()
            .all(|id| self.resolves_to_earlier(*id, key, template, run))
    }

    fn resolves_to_earlier(
        &self,
        mut current: StatementId,
        key: Value,
        template: StatementId,
        run: &InstanceRun,
    ) -> bool {
        let mut visited = BTreeSet::new();
        loop {
            if current == template {
                return true;
            }
            if run
                .instances
                .range(..key)
                .any(|(_, id)| *id == current)
            {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            let node = self.node(current);
            let next = node
                .given
                .as_ref()
                .or(node.equivalent.as_ref())
                .cloned()
                .or_else(|| node.substituent.map(Justification::One));
            current = match next {
                None => return false,
                Some(Justification::One(target)) => target,
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
}

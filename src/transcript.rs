use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt::Write;

use crate::{
    error::EngineError,
    graph::Graph,
    propagate::Worklist,
    proposition::Proposition,
    statement::{Justification, StatementBuilder, Status},
    types::*,
};

/// A position in a [`Transcript`]: either the index of an anonymous entry or
/// the name of a bound slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRef {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for EntryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryRef::Index(index) => write!(f, "Eq[{}]", index),
            EntryRef::Name(name) => write!(f, "Eq.{}", name),
        }
    }
}

/// The outcome of registering a statement with a [`Transcript`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registered {
    /// The proposition was not on record, a new entry was created
    New(EntryRef),
    /// The proposition was already on record, the two derivations were
    /// merged and the entry now holds the registered statement
    Existing(EntryRef),
    /// The statement is a recognized tautology or contradiction. It is not
    /// recorded, but its truth has been pushed through its relation slots.
    Constant,
}

/// The proof ledger of one lemma run.
///
/// A prove script derives statements in whatever order its rewriting takes
/// and registers each result here. The transcript deduplicates propositions
/// up to variable renaming, merges the derivations of re-derived results,
/// short-circuits tautologies, and at the end either accepts the run or
/// reports exactly which entries are still conjectured.
///
/// Entries are anonymous (indexed in registration order) unless bound to a
/// name with [`register_as`][Self::register_as].
///
/// # Example
/// ```
/// use lemmata::{Expression, Status, Transcript};
///
/// let mut transcript = Transcript::new();
/// let x = Expression::variable(0);
/// let y = Expression::variable(1);
/// let goal = transcript
///     .statement(Expression::equality(&x, &y))
///     .finish()
///     .unwrap();
/// transcript.register(goal).unwrap();
/// assert!(transcript.accept().is_err());
///
/// // a rewriting step collapses the goal to a tautology
/// let step = transcript
///     .statement(Expression::equality(&x, &x))
///     .equivalent(goal)
///     .finish()
///     .unwrap();
/// transcript.register(step).unwrap();
/// assert_eq!(transcript.graph().status(goal), Status::ProvenTrue);
/// assert!(transcript.accept().is_ok());
/// ```
pub struct Transcript<P: Proposition> {
    graph: Graph<P>,
    sequence: Vec<StatementId>,
    slots: IndexMap<String, StatementId>,
}

impl<P: Proposition> Transcript<P> {
    pub fn new() -> Self {
        Transcript {
            graph: Graph::new(),
            sequence: Vec::new(),
            slots: IndexMap::new(),
        }
    }

    pub fn graph(&self) -> &Graph<P> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph<P> {
        &mut self.graph
    }

    /// Starts a statement in the underlying graph, see [`Graph::statement`]
    pub fn statement(&mut self, proposition: P) -> StatementBuilder<'_, P> {
        self.graph.statement(proposition)
    }

    /// The number of recorded entries, anonymous and named
    pub fn len(&self) -> usize {
        self.sequence.len() + self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty() && self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<StatementId> {
        self.sequence.get(index).copied()
    }

    pub fn lookup(&self, name: &str) -> Option<StatementId> {
        self.slots.get(name).copied()
    }

    /// Records a derived statement.
    ///
    /// A constant is not recorded; its fixed truth is instead pushed through
    /// the relation slots it was constructed with, determining whatever they
    /// reference. A proposition already on record (up to variable renaming,
    /// see [`Proposition::dummy_eq`]) is merged with the stored entry, so a
    /// result reached twice along different routes counts once and each
    /// route's determination benefits the other.
    pub fn register(&mut self, id: StatementId) -> Result<Registered, EngineError> {
        self.graph.check(id)?;
        if self.graph.is_constant(id) {
            self.propagate_constant(id)?;
            return Ok(Registered::Constant);
        }
        match self.find(id) {
            None => {
                self.sequence.push(id);
                Ok(Registered::New(EntryRef::Index(self.sequence.len() - 1)))
            }
            Some(entry) => {
                let stored = self.stored(&entry);
                if stored != id {
                    self.merge(id, stored)?;
                    self.replace(&entry, id);
                }
                Ok(Registered::Existing(entry))
            }
        }
    }

    /// Records a derived statement under a name.
    ///
    /// A name already bound to a still conjectured entry may only be rebound
    /// to a statement whose derivation resolves to that entry (through
    /// `equivalent` edges or as its sole hypothesis); anything else is an
    /// `UnjustifiedRelation`. A name bound to a determined entry is free to
    /// be rebound.
    pub fn register_as(&mut self, name: &str, id: StatementId) -> Result<Registered, EngineError> {
        self.graph.check(id)?;
        if let Some(&old) = self.slots.get(name) {
            if old != id
                && self.graph.status(old) == Status::Conjectured
                && !self.graph.is_equivalent_of(id, old)
                && !self.graph.is_given_by(id, old)
            {
                return Err(EngineError::UnjustifiedRelation(id));
            }
        }
        match self.register(id)? {
            Registered::Constant => Ok(Registered::Constant),
            Registered::New(EntryRef::Index(index)) => {
                self.sequence.remove(index);
                self.slots.insert(name.to_owned(), id);
                Ok(Registered::New(EntryRef::Name(name.to_owned())))
            }
            Registered::Existing(EntryRef::Index(index)) => {
                // the entry keeps its position so earlier indices stay
                // stable, the name becomes an alias
                self.slots.insert(name.to_owned(), id);
                Ok(Registered::Existing(EntryRef::Index(index)))
            }
            Registered::Existing(EntryRef::Name(existing)) => {
                if existing != name {
                    self.slots.insert(name.to_owned(), id);
                }
                Ok(Registered::Existing(EntryRef::Name(existing)))
            }
            registered => Ok(registered),
        }
    }

    /// The entries whose truth is still undetermined, in transcript order
    pub fn open_obligations(&self) -> Vec<EntryRef> {
        let mut open = Vec::new();
        for (index, &id) in self.sequence.iter().enumerate() {
            if self.graph.current_status(id) == Status::Conjectured {
                open.push(EntryRef::Index(index));
            }
        }
        for (name, &id) in &self.slots {
            // a name aliasing a sequence entry is already reported above
            if self.sequence.contains(&id) {
                continue;
            }
            if self.graph.current_status(id) == Status::Conjectured {
                open.push(EntryRef::Name(name.clone()));
            }
        }
        open
    }

    /// Finishes the run: `Ok` if every entry is determined, otherwise an
    /// [`OpenProofObligation`][EngineError::OpenProofObligation] naming
    /// exactly the entries that still need a derivation
    pub fn accept(&self) -> Result<(), EngineError> {
        let open = self.open_obligations();
        if open.is_empty() {
            Ok(())
        } else {
            Err(EngineError::OpenProofObligation(open))
        }
    }

    /// Renders the transcript, one entry per line, using `render` for the
    /// propositions. A conjectured entry is prefixed with the entries its
    /// derivation rests on (`?` for a dead end outside the transcript), a
    /// refuted entry with `~`.
    pub fn render_with(&self, render: impl Fn(&P) -> String) -> String {
        let mut out = String::new();
        for (index, &id) in self.sequence.iter().enumerate() {
            self.render_entry(&mut out, &EntryRef::Index(index), id, &render);
        }
        for (name, &id) in &self.slots {
            if self.sequence.contains(&id) {
                continue;
            }
            self.render_entry(&mut out, &EntryRef::Name(name.clone()), id, &render);
        }
        out
    }

    fn render_entry(
        &self,
        out: &mut String,
        entry: &EntryRef,
        id: StatementId,
        render: &impl Fn(&P) -> String,
    ) {
        let proposition = render(self.graph.proposition(id));
        match self.graph.current_status(id) {
            Status::ProvenTrue => writeln!(out, "{}: {}", entry, proposition).unwrap(),
            Status::ProvenFalse => writeln!(out, "~{}: {}", entry, proposition).unwrap(),
            Status::Conjectured => {
                let mut refs = Vec::new();
                let mut visited = BTreeSet::new();
                self.collect_refs(id, &mut refs, &mut visited);
                if refs.is_empty() {
                    refs.push("?".to_owned());
                }
                writeln!(out, "{} => {}: {}", refs.join(", "), entry, proposition).unwrap()
            }
        }
    }

    /// Resolves the statements a derivation rests on to transcript entries,
    /// looking through statements that were never registered
    fn collect_refs(&self, id: StatementId, refs: &mut Vec<String>, visited: &mut BTreeSet<StatementId>) {
        let node = self.graph.node(id);
        let targets: Vec<StatementId> = if let Some(slot) = node
            .equivalent
            .as_ref()
            .or(node.given.as_ref())
            .or(node.imply.as_ref())
        {
            slot.ids().to_vec()
        } else if let Some(template) = node.substituent {
            vec![template]
        } else {
            Vec::new()
        };
        for target in targets {
            if !visited.insert(target) {
                continue;
            }
            match self.entry_ref_of(target) {
                Some(entry) => refs.push(entry.to_string()),
                None => {
                    let before = refs.len();
                    self.collect_refs(target, refs, visited);
                    if refs.len() == before {
                        refs.push("?".to_owned());
                    }
                }
            }
        }
    }

    fn entry_ref_of(&self, id: StatementId) -> Option<EntryRef> {
        if let Some(index) = self.sequence.iter().position(|&stored| stored == id) {
            return Some(EntryRef::Index(index));
        }
        self.slots
            .iter()
            .find(|(_, &stored)| stored == id)
            .map(|(name, _)| EntryRef::Name(name.clone()))
    }

    fn find(&self, id: StatementId) -> Option<EntryRef> {
        let proposition = self.graph.proposition(id);
        for (index, &stored) in self.sequence.iter().enumerate() {
            if self.graph.proposition(stored).dummy_eq(proposition) {
                return Some(EntryRef::Index(index));
            }
        }
        for (name, &stored) in &self.slots {
            if self.graph.proposition(stored).dummy_eq(proposition) {
                return Some(EntryRef::Name(name.clone()));
            }
        }
        None
    }

    fn stored(&self, entry: &EntryRef) -> StatementId {
        match entry {
            EntryRef::Index(index) => self.sequence[*index],
            EntryRef::Name(name) => self.slots[name.as_str()],
        }
    }

    fn replace(&mut self, entry: &EntryRef, id: StatementId) {
        match entry {
            EntryRef::Index(index) => self.sequence[*index] = id,
            EntryRef::Name(name) => {
                self.slots.insert(name.clone(), id);
            }
        }
    }

    /// A constant never becomes an entry, but the slots it was constructed
    /// with carry its fixed truth into the graph. Its own determination
    /// happened at construction time, so only the cascade is replayed.
    fn propagate_constant(&mut self, id: StatementId) -> Result<(), EngineError> {
        let status = self.graph.status(id);
        let mut worklist = Worklist::new();
        self.graph.cascade(id, status, &mut worklist)?;
        self.graph.drain(worklist)
    }

    /// Merges the derivation of a re-derived proposition with its stored
    /// entry, so whichever side is (or becomes) determined settles both.
    fn merge(&mut self, incoming: StatementId, stored: StatementId) -> Result<(), EngineError> {
        match (self.graph.status(incoming), self.graph.status(stored)) {
            (Status::ProvenFalse, _) => self.graph.set_status(stored, Status::ProvenFalse),
            (Status::ProvenTrue, _) => self.graph.set_status(stored, Status::ProvenTrue),
            (Status::Conjectured, Status::ProvenFalse) => {
                self.graph.set_status(incoming, Status::ProvenFalse)
            }
            (Status::Conjectured, Status::ProvenTrue) => {
                // the stored result validates the incoming derivation, which
                // may in turn settle what the derivation was resting on
                if self.graph.given_of(incoming).is_empty() {
                    if let Some(Justification::One(target)) =
                        self.graph.node(incoming).equivalent.clone()
                    {
                        if target != stored
                            && !self.graph.has_equivalent(target)
                            && !self.graph.is_constant(target)
                            && !self.graph.reaches_equivalent(stored, target)
                        {
                            self.graph
                                .set_equivalent(target, Justification::One(stored))?;
                        }
                    }
                } else if let Some(Justification::One(hypothesis)) =
                    self.graph.node(incoming).given.clone()
                {
                    self.graph.close_induction(hypothesis)?;
                }
                self.graph.set_status(incoming, Status::ProvenTrue)
            }
            (Status::Conjectured, Status::Conjectured) => self.merge_open(incoming, stored),
        }
    }

    /// Both sides still open: tie one derivation's root to the other entry
    /// so a later determination of either settles both, then see whether the
    /// link already closes an outstanding induction. A tie that would close
    /// an equivalence cycle is skipped, those derivations are already
    /// connected.
    fn merge_open(&mut self, incoming: StatementId, stored: StatementId) -> Result<(), EngineError> {
        let node = self.graph.node(incoming);
        for slot in [&node.equivalent, &node.given] {
            if let Some(Justification::All(ids)) = slot {
                // the list machinery already ties the two together
                if ids.contains(&stored) {
                    return Ok(());
                }
            }
        }

        let roots = self.graph.equivalent_ancestor(incoming);
        if roots.len() == 1 {
            let root = *roots.iter().next().unwrap_or(&incoming);
            if root != stored || self.graph.node(incoming).given.is_some() {
                let hypotheses = self.graph.hypothesis(root);
                if !hypotheses.is_empty() {
                    if root != stored
                        && !self.graph.has_equivalent(root)
                        && !self.graph.is_constant(root)
                        && !self.graph.reaches_equivalent(stored, root)
                    {
                        self.graph
                            .set_equivalent(root, Justification::One(stored))?;
                    }
                    return self.close_all(hypotheses);
                }
            }
        }

        let hypotheses = self.graph.hypothesis(stored);
        if hypotheses.is_empty() {
            return Ok(());
        }
        let target = if !self.graph.has_equivalent(stored) {
            Some(stored)
        } else {
            let roots = self.graph.equivalent_ancestor(stored);
            if roots.len() == 1 {
                roots.iter().next().copied()
            } else {
                None
            }
        };
        if let Some(target) = target {
            if target != incoming
                && !self.graph.has_equivalent(target)
                && !self.graph.is_constant(target)
                && !self.graph.reaches_equivalent(incoming, target)
            {
                self.graph
                    .set_equivalent(target, Justification::One(incoming))?;
            }
            self.close_all(hypotheses)?;
        }
        Ok(())
    }

    fn close_all(&mut self, hypotheses: BTreeSet<StatementId>) -> Result<(), EngineError> {
        let mut worklist = Worklist::new();
        for hypothesis in hypotheses {
            self.graph.try_close(hypothesis, &mut worklist)?;
        }
        self.graph.drain(worklist)
    }
}

impl<P: Proposition> Default for Transcript<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::statement::InstanceRun;

    fn eq(a: Identifier, b: Identifier) -> Expression {
        Expression::equality(&Expression::variable(a), &Expression::variable(b))
    }

    #[test]
    fn renamed_duplicates_share_one_entry() {
        let mut transcript = Transcript::new();
        let first = transcript.statement(eq(0, 1)).finish().unwrap();
        assert_eq!(
            transcript.register(first).unwrap(),
            Registered::New(EntryRef::Index(0))
        );
        // same proposition with the variables shifted
        let second = transcript.statement(eq(3, 4)).finish().unwrap();
        assert_eq!(
            transcript.register(second).unwrap(),
            Registered::Existing(EntryRef::Index(0))
        );
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.get(0), Some(second));
    }

    #[test]
    fn merge_settles_the_open_side() {
        let mut transcript = Transcript::new();
        let first = transcript.statement(eq(0, 1)).finish().unwrap();
        transcript.register(first).unwrap();
        transcript
            .graph_mut()
            .set_status(first, Status::ProvenTrue)
            .unwrap();

        let second = transcript.statement(eq(2, 3)).finish().unwrap();
        transcript.register(second).unwrap();
        assert_eq!(transcript.graph().status(second), Status::ProvenTrue);
    }

    #[test]
    fn constants_settle_their_slots_on_registration() {
        let mut transcript = Transcript::new();
        let goal = transcript.statement(eq(0, 1)).finish().unwrap();
        transcript.register(goal).unwrap();

        // a simplification step producing a tautology equivalent to the goal
        let tautology = transcript
            .statement(eq(2, 2))
            .equivalent(goal)
            .finish()
            .unwrap();
        assert_eq!(
            transcript.register(tautology).unwrap(),
            Registered::Constant
        );
        assert_eq!(transcript.graph().status(goal), Status::ProvenTrue);
        assert!(transcript.accept().is_ok());
    }

    // nested equalities of increasing depth, so the propositions are not
    // renamings of each other
    fn chain(depth: Identifier) -> Expression {
        let mut e = eq(0, 1);
        for i in 2..2 + depth {
            e = Expression::equality(&e, &Expression::variable(i));
        }
        e
    }

    #[test]
    fn open_entries_fail_acceptance_by_name() {
        let mut transcript = Transcript::new();
        let mut ids = Vec::new();
        for depth in 0..5 {
            let id = transcript.statement(chain(depth)).finish().unwrap();
            transcript.register(id).unwrap();
            ids.push(id);
        }
        for &id in &ids[..3] {
            transcript
                .graph_mut()
                .set_status(id, Status::ProvenTrue)
                .unwrap();
        }
        assert_eq!(
            transcript.accept(),
            Err(EngineError::OpenProofObligation(vec![
                EntryRef::Index(3),
                EntryRef::Index(4),
            ]))
        );
    }

    #[test]
    fn named_slots_resolve_by_name() {
        let mut transcript = Transcript::new();
        let id = transcript.statement(eq(0, 1)).finish().unwrap();
        assert_eq!(
            transcript.register_as("sym", id).unwrap(),
            Registered::New(EntryRef::Name("sym".to_owned()))
        );
        assert_eq!(transcript.lookup("sym"), Some(id));
        assert_eq!(transcript.get(0), None);
    }

    #[test]
    fn conjectured_slots_only_rebind_to_their_own_derivation() {
        let mut transcript = Transcript::new();
        let original = transcript.statement(eq(0, 1)).finish().unwrap();
        transcript.register_as("sym", original).unwrap();

        let unrelated = transcript.statement(eq(2, 3)).finish().unwrap();
        assert_eq!(
            transcript.register_as("sym", unrelated),
            Err(EngineError::UnjustifiedRelation(unrelated))
        );

        let restated = transcript
            .statement(eq(4, 5))
            .equivalent(original)
            .finish()
            .unwrap();
        assert!(transcript.register_as("sym", restated).is_ok());
        assert_eq!(transcript.lookup("sym"), Some(restated));
    }

    #[test]
    fn rendering_marks_open_and_refuted_entries() {
        let mut transcript = Transcript::new();
        let premise = transcript.statement(eq(0, 1)).finish().unwrap();
        transcript.register(premise).unwrap();
        let conclusion = transcript
            .statement(chain(1))
            .given(premise)
            .finish()
            .unwrap();
        transcript.register(conclusion).unwrap();
        let refuted = transcript
            .statement(Expression::equality(
                &Expression::variable(2),
                &Expression::truth_atom(false),
            ))
            .finish()
            .unwrap();
        transcript.register(refuted).unwrap();
        transcript
            .graph_mut()
            .set_status(refuted, Status::ProvenFalse)
            .unwrap();

        let formatter = crate::formatter::Formatter::new();
        let rendered = transcript.render_with(|p| {
            let mut s = String::new();
            formatter.format_expression(&mut s, p);
            s
        });
        assert_eq!(
            rendered,
            "? => Eq[0]: (x0 = x1)\n\
             Eq[0] => Eq[1]: ((x0 = x1) = x2)\n\
             ~Eq[2]: (x2 = false)\n"
        );
    }

    #[test]
    fn naming_an_existing_entry_keeps_anonymous_indices() {
        let mut transcript = Transcript::new();
        let first = transcript.statement(chain(0)).finish().unwrap();
        transcript.register(first).unwrap();
        let second = transcript.statement(chain(1)).finish().unwrap();
        transcript.register(second).unwrap();

        // a renaming of the first entry, recorded under a name
        let restated = transcript.statement(eq(2, 3)).finish().unwrap();
        assert_eq!(
            transcript.register_as("goal", restated).unwrap(),
            Registered::Existing(EntryRef::Index(0))
        );
        assert_eq!(transcript.get(0), Some(restated));
        assert_eq!(transcript.get(1), Some(second));
        assert_eq!(transcript.lookup("goal"), Some(restated));
        assert_eq!(
            transcript.open_obligations(),
            vec![EntryRef::Index(0), EntryRef::Index(1)]
        );
    }

    #[test]
    fn duplicate_with_linked_roots_registers_cleanly() {
        let mut transcript = Transcript::new();
        let template = transcript
            .statement(chain(4))
            .induction(0, InstanceRun::new(0, None))
            .finish()
            .unwrap();
        let base = transcript
            .statement(chain(2))
            .substituent(template)
            .finish()
            .unwrap();
        let stored = transcript
            .statement(eq(0, 1))
            .substituent(template)
            .finish()
            .unwrap();
        transcript
            .graph_mut()
            .record_instance(template, 0, 0, base)
            .unwrap();
        transcript
            .graph_mut()
            .record_instance(template, 0, 1, stored)
            .unwrap();
        transcript.register(stored).unwrap();

        // a duplicate whose candidate list already leads back to the entry
        let side = transcript.statement(chain(1)).finish().unwrap();
        let linked = transcript
            .statement(chain(3))
            .equivalent(stored)
            .finish()
            .unwrap();
        let incoming = transcript
            .statement(eq(4, 5))
            .equivalent_all(vec![side, linked])
            .finish()
            .unwrap();
        assert_eq!(
            transcript.register(incoming).unwrap(),
            Registered::Existing(EntryRef::Index(0))
        );
        assert_eq!(
            transcript.graph().current_status(stored),
            Status::Conjectured
        );
    }
}

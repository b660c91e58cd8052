use std::collections::BTreeMap;

use crate::{error::EngineError, graph::Graph, proposition::Proposition, types::*};

/// The tri-state truth status of a statement.
///
/// A freshly derived candidate is born `Conjectured`. A statement whose
/// proposition is a recognized tautology or contradiction is born
/// `ProvenTrue` or `ProvenFalse` and never transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Conjectured,
    ProvenTrue,
    ProvenFalse,
}

impl Status {
    pub fn is_determined(self) -> bool {
        self != Status::Conjectured
    }

    /// The status forced on a counterpart when this side is determined
    ///
    /// # Panics
    /// Panics when called on `Conjectured`, which has no negation.
    pub fn negated(self) -> Status {
        match self {
            Status::ProvenTrue => Status::ProvenFalse,
            Status::ProvenFalse => Status::ProvenTrue,
            Status::Conjectured => panic!("Conjectured has no negation"),
        }
    }
}

/// The target of a relation slot: a single statement or an ordered
/// justification set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Justification {
    One(StatementId),
    All(Vec<StatementId>),
}

impl Justification {
    pub fn ids(&self) -> &[StatementId] {
        match self {
            Justification::One(id) => std::slice::from_ref(id),
            Justification::All(ids) => ids,
        }
    }

    pub fn contains(&self, id: StatementId) -> bool {
        self.ids().contains(&id)
    }
}

/// The justification-relation kinds a statement can carry. At most one of
/// them drives the statement's status at a time, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equivalent,
    Given,
    Substituent,
    Imply,
    Counterpart,
}

/// The per-value instances of one induction variable, together with the
/// variable's domain bounds. `max` is `None` for an unbounded domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRun {
    pub min: Value,
    pub max: Option<Value>,
    pub instances: BTreeMap<Value, StatementId>,
}

impl InstanceRun {
    pub fn new(min: Value, max: Option<Value>) -> Self {
        InstanceRun {
            min,
            max,
            instances: BTreeMap::new(),
        }
    }
}

/// The derived instances of a templated statement.
///
/// `Branches` holds the sibling statements of a disjunctive case split,
/// consumed by the `imply` elimination rule. `Induction` holds per-variable
/// instance runs, consumed by the induction closure detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivative {
    Branches(Vec<StatementId>),
    Induction(BTreeMap<Variable, InstanceRun>),
}

#[derive(Debug, Clone)]
pub(crate) struct StatementNode<P> {
    pub(crate) proposition: P,
    pub(crate) status: Status,
    pub(crate) constant: bool,
    pub(crate) equivalent: Option<Justification>,
    pub(crate) given: Option<Justification>,
    pub(crate) imply: Option<Justification>,
    pub(crate) substituent: Option<StatementId>,
    pub(crate) counterpart: Option<StatementId>,
    pub(crate) derivative: Option<Derivative>,
}

impl<P> StatementNode<P> {
    /// The relation references this node carries, in driving order
    pub(crate) fn related(&self) -> Vec<StatementId> {
        let mut ids = Vec::new();
        for slot in [&self.equivalent, &self.given, &self.imply] {
            if let Some(j) = slot {
                ids.extend_from_slice(j.ids());
            }
        }
        if let Some(id) = self.substituent {
            ids.push(id);
        }
        if let Some(id) = self.counterpart {
            ids.push(id);
        }
        match &self.derivative {
            Some(Derivative::Branches(branches)) => ids.extend_from_slice(branches),
            Some(Derivative::Induction(map)) => {
                ids.extend(map.values().flat_map(|run| run.instances.values().copied()))
            }
            None => {}
        }
        ids
    }
}

/// Builds a statement inside a run's [`Graph`], the "explicit relation
/// kwargs" surface used by lemma scripts.
///
/// Relation slots are written here, once; afterwards only the engine mutates
/// them. Every referenced statement must belong to the same graph.
///
/// # Example
/// ```
/// use lemmata::{Expression, Graph, Status};
///
/// let mut graph = Graph::new();
/// let x = Expression::variable(0);
/// let y = Expression::variable(1);
/// let hypo = graph.statement(Expression::equality(&x, &y)).finish().unwrap();
/// let cand = graph
///     .statement(Expression::equality(&y, &x))
///     .given(hypo)
///     .finish()
///     .unwrap();
/// assert_eq!(graph.current_status(cand), Status::Conjectured);
/// ```
pub struct StatementBuilder<'g, P: Proposition> {
    graph: &'g mut Graph<P>,
    node: StatementNode<P>,
}

impl<'g, P: Proposition> StatementBuilder<'g, P> {
    pub(crate) fn new(graph: &'g mut Graph<P>, proposition: P) -> Self {
        let (status, constant) = match proposition.truth() {
            Some(true) => (Status::ProvenTrue, true),
            Some(false) => (Status::ProvenFalse, true),
            None => (Status::Conjectured, false),
        };
        StatementBuilder {
            graph,
            node: StatementNode {
                proposition,
                status,
                constant,
                equivalent: None,
                given: None,
                imply: None,
                substituent: None,
                counterpart: None,
                derivative: None,
            },
        }
    }

    /// Marks this statement as the same logical content as `id`, reached via
    /// a different derivation path
    pub fn equivalent(mut self, id: StatementId) -> Self {
        self.node.equivalent = Some(Justification::One(id));
        self
    }

    /// Like [`equivalent`][Self::equivalent] with a list of candidate
    /// restatements
    pub fn equivalent_all(mut self, ids: Vec<StatementId>) -> Self {
        self.node.equivalent = Some(Justification::All(ids));
        self
    }

    /// Marks this statement as conditionally derived from the hypothesis `id`
    pub fn given(mut self, id: StatementId) -> Self {
        self.node.given = Some(Justification::One(id));
        self
    }

    /// Like [`given`][Self::given] with a conjunctive hypothesis set
    pub fn given_all(mut self, ids: Vec<StatementId>) -> Self {
        self.node.given = Some(Justification::All(ids));
        self
    }

    /// Marks this statement as one branch of the case split `id`
    pub fn imply(mut self, id: StatementId) -> Self {
        self.node.imply = Some(Justification::One(id));
        self
    }

    pub fn imply_all(mut self, ids: Vec<StatementId>) -> Self {
        self.node.imply = Some(Justification::All(ids));
        self
    }

    /// Marks this statement as an instance substituted from the template `id`
    pub fn substituent(mut self, id: StatementId) -> Self {
        self.node.substituent = Some(id);
        self
    }

    /// Marks `id` as this statement's logical negation partner
    pub fn counterpart(mut self, id: StatementId) -> Self {
        self.node.counterpart = Some(id);
        self
    }

    /// Attaches the sibling branches of a case split this statement
    /// disjoins over
    pub fn branches(mut self, branches: Vec<StatementId>) -> Self {
        self.node.derivative = Some(Derivative::Branches(branches));
        self
    }

    /// Attaches the instance run of an induction over `var`
    pub fn induction(mut self, var: Variable, run: InstanceRun) -> Self {
        match &mut self.node.derivative {
            Some(Derivative::Induction(map)) => {
                map.insert(var, run);
            }
            _ => {
                let mut map = BTreeMap::new();
                map.insert(var, run);
                self.node.derivative = Some(Derivative::Induction(map));
            }
        }
        self
    }

    /// Marks the statement as proven by fiat, used for the defining
    /// equalities of auxiliary symbols
    pub fn proven(mut self) -> Self {
        self.node.status = Status::ProvenTrue;
        self
    }

    /// Validates the relation slots and adds the statement to the graph.
    ///
    /// # Errors
    /// `UnjustifiedRelation` if a referenced statement does not belong to the
    /// run's graph, or if `counterpart` refers to the statement itself.
    pub fn finish(self) -> Result<StatementId, EngineError> {
        let next = StatementId(self.graph.len());
        for id in self.node.related() {
            if !self.graph.contains(id) {
                return Err(EngineError::UnjustifiedRelation(id));
            }
        }
        if self.node.counterpart == Some(next) {
            return Err(EngineError::UnjustifiedRelation(next));
        }
        let counterpart = self.node.counterpart;
        let id = self.graph.push(self.node);
        // the negation link is symmetric, mirror it onto the partner
        if let Some(partner) = counterpart {
            if self.graph.node(partner).counterpart.is_none() {
                self.graph.node_mut(partner).counterpart = Some(id);
            }
        }
        Ok(id)
    }
}

/// Type alias for an identifier representing a variable or operator (see
/// [`Expression`][crate::Expression])
pub type Identifier = i16;

/// Type alias for a symbol acting as an induction variable or an auxiliary
/// definition (see [`DefinitionGraph`][crate::DefinitionGraph])
pub type Variable = Identifier;

/// Type alias for a concrete value substituted for an induction variable
pub type Value = i64;

/// Handle to a statement inside the [`Graph`][crate::Graph] of a single proof
/// run.
///
/// Ids are plain arena indices and are only meaningful for the graph that
/// issued them. Using an id from another run's graph produces
/// [`UnjustifiedRelation`][crate::error::EngineError::UnjustifiedRelation].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatementId(pub(crate) usize);

impl StatementId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

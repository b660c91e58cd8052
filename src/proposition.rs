/// The boundary to the external symbolic-expression system.
///
/// The engine never inspects the algebraic content of a proposition. It only
/// needs to know when two propositions are the same statement, when they are
/// the same up to a systematic renaming of bound variables, and whether a
/// proposition is a recognized tautology or contradiction (and therefore born
/// with a fixed status).
///
/// [`Expression`][crate::Expression] is the concrete implementation shipped
/// with this crate; lemma scripts built on a richer expression system provide
/// their own.
pub trait Proposition: Clone {
    /// Structural equality, the strictest notion of "the same statement".
    fn struct_eq(&self, other: &Self) -> bool;

    /// Equality up to a systematic renaming of bound variables.
    ///
    /// The transcript's duplicate detection delegates to this, so it must
    /// agree with whatever "dummy equality" the expression system uses when
    /// lemma scripts compare intermediate results. An implementation that
    /// only forwards to [`struct_eq`][Proposition::struct_eq] is valid but
    /// will store renamed duplicates as separate entries.
    fn dummy_eq(&self, other: &Self) -> bool {
        self.struct_eq(other)
    }

    /// `Some(true)` for a recognized tautology, `Some(false)` for a
    /// recognized contradiction, `None` for anything that needs a proof.
    fn truth(&self) -> Option<bool>;
}

use crate::{statement::Status, transcript::EntryRef, types::*};

/// An error produced when a proof run violates one of the engine's invariants,
/// or when a finished run still carries open obligations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A statement was assigned a status contradicting an already determined
    /// status, or a counterpart pair would hold `ProvenTrue` on both sides.
    /// Fatal to the run.
    InconsistentProof(StatementId, Status, Status),
    /// The run completed with one or more conjectured entries remaining. The
    /// payload names exactly the open entries so the caller can extend its
    /// derivation. This is a failure of the lemma, not a programming error.
    OpenProofObligation(Vec<EntryRef>),
    /// The auxiliary definitions introduced by a lemma's `apply` contain a
    /// dependency cycle. Fatal to that lemma.
    MalformedDefinitionGraph(Vec<Variable>),
    /// A relation slot references a statement that is not part of the current
    /// run's graph, or a named slot was rebound without justification.
    /// Indicates a lifetime-management bug in the caller.
    UnjustifiedRelation(StatementId),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InconsistentProof(id, old, new) => write!(
                f,
                "statement {} is already {:?} and cannot become {:?}",
                id, old, new
            ),
            EngineError::OpenProofObligation(open) => {
                write!(f, "proof incomplete, open obligations:")?;
                for entry in open {
                    write!(f, " {}", entry)?;
                }
                Ok(())
            }
            EngineError::MalformedDefinitionGraph(symbols) => {
                write!(f, "definition dependencies contain a cycle among")?;
                for symbol in symbols {
                    write!(f, " x{}", symbol)?;
                }
                Ok(())
            }
            EngineError::UnjustifiedRelation(id) => {
                write!(f, "statement {} is not part of this run", id)
            }
        }
    }
}

impl std::error::Error for EngineError {}

use crate::{
    definition::DefinitionGraph, error::EngineError, graph::Graph, proposition::Proposition,
    types::*,
};

/// Finishes a lemma's `apply`: validates the freshly built candidates,
/// serializes their auxiliary definitions and collects their premises into
/// the order a prove script registers them in.
///
/// The returned sequence is the defining equalities of the auxiliary symbols
/// (dependencies first), then the candidates' distinct hypotheses in first
/// appearance order, then the candidates themselves. Candidates stay
/// `Conjectured`; the defining equalities are proven by fiat.
///
/// # Errors
/// * `MalformedDefinitionGraph` - the definitions contain a dependency cycle
/// * `UnjustifiedRelation` - a candidate does not belong to `graph`, or
/// already carries an `equivalent` edge (an `apply` result must be a fresh
/// derivation, not a restatement)
///
/// # Example
/// ```
/// use lemmata::{conclude, DefinitionGraph, Expression, Graph};
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
///
/// let mut defs = DefinitionGraph::new();
/// defs.insert(2, Expression::equality(&Expression::variable(2), &x), vec![]);
///
/// let ordered = conclude(&mut graph, vec![cand], &defs).unwrap();
/// assert_eq!(ordered.len(), 3); // definition, hypothesis, candidate
/// assert_eq!(ordered[1], hypo);
/// assert_eq!(ordered[2], cand);
/// ```
pub fn conclude<P: Proposition>(
    graph: &mut Graph<P>,
    candidates: Vec<StatementId>,
    definitions: &DefinitionGraph<P>,
) -> Result<Vec<StatementId>, EngineError> {
    for &candidate in &candidates {
        graph.check(candidate)?;
        if graph.has_equivalent(candidate) {
            return Err(EngineError::UnjustifiedRelation(candidate));
        }
    }

    let order = definitions
        .sorted()
        .map_err(EngineError::MalformedDefinitionGraph)?;

    let mut sequence = Vec::with_capacity(order.len() + candidates.len());
    for symbol in order {
        let defining = definitions
            .defining(symbol)
            .map(P::clone)
            .ok_or(EngineError::MalformedDefinitionGraph(vec![symbol]))?;
        let id = graph.statement(defining).proven().finish()?;
        sequence.push(id);
    }

    // distinct hypotheses, in order of first appearance
    for &candidate in &candidates {
        for hypothesis in graph.given_of(candidate) {
            if !sequence.contains(&hypothesis) && !candidates.contains(&hypothesis) {
                sequence.push(hypothesis);
            }
        }
    }

    sequence.extend(candidates);
    Ok(sequence)
}

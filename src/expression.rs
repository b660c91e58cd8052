use crate::{proposition::Proposition, types::*};

/// The built-in tautology atom (see [`Expression::truth_atom`])
pub const TRUE: Identifier = -1;
/// The built-in contradiction atom (see [`Expression::truth_atom`])
pub const FALSE: Identifier = -2;
/// The reserved equality operator used for defining equalities
pub const EQUAL: Identifier = -3;

/// Tests whether the given identifier is an operator
///
/// # Example
/// ```
/// use lemmata::expression::is_operator;
///
/// assert!(is_operator(-3));
/// assert!(is_operator(-1));
/// assert!(!is_operator(0));
/// ```
pub fn is_operator(x: Identifier) -> bool {
    x < 0
}

/// Tests whether the given identifier is one of the nullary truth atoms
pub fn is_atom(x: Identifier) -> bool {
    x == TRUE || x == FALSE
}

/// A proposition encoded as a binary AST in prefix order.
///
/// Negative identifiers are operators; `-1` and `-2` are the nullary truth
/// atoms, every other operator takes exactly two operands. Non-negative
/// identifiers are variables. `(x0 = x1)` is encoded as `[-3, 0, 1]`.
///
/// This is the crate's stand-in for the external expression system: enough
/// structure for lemma scripts and tests to exercise the engine, and a model
/// for what a real expression backend has to provide through
/// [`Proposition`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Expression {
    data: Box<[Identifier]>,
}

impl Expression {
    /// Creates an expression from its prefix encoding, or `None` if the
    /// encoding is not a single well-formed tree.
    ///
    /// # Example
    /// ```
    /// use lemmata::Expression;
    ///
    /// assert!(Expression::from_raw(vec![-3, 0, 1]).is_some());
    /// assert!(Expression::from_raw(vec![-3, 0]).is_none());
    /// ```
    pub fn from_raw(data: Vec<Identifier>) -> Option<Self> {
        if subexpression_len(&data, 0) == Some(data.len()) {
            Some(Expression {
                data: data.into_boxed_slice(),
            })
        } else {
            None
        }
    }

    /// A single variable
    ///
    /// # Panics
    /// Panics if `x` is an operator identifier.
    pub fn variable(x: Identifier) -> Self {
        if is_operator(x) {
            panic!("{} is not a variable", x);
        }
        Expression {
            data: vec![x].into_boxed_slice(),
        }
    }

    /// The tautology atom for `true`, the contradiction atom for `false`
    pub fn truth_atom(value: bool) -> Self {
        Expression {
            data: vec![if value { TRUE } else { FALSE }].into_boxed_slice(),
        }
    }

    /// Applies a binary operator to two subexpressions
    ///
    /// # Panics
    /// Panics if `op` is not a binary operator identifier.
    pub fn binary(op: Identifier, left: &Expression, right: &Expression) -> Self {
        if !is_operator(op) || is_atom(op) {
            panic!("{} is not a binary operator", op);
        }
        let mut data = Vec::with_capacity(1 + left.data.len() + right.data.len());
        data.push(op);
        data.extend_from_slice(&left.data);
        data.extend_from_slice(&right.data);
        Expression {
            data: data.into_boxed_slice(),
        }
    }

    /// The defining equality `lhs = rhs`
    pub fn equality(lhs: &Expression, rhs: &Expression) -> Self {
        Self::binary(EQUAL, lhs, rhs)
    }

    pub fn data(&self) -> &[Identifier] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over the variables of this expression, with repetitions
    pub fn variables(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.data.iter().copied().filter(|s| !is_operator(*s))
    }

    /// Returns the subexpression beginning at the given index.
    ///
    /// # Panics
    /// This method panics if `start_index` is not in the range
    /// `0..self.len()`.
    ///
    /// # Example
    /// ```
    /// use lemmata::Expression;
    ///
    /// let e = Expression::from_raw(vec![-3, 0, -4, 1, 0]).unwrap();
    /// assert_eq!(e.subexpression(2), &[-4, 1, 0]);
    /// assert_eq!(e.subexpression(3), &[1]);
    /// ```
    pub fn subexpression(&self, start_index: usize) -> &[Identifier] {
        let len = subexpression_len(&self.data, start_index)
            .unwrap_or_else(|| panic!("somehow an invalid expression was formed: {:?}", self.data));
        &self.data[start_index..start_index + len]
    }

    /// Renumbers variables in the order of their appearance, reusing and
    /// extending the given mapping.
    ///
    /// # Example
    /// ```
    /// use lemmata::Expression;
    ///
    /// let mut e = Expression::from_raw(vec![-3, 4, -4, 2, 4]).unwrap();
    /// let mut var_map = vec![None; 5];
    /// let mut next_var = 0;
    /// e.standardize(&mut var_map, &mut next_var);
    /// assert_eq!(e.data(), &[-3, 0, -4, 1, 0]);
    /// assert_eq!(next_var, 2);
    /// ```
    pub fn standardize(
        &mut self,
        var_map: &mut Vec<Option<Identifier>>,
        next_var: &mut Identifier,
    ) {
        for symb in self.data.iter_mut() {
            if !is_operator(*symb) {
                *symb = var_map[*symb as usize].unwrap_or_else(|| {
                    let var = *next_var;
                    var_map[*symb as usize] = Some(var);
                    *next_var += 1;
                    var
                });
            }
        }
    }

    /// This expression with variables renumbered in order of appearance,
    /// the canonical form behind [`dummy_eq`][Proposition::dummy_eq]
    pub fn standardized(&self) -> Self {
        let mut result = self.clone();
        let max_var = self.variables().max().unwrap_or(-1);
        let mut var_map = vec![None; max_var as usize + 1];
        let mut next_var = 0;
        result.standardize(&mut var_map, &mut next_var);
        result
    }

    /// Returns a new expression with every occurrence of the subexpression
    /// `old` replaced by `new`.
    ///
    /// # Example
    /// ```
    /// use lemmata::Expression;
    ///
    /// let e = Expression::from_raw(vec![-3, 0, -4, 1, 0]).unwrap();
    /// let old = Expression::variable(0);
    /// let new = Expression::variable(7);
    /// assert_eq!(e.subs(&old, &new).data(), &[-3, 7, -4, 1, 7]);
    /// ```
    pub fn subs(&self, old: &Expression, new: &Expression) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        let mut index = 0;
        while index < self.data.len() {
            if self.data[index..].starts_with(&old.data) {
                data.extend_from_slice(&new.data);
                index += old.data.len();
            } else {
                data.push(self.data[index]);
                index += 1;
            }
        }
        Expression {
            data: data.into_boxed_slice(),
        }
    }

    /// A minimal rewriting step: an equality with structurally equal sides
    /// collapses to the tautology atom. Anything else is returned unchanged.
    pub fn simplify(&self) -> Self {
        if self.data.first() == Some(&EQUAL) {
            let left = self.subexpression(1);
            let right = self.subexpression(1 + left.len());
            if left == right {
                return Expression::truth_atom(true);
            }
        }
        self.clone()
    }
}

impl Proposition for Expression {
    fn struct_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn dummy_eq(&self, other: &Self) -> bool {
        self == other || self.standardized() == other.standardized()
    }

    fn truth(&self) -> Option<bool> {
        match *self.data {
            [TRUE] => Some(true),
            [FALSE] => Some(false),
            [EQUAL, ..] => {
                let left = self.subexpression(1);
                if left == self.subexpression(1 + left.len()) {
                    Some(true)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

fn subexpression_len(data: &[Identifier], start_index: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, &s) in data.get(start_index..)?.iter().enumerate() {
        if is_operator(s) && !is_atom(s) {
            depth += 1;
        } else {
            depth -= 1;
        }
        if depth == 0 {
            return Some(i + 1);
        }
    }
    None
}

#[cfg(feature = "serialization")]
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::char,
    combinator::{map, map_opt},
    error::{context, VerboseError},
    IResult,
};
use std::fmt::Write;

use crate::{
    expression::{is_operator, Expression, EQUAL, FALSE, TRUE},
    types::*,
};

/// Renders [`Expression`]s as text and parses them back.
///
/// The built-in symbols `true`, `false` and `=` are always understood, any
/// further binary operator has to be registered with [`add_operator`]
/// before use. Variables render as `x0`, `x1`, ...
///
/// [`add_operator`]: Self::add_operator
///
/// ```
/// use lemmata::formatter::Formatter;
/// use lemmata::Expression;
///
/// let mut fmt = Formatter::new();
/// let implies = fmt.add_operator("->".to_owned());
///
/// let x = Expression::variable(0);
/// let y = Expression::variable(1);
/// let e = Expression::binary(implies, &x, &Expression::equality(&x, &y));
///
/// let mut s = String::new();
/// fmt.format_expression(&mut s, &e);
/// assert_eq!(s, "(x0 -> (x0 = x1))");
///
/// let (remaining, parsed) = fmt.parse_expression(&s).unwrap();
/// assert_eq!(remaining, "");
/// assert_eq!(parsed, e);
/// ```
pub struct Formatter {
    operators: Vec<String>,
}

impl Formatter {
    pub fn new() -> Self {
        Formatter {
            operators: Vec::new(),
        }
    }

    /// Registers a binary operator and returns the identifier assigned to
    /// it. Identifiers count down from `-4`, below the built-in symbols.
    pub fn add_operator(&mut self, operator: String) -> Identifier {
        // TODO: reject names containing spaces or parentheses
        self.operators.push(operator);
        -(self.operators.len() as Identifier) - 3
    }

    fn operator_name(&self, id: Identifier) -> &str {
        if id == EQUAL {
            "="
        } else {
            &self.operators[(-id - 4) as usize]
        }
    }

    #[cfg(feature = "serialization")]
    fn operator_id(&self, name: &str) -> Option<Identifier> {
        if name == "=" {
            return Some(EQUAL);
        }
        self.operators
            .iter()
            .position(|o| o == name)
            .map(|i| -(i as Identifier) - 4)
    }

    pub fn format_expression(&self, s: &mut String, expression: &Expression) {
        self.format_at(s, expression, 0);
    }

    fn format_at(&self, s: &mut String, expression: &Expression, start: usize) {
        let id = expression.data()[start];
        if id == TRUE {
            s.push_str("true");
        } else if id == FALSE {
            s.push_str("false");
        } else if is_operator(id) {
            let left_len = expression.subexpression(start + 1).len();
            s.push('(');
            self.format_at(s, expression, start + 1);
            write!(s, " {} ", self.operator_name(id)).unwrap();
            self.format_at(s, expression, start + 1 + left_len);
            s.push(')');
        } else {
            write!(s, "x{}", id).unwrap();
        }
    }

    #[cfg(feature = "serialization")]
    pub fn parse_variable<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Identifier, VerboseError<&'a str>> {
        let (input, _) = char('x')(input)?;
        map_opt(take_while1(|c: char| c.is_ascii_digit()), |digits: &str| {
            digits.parse::<Identifier>().ok()
        })(input)
    }

    #[cfg(feature = "serialization")]
    pub fn parse_operator<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Expression, VerboseError<&'a str>> {
        let (input, _) = char('(')(input)?;
        let (input, left) = self.parse_expression(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, op) = map_opt(is_not(" ()"), |name| self.operator_id(name))(input)?;
        let (input, _) = char(' ')(input)?;
        let (input, right) = self.parse_expression(input)?;
        let (input, _) = char(')')(input)?;
        Ok((input, Expression::binary(op, &left, &right)))
    }

    #[cfg(feature = "serialization")]
    pub fn parse_expression<'a>(
        &self,
        input: &'a str,
    ) -> IResult<&'a str, Expression, VerboseError<&'a str>> {
        context(
            "expression",
            alt((
                map(tag("true"), |_| Expression::truth_atom(true)),
                map(tag("false"), |_| Expression::truth_atom(false)),
                map(|input| self.parse_variable(input), Expression::variable),
                |input| self.parse_operator(input),
            )),
        )(input)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_identifiers_count_down_from_minus_four() {
        let mut fmt = Formatter::new();
        assert_eq!(fmt.add_operator("->".to_owned()), -4);
        assert_eq!(fmt.add_operator("&".to_owned()), -5);
    }

    #[test]
    fn truth_atoms_have_builtin_names() {
        let fmt = Formatter::new();
        let mut s = String::new();
        fmt.format_expression(&mut s, &Expression::truth_atom(true));
        s.push(' ');
        fmt.format_expression(&mut s, &Expression::truth_atom(false));
        assert_eq!(s, "true false");
    }

    #[test]
    fn nested_operators_are_parenthesized() {
        let mut fmt = Formatter::new();
        let and = fmt.add_operator("&".to_owned());
        let x = Expression::variable(0);
        let y = Expression::variable(1);
        let e = Expression::binary(and, &Expression::equality(&x, &y), &x);
        let mut s = String::new();
        fmt.format_expression(&mut s, &e);
        assert_eq!(s, "((x0 = x1) & x0)");
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn unknown_operators_do_not_parse() {
        let fmt = Formatter::new();
        assert!(fmt.parse_expression("(x0 -> x1)").is_err());
    }

    #[cfg(feature = "serialization")]
    #[test]
    fn equality_parses_without_registration() {
        let fmt = Formatter::new();
        let (remaining, e) = fmt.parse_expression("(x2 = true)").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(
            e,
            Expression::equality(&Expression::variable(2), &Expression::truth_atom(true))
        );
    }
}

//! Condition trees.
//!
//! A condition is an immutable tree of comparison and logical nodes.
//! Combinators always produce new trees, so sub-conditions can be reused
//! across calls. Construction goes through [`Attr`] builder methods; the
//! `&`, `|`, and `!` operators are ergonomic sugar over
//! [`Condition::and`], [`Condition::or`], and [`Condition::negate`].

use std::fmt;
use std::ops::{BitAnd, BitOr, Not as StdNot};

use crate::value::Value;

/// Comparison operator of a primitive condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    BeginsWith,
    Between,
    Exists,
    NotExists,
}

impl Operator {
    /// Infix token for plain comparisons; function-form operators have none.
    pub fn token(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Ne => Some("<>"),
            Operator::Lt => Some("<"),
            Operator::Le => Some("<="),
            Operator::Gt => Some(">"),
            Operator::Ge => Some(">="),
            _ => None,
        }
    }

    /// Whether `count` operands is a valid arity for this operator: zero
    /// for `Exists`/`NotExists`, two for `Between`, one or more for `In`,
    /// exactly one otherwise.
    pub fn accepts_operands(&self, count: usize) -> bool {
        match self {
            Operator::Exists | Operator::NotExists => count == 0,
            Operator::Between => count == 2,
            Operator::In => count >= 1,
            _ => count == 1,
        }
    }
}

/// A node in a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single comparison: attribute, operator, operands.
    ///
    /// Operand arity is fixed by the operator, per
    /// [`Operator::accepts_operands`]. The `Attr` builders always produce a
    /// matching arity; hand-built nodes are checked when the tree is
    /// rendered, before anything reaches the wire.
    Compare {
        attr: String,
        op: Operator,
        values: Vec<Value>,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Conjoin two conditions, flattening nested `And`s on the left so that
    /// `a & b & c` becomes a single three-child conjunction.
    pub fn and(self, other: Condition) -> Condition {
        match self {
            Condition::And(mut children) => {
                children.push(other);
                Condition::And(children)
            }
            left => Condition::And(vec![left, other]),
        }
    }

    /// Disjoin two conditions, flattening nested `Or`s on the left.
    pub fn or(self, other: Condition) -> Condition {
        match self {
            Condition::Or(mut children) => {
                children.push(other);
                Condition::Or(children)
            }
            left => Condition::Or(vec![left, other]),
        }
    }

    pub fn negate(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    /// Conjoin a sequence of conditions into one tree.
    ///
    /// Returns `None` for an empty iterator, the lone condition for a
    /// single-element one.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        let mut iter = conditions.into_iter();
        let first = iter.next()?;
        let rest: Vec<Condition> = iter.collect();
        if rest.is_empty() {
            return Some(first);
        }
        let mut children = Vec::with_capacity(rest.len() + 1);
        children.push(first);
        children.extend(rest);
        Some(Condition::And(children))
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        self.and(rhs)
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        self.or(rhs)
    }
}

impl StdNot for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        self.negate()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { attr, op, values } => {
                // Hand-built nodes can be malformed; print rather than panic.
                static NULL: Value = Value::Null;
                let first = values.first().unwrap_or(&NULL);
                match op {
                    Operator::Exists => write!(f, "attribute_exists({})", attr),
                    Operator::NotExists => write!(f, "attribute_not_exists({})", attr),
                    Operator::Contains => write!(f, "contains({}, {})", attr, first),
                    Operator::BeginsWith => write!(f, "begins_with({}, {})", attr, first),
                    Operator::Between => {
                        let second = values.get(1).unwrap_or(&NULL);
                        write!(f, "{} BETWEEN {} AND {}", attr, first, second)
                    }
                    Operator::In => {
                        write!(f, "{} IN (", attr)?;
                        for (i, value) in values.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", value)?;
                        }
                        write!(f, ")")
                    }
                    op => write!(f, "{} {} {}", attr, op.token().unwrap_or("="), first),
                }
            }
            Condition::And(children) => write_joined(f, children, "AND"),
            Condition::Or(children) => write_joined(f, children, "OR"),
            Condition::Not(child) => write!(f, "NOT ({})", child),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Condition], op: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write!(f, "({})", child)?;
    }
    Ok(())
}

/// A reference to an attribute, used to build comparison nodes.
///
/// The same `Attr` can build any number of conditions.
#[derive(Debug, Clone)]
pub struct Attr(String);

impl Attr {
    pub fn new(name: impl Into<String>) -> Self {
        Attr(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn compare(&self, op: Operator, values: Vec<Value>) -> Condition {
        Condition::Compare {
            attr: self.0.clone(),
            op,
            values,
        }
    }

    pub fn eq(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Eq, vec![value.into()])
    }

    pub fn ne(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Ne, vec![value.into()])
    }

    pub fn lt(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Lt, vec![value.into()])
    }

    pub fn le(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Le, vec![value.into()])
    }

    pub fn gt(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Gt, vec![value.into()])
    }

    pub fn ge(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Ge, vec![value.into()])
    }

    /// Membership in a list of values.
    pub fn is_in(&self, values: impl IntoIterator<Item = impl Into<Value>>) -> Condition {
        self.compare(Operator::In, values.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Contains, vec![value.into()])
    }

    pub fn begins_with(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::BeginsWith, vec![value.into()])
    }

    /// Inclusive range check: `low <= attr <= high`.
    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        self.compare(Operator::Between, vec![low.into(), high.into()])
    }

    pub fn exists(&self) -> Condition {
        self.compare(Operator::Exists, vec![])
    }

    pub fn not_exists(&self) -> Condition {
        self.compare(Operator::NotExists, vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_builds_comparison() {
        let condition = Attr::new("email").eq("a@b.com");
        assert_eq!(
            condition,
            Condition::Compare {
                attr: "email".to_string(),
                op: Operator::Eq,
                values: vec![Value::from("a@b.com")],
            }
        );
    }

    #[test]
    fn test_and_flattens_left_chain() {
        let a = Attr::new("a").eq(1i64);
        let b = Attr::new("b").eq(2i64);
        let c = Attr::new("c").eq(3i64);

        let combined = a.clone() & b.clone() & c.clone();
        assert_eq!(combined, Condition::And(vec![a, b, c]));
    }

    #[test]
    fn test_or_flattens_left_chain() {
        let a = Attr::new("a").eq(1i64);
        let b = Attr::new("b").eq(2i64);
        let c = Attr::new("c").eq(3i64);

        let combined = a.clone() | b.clone() | c.clone();
        assert_eq!(combined, Condition::Or(vec![a, b, c]));
    }

    #[test]
    fn test_mixed_operators_preserve_structure() {
        let a = Attr::new("a").eq(1i64);
        let b = Attr::new("b").eq(2i64);
        let c = Attr::new("c").eq(3i64);

        // (a | b) & c keeps the disjunction as a single child.
        let combined = (a.clone() | b.clone()) & c.clone();
        assert_eq!(
            combined,
            Condition::And(vec![Condition::Or(vec![a, b]), c])
        );
    }

    #[test]
    fn test_combinators_do_not_mutate_operands() {
        let base = Attr::new("year").le(2000i64);
        let _combined = base.clone() & Attr::new("name").eq("John");
        // The original sub-condition is still a lone comparison.
        assert!(matches!(base, Condition::Compare { .. }));
    }

    #[test]
    fn test_negate() {
        let condition = !Attr::new("email").exists();
        assert_eq!(
            condition,
            Condition::Not(Box::new(Attr::new("email").exists()))
        );
    }

    #[test]
    fn test_all_combinator() {
        assert_eq!(Condition::all(vec![]), None);

        let single = Condition::all(vec![Attr::new("a").eq(1i64)]).unwrap();
        assert!(matches!(single, Condition::Compare { .. }));

        let pair = Condition::all(vec![Attr::new("a").eq(1i64), Attr::new("b").eq(2i64)]).unwrap();
        assert!(matches!(pair, Condition::And(ref children) if children.len() == 2));
    }

    #[test]
    fn test_operand_arity() {
        assert!(Operator::Eq.accepts_operands(1));
        assert!(!Operator::Eq.accepts_operands(0));
        assert!(Operator::Between.accepts_operands(2));
        assert!(!Operator::Between.accepts_operands(1));
        assert!(Operator::In.accepts_operands(3));
        assert!(!Operator::In.accepts_operands(0));
        assert!(Operator::Exists.accepts_operands(0));
        assert!(!Operator::Exists.accepts_operands(1));
    }

    #[test]
    fn test_display_survives_missing_operands() {
        let malformed = Condition::Compare {
            attr: "name".to_string(),
            op: Operator::Eq,
            values: vec![],
        };
        assert_eq!(malformed.to_string(), "name = NULL");
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(
            Attr::new("email").eq("a@b.com").to_string(),
            "email = \"a@b.com\""
        );
        assert_eq!(
            Attr::new("year").between(1990i64, 2000i64).to_string(),
            "year BETWEEN 1990 AND 2000"
        );
        assert_eq!(
            Attr::new("cities").contains("Nairobi").to_string(),
            "contains(cities, \"Nairobi\")"
        );
        assert_eq!(
            (Attr::new("a").eq(1i64) | Attr::new("b").eq(2i64)).to_string(),
            "(a = 1) OR (b = 2)"
        );
        assert_eq!(
            (!Attr::new("a").exists()).to_string(),
            "NOT (attribute_exists(a))"
        );
        assert_eq!(
            Attr::new("n").is_in(vec![1i64, 2, 3]).to_string(),
            "n IN (1, 2, 3)"
        );
    }
}

//! Expression rendering.
//!
//! Turns validated condition trees into DynamoDB expression strings. Every
//! attribute name becomes a `#n<i>` placeholder and every literal becomes a
//! `:v<i>` placeholder, so reserved words and arbitrary values never appear
//! in the expression text. Placeholders are numbered in traversal order
//! (key condition first, then filter), which keeps rendering deterministic
//! for a given tree.

use std::collections::BTreeMap;

use crate::error::{Result, ValidationError};
use crate::schema::Schema;
use crate::value::Value;

use super::split::SplitCondition;
use super::tree::{Condition, Operator};

/// A rendered query expression: key condition, filter, and the shared
/// placeholder maps for both.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedExpression {
    pub key_expression: Option<String>,
    pub filter_expression: Option<String>,
    /// Placeholder to attribute name, e.g. `#n0` to `email`.
    pub names: BTreeMap<String, String>,
    /// Placeholder to literal, e.g. `:v0` to the bound value.
    pub values: BTreeMap<String, Value>,
}

/// A standalone rendered condition, used as a conditional-write guard.
/// Unlike a key condition, any tree shape is accepted here.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCondition {
    pub expression: String,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

/// Render a split condition into a query's key and filter expressions.
pub fn render(schema: &Schema, split: &SplitCondition) -> Result<RenderedExpression> {
    let mut binder = Binder::new("#n", ":v");

    let key_expression = match &split.key {
        Some(condition) => Some(binder.render(schema, condition)?),
        None => None,
    };
    let filter_expression = match &split.filter {
        Some(condition) => Some(binder.render(schema, condition)?),
        None => None,
    };

    Ok(RenderedExpression {
        key_expression,
        filter_expression,
        names: binder.names,
        values: binder.values,
    })
}

/// Render a bare condition tree into a condition expression.
pub fn render_condition(schema: &Schema, condition: &Condition) -> Result<RenderedCondition> {
    let mut binder = Binder::new("#n", ":v");
    let expression = binder.render(schema, condition)?;
    Ok(RenderedCondition {
        expression,
        names: binder.names,
        values: binder.values,
    })
}

/// Placeholder state shared across the expressions of one request.
///
/// Attribute names are reused across occurrences; values are bound fresh
/// each time. Update expressions use a distinct prefix pair so their maps
/// merge with a condition's without collisions.
pub(crate) struct Binder {
    name_prefix: &'static str,
    value_prefix: &'static str,
    pub(crate) names: BTreeMap<String, String>,
    by_attr: BTreeMap<String, String>,
    pub(crate) values: BTreeMap<String, Value>,
}

impl Binder {
    pub(crate) fn new(name_prefix: &'static str, value_prefix: &'static str) -> Self {
        Self {
            name_prefix,
            value_prefix,
            names: BTreeMap::new(),
            by_attr: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    pub(crate) fn name(&mut self, attr: &str) -> String {
        if let Some(placeholder) = self.by_attr.get(attr) {
            return placeholder.clone();
        }
        let placeholder = format!("{}{}", self.name_prefix, self.by_attr.len());
        self.by_attr.insert(attr.to_string(), placeholder.clone());
        self.names.insert(placeholder.clone(), attr.to_string());
        placeholder
    }

    pub(crate) fn value(&mut self, value: Value) -> String {
        let placeholder = format!("{}{}", self.value_prefix, self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    fn render(&mut self, schema: &Schema, condition: &Condition) -> Result<String> {
        match condition {
            Condition::Compare { attr, op, values } => {
                validate_operands(schema, attr, *op, values)?;
                let name = self.name(attr);
                Ok(match op {
                    Operator::Exists => format!("attribute_exists({})", name),
                    Operator::NotExists => format!("attribute_not_exists({})", name),
                    Operator::Contains => {
                        format!("contains({}, {})", name, self.value(values[0].clone()))
                    }
                    Operator::BeginsWith => {
                        format!("begins_with({}, {})", name, self.value(values[0].clone()))
                    }
                    Operator::Between => format!(
                        "{} BETWEEN {} AND {}",
                        name,
                        self.value(values[0].clone()),
                        self.value(values[1].clone())
                    ),
                    Operator::In => {
                        let bound: Vec<String> = values
                            .iter()
                            .map(|value| self.value(value.clone()))
                            .collect();
                        format!("{} IN ({})", name, bound.join(", "))
                    }
                    op => {
                        let token = op.token().unwrap_or("=");
                        format!("{} {} {}", name, token, self.value(values[0].clone()))
                    }
                })
            }
            Condition::And(children) => self.render_joined(schema, children, "AND"),
            Condition::Or(children) => self.render_joined(schema, children, "OR"),
            Condition::Not(child) => Ok(format!("NOT ({})", self.render(schema, child)?)),
        }
    }

    fn render_joined(
        &mut self,
        schema: &Schema,
        children: &[Condition],
        op: &str,
    ) -> Result<String> {
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            parts.push(format!("({})", self.render(schema, child)?));
        }
        Ok(parts.join(&format!(" {} ", op)))
    }
}

/// Check comparison operands against the attribute's field declaration.
///
/// Arity comes first: `Compare` fields are public, so a hand-built node can
/// carry the wrong operand count and must be rejected before anything is
/// indexed. Undeclared attributes pass through unchecked otherwise.
/// `contains` operands are checked against a list field's element kind;
/// `begins_with` always takes a string prefix.
fn validate_operands(schema: &Schema, attr: &str, op: Operator, values: &[Value]) -> Result<()> {
    if !op.accepts_operands(values.len()) {
        return Err(ValidationError::Constraint {
            attr: attr.to_string(),
            message: format!("operator {:?} does not take {} operand(s)", op, values.len()),
        }
        .into());
    }

    if op == Operator::BeginsWith && !matches!(values[0], Value::Str(_)) {
        return Err(ValidationError::TypeMismatch {
            attr: attr.to_string(),
            expected: "a string prefix".to_string(),
            actual: values[0].type_name().to_string(),
        }
        .into());
    }

    let Some(field) = schema.field(attr) else {
        return Ok(());
    };

    match op {
        Operator::Exists | Operator::NotExists | Operator::BeginsWith => {}
        Operator::Contains => {
            field.validate_element(&values[0])?;
        }
        _ => {
            for value in values {
                field.validate(value)?;
            }
        }
    }

    Ok(())
}

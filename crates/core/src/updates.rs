//! Update expressions.
//!
//! An update is a list of per-attribute actions rendered into a single
//! `UpdateExpression` with `SET`, `ADD`, and `REMOVE` clauses. Update
//! placeholders use the `#u`/`:u` prefixes so the maps merge with a
//! rendered guard condition's `#n`/`:v` maps without collisions.

use std::collections::BTreeMap;

use crate::conditions::Binder;
use crate::error::{Result, ValidationError};
use crate::schema::Schema;
use crate::value::Value;

/// A single attribute action within an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrite the attribute, or only set it when absent.
    Set {
        attr: String,
        value: Value,
        if_not_exists: bool,
    },
    /// Delete the attribute from the item.
    Remove { attr: String },
    /// Numeric in-place addition; missing attributes start at zero.
    Add { attr: String, value: Value },
    /// Append elements to the end of a list attribute.
    Append { attr: String, values: Vec<Value> },
    /// Prepend elements to the front of a list attribute.
    Prepend { attr: String, values: Vec<Value> },
}

impl Update {
    pub fn attr(&self) -> &str {
        match self {
            Update::Set { attr, .. }
            | Update::Remove { attr }
            | Update::Add { attr, .. }
            | Update::Append { attr, .. }
            | Update::Prepend { attr, .. } => attr,
        }
    }
}

impl crate::conditions::Attr {
    pub fn set(&self, value: impl Into<Value>) -> Update {
        Update::Set {
            attr: self.name().to_string(),
            value: value.into(),
            if_not_exists: false,
        }
    }

    /// Set the attribute only when the item does not already have it.
    pub fn set_if_not_exists(&self, value: impl Into<Value>) -> Update {
        Update::Set {
            attr: self.name().to_string(),
            value: value.into(),
            if_not_exists: true,
        }
    }

    pub fn remove(&self) -> Update {
        Update::Remove {
            attr: self.name().to_string(),
        }
    }

    pub fn add(&self, value: impl Into<Value>) -> Update {
        Update::Add {
            attr: self.name().to_string(),
            value: value.into(),
        }
    }

    pub fn append(&self, values: impl IntoIterator<Item = impl Into<Value>>) -> Update {
        Update::Append {
            attr: self.name().to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prepend(&self, values: impl IntoIterator<Item = impl Into<Value>>) -> Update {
        Update::Prepend {
            attr: self.name().to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A rendered `UpdateExpression` with its placeholder maps.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedUpdate {
    pub expression: String,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

/// Render a list of update actions into one expression.
///
/// Actions are validated against the schema first: primary-key attributes
/// can never be updated, required attributes cannot be removed, and values
/// must satisfy their field declarations. An empty list and a repeated
/// attribute both fail, since DynamoDB rejects empty expressions and
/// duplicate document paths.
pub fn render_updates(schema: &Schema, updates: &[Update]) -> Result<RenderedUpdate> {
    if updates.is_empty() {
        return Err(ValidationError::EmptyUpdate.into());
    }

    let mut seen: Vec<&str> = Vec::new();
    for update in updates {
        validate_update(schema, update)?;
        if seen.contains(&update.attr()) {
            return Err(ValidationError::Constraint {
                attr: update.attr().to_string(),
                message: "attribute appears more than once in the same update".to_string(),
            }
            .into());
        }
        seen.push(update.attr());
    }

    let mut binder = Binder::new("#u", ":u");
    let mut set_parts: Vec<String> = Vec::new();
    let mut add_parts: Vec<String> = Vec::new();
    let mut remove_parts: Vec<String> = Vec::new();

    for update in updates {
        match update {
            Update::Set {
                attr,
                value,
                if_not_exists,
            } => {
                let name = binder.name(attr);
                let value = binder.value(value.clone());
                if *if_not_exists {
                    set_parts.push(format!("{} = if_not_exists({}, {})", name, name, value));
                } else {
                    set_parts.push(format!("{} = {}", name, value));
                }
            }
            Update::Append { attr, values } => {
                let name = binder.name(attr);
                let value = binder.value(Value::List(values.clone()));
                set_parts.push(format!("{} = list_append({}, {})", name, name, value));
            }
            Update::Prepend { attr, values } => {
                let name = binder.name(attr);
                let value = binder.value(Value::List(values.clone()));
                set_parts.push(format!("{} = list_append({}, {})", name, value, name));
            }
            Update::Add { attr, value } => {
                let name = binder.name(attr);
                let value = binder.value(value.clone());
                add_parts.push(format!("{} {}", name, value));
            }
            Update::Remove { attr } => {
                remove_parts.push(binder.name(attr));
            }
        }
    }

    let mut clauses: Vec<String> = Vec::new();
    if !set_parts.is_empty() {
        clauses.push(format!("SET {}", set_parts.join(", ")));
    }
    if !add_parts.is_empty() {
        clauses.push(format!("ADD {}", add_parts.join(", ")));
    }
    if !remove_parts.is_empty() {
        clauses.push(format!("REMOVE {}", remove_parts.join(", ")));
    }

    Ok(RenderedUpdate {
        expression: clauses.join(" "),
        names: binder.names,
        values: binder.values,
    })
}

fn validate_update(schema: &Schema, update: &Update) -> Result<()> {
    let attr = update.attr();

    if schema.keys().is_key(attr) {
        return Err(ValidationError::Constraint {
            attr: attr.to_string(),
            message: "primary key attributes cannot be updated".to_string(),
        }
        .into());
    }

    let field = schema.field(attr);

    match update {
        Update::Remove { .. } => {
            if field.is_some_and(|f| f.is_required()) {
                return Err(ValidationError::InvalidRemove {
                    attr: attr.to_string(),
                    reason: "the attribute is required".to_string(),
                }
                .into());
            }
        }
        Update::Set { value, .. } | Update::Add { value, .. } => {
            if let Some(field) = field {
                field.validate(value)?;
            }
        }
        Update::Append { values, .. } | Update::Prepend { values, .. } => {
            if let Some(field) = field {
                for value in values {
                    field.validate_element(value)?;
                }
            }
        }
    }

    Ok(())
}

//! Strategy normalization.
//!
//! Callers identify the item(s) an operation targets in several shapes: a
//! raw hash-key value, a (hash, range) pair, an attribute map, a model
//! instance, an explicit condition tree, or a batch list of any of those.
//! Normalization resolves each shape into a canonical condition tree before
//! validation, so the rest of the engine only ever sees conditions.

use crate::error::{Error, Result, SchemaError, ValidationError};
use crate::schema::{Model, Schema};
use crate::value::{Item, Value};

use super::tree::{Attr, Condition};

/// A caller-supplied target for an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// A bare hash-key value. Only valid for single-key models.
    Key(Value),
    /// A (hash, range) pair. Only valid for composite-key models.
    KeyPair(Value, Value),
    /// An attribute map; non-key entries are ignored.
    AttributeMap(Item),
    /// A model instance's attributes; all primary keys must be set.
    Instance(Item),
    /// An explicit condition tree, passed through unchanged.
    Condition(Condition),
    /// Independent lookups, one per entry. Never merged into one tree.
    Batch(Vec<Strategy>),
}

impl Strategy {
    /// Strategy targeting a model instance's primary key.
    pub fn from_model<M: Model>(model: &M) -> Self {
        Strategy::Instance(model.to_item())
    }
}

impl From<&str> for Strategy {
    fn from(value: &str) -> Self {
        Strategy::Key(value.into())
    }
}

impl From<String> for Strategy {
    fn from(value: String) -> Self {
        Strategy::Key(value.into())
    }
}

impl From<i64> for Strategy {
    fn from(value: i64) -> Self {
        Strategy::Key(value.into())
    }
}

impl From<i32> for Strategy {
    fn from(value: i32) -> Self {
        Strategy::Key(value.into())
    }
}

impl From<Value> for Strategy {
    fn from(value: Value) -> Self {
        Strategy::Key(value)
    }
}

impl<H: Into<Value>, R: Into<Value>> From<(H, R)> for Strategy {
    fn from((hash, range): (H, R)) -> Self {
        Strategy::KeyPair(hash.into(), range.into())
    }
}

impl From<Item> for Strategy {
    fn from(item: Item) -> Self {
        Strategy::AttributeMap(item)
    }
}

impl From<Condition> for Strategy {
    fn from(condition: Condition) -> Self {
        Strategy::Condition(condition)
    }
}

impl<T: Into<Strategy>> From<Vec<T>> for Strategy {
    fn from(entries: Vec<T>) -> Self {
        Strategy::Batch(entries.into_iter().map(Into::into).collect())
    }
}

/// The outcome of normalization: one condition tree, or one per batch entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    One(Condition),
    Many(Vec<Condition>),
}

/// Resolve a strategy into canonical condition tree(s).
///
/// Key values are validated against their field declarations here, so a
/// mistyped key fails before any expression is built.
pub fn normalize(schema: &Schema, strategy: Strategy) -> Result<Resolved> {
    match strategy {
        Strategy::Batch(entries) => {
            let mut conditions = Vec::with_capacity(entries.len());
            for entry in entries {
                match normalize(schema, entry)? {
                    Resolved::One(condition) => conditions.push(condition),
                    Resolved::Many(_) => {
                        return Err(ValidationError::InvalidStrategy(
                            "batch strategies cannot be nested".to_string(),
                        )
                        .into())
                    }
                }
            }
            Ok(Resolved::Many(conditions))
        }
        other => Ok(Resolved::One(normalize_one(schema, other)?)),
    }
}

fn normalize_one(schema: &Schema, strategy: Strategy) -> Result<Condition> {
    let keys = schema.keys();

    match strategy {
        Strategy::Key(value) => {
            if keys.is_composite() {
                return Err(SchemaError::CompositeKeyRequired {
                    table: schema.table().to_string(),
                }
                .into());
            }
            Ok(key_equality(schema, keys.hash_key(), value)?)
        }
        Strategy::KeyPair(hash, range) => {
            let range_key = keys.range_key().ok_or_else(|| SchemaError::NoRangeKey {
                table: schema.table().to_string(),
            })?;
            let hash_condition = key_equality(schema, keys.hash_key(), hash)?;
            let range_condition = key_equality(schema, range_key, range)?;
            Ok(hash_condition.and(range_condition))
        }
        Strategy::AttributeMap(item) => {
            match item.get(keys.hash_key()) {
                Some(value) if !value.is_empty() => {}
                _ => {
                    return Err(ValidationError::MissingKeyAttribute {
                        attr: keys.hash_key().to_string(),
                    }
                    .into())
                }
            }
            key_conditions_from_item(schema, &item, false)
        }
        Strategy::Instance(item) => key_conditions_from_item(schema, &item, true),
        Strategy::Condition(condition) => Ok(condition),
        Strategy::Batch(_) => Err(ValidationError::InvalidStrategy(
            "a batch strategy is not valid for single-item operations".to_string(),
        )
        .into()),
    }
}

/// Equality conditions for the declared key attributes present in `item`.
///
/// With `all_required` every primary key must be set (the model-instance
/// contract); otherwise only the keys present contribute, and the caller has
/// already checked the hash key.
fn key_conditions_from_item(schema: &Schema, item: &Item, all_required: bool) -> Result<Condition> {
    let mut conditions = Vec::new();
    for key in schema.keys().primary_keys() {
        match item.get(key) {
            Some(value) if !value.is_empty() => {
                conditions.push(key_equality(schema, key, value.clone())?);
            }
            _ if all_required => {
                return Err(ValidationError::MissingKeyAttribute {
                    attr: key.to_string(),
                }
                .into())
            }
            _ => {}
        }
    }

    Condition::all(conditions).ok_or_else(|| {
        ValidationError::MissingKeyAttribute {
            attr: schema.keys().hash_key().to_string(),
        }
        .into()
    })
}

fn key_equality(schema: &Schema, key: &str, value: Value) -> Result<Condition> {
    if let Some(field) = schema.field(key) {
        field.validate(&value).map_err(Error::Validation)?;
    }
    Ok(Attr::new(key).eq(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDef;
    use crate::value::Item;

    fn user_schema() -> Schema {
        Schema::builder("users")
            .hash_key("email")
            .field(FieldDef::email("email").required())
            .field(FieldDef::string("name"))
            .field(FieldDef::integer("year_of_birth"))
            .build()
            .unwrap()
    }

    fn contact_schema() -> Schema {
        Schema::builder("user-contacts")
            .hash_key("user_id")
            .range_key("email")
            .field(FieldDef::integer("user_id").required())
            .field(FieldDef::email("email").required())
            .build()
            .unwrap()
    }

    #[test]
    fn test_scalar_key_resolves_to_hash_equality() {
        let schema = user_schema();
        let resolved = normalize(&schema, "a@b.com".into()).unwrap();
        assert_eq!(resolved, Resolved::One(Attr::new("email").eq("a@b.com")));
    }

    #[test]
    fn test_scalar_key_fails_for_composite_model() {
        let schema = contact_schema();
        let error = normalize(&schema, Strategy::Key(Value::from(7i64))).unwrap_err();
        assert_eq!(
            error,
            Error::Schema(SchemaError::CompositeKeyRequired {
                table: "user-contacts".to_string()
            })
        );
    }

    #[test]
    fn test_scalar_key_validates_value_type() {
        let schema = user_schema();
        let error = normalize(&schema, Strategy::Key(Value::from(7i64))).unwrap_err();
        assert!(matches!(
            error,
            Error::Validation(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_key_pair_resolves_to_conjoined_equalities() {
        let schema = contact_schema();
        let resolved = normalize(&schema, (7i64, "a@b.com").into()).unwrap();
        assert_eq!(
            resolved,
            Resolved::One(
                Attr::new("user_id").eq(7i64) & Attr::new("email").eq("a@b.com")
            )
        );
    }

    #[test]
    fn test_key_pair_fails_for_simple_model() {
        let schema = user_schema();
        let error = normalize(&schema, ("a@b.com", "x").into()).unwrap_err();
        assert_eq!(
            error,
            Error::Schema(SchemaError::NoRangeKey {
                table: "users".to_string()
            })
        );
    }

    #[test]
    fn test_attribute_map_ignores_non_key_entries() {
        let schema = user_schema();
        let mut item = Item::new();
        item.insert("email".to_string(), Value::from("a@b.com"));
        item.insert("name".to_string(), Value::from("John"));
        item.insert("year_of_birth".to_string(), Value::from(1990i64));

        let resolved = normalize(&schema, item.into()).unwrap();
        // Only the declared key field contributes.
        assert_eq!(resolved, Resolved::One(Attr::new("email").eq("a@b.com")));
    }

    #[test]
    fn test_attribute_map_requires_hash_key_entry() {
        let schema = user_schema();
        let mut item = Item::new();
        item.insert("name".to_string(), Value::from("John"));

        let error = normalize(&schema, item.into()).unwrap_err();
        assert_eq!(
            error,
            Error::Validation(ValidationError::MissingKeyAttribute {
                attr: "email".to_string()
            })
        );
    }

    #[test]
    fn test_instance_requires_every_primary_key() {
        let schema = contact_schema();
        let mut item = Item::new();
        item.insert("user_id".to_string(), Value::from(7i64));

        let error = normalize(&schema, Strategy::Instance(item)).unwrap_err();
        assert_eq!(
            error,
            Error::Validation(ValidationError::MissingKeyAttribute {
                attr: "email".to_string()
            })
        );
    }

    #[test]
    fn test_condition_passes_through_unchanged() {
        let schema = user_schema();
        let condition = Attr::new("email").eq("a@b.com") & Attr::new("year_of_birth").gt(2000i64);
        let resolved = normalize(&schema, condition.clone().into()).unwrap();
        assert_eq!(resolved, Resolved::One(condition));
    }

    #[test]
    fn test_batch_of_scalars_resolves_independently() {
        let schema = user_schema();
        let emails = vec!["a@b.com", "c@d.com", "e@f.com"];
        let resolved = normalize(&schema, emails.into()).unwrap();

        let Resolved::Many(conditions) = resolved else {
            panic!("expected a batch resolution");
        };
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0], Attr::new("email").eq("a@b.com"));
        assert_eq!(conditions[2], Attr::new("email").eq("e@f.com"));
    }

    #[test]
    fn test_nested_batch_is_rejected() {
        let schema = user_schema();
        let nested = Strategy::Batch(vec![Strategy::Batch(vec!["a@b.com".into()])]);
        assert!(normalize(&schema, nested).is_err());
    }
}

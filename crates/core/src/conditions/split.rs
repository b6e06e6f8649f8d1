//! Expression splitting and structural validation.
//!
//! DynamoDB's key-condition grammar only accepts primary-key predicates as a
//! top-level conjunction: the hash key with equality, the range key with
//! equality or a range operator. `split` partitions a resolved condition
//! tree into the key-condition subtree and the filter subtree, rejecting
//! trees the grammar cannot express. `exact_key` is the stricter form used
//! by single-item operations, where every primary key must be pinned by an
//! equality.

use crate::error::ExpressionError;
use crate::schema::{KeySchema, Schema};
use crate::value::Item;

use super::tree::{Condition, Operator};

/// Whether an operation demands key predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyConditionMode {
    /// A hash-key equality conjunct is mandatory.
    Required,
    /// A key-less tree is allowed and becomes a pure filter scan.
    /// Only multi-item reads and deletes may use this.
    Optional,
}

/// A validated partition of a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCondition {
    /// AND-joined primary-key predicates, if any.
    pub key: Option<Condition>,
    /// Everything else, AND-joined, evaluated server-side after the lookup.
    pub filter: Option<Condition>,
}

/// Operators accepted in a key condition for the given key attribute.
///
/// Hash keys admit equality only. Range keys also admit the range operators
/// of the grammar. Anything else on a key attribute is demoted to the
/// filter subtree and does not count towards the required key predicates.
fn key_eligible(keys: &KeySchema, attr: &str, op: Operator) -> bool {
    if attr == keys.hash_key() {
        return op == Operator::Eq;
    }
    if keys.range_key() == Some(attr) {
        return matches!(
            op,
            Operator::Eq
                | Operator::Lt
                | Operator::Le
                | Operator::Gt
                | Operator::Ge
                | Operator::Between
                | Operator::BeginsWith
        );
    }
    false
}

/// Partition a condition tree into (key condition, filter).
pub fn split(
    schema: &Schema,
    condition: &Condition,
    mode: KeyConditionMode,
) -> Result<SplitCondition, ExpressionError> {
    let keys = schema.keys();
    let conjuncts = top_level_conjuncts(condition)?;

    let mut key_parts: Vec<Condition> = Vec::new();
    let mut filter_parts: Vec<Condition> = Vec::new();
    let mut seen_keys: Vec<&str> = Vec::new();

    for child in conjuncts {
        match child {
            Condition::Compare { attr, op, .. } if key_eligible(keys, attr, *op) => {
                if seen_keys.contains(&attr.as_str()) {
                    return Err(ExpressionError::RepeatedKey {
                        expression: condition.to_string(),
                        attr: attr.clone(),
                    });
                }
                seen_keys.push(attr);
                key_parts.push(child.clone());
            }
            other => filter_parts.push(other.clone()),
        }
    }

    let has_hash = seen_keys.contains(&keys.hash_key());

    if !has_hash && !key_parts.is_empty() {
        // Range predicates cannot stand alone.
        return Err(ExpressionError::RangeWithoutHash {
            expression: condition.to_string(),
        });
    }

    if !has_hash && mode == KeyConditionMode::Required {
        return Err(ExpressionError::MissingHashKey {
            expression: condition.to_string(),
            hash_key: keys.hash_key().to_string(),
        });
    }

    Ok(SplitCondition {
        key: Condition::all(key_parts),
        filter: Condition::all(filter_parts),
    })
}

/// The strict single-item form: every primary-key attribute must appear as
/// a top-level equality conjunct. Returns the key attribute map and any
/// residual condition (used as a conditional-write guard).
pub fn exact_key_with_condition(
    schema: &Schema,
    condition: &Condition,
) -> Result<(Item, Option<Condition>), ExpressionError> {
    let keys = schema.keys();
    let conjuncts = top_level_conjuncts(condition)?;

    let mut key_map = Item::new();
    let mut residual: Vec<Condition> = Vec::new();

    for child in conjuncts {
        match child {
            // Malformed arity falls through to the residual, where the
            // renderer rejects it.
            Condition::Compare { attr, op, values }
                if keys.is_key(attr) && op.accepts_operands(values.len()) =>
            {
                if *op != Operator::Eq {
                    return Err(ExpressionError::NonEqualityKey {
                        expression: condition.to_string(),
                        attr: attr.clone(),
                    });
                }
                if key_map.contains_key(attr) {
                    return Err(ExpressionError::RepeatedKey {
                        expression: condition.to_string(),
                        attr: attr.clone(),
                    });
                }
                key_map.insert(attr.clone(), values[0].clone());
            }
            other => residual.push(other.clone()),
        }
    }

    for key in keys.primary_keys() {
        if !key_map.contains_key(key) {
            return Err(ExpressionError::MissingKeyCondition {
                expression: condition.to_string(),
                attr: key.to_string(),
            });
        }
    }

    Ok((key_map, Condition::all(residual)))
}

/// As `exact_key_with_condition`, but the key map alone.
pub fn exact_key(schema: &Schema, condition: &Condition) -> Result<Item, ExpressionError> {
    exact_key_with_condition(schema, condition).map(|(keys, _)| keys)
}

/// The immediate conjuncts of the tree's root.
///
/// A disjunction or negation at the root can never guarantee that a key
/// predicate holds unconditionally, so both are structural errors here.
fn top_level_conjuncts(condition: &Condition) -> Result<Vec<&Condition>, ExpressionError> {
    match condition {
        Condition::And(children) => Ok(children.iter().collect()),
        Condition::Compare { .. } => Ok(vec![condition]),
        Condition::Or(_) | Condition::Not(_) => Err(ExpressionError::NonConjunctiveRoot {
            expression: condition.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::tree::Attr;
    use crate::fields::{FieldDef, FieldKind};
    use crate::value::Value;

    fn user_schema() -> Schema {
        Schema::builder("users")
            .hash_key("email")
            .field(FieldDef::email("email").required())
            .field(FieldDef::string("name"))
            .field(FieldDef::integer("year_of_birth"))
            .field(FieldDef::list("cities_visited", FieldKind::String))
            .build()
            .unwrap()
    }

    fn contact_schema() -> Schema {
        Schema::builder("user-contacts")
            .hash_key("email")
            .range_key("year_of_birth")
            .field(FieldDef::email("email").required())
            .field(FieldDef::integer("year_of_birth").required())
            .field(FieldDef::string("name"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_single_key_equality_is_pure_key_condition() {
        let schema = user_schema();
        let condition = Attr::new("email").eq("a@b.com");

        let split = split(&schema, &condition, KeyConditionMode::Required).unwrap();
        assert_eq!(split.key, Some(condition));
        assert_eq!(split.filter, None);
    }

    #[test]
    fn test_key_and_filter_are_partitioned() {
        let schema = user_schema();
        let key = Attr::new("email").eq("a@b.com");
        let extra = Attr::new("year_of_birth").gt(2000i64);
        let condition = key.clone() & extra.clone();

        let split = split(&schema, &condition, KeyConditionMode::Required).unwrap();
        assert_eq!(split.key, Some(key));
        assert_eq!(split.filter, Some(extra));
    }

    #[test]
    fn test_range_operator_on_range_key_stays_in_key_condition() {
        let schema = contact_schema();
        let condition = Attr::new("email").eq("a@b.com") & Attr::new("year_of_birth").le(2000i64);

        let split = split(&schema, &condition, KeyConditionMode::Required).unwrap();
        assert_eq!(
            split.key,
            Some(Attr::new("email").eq("a@b.com") & Attr::new("year_of_birth").le(2000i64))
        );
        assert_eq!(split.filter, None);
    }

    #[test]
    fn test_or_at_root_is_rejected() {
        let schema = user_schema();
        let condition = Attr::new("email").eq("a@b.com") | Attr::new("year_of_birth").gt(2000i64);

        let error = split(&schema, &condition, KeyConditionMode::Optional).unwrap_err();
        assert!(matches!(error, ExpressionError::NonConjunctiveRoot { .. }));
    }

    #[test]
    fn test_not_at_root_is_rejected() {
        let schema = user_schema();
        let condition = !Attr::new("email").eq("a@b.com");

        let error = split(&schema, &condition, KeyConditionMode::Required).unwrap_err();
        assert!(matches!(error, ExpressionError::NonConjunctiveRoot { .. }));
    }

    #[test]
    fn test_nested_or_below_root_goes_to_filter() {
        let schema = user_schema();
        let key = Attr::new("email").eq("a@b.com");
        let nested = Attr::new("year_of_birth").gt(2000i64)
            | Attr::new("cities_visited").contains("Nairobi");
        let condition = key.clone() & nested.clone();

        let split = split(&schema, &condition, KeyConditionMode::Required).unwrap();
        assert_eq!(split.key, Some(key));
        assert_eq!(split.filter, Some(nested));
    }

    #[test]
    fn test_non_equality_on_hash_key_is_demoted_to_filter() {
        let schema = user_schema();
        let condition = Attr::new("email").gt("a@b.com");

        // Demoted predicate does not satisfy the required hash equality.
        let error = split(&schema, &condition, KeyConditionMode::Required).unwrap_err();
        assert!(matches!(error, ExpressionError::MissingHashKey { .. }));

        // As a scan it is a plain filter.
        let split = split(&schema, &condition, KeyConditionMode::Optional).unwrap();
        assert_eq!(split.key, None);
        assert_eq!(split.filter, Some(condition));
    }

    #[test]
    fn test_contains_on_key_field_is_demoted() {
        let schema = contact_schema();
        let condition = Attr::new("email").eq("a@b.com") & Attr::new("year_of_birth").contains(7i64);

        let split = split(&schema, &condition, KeyConditionMode::Required).unwrap();
        assert_eq!(split.key, Some(Attr::new("email").eq("a@b.com")));
        assert_eq!(split.filter, Some(Attr::new("year_of_birth").contains(7i64)));
    }

    #[test]
    fn test_repeated_key_is_rejected() {
        let schema = user_schema();
        let condition = Attr::new("email").eq("a@b.com") & Attr::new("email").eq("c@d.com");

        let error = split(&schema, &condition, KeyConditionMode::Required).unwrap_err();
        assert!(matches!(error, ExpressionError::RepeatedKey { .. }));
    }

    #[test]
    fn test_range_without_hash_is_rejected() {
        let schema = contact_schema();
        let condition = Attr::new("year_of_birth").le(2000i64);

        let error = split(&schema, &condition, KeyConditionMode::Optional).unwrap_err();
        assert!(matches!(error, ExpressionError::RangeWithoutHash { .. }));
    }

    #[test]
    fn test_keyless_tree_is_allowed_as_scan() {
        let schema = user_schema();
        let condition = Attr::new("name").eq("John") & Attr::new("year_of_birth").gt(2000i64);

        let split = split(&schema, &condition, KeyConditionMode::Optional).unwrap();
        assert_eq!(split.key, None);
        assert_eq!(split.filter, Some(condition));
    }

    #[test]
    fn test_exact_key_returns_key_map() {
        let schema = contact_schema();
        let condition = Attr::new("email").eq("a@b.com") & Attr::new("year_of_birth").eq(1990i64);

        let (keys, residual) = exact_key_with_condition(&schema, &condition).unwrap();
        assert_eq!(keys.get("email"), Some(&Value::from("a@b.com")));
        assert_eq!(keys.get("year_of_birth"), Some(&Value::Int(1990)));
        assert_eq!(residual, None);
    }

    #[test]
    fn test_exact_key_keeps_residual_condition() {
        let schema = user_schema();
        let guard = Attr::new("year_of_birth").le(2000i64);
        let condition = Attr::new("email").eq("a@b.com") & guard.clone();

        let (keys, residual) = exact_key_with_condition(&schema, &condition).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(residual, Some(guard));
    }

    #[test]
    fn test_exact_key_requires_every_primary_key() {
        let schema = contact_schema();
        let condition = Attr::new("email").eq("a@b.com");

        let error = exact_key(&schema, &condition).unwrap_err();
        assert_eq!(
            error,
            ExpressionError::MissingKeyCondition {
                expression: "email = \"a@b.com\"".to_string(),
                attr: "year_of_birth".to_string(),
            }
        );
    }

    #[test]
    fn test_exact_key_ignores_hand_built_node_with_missing_operands() {
        let schema = user_schema();
        let malformed = Condition::Compare {
            attr: "email".to_string(),
            op: Operator::Eq,
            values: vec![],
        };

        // No panic: the node does not count as a key conjunct, so the
        // required-key check fails instead.
        let error = exact_key(&schema, &malformed).unwrap_err();
        assert!(matches!(error, ExpressionError::MissingKeyCondition { .. }));
    }

    #[test]
    fn test_exact_key_rejects_non_equality_on_key() {
        let schema = contact_schema();
        let condition = Attr::new("email").eq("a@b.com") & Attr::new("year_of_birth").le(2000i64);

        let error = exact_key(&schema, &condition).unwrap_err();
        assert!(matches!(error, ExpressionError::NonEqualityKey { .. }));
    }
}

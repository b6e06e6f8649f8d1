//! DynamoDB attribute conversion functions.
//!
//! Pure functions for converting between the engine's value model and
//! `AttributeValue` maps. Numbers travel as `N` strings; integers are
//! preferred on the way back in, falling back to floats.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use dynamap_core::{Item, Value};

use crate::error::{Result, StoreError};

/// Convert an engine value to an `AttributeValue`.
pub fn value_to_attribute(value: &Value) -> Result<AttributeValue> {
    Ok(match value {
        Value::Str(s) => AttributeValue::S(s.clone()),
        Value::Int(n) => AttributeValue::N(n.to_string()),
        Value::Float(n) => AttributeValue::N(n.to_string()),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Null => AttributeValue::Null(true),
        Value::List(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                list.push(value_to_attribute(item)?);
            }
            AttributeValue::L(list)
        }
        Value::Map(map) => {
            let mut attributes = HashMap::with_capacity(map.len());
            for (key, value) in map {
                attributes.insert(key.clone(), value_to_attribute(value)?);
            }
            AttributeValue::M(attributes)
        }
    })
}

/// Convert an `AttributeValue` back into an engine value.
///
/// Set types (`SS`, `NS`, `BS`) and binary values have no counterpart in
/// the value model and fail with a conversion error.
pub fn attribute_to_value(attribute: &AttributeValue) -> Result<Value> {
    match attribute {
        AttributeValue::S(s) => Ok(Value::Str(s.clone())),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::L(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                list.push(attribute_to_value(item)?);
            }
            Ok(Value::List(list))
        }
        AttributeValue::M(map) => {
            let mut values = std::collections::BTreeMap::new();
            for (key, value) in map {
                values.insert(key.clone(), attribute_to_value(value)?);
            }
            Ok(Value::Map(values))
        }
        other => Err(StoreError::Conversion(format!(
            "unsupported attribute value: {:?}",
            other
        ))),
    }
}

fn parse_number(n: &str) -> Result<Value> {
    if let Ok(int) = n.parse::<i64>() {
        return Ok(Value::Int(int));
    }
    n.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| StoreError::Conversion(format!("invalid number: {}", n)))
}

/// Convert an engine item to a DynamoDB attribute map.
pub fn item_to_attributes(item: &Item) -> Result<HashMap<String, AttributeValue>> {
    let mut attributes = HashMap::with_capacity(item.len());
    for (name, value) in item {
        attributes.insert(name.clone(), value_to_attribute(value)?);
    }
    Ok(attributes)
}

/// Convert a DynamoDB attribute map back into an engine item.
pub fn attributes_to_item(attributes: &HashMap<String, AttributeValue>) -> Result<Item> {
    let mut item = Item::new();
    for (name, attribute) in attributes {
        item.insert(name.clone(), attribute_to_value(attribute)?);
    }
    Ok(item)
}

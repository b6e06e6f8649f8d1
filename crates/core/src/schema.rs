//! Model schema declaration.
//!
//! A schema is declared once per model and is read-only afterwards: table
//! name, key schema (hash key, optional range key), and field definitions.
//! Consistency is checked at build time so that key-related mistakes surface
//! as `SchemaError` before any operation runs.

use std::collections::BTreeMap;

use crate::error::{SchemaError, ValidationError};
use crate::fields::FieldDef;
use crate::value::{Item, Value};

/// The primary key declaration of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    hash_key: String,
    range_key: Option<String>,
}

impl KeySchema {
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    pub fn is_composite(&self) -> bool {
        self.range_key.is_some()
    }

    pub fn is_key(&self, attr: &str) -> bool {
        attr == self.hash_key || self.range_key.as_deref() == Some(attr)
    }

    /// Hash key first, then the range key if declared.
    pub fn primary_keys(&self) -> Vec<&str> {
        match &self.range_key {
            Some(range) => vec![self.hash_key.as_str(), range.as_str()],
            None => vec![self.hash_key.as_str()],
        }
    }
}

/// A model's full declaration: table, keys, and fields.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    keys: KeySchema,
    fields: BTreeMap<String, FieldDef>,
}

impl Schema {
    pub fn builder(table: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            table: table.into(),
            hash_key: None,
            range_key: None,
            fields: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn keys(&self) -> &KeySchema {
        &self.keys
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    /// Apply defaults, validate every declared field, and drop empty values.
    ///
    /// Undeclared attributes in the input are ignored. Fails when a required
    /// field or any primary-key attribute ends up unset, or when a value
    /// violates its field's constraints.
    pub fn clean_item(&self, item: &Item) -> Result<Item, ValidationError> {
        let mut clean = Item::new();

        for (name, field) in &self.fields {
            let value = match item.get(name) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => match field.default_value() {
                    Some(default) => default,
                    None => Value::Null,
                },
            };

            field.validate(&value)?;
            if !value.is_empty() {
                clean.insert(name.clone(), value);
            }
        }

        for key in self.keys.primary_keys() {
            if !clean.contains_key(key) {
                return Err(ValidationError::MissingKeyAttribute {
                    attr: key.to_string(),
                });
            }
        }

        Ok(clean)
    }

    /// Extract the primary-key attributes from an item.
    ///
    /// Fails with `ValidationError` when any primary-key attribute is unset.
    pub fn key_item(&self, item: &Item) -> Result<Item, ValidationError> {
        let mut keys = Item::new();
        for key in self.keys.primary_keys() {
            match item.get(key) {
                Some(value) if !value.is_empty() => {
                    if let Some(field) = self.fields.get(key) {
                        field.validate(value)?;
                    }
                    keys.insert(key.to_string(), value.clone());
                }
                _ => {
                    return Err(ValidationError::MissingKeyAttribute {
                        attr: key.to_string(),
                    })
                }
            }
        }
        Ok(keys)
    }
}

/// Builder for `Schema`; `build` runs the consistency checks.
pub struct SchemaBuilder {
    table: String,
    hash_key: Option<String>,
    range_key: Option<String>,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    pub fn hash_key(mut self, name: impl Into<String>) -> Self {
        self.hash_key = Some(name.into());
        self
    }

    pub fn range_key(mut self, name: impl Into<String>) -> Self {
        self.range_key = Some(name.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        if self.table.is_empty() {
            return Err(SchemaError::MissingTableName);
        }

        let hash_key = self.hash_key.ok_or_else(|| SchemaError::MissingHashKey {
            table: self.table.clone(),
        })?;

        let mut fields = BTreeMap::new();
        for field in self.fields {
            field.check_name()?;
            if fields.contains_key(field.name()) {
                return Err(SchemaError::DuplicateField {
                    table: self.table.clone(),
                    attr: field.name().to_string(),
                });
            }
            fields.insert(field.name().to_string(), field);
        }

        let keys = KeySchema {
            hash_key,
            range_key: self.range_key,
        };

        for key in keys.primary_keys() {
            let field = fields
                .get(key)
                .ok_or_else(|| SchemaError::UndeclaredKeyField {
                    attr: key.to_string(),
                })?;
            if !field.kind().is_scalar_key_kind() {
                return Err(SchemaError::InvalidKeyKind {
                    attr: key.to_string(),
                });
            }
        }

        Ok(Schema {
            table: self.table,
            keys,
            fields,
        })
    }
}

/// A persistable entity bound to a schema.
///
/// Implementations hold their schema in a `OnceLock` so declaration happens
/// once per process.
pub trait Model: Sized {
    /// The model's schema. Declared once, process-lifetime.
    fn schema() -> &'static Schema;

    /// The instance's currently-set attributes, unvalidated.
    fn to_item(&self) -> Item;

    /// Rebuild an instance from a stored item.
    fn from_item(item: &Item) -> Result<Self, ValidationError>;
}

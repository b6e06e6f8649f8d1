//! Field declarations.
//!
//! A field is a named, typed attribute descriptor attached to a model schema:
//! semantic kind, required flag, default-value provider, and value
//! constraints. Fields are immutable once the schema is built.

use chrono::{DateTime, NaiveDate};
use uuid::Uuid;

use crate::error::{SchemaError, ValidationError};
use crate::value::Value;

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    Email,
    Uuid,
    /// RFC 3339 timestamp, stored as a string.
    DateTime,
    /// `YYYY-MM-DD` date, stored as a string.
    Date,
    List(Box<FieldKind>),
    Map,
}

impl FieldKind {
    /// Name used in validation error messages.
    pub fn expected_name(&self) -> String {
        match self {
            FieldKind::String => "a string".to_string(),
            FieldKind::Integer => "an integer".to_string(),
            FieldKind::Float => "a number".to_string(),
            FieldKind::Boolean => "a boolean".to_string(),
            FieldKind::Email => "an email address".to_string(),
            FieldKind::Uuid => "a UUID string".to_string(),
            FieldKind::DateTime => "an RFC 3339 timestamp".to_string(),
            FieldKind::Date => "a YYYY-MM-DD date".to_string(),
            FieldKind::List(inner) => format!("a list of {}", inner.expected_name()),
            FieldKind::Map => "a map".to_string(),
        }
    }

    /// Whether the kind maps to a DynamoDB scalar (`S` or `N`) and is
    /// therefore usable as a primary key attribute.
    pub fn is_scalar_key_kind(&self) -> bool {
        matches!(
            self,
            FieldKind::String
                | FieldKind::Integer
                | FieldKind::Float
                | FieldKind::Email
                | FieldKind::Uuid
                | FieldKind::DateTime
                | FieldKind::Date
        )
    }
}

/// A named, typed attribute descriptor.
#[derive(Clone)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
    required: bool,
    default: Option<fn() -> Value>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Uuid)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn list(name: impl Into<String>, element: FieldKind) -> Self {
        Self::new(name, FieldKind::List(Box::new(element)))
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Map)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Provider called when an item omits this attribute, e.g.
    /// a "now" timestamp for creation times.
    pub fn default(mut self, provider: fn() -> Value) -> Self {
        self.default = Some(provider);
        self
    }

    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.map(|provider| provider())
    }

    /// Schema-declaration check on the field name itself.
    pub(crate) fn check_name(&self) -> Result<(), SchemaError> {
        if !self.name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(SchemaError::InvalidAttributeName {
                attr: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Validate a value against this field's kind and constraints.
    ///
    /// `Null` passes unless the field is required; presence of required
    /// attributes across a whole item is enforced by the schema.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if value.is_empty() {
            if self.required {
                return Err(ValidationError::MissingRequired {
                    attr: self.name.clone(),
                });
            }
            return Ok(());
        }

        self.validate_kind(&self.kind, value)?;
        self.validate_constraints(value)
    }

    /// Validate a single element of a list field's value.
    ///
    /// For non-list fields this falls back to a plain kind check, so a
    /// `contains` operand is always checked against the kind of what the
    /// stored attribute actually holds.
    pub(crate) fn validate_element(&self, value: &Value) -> Result<(), ValidationError> {
        match &self.kind {
            FieldKind::List(element) => self.validate_kind(element, value),
            kind => self.validate_kind(kind, value),
        }
    }

    fn type_mismatch(&self, kind: &FieldKind, value: &Value) -> ValidationError {
        ValidationError::TypeMismatch {
            attr: self.name.clone(),
            expected: kind.expected_name(),
            actual: value.type_name().to_string(),
        }
    }

    fn validate_kind(&self, kind: &FieldKind, value: &Value) -> Result<(), ValidationError> {
        match kind {
            FieldKind::String => match value {
                Value::Str(_) => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Integer => match value {
                Value::Int(_) => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Float => match value {
                Value::Int(_) | Value::Float(_) => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Email => match value {
                Value::Str(s) if is_email(s) => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Uuid => match value {
                Value::Str(s) if Uuid::parse_str(s).is_ok() => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::DateTime => match value {
                Value::Str(s) if DateTime::parse_from_rfc3339(s).is_ok() => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Date => match value {
                Value::Str(s) if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::List(element) => match value {
                Value::List(items) => {
                    for item in items {
                        self.validate_kind(element, item)?;
                    }
                    Ok(())
                }
                _ => Err(self.type_mismatch(kind, value)),
            },
            FieldKind::Map => match value {
                Value::Map(_) => Ok(()),
                _ => Err(self.type_mismatch(kind, value)),
            },
        }
    }

    fn validate_constraints(&self, value: &Value) -> Result<(), ValidationError> {
        if let Some(number) = value.as_float() {
            if let Some(min) = self.min_value {
                if number < min {
                    return Err(ValidationError::Constraint {
                        attr: self.name.clone(),
                        message: format!("{} is below the minimum {}", number, min),
                    });
                }
            }
            if let Some(max) = self.max_value {
                if number > max {
                    return Err(ValidationError::Constraint {
                        attr: self.name.clone(),
                        message: format!("{} is above the maximum {}", number, max),
                    });
                }
            }
        }

        if let Some(text) = value.as_str() {
            let length = text.chars().count();
            if let Some(min) = self.min_length {
                if length < min {
                    return Err(ValidationError::Constraint {
                        attr: self.name.clone(),
                        message: format!("length {} is below the minimum {}", length, min),
                    });
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    return Err(ValidationError::Constraint {
                        attr: self.name.clone(),
                        message: format!("length {} is above the maximum {}", length, max),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Minimal structural check: one `@`, non-empty local part, and a domain
/// containing a dot.
fn is_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_field_accepts_string() {
        let field = FieldDef::string("name");
        assert!(field.validate(&Value::from("John")).is_ok());
    }

    #[test]
    fn test_string_field_rejects_integer() {
        let field = FieldDef::string("name");
        let error = field.validate(&Value::from(7i64)).unwrap_err();
        assert_eq!(
            error,
            ValidationError::TypeMismatch {
                attr: "name".to_string(),
                expected: "a string".to_string(),
                actual: "an integer".to_string(),
            }
        );
    }

    #[test]
    fn test_required_field_rejects_null() {
        let field = FieldDef::string("name").required();
        assert!(field.validate(&Value::Null).is_err());
    }

    #[test]
    fn test_optional_field_accepts_null() {
        let field = FieldDef::string("name");
        assert!(field.validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_integer_bounds() {
        let field = FieldDef::integer("year_of_birth")
            .min_value(1900.0)
            .max_value(2018.0);
        assert!(field.validate(&Value::from(1990i64)).is_ok());
        assert!(field.validate(&Value::from(1800i64)).is_err());
        assert!(field.validate(&Value::from(2020i64)).is_err());
    }

    #[test]
    fn test_float_field_accepts_integer() {
        let field = FieldDef::float("score");
        assert!(field.validate(&Value::from(3i64)).is_ok());
        assert!(field.validate(&Value::from(3.5)).is_ok());
    }

    #[test]
    fn test_email_validation() {
        let field = FieldDef::email("email");
        assert!(field.validate(&Value::from("john@example.com")).is_ok());
        assert!(field.validate(&Value::from("not-an-email")).is_err());
        assert!(field.validate(&Value::from("@example.com")).is_err());
        assert!(field.validate(&Value::from("john@nodomain")).is_err());
    }

    #[test]
    fn test_uuid_validation() {
        let field = FieldDef::uuid("id");
        assert!(field
            .validate(&Value::from("550e8400-e29b-41d4-a716-446655440001"))
            .is_ok());
        assert!(field.validate(&Value::from("nope")).is_err());
    }

    #[test]
    fn test_datetime_validation() {
        let field = FieldDef::datetime("created_at");
        assert!(field.validate(&Value::from("2024-01-15T10:30:00Z")).is_ok());
        assert!(field.validate(&Value::from("2024-01-15")).is_err());
    }

    #[test]
    fn test_date_validation() {
        let field = FieldDef::date("birthday");
        assert!(field.validate(&Value::from("2024-01-15")).is_ok());
        assert!(field.validate(&Value::from("15/01/2024")).is_err());
    }

    #[test]
    fn test_list_field_validates_elements() {
        let field = FieldDef::list("cities_visited", FieldKind::String);
        assert!(field.validate(&Value::from(vec!["Nairobi", "New York"])).is_ok());
        let mixed = Value::List(vec![Value::from("Nairobi"), Value::from(7i64)]);
        assert!(field.validate(&mixed).is_err());
    }

    #[test]
    fn test_string_length_constraints() {
        let field = FieldDef::string("name").min_length(2).max_length(4);
        assert!(field.validate(&Value::from("abc")).is_ok());
        assert!(field.validate(&Value::from("a")).is_err());
        assert!(field.validate(&Value::from("abcde")).is_err());
    }

    #[test]
    fn test_default_provider() {
        let field = FieldDef::integer("retries").default(|| Value::Int(3));
        assert_eq!(field.default_value(), Some(Value::Int(3)));
        assert_eq!(FieldDef::integer("n").default_value(), None);
    }

    #[test]
    fn test_key_kind_eligibility() {
        assert!(FieldKind::String.is_scalar_key_kind());
        assert!(FieldKind::Email.is_scalar_key_kind());
        assert!(!FieldKind::Boolean.is_scalar_key_kind());
        assert!(!FieldKind::List(Box::new(FieldKind::String)).is_scalar_key_kind());
    }

    #[test]
    fn test_invalid_attribute_name() {
        let field = FieldDef::string("1name");
        assert!(field.check_name().is_err());
        assert!(FieldDef::string("name").check_name().is_ok());
    }
}

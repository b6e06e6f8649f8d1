//! Schema declaration, validation, and the condition-expression engine.
//!
//! This crate is pure: it never talks to DynamoDB. It turns model schemas,
//! lookup strategies, condition trees, and update actions into validated,
//! rendered expressions. Every error here is raised before a request is
//! built, so a caller that gets past this crate holds an expression
//! DynamoDB will accept.

pub mod conditions;
pub mod error;
pub mod fields;
pub mod schema;
pub mod updates;
pub mod value;

pub use conditions::{
    exact_key, exact_key_with_condition, normalize, render, render_condition, split, Attr,
    Condition, KeyConditionMode, Operator, RenderedCondition, RenderedExpression, Resolved,
    SplitCondition, Strategy,
};
pub use error::{Error, ExpressionError, Result, SchemaError, ValidationError};
pub use fields::{FieldDef, FieldKind};
pub use schema::{KeySchema, Model, Schema, SchemaBuilder};
pub use updates::{render_updates, RenderedUpdate, Update};
pub use value::{Item, Value};

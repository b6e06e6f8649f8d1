//! DynamoDB model-mapping client.
//!
//! Pairs the pure expression engine from `dynamap_core` with the AWS SDK:
//! connection management, attribute conversion, and the [`Store`]
//! operations surface. The engine re-exports make a single `use dynamap::*`
//! enough to declare models and run operations.

pub mod batch;
pub mod connection;
pub mod convert;
pub mod error;
pub mod store;

pub use batch::BatchResult;
pub use connection::{Connection, ConnectionConfig};
pub use error::{Result, StoreError};
pub use store::{Overwrite, QueryOptions, Store};

pub use dynamap_core::{
    Attr, Condition, Error, ExpressionError, FieldDef, FieldKind, Item, Model, Operator, Schema,
    SchemaError, Strategy, Update, ValidationError, Value,
};

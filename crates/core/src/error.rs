use thiserror::Error;

/// Errors raised when input data violates a field constraint or is missing
/// a required key attribute. Recoverable by fixing the input and retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required value for attribute `{attr}`")]
    MissingRequired { attr: String },
    #[error("primary key attribute `{attr}` must be set to a valid value")]
    MissingKeyAttribute { attr: String },
    #[error("attribute `{attr}` expects {expected}, got {actual}")]
    TypeMismatch {
        attr: String,
        expected: String,
        actual: String,
    },
    #[error("attribute `{attr}` violates constraint: {message}")]
    Constraint { attr: String, message: String },
    #[error("invalid strategy: {0}")]
    InvalidStrategy(String),
    #[error("a strategy with a condition is not allowed here")]
    ConditionNotAllowed,
    #[error("at least one attribute must be updated")]
    EmptyUpdate,
    #[error("cannot remove attribute `{attr}`: {reason}")]
    InvalidRemove { attr: String, reason: String },
}

/// Errors raised when a condition tree cannot be expressed in DynamoDB's
/// key-condition grammar. Not retryable without restructuring the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("invalid expression `{expression}`: primary key conditions must form the top-level AND")]
    NonConjunctiveRoot { expression: String },
    #[error("invalid expression `{expression}`: an equality condition on the hash key `{hash_key}` is required")]
    MissingHashKey {
        expression: String,
        hash_key: String,
    },
    #[error("invalid expression `{expression}`: cannot repeat key `{attr}` in the same expression")]
    RepeatedKey { expression: String, attr: String },
    #[error("invalid expression `{expression}`: a range key condition cannot be used without a hash key condition")]
    RangeWithoutHash { expression: String },
    #[error("invalid expression `{expression}`: an equality condition is required for the key `{attr}`")]
    NonEqualityKey { expression: String, attr: String },
    #[error("invalid expression `{expression}`: a condition on every primary key attribute is required, missing `{attr}`")]
    MissingKeyCondition { expression: String, attr: String },
}

/// Errors raised when a model declaration is internally inconsistent.
/// These indicate a programming error and are surfaced immediately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema for table `{table}` does not declare a hash key")]
    MissingHashKey { table: String },
    #[error("schema declares no table name")]
    MissingTableName,
    #[error("a field must be defined for the primary key attribute `{attr}`")]
    UndeclaredKeyField { attr: String },
    #[error("primary key attribute `{attr}` must be of a scalar string or numeric kind")]
    InvalidKeyKind { attr: String },
    #[error("attribute names must start with an alphabetic character, got `{attr}`")]
    InvalidAttributeName { attr: String },
    #[error("table `{table}` uses a composite primary key; a (hash, range) pair is required")]
    CompositeKeyRequired { table: String },
    #[error("table `{table}` does not declare a range key; a key pair is not valid")]
    NoRangeKey { table: String },
    #[error("duplicate field `{attr}` in schema for table `{table}`")]
    DuplicateField { table: String, attr: String },
}

/// Umbrella error for the engine entry points.
///
/// `normalize` can fail with either a schema or a validation error, so the
/// public functions return this enum; the inner taxonomy stays intact for
/// callers that match on it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

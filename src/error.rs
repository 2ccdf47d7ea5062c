use crate::dialect::Platform;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing the body of a single expression.
///
/// These never escape a conversion call: the parser turns them into an
/// `Unparsed` marker and the walker keeps the original text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expression body is empty")]
    EmptyExpression,

    #[error("Expression is missing its closing '}}}}'")]
    UnterminatedExpression,

    #[error("Unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },

    #[error("String literal starting at offset {offset} is never closed")]
    UnterminatedString { offset: usize },

    #[error("Unexpected '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: String,
    },

    #[error("Unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("Only named functions can be called (offset {offset})")]
    UnsupportedCallTarget { offset: usize },

    #[error("Expression nesting exceeds the limit of {limit}")]
    NestingTooDeep { limit: usize },
}

/// Errors that can occur while reducing an expression to a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{function}' expects {expected} argument(s), but received {found}")]
    ArityMismatch {
        function: String,
        expected: String,
        found: usize,
    },

    #[error("Evaluation exceeded its {kind} budget of {limit}")]
    BudgetExceeded { kind: &'static str, limit: usize },

    #[error("Expression could not be parsed: {0}")]
    Unparsed(String),

    #[error("Could not interpret '{0}' as a date")]
    InvalidDate(String),
}

/// Errors raised while building a `MappingTable` from a mapping database.
#[derive(Error, Debug, Clone)]
pub enum MappingError {
    #[error("Failed to parse mapping database JSON: {0}")]
    JsonParseError(String),

    #[error("Mapping key '{key}' does not match its entry's source type '{source_type}'")]
    KeyMismatch { key: String, source_type: String },

    #[error("Mapping for source type '{0}' has an empty target type")]
    EmptyTargetType(String),
}

/// Errors raised when an input document lacks the shape its platform requires.
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Workflow document must be a JSON object")]
    NotAnObject,

    #[error("A {platform} workflow requires a top-level '{field}' field")]
    MissingField {
        platform: Platform,
        field: &'static str,
    },

    #[error("Top-level field '{field}' must be {expected}")]
    WrongFieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Source and target platform are both {0}; nothing to convert")]
    SamePlatform(Platform),

    #[error("Malformed workflow document: {0}")]
    Malformed(String),
}

/// Errors raised by the parameter tree walker.
#[derive(Error, Debug, Clone)]
pub enum WalkError {
    #[error("Parameter tree at '{path}' is nested deeper than {limit} levels")]
    DepthExceeded { path: String, limit: usize },
}

/// Errors raised when loading conversion options.
#[derive(Error, Debug, Clone)]
pub enum OptionsError {
    #[error("Failed to parse conversion options JSON: {0}")]
    JsonParseError(String),
}

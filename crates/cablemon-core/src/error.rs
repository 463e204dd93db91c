//! Error types shared by parsers and the registry

use thiserror::Error;

/// A single delimited record or table row that does not match its schema.
///
/// Extraction errors are always recovered per record: the offending record is
/// logged and skipped, the rest of the payload still contributes to the result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("Invalid {field} value: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Missing {0} field")]
    MissingField(&'static str),
}

/// A parser descriptor that cannot be registered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("Parser name is empty")]
    EmptyName,
    #[error("Parser {0} has no manufacturer")]
    EmptyManufacturer(String),
    #[error("Parser {0} declares no models")]
    NoModels(String),
    #[error("Parser {name} has invalid URL path {path:?}")]
    InvalidPath { name: String, path: String },
}

/// An authentication strategy identifier outside the supported set
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown authentication strategy: {0}")]
pub struct UnknownStrategy(pub String);

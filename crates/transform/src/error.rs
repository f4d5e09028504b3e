//! Transform-level error type.

use thiserror::Error;

/// Problems found while validating a field map.
///
/// Applying a valid map to a row never fails; these only surface when a
/// profile is built or loaded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("field map contains an empty output field name")]
    EmptyOutputField,

    #[error("output field '{0}' is mapped more than once")]
    DuplicateOutputField(String),

    #[error("output field '{0}' lists no source fields")]
    NoSourceFields(String),
}

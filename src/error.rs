//! Error types for the dependency resolution and validation engine.
//!
//! This module provides idiomatic Rust error types using thiserror for
//! better error messages and proper error chain handling.
//!
//! Configuration integrity problems (dangling references, bad ordering) are
//! deliberately *not* represented here: they are reported as data
//! (`crate::health::HealthIssue`) because a form must remain usable, perhaps
//! degraded, even with bad rule data.

use thiserror::Error;

use crate::rules::FieldId;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown field '{name}'")]
    UnknownField { name: String },
}

/// Errors from parsing and validating `Entity.Property` dependency paths.
///
/// Parse and metadata-lookup failures surface synchronously to the caller of
/// `parse`/`validate_path`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Malformed dependency path '{raw}': {reason}")]
    Malformed { raw: String, reason: String },

    #[error("Unknown entity '{entity}'; available: {available}")]
    UnknownEntity { entity: String, available: String },

    #[error("Property '{property}' not found on entity '{entity}'; available: {available}")]
    UnknownProperty {
        entity: String,
        property: String,
        available: String,
    },

    #[error("Property '{property}' on entity '{entity}' is not navigable")]
    NotNavigable { entity: String, property: String },
}

/// Errors from the entity metadata boundary
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Metadata service unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors from dispatching batch dependency resolution.
///
/// A dispatch failure degrades the whole batch; previously cached entries for
/// rules outside the batch stay valid.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Dependency resolution dispatch failed: {message}")]
    DispatchFailed { message: String },

    #[error("Dependency resolution timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Errors from dispatching per-field validation.
///
/// Distinct from an invalid outcome: a dispatch failure must never be
/// coerced into `is_valid = false`.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Validation dispatch failed for field {field_id}: {message}")]
    DispatchFailed { field_id: FieldId, message: String },

    #[error("Validation for field {field_id} timed out after {timeout_ms}ms")]
    Timeout { field_id: FieldId, timeout_ms: u64 },
}

/// Result type aliases for convenience
pub type EngineResult<T> = Result<T, EngineError>;
pub type PathResult<T> = Result<T, PathError>;
pub type ResolutionResult<T> = Result<T, ResolutionError>;
pub type ValidationResult<T> = Result<T, ValidationError>;

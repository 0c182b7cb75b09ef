//! Dependency path grammar and resolution.
//!
//! A dependency path names the value a validation rule depends on: either a
//! bare `property` on the form's own entity (self-reference) or
//! `Entity.Property` on a related entity. Paths are parsed once, validated
//! against the entity metadata catalog, and immutable afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

pub mod parser;
pub mod validate;

pub use validate::{validate_path, PathValidator};

/// A normalized dependency path.
///
/// Serialized as its canonical string form (`property` or
/// `Entity.Property`) so rules round-trip through the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DependencyPath {
    /// Bare property on the form's own entity type
    SelfReference { property: String },

    /// Property on a named related entity
    CrossEntity { entity: String, property: String },
}

impl DependencyPath {
    /// Parse a raw path string.
    ///
    /// More than one dot, an empty segment, or a non-identifier segment is a
    /// `PathError::Malformed`; this never panics.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        parser::parse_path(raw)
    }

    /// The property segment
    pub fn property(&self) -> &str {
        match self {
            Self::SelfReference { property } => property,
            Self::CrossEntity { property, .. } => property,
        }
    }

    /// The entity segment, if cross-entity
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::SelfReference { .. } => None,
            Self::CrossEntity { entity, .. } => Some(entity),
        }
    }

    pub fn is_self_reference(&self) -> bool {
        matches!(self, Self::SelfReference { .. })
    }
}

impl fmt::Display for DependencyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfReference { property } => write!(f, "{property}"),
            Self::CrossEntity { entity, property } => write!(f, "{entity}.{property}"),
        }
    }
}

impl FromStr for DependencyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DependencyPath> for String {
    fn from(path: DependencyPath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for DependencyPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trip() {
        let path = DependencyPath::parse("Town.name").unwrap();
        assert_eq!(path.to_string(), "Town.name");
        assert_eq!(path.entity(), Some("Town"));
        assert_eq!(path.property(), "name");

        let bare = DependencyPath::parse("population").unwrap();
        assert_eq!(bare.to_string(), "population");
        assert!(bare.is_self_reference());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let path = DependencyPath::parse("Town.name").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"Town.name\"");

        let back: DependencyPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let result: Result<DependencyPath, _> = serde_json::from_str("\"a.b.c\"");
        assert!(result.is_err());
    }
}

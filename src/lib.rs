//! formgraph - Field dependency resolution & cross-field validation engine
//!
//! Administrators describe, per form field, validation rules whose legality
//! depends on *other* fields, possibly on different related entities. This
//! crate resolves those dependencies and validates fields live while a user
//! fills out a multi-step form:
//!
//! - parse and validate `Entity.Property` dependency paths against entity
//!   metadata
//! - batch-resolve the value bound to each dependency from a snapshot of
//!   in-progress form state, with a session-scoped cache
//! - run debounced, cancelable per-field validation with blocking /
//!   non-blocking semantics
//! - interpolate human-readable messages from `{Key}` templates
//! - statically health-check saved rule configurations (dangling
//!   references, ordering violations, dependency cycles)
//!
//! Rule conditions themselves are evaluated by the external rule store;
//! this crate carries rule metadata, dispatches requests, and consumes
//! results.
//!
//! ## Quick start
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use formgraph::path::DependencyPath;
//! use formgraph::template::interpolate;
//!
//! let path = DependencyPath::parse("Town.name").unwrap();
//! assert_eq!(path.entity(), Some("Town"));
//!
//! let mut values = HashMap::new();
//! values.insert("Town.name".to_string(), "Town Square".to_string());
//! assert_eq!(
//!     interpolate("Location is outside {Town.name} boundaries", &values),
//!     "Location is outside Town Square boundaries"
//! );
//! ```

// Core error handling
pub mod error;

// Engine tunables
pub mod config;

// Debounce / generation bookkeeping shared by validators
pub mod debounce;

// Entity metadata catalog (consumed from the metadata service)
pub mod metadata;

// `Entity.Property` dependency path grammar and validation
pub mod path;

// Validation rule model and rule graph
pub mod rules;

// Persisted form configuration model
pub mod form;

// Message template interpolation
pub mod template;

// Batch dependency resolution and the session-scoped cache
pub mod resolver;

// Debounced per-field validation
pub mod validator;

// Static configuration health diagnostics
pub mod health;

// Live form session state (the form runtime surface)
pub mod session;

// External rule store boundary (HTTP client + in-memory stub)
pub mod store;

// Public re-exports for the common surface
pub use config::EngineConfig;
pub use debounce::Trigger;
pub use error::{EngineError, MetadataError, PathError, ResolutionError, ValidationError};
pub use form::{FieldDefinition, FieldIndex, FormConfiguration, FormSnapshot};
pub use health::{check_configuration, HealthIssue, HealthReport, IssueSeverity};
pub use metadata::{EntityMetadata, EntityRegistry, MetadataProvider, PropertyMetadata};
pub use path::{validate_path, DependencyPath, PathValidator};
pub use resolver::{DependencyResolver, ResolutionStatus, ResolvedDependency};
pub use rules::{FieldId, RuleId, RuleSet, ValidationRule, ValidationType};
pub use session::{FieldValidationState, FormSession, FormStateSnapshot};
pub use store::{
    FieldValidationRequest, HttpRuleStore, PathCheckResponse, ResolveDependenciesRequest,
    ResolveDependenciesResponse, RuleStore, StubRuleStore,
};
pub use template::interpolate;
pub use validator::{FieldValidator, ValidationOutcome};

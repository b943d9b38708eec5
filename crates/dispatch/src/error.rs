//! Error types for tag allocation, schema definition, registration and calls.
//!
//! Each public operation returns its own error enum so callers can match on
//! exactly the failures that operation can produce. Names (operators, tags)
//! are rendered into the errors at the point of failure so a report stays
//! readable after the registries involved are gone.

use thiserror::Error;

use crate::tag::TypeTag;

/// Errors produced by [`crate::TypeTagRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
	/// Every id in `1..=capacity` has been handed out.
	///
	/// Ids are never recycled, so once this is returned every later
	/// allocation on the same registry fails as well.
	#[error("type tag id space exhausted (capacity {capacity})")]
	AllocatorExhausted { capacity: u16 },

	/// The tag is not in the active set (undefined, never allocated, or retired).
	#[error("type tag {tag} is not registered")]
	NotRegistered { tag: TypeTag },
}

/// Errors produced while defining an operator schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
	/// The parameter list is malformed.
	#[error("invalid schema for '{operator}': {reason}")]
	InvalidSchema { operator: String, reason: String },

	/// The schema disagrees with a shape it was checked against: a custom key
	/// derivation with a different parameter list, or an earlier definition
	/// of the same operator.
	#[error("schema mismatch for '{operator}': {reason}")]
	SchemaMismatch { operator: String, reason: String },
}

/// Errors produced by kernel registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
	/// A kernel is already bound to this dispatch key. The existing binding is kept.
	#[error("duplicate registration for '{operator}' with signature ({})", .signature.join(", "))]
	DuplicateRegistration { operator: String, signature: Vec<String> },

	/// The registration's shape disagrees with the operator schema.
	#[error("schema mismatch for '{operator}': {reason}")]
	SchemaMismatch { operator: String, reason: String },

	/// The schema itself could not be defined.
	#[error(transparent)]
	Schema(#[from] SchemaError),

	/// The signature references a tag that is not active.
	#[error("signature for '{operator}' references inactive type tag {tag}")]
	InactiveTag { operator: String, tag: TypeTag },

	/// The kernel registry was frozen before this registration.
	#[error("kernel registry is frozen; cannot register '{operator}'")]
	RegistryFrozen { operator: String },

	/// A kernel module could not allocate the tags it registers under.
	#[error(transparent)]
	Tag(#[from] TagError),
}

/// Errors produced by [`crate::Dispatcher::call`].
#[derive(Debug, Error)]
pub enum CallError {
	/// No schema is defined under this operator name.
	#[error("unknown operator '{operator}'{}", .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
	UnknownOperator { operator: String, suggestion: Option<String> },

	/// Wrong number of arguments for the operator's schema.
	#[error("'{operator}' expects {expected} argument(s), got {actual}")]
	ArityMismatch { operator: String, expected: usize, actual: usize },

	/// An argument's kind disagrees with the schema, or a custom key derivation
	/// produced a malformed key.
	#[error("schema mismatch calling '{operator}': {reason}")]
	SchemaMismatch { operator: String, reason: String },

	/// No kernel is registered for the derived dispatch key.
	#[error(
		"no kernel for '{operator}' with signature ({}); registered: [{}]",
		.signature.join(", "),
		.registered.join("; ")
	)]
	NotFound { operator: String, signature: Vec<String>, registered: Vec<String> },

	/// The kernel ran and reported a failure.
	#[error("kernel for '{operator}' failed: {source}")]
	Kernel {
		operator: String,
		#[source]
		source: KernelError,
	},

	/// The kernel's outputs disagree with the schema's declared return kinds.
	#[error("'{operator}' returned {reason}")]
	ReturnMismatch { operator: String, reason: String },
}

impl CallError {
	/// Returns the operator name the failing call targeted.
	pub fn operator(&self) -> &str {
		match self {
			Self::UnknownOperator { operator, .. }
			| Self::ArityMismatch { operator, .. }
			| Self::SchemaMismatch { operator, .. }
			| Self::NotFound { operator, .. }
			| Self::Kernel { operator, .. }
			| Self::ReturnMismatch { operator, .. } => operator,
		}
	}
}

/// Failure reported by a kernel body.
#[derive(Debug, Error)]
pub enum KernelError {
	/// An argument had the right kind but an unusable value (shape, range, ...).
	#[error("invalid argument '{name}': {reason}")]
	InvalidArgument { name: String, reason: String },

	/// A tensor argument was not of the concrete type the kernel was written for.
	#[error("argument {position} is not a {expected}")]
	Downcast { position: usize, expected: &'static str },

	/// Any other failure.
	#[error("{0}")]
	Other(String),
}

impl KernelError {
	/// Builds an [`KernelError::InvalidArgument`].
	pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidArgument {
			name: name.into(),
			reason: reason.into(),
		}
	}
}

/// Errors produced while loading a [`crate::DispatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {}: {error}", .path.display())]
	Io {
		path: std::path::PathBuf,
		error: std::io::Error,
	},

	/// TOML syntax or type error.
	#[error("config parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// A value parsed but is out of range.
	#[error("invalid config: {0}")]
	Invalid(String),
}

//! Runtime multiple dispatch for tensor operators.
//!
//! A call names an operator and passes positional [`Value`]s. The
//! [`Dispatcher`] checks the arguments against the operator's
//! [`OperatorSchema`], folds the runtime [`TypeTag`]s of the
//! dispatch-relevant tensors into a [`DispatchKey`], and invokes the single
//! kernel registered for that key. There is no fallback and no implicit
//! conversion: a miss is an error that lists what is registered.
//!
//! # Modules
//!
//! - [`tag`] - Runtime type tag allocation and naming
//! - [`value`] - Call-site argument values and the tensor trait
//! - [`schema`] - Operator schemas and the schema table
//! - [`key`] - Dispatch keys
//! - [`kernel`] - Kernel handles and argument helpers
//! - [`registry`] - Kernel registry with snapshot publication
//! - [`dispatcher`] - Registration and call façade
//! - [`module`] - Link-time kernel modules ([`kernel_module!`])
//! - [`config`] - TOML configuration
//! - [`error`] - Per-operation error types
//!
//! # Lifecycle
//!
//! Tags and schemas are created at startup, kernels registered, then the
//! kernel registry is frozen. Calls may run from any thread at any time;
//! registration after the freeze fails with
//! [`RegisterError::RegistryFrozen`].

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod kernel;
pub mod key;
pub mod module;
pub mod registry;
pub mod schema;
pub mod tag;
pub mod value;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::{CallError, ConfigError, KernelError, RegisterError, SchemaError, TagError};
// Re-exported for `kernel_module!`.
pub use inventory;
pub use kernel::{Kernel, KernelHandle};
pub use key::{DispatchKey, Signature};
pub use module::KernelModule;
pub use registry::{InsertError, KernelRegistry, RegistryState};
pub use schema::{
	KeyDerivation, Operator, OperatorId, OperatorSchema, Parameter, SchemaBuilder, SchemaTable,
};
pub use tag::{ScopedTag, TypeTag, TypeTagRegistry};
pub use value::{ArgKind, DispatchTensor, Opaque, TensorRef, Value};

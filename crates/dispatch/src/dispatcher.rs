//! Dispatcher façade.
//!
//! The [`Dispatcher`] ties the registries together: kernel providers
//! register through it, call sites call through it. It never owns process
//! lifetime state; the tag registry (and optionally the schema table and
//! kernel registry) are constructed by the caller and shared with it, so
//! every test can build an isolated set.
//!
//! # Call path
//!
//! 1. Resolve the operator name to its schema.
//! 2. Check arity, then each argument's kind.
//! 3. Derive the dispatch key (default extraction or the schema's custom rule).
//! 4. Look the key up. A miss is reported; there is no fallback kernel.
//! 5. Invoke the kernel with the full original argument list.
//! 6. Check outputs against declared return kinds (if configured).

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::config::DispatchConfig;
use crate::error::{CallError, RegisterError, SchemaError};
use crate::kernel::KernelHandle;
use crate::key::DispatchKey;
use crate::module::KernelModule;
use crate::registry::{InsertError, KernelRegistry};
use crate::schema::{Operator, OperatorId, OperatorSchema, SchemaTable};
use crate::tag::{TypeTag, TypeTagRegistry};
use crate::value::Value;

/// Resolves operator calls to kernels.
#[derive(Debug)]
pub struct Dispatcher {
	tags: Arc<TypeTagRegistry>,
	schemas: Arc<SchemaTable>,
	kernels: Arc<KernelRegistry>,
	config: DispatchConfig,
	/// Names of kernel modules already installed.
	installed: Mutex<FxHashSet<&'static str>>,
}

impl Dispatcher {
	/// Creates a dispatcher with a fresh schema table and kernel registry.
	pub fn new(tags: Arc<TypeTagRegistry>, config: DispatchConfig) -> Self {
		Self::with_parts(
			tags,
			Arc::new(SchemaTable::new()),
			Arc::new(KernelRegistry::new()),
			config,
		)
	}

	/// Creates a dispatcher over caller-owned registries.
	pub fn with_parts(
		tags: Arc<TypeTagRegistry>,
		schemas: Arc<SchemaTable>,
		kernels: Arc<KernelRegistry>,
		config: DispatchConfig,
	) -> Self {
		Self {
			tags,
			schemas,
			kernels,
			config,
			installed: Mutex::new(FxHashSet::default()),
		}
	}

	pub fn tags(&self) -> &Arc<TypeTagRegistry> {
		&self.tags
	}

	pub fn schemas(&self) -> &Arc<SchemaTable> {
		&self.schemas
	}

	pub fn kernels(&self) -> &Arc<KernelRegistry> {
		&self.kernels
	}

	pub fn config(&self) -> &DispatchConfig {
		&self.config
	}

	/// Defines an operator without registering a kernel for it.
	pub fn define(&self, schema: OperatorSchema) -> Result<Operator, SchemaError> {
		self.schemas.define(schema)
	}

	/// Registers `kernel` for `schema` under the given tag signature.
	///
	/// The schema is defined on first use; registering against an existing
	/// operator requires an identical shape.
	pub fn register(
		&self,
		schema: &OperatorSchema,
		signature: &[TypeTag],
		kernel: KernelHandle,
	) -> Result<(), RegisterError> {
		let op = self.schemas.define(schema.clone())?;
		self.register_op(&op, signature, kernel)
	}

	/// Registers `kernel` for an already-defined operator.
	pub fn register_op(
		&self,
		op: &Operator,
		signature: &[TypeTag],
		kernel: KernelHandle,
	) -> Result<(), RegisterError> {
		let operator = op.name();
		let width = op.schema().key_width();
		if signature.len() != width {
			return Err(RegisterError::SchemaMismatch {
				operator: operator.to_string(),
				reason: format!(
					"signature has {} tag(s), operator dispatches on {width}",
					signature.len()
				),
			});
		}
		if let Some(&tag) = signature.iter().find(|t| !self.tags.is_active(**t)) {
			return Err(RegisterError::InactiveTag {
				operator: operator.to_string(),
				tag,
			});
		}

		let kernel_name = kernel.name().to_string();
		let key = DispatchKey::new(op.id(), signature.iter().copied());
		match self.kernels.register(key, kernel) {
			Ok(()) => {
				tracing::debug!(
					operator,
					kernel = %kernel_name,
					signature = %self.render_signature(signature).join(", "),
					"kernel registered"
				);
				Ok(())
			}
			Err(InsertError::Duplicate { existing }) => {
				tracing::debug!(
					operator,
					kernel = %kernel_name,
					existing = existing.name(),
					"duplicate kernel registration rejected"
				);
				Err(RegisterError::DuplicateRegistration {
					operator: operator.to_string(),
					signature: self.render_signature(signature),
				})
			}
			Err(InsertError::Frozen) => Err(RegisterError::RegistryFrozen {
				operator: operator.to_string(),
			}),
		}
	}

	/// Ends the registration phase.
	pub fn freeze(&self) {
		self.kernels.freeze();
	}

	/// Resolves an operator name.
	pub fn resolve(&self, name: &str) -> Result<Operator, CallError> {
		self.schemas.get(name).ok_or_else(|| CallError::UnknownOperator {
			operator: name.to_string(),
			suggestion: self
				.config
				.suggest_operators
				.then(|| self.schemas.suggest(name))
				.flatten(),
		})
	}

	/// Returns the kernel bound to `signature` for `name`, without calling it.
	pub fn lookup(&self, name: &str, signature: &[TypeTag]) -> Option<KernelHandle> {
		let op = self.schemas.get(name)?;
		self.kernels
			.lookup(&DispatchKey::new(op.id(), signature.iter().copied()))
	}

	/// Calls operator `name` with `args`.
	pub fn call(&self, name: &str, args: &[Value]) -> Result<Vec<Value>, CallError> {
		let op = self.resolve(name)?;
		self.call_op(&op, args)
	}

	/// Calls an operator by its id.
	pub fn call_id(&self, id: OperatorId, args: &[Value]) -> Result<Vec<Value>, CallError> {
		let op = self
			.schemas
			.get_id(id)
			.ok_or_else(|| CallError::UnknownOperator {
				operator: format!("#{}", id.as_u32()),
				suggestion: None,
			})?;
		self.call_op(&op, args)
	}

	/// Calls a resolved operator.
	pub fn call_op(&self, op: &Operator, args: &[Value]) -> Result<Vec<Value>, CallError> {
		if self.config.auto_freeze && !self.kernels.is_frozen() {
			self.kernels.freeze();
		}

		let schema = op.schema();
		schema.check_args(args)?;
		let key = schema.dispatch_key(op.id(), args)?;

		let Some(kernel) = self.kernels.lookup(&key) else {
			let err = CallError::NotFound {
				operator: op.name().to_string(),
				signature: self.render_signature(key.tags()),
				registered: self
					.kernels
					.signatures(op.id())
					.iter()
					.map(|sig| self.render_signature(sig).join(", "))
					.collect(),
			};
			tracing::warn!(%err, "dispatch miss");
			return Err(err);
		};

		tracing::trace!(operator = op.name(), kernel = kernel.name(), "dispatch");
		let outputs = kernel.call(args).map_err(|source| CallError::Kernel {
			operator: op.name().to_string(),
			source,
		})?;

		if self.config.check_returns {
			schema.check_returns(&outputs)?;
		}
		Ok(outputs)
	}

	/// Installs every [`KernelModule`] collected at link time, in name order.
	///
	/// Modules already installed on this dispatcher are skipped. Returns the
	/// number of modules installed by this call.
	pub fn install_modules(&self) -> Result<usize, RegisterError> {
		let mut modules: Vec<&'static KernelModule> = inventory::iter::<KernelModule>().collect();
		modules.sort_by_key(|m| m.name);

		let mut count = 0;
		for module in modules {
			if !self.installed.lock().insert(module.name) {
				continue;
			}
			if let Err(err) = (module.install)(self) {
				self.installed.lock().remove(module.name);
				return Err(err);
			}
			tracing::debug!(module = module.name, "kernel module installed");
			count += 1;
		}
		Ok(count)
	}

	fn render_signature(&self, tags: &[TypeTag]) -> Vec<String> {
		tags.iter().map(|t| self.tags.display(*t)).collect()
	}
}

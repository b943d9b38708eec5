//! Operator schemas.
//!
//! An [`OperatorSchema`] is the runtime description of one operator: its
//! ordered parameters, their kinds, which of them feed the dispatch key, and
//! optionally a custom key derivation. Schemas are validated once when they
//! are built; after that the same schema checks both kernel registrations
//! and calls.
//!
//! The [`SchemaTable`] assigns each distinct operator name a dense
//! [`OperatorId`] and publishes its contents as an immutable snapshot, so
//! name resolution on the call path never takes a lock.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{CallError, SchemaError};
use crate::key::{DispatchKey, Signature};
use crate::value::{ArgKind, Value};

/// Minimum similarity for an operator name suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Dense operator handle assigned by a [`SchemaTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperatorId(u32);

impl OperatorId {
	pub const fn from_raw(id: u32) -> Self {
		Self(id)
	}

	#[inline]
	pub const fn as_u32(self) -> u32 {
		self.0
	}
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
	pub name: String,
	pub kind: ArgKind,
	/// Whether this parameter's tag is part of the dispatch key.
	pub dispatch: bool,
}

impl Parameter {
	pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
		Self {
			name: name.into(),
			kind,
			dispatch: false,
		}
	}

	/// A tensor parameter that participates in dispatch.
	pub fn dispatch_tensor(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			kind: ArgKind::Tensor,
			dispatch: true,
		}
	}
}

/// Signature of a custom key-derivation function.
pub type DeriveFn = dyn Fn(&[Value]) -> Result<Signature, String> + Send + Sync;

/// Custom replacement for the default key extraction.
///
/// The derivation declares the parameter kinds it was written against and
/// the number of tags it produces. The kinds must equal the schema's
/// parameter kinds; the width fixes the signature length kernels register
/// with.
#[derive(Clone)]
pub struct KeyDerivation {
	params: Vec<ArgKind>,
	width: usize,
	derive: Arc<DeriveFn>,
}

impl KeyDerivation {
	pub fn new<F>(params: impl Into<Vec<ArgKind>>, width: usize, derive: F) -> Self
	where
		F: Fn(&[Value]) -> Result<Signature, String> + Send + Sync + 'static,
	{
		Self {
			params: params.into(),
			width,
			derive: Arc::new(derive),
		}
	}

	pub fn params(&self) -> &[ArgKind] {
		&self.params
	}

	pub fn width(&self) -> usize {
		self.width
	}

	fn derive(&self, args: &[Value]) -> Result<Signature, String> {
		(self.derive)(args)
	}
}

impl fmt::Debug for KeyDerivation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyDerivation")
			.field("params", &self.params)
			.field("width", &self.width)
			.finish_non_exhaustive()
	}
}

/// Validated description of an operator.
#[derive(Debug, Clone)]
pub struct OperatorSchema {
	name: Arc<str>,
	params: Vec<Parameter>,
	dispatch_positions: SmallVec<[usize; 4]>,
	returns: Option<Vec<ArgKind>>,
	derivation: Option<KeyDerivation>,
}

impl OperatorSchema {
	/// Validates a parameter list and builds a schema without a custom key
	/// derivation or declared returns.
	pub fn define(name: impl Into<Arc<str>>, params: Vec<Parameter>) -> Result<Self, SchemaError> {
		let name: Arc<str> = name.into();
		let invalid = |reason: String| SchemaError::InvalidSchema {
			operator: name.to_string(),
			reason,
		};

		if name.is_empty() {
			return Err(invalid("operator name is empty".into()));
		}
		if params.is_empty() {
			return Err(invalid("operator has no parameters".into()));
		}

		let mut seen = FxHashSet::default();
		for (pos, param) in params.iter().enumerate() {
			if param.name.is_empty() {
				return Err(invalid(format!("parameter {pos} has an empty name")));
			}
			if !seen.insert(param.name.as_str()) {
				return Err(invalid(format!("duplicate parameter name '{}'", param.name)));
			}
			if param.dispatch && param.kind != ArgKind::Tensor {
				return Err(invalid(format!(
					"dispatch-relevant parameter '{}' must be a tensor, not {}",
					param.name, param.kind
				)));
			}
		}

		let dispatch_positions = params
			.iter()
			.enumerate()
			.filter(|(_, p)| p.dispatch)
			.map(|(pos, _)| pos)
			.collect();

		Ok(Self {
			name,
			params,
			dispatch_positions,
			returns: None,
			derivation: None,
		})
	}

	/// Starts a builder for `name`.
	pub fn builder(name: impl Into<Arc<str>>) -> SchemaBuilder {
		SchemaBuilder::new(name)
	}

	/// Attaches a custom key derivation after checking it against the parameters.
	pub fn with_derivation(mut self, derivation: KeyDerivation) -> Result<Self, SchemaError> {
		if derivation.params() != self.param_kinds().as_slice() {
			return Err(SchemaError::SchemaMismatch {
				operator: self.name.to_string(),
				reason: format!(
					"key derivation expects ({}) but the operator declares ({})",
					render_kinds(derivation.params()),
					render_kinds(&self.param_kinds())
				),
			});
		}
		self.derivation = Some(derivation);
		Ok(self)
	}

	/// Declares the kinds a kernel must return.
	pub fn with_returns(mut self, returns: impl Into<Vec<ArgKind>>) -> Self {
		self.returns = Some(returns.into());
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn params(&self) -> &[Parameter] {
		&self.params
	}

	pub fn arity(&self) -> usize {
		self.params.len()
	}

	/// Positions of dispatch-relevant parameters in declaration order.
	pub fn dispatch_positions(&self) -> &[usize] {
		&self.dispatch_positions
	}

	pub fn returns(&self) -> Option<&[ArgKind]> {
		self.returns.as_deref()
	}

	pub fn derivation(&self) -> Option<&KeyDerivation> {
		self.derivation.as_ref()
	}

	/// Number of tags in every dispatch key of this operator.
	pub fn key_width(&self) -> usize {
		match &self.derivation {
			Some(d) => d.width(),
			None => self.dispatch_positions.len(),
		}
	}

	fn param_kinds(&self) -> Vec<ArgKind> {
		self.params.iter().map(|p| p.kind).collect()
	}

	/// Returns true if both schemas describe the same operator shape.
	///
	/// Derivation closures cannot be compared, so two derivations match when
	/// their declared parameters and widths do.
	pub fn same_shape(&self, other: &OperatorSchema) -> bool {
		let derivation_eq = match (&self.derivation, &other.derivation) {
			(None, None) => true,
			(Some(a), Some(b)) => a.params == b.params && a.width == b.width,
			_ => false,
		};
		self.name == other.name
			&& self.params == other.params
			&& self.returns == other.returns
			&& derivation_eq
	}

	/// Checks arity and per-position kinds of a call.
	pub fn check_args(&self, args: &[Value]) -> Result<(), CallError> {
		if args.len() != self.params.len() {
			return Err(CallError::ArityMismatch {
				operator: self.name.to_string(),
				expected: self.params.len(),
				actual: args.len(),
			});
		}
		for (param, arg) in self.params.iter().zip(args) {
			if arg.kind() != param.kind {
				return Err(CallError::SchemaMismatch {
					operator: self.name.to_string(),
					reason: format!(
						"parameter '{}' expects {}, got {}",
						param.name,
						param.kind,
						arg.kind()
					),
				});
			}
		}
		Ok(())
	}

	/// Derives the dispatch key for an already-checked argument list.
	pub fn dispatch_key(&self, id: OperatorId, args: &[Value]) -> Result<DispatchKey, CallError> {
		let Some(derivation) = &self.derivation else {
			return DispatchKey::extract(id, &self.dispatch_positions, args).map_err(|pos| {
				CallError::SchemaMismatch {
					operator: self.name.to_string(),
					reason: format!("argument {pos} is not a tensor"),
				}
			});
		};

		let tags = derivation
			.derive(args)
			.map_err(|reason| CallError::SchemaMismatch {
				operator: self.name.to_string(),
				reason: format!("key derivation failed: {reason}"),
			})?;
		if tags.len() != derivation.width() {
			return Err(CallError::SchemaMismatch {
				operator: self.name.to_string(),
				reason: format!(
					"key derivation produced {} tag(s), expected {}",
					tags.len(),
					derivation.width()
				),
			});
		}
		Ok(DispatchKey::from_signature(id, tags))
	}

	/// Checks kernel outputs against the declared return kinds, if any.
	pub fn check_returns(&self, outputs: &[Value]) -> Result<(), CallError> {
		let Some(returns) = &self.returns else {
			return Ok(());
		};
		let actual: Vec<ArgKind> = outputs.iter().map(Value::kind).collect();
		if actual != *returns {
			return Err(CallError::ReturnMismatch {
				operator: self.name.to_string(),
				reason: format!(
					"({}), schema declares ({})",
					render_kinds(&actual),
					render_kinds(returns)
				),
			});
		}
		Ok(())
	}
}

fn render_kinds(kinds: &[ArgKind]) -> String {
	kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
}

/// Fluent construction of an [`OperatorSchema`].
#[derive(Debug)]
pub struct SchemaBuilder {
	name: Arc<str>,
	params: Vec<Parameter>,
	returns: Option<Vec<ArgKind>>,
	derivation: Option<KeyDerivation>,
}

impl SchemaBuilder {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self {
			name: name.into(),
			params: Vec::new(),
			returns: None,
			derivation: None,
		}
	}

	pub fn param(mut self, param: Parameter) -> Self {
		self.params.push(param);
		self
	}

	pub fn dispatch_tensor(self, name: impl Into<String>) -> Self {
		self.param(Parameter::dispatch_tensor(name))
	}

	pub fn tensor(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Tensor))
	}

	pub fn tensor_list(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::TensorList))
	}

	pub fn int(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Int))
	}

	pub fn float(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Float))
	}

	pub fn bool(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Bool))
	}

	pub fn str(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Str))
	}

	pub fn ints(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Ints))
	}

	pub fn opaque(self, name: impl Into<String>) -> Self {
		self.param(Parameter::new(name, ArgKind::Opaque))
	}

	pub fn returns(mut self, kinds: impl Into<Vec<ArgKind>>) -> Self {
		self.returns = Some(kinds.into());
		self
	}

	pub fn derive_key(mut self, derivation: KeyDerivation) -> Self {
		self.derivation = Some(derivation);
		self
	}

	pub fn build(self) -> Result<OperatorSchema, SchemaError> {
		let mut schema = OperatorSchema::define(self.name, self.params)?;
		schema.returns = self.returns;
		match self.derivation {
			Some(d) => schema.with_derivation(d),
			None => Ok(schema),
		}
	}
}

/// A schema bound to its table-assigned id.
#[derive(Debug, Clone)]
pub struct Operator {
	id: OperatorId,
	schema: Arc<OperatorSchema>,
}

impl Operator {
	pub fn id(&self) -> OperatorId {
		self.id
	}

	pub fn schema(&self) -> &OperatorSchema {
		&self.schema
	}

	pub fn name(&self) -> &str {
		self.schema.name()
	}
}

/// Immutable view of a [`SchemaTable`].
#[derive(Debug, Default, Clone)]
pub struct SchemaSnapshot {
	by_name: FxHashMap<Arc<str>, OperatorId>,
	entries: Vec<Operator>,
}

impl SchemaSnapshot {
	pub fn get(&self, name: &str) -> Option<&Operator> {
		let id = self.by_name.get(name)?;
		self.get_id(*id)
	}

	pub fn get_id(&self, id: OperatorId) -> Option<&Operator> {
		self.entries.get(id.as_u32() as usize)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Table of defined operators.
#[derive(Debug, Default)]
pub struct SchemaTable {
	snap: ArcSwap<SchemaSnapshot>,
	write: Mutex<()>,
}

impl SchemaTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Defines an operator, or returns the existing definition if an
	/// identical shape was defined before under the same name.
	pub fn define(&self, schema: OperatorSchema) -> Result<Operator, SchemaError> {
		let _guard = self.write.lock();
		let current = self.snap.load_full();

		if let Some(existing) = current.get(schema.name()) {
			if existing.schema().same_shape(&schema) {
				return Ok(existing.clone());
			}
			return Err(SchemaError::SchemaMismatch {
				operator: schema.name().to_string(),
				reason: "operator is already defined with a different shape".into(),
			});
		}

		let Ok(raw) = u32::try_from(current.entries.len()) else {
			return Err(SchemaError::InvalidSchema {
				operator: schema.name().to_string(),
				reason: "operator id space exhausted".into(),
			});
		};
		let op = Operator {
			id: OperatorId(raw),
			schema: Arc::new(schema),
		};

		let mut next = SchemaSnapshot::clone(&current);
		next.by_name.insert(op.schema.name.clone(), op.id);
		next.entries.push(op.clone());
		self.snap.store(Arc::new(next));

		tracing::debug!(
			operator = op.name(),
			id = op.id.as_u32(),
			arity = op.schema.arity(),
			key_width = op.schema.key_width(),
			"operator defined"
		);
		Ok(op)
	}

	pub fn get(&self, name: &str) -> Option<Operator> {
		self.snap.load().get(name).cloned()
	}

	pub fn get_id(&self, id: OperatorId) -> Option<Operator> {
		self.snap.load().get_id(id).cloned()
	}

	/// Returns the current snapshot.
	pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
		self.snap.load_full()
	}

	/// Returns all operator names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self
			.snap
			.load()
			.entries
			.iter()
			.map(|op| op.name().to_string())
			.collect();
		names.sort_unstable();
		names
	}

	/// Returns the defined name closest to `name`, if any is close enough.
	pub fn suggest(&self, name: &str) -> Option<String> {
		let snap = self.snap.load();
		snap.entries
			.iter()
			.map(|op| (strsim::jaro_winkler(name, op.name()), op.name()))
			.filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
			.max_by(|a, b| a.0.total_cmp(&b.0))
			.map(|(_, n)| n.to_string())
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests;

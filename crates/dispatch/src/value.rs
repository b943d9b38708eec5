//! Call-site argument values.
//!
//! Arguments cross the dispatch boundary as [`Value`]s, a closed set of
//! variants mirrored by [`ArgKind`]. Schemas declare a kind per parameter and
//! the dispatcher checks every argument against it before a kernel runs, so
//! kernels can extract their inputs without guessing at types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::tag::TypeTag;

/// Kind of a parameter or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
	/// A single tensor; the only kind that can be dispatch-relevant.
	Tensor,
	/// A list of tensors.
	TensorList,
	/// Signed integer.
	Int,
	/// Floating point scalar.
	Float,
	/// Boolean flag.
	Bool,
	/// String.
	Str,
	/// Integer list (shapes, axes).
	Ints,
	/// Execution context or any other host object passed through untouched.
	Opaque,
}

impl ArgKind {
	/// Returns the lowercase name used in diagnostics.
	pub fn name(self) -> &'static str {
		match self {
			Self::Tensor => "tensor",
			Self::TensorList => "tensor[]",
			Self::Int => "int",
			Self::Float => "float",
			Self::Bool => "bool",
			Self::Str => "str",
			Self::Ints => "int[]",
			Self::Opaque => "opaque",
		}
	}
}

impl fmt::Display for ArgKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// A tensor-like object the dispatcher can route on.
///
/// The engine only ever asks for the runtime tag; everything else about the
/// tensor is between the backend that produced it and the kernels that
/// consume it.
pub trait DispatchTensor: Any + fmt::Debug + Send + Sync {
	/// Returns the runtime type tag of this tensor.
	fn type_tag(&self) -> TypeTag;
}

/// Shared handle to a dispatchable tensor.
pub type TensorRef = Arc<dyn DispatchTensor>;

/// Type-erased host object, typically an execution context.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
	pub fn new<T: Any + Send + Sync>(value: T) -> Self {
		Self(Arc::new(value))
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.0.downcast_ref::<T>()
	}
}

impl fmt::Debug for Opaque {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Opaque(..)")
	}
}

/// A single call argument or kernel output.
#[derive(Debug, Clone)]
pub enum Value {
	Tensor(TensorRef),
	TensorList(Arc<[TensorRef]>),
	Int(i64),
	Float(f64),
	Bool(bool),
	Str(Arc<str>),
	Ints(Arc<[i64]>),
	Opaque(Opaque),
}

impl Value {
	/// Wraps a concrete tensor.
	pub fn tensor<T: DispatchTensor>(tensor: T) -> Self {
		Self::Tensor(Arc::new(tensor))
	}

	/// Wraps a host object.
	pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
		Self::Opaque(Opaque::new(value))
	}

	/// Returns the kind of this value.
	pub fn kind(&self) -> ArgKind {
		match self {
			Self::Tensor(_) => ArgKind::Tensor,
			Self::TensorList(_) => ArgKind::TensorList,
			Self::Int(_) => ArgKind::Int,
			Self::Float(_) => ArgKind::Float,
			Self::Bool(_) => ArgKind::Bool,
			Self::Str(_) => ArgKind::Str,
			Self::Ints(_) => ArgKind::Ints,
			Self::Opaque(_) => ArgKind::Opaque,
		}
	}

	/// Returns the runtime tag if this is a tensor.
	pub fn type_tag(&self) -> Option<TypeTag> {
		self.as_tensor().map(|t| t.type_tag())
	}

	pub fn as_tensor(&self) -> Option<&TensorRef> {
		match self {
			Self::Tensor(t) => Some(t),
			_ => None,
		}
	}

	pub fn as_tensor_list(&self) -> Option<&[TensorRef]> {
		match self {
			Self::TensorList(ts) => Some(ts),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_ints(&self) -> Option<&[i64]> {
		match self {
			Self::Ints(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_opaque(&self) -> Option<&Opaque> {
		match self {
			Self::Opaque(v) => Some(v),
			_ => None,
		}
	}

	/// Downcasts a tensor value to its concrete backend type.
	pub fn downcast_tensor<T: DispatchTensor>(&self) -> Option<&T> {
		let tensor: &dyn DispatchTensor = &**self.as_tensor()?;
		let any: &dyn Any = tensor;
		any.downcast_ref::<T>()
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Str(v.into())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Str(v.into())
	}
}

impl From<Vec<i64>> for Value {
	fn from(v: Vec<i64>) -> Self {
		Value::Ints(v.into())
	}
}

impl From<TensorRef> for Value {
	fn from(v: TensorRef) -> Self {
		Value::Tensor(v)
	}
}

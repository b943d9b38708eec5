//! Kernel handles and argument extraction helpers.
//!
//! A kernel receives the full, already-validated argument list of a call and
//! returns its outputs. The helpers in this module turn positional [`Value`]s
//! into concrete Rust types and report a [`KernelError`] instead of
//! panicking when a value is not what the kernel expects.

use std::fmt;
use std::sync::Arc;

use crate::error::KernelError;
use crate::value::{DispatchTensor, Opaque, Value};

/// Callable kernel body.
pub trait Kernel: Send + Sync + 'static {
	fn call(&self, args: &[Value]) -> Result<Vec<Value>, KernelError>;
}

impl<F> Kernel for F
where
	F: Fn(&[Value]) -> Result<Vec<Value>, KernelError> + Send + Sync + 'static,
{
	fn call(&self, args: &[Value]) -> Result<Vec<Value>, KernelError> {
		self(args)
	}
}

/// Named, shareable kernel.
#[derive(Clone)]
pub struct KernelHandle {
	name: Arc<str>,
	kernel: Arc<dyn Kernel>,
}

impl KernelHandle {
	pub fn new(name: impl Into<Arc<str>>, kernel: impl Kernel) -> Self {
		Self {
			name: name.into(),
			kernel: Arc::new(kernel),
		}
	}

	/// Builds a handle from a closure, pinning its signature for inference.
	pub fn from_fn<F>(name: impl Into<Arc<str>>, f: F) -> Self
	where
		F: Fn(&[Value]) -> Result<Vec<Value>, KernelError> + Send + Sync + 'static,
	{
		Self::new(name, f)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	#[inline]
	pub fn call(&self, args: &[Value]) -> Result<Vec<Value>, KernelError> {
		self.kernel.call(args)
	}

	/// Returns true if both handles share the same kernel body.
	pub fn ptr_eq(&self, other: &KernelHandle) -> bool {
		Arc::ptr_eq(&self.kernel, &other.kernel)
	}
}

impl fmt::Debug for KernelHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("KernelHandle").field(&self.name).finish()
	}
}

fn arg(args: &[Value], position: usize) -> Result<&Value, KernelError> {
	args.get(position)
		.ok_or_else(|| KernelError::Other(format!("missing argument {position}")))
}

/// Extracts the concrete tensor at `position`.
pub fn tensor_arg<T: DispatchTensor>(args: &[Value], position: usize) -> Result<&T, KernelError> {
	arg(args, position)?
		.downcast_tensor::<T>()
		.ok_or(KernelError::Downcast {
			position,
			expected: std::any::type_name::<T>(),
		})
}

pub fn int_arg(args: &[Value], position: usize) -> Result<i64, KernelError> {
	arg(args, position)?.as_int().ok_or(KernelError::Downcast {
		position,
		expected: "int",
	})
}

pub fn float_arg(args: &[Value], position: usize) -> Result<f64, KernelError> {
	arg(args, position)?.as_float().ok_or(KernelError::Downcast {
		position,
		expected: "float",
	})
}

pub fn str_arg(args: &[Value], position: usize) -> Result<&str, KernelError> {
	arg(args, position)?.as_str().ok_or(KernelError::Downcast {
		position,
		expected: "str",
	})
}

pub fn ints_arg(args: &[Value], position: usize) -> Result<&[i64], KernelError> {
	arg(args, position)?.as_ints().ok_or(KernelError::Downcast {
		position,
		expected: "int[]",
	})
}

/// Extracts a host object of type `T` at `position`.
pub fn opaque_arg<T: std::any::Any>(args: &[Value], position: usize) -> Result<&T, KernelError> {
	arg(args, position)?
		.as_opaque()
		.and_then(Opaque::downcast_ref::<T>)
		.ok_or(KernelError::Downcast {
			position,
			expected: std::any::type_name::<T>(),
		})
}

//! Host execution context.

use std::sync::atomic::{AtomicU64, Ordering};

use tessera_dispatch::Value;

/// Execution context passed to CPU kernels as an opaque argument.
///
/// Kernels that take a context record each launch on it.
#[derive(Debug, Default)]
pub struct CpuContext {
	launches: AtomicU64,
}

impl CpuContext {
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps a fresh context as a call argument.
	pub fn value() -> Value {
		Value::opaque(Self::new())
	}

	pub fn record_launch(&self) {
		self.launches.fetch_add(1, Ordering::Relaxed);
	}

	pub fn launches(&self) -> u64 {
		self.launches.load(Ordering::Relaxed)
	}

	/// Returns the context inside an opaque argument, if it is one.
	pub fn from_value(value: &Value) -> Option<&Self> {
		value.as_opaque()?.downcast_ref::<Self>()
	}
}

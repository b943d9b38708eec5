//! Common utilities for kernel integration tests.

use std::sync::Arc;

use tessera_dispatch::{DispatchConfig, Dispatcher, TypeTagRegistry, Value};
use tessera_ops::{DenseTensor, ElementTags};

/// A dispatcher with this crate's kernels installed directly.
pub struct Cpu {
	pub dispatcher: Dispatcher,
	pub tags: ElementTags,
}

pub fn cpu() -> Cpu {
	cpu_with(DispatchConfig::default())
}

pub fn cpu_with(config: DispatchConfig) -> Cpu {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let registry = Arc::new(config.tag_registry());
	let dispatcher = Dispatcher::new(registry, config);
	tessera_ops::install(&dispatcher).expect("install cpu kernels");
	let tags = ElementTags::ensure(dispatcher.tags()).expect("element tags");
	Cpu { dispatcher, tags }
}

/// A fresh dispatcher with nothing installed.
pub fn empty() -> Dispatcher {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	Dispatcher::new(Arc::new(TypeTagRegistry::default()), DispatchConfig::default())
}

impl Cpu {
	pub fn f32(&self, shape: &[usize], data: &[f32]) -> Value {
		self.tags
			.tensor_f32(shape, data.to_vec())
			.expect("valid f32 tensor")
			.into_value()
	}

	pub fn i64(&self, shape: &[usize], data: &[i64]) -> Value {
		self.tags
			.tensor_i64(shape, data.to_vec())
			.expect("valid i64 tensor")
			.into_value()
	}
}

/// Unwraps a single dense tensor output.
pub fn output(mut outputs: Vec<Value>) -> DenseTensor {
	assert_eq!(outputs.len(), 1, "expected exactly one output");
	outputs
		.pop()
		.and_then(|v| v.downcast_tensor::<DenseTensor>().cloned())
		.expect("output is a dense tensor")
}

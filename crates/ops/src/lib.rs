//! Reference CPU kernels for `tessera-dispatch`.
//!
//! Provides a dense host tensor, the `cpu.f32` / `cpu.i64` element tags and
//! kernels for a small operator set:
//!
//! | Operator | Signatures |
//! |----------|------------|
//! | `add`, `mul` | `(cpu.f32, cpu.f32)`, `(cpu.i64, cpu.i64)` |
//! | `relu` | `(cpu.f32)`, `(cpu.i64)` |
//! | `sigmoid` | `(cpu.f32)` |
//! | `flatten`, `stop_gradient` | `(cpu.f32)`, `(cpu.i64)` |
//! | `sparse_lengths_sum` | `(cpu.f32, cpu.i64, cpu.i64)` |
//! | `constant_fill` | keyed on the `dtype` argument |
//!
//! The kernels are submitted as a [`KernelModule`](tessera_dispatch::KernelModule)
//! and join a dispatcher through
//! [`Dispatcher::install_modules`](tessera_dispatch::Dispatcher::install_modules),
//! or directly through [`install`].

pub mod context;
mod kernels;
pub mod schemas;
pub mod tags;
pub mod tensor;

pub use context::CpuContext;
pub use tags::{CPU_F32, CPU_I64, ElementTags};
pub use tensor::{DType, DenseTensor, Storage, element_count};
use tessera_dispatch::{Dispatcher, RegisterError};

tessera_dispatch::kernel_module!(cpu_kernels, install);

/// Registers the element tags, schemas and kernels of this crate on `dispatcher`.
pub fn install(dispatcher: &Dispatcher) -> Result<(), RegisterError> {
	let tags = ElementTags::ensure(dispatcher.tags())?;
	kernels::register_all(dispatcher, tags)?;
	tracing::debug!(
		f32 = %dispatcher.tags().display(tags.f32()),
		i64 = %dispatcher.tags().display(tags.i64()),
		"cpu kernels installed"
	);
	Ok(())
}

//! CPU kernels and their registrations.

mod elementwise;
mod fill;
mod shape;
mod sparse;

use tessera_dispatch::{Dispatcher, KernelError, RegisterError, Value, kernel};

use crate::context::CpuContext;
use crate::tags::ElementTags;
use crate::tensor::DenseTensor;

/// Registers every kernel in this crate under `tags`.
pub fn register_all(dispatcher: &Dispatcher, tags: ElementTags) -> Result<(), RegisterError> {
	elementwise::register(dispatcher, tags)?;
	shape::register(dispatcher, tags)?;
	sparse::register(dispatcher, tags)?;
	fill::register(dispatcher, tags)?;
	Ok(())
}

fn dense(args: &[Value], position: usize) -> Result<&DenseTensor, KernelError> {
	kernel::tensor_arg::<DenseTensor>(args, position)
}

fn f32_data(t: &DenseTensor, position: usize) -> Result<&[f32], KernelError> {
	t.as_f32().ok_or(KernelError::Downcast {
		position,
		expected: "f32 tensor",
	})
}

fn i64_data(t: &DenseTensor, position: usize) -> Result<&[i64], KernelError> {
	t.as_i64().ok_or(KernelError::Downcast {
		position,
		expected: "i64 tensor",
	})
}

/// Records a launch on the context argument at `position`.
fn launch(args: &[Value], position: usize) -> Result<(), KernelError> {
	kernel::opaque_arg::<CpuContext>(args, position)?.record_launch();
	Ok(())
}

fn single(t: DenseTensor) -> Result<Vec<Value>, KernelError> {
	Ok(vec![t.into_value()])
}

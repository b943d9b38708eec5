//! `flatten` and `stop_gradient`.

use tessera_dispatch::{Dispatcher, KernelError, KernelHandle, RegisterError, Value, kernel};

use super::{dense, launch, single};
use crate::schemas;
use crate::tags::ElementTags;

pub(super) fn register(d: &Dispatcher, tags: ElementTags) -> Result<(), RegisterError> {
	let flatten = schemas::flatten()?;
	let stop_gradient = schemas::stop_gradient()?;
	for tag in [tags.f32(), tags.i64()] {
		d.register(&flatten, &[tag], KernelHandle::from_fn("flatten_cpu", flatten_cpu))?;
		d.register(
			&stop_gradient,
			&[tag],
			KernelHandle::from_fn("stop_gradient_cpu", stop_gradient_cpu),
		)?;
	}
	Ok(())
}

/// Collapses `input` to 2-D: `[prod(shape[..axis]), prod(shape[axis..])]`.
fn flatten_cpu(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let input = dense(args, 0)?;
	let axis = kernel::int_arg(args, 1)?;
	let axis = usize::try_from(axis)
		.ok()
		.filter(|&a| a <= input.rank())
		.ok_or_else(|| {
			KernelError::invalid(
				"axis",
				format!("{axis} is out of range for a rank {} tensor", input.rank()),
			)
		})?;
	launch(args, 2)?;
	single(input.reshaped([input.size_to_dim(axis), input.size_from_dim(axis)])?)
}

/// Forwards the input tensor unchanged; the output shares its storage.
fn stop_gradient_cpu(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	dense(args, 0)?;
	Ok(args[..1].to_vec())
}

//! `constant_fill`.

use tessera_dispatch::{Dispatcher, KernelError, KernelHandle, RegisterError, TypeTag, Value, kernel};

use super::{launch, single};
use crate::schemas;
use crate::tags::ElementTags;
use crate::tensor::{DenseTensor, Storage, element_count, filled};

pub(super) fn register(d: &Dispatcher, tags: ElementTags) -> Result<(), RegisterError> {
	let schema = schemas::constant_fill(tags)?;

	let f32_tag = tags.f32();
	d.register(
		&schema,
		&[f32_tag],
		KernelHandle::from_fn("constant_fill_f32", move |args| fill_f32(f32_tag, args)),
	)?;

	let i64_tag = tags.i64();
	d.register(
		&schema,
		&[i64_tag],
		KernelHandle::from_fn("constant_fill_i64", move |args| fill_i64(i64_tag, args)),
	)
}

fn fill_args(args: &[Value]) -> Result<(Vec<usize>, f64), KernelError> {
	let shape = kernel::ints_arg(args, 0)?
		.iter()
		.map(|&d| {
			usize::try_from(d)
				.map_err(|_| KernelError::invalid("shape", format!("negative dimension {d}")))
		})
		.collect::<Result<Vec<_>, _>>()?;
	Ok((shape, kernel::float_arg(args, 2)?))
}

fn fill_f32(tag: TypeTag, args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let (shape, value) = fill_args(args)?;
	let numel = element_count(&shape)?;
	launch(args, 3)?;
	single(DenseTensor::new(tag, shape, Storage::F32(filled(value as f32, numel)?))?)
}

fn fill_i64(tag: TypeTag, args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let (shape, value) = fill_args(args)?;
	// `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
	if value.fract() != 0.0 || value < i64::MIN as f64 || value >= i64::MAX as f64 {
		return Err(KernelError::invalid(
			"value",
			format!("{value} is not representable as i64"),
		));
	}
	let numel = element_count(&shape)?;
	launch(args, 3)?;
	single(DenseTensor::new(tag, shape, Storage::I64(filled(value as i64, numel)?))?)
}

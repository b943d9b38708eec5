//! `add`, `mul`, `relu`, `sigmoid`.
//!
//! Binary kernels require both inputs to share a shape, except that a
//! one-element `input2` is broadcast over `input1`.

use tessera_dispatch::{Dispatcher, KernelError, KernelHandle, RegisterError, Value};

use super::{dense, f32_data, i64_data, launch, single};
use crate::schemas;
use crate::tags::ElementTags;
use crate::tensor::{DenseTensor, Storage};

pub(super) fn register(d: &Dispatcher, tags: ElementTags) -> Result<(), RegisterError> {
	let (f, i) = (tags.f32(), tags.i64());

	let add = schemas::add()?;
	d.register(&add, &[f, f], KernelHandle::from_fn("add_f32", add_f32))?;
	d.register(&add, &[i, i], KernelHandle::from_fn("add_i64", add_i64))?;

	let mul = schemas::mul()?;
	d.register(&mul, &[f, f], KernelHandle::from_fn("mul_f32", mul_f32))?;
	d.register(&mul, &[i, i], KernelHandle::from_fn("mul_i64", mul_i64))?;

	let relu = schemas::relu()?;
	d.register(&relu, &[f], KernelHandle::from_fn("relu_f32", relu_f32))?;
	d.register(&relu, &[i], KernelHandle::from_fn("relu_i64", relu_i64))?;

	d.register(
		&schemas::sigmoid()?,
		&[f],
		KernelHandle::from_fn("sigmoid_f32", sigmoid_f32),
	)
}

/// Applies `op` pairwise, broadcasting a single-element `b`.
fn zip_broadcast<T: Copy>(
	a: &DenseTensor,
	a_data: &[T],
	b: &DenseTensor,
	b_data: &[T],
	op: impl Fn(T, T) -> T,
) -> Result<Vec<T>, KernelError> {
	if b_data.len() == 1 {
		let rhs = b_data[0];
		return Ok(a_data.iter().map(|&x| op(x, rhs)).collect());
	}
	if a.shape() != b.shape() {
		return Err(KernelError::invalid(
			"input2",
			format!("shape {:?} does not match input1 shape {:?}", b.shape(), a.shape()),
		));
	}
	Ok(a_data.iter().zip(b_data).map(|(&x, &y)| op(x, y)).collect())
}

fn binary_f32(args: &[Value], op: impl Fn(f32, f32) -> f32) -> Result<Vec<Value>, KernelError> {
	let (a, b) = (dense(args, 0)?, dense(args, 1)?);
	let out = zip_broadcast(a, f32_data(a, 0)?, b, f32_data(b, 1)?, op)?;
	launch(args, 2)?;
	single(DenseTensor::new(a.tag(), a.shape(), Storage::F32(out))?)
}

fn binary_i64(args: &[Value], op: impl Fn(i64, i64) -> i64) -> Result<Vec<Value>, KernelError> {
	let (a, b) = (dense(args, 0)?, dense(args, 1)?);
	let out = zip_broadcast(a, i64_data(a, 0)?, b, i64_data(b, 1)?, op)?;
	launch(args, 2)?;
	single(DenseTensor::new(a.tag(), a.shape(), Storage::I64(out))?)
}

fn add_f32(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	binary_f32(args, |x, y| x + y)
}

fn add_i64(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	binary_i64(args, i64::wrapping_add)
}

fn mul_f32(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	binary_f32(args, |x, y| x * y)
}

fn mul_i64(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	binary_i64(args, i64::wrapping_mul)
}

fn relu_f32(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let x = dense(args, 0)?;
	let out = f32_data(x, 0)?.iter().map(|&v| v.max(0.0)).collect();
	single(DenseTensor::new(x.tag(), x.shape(), Storage::F32(out))?)
}

fn relu_i64(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let x = dense(args, 0)?;
	let out = i64_data(x, 0)?.iter().map(|&v| v.max(0)).collect();
	single(DenseTensor::new(x.tag(), x.shape(), Storage::I64(out))?)
}

fn sigmoid_f32(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let x = dense(args, 0)?;
	let out = f32_data(x, 0)?
		.iter()
		.map(|&v| 1.0 / (1.0 + (-v).exp()))
		.collect();
	single(DenseTensor::new(x.tag(), x.shape(), Storage::F32(out))?)
}

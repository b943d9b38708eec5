//! `sparse_lengths_sum`.
//!
//! Sums segments of rows of `data`. `indices` lists the rows to gather and
//! `lengths` splits them into consecutive segments; output row `m` is the
//! sum of the rows in segment `m`.

use tessera_dispatch::{Dispatcher, KernelError, KernelHandle, RegisterError, Value};

use super::{dense, f32_data, i64_data, single};
use crate::schemas;
use crate::tags::ElementTags;
use crate::tensor::{DenseTensor, Storage, element_count, filled};

pub(super) fn register(d: &Dispatcher, tags: ElementTags) -> Result<(), RegisterError> {
	d.register(
		&schemas::sparse_lengths_sum()?,
		&[tags.f32(), tags.i64(), tags.i64()],
		KernelHandle::from_fn("sparse_lengths_sum_f32_i64", sparse_lengths_sum_f32),
	)
}

fn sparse_lengths_sum_f32(args: &[Value]) -> Result<Vec<Value>, KernelError> {
	let data = dense(args, 0)?;
	let indices = dense(args, 1)?;
	let lengths = dense(args, 2)?;

	if data.rank() < 1 {
		return Err(KernelError::invalid("data", "must have at least one dimension"));
	}
	if indices.rank() != 1 {
		return Err(KernelError::invalid("indices", "must be a vector"));
	}
	if lengths.rank() != 1 {
		return Err(KernelError::invalid("lengths", "must be a vector"));
	}

	let rows = data.shape()[0];
	let width = data.size_from_dim(1);
	let values = f32_data(data, 0)?;
	let indices = i64_data(indices, 1)?;
	let lengths = i64_data(lengths, 2)?;

	let mut shape = data.shape().to_vec();
	shape[0] = lengths.len();
	let mut out = filled(0.0f32, element_count(&shape)?)?;
	let mut cursor = 0usize;
	for (segment, &len) in lengths.iter().enumerate() {
		let len = usize::try_from(len)
			.map_err(|_| KernelError::invalid("lengths", format!("negative length {len}")))?;
		let end = cursor + len;
		let Some(seg_indices) = indices.get(cursor..end) else {
			return Err(KernelError::invalid(
				"lengths",
				format!("segments cover {end} indices, only {} given", indices.len()),
			));
		};
		let acc = &mut out[segment * width..(segment + 1) * width];
		for &index in seg_indices {
			let row = usize::try_from(index)
				.ok()
				.filter(|&r| r < rows)
				.ok_or_else(|| {
					KernelError::invalid("indices", format!("index {index} out of range 0..{rows}"))
				})?;
			let src = &values[row * width..(row + 1) * width];
			for (a, &v) in acc.iter_mut().zip(src) {
				*a += v;
			}
		}
		cursor = end;
	}
	if cursor != indices.len() {
		return Err(KernelError::invalid(
			"lengths",
			format!("segments cover {cursor} indices, {} given", indices.len()),
		));
	}

	single(DenseTensor::new(data.tag(), shape, Storage::F32(out))?)
}

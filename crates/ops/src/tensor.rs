//! Dense host tensor.

use std::fmt;

use tessera_dispatch::{DispatchTensor, KernelError, TypeTag, Value};

/// Element type of a [`DenseTensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
	F32,
	I64,
}

impl DType {
	pub fn name(self) -> &'static str {
		match self {
			Self::F32 => "f32",
			Self::I64 => "i64",
		}
	}

	/// Parses a dtype name as accepted by `constant_fill`.
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"f32" | "float" => Some(Self::F32),
			"i64" | "int64" => Some(Self::I64),
			_ => None,
		}
	}
}

impl fmt::Display for DType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Flat, row-major element buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
	F32(Vec<f32>),
	I64(Vec<i64>),
}

impl Storage {
	pub fn dtype(&self) -> DType {
		match self {
			Self::F32(_) => DType::F32,
			Self::I64(_) => DType::I64,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			Self::F32(v) => v.len(),
			Self::I64(v) => v.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Returns the number of elements a tensor of `shape` holds.
///
/// Fails if the product of the nonzero dimensions does not fit in `usize`,
/// so every partial product of an accepted shape fits as well.
pub fn element_count(shape: &[usize]) -> Result<usize, KernelError> {
	let nonzero = shape
		.iter()
		.filter(|&&d| d != 0)
		.try_fold(1usize, |acc, &d| acc.checked_mul(d))
		.ok_or_else(|| KernelError::invalid("shape", format!("shape {shape:?} overflows the element count")))?;
	Ok(if shape.contains(&0) { 0 } else { nonzero })
}

/// Allocates `n` copies of `value`, reporting allocation failure as an error.
pub(crate) fn filled<T: Clone>(value: T, n: usize) -> Result<Vec<T>, KernelError> {
	let mut data = Vec::new();
	data.try_reserve_exact(n)
		.map_err(|_| KernelError::invalid("shape", format!("cannot allocate {n} element(s)")))?;
	data.resize(n, value);
	Ok(data)
}

/// Row-major tensor carrying its runtime type tag.
///
/// The tag is whatever the caller assigned; [`crate::ElementTags`] hands out
/// tags that agree with the storage dtype, and the kernels in this crate
/// propagate the input tag to their outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
	tag: TypeTag,
	shape: Vec<usize>,
	storage: Storage,
}

impl DenseTensor {
	/// Builds a tensor, checking that `storage` holds exactly `shape.product()` elements.
	pub fn new(tag: TypeTag, shape: impl Into<Vec<usize>>, storage: Storage) -> Result<Self, KernelError> {
		let shape = shape.into();
		let numel = element_count(&shape)?;
		if numel != storage.len() {
			return Err(KernelError::invalid(
				"storage",
				format!("shape {shape:?} needs {numel} element(s), got {}", storage.len()),
			));
		}
		Ok(Self { tag, shape, storage })
	}

	pub fn tag(&self) -> TypeTag {
		self.tag
	}

	pub fn shape(&self) -> &[usize] {
		&self.shape
	}

	pub fn rank(&self) -> usize {
		self.shape.len()
	}

	pub fn numel(&self) -> usize {
		self.storage.len()
	}

	pub fn dtype(&self) -> DType {
		self.storage.dtype()
	}

	pub fn storage(&self) -> &Storage {
		&self.storage
	}

	pub fn as_f32(&self) -> Option<&[f32]> {
		match &self.storage {
			Storage::F32(v) => Some(v),
			Storage::I64(_) => None,
		}
	}

	pub fn as_i64(&self) -> Option<&[i64]> {
		match &self.storage {
			Storage::I64(v) => Some(v),
			Storage::F32(_) => None,
		}
	}

	/// Product of the dimensions before `axis`.
	pub fn size_to_dim(&self, axis: usize) -> usize {
		self.shape[..axis.min(self.rank())].iter().product()
	}

	/// Product of the dimensions from `axis` on.
	pub fn size_from_dim(&self, axis: usize) -> usize {
		self.shape[axis.min(self.rank())..].iter().product()
	}

	/// Returns a tensor with the same tag and elements under a new shape.
	pub fn reshaped(&self, shape: impl Into<Vec<usize>>) -> Result<Self, KernelError> {
		Self::new(self.tag, shape, self.storage.clone())
	}

	pub fn into_value(self) -> Value {
		Value::tensor(self)
	}
}

impl DispatchTensor for DenseTensor {
	fn type_tag(&self) -> TypeTag {
		self.tag
	}
}

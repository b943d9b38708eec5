//! Element-type tags for host tensors.

use tessera_dispatch::{KernelError, TagError, TypeTag, TypeTagRegistry};

use crate::tensor::{DType, DenseTensor, Storage};

/// Registry name of the `f32` host tag.
pub const CPU_F32: &str = "cpu.f32";
/// Registry name of the `i64` host tag.
pub const CPU_I64: &str = "cpu.i64";

/// The pair of tags this crate registers its kernels under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementTags {
	f32: TypeTag,
	i64: TypeTag,
}

impl ElementTags {
	/// Looks up both tags in `registry`, creating whichever is missing.
	pub fn ensure(registry: &TypeTagRegistry) -> Result<Self, TagError> {
		Ok(Self {
			f32: registry.find_or_create(CPU_F32)?,
			i64: registry.find_or_create(CPU_I64)?,
		})
	}

	pub fn f32(&self) -> TypeTag {
		self.f32
	}

	pub fn i64(&self) -> TypeTag {
		self.i64
	}

	pub fn for_dtype(&self, dtype: DType) -> TypeTag {
		match dtype {
			DType::F32 => self.f32,
			DType::I64 => self.i64,
		}
	}

	/// Builds an `f32` tensor tagged [`CPU_F32`].
	pub fn tensor_f32(&self, shape: impl Into<Vec<usize>>, data: Vec<f32>) -> Result<DenseTensor, KernelError> {
		DenseTensor::new(self.f32, shape, Storage::F32(data))
	}

	/// Builds an `i64` tensor tagged [`CPU_I64`].
	pub fn tensor_i64(&self, shape: impl Into<Vec<usize>>, data: Vec<i64>) -> Result<DenseTensor, KernelError> {
		DenseTensor::new(self.i64, shape, Storage::I64(data))
	}
}

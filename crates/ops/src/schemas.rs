//! Operator schemas provided by this crate.
//!
//! Parameter names and order follow the host operator set: tensors first,
//! then scalar arguments, then the execution context. Outputs are returned
//! rather than passed in.

use tessera_dispatch::{ArgKind, KeyDerivation, OperatorSchema, SchemaError, Signature};

use crate::tags::ElementTags;
use crate::tensor::DType;

pub const ADD: &str = "add";
pub const MUL: &str = "mul";
pub const RELU: &str = "relu";
pub const SIGMOID: &str = "sigmoid";
pub const FLATTEN: &str = "flatten";
pub const STOP_GRADIENT: &str = "stop_gradient";
pub const SPARSE_LENGTHS_SUM: &str = "sparse_lengths_sum";
pub const CONSTANT_FILL: &str = "constant_fill";

fn binary(name: &str) -> Result<OperatorSchema, SchemaError> {
	OperatorSchema::builder(name)
		.dispatch_tensor("input1")
		.dispatch_tensor("input2")
		.opaque("context")
		.returns([ArgKind::Tensor])
		.build()
}

fn unary(name: &str) -> Result<OperatorSchema, SchemaError> {
	OperatorSchema::builder(name)
		.dispatch_tensor("input")
		.returns([ArgKind::Tensor])
		.build()
}

/// `add(input1, input2, context) -> output`
pub fn add() -> Result<OperatorSchema, SchemaError> {
	binary(ADD)
}

/// `mul(input1, input2, context) -> output`
pub fn mul() -> Result<OperatorSchema, SchemaError> {
	binary(MUL)
}

pub fn relu() -> Result<OperatorSchema, SchemaError> {
	unary(RELU)
}

pub fn sigmoid() -> Result<OperatorSchema, SchemaError> {
	unary(SIGMOID)
}

pub fn stop_gradient() -> Result<OperatorSchema, SchemaError> {
	unary(STOP_GRADIENT)
}

/// `flatten(input, axis, context) -> output`
pub fn flatten() -> Result<OperatorSchema, SchemaError> {
	OperatorSchema::builder(FLATTEN)
		.dispatch_tensor("input")
		.int("axis")
		.opaque("context")
		.returns([ArgKind::Tensor])
		.build()
}

/// `sparse_lengths_sum(data, indices, lengths) -> output`
///
/// All three tensors dispatch, so the key mixes element types.
pub fn sparse_lengths_sum() -> Result<OperatorSchema, SchemaError> {
	OperatorSchema::builder(SPARSE_LENGTHS_SUM)
		.dispatch_tensor("data")
		.dispatch_tensor("indices")
		.dispatch_tensor("lengths")
		.returns([ArgKind::Tensor])
		.build()
}

/// `constant_fill(shape, dtype, value, context) -> output`
///
/// No tensor argument exists to dispatch on; the key is the element tag
/// named by `dtype`.
pub fn constant_fill(tags: ElementTags) -> Result<OperatorSchema, SchemaError> {
	let derivation = KeyDerivation::new(
		[ArgKind::Ints, ArgKind::Str, ArgKind::Float, ArgKind::Opaque],
		1,
		move |args| {
			let name = args
				.get(1)
				.and_then(|v| v.as_str())
				.ok_or("dtype argument missing")?;
			let dtype = DType::parse(name).ok_or_else(|| format!("unsupported dtype '{name}'"))?;
			Ok(Signature::from_slice(&[tags.for_dtype(dtype)]))
		},
	);
	OperatorSchema::builder(CONSTANT_FILL)
		.ints("shape")
		.str("dtype")
		.float("value")
		.opaque("context")
		.derive_key(derivation)
		.returns([ArgKind::Tensor])
		.build()
}

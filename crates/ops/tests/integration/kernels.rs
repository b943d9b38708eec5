//! Kernel results through the dispatcher.

use pretty_assertions::assert_eq;
use tessera_dispatch::{CallError, KernelError, Value};
use tessera_ops::CpuContext;
use tessera_ops::schemas::*;

use crate::common::{cpu, output};

#[test]
fn test_add_f32_and_i64_pick_their_kernels() {
	let cpu = cpu();
	let ctx = CpuContext::value();

	let out = output(
		cpu.dispatcher
			.call(
				ADD,
				&[
					cpu.f32(&[2, 2], &[1.0, 2.0, 3.0, 4.0]),
					cpu.f32(&[2, 2], &[10.0, 20.0, 30.0, 40.0]),
					ctx.clone(),
				],
			)
			.unwrap(),
	);
	assert_eq!(out.tag(), cpu.tags.f32());
	assert_eq!(out.shape(), &[2, 2]);
	assert_eq!(out.as_f32().unwrap(), &[11.0, 22.0, 33.0, 44.0]);

	let out = output(
		cpu.dispatcher
			.call(ADD, &[cpu.i64(&[3], &[1, 2, 3]), cpu.i64(&[3], &[4, 5, 6]), ctx.clone()])
			.unwrap(),
	);
	assert_eq!(out.tag(), cpu.tags.i64());
	assert_eq!(out.as_i64().unwrap(), &[5, 7, 9]);

	assert_eq!(CpuContext::from_value(&ctx).unwrap().launches(), 2);
}

#[test]
fn test_mul_broadcasts_scalar_rhs() {
	let cpu = cpu();
	let out = output(
		cpu.dispatcher
			.call(
				MUL,
				&[cpu.f32(&[3], &[1.0, 2.0, 3.0]), cpu.f32(&[1], &[2.0]), CpuContext::value()],
			)
			.unwrap(),
	);
	assert_eq!(out.as_f32().unwrap(), &[2.0, 4.0, 6.0]);

	let err = cpu
		.dispatcher
		.call(
			MUL,
			&[cpu.f32(&[3], &[1.0, 2.0, 3.0]), cpu.f32(&[2], &[1.0, 2.0]), CpuContext::value()],
		)
		.unwrap_err();
	assert!(matches!(
		err,
		CallError::Kernel {
			source: KernelError::InvalidArgument { .. },
			..
		}
	));
}

/// Mixed element types have no kernel; nothing converts implicitly.
#[test]
fn test_mixed_add_is_not_found() {
	let cpu = cpu();
	let err = cpu
		.dispatcher
		.call(ADD, &[cpu.f32(&[1], &[1.0]), cpu.i64(&[1], &[1]), CpuContext::value()])
		.unwrap_err();
	match err {
		CallError::NotFound {
			signature,
			registered,
			..
		} => {
			assert_eq!(signature, vec!["cpu.f32#1".to_string(), "cpu.i64#2".to_string()]);
			assert_eq!(
				registered,
				vec!["cpu.f32#1, cpu.f32#1".to_string(), "cpu.i64#2, cpu.i64#2".to_string()]
			);
		}
		other => panic!("expected NotFound, got {other:?}"),
	}
}

#[test]
fn test_relu_and_sigmoid() {
	let cpu = cpu();
	let out = output(
		cpu.dispatcher
			.call(RELU, &[cpu.f32(&[4], &[-1.0, 0.0, 0.5, 2.0])])
			.unwrap(),
	);
	assert_eq!(out.as_f32().unwrap(), &[0.0, 0.0, 0.5, 2.0]);

	let out = output(cpu.dispatcher.call(RELU, &[cpu.i64(&[2], &[-3, 3])]).unwrap());
	assert_eq!(out.as_i64().unwrap(), &[0, 3]);

	let out = output(cpu.dispatcher.call(SIGMOID, &[cpu.f32(&[1], &[0.0])]).unwrap());
	assert_eq!(out.as_f32().unwrap(), &[0.5]);

	// sigmoid has no integer kernel.
	assert!(matches!(
		cpu.dispatcher.call(SIGMOID, &[cpu.i64(&[1], &[0])]),
		Err(CallError::NotFound { .. })
	));
}

#[test]
fn test_flatten_collapses_around_axis() {
	let cpu = cpu();
	let input = cpu.f32(&[2, 3, 4], &[0.0; 24]);

	let out = output(
		cpu.dispatcher
			.call(FLATTEN, &[input.clone(), Value::Int(1), CpuContext::value()])
			.unwrap(),
	);
	assert_eq!(out.shape(), &[2, 12]);

	let out = output(
		cpu.dispatcher
			.call(FLATTEN, &[input.clone(), Value::Int(0), CpuContext::value()])
			.unwrap(),
	);
	assert_eq!(out.shape(), &[1, 24]);

	let err = cpu
		.dispatcher
		.call(FLATTEN, &[input, Value::Int(4), CpuContext::value()])
		.unwrap_err();
	assert!(matches!(err, CallError::Kernel { .. }));
}

#[test]
fn test_stop_gradient_forwards_input() {
	let cpu = cpu();
	let input = cpu.i64(&[2], &[7, 8]);
	let outputs = cpu.dispatcher.call(STOP_GRADIENT, &[input.clone()]).unwrap();
	let (Value::Tensor(a), Value::Tensor(b)) = (&input, &outputs[0]) else {
		panic!("expected tensors");
	};
	assert!(std::sync::Arc::ptr_eq(a, b));
}

#[test]
fn test_sparse_lengths_sum_dispatches_on_mixed_tags() {
	let cpu = cpu();
	let data = cpu.f32(&[3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
	let indices = cpu.i64(&[4], &[0, 2, 1, 1]);
	let lengths = cpu.i64(&[2], &[2, 2]);

	let out = output(
		cpu.dispatcher
			.call(SPARSE_LENGTHS_SUM, &[data.clone(), indices, lengths])
			.unwrap(),
	);
	assert_eq!(out.shape(), &[2, 2]);
	assert_eq!(out.as_f32().unwrap(), &[6.0, 8.0, 6.0, 8.0]);

	let err = cpu
		.dispatcher
		.call(
			SPARSE_LENGTHS_SUM,
			&[data.clone(), cpu.i64(&[1], &[3]), cpu.i64(&[1], &[1])],
		)
		.unwrap_err();
	assert!(err.to_string().contains("out of range"), "{err}");

	let err = cpu
		.dispatcher
		.call(SPARSE_LENGTHS_SUM, &[data, cpu.i64(&[2], &[0, 1]), cpu.i64(&[1], &[1])])
		.unwrap_err();
	assert!(matches!(err, CallError::Kernel { .. }));
}

#[test]
fn test_constant_fill_routes_on_dtype() {
	let cpu = cpu();
	let args = |dtype: &str, value: f64| {
		[
			Value::from(vec![2i64, 3]),
			Value::from(dtype),
			Value::Float(value),
			CpuContext::value(),
		]
	};

	let out = output(cpu.dispatcher.call(CONSTANT_FILL, &args("f32", 1.5)).unwrap());
	assert_eq!(out.tag(), cpu.tags.f32());
	assert_eq!(out.shape(), &[2, 3]);
	assert_eq!(out.as_f32().unwrap(), &[1.5; 6]);

	let out = output(cpu.dispatcher.call(CONSTANT_FILL, &args("int64", 4.0)).unwrap());
	assert_eq!(out.tag(), cpu.tags.i64());
	assert_eq!(out.as_i64().unwrap(), &[4; 6]);

	assert!(matches!(
		cpu.dispatcher.call(CONSTANT_FILL, &args("i64", 0.5)),
		Err(CallError::Kernel { .. })
	));
	assert!(matches!(
		cpu.dispatcher.call(CONSTANT_FILL, &args("f16", 0.0)),
		Err(CallError::SchemaMismatch { .. })
	));
}

#[test]
fn test_constant_fill_rejects_overflowing_shape() {
	let cpu = cpu();
	for dtype in ["f32", "i64"] {
		let err = cpu
			.dispatcher
			.call(
				CONSTANT_FILL,
				&[
					Value::from(vec![i64::MAX, 4]),
					Value::from(dtype),
					Value::Float(1.0),
					CpuContext::value(),
				],
			)
			.unwrap_err();
		assert!(
			matches!(
				&err,
				CallError::Kernel {
					source: KernelError::InvalidArgument { .. },
					..
				}
			),
			"{err}"
		);
	}
}

#[test]
fn test_constant_fill_i64_rejects_out_of_range_values() {
	let cpu = cpu();
	let fill = |value: f64| {
		cpu.dispatcher.call(
			CONSTANT_FILL,
			&[
				Value::from(vec![1i64]),
				Value::from("int64"),
				Value::Float(value),
				CpuContext::value(),
			],
		)
	};

	for value in [1e30, -1e30, 9.223372036854775808e18, f64::NAN, f64::INFINITY] {
		let err = fill(value).unwrap_err();
		assert!(err.to_string().contains("not representable as i64"), "{value}: {err}");
	}

	let out = output(fill(i64::MIN as f64).unwrap());
	assert_eq!(out.as_i64().unwrap(), &[i64::MIN]);
	let out = output(fill(-3.0).unwrap());
	assert_eq!(out.as_i64().unwrap(), &[-3]);
}

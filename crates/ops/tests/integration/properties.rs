//! Property tests over the CPU kernels.

use proptest::prelude::*;
use tessera_dispatch::Value;
use tessera_ops::CpuContext;
use tessera_ops::schemas::{ADD, FLATTEN, RELU};

use crate::common::{cpu, output};

proptest! {
	#[test]
	fn prop_add_i64_commutes(pairs in prop::collection::vec((-1000i64..1000, -1000i64..1000), 1..32)) {
		let cpu = cpu();
		let (a, b): (Vec<i64>, Vec<i64>) = pairs.into_iter().unzip();
		let shape = [a.len()];
		let ab = output(cpu.dispatcher
			.call(ADD, &[cpu.i64(&shape, &a), cpu.i64(&shape, &b), CpuContext::value()])
			.unwrap());
		let ba = output(cpu.dispatcher
			.call(ADD, &[cpu.i64(&shape, &b), cpu.i64(&shape, &a), CpuContext::value()])
			.unwrap());
		prop_assert_eq!(ab.as_i64().unwrap(), ba.as_i64().unwrap());
	}

	#[test]
	fn prop_relu_idempotent(data in prop::collection::vec(-100.0f32..100.0, 1..32)) {
		let cpu = cpu();
		let once = output(cpu.dispatcher.call(RELU, &[cpu.f32(&[data.len()], &data)]).unwrap());
		let twice = output(cpu.dispatcher.call(RELU, &[once.clone().into_value()]).unwrap());
		prop_assert_eq!(&once, &twice);
		prop_assert!(once.as_f32().unwrap().iter().all(|&v| v >= 0.0));
	}

	#[test]
	fn prop_flatten_preserves_elements(dims in prop::collection::vec(1usize..4, 1..4), axis_seed in 0usize..8) {
		let cpu = cpu();
		let numel: usize = dims.iter().product();
		let data: Vec<i64> = (0..numel as i64).collect();
		let axis = axis_seed % (dims.len() + 1);
		let out = output(cpu.dispatcher
			.call(FLATTEN, &[cpu.i64(&dims, &data), Value::Int(axis as i64), CpuContext::value()])
			.unwrap());
		prop_assert_eq!(out.rank(), 2);
		prop_assert_eq!(out.shape()[0] * out.shape()[1], numel);
		prop_assert_eq!(out.as_i64().unwrap(), data.as_slice());
	}
}

//! Installation and concurrent use of the CPU kernel set.

use std::sync::Arc;
use std::thread;

use tessera_dispatch::{CallError, DispatchConfig, RegisterError, Value};
use tessera_ops::schemas::{ADD, RELU};
use tessera_ops::{CPU_F32, CpuContext, ElementTags};

use crate::common::{cpu, cpu_with, empty, output};

#[test]
fn test_install_modules_picks_up_cpu_kernels() {
	let dispatcher = empty();
	assert!(dispatcher.install_modules().unwrap() >= 1);
	assert_eq!(dispatcher.install_modules().unwrap(), 0);

	let tags = ElementTags::ensure(dispatcher.tags()).unwrap();
	assert_eq!(dispatcher.tags().find(CPU_F32), Some(tags.f32()));
	assert!(dispatcher.lookup(ADD, &[tags.f32(), tags.f32()]).is_some());
	assert!(dispatcher.lookup(ADD, &[tags.f32(), tags.i64()]).is_none());
}

#[test]
fn test_second_direct_install_is_a_duplicate() {
	let cpu = cpu();
	assert!(matches!(
		tessera_ops::install(&cpu.dispatcher),
		Err(RegisterError::DuplicateRegistration { .. })
	));
}

#[test]
fn test_install_fails_when_tags_cannot_be_allocated() {
	let config = DispatchConfig {
		tag_capacity: 1,
		..DispatchConfig::default()
	};
	let dispatcher = tessera_dispatch::Dispatcher::new(Arc::new(config.tag_registry()), config);
	assert!(matches!(
		tessera_ops::install(&dispatcher),
		Err(RegisterError::Tag(_))
	));
}

#[test]
fn test_unknown_operator_suggests_installed_name() {
	let cpu = cpu();
	match cpu.dispatcher.call("relus", &[]) {
		Err(CallError::UnknownOperator { suggestion, .. }) => {
			assert_eq!(suggestion.as_deref(), Some(RELU));
		}
		other => panic!("expected UnknownOperator, got {other:?}"),
	}
}

#[test]
fn test_frozen_dispatcher_serves_calls_from_many_threads() {
	let cpu = Arc::new(cpu_with(DispatchConfig {
		auto_freeze: true,
		..DispatchConfig::default()
	}));
	let ctx = CpuContext::value();

	let handles: Vec<_> = (0..8)
		.map(|t| {
			let cpu = Arc::clone(&cpu);
			let ctx = ctx.clone();
			thread::spawn(move || {
				for i in 0..50i64 {
					let out = output(
						cpu.dispatcher
							.call(ADD, &[cpu.i64(&[1], &[t]), cpu.i64(&[1], &[i]), ctx.clone()])
							.unwrap(),
					);
					assert_eq!(out.as_i64().unwrap(), &[t + i]);
				}
			})
		})
		.collect();
	for handle in handles {
		handle.join().unwrap();
	}

	assert!(cpu.dispatcher.kernels().is_frozen());
	assert_eq!(CpuContext::from_value(&ctx).unwrap().launches(), 400);
	assert!(matches!(
		tessera_ops::install(&cpu.dispatcher),
		Err(RegisterError::RegistryFrozen { .. })
	));
}

#[test]
fn test_retired_tags_keep_their_names_in_diagnostics() {
	let cpu = cpu();
	let stale = cpu.f32(&[1], &[1.0]);
	cpu.dispatcher.tags().deregister(cpu.tags.f32()).unwrap();

	// The key still resolves: retirement does not unregister kernels.
	assert!(cpu.dispatcher.call(RELU, &[stale.clone()]).is_ok());

	let int = Value::tensor(cpu.tags.tensor_i64([1], vec![1]).unwrap());
	let err = cpu
		.dispatcher
		.call(ADD, &[stale, int, CpuContext::value()])
		.unwrap_err();
	assert!(err.to_string().contains("cpu.f32#1"), "{err}");
}

//! Kernel registry with atomic snapshot publication.
//!
//! # Role
//!
//! Maps [`DispatchKey`]s to [`KernelHandle`]s. Writers are serialized by a
//! mutex and publish a fresh immutable table through [`ArcSwap`]; readers
//! perform a single atomic load and never block, in either state.
//!
//! # States
//!
//! `Open -> Frozen`, one-directional. [`KernelRegistry::freeze`] marks the
//! end of startup registration; any later insert fails with
//! [`InsertError::Frozen`].
//!
//! # Invariants
//!
//! - At most one kernel per key. A second insert under an existing key fails
//!   with [`InsertError::Duplicate`] and leaves the first binding in place.
//! - A lookup observes either the table before an insert or the table after
//!   it, never a partially built one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::kernel::KernelHandle;
use crate::key::{DispatchKey, Signature};
use crate::schema::OperatorId;

type KernelTable = FxHashMap<DispatchKey, KernelHandle>;

/// Lifecycle of a [`KernelRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
	/// Accepting registrations.
	Open,
	/// Read-only.
	Frozen,
}

/// Failure to insert into a [`KernelRegistry`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum InsertError {
	/// The key is already bound; carries the kernel that keeps the binding.
	#[error("key already bound to kernel '{}'", .existing.name())]
	Duplicate { existing: KernelHandle },
	/// The registry no longer accepts registrations.
	#[error("kernel registry is frozen")]
	Frozen,
}

/// Table from dispatch key to kernel.
#[derive(Default)]
pub struct KernelRegistry {
	snap: ArcSwap<KernelTable>,
	write: Mutex<()>,
	frozen: AtomicBool,
}

impl std::fmt::Debug for KernelRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KernelRegistry")
			.field("state", &self.state())
			.field("len", &self.len())
			.finish()
	}
}

impl KernelRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `kernel` to `key`.
	pub fn register(&self, key: DispatchKey, kernel: KernelHandle) -> Result<(), InsertError> {
		let _guard = self.write.lock();
		if self.frozen.load(Ordering::Acquire) {
			return Err(InsertError::Frozen);
		}

		let current = self.snap.load_full();
		if let Some(existing) = current.get(&key) {
			return Err(InsertError::Duplicate {
				existing: existing.clone(),
			});
		}

		let mut next = KernelTable::clone(&current);
		next.insert(key, kernel);
		self.snap.store(Arc::new(next));
		Ok(())
	}

	/// Returns the kernel bound to `key`.
	#[inline]
	pub fn lookup(&self, key: &DispatchKey) -> Option<KernelHandle> {
		self.snap.load().get(key).cloned()
	}

	/// Closes the registry to further registrations. Idempotent.
	pub fn freeze(&self) {
		let _guard = self.write.lock();
		if !self.frozen.swap(true, Ordering::AcqRel) {
			tracing::debug!(kernels = self.snap.load().len(), "kernel registry frozen");
		}
	}

	#[inline]
	pub fn is_frozen(&self) -> bool {
		self.frozen.load(Ordering::Acquire)
	}

	pub fn state(&self) -> RegistryState {
		if self.is_frozen() {
			RegistryState::Frozen
		} else {
			RegistryState::Open
		}
	}

	/// Returns every registered signature of `op`, sorted by tag id.
	pub fn signatures(&self, op: OperatorId) -> Vec<Signature> {
		let mut sigs: Vec<Signature> = self
			.snap
			.load()
			.keys()
			.filter(|key| key.op() == op)
			.map(|key| key.tags().iter().copied().collect())
			.collect();
		sigs.sort_unstable();
		sigs
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

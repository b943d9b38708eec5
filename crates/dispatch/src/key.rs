//! Dispatch keys.
//!
//! A [`DispatchKey`] is an operator id plus the ordered tag sequence taken
//! from a call's dispatch-relevant arguments. Order is significant: the key
//! for `(cpu, cuda)` never equals the key for `(cuda, cpu)`.
//!
//! # Hashing
//!
//! [`DispatchKey::fingerprint`] folds the operator id, each tag in order and
//! the sequence length with an FNV-style multiply/add. It depends only on
//! raw ids, so it is reproducible for the same tag-assignment order. The
//! [`Hash`] impl feeds the fingerprint alone to the hasher; equality still
//! compares the full key, so a fingerprint collision can never select the
//! wrong kernel.

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::schema::OperatorId;
use crate::tag::TypeTag;
use crate::value::Value;

/// Ordered tag sequence of a dispatch key.
pub type Signature = SmallVec<[TypeTag; 4]>;

const FOLD_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FOLD_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Lookup key for kernel selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchKey {
	op: OperatorId,
	tags: Signature,
}

impl DispatchKey {
	pub fn new(op: OperatorId, tags: impl IntoIterator<Item = TypeTag>) -> Self {
		Self {
			op,
			tags: tags.into_iter().collect(),
		}
	}

	pub fn from_signature(op: OperatorId, tags: Signature) -> Self {
		Self { op, tags }
	}

	/// Default extraction: reads the tag of each argument at `positions`, in
	/// the order the positions are given.
	///
	/// Returns the first position that does not hold a tensor. Callers are
	/// expected to have checked argument kinds already.
	pub fn extract(op: OperatorId, positions: &[usize], args: &[Value]) -> Result<Self, usize> {
		let mut tags = Signature::with_capacity(positions.len());
		for &pos in positions {
			let tag = args.get(pos).and_then(Value::type_tag).ok_or(pos)?;
			tags.push(tag);
		}
		Ok(Self { op, tags })
	}

	pub fn op(&self) -> OperatorId {
		self.op
	}

	pub fn tags(&self) -> &[TypeTag] {
		&self.tags
	}

	/// Deterministic, order-sensitive hash of the key.
	pub fn fingerprint(&self) -> u64 {
		let mut h = (FOLD_OFFSET ^ u64::from(self.op.as_u32())).wrapping_mul(FOLD_PRIME);
		for tag in &self.tags {
			h = h.wrapping_add(u64::from(tag.id())).wrapping_mul(FOLD_PRIME);
		}
		(h ^ self.tags.len() as u64).wrapping_mul(FOLD_PRIME)
	}
}

impl Hash for DispatchKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.fingerprint());
	}
}

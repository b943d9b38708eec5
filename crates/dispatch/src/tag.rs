//! Runtime type tags.
//!
//! A [`TypeTag`] names a dispatch-relevant "kind" (a backend, an element type,
//! a layout) that only exists at runtime. Backend crates allocate their tags
//! from a [`TypeTagRegistry`] at startup and stamp them onto the tensors they
//! produce; the dispatcher reads them back to build keys.
//!
//! # Lifecycle
//!
//! `unallocated -> active -> retired`. Retiring a tag removes it from the
//! active set but its id is never handed out again, so a key that still
//! mentions a retired tag can never match a kernel registered for a newer one.
//!
//! # Concurrency
//!
//! - Id allocation: lock-free compare-exchange on an atomic counter.
//! - Active/retired bookkeeping: guarded by a mutex.
//!
//! Two concurrent `create` calls always get distinct ids; the order in which
//! they become visible through [`TypeTagRegistry::is_active`] is unspecified.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::TagError;

/// Opaque runtime type identifier.
///
/// `TypeTag(0)` is [`TypeTag::UNDEFINED`] and is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeTag(u16);

impl TypeTag {
	/// Reserved sentinel for "no tag".
	pub const UNDEFINED: TypeTag = TypeTag(0);

	/// Returns the raw id.
	#[inline]
	pub const fn id(self) -> u16 {
		self.0
	}

	/// Returns true for [`TypeTag::UNDEFINED`].
	#[inline]
	pub const fn is_undefined(self) -> bool {
		self.0 == 0
	}

	/// Rebuilds a tag from its raw id.
	///
	/// Intended for tests and diagnostics; a tag obtained this way is not
	/// active unless the registry allocated that id.
	pub const fn from_raw(id: u16) -> Self {
		Self(id)
	}
}

impl fmt::Display for TypeTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Default)]
struct TagTable {
	active: FxHashMap<TypeTag, Arc<str>>,
	/// Names of deregistered tags, kept so old keys still render readably.
	retired: FxHashMap<TypeTag, Arc<str>>,
}

impl TagTable {
	fn find(&self, name: &str) -> Option<TypeTag> {
		self.active
			.iter()
			.filter(|(_, n)| &***n == name)
			.map(|(tag, _)| *tag)
			.min()
	}
}

/// Allocator and membership set for [`TypeTag`]s.
pub struct TypeTagRegistry {
	/// Last id handed out. Stays at `capacity` once exhausted.
	last_id: AtomicU32,
	capacity: u16,
	table: Mutex<TagTable>,
}

impl Default for TypeTagRegistry {
	fn default() -> Self {
		Self::new(u16::MAX)
	}
}

impl fmt::Debug for TypeTagRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let table = self.table.lock();
		f.debug_struct("TypeTagRegistry")
			.field("capacity", &self.capacity)
			.field("allocated", &self.last_id.load(Ordering::Relaxed))
			.field("active", &table.active.len())
			.field("retired", &table.retired.len())
			.finish()
	}
}

impl TypeTagRegistry {
	/// Creates a registry that can hand out ids `1..=capacity`.
	pub fn new(capacity: u16) -> Self {
		Self {
			last_id: AtomicU32::new(0),
			capacity,
			table: Mutex::new(TagTable::default()),
		}
	}

	/// Returns the configured id capacity.
	pub fn capacity(&self) -> u16 {
		self.capacity
	}

	/// Allocates a fresh tag and marks it active.
	pub fn create(&self, name: impl Into<Arc<str>>) -> Result<TypeTag, TagError> {
		let tag = self.allocate()?;
		let name = name.into();
		tracing::debug!(tag = tag.id(), name = &*name, "type tag created");
		self.table.lock().active.insert(tag, name);
		Ok(tag)
	}

	/// Returns the lowest-id active tag named `name`, creating it if absent.
	///
	/// The lookup and the insert happen under one lock, so concurrent callers
	/// agree on a single tag.
	pub fn find_or_create(&self, name: &str) -> Result<TypeTag, TagError> {
		let mut table = self.table.lock();
		if let Some(tag) = table.find(name) {
			return Ok(tag);
		}
		let tag = self.allocate()?;
		tracing::debug!(tag = tag.id(), name, "type tag created");
		table.active.insert(tag, Arc::from(name));
		Ok(tag)
	}

	/// Allocates a tag that is deregistered when the guard is dropped.
	pub fn create_scoped(&self, name: impl Into<Arc<str>>) -> Result<ScopedTag<'_>, TagError> {
		let tag = self.create(name)?;
		Ok(ScopedTag {
			registry: self,
			tag,
		})
	}

	fn allocate(&self) -> Result<TypeTag, TagError> {
		let capacity = u32::from(self.capacity);
		match self
			.last_id
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
				(last < capacity).then_some(last + 1)
			}) {
			Ok(prev) => {
				// `prev < capacity <= u16::MAX`, so `prev + 1` fits.
				Ok(TypeTag((prev + 1) as u16))
			}
			Err(_) => {
				tracing::error!(capacity = self.capacity, "type tag id space exhausted");
				Err(TagError::AllocatorExhausted {
					capacity: self.capacity,
				})
			}
		}
	}

	/// Removes `tag` from the active set. Its id is never reused.
	pub fn deregister(&self, tag: TypeTag) -> Result<(), TagError> {
		let mut table = self.table.lock();
		let Some(name) = table.active.remove(&tag) else {
			return Err(TagError::NotRegistered { tag });
		};
		tracing::debug!(tag = tag.id(), name = &*name, "type tag retired");
		table.retired.insert(tag, name);
		Ok(())
	}

	/// Returns true if `tag` is currently active.
	pub fn is_active(&self, tag: TypeTag) -> bool {
		self.table.lock().active.contains_key(&tag)
	}

	/// Returns the name a tag was created with, active or retired.
	pub fn name(&self, tag: TypeTag) -> Option<Arc<str>> {
		let table = self.table.lock();
		table
			.active
			.get(&tag)
			.or_else(|| table.retired.get(&tag))
			.cloned()
	}

	/// Renders a tag for diagnostics as `name#id`, or `#id` if unknown.
	pub fn display(&self, tag: TypeTag) -> String {
		if tag.is_undefined() {
			return "undefined".to_string();
		}
		match self.name(tag) {
			Some(name) => format!("{name}{tag}"),
			None => tag.to_string(),
		}
	}

	/// Returns the lowest-id active tag with the given name.
	pub fn find(&self, name: &str) -> Option<TypeTag> {
		self.table.lock().find(name)
	}

	/// Returns all active tags in id order.
	pub fn active(&self) -> Vec<TypeTag> {
		let mut tags: Vec<_> = self.table.lock().active.keys().copied().collect();
		tags.sort_unstable();
		tags
	}

	/// Returns the number of active tags.
	pub fn len(&self) -> usize {
		self.table.lock().active.len()
	}

	/// Returns true if no tag is active.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Active tag that deregisters itself on drop.
pub struct ScopedTag<'a> {
	registry: &'a TypeTagRegistry,
	tag: TypeTag,
}

impl ScopedTag<'_> {
	/// Returns the guarded tag.
	pub fn tag(&self) -> TypeTag {
		self.tag
	}
}

impl fmt::Debug for ScopedTag<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ScopedTag").field(&self.tag).finish()
	}
}

impl Drop for ScopedTag<'_> {
	fn drop(&mut self) {
		if let Err(err) = self.registry.deregister(self.tag) {
			tracing::warn!(%err, "scoped type tag already deregistered");
		}
	}
}

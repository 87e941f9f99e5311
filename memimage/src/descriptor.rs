//! Structural type descriptors.
//!
//! A descriptor describes a type such that if two types have the same
//! descriptor then their memory layout is identical. It is not a schema:
//! it is an equality gate between writer and reader, and any mismatch is
//! [`Error::IncompatibleLayout`], never a migration.
//!
//! [`Error::IncompatibleLayout`]: crate::Error::IncompatibleLayout

use std::{any::TypeId, collections::HashMap, collections::VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
	error::{Error, Result},
	shape::{with_cache, Kind, Shape},
};

/// Canonical structural signature of a type.
///
/// Entries are referenced by position; entry 0 is the described type
/// itself. Comparison is strict structural equality on the entry lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor(Vec<Entry>);

/// One type in a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Entry {
	pub kind: EntryKind,
	/// Size in bytes.
	pub size: u64,
	/// Index of the element type for pointers, slices, and arrays; -1
	/// otherwise.
	pub elem: i64,
	/// Fields, for records only.
	pub fields: Vec<FieldEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum EntryKind {
	Bool,
	Int,
	Uint,
	Float,
	Ptr,
	Str,
	Slice,
	Array,
	Record,
}

/// One record field: external name, offset, and the index of its type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FieldEntry {
	pub name: String,
	pub offset: u64,
	pub ty: i64,
}

impl Descriptor {
	/// Encode to the canonical wire form used in descriptor segments and
	/// heterogeneous footers.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		bincode::serde::encode_to_vec(self, wire_config())
			.map_err(|e| Error::Corrupt(format!("could not encode descriptor: {e}")))
	}

	/// Decode from the canonical wire form.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let (descriptor, _) = bincode::serde::decode_from_slice(bytes, wire_config())
			.map_err(|e| Error::Corrupt(format!("could not decode descriptor: {e}")))?;
		Ok(descriptor)
	}
}

/// Fixed-width little-endian encoding, so descriptors and footers are
/// deterministic byte-for-byte.
pub(crate) fn wire_config(
) -> bincode::config::Configuration<bincode::config::LittleEndian, bincode::config::Fixint> {
	bincode::config::standard().with_fixed_int_encoding()
}

/// Compute the descriptor for a shape.
///
/// Deterministic for a given type; results are memoized in the
/// process-wide type cache.
pub fn describe(shape: &'static Shape) -> Result<&'static Descriptor> {
	if let Some(descriptor) = with_cache(|cache| cache.descriptors.get(&shape.id).copied()) {
		return Ok(descriptor);
	}

	let descriptor: &'static Descriptor = Box::leak(Box::new(build(shape)?));
	Ok(with_cache(|cache| {
		*cache.descriptors.entry(shape.id).or_insert(descriptor)
	}))
}

fn build(shape: &'static Shape) -> Result<Descriptor> {
	let mut entries = Vec::new();
	let mut seen: HashMap<TypeId, i64> = HashMap::new();
	let mut queue: VecDeque<&'static Shape> = VecDeque::new();

	// Assign indices on first sight, reuse on subsequent sight.
	let mut push = |shape: &'static Shape, queue: &mut VecDeque<&'static Shape>| -> i64 {
		if let Some(&id) = seen.get(&shape.id) {
			return id;
		}
		let id = seen.len() as i64;
		seen.insert(shape.id, id);
		queue.push_back(shape);
		id
	};

	push(shape, &mut queue);
	while let Some(cur) = queue.pop_front() {
		let mut entry = Entry {
			kind: EntryKind::Record,
			size: cur.size as u64,
			elem: -1,
			fields: Vec::new(),
		};

		match &cur.kind {
			Kind::Bool => entry.kind = EntryKind::Bool,
			Kind::Int => entry.kind = EntryKind::Int,
			Kind::Uint => entry.kind = EntryKind::Uint,
			Kind::Float => entry.kind = EntryKind::Float,
			Kind::Str => entry.kind = EntryKind::Str,
			Kind::Ptr(elem) => {
				entry.kind = EntryKind::Ptr;
				entry.elem = push(elem(), &mut queue);
			}
			Kind::Slice(elem) => {
				entry.kind = EntryKind::Slice;
				entry.elem = push(elem(), &mut queue);
			}
			Kind::Array { elem, .. } => {
				entry.kind = EntryKind::Array;
				entry.elem = push(elem(), &mut queue);
			}
			Kind::Record(fields) => {
				for field in fields {
					let field_shape = (field.shape)();
					// Zero-sized fields are invisible to the encoder, so
					// they are invisible to the gate too.
					if field_shape.size == 0 {
						continue;
					}
					entry.fields.push(FieldEntry {
						name: field.name.to_string(),
						offset: field.offset as u64,
						ty: push(field_shape, &mut queue),
					});
				}
			}
			Kind::Unsupported(what) => return Err(Error::UnsupportedKind(what)),
		}

		entries.push(entry);
	}

	Ok(Descriptor(entries))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{shape_of, RawSlice, RawStr, Reflect};

	fn descriptor_of<T: crate::Reflect>() -> Descriptor {
		describe(shape_of::<T>()).unwrap().clone()
	}

	#[test]
	fn identical_layouts_match() {
		#[derive(Reflect)]
		struct A {
			x: i64,
			y: RawStr,
		}

		#[derive(Reflect)]
		struct B {
			x: i64,
			y: RawStr,
		}

		assert_eq!(descriptor_of::<A>(), descriptor_of::<B>());
	}

	#[test]
	fn field_rename_changes_descriptor() {
		#[derive(Reflect)]
		struct A {
			x: i64,
		}

		#[derive(Reflect)]
		struct B {
			#[memimage(rename = "ext")]
			x: i64,
		}

		assert_ne!(descriptor_of::<A>(), descriptor_of::<B>());
	}

	#[test]
	fn rename_makes_differently_named_fields_match() {
		#[derive(Reflect)]
		struct A {
			#[memimage(rename = "value")]
			x: i64,
		}

		#[derive(Reflect)]
		struct B {
			value: i64,
		}

		assert_eq!(descriptor_of::<A>(), descriptor_of::<B>());
	}

	#[test]
	fn swapped_field_types_do_not_match() {
		#[derive(Reflect)]
		struct A {
			x: i64,
			y: RawStr,
		}

		#[derive(Reflect)]
		struct B {
			x: RawStr,
			y: i64,
		}

		assert_ne!(descriptor_of::<A>(), descriptor_of::<B>());
	}

	#[test]
	fn element_type_is_part_of_the_signature() {
		assert_ne!(
			descriptor_of::<RawSlice<u32>>(),
			descriptor_of::<RawSlice<u64>>()
		);
		assert_ne!(descriptor_of::<*const u8>(), descriptor_of::<*const u16>());
		// Same layout, same signature.
		assert_eq!(descriptor_of::<usize>(), descriptor_of::<u64>());
	}

	#[test]
	fn zero_sized_fields_are_skipped() {
		use std::marker::PhantomData;

		#[derive(Reflect)]
		struct A {
			x: i64,
		}

		#[derive(Reflect)]
		struct B {
			marker: PhantomData<fn() -> u8>,
			x: i64,
		}

		assert_eq!(descriptor_of::<A>(), descriptor_of::<B>());
	}

	#[test]
	fn self_referential_types_terminate() {
		#[derive(Reflect)]
		struct Node {
			next: *const Node,
			value: u32,
		}

		let descriptor = descriptor_of::<Node>();
		// Node, *const Node, u32.
		assert_eq!(descriptor.0.len(), 3);
		// The pointer entry refers back to entry 0.
		assert_eq!(descriptor.0[1].elem, 0);
	}

	#[test]
	fn wire_form_round_trips() {
		#[derive(Reflect)]
		struct T {
			items: RawSlice<*const T>,
			name: RawStr,
		}

		let descriptor = descriptor_of::<T>();
		let bytes = descriptor.to_bytes().unwrap();
		assert_eq!(Descriptor::from_bytes(&bytes).unwrap(), descriptor);
	}
}

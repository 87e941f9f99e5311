//! Pointer discovery over a type's flat representation.
//!
//! Finds the byte offset of each pointer word in a shape. Only the
//! immediate value of an object is considered (the bytes that would be
//! copied in a simple assignment); pointers are not followed.

use crate::{
	error::{Error, Result},
	shape::{with_cache, Kind, Shape, ShapeFn},
};

/// The location of one pointer word within a type.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PtrSlot {
	/// Byte offset of the pointer word from the start of the type.
	pub offset: usize,
	pub kind: SlotKind,
}

/// What the pointer word at a slot belongs to, and how to size its target.
#[derive(Clone, Copy, Debug)]
pub(crate) enum SlotKind {
	/// Pointer to a single value of the element type.
	Ptr(ShapeFn),
	/// Data word of a string header; target is `len` bytes.
	Str,
	/// Data word of a slice header; target is `len` elements.
	Slice(ShapeFn),
}

/// Get the pointer slots of `shape`, sorted by offset ascending.
///
/// The ascending order is relied on by the image encoder, which copies the
/// intervals between consecutive pointer words verbatim. Results are
/// memoized in the process-wide type cache.
pub(crate) fn pointers_in(shape: &'static Shape) -> Result<&'static [PtrSlot]> {
	if let Some(slots) = with_cache(|cache| cache.pointers.get(&shape.id).copied()) {
		return Ok(slots);
	}

	let mut slots = Vec::new();
	visit(shape, 0, &mut slots)?;
	slots.sort_by_key(|slot| slot.offset);

	let slots: &'static [PtrSlot] = Vec::leak(slots);
	Ok(with_cache(|cache| {
		*cache.pointers.entry(shape.id).or_insert(slots)
	}))
}

fn visit(shape: &'static Shape, base: usize, out: &mut Vec<PtrSlot>) -> Result<()> {
	match &shape.kind {
		Kind::Bool | Kind::Int | Kind::Uint | Kind::Float => {}
		// Pointer, string, and slice all store one pointer word at offset
		// zero of their representation.
		Kind::Ptr(elem) => out.push(PtrSlot {
			offset: base,
			kind: SlotKind::Ptr(*elem),
		}),
		Kind::Str => out.push(PtrSlot {
			offset: base,
			kind: SlotKind::Str,
		}),
		Kind::Slice(elem) => out.push(PtrSlot {
			offset: base,
			kind: SlotKind::Slice(*elem),
		}),
		Kind::Record(fields) => {
			for field in fields {
				visit((field.shape)(), base + field.offset, out)?;
			}
		}
		Kind::Array { elem, len } => {
			let elem = elem();
			for slot in pointers_in(elem)? {
				for i in 0..*len {
					out.push(PtrSlot {
						offset: base + i * elem.size + slot.offset,
						kind: slot.kind,
					});
				}
			}
		}
		Kind::Unsupported(what) => return Err(Error::UnsupportedKind(what)),
	}
	Ok(())
}

//! Breadth-first image construction.
//!
//! Walks the reachable graph of a value and lays every distinct object out
//! in one contiguous byte image. Pointer words in the image hold offsets
//! relative to the image start; the offset of each non-nil pointer word is
//! recorded so the relocator can later turn them back into live pointers.

use std::{collections::HashMap, collections::VecDeque, slice};

use crate::{
	error::Result,
	inspect::{pointers_in, PtrSlot, SlotKind},
	shape::Shape,
	shape_of,
	util::align_up_to,
	Reflect,
};

const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// The product of one encode call: the raw image and the offsets of the
/// pointer words inside it. The root object is always at offset 0.
pub(crate) struct Image {
	pub bytes: Vec<u8>,
	/// Offsets of non-nil pointer words, ascending.
	pub ptr_locs: Vec<usize>,
}

/// One queued unit of work: copy `len` values of `elem` from `src` into the
/// image at `dest`.
struct Block {
	src: *const u8,
	dest: usize,
	elem: &'static Shape,
	len: usize,
}

struct ImageEncoder {
	out: Vec<u8>,
	/// Bump cursor: total bytes allocated so far, including blocks not yet
	/// written.
	next: usize,
	/// Source address of every scheduled object, mapped to its image
	/// offset. This is what makes shared and cyclic structure terminate:
	/// the first encounter of an address schedules the copy, every later
	/// encounter reuses the offset.
	cache: HashMap<usize, usize>,
	ptr_locs: Vec<usize>,
	queue: VecDeque<Block>,
}

/// Build the image of the graph reachable from `value`.
///
/// # Safety
///
/// Every pointer word reachable from `value` (raw pointers and the data
/// words of non-nil `RawStr`/`RawSlice` headers, transitively) must point
/// to a live, initialized allocation of the shape's element type with at
/// least the header's length of elements.
pub(crate) unsafe fn encode_image<T: Reflect>(value: &T) -> Result<Image> {
	let shape = shape_of::<T>();
	let mut encoder = ImageEncoder {
		out: Vec::new(),
		next: 0,
		cache: HashMap::new(),
		ptr_locs: Vec::new(),
		queue: VecDeque::new(),
	};

	// The cursor starts at 0 and every alignment divides 0, so the root
	// lands at offset 0.
	let root = encoder.alloc(shape, 1);
	debug_assert_eq!(root, 0);
	encoder.queue.push_back(Block {
		src: value as *const T as *const u8,
		dest: root,
		elem: shape,
		len: 1,
	});
	// Seed the cache with the root itself, so a pointer back to the root
	// resolves to offset 0 instead of scheduling a second copy.
	encoder.cache.insert(value as *const T as usize, root);

	while let Some(block) = encoder.queue.pop_front() {
		encoder.write_block(block)?;
	}

	Ok(Image {
		bytes: encoder.out,
		ptr_locs: encoder.ptr_locs,
	})
}

impl ImageEncoder {
	/// Make room for `n` values of `shape`, returning the base offset.
	/// The offset satisfies the shape's alignment.
	fn alloc(&mut self, shape: &'static Shape, n: usize) -> usize {
		self.next = align_up_to(self.next, shape.align);
		let offset = self.next;
		self.next += shape.size * n;
		offset
	}

	/// Copy one block into the image, translating its pointer words.
	///
	/// Blocks are allocated and queued in the same FIFO order, so each
	/// block's `dest` is at or past the write position; any gap is
	/// alignment padding and is zero-filled.
	unsafe fn write_block(&mut self, block: Block) -> Result<()> {
		debug_assert!(block.dest >= self.out.len());
		if block.dest > self.out.len() {
			self.out.resize(block.dest, 0);
		}

		let size = block.elem.size * block.len;
		let bytes = slice::from_raw_parts(block.src, size);
		let slots = pointers_in(block.elem)?;

		// Copy the intervals between pointer words verbatim (slots are
		// sorted ascending), translating each pointer word as it is
		// reached.
		let mut cut = 0;
		for i in 0..block.len {
			let elem_base = i * block.elem.size;
			for slot in slots {
				let offset = elem_base + slot.offset;
				self.out.extend_from_slice(&bytes[cut..offset]);
				let word = self.translate(block.src.add(offset), slot, block.dest + offset)?;
				self.out.extend_from_slice(&word.to_ne_bytes());
				cut = offset + WORD_SIZE;
			}
		}
		self.out.extend_from_slice(&bytes[cut..]);
		Ok(())
	}

	/// Decide the image value of the pointer word at `slot_addr`, whose
	/// position in the image is `dest`.
	///
	/// Nil pointers become 0 and are not recorded. Anything else is
	/// recorded in the location list and resolved through the address
	/// cache, scheduling a copy of the referent on a miss.
	unsafe fn translate(&mut self, slot_addr: *const u8, slot: &PtrSlot, dest: usize) -> Result<usize> {
		let src = (slot_addr as *const usize).read();
		// A zero data word is nil even when a slice or string header
		// carries a non-zero length.
		if src == 0 {
			return Ok(0);
		}

		self.ptr_locs.push(dest);

		if let Some(&offset) = self.cache.get(&src) {
			return Ok(offset);
		}

		let (elem, len) = self.referent(slot_addr, slot);
		let offset = self.alloc(elem, len);
		self.queue.push_back(Block {
			src: src as *const u8,
			dest: offset,
			elem,
			len,
		});
		self.cache.insert(src, offset);
		Ok(offset)
	}

	/// Element shape and count of the object a slot points at.
	unsafe fn referent(&self, slot_addr: *const u8, slot: &PtrSlot) -> (&'static Shape, usize) {
		match slot.kind {
			SlotKind::Ptr(elem) => (elem(), 1),
			// Headers store their length one word past the data word.
			SlotKind::Str => {
				let len = (slot_addr.add(WORD_SIZE) as *const usize).read();
				(shape_of::<u8>(), len)
			}
			SlotKind::Slice(elem) => {
				let len = (slot_addr.add(WORD_SIZE) as *const usize).read();
				(elem(), len)
			}
		}
	}
}

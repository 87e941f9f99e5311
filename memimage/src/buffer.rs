// Allocation pattern adapted from RKYV's `AlignedVec`.
// https://github.com/rkyv/rkyv/blob/master/rkyv/src/util/aligned_vec.rs

use std::{
	alloc::{self, Layout},
	ptr::{self, NonNull},
	slice,
};

use crate::util::align_up_to;

/// Alignment of every decode buffer. Covers the maximum alignment of any
/// encodable type (16, for `u128`/`i128`).
pub(crate) const BUFFER_ALIGNMENT: usize = 16;

/// Fixed-size heap buffer aligned to [`BUFFER_ALIGNMENT`].
///
/// Backing store for decoded images. The buffer never grows and never
/// moves: relocated pointer words inside it encode its base address, so a
/// move would invalidate the whole graph.
pub(crate) struct AlignedBytes {
	ptr: NonNull<u8>,
	capacity: usize,
	len: usize,
}

impl AlignedBytes {
	/// Copy `bytes` into a new aligned buffer.
	pub fn from_slice(bytes: &[u8]) -> Self {
		if bytes.is_empty() {
			return Self {
				ptr: NonNull::dangling(),
				capacity: 0,
				len: 0,
			};
		}

		let capacity = align_up_to(bytes.len(), BUFFER_ALIGNMENT);
		// `capacity` is non-zero and a multiple of the alignment, so the
		// layout is valid.
		let ptr = unsafe {
			let layout = Layout::from_size_align_unchecked(capacity, BUFFER_ALIGNMENT);
			let ptr = alloc::alloc(layout);
			if ptr.is_null() {
				alloc::handle_alloc_error(layout);
			}
			ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
			NonNull::new_unchecked(ptr)
		};

		Self {
			ptr,
			capacity,
			len: bytes.len(),
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn as_ptr(&self) -> *const u8 {
		self.ptr.as_ptr()
	}

	#[inline]
	pub fn as_mut_ptr(&mut self) -> *mut u8 {
		self.ptr.as_ptr()
	}

	#[inline]
	pub fn as_slice(&self) -> &[u8] {
		unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
	}
}

impl Drop for AlignedBytes {
	fn drop(&mut self) {
		if self.capacity > 0 {
			unsafe {
				let layout = Layout::from_size_align_unchecked(self.capacity, BUFFER_ALIGNMENT);
				alloc::dealloc(self.ptr.as_ptr(), layout);
			}
		}
	}
}

// Safe to be `Send` and `Sync` because the pointer is not aliased outside
// the owning value and there is no interior mutability.
unsafe impl Send for AlignedBytes {}
unsafe impl Sync for AlignedBytes {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::util::is_aligned_to;

	#[test]
	fn buffer_is_aligned() {
		let buf = AlignedBytes::from_slice(&[1, 2, 3]);
		assert!(is_aligned_to(buf.as_ptr() as usize, BUFFER_ALIGNMENT));
		assert_eq!(buf.as_slice(), &[1, 2, 3]);
		assert_eq!(buf.len(), 3);
	}

	#[test]
	fn empty_buffer_does_not_allocate() {
		let buf = AlignedBytes::from_slice(&[]);
		assert_eq!(buf.len(), 0);
		assert_eq!(buf.as_slice(), &[] as &[u8]);
	}
}

use std::{
	any::{type_name, TypeId},
	marker::PhantomData,
	mem, ptr, slice, str,
};

use crate::shape::{Kind, Reflect, Shape};

/// A string header with guaranteed layout: data pointer first, then length.
///
/// `String` and `&str` cannot appear in an encodable graph: `String` owns
/// its allocation (dropping a decoded copy would free the middle of the
/// decode buffer) and neither guarantees field order. `RawStr` is the
/// crate's string: a plain pointer + length pair that is `Copy` and never
/// drops. A null data pointer is nil; nil and empty are distinct states
/// only in the pointer value, both have length 0 when well-formed.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RawStr {
	pub(crate) data: *const u8,
	pub(crate) len: usize,
}

impl RawStr {
	/// The nil string: null data pointer, zero length.
	#[inline]
	pub const fn nil() -> Self {
		Self {
			data: ptr::null(),
			len: 0,
		}
	}

	/// Create a `RawStr` viewing `s`'s bytes.
	///
	/// The header does not borrow: `s` must stay alive (and unmoved) for as
	/// long as the header is read through, including any encode call.
	#[inline]
	pub fn from_ref(s: &str) -> Self {
		Self {
			data: s.as_ptr(),
			len: s.len(),
		}
	}

	/// Whether the data pointer is null. The length field plays no part in
	/// the nil test.
	#[inline]
	pub fn is_nil(&self) -> bool {
		self.data.is_null()
	}

	#[inline]
	pub fn as_ptr(&self) -> *const u8 {
		self.data
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// View the pointed-to bytes as `&str`.
	///
	/// # Safety
	///
	/// The header must be non-nil and point to `len` live bytes of valid
	/// UTF-8 which are not mutated for the returned lifetime.
	#[inline]
	pub unsafe fn as_str(&self) -> &str {
		debug_assert!(!self.is_nil());
		str::from_utf8_unchecked(slice::from_raw_parts(self.data, self.len))
	}
}

unsafe impl Reflect for RawStr {
	fn build() -> Shape {
		Shape {
			id: TypeId::of::<Self>(),
			name: type_name::<Self>(),
			size: mem::size_of::<Self>(),
			align: mem::align_of::<Self>(),
			kind: Kind::Str,
		}
	}
}

/// A slice header with guaranteed layout: data pointer, length, capacity.
///
/// The crate's dynamic slice, standing in for `Vec<T>` / `&[T]` the same
/// way [`RawStr`] stands in for strings. `Copy`, never drops, null data
/// pointer is nil. The capacity field is carried through encode and decode
/// verbatim as a plain integer.
#[repr(C)]
#[derive(Debug)]
pub struct RawSlice<T> {
	pub(crate) data: *const T,
	pub(crate) len: usize,
	pub(crate) cap: usize,
}

// Manual impls: `derive` would bound them on `T: Clone`/`T: Copy`, but the
// header is a pointer + two words regardless of `T`.
impl<T> Clone for RawSlice<T> {
	#[inline]
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for RawSlice<T> {}

impl<T> RawSlice<T> {
	/// The nil slice: null data pointer, zero length and capacity.
	#[inline]
	pub const fn nil() -> Self {
		Self {
			data: ptr::null(),
			len: 0,
			cap: 0,
		}
	}

	/// Create a `RawSlice` viewing `values`.
	///
	/// The header does not borrow: `values` must stay alive (and unmoved)
	/// for as long as the header is read through, including any encode
	/// call.
	#[inline]
	pub fn from_ref(values: &[T]) -> Self {
		Self {
			data: values.as_ptr(),
			len: values.len(),
			cap: values.len(),
		}
	}

	/// Whether the data pointer is null. The length and capacity fields
	/// play no part in the nil test.
	#[inline]
	pub fn is_nil(&self) -> bool {
		self.data.is_null()
	}

	#[inline]
	pub fn as_ptr(&self) -> *const T {
		self.data
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	#[inline]
	pub fn capacity(&self) -> usize {
		self.cap
	}

	/// View the pointed-to elements as `&[T]`.
	///
	/// # Safety
	///
	/// The header must be non-nil and point to `len` live, initialized
	/// elements which are not mutated for the returned lifetime.
	#[inline]
	pub unsafe fn as_slice(&self) -> &[T] {
		debug_assert!(!self.is_nil());
		slice::from_raw_parts(self.data, self.len)
	}

	/// View the pointed-to elements as `&mut [T]`.
	///
	/// # Safety
	///
	/// As [`as_slice`](Self::as_slice), and no other reference to the
	/// elements may exist for the returned lifetime.
	#[inline]
	pub unsafe fn as_mut_slice(&mut self) -> &mut [T] {
		debug_assert!(!self.is_nil());
		slice::from_raw_parts_mut(self.data as *mut T, self.len)
	}
}

unsafe impl<T: Reflect> Reflect for RawSlice<T> {
	fn build() -> Shape {
		Shape {
			id: TypeId::of::<Self>(),
			name: type_name::<Self>(),
			size: mem::size_of::<Self>(),
			align: mem::align_of::<Self>(),
			kind: Kind::Slice(crate::shape_of::<T>),
		}
	}
}

// Zero-sized marker: a record with no fields. Contributes nothing to
// pointer discovery and is skipped by the descriptor builder when it
// appears as a field.
unsafe impl<T: ?Sized + 'static> Reflect for PhantomData<T> {
	fn build() -> Shape {
		Shape {
			id: TypeId::of::<Self>(),
			name: type_name::<Self>(),
			size: 0,
			align: 1,
			kind: Kind::Record(Vec::new()),
		}
	}
}

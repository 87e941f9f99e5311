//! Pointer relocation and the decoded-graph owner.
//!
//! Relocation adds the decode buffer's base address to each pointer word
//! named by a locations list, turning image offsets back into live
//! pointers in one pass.

use std::{
	io::{self, Read, Write},
	marker::PhantomData,
	ops::{Deref, DerefMut},
};

use crate::{
	buffer::{AlignedBytes, BUFFER_ALIGNMENT},
	error::{Error, Result},
	shape_of,
	util::is_aligned_to,
	Reflect,
};

const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// The locations of pointer words in an image, plus the offset of the
/// primary object.
pub(crate) struct Locations {
	pub main: i64,
	pub pointers: Vec<i64>,
}

/// Wire form (little-endian): `i64` count, `i64` main offset, then one
/// `i64` per pointer location.
pub(crate) fn write_locations<W: Write>(w: &mut W, main: usize, pointers: &[usize]) -> io::Result<()> {
	w.write_all(&(pointers.len() as i64).to_le_bytes())?;
	w.write_all(&(main as i64).to_le_bytes())?;
	for &loc in pointers {
		w.write_all(&(loc as i64).to_le_bytes())?;
	}
	Ok(())
}

pub(crate) fn read_locations<R: Read>(r: &mut R) -> Result<Locations> {
	let num_pointers = read_i64(r)?;
	let main = read_i64(r)?;
	if num_pointers < 0 {
		return Err(Error::Corrupt(format!(
			"negative pointer count: {num_pointers}"
		)));
	}

	let mut pointers = Vec::new();
	for _ in 0..num_pointers {
		pointers.push(read_i64(r)?);
	}
	Ok(Locations { main, pointers })
}

fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
	let mut bytes = [0u8; 8];
	r.read_exact(&mut bytes).map_err(|e| {
		if e.kind() == io::ErrorKind::UnexpectedEof {
			Error::UnexpectedEof
		} else {
			Error::Io(e)
		}
	})?;
	Ok(i64::from_le_bytes(bytes))
}

/// A decoded graph: the decode buffer plus the root object inside it.
///
/// Every pointer in the graph aliases the buffer, so the buffer lives
/// exactly as long as the `Graph` and is freed as one allocation when the
/// `Graph` drops. Individual sub-objects cannot be freed. The root (and
/// everything reachable from it) may be read and written through `Deref` /
/// `DerefMut`.
pub struct Graph<T> {
	buf: AlignedBytes,
	main: usize,
	_marker: PhantomData<T>,
}

impl<T> Graph<T> {
	#[inline]
	pub fn as_ptr(&self) -> *const T {
		unsafe { self.buf.as_ptr().add(self.main) as *const T }
	}

	/// The whole decode buffer. Every pointer in the graph falls inside
	/// this range.
	#[inline]
	pub fn as_bytes(&self) -> &[u8] {
		self.buf.as_slice()
	}

	#[inline]
	pub fn as_mut_ptr(&mut self) -> *mut T {
		unsafe { self.buf.as_mut_ptr().add(self.main) as *mut T }
	}
}

impl<T> Deref for Graph<T> {
	type Target = T;

	#[inline]
	fn deref(&self) -> &T {
		// Validity of the root was established by `relocate`.
		unsafe { &*self.as_ptr() }
	}
}

impl<T> DerefMut for Graph<T> {
	#[inline]
	fn deref_mut(&mut self) -> &mut T {
		unsafe { &mut *self.as_mut_ptr() }
	}
}

/// Add the buffer's base address to each pointer word, then reinterpret
/// the buffer at the main offset as a `T`.
///
/// Every location (and the main offset) is range-checked against the
/// buffer before anything is written; a stream that fails the checks is
/// rejected as corrupt with the buffer untouched by later additions.
///
/// # Safety
///
/// The buffer must contain an image produced by encoding a `T` on this
/// platform, with its matching locations list. Relocation itself is
/// checked, but the returned graph trusts the image's contents.
pub(crate) unsafe fn relocate<T: Reflect>(mut buf: AlignedBytes, locations: Locations) -> Result<Graph<T>> {
	let shape = shape_of::<T>();
	let len = buf.len();

	let main = usize::try_from(locations.main)
		.map_err(|_| Error::Corrupt(format!("main offset was negative: {}", locations.main)))?;
	if main >= len || len - main < shape.size {
		return Err(Error::Corrupt(format!(
			"main offset was out of range: {main} (buffer len={len})"
		)));
	}
	if !is_aligned_to(main, shape.align) {
		return Err(Error::Corrupt(format!(
			"main offset {main} is not aligned for the root type"
		)));
	}

	for (i, &loc) in locations.pointers.iter().enumerate() {
		let loc = usize::try_from(loc).unwrap_or(usize::MAX);
		if loc > len || len - loc < WORD_SIZE {
			return Err(Error::Corrupt(format!(
				"pointer {i} was out of range: {loc} (buffer len={len})"
			)));
		}
	}

	debug_assert!(is_aligned_to(buf.as_ptr() as usize, BUFFER_ALIGNMENT));
	let base = buf.as_mut_ptr() as usize;
	for &loc in &locations.pointers {
		let word = buf.as_mut_ptr().add(loc as usize) as *mut usize;
		word.write_unaligned(word.read_unaligned().wrapping_add(base));
	}

	Ok(Graph {
		buf,
		main,
		_marker: PhantomData,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn locations_round_trip() {
		let mut bytes = Vec::new();
		write_locations(&mut bytes, 0, &[8, 24, 40]).unwrap();
		assert_eq!(bytes.len(), 8 * 5);

		let locations = read_locations(&mut &bytes[..]).unwrap();
		assert_eq!(locations.main, 0);
		assert_eq!(locations.pointers, vec![8, 24, 40]);
	}

	#[test]
	fn truncated_locations_fail() {
		let mut bytes = Vec::new();
		write_locations(&mut bytes, 0, &[8, 24]).unwrap();
		bytes.truncate(20);

		assert!(matches!(
			read_locations(&mut &bytes[..]),
			Err(Error::UnexpectedEof)
		));
	}

	#[test]
	fn out_of_range_pointer_is_corrupt() {
		let buf = AlignedBytes::from_slice(&[0u8; 16]);
		let locations = Locations {
			main: 0,
			pointers: vec![16],
		};
		let result = unsafe { relocate::<u64>(buf, locations) };
		assert!(matches!(result, Err(Error::Corrupt(_))));

		// A location that leaves no room for a full word is also out of
		// range.
		let buf = AlignedBytes::from_slice(&[0u8; 16]);
		let locations = Locations {
			main: 0,
			pointers: vec![12],
		};
		let result = unsafe { relocate::<u64>(buf, locations) };
		assert!(matches!(result, Err(Error::Corrupt(_))));
	}

	#[test]
	fn out_of_range_main_is_corrupt() {
		let buf = AlignedBytes::from_slice(&[0u8; 8]);
		let locations = Locations {
			main: 8,
			pointers: Vec::new(),
		};
		let result = unsafe { relocate::<u64>(buf, locations) };
		assert!(matches!(result, Err(Error::Corrupt(_))));
	}

	#[test]
	fn relocation_with_no_pointers_leaves_bytes_untouched() {
		let bytes = 0x0102030405060708u64.to_ne_bytes();
		let buf = AlignedBytes::from_slice(&bytes);
		let locations = Locations {
			main: 0,
			pointers: Vec::new(),
		};
		let graph = unsafe { relocate::<u64>(buf, locations).unwrap() };
		assert_eq!(*graph, 0x0102030405060708);
	}
}

//! Stand-alone single-image containers.
//!
//! One image, self-contained, no protocol word and no delimiters: the
//! locations footer comes first, then the raw image bytes run to end of
//! stream. There is no descriptor, so no layout gate; the caller vouches
//! for the type.

use std::io::{Read, Write};

use crate::{
	buffer::AlignedBytes,
	encode::encode_image,
	error::Result,
	relocate::{read_locations, relocate, write_locations, Graph},
	Reflect,
};

/// Write a memory image of `value` to `w`.
///
/// # Safety
///
/// Every pointer word reachable from `value` must point to a live,
/// initialized allocation of its element type (see [`Reflect`]).
pub unsafe fn encode<W: Write, T: Reflect>(mut w: W, value: &T) -> Result<()> {
	let image = encode_image(value)?;
	write_locations(&mut w, 0, &image.ptr_locs)?;
	w.write_all(&image.bytes)?;
	Ok(())
}

/// Read a memory image of a `T` from `r`.
///
/// The returned [`Graph`] owns the freshly allocated buffer the graph
/// lives in.
///
/// # Safety
///
/// The stream must contain the output of [`encode`] for the same type `T`,
/// produced on this platform. The image's contents are trusted.
pub unsafe fn decode<R: Read, T: Reflect>(mut r: R) -> Result<Graph<T>> {
	let locations = read_locations(&mut r)?;

	let mut bytes = Vec::new();
	r.read_to_end(&mut bytes)?;

	relocate(AlignedBytes::from_slice(&bytes), locations)
}

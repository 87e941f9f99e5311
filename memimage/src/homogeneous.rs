//! Homogeneous streams: many images of one common type.
//!
//! The descriptor is written once at stream start and every message shares
//! it. Stream layout:
//!
//! ```text
//! i32 protocol(=1)
//! descriptor  DELIM
//! { image  DELIM  locations  DELIM }*
//! ```

use std::{
	any::TypeId,
	io::{self, Read, Write},
};

use crate::{
	buffer::AlignedBytes,
	delim::{DelimitedReader, DELIMITER},
	descriptor::{describe, Descriptor},
	encode::encode_image,
	error::{Error, Result},
	relocate::{read_locations, relocate, write_locations, Graph},
	shape_of, Reflect,
};

pub(crate) const HOMOGENEOUS_PROTOCOL: i32 = 1;

/// Writes a stream of images of one type.
///
/// The first `encode` writes the protocol word and the descriptor and
/// locks the encoder to that type; a later call with a different type
/// fails with [`Error::TypeChangedMidStream`] without writing anything.
pub struct Encoder<W> {
	w: W,
	locked: Option<TypeId>,
}

impl<W: Write> Encoder<W> {
	pub fn new(w: W) -> Self {
		Self { w, locked: None }
	}

	/// Append one image of `value` to the stream.
	///
	/// # Safety
	///
	/// Every pointer word reachable from `value` must point to a live,
	/// initialized allocation of its element type (see [`Reflect`]).
	pub unsafe fn encode<T: Reflect>(&mut self, value: &T) -> Result<()> {
		let shape = shape_of::<T>();
		match self.locked {
			Some(id) if id != shape.id => return Err(Error::TypeChangedMidStream),
			Some(_) => {}
			None => {
				// Descriptor failures (unsupported kinds) must surface
				// before any bytes hit the stream.
				let descriptor = describe(shape)?.to_bytes()?;
				self.w.write_all(&HOMOGENEOUS_PROTOCOL.to_le_bytes())?;
				self.w.write_all(&descriptor)?;
				self.w.write_all(&DELIMITER)?;
				self.locked = Some(shape.id);
			}
		}

		let image = encode_image(value)?;
		self.w.write_all(&image.bytes)?;
		self.w.write_all(&DELIMITER)?;
		write_locations(&mut self.w, 0, &image.ptr_locs)?;
		self.w.write_all(&DELIMITER)?;
		Ok(())
	}

	/// Consume the encoder and return the underlying writer.
	pub fn into_inner(self) -> W {
		self.w
	}
}

/// Reads a stream written by [`Encoder`].
///
/// The decoder assumes it is the sole reader of its stream for its
/// lifetime. Each decoded graph gets a fresh buffer; earlier graphs stay
/// valid as later ones are read.
pub struct Decoder<R> {
	dr: DelimitedReader<R>,
	checked: Option<TypeId>,
}

impl<R: Read> Decoder<R> {
	pub fn new(r: R) -> Self {
		Self {
			dr: DelimitedReader::new(r),
			checked: None,
		}
	}

	/// Read the next image as a `T`, or `None` at end of stream.
	///
	/// The first call reads the protocol word and the stream's descriptor
	/// and compares it against `T`'s; a mismatch is
	/// [`Error::IncompatibleLayout`] and the stream should not be read
	/// further. Every call must pass the same `T`.
	///
	/// # Safety
	///
	/// The stream must have been produced by [`Encoder`] on this platform.
	/// The descriptor gates the layout, but the images' contents are
	/// trusted.
	pub unsafe fn decode<T: Reflect>(&mut self) -> Result<Option<Graph<T>>> {
		let shape = shape_of::<T>();
		match self.checked {
			Some(id) if id != shape.id => return Err(Error::TypeChangedMidStream),
			Some(_) => {}
			None => {
				let mut word = [0u8; 4];
				self.dr.read_exact(&mut word).map_err(eof_or_io)?;
				let protocol = i32::from_le_bytes(word);
				if protocol != HOMOGENEOUS_PROTOCOL {
					return Err(Error::InvalidProtocol(protocol));
				}

				let segment = self
					.dr
					.next()?
					.ok_or_else(|| Error::Corrupt("descriptor segment was missing".into()))?;
				let descriptor = Descriptor::from_bytes(segment)?;
				if descriptor != *describe(shape)? {
					return Err(Error::IncompatibleLayout);
				}
				self.checked = Some(shape.id);
			}
		}

		let buf = match self.dr.next()? {
			Some(segment) => AlignedBytes::from_slice(segment),
			None => return Ok(None),
		};

		let locations = match self.dr.next()? {
			Some(mut segment) => read_locations(&mut segment)?,
			None => return Err(Error::Corrupt("locations segment was missing".into())),
		};

		relocate(buf, locations).map(Some)
	}
}

pub(crate) fn eof_or_io(e: io::Error) -> Error {
	if e.kind() == io::ErrorKind::UnexpectedEof {
		Error::UnexpectedEof
	} else {
		Error::Io(e)
	}
}

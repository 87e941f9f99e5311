//! Heterogeneous streams: images of varying types.
//!
//! Every message carries its own descriptor in its footer, so types may
//! differ from message to message. Stream layout:
//!
//! ```text
//! i32 protocol(=2)
//! { image  DELIM  footer(pointers, main, descriptor)  DELIM }*
//! ```

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::{
	buffer::AlignedBytes,
	delim::{DelimitedReader, DELIMITER},
	descriptor::{describe, wire_config, Descriptor},
	encode::encode_image,
	error::{Error, Result},
	homogeneous::eof_or_io,
	relocate::{relocate, Graph, Locations},
	shape_of, Reflect,
};

pub(crate) const HETEROGENEOUS_PROTOCOL: i32 = 2;

/// Per-message footer: pointer locations, main offset, and the message's
/// own descriptor.
#[derive(Serialize, Deserialize)]
struct Footer {
	pointers: Vec<i64>,
	main: i64,
	descriptor: Descriptor,
}

impl Footer {
	fn to_bytes(&self) -> Result<Vec<u8>> {
		bincode::serde::encode_to_vec(self, wire_config())
			.map_err(|e| Error::Corrupt(format!("could not encode footer: {e}")))
	}

	fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let (footer, _) = bincode::serde::decode_from_slice(bytes, wire_config())
			.map_err(|e| Error::Corrupt(format!("could not decode footer: {e}")))?;
		Ok(footer)
	}
}

/// Writes a stream of images whose types may vary per message.
pub struct HeterogeneousEncoder<W> {
	w: W,
	has_protocol: bool,
}

impl<W: Write> HeterogeneousEncoder<W> {
	pub fn new(w: W) -> Self {
		Self {
			w,
			has_protocol: false,
		}
	}

	/// Append one image of `value`, with its descriptor, to the stream.
	///
	/// # Safety
	///
	/// Every pointer word reachable from `value` must point to a live,
	/// initialized allocation of its element type (see [`Reflect`]).
	pub unsafe fn encode<T: Reflect>(&mut self, value: &T) -> Result<()> {
		let shape = shape_of::<T>();
		// Descriptor failures (unsupported kinds) must surface before any
		// bytes hit the stream.
		let descriptor = describe(shape)?;

		if !self.has_protocol {
			self.w.write_all(&HETEROGENEOUS_PROTOCOL.to_le_bytes())?;
			self.has_protocol = true;
		}

		let image = encode_image(value)?;
		self.w.write_all(&image.bytes)?;
		self.w.write_all(&DELIMITER)?;

		let footer = Footer {
			pointers: image.ptr_locs.iter().map(|&loc| loc as i64).collect(),
			main: 0,
			descriptor: descriptor.clone(),
		};
		self.w.write_all(&footer.to_bytes()?)?;
		self.w.write_all(&DELIMITER)?;
		Ok(())
	}

	/// Consume the encoder and return the underlying writer.
	pub fn into_inner(self) -> W {
		self.w
	}
}

/// Reads a stream written by [`HeterogeneousEncoder`].
pub struct HeterogeneousDecoder<R> {
	dr: DelimitedReader<R>,
	has_protocol: bool,
}

impl<R: Read> HeterogeneousDecoder<R> {
	pub fn new(r: R) -> Self {
		Self {
			dr: DelimitedReader::new(r),
			has_protocol: false,
		}
	}

	/// Read the next image as a `T`, or `None` at end of stream.
	///
	/// The message's embedded descriptor is compared against `T`'s before
	/// relocation; a mismatch is [`Error::IncompatibleLayout`] and leaves
	/// the message consumed.
	///
	/// # Safety
	///
	/// The stream must have been produced by [`HeterogeneousEncoder`] on
	/// this platform. The descriptor gates the layout, but the images'
	/// contents are trusted.
	pub unsafe fn decode<T: Reflect>(&mut self) -> Result<Option<Graph<T>>> {
		if !self.has_protocol {
			let mut word = [0u8; 4];
			self.dr.read_exact(&mut word).map_err(eof_or_io)?;
			let protocol = i32::from_le_bytes(word);
			if protocol != HETEROGENEOUS_PROTOCOL {
				return Err(Error::InvalidProtocol(protocol));
			}
			self.has_protocol = true;
		}

		let buf = match self.dr.next()? {
			Some(segment) => AlignedBytes::from_slice(segment),
			None => return Ok(None),
		};

		let footer = match self.dr.next()? {
			Some(segment) => Footer::from_bytes(segment)?,
			None => return Err(Error::Corrupt("footer segment was missing".into())),
		};

		if footer.descriptor != *describe(shape_of::<T>())? {
			return Err(Error::IncompatibleLayout);
		}

		relocate(
			buf,
			Locations {
				main: footer.main,
				pointers: footer.pointers,
			},
		)
		.map(Some)
	}
}

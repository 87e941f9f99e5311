//! Delimited segment framing.
//!
//! Multi-image streams are split into segments by a fixed 16-byte
//! delimiter, chosen to be extremely unlikely to appear in arbitrary data.
//! A writer terminates a segment by emitting the delimiter; the reader
//! scans for it with a single-byte state machine (the delimiter has no
//! repeated prefix, so a mismatch restarts the match at the same byte).

use std::io::{self, Read};

use crate::error::{Error, Result};

/// Marks the end of each segment in homogeneous and heterogeneous streams.
pub const DELIMITER: [u8; 16] = [
	130, 14, 133, 49, 108, 178, 125, 95, 35, 126, 41, 129, 229, 48, 16, 94,
];

const INITIAL_CAPACITY: usize = 16 * 1024;

/// Reads delimited segments from an underlying reader.
///
/// Segments are buffered in full; the buffer starts at 16 KiB, slides live
/// bytes to the front when the tail is reached, and quadruples when full.
pub struct DelimitedReader<R> {
	r: R,
	buf: Vec<u8>,
	/// Start of unconsumed bytes in `buf`.
	begin: usize,
	/// End of valid bytes in `buf`.
	end: usize,
}

impl<R: Read> DelimitedReader<R> {
	pub fn new(r: R) -> Self {
		Self {
			r,
			buf: Vec::new(),
			begin: 0,
			end: 0,
		}
	}

	/// Return the next segment: the bytes up to (and excluding) the next
	/// delimiter, which is consumed.
	///
	/// Returns `Ok(None)` at end of stream. EOF in the middle of a segment
	/// (including inside the delimiter itself) is
	/// [`Error::UnexpectedEof`].
	///
	/// The returned slice is only valid until the next call.
	pub fn next(&mut self) -> Result<Option<&[u8]>> {
		let mut state = 0;
		// Bytes already scanned, relative to `begin`; nothing before this
		// point can hold the delimiter's final byte.
		let mut scanned = 0;
		loop {
			if let Some((seg_end, next_begin)) = self.scan(&mut state, &mut scanned) {
				let seg_begin = self.begin;
				self.begin = next_begin;
				return Ok(Some(&self.buf[seg_begin..seg_end]));
			}

			if !self.fill()? {
				return if scanned == 0 {
					Ok(None)
				} else {
					Err(Error::UnexpectedEof)
				};
			}
		}
	}

	/// Read bytes that precede the delimited segments (protocol words).
	///
	/// Must be called before the first `next`, while nothing is buffered.
	pub fn read_exact(&mut self, out: &mut [u8]) -> io::Result<()> {
		debug_assert_eq!(self.begin, self.end);
		self.r.read_exact(out)
	}

	/// Scan unscanned buffered bytes for the delimiter. On a match,
	/// returns the segment's end index and the index just past the
	/// delimiter (both absolute).
	fn scan(&mut self, state: &mut usize, scanned: &mut usize) -> Option<(usize, usize)> {
		for i in self.begin + *scanned..self.end {
			let b = self.buf[i];
			if b != DELIMITER[*state] {
				*state = 0;
			}
			// Not `else`: `state` was updated above.
			if b == DELIMITER[*state] {
				*state += 1;
				if *state == DELIMITER.len() {
					return Some((i + 1 - DELIMITER.len(), i + 1));
				}
			}
		}
		*scanned = self.end - self.begin;
		None
	}

	/// Make room and read more bytes. Returns `false` at EOF.
	fn fill(&mut self) -> Result<bool> {
		if self.buf.is_empty() {
			self.buf = vec![0; INITIAL_CAPACITY];
		} else if self.end == self.buf.len() {
			if self.begin > 0 {
				// Slide live bytes to the front.
				self.buf.copy_within(self.begin..self.end, 0);
				self.end -= self.begin;
				self.begin = 0;
			} else {
				let mut grown = vec![0; self.buf.len() * 4];
				grown[..self.end].copy_from_slice(&self.buf[..self.end]);
				self.buf = grown;
			}
		}

		let n = self.r.read(&mut self.buf[self.end..])?;
		self.end += n;
		Ok(n > 0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn reader(bytes: &[u8]) -> DelimitedReader<&[u8]> {
		DelimitedReader::new(bytes)
	}

	fn delimited(segments: &[&[u8]]) -> Vec<u8> {
		let mut out = Vec::new();
		for segment in segments {
			out.extend_from_slice(segment);
			out.extend_from_slice(&DELIMITER);
		}
		out
	}

	#[test]
	fn segments_are_returned_exactly() {
		let stream = delimited(&[b"abc", b"", b"defg"]);
		let mut r = reader(&stream);
		assert_eq!(r.next().unwrap(), Some(&b"abc"[..]));
		assert_eq!(r.next().unwrap(), Some(&b""[..]));
		assert_eq!(r.next().unwrap(), Some(&b"defg"[..]));
		assert_eq!(r.next().unwrap(), None);
	}

	#[test]
	fn empty_segment_is_distinct_from_end_of_stream() {
		let stream = delimited(&[b""]);
		let mut r = reader(&stream);
		assert_eq!(r.next().unwrap(), Some(&b""[..]));
		assert_eq!(r.next().unwrap(), None);

		let mut r = reader(b"");
		assert_eq!(r.next().unwrap(), None);
	}

	#[test]
	fn unterminated_segment_is_unexpected_eof() {
		let mut r = reader(b"abc");
		assert!(matches!(r.next(), Err(Error::UnexpectedEof)));
	}

	#[test]
	fn partial_delimiter_at_eof_is_unexpected_eof() {
		let mut stream = delimited(&[b"abc"]);
		stream.truncate(stream.len() - 1);
		let mut r = reader(&stream);
		assert!(matches!(r.next(), Err(Error::UnexpectedEof)));
	}

	#[test]
	fn delimiter_prefix_inside_data_does_not_split() {
		// A near-delimiter (first 15 bytes) followed by ordinary data.
		let mut segment = DELIMITER[..15].to_vec();
		segment.push(0);
		segment.extend_from_slice(b"tail");
		let stream = delimited(&[&segment]);
		let mut r = reader(&stream);
		assert_eq!(r.next().unwrap(), Some(&segment[..]));
	}

	#[test]
	fn segments_larger_than_the_initial_buffer() {
		let big: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
		let stream = delimited(&[&big, b"next"]);
		let mut r = reader(&stream);
		assert_eq!(r.next().unwrap(), Some(&big[..]));
		assert_eq!(r.next().unwrap(), Some(&b"next"[..]));
		assert_eq!(r.next().unwrap(), None);
	}

	#[test]
	fn read_exact_consumes_a_prefix() {
		let mut stream = 7i32.to_le_bytes().to_vec();
		stream.extend_from_slice(&delimited(&[b"seg"]));
		let mut r = reader(&stream);

		let mut word = [0u8; 4];
		r.read_exact(&mut word).unwrap();
		assert_eq!(i32::from_le_bytes(word), 7);
		assert_eq!(r.next().unwrap(), Some(&b"seg"[..]));
	}
}

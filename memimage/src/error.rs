use std::io;

use thiserror::Error;

/// Errors arising while writing or reading memory images.
///
/// Encode-side failures leave the output stream unusable; callers must
/// discard it. Decode-side failures leave the input stream positioned at the
/// point of failure and it should not be trusted for further decoding.
#[derive(Debug, Error)]
pub enum Error {
	/// Underlying reader/writer error, propagated verbatim.
	#[error("i/o error: {0}")]
	Io(#[from] io::Error),

	/// The value being encoded contains a type which has no stable in-memory
	/// representation (map, channel, function value, or open dynamic type).
	#[error("cannot serialize objects of {0} kind")]
	UnsupportedKind(&'static str),

	/// Stream began with an unrecognized protocol word.
	#[error("invalid protocol {0}")]
	InvalidProtocol(i32),

	/// The object on the wire has an in-memory layout that is not compatible
	/// with the requested type.
	#[error("attempted to load data with incompatible layout")]
	IncompatibleLayout,

	/// A homogeneous encoder or decoder was handed a different type than the
	/// one the stream was locked to on the first call.
	#[error("each call must pass the same type, but the type changed mid-stream")]
	TypeChangedMidStream,

	/// A footer offset fell outside the image, a segment could not be
	/// decoded, or the stream structure was otherwise malformed.
	#[error("corrupt stream: {0}")]
	Corrupt(String),

	/// EOF arrived in the middle of a segment.
	#[error("got EOF before finding the delimiter")]
	UnexpectedEof,
}

pub type Result<T> = std::result::Result<T, Error>;

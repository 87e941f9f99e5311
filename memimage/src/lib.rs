//! Serialize reference-linked object graphs as relocatable memory images.
//!
//! An encode call walks the graph reachable from a value — through raw
//! pointers, [`RawStr`] string headers, and [`RawSlice`] slice headers —
//! and writes a byte image that reproduces its live in-memory
//! representation, with every pointer word rewritten as an offset into the
//! image and recorded in a relocation table. Decoding loads the image into
//! one contiguous buffer, adds the buffer's base address to each recorded
//! pointer word, and hands back the root. No per-field parsing happens:
//! decode cost is proportional to image size plus pointer count, whatever
//! the graph's shape.
//!
//! Shared nodes stay shared (deduplicated by source address), cycles stay
//! cycles, nil pointers stay nil. Images are tied to the machine that
//! wrote them: word size, endianness, and struct layout must match, and a
//! structural [`Descriptor`] gates decoding in the delimited stream modes
//! so a layout change is a hard [`Error::IncompatibleLayout`], never a
//! migration.
//!
//! Three container formats share the core:
//!
//! * [`encode`] / [`decode`] — one self-contained image, no framing.
//! * [`Encoder`] / [`Decoder`] — a delimited stream of images of one
//!   type, descriptor written once.
//! * [`HeterogeneousEncoder`] / [`HeterogeneousDecoder`] — a delimited
//!   stream where each message carries its own descriptor.
//!
//! # Example
//!
//! ```
//! use memimage::{RawStr, Reflect};
//!
//! #[derive(Reflect)]
//! struct Entry {
//! 	name: RawStr,
//! 	score: i64,
//! 	next: *const Entry,
//! }
//!
//! let second = Entry {
//! 	name: RawStr::from_ref("second"),
//! 	score: 2,
//! 	next: std::ptr::null(),
//! };
//! let first = Entry {
//! 	name: RawStr::from_ref("first"),
//! 	score: 1,
//! 	next: &second,
//! };
//!
//! let mut bytes = Vec::new();
//! // SAFETY: `first`'s pointers and headers all view live objects.
//! unsafe { memimage::encode(&mut bytes, &first).unwrap() };
//!
//! // SAFETY: the stream was encoded as an `Entry` on this machine.
//! let graph = unsafe { memimage::decode::<_, Entry>(&bytes[..]).unwrap() };
//! assert_eq!(graph.score, 1);
//! assert_eq!(unsafe { graph.name.as_str() }, "first");
//! let next = unsafe { &*graph.next };
//! assert_eq!(next.score, 2);
//! ```
//!
//! # Safety
//!
//! Encoding reads memory through raw pointers and decoding reinterprets
//! bytes as typed objects, so the entry points are `unsafe`: the encoder
//! trusts that every reachable pointer word is live and correctly typed,
//! and the decoder trusts that the stream was produced by the matching
//! encode on the same platform. The descriptor gate catches layout
//! drift between writer and reader; it does not validate image contents.

// Lets the derive macro's `::memimage::...` paths resolve inside this
// crate's own tests.
extern crate self as memimage;

#[cfg(feature = "derive")]
pub use memimage_derive::Reflect;

mod error;
pub use error::{Error, Result};

mod shape;
pub use shape::{shape_of, Field, Kind, Reflect, Shape, ShapeFn};

mod raw;
pub use raw::{RawSlice, RawStr};

mod shape_impls;

mod descriptor;
pub use descriptor::{describe, Descriptor};

mod delim;
pub use delim::{DelimitedReader, DELIMITER};

mod relocate;
pub use relocate::Graph;

mod single;
pub use single::{decode, encode};

mod homogeneous;
pub use homogeneous::{Decoder, Encoder};

mod heterogeneous;
pub use heterogeneous::{HeterogeneousDecoder, HeterogeneousEncoder};

mod buffer;
mod encode;
mod inspect;
pub mod util;

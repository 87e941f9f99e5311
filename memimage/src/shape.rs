use std::{
	any::TypeId,
	collections::HashMap,
	sync::{Mutex, OnceLock, PoisonError},
};

use crate::{descriptor::Descriptor, inspect::PtrSlot};

/// Function returning the shape of a type.
///
/// Shapes refer to their element and field types through `ShapeFn` rather
/// than direct references, so a self-referential type (e.g. a tree node
/// holding a pointer to its own type) can be built without recursing.
pub type ShapeFn = fn() -> &'static Shape;

/// Runtime description of a type's in-memory representation.
///
/// A `Shape` is built once per type by [`Reflect::build`] and cached for the
/// lifetime of the process. The pointer finder, descriptor builder, and
/// image encoder all drive off it.
#[derive(Debug)]
pub struct Shape {
	/// `TypeId` of the described type. Key for the process-wide cache.
	pub id: TypeId,
	/// Type name, for error messages only.
	pub name: &'static str,
	/// Size in bytes, as per `mem::size_of`.
	pub size: usize,
	/// Alignment in bytes, as per `mem::align_of`.
	pub align: usize,
	pub kind: Kind,
}

/// The kind of a type, with element/field shapes where applicable.
#[derive(Debug)]
pub enum Kind {
	Bool,
	/// Signed integer. Width is `Shape::size`.
	Int,
	/// Unsigned integer. Width is `Shape::size`.
	Uint,
	/// Floating point. Width is `Shape::size`.
	Float,
	/// Raw pointer to a single value of the element type.
	Ptr(ShapeFn),
	/// A [`RawStr`] header: pointer + length.
	///
	/// [`RawStr`]: crate::RawStr
	Str,
	/// A [`RawSlice`] header: pointer + length + capacity over the element
	/// type.
	///
	/// [`RawSlice`]: crate::RawSlice
	Slice(ShapeFn),
	/// Fixed-size array `[elem; len]`.
	Array { elem: ShapeFn, len: usize },
	/// Struct with named fields at fixed offsets.
	Record(Vec<Field>),
	/// A kind that cannot be serialized (map, channel, function value, open
	/// dynamic type). Encoding a value containing one fails with
	/// [`Error::UnsupportedKind`].
	///
	/// [`Error::UnsupportedKind`]: crate::Error::UnsupportedKind
	Unsupported(&'static str),
}

/// One named field of a record shape.
#[derive(Debug)]
pub struct Field {
	/// The field's declared name, or its `#[memimage(rename = "...")]`
	/// override.
	pub name: &'static str,
	/// Byte offset from the start of the record.
	pub offset: usize,
	pub shape: ShapeFn,
}

/// Types whose in-memory representation can be described by a [`Shape`].
///
/// Implemented for scalars, raw pointers, fixed arrays, [`RawStr`] /
/// [`RawSlice`], and any struct carrying `#[derive(Reflect)]`.
///
/// # Safety
///
/// `build` must return a shape that exactly describes `Self`'s in-memory
/// representation: size, alignment, and the offset and type of every field.
/// The image encoder reads raw memory through this description; a shape
/// that misdescribes the layout reads out of bounds.
///
/// `build` must not itself call [`shape_of`] (shapes of element and field
/// types are captured as [`ShapeFn`] function pointers, not resolved
/// values).
///
/// [`RawStr`]: crate::RawStr
/// [`RawSlice`]: crate::RawSlice
pub unsafe trait Reflect: 'static {
	/// Construct the shape of `Self`. Called at most once per process;
	/// use [`shape_of`] to get the cached result.
	fn build() -> Shape;
}

/// Process-wide memoization cache shared by the shape registry, the pointer
/// finder, and the descriptor builder. Entries are leaked: they live until
/// process teardown.
#[derive(Default)]
pub(crate) struct TypeCache {
	shapes: HashMap<TypeId, &'static Shape>,
	pub(crate) pointers: HashMap<TypeId, &'static [PtrSlot]>,
	pub(crate) descriptors: HashMap<TypeId, &'static Descriptor>,
}

static CACHE: OnceLock<Mutex<TypeCache>> = OnceLock::new();

/// Run `f` with the cache locked.
///
/// Callers must not re-enter `with_cache` from within `f`; compute outside
/// the lock and use `f` only for lookups and inserts.
pub(crate) fn with_cache<R>(f: impl FnOnce(&mut TypeCache) -> R) -> R {
	let mutex = CACHE.get_or_init(|| Mutex::new(TypeCache::default()));
	let mut cache = mutex.lock().unwrap_or_else(PoisonError::into_inner);
	f(&mut cache)
}

/// Get the cached shape of `T`, building it on first sight.
pub fn shape_of<T: Reflect>() -> &'static Shape {
	let id = TypeId::of::<T>();
	if let Some(shape) = with_cache(|cache| cache.shapes.get(&id).copied()) {
		return shape;
	}

	// Built outside the lock. Two threads may race to build the same shape;
	// the loser's copy stays leaked and unused.
	let shape: &'static Shape = Box::leak(Box::new(T::build()));
	with_cache(|cache| *cache.shapes.entry(id).or_insert(shape))
}

//! `Reflect` implementations for standard types.
//!
//! The encodable universe is scalars, raw pointers, fixed arrays, and the
//! crate's own header types ([`RawStr`] / [`RawSlice`]). Owning containers
//! (`Box`, `Vec`, `String`) and references are deliberately absent: a
//! decoded graph aliases the decode buffer, and dropping or reborrowing
//! through such types there would be unsound.
//!
//! Map-like, channel-like, function-value, and open dynamic types get
//! `Unsupported` shapes instead of no impl at all, so a struct containing
//! one still derives — and encoding it fails with
//! [`Error::UnsupportedKind`], at the point the field is actually walked.
//!
//! [`RawStr`]: crate::RawStr
//! [`RawSlice`]: crate::RawSlice
//! [`Error::UnsupportedKind`]: crate::Error::UnsupportedKind

use std::{
	any::{type_name, Any, TypeId},
	collections::{BTreeMap, HashMap},
	mem,
	sync::mpsc,
};

use crate::{
	shape::{Kind, Reflect, Shape},
	shape_of,
};

macro_rules! impl_scalar {
	($($ty:ty => $kind:expr,)*) => {
		$(
			unsafe impl Reflect for $ty {
				fn build() -> Shape {
					Shape {
						id: TypeId::of::<Self>(),
						name: type_name::<Self>(),
						size: mem::size_of::<Self>(),
						align: mem::align_of::<Self>(),
						kind: $kind,
					}
				}
			}
		)*
	};
}

impl_scalar! {
	bool => Kind::Bool,
	i8 => Kind::Int,
	i16 => Kind::Int,
	i32 => Kind::Int,
	i64 => Kind::Int,
	i128 => Kind::Int,
	isize => Kind::Int,
	u8 => Kind::Uint,
	u16 => Kind::Uint,
	u32 => Kind::Uint,
	u64 => Kind::Uint,
	u128 => Kind::Uint,
	usize => Kind::Uint,
	f32 => Kind::Float,
	f64 => Kind::Float,
}

unsafe impl<T: Reflect> Reflect for *const T {
	fn build() -> Shape {
		Shape {
			id: TypeId::of::<Self>(),
			name: type_name::<Self>(),
			size: mem::size_of::<Self>(),
			align: mem::align_of::<Self>(),
			kind: Kind::Ptr(shape_of::<T>),
		}
	}
}

unsafe impl<T: Reflect> Reflect for *mut T {
	fn build() -> Shape {
		Shape {
			id: TypeId::of::<Self>(),
			name: type_name::<Self>(),
			size: mem::size_of::<Self>(),
			align: mem::align_of::<Self>(),
			kind: Kind::Ptr(shape_of::<T>),
		}
	}
}

unsafe impl<T: Reflect, const N: usize> Reflect for [T; N] {
	fn build() -> Shape {
		Shape {
			id: TypeId::of::<Self>(),
			name: type_name::<Self>(),
			size: mem::size_of::<Self>(),
			align: mem::align_of::<Self>(),
			kind: Kind::Array {
				elem: shape_of::<T>,
				len: N,
			},
		}
	}
}

macro_rules! impl_unsupported {
	($($(#[$meta:meta])* impl $(<$($param:ident),+>)? for $ty:ty => $what:expr;)*) => {
		$(
			$(#[$meta])*
			unsafe impl $(<$($param: 'static),+>)? Reflect for $ty {
				fn build() -> Shape {
					Shape {
						id: TypeId::of::<Self>(),
						name: type_name::<Self>(),
						size: mem::size_of::<Self>(),
						align: mem::align_of::<Self>(),
						kind: Kind::Unsupported($what),
					}
				}
			}
		)*
	};
}

impl_unsupported! {
	impl<K, V> for HashMap<K, V> => "map";
	impl<K, V> for BTreeMap<K, V> => "map";
	impl<T> for mpsc::Sender<T> => "chan";
	impl<T> for mpsc::Receiver<T> => "chan";
	impl for (fn()) => "func";
	impl for Box<dyn Any> => "interface";
}

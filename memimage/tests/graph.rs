//! Graph-shape preservation: sharing, cycles, alignment, nil.

use std::ptr;

use memimage::{decode, encode, RawSlice, RawStr, Reflect};

fn round_trip<T: Reflect>(value: &T) -> memimage::Graph<T> {
	let mut bytes = Vec::new();
	unsafe { encode(&mut bytes, value).unwrap() };
	unsafe { decode(&bytes[..]).unwrap() }
}

#[derive(Reflect)]
struct ByteAndInt {
	b: *const u8,
	i: *const i64,
}

#[test]
fn referents_are_aligned_for_their_types() {
	let b: u8 = 3;
	let i: i64 = 4;
	let src = ByteAndInt { b: &b, i: &i };

	let graph = round_trip(&src);
	assert_eq!(unsafe { *graph.b }, 3);
	assert_eq!(unsafe { *graph.i }, 4);

	// The byte referent is 1-aligned trivially; the i64 referent must be
	// 8-aligned even though it was scheduled right after a 1-byte object.
	assert_eq!(graph.b as usize % std::mem::align_of::<u8>(), 0);
	assert_eq!(graph.i as usize % std::mem::align_of::<i64>(), 0);
}

#[derive(Reflect)]
struct Leaf {
	value: u32,
}

#[derive(Reflect)]
struct SelfRef {
	a: i64,
	c: RawSlice<*const Leaf>,
	f: *const Leaf,
	g: *const SelfRef,
}

#[test]
fn self_reference_points_at_the_decoded_root() {
	let leaf = Leaf { value: 7 };
	let c_backing: [*const Leaf; 1] = [&leaf];
	let mut src = SelfRef {
		a: 5,
		c: RawSlice::from_ref(&c_backing[..]),
		f: &leaf,
		g: ptr::null(),
	};
	let root: *const SelfRef = &src;
	src.g = root;

	let mut graph = round_trip(&src);
	assert!(ptr::eq(graph.g, graph.as_ptr()));

	// Aliasing is observable through mutation.
	graph.a = 42;
	assert_eq!(unsafe { (*graph.g).a }, 42);
}

#[derive(Reflect)]
struct Ring {
	id: u8,
	next: *const Ring,
}

#[test]
fn two_node_cycle_is_reproduced() {
	let mut a = Ring {
		id: 1,
		next: ptr::null(),
	};
	let b = Ring { id: 2, next: &a };
	a.next = &b;

	let graph = round_trip(&a);
	let decoded_b = unsafe { &*graph.next };
	assert_eq!(decoded_b.id, 2);
	// ...and b's next closes the cycle back to the decoded root.
	assert!(ptr::eq(decoded_b.next, graph.as_ptr()));
}

#[derive(Reflect)]
struct Shared {
	w: RawStr,
	x: *const RawStr,
}

#[derive(Reflect)]
struct Holder {
	c: RawSlice<Shared>,
	d: RawSlice<*const Shared>,
	e: *const RawSlice<Shared>,
	f: *const Shared,
}

#[test]
fn shared_nodes_decode_to_one_object() {
	let hello = RawStr::from_ref("hello");
	let u = Shared { w: hello, x: &hello };
	let c_backing = [Shared { w: u.w, x: u.x }];
	let d_backing: [*const Shared; 1] = [&u];
	let mut src = Holder {
		c: RawSlice::from_ref(&c_backing[..]),
		d: RawSlice::from_ref(&d_backing[..]),
		e: ptr::null(),
		f: &u,
	};
	src.e = &src.c;

	let graph = round_trip(&src);

	let c = unsafe { graph.c.as_slice() };
	assert_eq!(unsafe { c[0].w.as_str() }, "hello");

	let d = unsafe { graph.d.as_slice() };
	let via_d = unsafe { &*d[0] };
	assert_eq!(unsafe { via_d.w.as_str() }, "hello");
	assert_eq!(unsafe { (*via_d.x).as_str() }, "hello");

	// `d[0]` and `f` aliased one object in the source, so they alias one
	// object in the output.
	assert!(ptr::eq(d[0], graph.f));

	// `e` pointed at the `c` header inside the root; its copy still views
	// the same single element as `c`.
	let e = unsafe { &*graph.e };
	assert_eq!(e.len(), 1);
	assert!(ptr::eq(e.as_ptr(), graph.c.as_ptr()));

	// Both headers viewed the same five bytes, so they share one copy in
	// the image.
	assert!(ptr::eq(c[0].w.as_ptr(), unsafe { (*via_d.x).as_ptr() }));
}

#[derive(Reflect)]
struct Nilly {
	p: *const i64,
	s: RawStr,
	v: RawSlice<u16>,
	empty_s: RawStr,
	empty_v: RawSlice<u16>,
}

#[test]
fn nil_and_empty_are_preserved_distinctly() {
	let src = Nilly {
		p: ptr::null(),
		s: RawStr::nil(),
		v: RawSlice::nil(),
		empty_s: RawStr::from_ref(""),
		empty_v: RawSlice::from_ref(&[][..]),
	};

	let graph = round_trip(&src);
	assert!(graph.p.is_null());
	assert!(graph.s.is_nil());
	assert!(graph.v.is_nil());

	// Empty is non-nil: the data pointer survives as a live pointer into
	// the buffer with length zero.
	assert!(!graph.empty_s.is_nil());
	assert!(graph.empty_s.is_empty());
	assert!(!graph.empty_v.is_nil());
	assert!(graph.empty_v.is_empty());
}

#[derive(Reflect)]
struct WithArray {
	names: [RawStr; 3],
	pad: u8,
	values: [*const i32; 2],
}

#[test]
fn arrays_of_pointers_round_trip() {
	let (x, y) = (10, 20);
	let src = WithArray {
		names: [
			RawStr::from_ref("one"),
			RawStr::nil(),
			RawStr::from_ref("three"),
		],
		pad: 9,
		values: [&x, &y],
	};

	let graph = round_trip(&src);
	assert_eq!(unsafe { graph.names[0].as_str() }, "one");
	assert!(graph.names[1].is_nil());
	assert_eq!(unsafe { graph.names[2].as_str() }, "three");
	assert_eq!(graph.pad, 9);
	assert_eq!(unsafe { *graph.values[0] }, 10);
	assert_eq!(unsafe { *graph.values[1] }, 20);
}

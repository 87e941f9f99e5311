//! Types with no stable in-memory representation are refused at encode
//! time, before anything reaches the stream.

use std::{
	any::Any,
	collections::{BTreeMap, HashMap},
	sync::mpsc,
};

use memimage::{encode, Error, HeterogeneousEncoder, RawStr, Reflect};

fn refuse<T: Reflect>(value: &T, kind: &'static str) {
	let mut bytes = Vec::new();
	let result = unsafe { encode(&mut bytes, value) };
	assert!(
		matches!(result, Err(Error::UnsupportedKind(k)) if k == kind),
		"expected refusal of {kind} kind"
	);
	assert!(bytes.is_empty(), "nothing may be written before refusal");
}

#[test]
fn maps_are_refused() {
	refuse(&HashMap::<u32, u32>::new(), "map");
	refuse(&BTreeMap::<u32, u32>::new(), "map");

	#[derive(Reflect)]
	struct HasMap {
		name: RawStr,
		lookup: HashMap<u64, u64>,
	}

	refuse(
		&HasMap {
			name: RawStr::from_ref("x"),
			lookup: HashMap::new(),
		},
		"map",
	);
}

#[test]
fn channels_are_refused() {
	let (tx, rx) = mpsc::channel::<u8>();
	refuse(&tx, "chan");
	refuse(&rx, "chan");
}

#[test]
fn function_values_are_refused() {
	fn noop() {}

	#[derive(Reflect)]
	struct HasCallback {
		cb: fn(),
	}

	refuse(&HasCallback { cb: noop }, "func");
}

#[test]
fn open_dynamic_values_are_refused() {
	let value: Box<dyn Any> = Box::new(3u32);
	refuse(&value, "interface");
}

#[test]
fn refusal_also_gates_descriptor_bearing_streams() {
	#[derive(Reflect)]
	struct HasMap {
		lookup: HashMap<u64, u64>,
	}

	let mut bytes = Vec::new();
	let mut encoder = HeterogeneousEncoder::new(&mut bytes);
	let result = unsafe {
		encoder.encode(&HasMap {
			lookup: HashMap::new(),
		})
	};
	assert!(matches!(result, Err(Error::UnsupportedKind("map"))));

	drop(encoder);
	assert!(bytes.is_empty(), "refusal must precede the protocol word");
}

use syn::{parse_macro_input, Data, DeriveInput};

mod structs;
use structs::derive_struct;

/// Derive `memimage::Reflect` for a struct with named fields.
///
/// A field's external name in type descriptors defaults to its declared
/// name and can be overridden with `#[memimage(rename = "...")]`. All
/// other field attributes are ignored.
#[proc_macro_derive(Reflect, attributes(memimage))]
pub fn reflect(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	reflect_impl(input).into()
}

fn reflect_impl(input: DeriveInput) -> proc_macro2::TokenStream {
	match input.data {
		Data::Struct(data) => derive_struct(data, input.ident, input.generics),
		Data::Enum(_) => panic!("`Reflect` cannot be derived for enums"),
		Data::Union(_) => panic!("`Reflect` cannot be derived for unions"),
	}
}

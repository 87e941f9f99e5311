use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::{
	parse_quote, spanned::Spanned, DataStruct, Field, Fields, FieldsNamed, GenericParam, Generics,
	Ident, Lit, LitStr, Meta, MetaNameValue, NestedMeta,
};

pub fn derive_struct(data: DataStruct, ident: Ident, generics: Generics) -> TokenStream {
	let field_exprs: Vec<TokenStream> = match data.fields {
		Fields::Named(fields) => get_named_field_exprs(fields),
		Fields::Unit => Vec::new(),
		Fields::Unnamed(_) => panic!("`Reflect` cannot be derived for tuple structs"),
	};

	// Every type parameter must itself be reflectable for field shapes to
	// resolve.
	let mut generics_for_impl = generics.clone();
	for param in &mut generics_for_impl.params {
		if let GenericParam::Type(type_param) = param {
			type_param.bounds.push(parse_quote!(::memimage::Reflect));
		}
	}

	let (impl_generics, _, _) = generics_for_impl.split_for_impl();
	let (_, type_generics, where_clause) = generics.split_for_impl();

	quote! {
		#[automatically_derived]
		unsafe impl #impl_generics ::memimage::Reflect for #ident #type_generics #where_clause {
			fn build() -> ::memimage::Shape {
				::memimage::Shape {
					id: ::core::any::TypeId::of::<Self>(),
					name: ::core::any::type_name::<Self>(),
					size: ::core::mem::size_of::<Self>(),
					align: ::core::mem::align_of::<Self>(),
					kind: ::memimage::Kind::Record(::std::vec![#(#field_exprs),*]),
				}
			}
		}
	}
}

fn get_named_field_exprs(fields: FieldsNamed) -> Vec<TokenStream> {
	fields
		.named
		.iter()
		.map(get_named_field_expr)
		.collect()
}

fn get_named_field_expr(field: &Field) -> TokenStream {
	let field_ident = field.ident.as_ref().expect("Missing field name");
	let field_ty = &field.ty;

	let name = match get_rename(field) {
		Some(rename) => rename,
		None => LitStr::new(&field_ident.to_string(), field_ident.span()),
	};

	quote_spanned! {field.span()=>
		::memimage::Field {
			name: #name,
			offset: ::core::mem::offset_of!(Self, #field_ident),
			shape: ::memimage::shape_of::<#field_ty>,
		}
	}
}

/// Extract the name override from a field's `#[memimage(rename = "...")]`
/// attribute, if it carries one.
fn get_rename(field: &Field) -> Option<LitStr> {
	let mut rename = None;

	for attr in &field.attrs {
		if !attr.path.is_ident("memimage") {
			continue;
		}

		let nested = match attr.parse_meta() {
			Ok(Meta::List(list)) => list.nested,
			_ => panic!("Expected `#[memimage(rename = \"ExternalName\")]`"),
		};

		for item in nested {
			match item {
				NestedMeta::Meta(Meta::NameValue(MetaNameValue {
					path,
					lit: Lit::Str(value),
					..
				})) if path.is_ident("rename") => {
					if rename.replace(value).is_some() {
						panic!("Field has more than one `rename`");
					}
				}
				_ => panic!("Expected `#[memimage(rename = \"ExternalName\")]`"),
			}
		}
	}

	rename
}

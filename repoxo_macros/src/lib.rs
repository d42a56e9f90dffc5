#![forbid(unsafe_code)]

use heck::ToSnakeCase;
use proc_macro::{
	Span,
	TokenStream,
};
use proc_macro_crate::FoundCrate;
use quote::quote;
use syn::{
	parse_macro_input,
	spanned::Spanned,
	Attribute,
	Data,
	DeriveInput,
	Error,
	Fields,
	Lit,
	LitStr,
	Meta,
	MetaList,
	NestedMeta,
};

fn repoxo_root() -> proc_macro2::TokenStream {
	match proc_macro_crate::crate_name("repoxo") {
		Ok(FoundCrate::Itself) => quote!(repoxo),
		Ok(FoundCrate::Name(name)) => {
			let ident = syn::Ident::new(&name, Span::call_site().into());
			quote!(#ident)
		}
		Err(_) => quote!(repoxo),
	}
}

#[derive(Clone, Copy)]
enum RelationAttr {
	HasMany,
	HasOne,
	BelongsTo,
}

impl RelationAttr {
	fn from_path(path: &syn::Path) -> Option<Self> {
		if path.is_ident("has_many") {
			Some(Self::HasMany)
		} else if path.is_ident("has_one") {
			Some(Self::HasOne)
		} else if path.is_ident("belongs_to") {
			Some(Self::BelongsTo)
		} else {
			None
		}
	}
}

struct RelationSpec {
	attr:        RelationAttr,
	name:        LitStr,
	target:      LitStr,
	foreign_key: LitStr,
	/// `local_key` for has_* relations, `owner_key` for belongs_to.
	other_key:   Option<LitStr>,
}

#[derive(Default)]
struct ModelAttrs {
	collection:      Option<LitStr>,
	primary_key:     Option<LitStr>,
	application_key: Option<LitStr>,
	validate:        Option<syn::Path>,
	relations:       Vec<RelationSpec>,
}

fn set_once(
	slot: &mut Option<LitStr>,
	nv: &syn::MetaNameValue,
	key: &str,
) -> syn::Result<()> {
	if slot.is_some() {
		return Err(Error::new_spanned(nv, format!("duplicate key `{key}`")));
	}

	match &nv.lit {
		Lit::Str(s) => {
			*slot = Some(s.clone());
			Ok(())
		}
		other => Err(Error::new_spanned(
			other,
			format!("expected string literal: #[repoxo({key} = \"...\")]"),
		)),
	}
}

fn parse_relation(attr: RelationAttr, list: &MetaList) -> syn::Result<RelationSpec> {
	let mut name = None;
	let mut target = None;
	let mut foreign_key = None;
	let mut other_key = None;

	let other_key_name = match attr {
		RelationAttr::BelongsTo => "owner_key",
		_ => "local_key",
	};

	for nested in &list.nested {
		match nested {
			NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("name") => {
				set_once(&mut name, nv, "name")?
			}
			NestedMeta::Meta(Meta::NameValue(nv))
				if nv.path.is_ident("target") =>
			{
				set_once(&mut target, nv, "target")?
			}
			NestedMeta::Meta(Meta::NameValue(nv))
				if nv.path.is_ident("foreign_key") =>
			{
				set_once(&mut foreign_key, nv, "foreign_key")?
			}
			NestedMeta::Meta(Meta::NameValue(nv))
				if nv.path.is_ident(other_key_name) =>
			{
				set_once(&mut other_key, nv, other_key_name)?
			}
			other => {
				return Err(Error::new_spanned(
					other,
					"unknown key in relation attribute",
				));
			}
		}
	}

	let missing = |key: &str| {
		Error::new_spanned(list, format!("relation is missing `{key}`"))
	};

	Ok(RelationSpec {
		attr,
		name: name.ok_or_else(|| missing("name"))?,
		target: target.ok_or_else(|| missing("target"))?,
		foreign_key: foreign_key.ok_or_else(|| missing("foreign_key"))?,
		other_key,
	})
}

fn extract_model_attrs(attrs: &[Attribute]) -> syn::Result<ModelAttrs> {
	let mut out = ModelAttrs::default();

	for attr in attrs {
		if !attr.path.is_ident("repoxo") {
			continue;
		}

		let meta = attr.parse_meta().map_err(|_| {
			Error::new_spanned(attr, "invalid #[repoxo] attribute")
		})?;

		let list = match meta {
			Meta::List(list) => list,
			_ => {
				return Err(Error::new_spanned(
					attr,
					"expected #[repoxo(collection = \"...\")]",
				))
			}
		};

		for nested in list.nested {
			match nested {
				NestedMeta::Meta(Meta::NameValue(nv))
					if nv.path.is_ident("collection") =>
				{
					set_once(&mut out.collection, &nv, "collection")?
				}
				NestedMeta::Meta(Meta::NameValue(nv))
					if nv.path.is_ident("primary_key") =>
				{
					set_once(&mut out.primary_key, &nv, "primary_key")?
				}
				NestedMeta::Meta(Meta::NameValue(nv))
					if nv.path.is_ident("application_key") =>
				{
					set_once(&mut out.application_key, &nv, "application_key")?
				}
				NestedMeta::Meta(Meta::NameValue(nv))
					if nv.path.is_ident("validate") =>
				{
					let mut lit = None;
					set_once(&mut lit, &nv, "validate")?;
					if out.validate.is_some() {
						return Err(Error::new_spanned(
							nv,
							"duplicate key `validate`",
						));
					}
					if let Some(lit) = lit {
						out.validate = Some(lit.parse()?);
					}
				}
				NestedMeta::Meta(Meta::List(list)) => {
					let Some(kind) = RelationAttr::from_path(&list.path) else {
						return Err(Error::new_spanned(
							list,
							"expected has_many(..), has_one(..) or belongs_to(..)",
						));
					};
					out.relations.push(parse_relation(kind, &list)?);
				}
				NestedMeta::Meta(Meta::NameValue(nv)) => {
					return Err(Error::new_spanned(nv, "unknown key in #[repoxo]"));
				}
				other => {
					return Err(Error::new_spanned(
						other,
						"expected name-value pair",
					));
				}
			}
		}
	}

	Ok(out)
}

fn is_skipped(field: &syn::Field) -> syn::Result<bool> {
	for attr in &field.attrs {
		if !attr.path.is_ident("repoxo") {
			continue;
		}

		match attr.parse_meta()? {
			Meta::List(list) => {
				for nested in &list.nested {
					match nested {
						NestedMeta::Meta(Meta::Path(p)) if p.is_ident("skip") => {
							return Ok(true);
						}
						other => {
							return Err(Error::new_spanned(
								other,
								"unknown field attribute, expected #[repoxo(skip)]",
							));
						}
					}
				}
			}
			other => {
				return Err(Error::new_spanned(other, "expected #[repoxo(skip)]"));
			}
		}
	}

	Ok(false)
}

fn field_name(field: &syn::Field) -> String {
	let ident = field.ident.as_ref().map(|i| i.to_string()).unwrap_or_default();
	ident.trim_start_matches("r#").to_string()
}

#[proc_macro_derive(Model, attributes(repoxo, primary_key))]
pub fn derive_model(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);
	let root = repoxo_root();

	let data = match &input.data {
		Data::Struct(s) => s,
		_ => {
			return Error::new_spanned(&input.ident, "`Model` supports only structs")
				.to_compile_error()
				.into();
		}
	};

	let attrs = match extract_model_attrs(&input.attrs) {
		Ok(a) => a,
		Err(e) => return e.to_compile_error().into(),
	};

	let mut attributes = Vec::new();
	let mut pk_field: Option<String> = None;

	match &data.fields {
		Fields::Named(named) => {
			for field in &named.named {
				let name = field_name(field);

				for attr in &field.attrs {
					if attr.path.is_ident("primary_key") {
						if pk_field.is_some() || attrs.primary_key.is_some() {
							return Error::new(attr.span(), "duplicate #[primary_key]")
								.to_compile_error()
								.into();
						}
						pk_field = Some(name.clone());
					}
				}

				match is_skipped(field) {
					Ok(true) => continue,
					Ok(false) => attributes.push(name),
					Err(e) => return e.to_compile_error().into(),
				}
			}
		}
		Fields::Unit => {}
		other => {
			return Error::new_spanned(other, "`Model` requires named fields")
				.to_compile_error()
				.into();
		}
	}

	let ident = &input.ident;
	let collection = attrs
		.collection
		.map(|l| l.value())
		.unwrap_or_else(|| ident.to_string().to_snake_case());
	let primary_key = attrs
		.primary_key
		.map(|l| l.value())
		.or(pk_field)
		.unwrap_or_else(|| "id".to_string());
	let application_key = attrs
		.application_key
		.map(|l| l.value())
		.unwrap_or_else(|| "id".to_string());

	let relations = attrs.relations.iter().map(|r| {
		let name = &r.name;
		let target = &r.target;
		let foreign_key = &r.foreign_key;

		match r.attr {
			RelationAttr::HasMany => {
				let local = r.other_key.as_ref().map(|l| l.value()).unwrap_or_else(|| primary_key.clone());
				quote! { #root::Relation::has_many(#name, #target, #local, #foreign_key) }
			}
			RelationAttr::HasOne => {
				let local = r.other_key.as_ref().map(|l| l.value()).unwrap_or_else(|| primary_key.clone());
				quote! { #root::Relation::has_one(#name, #target, #local, #foreign_key) }
			}
			RelationAttr::BelongsTo => {
				let owner = r.other_key.as_ref().map(|l| l.value()).unwrap_or_else(|| "id".to_string());
				quote! { #root::Relation::has_one(#name, #target, #foreign_key, #owner) }
			}
		}
	});

	let validate = attrs.validate.map(|path| {
		quote! {
			fn validate(
				record: &#root::Record,
			) -> ::core::result::Result<(), #root::ValidationError> {
				#path(record)
			}
		}
	});

	let (impl_generics, ty_generics, where_clause) =
		input.generics.split_for_impl();

	quote! {
		impl #impl_generics #root::Model for #ident #ty_generics #where_clause {
			const COLLECTION: &'static str = #collection;
			const PRIMARY_KEY: &'static str = #primary_key;
			const APPLICATION_KEY: &'static str = #application_key;
			const ATTRIBUTES: &'static [&'static str] = &[#(#attributes),*];
			const RELATIONS: &'static [#root::Relation] = &[#(#relations),*];

			#validate
		}
	}
	.into()
}

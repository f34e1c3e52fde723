//! Query derive macro implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::ParseStream;
use syn::{DeriveInput, Fields, Ident, LitStr, Type, Visibility, WherePredicate, parse_quote, parse2};

/// Field options parsed from `#[url(...)]` / `#[url_sep(...)]` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UrlFieldOptions {
    /// Primary tag text, kept verbatim; checked when the type is first encoded.
    tag: Option<String>,
    /// Separator tag text, kept verbatim.
    separator: Option<String>,
    /// `#[url(embed)]`
    embed: bool,
}

/// One entry of the generated field table.
struct FieldEntry<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    visible: bool,
    options: UrlFieldOptions,
}

/// Expand the `#[derive(Query)]` macro.
pub fn expand_query_derive(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let name = &input.ident;

    // Only support structs with named fields
    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Query derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Query derive only supports structs",
            ));
        }
    };

    let mut entries = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        entries.push(FieldEntry {
            ident,
            ty: &field.ty,
            visible: matches!(field.vis, Visibility::Public(_)),
            options: parse_url_field_options(&field.attrs)?,
        });
    }

    let defs = entries.iter().map(field_def);
    let arms = entries.iter().enumerate().filter_map(|(index, entry)| field_arm(index, entry));

    let mut generics = input.generics.clone();
    if generics.type_params().next().is_some() {
        let predicates = entries.iter().filter_map(field_bound);
        generics.make_where_clause().predicates.extend(predicates);
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::hitch::Query for #name #ty_generics #where_clause {
            const FIELDS: &'static [::hitch::FieldDef] = &[#(#defs),*];

            fn field(&self, index: usize) -> ::hitch::Field<'_> {
                match index {
                    #(#arms)*
                    _ => ::hitch::Field::Opaque,
                }
            }

            fn directives() -> &'static ::hitch::Directives {
                static CACHE: ::hitch::DirectiveCache = ::hitch::DirectiveCache::new();
                CACHE.get_or_parse(<Self as ::hitch::Query>::FIELDS)
            }
        }

        impl #impl_generics ::hitch::QueryValue for #name #ty_generics #where_clause {
            fn value(&self) -> ::hitch::Value<'_> {
                ::hitch::Value::Struct(self)
            }
        }
    })
}

/// Parse field options from `#[url(...)]` and `#[url_sep(...)]` attributes.
fn parse_url_field_options(attrs: &[syn::Attribute]) -> syn::Result<UrlFieldOptions> {
    let mut options = UrlFieldOptions::default();
    let mut seen_url = false;

    for attr in attrs {
        if attr.path().is_ident("url") {
            if seen_url {
                return Err(syn::Error::new_spanned(attr, "duplicate `url` attribute"));
            }
            seen_url = true;
            attr.parse_args_with(|input: ParseStream<'_>| {
                if input.peek(LitStr) {
                    let tag: LitStr = input.parse()?;
                    options.tag = Some(tag.value());
                } else {
                    let ident: Ident = input.parse()?;
                    if ident != "embed" {
                        return Err(syn::Error::new_spanned(
                            &ident,
                            format!("unknown url option: `{ident}`. Expected a tag string or `embed`"),
                        ));
                    }
                    options.embed = true;
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("url_sep") {
            if options.separator.is_some() {
                return Err(syn::Error::new_spanned(attr, "duplicate `url_sep` attribute"));
            }
            let separator: LitStr = attr.parse_args()?;
            options.separator = Some(separator.value());
        }
    }

    if options.embed && options.separator.is_some() {
        return Err(syn::Error::new(
            proc_macro2::Span::call_site(),
            "`url_sep` cannot be combined with `url(embed)`",
        ));
    }

    Ok(options)
}

/// `::hitch::FieldDef::new("name").tag(..)...` for one field.
fn field_def(entry: &FieldEntry<'_>) -> TokenStream {
    let name = entry.ident.to_string();
    let mut def = quote! { ::hitch::FieldDef::new(#name) };
    if let Some(tag) = &entry.options.tag {
        def = quote! { #def.tag(#tag) };
    }
    if let Some(separator) = &entry.options.separator {
        def = quote! { #def.separator(#separator) };
    }
    if !entry.visible {
        def = quote! { #def.hidden() };
    }
    if entry.options.embed {
        def = quote! { #def.embedded() };
    }
    def
}

/// Match arm exposing a field's value; untagged and private fields stay opaque.
fn field_arm(index: usize, entry: &FieldEntry<'_>) -> Option<TokenStream> {
    if !entry.visible {
        return None;
    }
    let ident = entry.ident;
    if entry.options.embed {
        Some(quote! { #index => ::hitch::Field::Embedded(&self.#ident), })
    } else if entry.options.tag.is_some() {
        Some(quote! { #index => ::hitch::Field::Value(&self.#ident), })
    } else {
        None
    }
}

/// Bound required by a generic field exposed through [`field_arm`].
fn field_bound(entry: &FieldEntry<'_>) -> Option<WherePredicate> {
    if !entry.visible {
        return None;
    }
    let ty = entry.ty;
    if entry.options.embed {
        Some(parse_quote! { #ty: ::hitch::Query })
    } else if entry.options.tag.is_some() {
        Some(parse_quote! { #ty: ::hitch::QueryValue })
    } else {
        None
    }
}

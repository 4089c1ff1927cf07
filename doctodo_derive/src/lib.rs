use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, Ident, LitStr, Token, parse_macro_input,
    spanned::Spanned,
};

/// Implements `doctodo::document::Document` for a struct with named fields.
///
/// The identifier is the field marked `#[document(id)]`, or the field named
/// `id` when no field is marked. Its type must be `doctodo::core::DocumentId`.
/// Wire names for the generated field table follow serde: a field's own
/// `#[serde(rename = "...")]` wins over the container's `rename_all` rule.
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_document(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_document(input: DeriveInput) -> syn::Result<TokenStream2> {
    let rename_rule = serde_rename_all(&input.attrs)?;
    let struct_name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let data_struct = match input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Document can only be derived for structs",
            ));
        }
    };

    let named_fields = match data_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(syn::Error::new(
                struct_name.span(),
                "Document requires named fields",
            ));
        }
    };

    let mut marked_id: Option<Ident> = None;
    let mut named_id: Option<Ident> = None;
    let mut mappings = Vec::<TokenStream2>::new();

    for field in &named_fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new(field.span(), "Document requires named fields"))?;

        if has_id_marker(field)? {
            if marked_id.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "only one field may be marked #[document(id)]",
                ));
            }
            marked_id = Some(ident.clone());
        }

        if ident == "id" {
            named_id = Some(ident.clone());
        }

        let internal = ident.unraw().to_string();
        let wire = match serde_rename(field)? {
            Some(wire) => wire,
            None => rename_rule.map_or_else(|| internal.clone(), |rule| rule.apply(&internal)),
        };
        mappings.push(quote! {
            ::doctodo::document::FieldMapping { field: #internal, wire: #wire }
        });
    }

    let id_ident = marked_id.or(named_id).ok_or_else(|| {
        syn::Error::new(
            struct_name.span(),
            "Document requires a field named `id` or a field marked #[document(id)]",
        )
    })?;

    Ok(quote! {
        impl #impl_generics ::doctodo::document::Document for #struct_name #ty_generics #where_clause {
            const FIELDS: &'static [::doctodo::document::FieldMapping] = &[#(#mappings),*];

            fn id(&self) -> ::doctodo::core::DocumentId {
                self.#id_ident
            }

            fn set_id(&mut self, id: ::doctodo::core::DocumentId) {
                self.#id_ident = id;
            }
        }
    })
}

fn has_id_marker(field: &Field) -> syn::Result<bool> {
    let mut marked = false;
    for attr in &field.attrs {
        if !attr.path().is_ident("document") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                marked = true;
                return Ok(());
            }

            Err(meta.error("Unsupported #[document(...)] option. Supported: id"))
        })?;
    }

    Ok(marked)
}

fn serde_rename(field: &Field) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("rename") {
                return skip_meta_value(meta);
            }

            if meta.input.peek(Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                rename = Some(lit.value());
                return Ok(());
            }

            // rename(serialize = "...", deserialize = "..."): the stored shape is what gets serialized
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("serialize") {
                    let lit: LitStr = inner.value()?.parse()?;
                    rename = Some(lit.value());
                    return Ok(());
                }
                skip_meta_value(inner)
            })
        })?;
    }

    Ok(rename)
}

/// Container-level `rename_all` case conversion, as serde applies it to fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn from_name(name: &str) -> Option<Self> {
        let rule = match name {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        };
        Some(rule)
    }

    /// Converts a snake_case field name
    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => {
                let mut pascal = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => Self::ScreamingSnake.apply(field).replace('_', "-"),
        }
    }
}

fn serde_rename_all(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("rename_all") {
                return skip_meta_value(meta);
            }

            if meta.input.peek(Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                rule = Some(parse_rename_rule(&lit)?);
                return Ok(());
            }

            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("serialize") {
                    let lit: LitStr = inner.value()?.parse()?;
                    rule = Some(parse_rename_rule(&lit)?);
                    return Ok(());
                }
                skip_meta_value(inner)
            })
        })?;
    }

    Ok(rule)
}

fn parse_rename_rule(lit: &LitStr) -> syn::Result<RenameRule> {
    RenameRule::from_name(&lit.value()).ok_or_else(|| {
        syn::Error::new(
            lit.span(),
            format!("unknown rename_all rule `{}`", lit.value()),
        )
    })
}

fn skip_meta_value(meta: ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(skip_meta_value)?;
    }
    Ok(())
}

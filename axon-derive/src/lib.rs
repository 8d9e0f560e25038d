//! Derive macros for AXON stdlib catalog entries.
//!
//! The stdlib registry (`axon::stdlib::base`) wraps a resolved IR node
//! together with catalog metadata (description, category, version). Every
//! wrapper type follows the same shape — an `ir` field plus metadata fields
//! and a `name()` accessor that forwards to the wrapped node. This macro
//! generates that boilerplate so each wrapper only has to declare its
//! fields.
//!
//! # Example
//!
//! ```ignore
//! use axon::stdlib::base::StdlibEntryKind;
//!
//! #[derive(StdlibEntry)]
//! #[stdlib(namespace = "anchors")]
//! struct StdlibAnchor {
//!     ir: IRAnchor,
//!     description: String,
//!     severity: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Error, LitStr};

/// Derive macro implementing the `name()` forwarding accessor and the
/// `NAMESPACE` constant for a stdlib catalog wrapper struct.
///
/// # Attributes
///
/// - `#[stdlib(namespace = "...")]` — required. One of `personas`,
///   `anchors`, `flows`, `tools`.
///
/// The struct must have a field named `ir` whose type exposes a `name`
/// field; the generated `name()` forwards to `self.ir.name`.
#[proc_macro_derive(StdlibEntry, attributes(stdlib))]
pub fn derive_stdlib_entry(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_stdlib_entry_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_stdlib_entry_impl(input: DeriveInput) -> Result<TokenStream2, Error> {
    let name = &input.ident;

    let namespace = parse_namespace_attr(&input)?;

    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let has_ir_field = fields
                    .named
                    .iter()
                    .any(|f| f.ident.as_ref().map(|i| i == "ir").unwrap_or(false));
                if !has_ir_field {
                    return Err(Error::new_spanned(
                        &input.ident,
                        "StdlibEntry requires a field named `ir` holding the wrapped IR node",
                    ));
                }
            }
            _ => {
                return Err(Error::new_spanned(
                    &input.ident,
                    "StdlibEntry can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                &input.ident,
                "StdlibEntry can only be derived for structs",
            ))
        }
    }

    let expanded = quote! {
        impl #name {
            /// Name of the wrapped IR node, used as the registry key.
            pub fn name(&self) -> &str {
                &self.ir.name
            }

            /// Catalog namespace this entry belongs to.
            pub const NAMESPACE: &'static str = #namespace;
        }
    };

    Ok(expanded)
}

fn parse_namespace_attr(input: &DeriveInput) -> Result<String, Error> {
    let mut namespace: Option<String> = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("stdlib") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("namespace") {
                let value: LitStr = meta.value()?.parse()?;
                let v = value.value();
                if !matches!(v.as_str(), "personas" | "anchors" | "flows" | "tools") {
                    return Err(meta.error(
                        "namespace must be one of: personas, anchors, flows, tools",
                    ));
                }
                namespace = Some(v);
                Ok(())
            } else {
                Err(meta.error("unknown stdlib attribute, expected 'namespace'"))
            }
        })?;
    }

    namespace.ok_or_else(|| {
        Error::new_spanned(
            &input.ident,
            "Missing #[stdlib(namespace = \"...\")] attribute",
        )
    })
}

//! Proc macros for ufos: `#[derive(KeyPaths)]`.
//!
//! This crate is not meant to be used directly — enable the `macros` feature on `ufos`.

use proc_macro::TokenStream;

mod key_paths;

/// Derive one `ufos::KeyPath` associated const per named field.
///
/// Each const is named after its field in upper case and shares the field's
/// visibility.
///
/// # Field options
///
/// - `#[key_path(skip)]` — generate nothing for this field
/// - `#[key_path(name = "CONST")]` — use a custom const name
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, KeyPaths)]
/// struct Pair {
///     pub value1: i32,
///     pub value2: i32,
/// }
///
/// cell.observe_key(Pair::VALUE1, &owner, |_, v| println!("value1 = {v}"));
/// ```
#[proc_macro_derive(KeyPaths, attributes(key_path))]
pub fn derive_key_paths(input: TokenStream) -> TokenStream {
    key_paths::derive_impl(input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

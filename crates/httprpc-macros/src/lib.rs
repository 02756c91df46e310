//! Proc macros for httprpc beans.
//!
//! # Available Macros
//!
//! - [`Bean`] - Generate the property table and `Adapt` impl for a struct
//!
//! The generated code refers to `::httprpc_beans`, which re-exports this
//! derive; depend on `httprpc-beans` rather than on this crate directly.

mod bean;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `Bean` and `Adapt` for a struct with named fields.
///
/// Every field becomes a read-only property whose key is the field name in
/// lower camel case (`first_name` becomes `firstName`). Field values are
/// adapted lazily through their own `Adapt` impl, so nested beans, vectors
/// and maps become nested dictionaries and sequences.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `skip` | Do not expose this field |
/// | `rename = "..."` | Use a custom property name |
///
/// # Container Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `property(name = "...", with = "path")` | Add a computed property; `path` must be a `fn(&Self) -> Value<'_>` |
///
/// # Example
///
/// ```ignore
/// use httprpc_beans::{Adapt, Bean, Value};
///
/// #[derive(Bean)]
/// #[bean(property(name = "fullName", with = "Person::full_name"))]
/// struct Person {
///     first_name: String,
///     last_name: String,
///     #[bean(skip)]
///     password_hash: String,
/// }
///
/// impl Person {
///     fn full_name(&self) -> Value<'_> {
///         Value::from(format!("{} {}", self.first_name, self.last_name))
///     }
/// }
/// ```
#[proc_macro_derive(Bean, attributes(bean))]
pub fn bean_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bean::bean_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

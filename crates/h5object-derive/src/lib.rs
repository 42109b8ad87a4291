//! `#[derive(H5Object)]` for the `h5object` crate.
//!
//! Generates the member list, the cached `TypeMeta` and the `ToValue` /
//! `Element` conversions for a struct with named fields. Arrays of a
//! derived type carry its compound writer, so they need no registration.
//!
//! ```ignore
//! #[derive(H5Object)]
//! #[h5(group = "eit", attr(name = "unit", value = "V"))]
//! #[h5(property(name = "duration", get = "Self::duration"))]
//! struct Eit {
//!     #[h5(name = "start_datetime")]
//!     start: String,
//!     #[h5(skip)]
//!     scratch: Vec<u8>,
//!     #[h5(base)]
//!     acquisition: Acquisition,
//! }
//! ```
//!
//! Type-level options: `group`, `skip`, `attr`, `attrs`, `property`.
//! Member options: `name`, `skip`, `attr`, `attrs`, `as_attribute`, and
//! `base` on the field holding the object this one extends.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod expand;

#[proc_macro_derive(H5Object, attributes(h5))]
pub fn derive_h5object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand::derive(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

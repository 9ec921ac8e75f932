//! Derive macro for tagsql
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the `Record` binding table for a struct.
///
/// # Example
///
/// ```ignore
/// use tagsql::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct AdsTagCopy {
///     #[builder("id", omit)]
///     id: i64,
///     #[builder("ad_id")]
///     ad_id: i64,
///     #[builder("content_tag")]
///     content_tag: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[builder("key")]` - Bind the field to a column / parameter key
/// - `#[builder("key", omit)]` - Bind the field but leave it out of INSERT/UPDATE parameters
///
/// Fields without the attribute are ignored. The field kind used for read
/// coercion follows the field type: integers map to `Int`, `String` to
/// `Text`, `f32`/`f64` to `Float`, everything else to `Other`.
#[proc_macro_derive(Record, attributes(builder))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

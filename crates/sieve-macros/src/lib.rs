//! Proc macros for Sieve.
//!
//! - [`Record`] - Expose a struct's fields, relations and computed
//!   attributes to sieve queries

mod record;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `sieve::Record` for a struct with named fields.
///
/// Every field is an attribute unless marked otherwise; its type must be
/// `Clone` and convert into `sieve::Value`.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `skip` | Exclude this field |
/// | `rename = "..."` | Use a custom attribute key |
/// | `relation` | Expose an iterable of records to `$relationMatch` |
///
/// # Struct Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `computed(method, ...)` | Expose zero-argument methods to `$computed` |
///
/// # Generated Code
///
/// 1. Attribute key constants (e.g., `Post::TITLE`, `Post::LIKES`)
/// 2. `Record::get`, plus `Record::computed` and `Record::relation` when used
///
/// # Example
///
/// ```ignore
/// use sieve::{Collection, RawQuery, Record};
///
/// #[derive(Clone, Record)]
/// struct Tag {
///     name: String,
/// }
///
/// #[derive(Record)]
/// #[record(computed(popularity))]
/// struct Post {
///     title: String,
///     likes: u32,
///     #[record(relation)]
///     tags: Vec<Tag>,
///     #[record(skip)]
///     internal_id: u64,
/// }
///
/// impl Post {
///     fn popularity(&self) -> u32 {
///         self.likes * 10
///     }
/// }
///
/// let posts: Collection<Post> = vec![
///     Post { title: "Home".into(), likes: 12, tags: vec![], internal_id: 1 },
/// ]
/// .into_iter()
/// .collect();
///
/// let query = RawQuery::new().gt(Post::LIKES, 10).computed(Post::POPULARITY, 120);
/// assert_eq!(posts.count(&query).unwrap(), 1);
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::record_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

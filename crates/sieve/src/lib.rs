//! Sieve - declarative document-style queries over in-memory collections.
//!
//! Sieve filters, sorts and paginates collections of records using
//! nested-object queries in the style of document databases:
//!
//! - Rich operators: equality, ordering, ranges, membership, sequences,
//!   presence, substrings, patterns, callbacks
//! - Recursive operators over array elements, related records and
//!   computed attributes
//! - Compound blocks (`$and`, `$or`, `$nor`, `$not`) applied in sequence
//! - Stable sorting and limit/offset/page pagination with a pager callback
//! - An explicit per-collection result cache
//!
//! # Quick Start
//!
//! ```rust
//! use sieve::{Collection, Document, QueryOptions, RawQuery, Value};
//!
//! let posts: Collection<Document> = vec![
//!     Document::new().with("title", "Home").with("likes", 12).with("colors", vec!["red", "yellow"]),
//!     Document::new().with("title", "About").with("likes", 2).with("colors", vec!["red"]),
//!     Document::new().with("title", "Contact").with("likes", 20).with("colors", vec!["blue"]),
//! ]
//! .into_iter()
//! .collect();
//!
//! let query = RawQuery::new()
//!     .and(RawQuery::new().gt("likes", 5))
//!     .or(RawQuery::new().contains("colors", "yellow").like("title", "Cont"));
//!
//! let options = QueryOptions::new().sort_by_key("likes").limit(10);
//! let results = posts.query_with(&query, &options).unwrap();
//!
//! assert_eq!(results.len(), 2);
//! assert_eq!(results[1].field("title"), Some(&Value::from("Contact")));
//! ```
//!
//! The same query can be written as JSON:
//!
//! ```rust
//! use sieve::RawQuery;
//!
//! let query: RawQuery = r#"{
//!     "$and": {"likes": {"$gt": 5}},
//!     "$or": {"colors": {"$contains": "yellow"}, "title": {"$like": "Cont"}}
//! }"#
//! .parse()
//! .unwrap();
//! assert_eq!(query.blocks().count(), 2);
//! ```
//!
//! # Query Semantics
//!
//! - A query without compound blocks is one implicit `$and` over its
//!   attribute entries. The empty query matches everything.
//! - Compound blocks run left to right, each narrowing the survivors of
//!   the previous one. Attribute entries beside compound blocks are
//!   ignored.
//! - When one attribute carries several operators, the last one with a
//!   well-shaped value wins.
//! - Operators never fail on bad input: an ill-shaped operator value, or a
//!   record attribute of the wrong type, simply does not match. Only `$cb`
//!   callbacks can return errors.
//!
//! # Operators
//!
//! | Operator | Matches when the attribute |
//! |----------|----------------------------|
//! | literal, `$equal` | equals the value, or contains it if an array |
//! | object literal, `$deepEqual` | is structurally equal |
//! | `$ne` | differs (missing attributes differ) |
//! | `$lt`, `$gt`, `$lte`, `$gte` | orders against the value |
//! | `$between` | lies strictly between two bounds |
//! | `$in`, `$nin` | is (not) one of the values |
//! | `$contains`, `$all`, `$any` | holds the value(s) |
//! | `$size` | has the given length |
//! | `$exists` / `$has` | is defined (or not) |
//! | `$like`, `$likeI`, `$regex`, pattern | matches the text |
//! | `$cb` | satisfies a callback |
//! | `$elemMatch` | has an element matching a sub-query |
//! | `$relationMatch` | has a related record matching a sub-query |
//! | `$computed` | (as a computed attribute) matches a criterion |
//!
//! # Caching
//!
//! With [`QueryOptions::cache`], the sorted result of a query is stored
//! under the query's [canonical key](RawQuery::canonical_key) and returned
//! by later calls, even after the collection changes, until
//! [`Collection::reset_query_cache`].
//!
//! # Logging
//!
//! Query execution emits `tracing` events at `debug` and `trace` level
//! (`query.execute`, `query.cache.hit`, `query.cache.miss`,
//! `query.cache.reset`, `query.paginate`, `query.parse.invalid_operand`).
//! No subscriber is installed by the library.

mod cache;
mod collection;
pub mod compose;
mod error;
pub mod eval;
mod op;
mod options;
mod ordering;
pub mod parse;
mod raw;
mod record;
pub mod shape;
mod value;

// Re-export public API
pub use cache::QueryCache;
pub use collection::Collection;
pub use error::{BoxError, Result, SieveError};
pub use op::{Combinator, OperatorKind};
pub use options::{PagingConfig, Pager, QueryOptions};
pub use ordering::{compare_values, page_bounds, page_count, sort_records, Order, SortBy};
pub use raw::{Callback, Criterion, Entry, Operand, RawQuery};
pub use record::Record;
pub use value::{is_defined, Document, Number, Value};

#[cfg(feature = "macros")]
pub use sieve_macros::Record;

//! The host-facing record abstraction.
//!
//! The engine only ever reads records, through the [`Record`] trait. It is
//! implemented for [`Document`], for [`Value`] (so array elements can be
//! matched as sub-records), and for the usual smart pointers. Structs can
//! derive it with `#[derive(Record)]` from `sieve-macros`.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::Arc;

use crate::value::{Document, Value};

/// Attribute store that queries are evaluated against.
///
/// Only [`get`](Record::get) is required. The other methods back specific
/// operators and default to "not available":
///
/// - [`has`](Record::has) backs `$exists` / `$has`
/// - [`computed`](Record::computed) backs `$computed`
/// - [`relation`](Record::relation) backs `$relationMatch`
///
/// # Manual Implementation
///
/// ```
/// use std::borrow::Cow;
/// use sieve::{Record, Value};
///
/// struct Post {
///     title: String,
///     likes: u32,
/// }
///
/// impl Record for Post {
///     fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
///         match key {
///             "title" => Some(Cow::Owned(Value::from(self.title.as_str()))),
///             "likes" => Some(Cow::Owned(Value::from(self.likes))),
///             _ => None,
///         }
///     }
///
///     fn computed(&self, name: &str) -> Option<Value> {
///         match name {
///             "popular" => Some(Value::from(self.likes > 10)),
///             _ => None,
///         }
///     }
/// }
///
/// let post = Post { title: "Home".into(), likes: 12 };
/// assert!(post.has("title"));
/// assert!(!post.has("author"));
/// assert_eq!(post.computed("popular"), Some(Value::from(true)));
/// ```
pub trait Record {
    /// Returns the value of an attribute, or `None` if it is absent.
    fn get(&self, key: &str) -> Option<Cow<'_, Value>>;

    /// Returns `true` if the attribute is defined (present and not null).
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_null())
    }

    /// Evaluates a zero-argument computed attribute by name.
    fn computed(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    /// Returns the member records of a related sub-collection.
    fn relation(&self, key: &str) -> Option<Vec<&dyn Record>> {
        let _ = key;
        None
    }
}

impl Record for Document {
    fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
        self.field(key).map(Cow::Borrowed)
    }

    /// Array attributes double as sub-collections of their elements.
    fn relation(&self, key: &str) -> Option<Vec<&dyn Record>> {
        let items = self.field(key)?.as_array()?;
        Some(items.iter().map(|item| item as &dyn Record).collect())
    }
}

/// Objects expose their fields; every other value has no attributes.
impl Record for Value {
    fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
        self.as_object()?.get(key)
    }

    fn relation(&self, key: &str) -> Option<Vec<&dyn Record>> {
        self.as_object()?.relation(key)
    }
}

macro_rules! forward_record {
    ($($ptr:ty),*) => {
        $(
            impl<T: Record + ?Sized> Record for $ptr {
                fn get(&self, key: &str) -> Option<Cow<'_, Value>> {
                    (**self).get(key)
                }

                fn has(&self, key: &str) -> bool {
                    (**self).has(key)
                }

                fn computed(&self, name: &str) -> Option<Value> {
                    (**self).computed(name)
                }

                fn relation(&self, key: &str) -> Option<Vec<&dyn Record>> {
                    (**self).relation(key)
                }
            }
        )*
    };
}

forward_record!(&T, Box<T>, Rc<T>, Arc<T>);

//! Sorting and pagination of query results.
//!
//! Provides [`Order`] for sort direction, [`SortBy`] for what to sort on,
//! and the page arithmetic used by the collection.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use serde::Deserialize;

use crate::record::Record;
use crate::value::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending: the ascending result, reversed.
    Desc,
}

impl Order {
    /// Returns `true` if this is descending order.
    pub fn is_desc(self) -> bool {
        matches!(self, Order::Desc)
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to sort matched records on.
pub enum SortBy<R> {
    /// Attribute key, read through [`Record::get`].
    Key(String),
    /// Sort key computed from the record.
    Extractor(Rc<dyn Fn(&R) -> Value>),
    /// Comparator used directly.
    Comparator(Rc<dyn Fn(&R, &R) -> Ordering>),
}

impl<R> SortBy<R> {
    /// Sorts by an attribute key.
    pub fn key(key: impl Into<String>) -> Self {
        SortBy::Key(key.into())
    }

    /// Sorts by a key derived from each record.
    pub fn extractor<F>(f: F) -> Self
    where
        F: Fn(&R) -> Value + 'static,
    {
        SortBy::Extractor(Rc::new(f))
    }

    /// Sorts with a comparator.
    pub fn comparator<F>(f: F) -> Self
    where
        F: Fn(&R, &R) -> Ordering + 'static,
    {
        SortBy::Comparator(Rc::new(f))
    }
}

impl<R> Clone for SortBy<R> {
    fn clone(&self) -> Self {
        match self {
            SortBy::Key(key) => SortBy::Key(key.clone()),
            SortBy::Extractor(f) => SortBy::Extractor(Rc::clone(f)),
            SortBy::Comparator(f) => SortBy::Comparator(Rc::clone(f)),
        }
    }
}

impl<R> fmt::Debug for SortBy<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Key(key) => f.debug_tuple("Key").field(key).finish(),
            SortBy::Extractor(_) => f.write_str("Extractor(..)"),
            SortBy::Comparator(_) => f.write_str("Comparator(..)"),
        }
    }
}

/// Compares two sort keys.
///
/// Undefined keys (absent or null) sort last. Keys of different types, or
/// of a type without an ordering, compare equal.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

/// Stable-sorts records, then reverses them for [`Order::Desc`].
pub fn sort_records<T, R>(records: &mut Vec<T>, sort_by: &SortBy<R>, order: Order)
where
    T: AsRef<R>,
    R: Record,
{
    match sort_by {
        SortBy::Key(key) => sort_by_extracted(records, |r: &R| {
            r.get(key).map(|v| v.into_owned()).unwrap_or_default()
        }),
        SortBy::Extractor(f) => sort_by_extracted(records, |r: &R| f(r)),
        SortBy::Comparator(f) => records.sort_by(|a, b| f(a.as_ref(), b.as_ref())),
    }

    if order.is_desc() {
        records.reverse();
    }
}

fn sort_by_extracted<T, R, F>(records: &mut Vec<T>, extract: F)
where
    T: AsRef<R>,
    F: Fn(&R) -> Value,
{
    let mut keyed: Vec<(Value, T)> = records
        .drain(..)
        .map(|record| (extract(record.as_ref()), record))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_values(Some(a), Some(b)));
    records.extend(keyed.into_iter().map(|(_, record)| record));
}

/// Index range of one page.
///
/// A positive `offset` wins over `page`; otherwise a positive 1-based
/// `page` starts at `(page - 1) * limit`. Bounds are clamped to `total`.
pub fn page_bounds(total: usize, limit: usize, offset: usize, page: usize) -> Range<usize> {
    let start = if offset > 0 {
        offset
    } else if page > 0 {
        (page - 1).saturating_mul(limit)
    } else {
        0
    };
    let start = start.min(total);
    let end = start.saturating_add(limit).min(total);
    start..end
}

/// Number of pages of `limit` records needed for `total` records.
pub fn page_count(total: usize, limit: usize) -> usize {
    if limit == 0 {
        0
    } else {
        total.div_ceil(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Document;
    use std::sync::Arc;

    fn likes(records: &[Arc<Document>]) -> Vec<Value> {
        records
            .iter()
            .map(|r| r.field("likes").cloned().unwrap_or_default())
            .collect()
    }

    fn docs() -> Vec<Arc<Document>> {
        [12, 2, 20]
            .into_iter()
            .map(|n| Arc::new(Document::new().with("likes", n)))
            .collect()
    }

    #[test]
    fn order_display_and_serde() {
        assert_eq!(Order::Asc.to_string(), "asc");
        assert_eq!(Order::default(), Order::Asc);
        let order: Order = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(order, Order::Desc);
    }

    #[test]
    fn compare_undefined_last() {
        let one = Value::from(1);
        assert_eq!(compare_values(Some(&one), None), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), Some(&one)), Ordering::Greater);
        assert_eq!(compare_values(None, None), Ordering::Equal);
        assert_eq!(
            compare_values(Some(&one), Some(&Value::from("a"))),
            Ordering::Equal
        );
    }

    #[test]
    fn sort_by_key() {
        let mut records = docs();
        sort_records(&mut records, &SortBy::<Document>::key("likes"), Order::Asc);
        assert_eq!(likes(&records), [Value::from(2), Value::from(12), Value::from(20)]);

        sort_records(&mut records, &SortBy::<Document>::key("likes"), Order::Desc);
        assert_eq!(likes(&records), [Value::from(20), Value::from(12), Value::from(2)]);
    }

    #[test]
    fn sort_is_stable_and_desc_reverses_ties() {
        let mut records: Vec<Arc<Document>> = ["a", "b", "c"]
            .into_iter()
            .map(|id| Arc::new(Document::new().with("id", id).with("rank", 1)))
            .collect();

        sort_records(&mut records, &SortBy::<Document>::key("rank"), Order::Asc);
        let ids: Vec<_> = records.iter().filter_map(|r| r.field("id").cloned()).collect();
        assert_eq!(ids, [Value::from("a"), Value::from("b"), Value::from("c")]);

        sort_records(&mut records, &SortBy::<Document>::key("rank"), Order::Desc);
        let ids: Vec<_> = records.iter().filter_map(|r| r.field("id").cloned()).collect();
        assert_eq!(ids, [Value::from("c"), Value::from("b"), Value::from("a")]);
    }

    #[test]
    fn sort_missing_keys_last() {
        let mut records = docs();
        records.insert(0, Arc::new(Document::new()));
        sort_records(&mut records, &SortBy::<Document>::key("likes"), Order::Asc);
        assert_eq!(likes(&records).last(), Some(&Value::Null));
    }

    #[test]
    fn sort_by_extractor_and_comparator() {
        let mut records = docs();
        let negated = SortBy::extractor(|r: &Document| {
            let n = r.field("likes").and_then(Value::as_number).map_or(0.0, |n| n.to_f64());
            Value::from(-n)
        });
        sort_records(&mut records, &negated, Order::Asc);
        assert_eq!(likes(&records), [Value::from(20), Value::from(12), Value::from(2)]);

        let by_likes = SortBy::comparator(|a: &Document, b: &Document| {
            compare_values(a.field("likes"), b.field("likes"))
        });
        sort_records(&mut records, &by_likes, Order::Asc);
        assert_eq!(likes(&records), [Value::from(2), Value::from(12), Value::from(20)]);
    }

    #[test]
    fn bounds() {
        assert_eq!(page_bounds(3, 2, 0, 0), 0..2);
        assert_eq!(page_bounds(3, 2, 2, 0), 2..3);
        assert_eq!(page_bounds(3, 2, 0, 2), 2..3);
        assert_eq!(page_bounds(3, 3, 0, 2), 3..3);
        assert_eq!(page_bounds(3, 2, 1, 5), 1..3);
        assert_eq!(page_bounds(3, 2, 10, 0), 3..3);
        assert_eq!(page_bounds(3, usize::MAX, 0, 3), 3..3);
    }

    #[test]
    fn counts() {
        assert_eq!(page_count(3, 2), 2);
        assert_eq!(page_count(4, 2), 2);
        assert_eq!(page_count(0, 2), 0);
        assert_eq!(page_count(5, 0), 0);
    }
}

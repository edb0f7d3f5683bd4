//! Record collections and query execution.
//!
//! A [`Collection`] owns an ordered list of records and one [`QueryCache`].
//! Queries run in three stages:
//!
//! 1. select matching records ([`compose::select`])
//! 2. sort them, if a sort is configured
//! 3. cut a page, if a positive limit is configured
//!
//! With caching enabled, the output of stage 2 is stored under the query's
//! canonical key and reused by later calls until
//! [`reset_query_cache`](Collection::reset_query_cache), even if records
//! are added or removed in between.

use std::cell::RefCell;
use std::fmt;
use std::slice;
use std::sync::Arc;

use tracing::debug;

use crate::cache::QueryCache;
use crate::compose;
use crate::error::{Result, SieveError};
use crate::options::QueryOptions;
use crate::ordering::{page_count, sort_records};
use crate::raw::RawQuery;
use crate::record::Record;
use crate::value::Document;

/// Ordered collection of records with a query cache.
///
/// # Example
///
/// ```
/// use sieve::{Collection, Document, QueryOptions, RawQuery, Value};
///
/// let posts: Collection<Document> = [("Home", 12), ("About", 2), ("Contact", 20)]
///     .into_iter()
///     .map(|(title, likes)| Document::new().with("title", title).with("likes", likes))
///     .collect();
///
/// let popular = posts
///     .query_with(
///         &RawQuery::new().gt("likes", 5),
///         &QueryOptions::new().sort_by_key("likes"),
///     )
///     .unwrap();
///
/// assert_eq!(popular.len(), 2);
/// assert_eq!(popular[0].field("title"), Some(&Value::from("Home")));
/// ```
pub struct Collection<R> {
    records: Vec<Arc<R>>,
    cache: RefCell<QueryCache<R>>,
}

impl<R> Collection<R> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Collection {
            records: Vec::new(),
            cache: RefCell::new(QueryCache::new()),
        }
    }

    /// Creates a collection from records.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Arc<R>>,
    {
        Collection {
            records: records.into_iter().map(Into::into).collect(),
            cache: RefCell::new(QueryCache::new()),
        }
    }

    /// Appends a record.
    pub fn add(&mut self, record: impl Into<Arc<R>>) {
        self.records.push(record.into());
    }

    /// Removes a record by identity. Returns `true` if it was present.
    pub fn remove(&mut self, record: &Arc<R>) -> bool {
        match self.records.iter().position(|r| Arc::ptr_eq(r, record)) {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes and returns the record at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Arc<R>> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    /// Keeps only the records for which `f` returns `true`.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&R) -> bool,
    {
        self.records.retain(|record| f(record));
    }

    /// Returns the record at `index`.
    pub fn at(&self, index: usize) -> Option<&Arc<R>> {
        self.records.get(index)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the collection has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over the records in order.
    pub fn iter(&self) -> slice::Iter<'_, Arc<R>> {
        self.records.iter()
    }

    /// The records in order.
    pub fn records(&self) -> &[Arc<R>] {
        &self.records
    }

    /// Drops every cached result for this collection.
    pub fn reset_query_cache(&self) {
        let mut cache = self.cache.borrow_mut();
        debug!(entries = cache.len(), "query.cache.reset");
        cache.clear();
    }

    /// Number of cached queries.
    pub fn cached_queries(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<R: Record> Collection<R> {
    /// Returns the records matching a query, in collection order.
    pub fn query(&self, query: &RawQuery) -> Result<Vec<Arc<R>>> {
        self.query_with(query, &QueryOptions::new())
    }

    /// Runs a query through the full pipeline.
    ///
    /// Errors only when a `$cb` callback fails, or when caching is requested
    /// and the query cannot be serialized.
    pub fn query_with(&self, query: &RawQuery, options: &QueryOptions<R>) -> Result<Vec<Arc<R>>> {
        let sorted = if options.uses_cache() {
            self.cached(query, options)?
        } else {
            self.run(query, options)?
        };
        Ok(paginate(sorted, options))
    }

    /// Runs a query and wraps the result in a new collection.
    ///
    /// The new collection starts with an empty cache.
    pub fn where_query(&self, query: &RawQuery, options: &QueryOptions<R>) -> Result<Collection<R>> {
        Ok(Collection::from_records(self.query_with(query, options)?))
    }

    /// Number of matching records.
    pub fn count(&self, query: &RawQuery) -> Result<usize> {
        Ok(compose::select(&self.records, query)?.len())
    }

    /// First matching record, in collection order.
    pub fn find(&self, query: &RawQuery) -> Result<Option<Arc<R>>> {
        Ok(compose::select(&self.records, query)?
            .first()
            .map(|record| Arc::clone(record)))
    }

    /// Returns `true` if any record matches.
    pub fn any(&self, query: &RawQuery) -> Result<bool> {
        Ok(self.count(query)? > 0)
    }

    /// Returns `true` if every record matches.
    pub fn all(&self, query: &RawQuery) -> Result<bool> {
        Ok(self.count(query)? == self.records.len())
    }

    fn cached(&self, query: &RawQuery, options: &QueryOptions<R>) -> Result<Vec<Arc<R>>> {
        let key = query.canonical_key()?;

        let hit = self.cache.borrow().get(&key).map(<[_]>::to_vec);
        if let Some(records) = hit {
            debug!(key = %key, records = records.len(), "query.cache.hit");
            return Ok(records);
        }

        debug!(key = %key, "query.cache.miss");
        let records = self.run(query, options)?;
        self.cache.borrow_mut().insert(key, records.clone());
        Ok(records)
    }

    fn run(&self, query: &RawQuery, options: &QueryOptions<R>) -> Result<Vec<Arc<R>>> {
        let mut matched: Vec<Arc<R>> = compose::select(&self.records, query)?
            .into_iter()
            .cloned()
            .collect();

        if let Some(sort_by) = options.sorting() {
            sort_records(&mut matched, sort_by, options.direction());
        }

        debug!(
            records = self.records.len(),
            matched = matched.len(),
            sorted = options.sorting().is_some(),
            "query.execute"
        );
        Ok(matched)
    }
}

fn paginate<R>(records: Vec<Arc<R>>, options: &QueryOptions<R>) -> Vec<Arc<R>> {
    let (Some(limit), Some(range)) = (options.page_size(), options.page_range(records.len()))
    else {
        return records;
    };

    let pages = page_count(records.len(), limit);
    let page = records[range.clone()].to_vec();
    debug!(
        total = records.len(),
        pages,
        start = range.start,
        end = range.end,
        "query.paginate"
    );

    if let Some(pager) = options.pager_fn() {
        pager(pages, page.as_slice());
    }
    page
}

impl Collection<Document> {
    /// Builds a collection from a JSON array of objects.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let items = json.as_array().ok_or_else(|| {
            SieveError::InvalidRecord(format!("expected a JSON array, got {json}"))
        })?;
        items
            .iter()
            .map(|item| Document::from_json(item.clone()))
            .collect::<Result<Vec<_>>>()
            .map(Collection::from_records)
    }
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Collection::new()
    }
}

/// Clones share records; the clone starts with an empty cache.
impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Collection::from_records(self.records.iter().cloned())
    }
}

impl<R: fmt::Debug> fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("records", &self.records)
            .field("cached_queries", &self.cached_queries())
            .finish()
    }
}

impl<R> FromIterator<R> for Collection<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Collection::from_records(iter)
    }
}

impl<'a, R> IntoIterator for &'a Collection<R> {
    type Item = &'a Arc<R>;
    type IntoIter = slice::Iter<'a, Arc<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn posts() -> Collection<Document> {
        Collection::from_json(&json!([
            {"title": "Home", "likes": 12},
            {"title": "About", "likes": 2},
            {"title": "Contact", "likes": 20}
        ]))
        .unwrap()
    }

    fn titles(records: &[Arc<Document>]) -> Vec<String> {
        records
            .iter()
            .filter_map(|r| r.field("title").and_then(Value::as_str).map(String::from))
            .collect()
    }

    #[test]
    fn host_operations() {
        let mut posts = posts();
        assert_eq!(posts.len(), 3);

        let about = Arc::clone(posts.at(1).unwrap());
        assert!(posts.remove(&about));
        assert!(!posts.remove(&about));
        assert_eq!(titles(posts.records()), ["Home", "Contact"]);

        posts.add(Document::new().with("title", "Blog"));
        assert_eq!(posts.remove_at(0).map(|r| r.field("title").cloned()), Some(Some(Value::from("Home"))));
        assert!(posts.remove_at(5).is_none());

        posts.retain(|doc| doc.contains_key("likes"));
        assert_eq!(titles(posts.records()), ["Contact"]);
        assert_eq!((&posts).into_iter().count(), 1);
    }

    #[test]
    fn from_json_requires_objects() {
        assert!(Collection::from_json(&json!({"title": "Home"})).is_err());
        assert!(matches!(
            Collection::from_json(&json!([1])),
            Err(SieveError::InvalidRecord(_))
        ));
    }

    #[test]
    fn helpers() {
        let posts = posts();
        let popular = RawQuery::new().gt("likes", 10);
        assert_eq!(posts.count(&popular).unwrap(), 2);
        assert_eq!(
            posts.find(&popular).unwrap().and_then(|r| r.field("title").cloned()),
            Some(Value::from("Home"))
        );
        assert!(posts.any(&popular).unwrap());
        assert!(!posts.all(&popular).unwrap());
        assert!(posts.all(&RawQuery::new().exists("title", true)).unwrap());
        assert!(posts.find(&RawQuery::new().eq("title", "Blog")).unwrap().is_none());
    }

    #[test]
    fn cache_keeps_stale_results() {
        let mut posts = posts();
        let query = RawQuery::new().exists("title", true);
        let cached = QueryOptions::new().cache(true);

        assert_eq!(posts.query_with(&query, &cached).unwrap().len(), 3);
        assert_eq!(posts.cached_queries(), 1);

        posts.remove_at(0);
        assert_eq!(posts.query_with(&query, &cached).unwrap().len(), 3);
        assert_eq!(posts.query(&query).unwrap().len(), 2);

        posts.reset_query_cache();
        assert_eq!(posts.cached_queries(), 0);
        assert_eq!(posts.query_with(&query, &cached).unwrap().len(), 2);
    }

    #[test]
    fn clone_and_where_start_uncached() {
        let posts = posts();
        let query = RawQuery::new().gt("likes", 5);
        posts.query_with(&query, &QueryOptions::new().cache(true)).unwrap();

        assert_eq!(posts.clone().cached_queries(), 0);
        let popular = posts.where_query(&query, &QueryOptions::new()).unwrap();
        assert_eq!(popular.len(), 2);
        assert_eq!(popular.cached_queries(), 0);
        assert!(Arc::ptr_eq(popular.at(0).unwrap(), posts.at(0).unwrap()));
    }

    #[test]
    fn pager_only_called_when_paginating() {
        use std::cell::Cell;
        use std::rc::Rc;

        let posts = posts();
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let options = QueryOptions::new()
            .sort_by_key("likes")
            .pager(move |pages, page: &[Arc<Document>]| {
                assert_eq!(pages, 2);
                assert_eq!(page.len(), 1);
                seen.set(seen.get() + 1);
            });

        posts.query_with(&RawQuery::new(), &options).unwrap();
        assert_eq!(calls.get(), 0);

        let page = posts
            .query_with(&RawQuery::new(), &options.clone().limit(2).page(2))
            .unwrap();
        assert_eq!(titles(&page), ["Contact"]);
        assert_eq!(calls.get(), 1);
    }
}

//! Query options.
//!
//! [`QueryOptions`] configures the result pipeline of one query call: sort,
//! pagination, caching and the pager callback. [`PagingConfig`] is the
//! serializable subset, for options read from JSON or configuration files.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::SieveError;
use crate::ordering::{page_bounds, Order, SortBy};

/// Callback invoked with the total page count and the current page.
pub type Pager<R> = Rc<dyn Fn(usize, &[Arc<R>])>;

/// Options for [`Collection::query_with`](crate::Collection::query_with).
///
/// Pagination only applies when `limit` is positive; `offset` and `page`
/// are ignored otherwise.
///
/// # Example
///
/// ```
/// use sieve::{Document, Order, QueryOptions};
///
/// let options = QueryOptions::<Document>::new()
///     .sort_by_key("likes")
///     .order(Order::Desc)
///     .limit(10)
///     .page(2)
///     .cache(true);
///
/// assert_eq!(options.page_range(25), Some(10..20));
/// ```
pub struct QueryOptions<R> {
    limit: usize,
    offset: usize,
    page: usize,
    sort_by: Option<SortBy<R>>,
    order: Order,
    cache: bool,
    pager: Option<Pager<R>>,
}

impl<R> QueryOptions<R> {
    /// Creates default options: no sort, no pagination, no cache.
    pub fn new() -> Self {
        QueryOptions {
            limit: 0,
            offset: 0,
            page: 0,
            sort_by: None,
            order: Order::Asc,
            cache: false,
            pager: None,
        }
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the absolute start index; takes precedence over `page`.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the 1-based page number.
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Sets what to sort on.
    pub fn sort_by(mut self, sort_by: SortBy<R>) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    /// Sorts on an attribute key.
    pub fn sort_by_key(self, key: impl Into<String>) -> Self {
        self.sort_by(SortBy::key(key))
    }

    /// Sets the sort direction.
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Opts into the collection's query cache.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the pager callback, invoked whenever a page is cut.
    pub fn pager<F>(mut self, pager: F) -> Self
    where
        F: Fn(usize, &[Arc<R>]) + 'static,
    {
        self.pager = Some(Rc::new(pager));
        self
    }

    /// The page size, if pagination applies.
    pub fn page_size(&self) -> Option<usize> {
        (self.limit > 0).then_some(self.limit)
    }

    /// The sort configuration.
    pub fn sorting(&self) -> Option<&SortBy<R>> {
        self.sort_by.as_ref()
    }

    /// The sort direction.
    pub fn direction(&self) -> Order {
        self.order
    }

    /// Whether the query cache is used.
    pub fn uses_cache(&self) -> bool {
        self.cache
    }

    /// The pager callback.
    pub fn pager_fn(&self) -> Option<&Pager<R>> {
        self.pager.as_ref()
    }

    /// The slice of `total` matched records to return, if pagination applies.
    pub fn page_range(&self, total: usize) -> Option<Range<usize>> {
        self.page_size()
            .map(|limit| page_bounds(total, limit, self.offset, self.page))
    }
}

impl<R> Default for QueryOptions<R> {
    fn default() -> Self {
        QueryOptions::new()
    }
}

impl<R> Clone for QueryOptions<R> {
    fn clone(&self) -> Self {
        QueryOptions {
            limit: self.limit,
            offset: self.offset,
            page: self.page,
            sort_by: self.sort_by.clone(),
            order: self.order,
            cache: self.cache,
            pager: self.pager.clone(),
        }
    }
}

impl<R> fmt::Debug for QueryOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("page", &self.page)
            .field("sort_by", &self.sort_by)
            .field("order", &self.order)
            .field("cache", &self.cache)
            .field("pager", &self.pager.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Serializable query options.
///
/// Field names follow the query-option vocabulary (`sortBy`, not
/// `sort_by`). Missing fields take their defaults.
///
/// ```
/// use sieve::{Document, Order, PagingConfig, QueryOptions};
///
/// let config: PagingConfig =
///     r#"{"limit": 2, "page": 2, "sortBy": "likes", "order": "desc"}"#.parse().unwrap();
/// assert_eq!(config.order, Order::Desc);
///
/// let options: QueryOptions<Document> = config.into();
/// assert_eq!(options.page_range(3), Some(2..3));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PagingConfig {
    /// Page size.
    pub limit: Option<usize>,
    /// Absolute start index.
    pub offset: Option<usize>,
    /// 1-based page number.
    pub page: Option<usize>,
    /// Attribute key to sort on.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub order: Order,
    /// Whether to use the query cache.
    pub cache: bool,
}

impl FromStr for PagingConfig {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl<R> From<PagingConfig> for QueryOptions<R> {
    fn from(config: PagingConfig) -> Self {
        let mut options = QueryOptions::new()
            .limit(config.limit.unwrap_or(0))
            .offset(config.offset.unwrap_or(0))
            .page(config.page.unwrap_or(0))
            .order(config.order)
            .cache(config.cache);
        if let Some(key) = config.sort_by {
            options = options.sort_by_key(key);
        }
        options
    }
}

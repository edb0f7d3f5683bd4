//! Raw query model and builder.
//!
//! A [`RawQuery`] is the nested-object query grammar before parsing: an
//! ordered list of entries, each either an attribute criterion or a
//! compound block (`$and`, `$or`, `$nor`, `$not`). Order is significant:
//! when one attribute carries several operators the last valid one wins,
//! and compound blocks run in the order they appear.
//!
//! Queries are built with the fluent API or read from JSON:
//!
//! ```
//! use sieve::RawQuery;
//! use serde_json::json;
//!
//! let built = RawQuery::new()
//!     .gt("likes", 5)
//!     .contains("colors", "yellow");
//!
//! let parsed = RawQuery::from_json(&json!({
//!     "likes": {"$gt": 5},
//!     "colors": {"$contains": "yellow"}
//! }))
//! .unwrap();
//!
//! assert_eq!(built.canonical_key().unwrap(), parsed.canonical_key().unwrap());
//! ```

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{BoxError, Result, SieveError};
use crate::op::{Combinator, OperatorKind};
use crate::record::Record;
use crate::value::Value;

type CallbackFn = dyn Fn(&Value, &dyn Record) -> std::result::Result<bool, BoxError>;

/// Caller-supplied predicate for the `$cb` operator.
///
/// The callback receives the attribute value (`Value::Null` when the
/// attribute is absent) and the record being tested. Errors it returns are
/// propagated out of the query.
#[derive(Clone)]
pub struct Callback {
    func: Rc<CallbackFn>,
}

impl Callback {
    /// Wraps a fallible callback.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value, &dyn Record) -> std::result::Result<bool, BoxError> + 'static,
    {
        Callback {
            func: Rc::new(func),
        }
    }

    /// Wraps an infallible callback.
    pub fn infallible<F>(func: F) -> Self
    where
        F: Fn(&Value, &dyn Record) -> bool + 'static,
    {
        Callback::new(move |attr, record| Ok(func(attr, record)))
    }

    /// Invokes the callback.
    pub fn call(&self, attr: &Value, record: &dyn Record) -> std::result::Result<bool, BoxError> {
        (self.func)(attr, record)
    }

    /// Identity of the underlying closure; clones share it.
    fn identity(&self) -> usize {
        Rc::as_ptr(&self.func) as *const () as usize
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:#x})", self.identity())
    }
}

/// What an attribute key maps to in a raw query.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Literal value: equality, or deep equality for objects.
    Literal(Value),
    /// Bare pattern: regex match.
    Pattern(Regex),
    /// Operator mapping, in insertion order.
    Operators(Vec<(OperatorKind, Operand)>),
}

impl Criterion {
    /// Creates an empty operator mapping.
    pub fn operators() -> Self {
        Criterion::Operators(Vec::new())
    }

    /// Adds an operator, replacing an earlier entry for the same operator in
    /// place. A literal or pattern criterion is replaced by the mapping.
    pub fn with(mut self, kind: OperatorKind, operand: impl Into<Operand>) -> Self {
        let operand = operand.into();
        match &mut self {
            Criterion::Operators(ops) => {
                match ops.iter_mut().find(|(existing, _)| *existing == kind) {
                    Some(slot) => slot.1 = operand,
                    None => ops.push((kind, operand)),
                }
                self
            }
            _ => Criterion::Operators(vec![(kind, operand)]),
        }
    }
}

/// Value supplied to an operator.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Plain value.
    Value(Value),
    /// Compiled pattern, for `$regex`.
    Pattern(Regex),
    /// Predicate callback, for `$cb`.
    Callback(Callback),
    /// Nested query, for `$elemMatch` and `$relationMatch`.
    Query(RawQuery),
    /// Nested criterion, for `$computed`.
    Criterion(Box<Criterion>),
}

impl Operand {
    /// The criterion this operand stands for when used as a `$computed` value.
    pub(crate) fn to_criterion(&self) -> Option<Criterion> {
        match self {
            Operand::Value(value) => Some(Criterion::Literal(value.clone())),
            Operand::Pattern(regex) => Some(Criterion::Pattern(regex.clone())),
            Operand::Callback(cb) => Some(Criterion::Operators(vec![(
                OperatorKind::Callback,
                Operand::Callback(cb.clone()),
            )])),
            Operand::Criterion(criterion) => Some((**criterion).clone()),
            Operand::Query(_) => None,
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Regex> for Operand {
    fn from(regex: Regex) -> Self {
        Operand::Pattern(regex)
    }
}

impl From<Callback> for Operand {
    fn from(cb: Callback) -> Self {
        Operand::Callback(cb)
    }
}

impl From<RawQuery> for Operand {
    fn from(query: RawQuery) -> Self {
        Operand::Query(query)
    }
}

impl From<Criterion> for Operand {
    fn from(criterion: Criterion) -> Self {
        Operand::Criterion(Box::new(criterion))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(items: Vec<T>) -> Self {
        Operand::Value(Value::from(items))
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Criterion::Literal(value)
    }
}

impl From<Regex> for Criterion {
    fn from(regex: Regex) -> Self {
        Criterion::Pattern(regex)
    }
}

macro_rules! impl_scalar_into {
    ($($source:ty),*) => {
        $(
            impl From<$source> for Operand {
                fn from(value: $source) -> Self {
                    Operand::Value(Value::from(value))
                }
            }

            impl From<$source> for Criterion {
                fn from(value: $source) -> Self {
                    Criterion::Literal(Value::from(value))
                }
            }
        )*
    };
}

impl_scalar_into!(bool, i32, i64, u32, u64, usize, f64, &str, String);

/// One entry of a raw query.
#[derive(Debug, Clone)]
pub enum Entry {
    /// Attribute key and its criterion.
    Field(String, Criterion),
    /// Reserved compound key and its nested block.
    Block(Combinator, RawQuery),
}

/// Nested-object query, before parsing.
///
/// Setting a key that is already present replaces its criterion in place,
/// keeping the key's original position.
///
/// A query with compound blocks is evaluated through those blocks only;
/// plain attribute entries next to them are not consulted.
#[derive(Debug, Clone, Default)]
pub struct RawQuery {
    entries: Vec<Entry>,
}

impl RawQuery {
    /// Creates a new empty query.
    ///
    /// An empty query matches all records.
    pub fn new() -> Self {
        RawQuery::default()
    }

    // ========================================================================
    // Generic builders
    // ========================================================================

    /// Sets the criterion for an attribute key.
    pub fn set(mut self, key: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        let key = key.into();
        let criterion = criterion.into();
        match self.field_index(&key) {
            Some(idx) => self.entries[idx] = Entry::Field(key, criterion),
            None => self.entries.push(Entry::Field(key, criterion)),
        }
        self
    }

    /// Adds an operator to an attribute's operator mapping.
    pub fn op(mut self, key: impl Into<String>, kind: OperatorKind, operand: impl Into<Operand>) -> Self {
        let key = key.into();
        match self.field_index(&key) {
            Some(idx) => {
                if let Entry::Field(_, criterion) = &mut self.entries[idx] {
                    let current = std::mem::replace(criterion, Criterion::operators());
                    *criterion = current.with(kind, operand);
                }
                self
            }
            None => self.set(key, Criterion::operators().with(kind, operand)),
        }
    }

    /// Adds a compound block.
    ///
    /// A block of the same kind that is already present absorbs the new
    /// entries and keeps its position, so each combinator appears once.
    pub fn block(mut self, combinator: Combinator, query: RawQuery) -> Self {
        let idx = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Block(c, _) if *c == combinator));
        match idx {
            Some(idx) => {
                if let Entry::Block(_, existing) = &mut self.entries[idx] {
                    let current = std::mem::take(existing);
                    *existing = current.merge(query);
                }
            }
            None => self.entries.push(Entry::Block(combinator, query)),
        }
        self
    }

    /// Applies every entry of `other` on top of this query, in order.
    ///
    /// Fields replace fields of the same key, as [`set`](RawQuery::set)
    /// does; blocks merge as in [`block`](RawQuery::block).
    pub fn merge(self, other: RawQuery) -> Self {
        other
            .entries
            .into_iter()
            .fold(self, |query, entry| match entry {
                Entry::Field(key, criterion) => query.set(key, criterion),
                Entry::Block(combinator, block) => query.block(combinator, block),
            })
    }

    fn field_index(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| matches!(entry, Entry::Field(k, _) if k == key))
    }

    // ========================================================================
    // Literal shorthand
    // ========================================================================

    /// Literal value: equality, array membership, or deep equality for objects.
    pub fn eq(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, Criterion::Literal(value.into()))
    }

    /// Bare pattern value.
    pub fn pattern(self, key: impl Into<String>, regex: Regex) -> Self {
        self.set(key, Criterion::Pattern(regex))
    }

    /// Compiles a pattern and sets it as a bare pattern value.
    ///
    /// Returns an error if the pattern is invalid.
    pub fn regex(self, key: impl Into<String>, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(self.pattern(key, regex))
    }

    // ========================================================================
    // Operator shorthand
    // ========================================================================

    /// `$equal`.
    pub fn equal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Equal, value.into())
    }

    /// `$deepEqual`.
    pub fn deep_equal(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::DeepEqual, value.into())
    }

    /// `$ne`.
    pub fn ne(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Ne, value.into())
    }

    /// `$lt`.
    pub fn lt(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Lt, value.into())
    }

    /// `$gt`.
    pub fn gt(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Gt, value.into())
    }

    /// `$lte`.
    pub fn lte(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Lte, value.into())
    }

    /// `$gte`.
    pub fn gte(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Gte, value.into())
    }

    /// `$between`, exclusive at both ends.
    pub fn between(
        self,
        key: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.op(
            key,
            OperatorKind::Between,
            Value::Array(vec![low.into(), high.into()]),
        )
    }

    /// `$in`.
    pub fn is_in<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.op(key, OperatorKind::In, collect_values(values))
    }

    /// `$nin`.
    pub fn not_in<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.op(key, OperatorKind::Nin, collect_values(values))
    }

    /// `$contains`.
    pub fn contains(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.op(key, OperatorKind::Contains, value.into())
    }

    /// `$all`.
    pub fn all<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.op(key, OperatorKind::All, collect_values(values))
    }

    /// `$any`.
    pub fn any<I, V>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.op(key, OperatorKind::Any, collect_values(values))
    }

    /// `$size`.
    pub fn size(self, key: impl Into<String>, len: usize) -> Self {
        self.op(key, OperatorKind::Size, Value::from(len))
    }

    /// `$exists`.
    pub fn exists(self, key: impl Into<String>, defined: bool) -> Self {
        self.op(key, OperatorKind::Exists, Value::from(defined))
    }

    /// `$like`.
    pub fn like(self, key: impl Into<String>, needle: &str) -> Self {
        self.op(key, OperatorKind::Like, Value::from(needle))
    }

    /// `$likeI`.
    pub fn like_i(self, key: impl Into<String>, needle: &str) -> Self {
        self.op(key, OperatorKind::LikeI, Value::from(needle))
    }

    /// `$cb` with an infallible predicate.
    pub fn cb<F>(self, key: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &dyn Record) -> bool + 'static,
    {
        self.op(key, OperatorKind::Callback, Callback::infallible(func))
    }

    /// `$cb` with a fallible predicate.
    pub fn try_cb<F>(self, key: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &dyn Record) -> std::result::Result<bool, BoxError> + 'static,
    {
        self.op(key, OperatorKind::Callback, Callback::new(func))
    }

    /// `$elemMatch`.
    pub fn elem_match(self, key: impl Into<String>, query: RawQuery) -> Self {
        self.op(key, OperatorKind::ElemMatch, query)
    }

    /// `$relationMatch`.
    pub fn relation_match(self, key: impl Into<String>, query: RawQuery) -> Self {
        self.op(key, OperatorKind::RelationMatch, query)
    }

    /// `$computed`: the computed attribute named `key` must satisfy `criterion`.
    pub fn computed(self, key: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        self.op(key, OperatorKind::Computed, criterion.into())
    }

    // ========================================================================
    // Compound blocks
    // ========================================================================

    /// `$and` block.
    pub fn and(self, query: RawQuery) -> Self {
        self.block(Combinator::And, query)
    }

    /// `$or` block.
    pub fn or(self, query: RawQuery) -> Self {
        self.block(Combinator::Or, query)
    }

    /// `$nor` block.
    pub fn nor(self, query: RawQuery) -> Self {
        self.block(Combinator::Nor, query)
    }

    /// `$not` block.
    pub fn not(self, query: RawQuery) -> Self {
        self.block(Combinator::Not, query)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Returns all entries in order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the attribute entries in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Criterion)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Field(key, criterion) => Some((key.as_str(), criterion)),
            Entry::Block(..) => None,
        })
    }

    /// Returns the compound blocks in order.
    pub fn blocks(&self) -> impl Iterator<Item = (Combinator, &RawQuery)> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Block(combinator, block) => Some((*combinator, block)),
            Entry::Field(..) => None,
        })
    }

    /// Returns the criterion set for an attribute key.
    pub fn criterion(&self, key: &str) -> Option<&Criterion> {
        self.fields().find(|(k, _)| *k == key).map(|(_, c)| c)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if this query has no entries (matches everything).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Reads a query from JSON.
    ///
    /// - `$and`, `$or`, `$nor`, `$not` keys hold nested queries.
    /// - An object whose keys all start with `$` is an operator mapping;
    ///   any other value is a literal.
    /// - `$regex` strings are compiled into patterns; `$elemMatch` and
    ///   `$relationMatch` hold nested queries; `$computed` holds a criterion.
    ///
    /// Unknown operators and invalid patterns are errors. Evaluation never
    /// fails on an ill-shaped query, but an operator name outside the closed
    /// operator set, or a pattern that does not compile, is rejected here at
    /// construction time instead of being carried as a never-matching entry.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let map = json.as_object().ok_or_else(|| {
            SieveError::InvalidQuery(format!("expected a JSON object, got {json}"))
        })?;

        let mut query = RawQuery::new();
        for (key, value) in map {
            query = match Combinator::from_name(key) {
                Some(combinator) => query.block(combinator, RawQuery::from_json(value)?),
                None => query.set(key.as_str(), criterion_from_json(value)?),
            };
        }
        Ok(query)
    }

    /// Order-sensitive structural serialization used as the cache key.
    ///
    /// Two queries with the same entries in a different order produce
    /// different keys. Callbacks are keyed by identity.
    ///
    /// Entries that would otherwise read the same are tagged apart: object
    /// literals as `{"$literal": ..}`, patterns as `{"$pattern": ..}`,
    /// callbacks as `{"$callback": ..}`, nested queries as `{"$query": ..}`
    /// and computed criteria as `{"$criterion": ..}`.
    pub fn canonical_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl FromStr for RawQuery {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_str(s)?;
        RawQuery::from_json(&json)
    }
}

fn collect_values<I, V>(values: I) -> Value
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Value::Array(values.into_iter().map(Into::into).collect())
}

fn is_operator_map(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

fn criterion_from_json(json: &serde_json::Value) -> Result<Criterion> {
    match json {
        serde_json::Value::Object(map) if is_operator_map(map) => {
            let mut ops = Vec::with_capacity(map.len());
            for (name, operand) in map {
                let kind: OperatorKind = name.parse()?;
                ops.push((kind, operand_from_json(kind, operand)?));
            }
            Ok(Criterion::Operators(ops))
        }
        other => Ok(Criterion::Literal(Value::from(other.clone()))),
    }
}

fn operand_from_json(kind: OperatorKind, json: &serde_json::Value) -> Result<Operand> {
    let operand = match (kind, json) {
        (OperatorKind::Regex, serde_json::Value::String(source)) => {
            Operand::Pattern(Regex::new(source)?)
        }
        (OperatorKind::ElemMatch | OperatorKind::RelationMatch, serde_json::Value::Object(_)) => {
            Operand::Query(RawQuery::from_json(json)?)
        }
        (OperatorKind::Computed, _) => Operand::Criterion(Box::new(criterion_from_json(json)?)),
        // Anything else is carried as a value; ill-shaped values never match.
        _ => Operand::Value(Value::from(json.clone())),
    };
    Ok(operand)
}

const LITERAL_TAG: &str = "$literal";
const PATTERN_TAG: &str = "$pattern";
const CALLBACK_TAG: &str = "$callback";
const QUERY_TAG: &str = "$query";
const CRITERION_TAG: &str = "$criterion";

fn serialize_tagged<S, T>(serializer: S, tag: &str, value: &T) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(tag, value)?;
    map.end()
}

/// Objects are tagged so they never read as an operator mapping.
fn serialize_value<S: Serializer>(value: &Value, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if value.is_object() {
        serialize_tagged(serializer, LITERAL_TAG, value)
    } else {
        value.serialize(serializer)
    }
}

impl Serialize for RawQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            match entry {
                Entry::Field(key, criterion) => map.serialize_entry(key, criterion)?,
                Entry::Block(combinator, block) => {
                    map.serialize_entry(combinator.as_str(), block)?
                }
            }
        }
        map.end()
    }
}

impl Serialize for Criterion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Criterion::Literal(value) => serialize_value(value, serializer),
            Criterion::Pattern(regex) => serialize_tagged(serializer, PATTERN_TAG, regex.as_str()),
            Criterion::Operators(ops) => {
                let mut map = serializer.serialize_map(Some(ops.len()))?;
                for (kind, operand) in ops {
                    map.serialize_entry(kind.as_str(), operand)?;
                }
                map.end()
            }
        }
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Operand::Value(value) => serialize_value(value, serializer),
            Operand::Pattern(regex) => serialize_tagged(serializer, PATTERN_TAG, regex.as_str()),
            Operand::Callback(cb) => {
                serialize_tagged(serializer, CALLBACK_TAG, &format!("{:#x}", cb.identity()))
            }
            Operand::Query(query) => serialize_tagged(serializer, QUERY_TAG, query),
            Operand::Criterion(criterion) => serialize_tagged(serializer, CRITERION_TAG, criterion),
        }
    }
}

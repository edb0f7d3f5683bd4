//! Runtime values for record attributes and query operands.
//!
//! [`Value`] is the dynamic attribute type records expose through
//! [`Record::get`](crate::Record::get). It mirrors the JSON data model, with
//! numbers split into signed, unsigned, and floating variants so integer
//! comparisons stay exact.

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SieveError};

/// Attribute value held by a record or carried by a query.
///
/// Equality is structural, and numbers compare by value across variants, so
/// `Value::from(10i64) == Value::from(10.0f64)`.
///
/// # Example
///
/// ```
/// use sieve::Value;
///
/// let colors = Value::from(vec!["red", "blue"]);
/// assert!(colors.contains(&Value::from("blue")));
/// assert_eq!(colors.len(), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null. Treated as "not defined" by `$exists`.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// String value.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Nested sub-document.
    Object(Document),
}

impl Value {
    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is a `Bool` value.
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Returns `true` if this is a `Number` value.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Returns `true` if this is a `String` value.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Returns `true` if this is an `Array` value.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns `true` if this is an `Object` value.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the array elements, if present.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Extracts the nested document, if present.
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    /// Length of an array (elements) or string (characters).
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(items.len()),
            Value::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    /// Returns `true` for an empty array or string.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Sequence membership: element of an array, or substring of a string.
    ///
    /// Any other value contains nothing.
    pub fn contains(&self, needle: &Value) -> bool {
        match (self, needle) {
            (Value::Array(items), _) => items.contains(needle),
            (Value::String(haystack), Value::String(n)) => haystack.contains(n.as_str()),
            _ => false,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// A value is defined when it is present and not `Null`.
pub fn is_defined(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

/// Ordering is only defined between numbers, between strings, and between
/// booleans. Everything else is incomparable.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.compare(*b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

/// Numeric value supporting all common numeric types.
///
/// Numbers are stored in one of three variants to preserve precision:
/// - `I64` for signed integers
/// - `U64` for unsigned integers
/// - `F64` for floating point
///
/// Comparisons between different numeric types are handled by converting
/// to `f64`.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Compares two numbers, handling mixed types.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),

            // Mixed type comparisons - convert to f64
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }

    fn from_json(n: &serde_json::Number) -> Number {
        if let Some(i) = n.as_i64() {
            Number::I64(i)
        } else if let Some(u) = n.as_u64() {
            Number::U64(u)
        } else {
            Number::F64(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{n}"),
            Number::U64(n) => write!(f, "{n}"),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

macro_rules! impl_number_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for Number {
                fn from(n: $source) -> Self {
                    Number::$variant(n as $target)
                }
            }

            impl From<$source> for Value {
                fn from(n: $source) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_number_from!(I64 as i64: i8, i16, i32, i64, isize);
impl_number_from!(U64 as u64: u8, u16, u32, u64, usize);
impl_number_from!(F64 as f64: f32, f64);

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(Number::from_json(&n)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Number::I64(n) => serializer.serialize_i64(*n),
            Number::U64(n) => serializer.serialize_u64(*n),
            Number::F64(n) => serializer.serialize_f64(*n),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(doc) => doc.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

/// Ordered, string-keyed attribute map.
///
/// `Document` is both the nested-object variant of [`Value`] and a ready-made
/// [`Record`](crate::Record) implementation for schemaless data.
///
/// # Example
///
/// ```
/// use sieve::{Document, Record, Value};
///
/// let doc: Document = [("title", Value::from("Home")), ("likes", Value::from(12))]
///     .into_iter()
///     .collect();
///
/// assert!(doc.has("title"));
/// assert_eq!(doc.get("likes").as_deref(), Some(&Value::from(12)));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Builds a document from a JSON object.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Object(doc) => Ok(doc),
            other => Err(SieveError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                other.type_name()
            ))),
        }
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Sets a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the value of a field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns `true` if the field is present (even when `Null`).
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Document {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, Value>> for Document {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Document { fields }
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = SieveError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        Document::from_json(json)
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.fields)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(doc) => Ok(doc),
            other => Err(D::Error::custom(format!(
                "expected an object, got {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_type_checks() {
        assert!(Value::Null.is_null());
        assert!(Value::from(true).is_bool());
        assert!(Value::from(42).is_number());
        assert!(Value::from("test").is_string());
        assert!(Value::from(vec![1, 2]).is_array());
        assert!(Value::from(Document::new()).is_object());
    }

    #[test]
    fn value_extractors() {
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
        assert_eq!(Value::from(42i64).as_number(), Some(Number::I64(42)));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(vec!["a"]).as_array().map(<[Value]>::len), Some(1));

        // Wrong type returns None
        assert_eq!(Value::from("test").as_number(), None);
        assert_eq!(Value::from(1).as_str(), None);
    }

    #[test]
    fn numbers_equal_across_variants() {
        assert_eq!(Value::from(10i64), Value::from(10.0f64));
        assert_eq!(Value::from(10u8), Value::from(10i32));
        assert_ne!(Value::from(10), Value::from("10"));
    }

    #[test]
    fn number_comparisons_mixed_types() {
        assert_eq!(Number::I64(5).compare(Number::U64(10)), Some(Ordering::Less));
        assert_eq!(Number::U64(10).compare(Number::F64(5.5)), Some(Ordering::Greater));
        assert_eq!(Number::F64(f64::NAN).compare(Number::F64(1.0)), None);
    }

    #[test]
    fn ordering_only_within_a_type() {
        assert_eq!(
            Value::from(1).partial_cmp(&Value::from(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::from("b").partial_cmp(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from(1).partial_cmp(&Value::from("1")), None);
        assert_eq!(Value::Null.partial_cmp(&Value::Null), None);
    }

    #[test]
    fn length_and_containment() {
        let colors = Value::from(vec!["red", "blue"]);
        assert_eq!(colors.len(), Some(2));
        assert!(colors.contains(&Value::from("red")));
        assert!(!colors.contains(&Value::from("green")));

        let text = Value::from("héllo");
        assert_eq!(text.len(), Some(5));
        assert!(text.contains(&Value::from("ll")));

        assert_eq!(Value::from(3).len(), None);
        assert!(!Value::from(3).contains(&Value::from(3)));
    }

    #[test]
    fn defined_excludes_null() {
        assert!(is_defined(Some(&Value::from(0))));
        assert!(!is_defined(Some(&Value::Null)));
        assert!(!is_defined(None));
    }

    #[test]
    fn converts_from_json() {
        let value = Value::from(json!({
            "title": "Home",
            "likes": 12,
            "ratio": 0.5,
            "colors": ["red"],
            "draft": null
        }));
        let doc = value.as_object().expect("object");
        assert_eq!(doc.field("title"), Some(&Value::from("Home")));
        assert_eq!(doc.field("likes"), Some(&Value::Number(Number::I64(12))));
        assert_eq!(doc.field("ratio"), Some(&Value::Number(Number::F64(0.5))));
        assert_eq!(doc.field("colors"), Some(&Value::from(vec!["red"])));
        assert_eq!(doc.field("draft"), Some(&Value::Null));
    }

    #[test]
    fn serializes_back_to_json() {
        let doc = Document::new().with("b", 1).with("a", vec!["x"]);
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": ["x"], "b": 1}));
        assert_eq!(Value::from(true).to_string(), "true");
    }

    #[test]
    fn document_rejects_non_objects() {
        assert!(Document::from_json(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<Document>(json!("nope")).is_err());
        assert!(serde_json::from_value::<Document>(json!({"a": 1})).is_ok());
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }
}

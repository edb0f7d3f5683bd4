//! Operator evaluation.
//!
//! [`evaluate`] tests one predicate against one record. Ill-shaped operator
//! values and ill-shaped record attributes evaluate to `false`; the only
//! error path is a failing `$cb` callback.

use std::borrow::Cow;

use crate::compose::{self, Extract, Mode};
use crate::error::{Result, SieveError};
use crate::op::OperatorKind;
use crate::parse::{Argument, Predicate};
use crate::record::Record;
use crate::shape;
use crate::value::{is_defined, Number, Value};

/// Evaluates a predicate against a record.
///
/// With [`Extract::Key`] the attribute is read through [`Record::get`];
/// with [`Extract::Computed`] it is the computed attribute of the same name.
pub fn evaluate(predicate: &Predicate, record: &dyn Record, extract: Extract) -> Result<bool> {
    if !predicate.is_valid() {
        return Ok(false);
    }

    let key = predicate.key.as_str();
    match (predicate.kind, &predicate.value) {
        (OperatorKind::RelationMatch, Argument::Predicates(nested)) => {
            let Some(members) = record.relation(key) else {
                return Ok(false);
            };
            return any_member(members, nested);
        }
        (OperatorKind::Computed, Argument::Predicates(nested)) => {
            return compose::matches(record, nested, Mode::All, Extract::Computed);
        }
        _ => {}
    }

    let attr: Option<Cow<'_, Value>> = match extract {
        Extract::Key => record.get(key),
        Extract::Computed => record.computed(key).map(Cow::Owned),
    };
    let attr = attr.as_deref();

    if !shape::attribute_valid(predicate.kind, attr) {
        return Ok(false);
    }

    let defined = match extract {
        Extract::Key => record.has(key),
        Extract::Computed => is_defined(attr),
    };

    apply(predicate, attr, defined, record)
}

fn apply(
    predicate: &Predicate,
    attr: Option<&Value>,
    defined: bool,
    record: &dyn Record,
) -> Result<bool> {
    use OperatorKind::*;

    let matched = match (predicate.kind, &predicate.value) {
        (Equal, Argument::Value(value)) => attr.is_some_and(|a| {
            a == value || matches!(a, Value::Array(items) if items.contains(value))
        }),
        (DeepEqual, Argument::Value(value)) => attr == Some(value),
        (Ne, Argument::Value(value)) => attr != Some(value),

        (Lt | Gt | Lte | Gte, Argument::Value(value)) => attr
            .and_then(|attr| attr.partial_cmp(value))
            .is_some_and(|ordering| predicate.kind.eval_ordering(ordering)),
        (Between, Argument::Value(Value::Array(bounds))) => match (attr, bounds.as_slice()) {
            (Some(attr), [low, high]) => low < attr && attr < high,
            _ => false,
        },

        (In, Argument::Value(Value::Array(values))) => attr.is_some_and(|a| values.contains(a)),
        (Nin, Argument::Value(Value::Array(values))) => attr.is_some_and(|a| !values.contains(a)),

        (Contains, Argument::Value(value)) => attr.is_some_and(|a| a.contains(value)),
        (All, Argument::Value(Value::Array(values))) => {
            attr.is_some_and(|a| values.iter().all(|v| a.contains(v)))
        }
        (Any, Argument::Value(Value::Array(values))) => {
            attr.is_some_and(|a| values.iter().any(|v| a.contains(v)))
        }
        (Size, Argument::Value(Value::Number(size))) => attr
            .and_then(Value::len)
            .is_some_and(|len| Number::from(len) == *size),

        (Exists, Argument::Value(Value::Bool(expected))) => defined == *expected,

        (Like, Argument::Value(Value::String(needle))) => attr
            .and_then(Value::as_str)
            .is_some_and(|s| s.contains(needle.as_str())),
        (LikeI, Argument::Value(Value::String(needle))) => attr
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
        (Regex, Argument::Pattern(regex)) => {
            attr.and_then(Value::as_str).is_some_and(|s| regex.is_match(s))
        }

        (Callback, Argument::Callback(cb)) => {
            let null = Value::Null;
            cb.call(attr.unwrap_or(&null), record)
                .map_err(|source| SieveError::Callback {
                    key: predicate.key.clone(),
                    source,
                })?
        }

        (ElemMatch, Argument::Predicates(nested)) => match attr {
            Some(Value::Array(items)) => {
                return any_member(items.iter().map(|item| item as &dyn Record), nested);
            }
            _ => false,
        },

        // Only non-boolean `$exists` values reach this arm once validated.
        (
            Equal | DeepEqual | Ne | Lt | Gt | Lte | Gte | Between | In | Nin | Contains | All
            | Any | Size | Exists | Like | LikeI | Regex | Callback | ElemMatch | RelationMatch
            | Computed,
            _,
        ) => false,
    };

    Ok(matched)
}

/// `true` if any member satisfies every predicate.
fn any_member<'a>(
    members: impl IntoIterator<Item = &'a dyn Record>,
    predicates: &[Predicate],
) -> Result<bool> {
    for member in members {
        if compose::matches(member, predicates, Mode::All, Extract::Key)? {
            return Ok(true);
        }
    }
    Ok(false)
}

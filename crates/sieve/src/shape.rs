//! Shape checks for operator values and record attributes.
//!
//! Both checks gate evaluation: a predicate whose value fails [`valid`], or
//! whose record attribute fails [`attribute_valid`], evaluates to
//! non-match without running the operator.

use crate::op::OperatorKind;
use crate::parse::Argument;
use crate::value::{is_defined, Value};

/// Returns `true` if `value` has the shape `kind` requires.
pub fn valid(kind: OperatorKind, value: &Argument) -> bool {
    use OperatorKind::*;

    match kind {
        In | Nin | All | Any => matches!(value, Argument::Value(Value::Array(_))),
        Size => matches!(value, Argument::Value(Value::Number(_))),
        Regex => matches!(value, Argument::Pattern(_)),
        Like | LikeI => matches!(value, Argument::Value(Value::String(_))),
        Between => matches!(value, Argument::Value(Value::Array(bounds)) if bounds.len() == 2),
        Callback => matches!(value, Argument::Callback(_)),
        ElemMatch | RelationMatch | Computed => matches!(value, Argument::Predicates(_)),
        Equal | DeepEqual | Ne | Lt | Gt | Lte | Gte | Contains | Exists => {
            matches!(value, Argument::Value(_))
        }
    }
}

/// Returns `true` if the record attribute can be tested by `kind`.
pub fn attribute_valid(kind: OperatorKind, attr: Option<&Value>) -> bool {
    use OperatorKind::*;

    match kind {
        Like | LikeI | Regex => matches!(attr, Some(Value::String(_))),
        Contains | All | Any | Size => {
            matches!(attr, Some(Value::Array(_) | Value::String(_)))
        }
        In | Nin => is_defined(attr),
        ElemMatch => matches!(attr, Some(Value::Array(_))),
        _ => true,
    }
}

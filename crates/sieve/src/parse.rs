//! Query parsing.
//!
//! [`parse`] normalizes the attribute entries of a [`RawQuery`] into an
//! ordered list of [`Predicate`]s. Compound blocks are not parsed here;
//! the composer handles them.
//!
//! An attribute carrying several operators resolves to one predicate: the
//! last operator whose value has a valid shape. If none does, the last
//! operator is kept and the predicate never matches.

use regex::Regex;
use tracing::trace;

use crate::op::OperatorKind;
use crate::raw::{Callback, Criterion, Operand, RawQuery};
use crate::shape;
use crate::value::Value;

/// Parsed operator value.
#[derive(Debug, Clone)]
pub enum Argument {
    /// No value was supplied.
    Missing,
    /// Plain value.
    Value(Value),
    /// Compiled pattern.
    Pattern(Regex),
    /// Predicate callback.
    Callback(Callback),
    /// Parsed sub-predicates of a recursive operator.
    Predicates(Vec<Predicate>),
}

/// A single `(key, operator, value)` test against one record.
#[derive(Debug, Clone)]
pub struct Predicate {
    /// The attribute key the predicate reads.
    pub key: String,
    /// The operator.
    pub kind: OperatorKind,
    /// The operator value.
    pub value: Argument,
}

impl Predicate {
    /// Creates a new predicate.
    pub fn new(key: impl Into<String>, kind: OperatorKind, value: Argument) -> Self {
        Predicate {
            key: key.into(),
            kind,
            value,
        }
    }

    /// Returns `true` if the operator value has the shape the operator requires.
    pub fn is_valid(&self) -> bool {
        shape::valid(self.kind, &self.value)
    }
}

/// Parses the attribute entries of a query into predicates, in entry order.
pub fn parse(query: &RawQuery) -> Vec<Predicate> {
    query
        .fields()
        .map(|(key, criterion)| parse_criterion(key, criterion))
        .collect()
}

fn parse_criterion(key: &str, criterion: &Criterion) -> Predicate {
    match criterion {
        Criterion::Pattern(regex) => {
            Predicate::new(key, OperatorKind::Regex, Argument::Pattern(regex.clone()))
        }
        Criterion::Literal(value) if value.is_object() => {
            Predicate::new(key, OperatorKind::DeepEqual, Argument::Value(value.clone()))
        }
        Criterion::Literal(value) => {
            Predicate::new(key, OperatorKind::Equal, Argument::Value(value.clone()))
        }
        Criterion::Operators(ops) => {
            let mut chosen: Option<Predicate> = None;
            let mut last: Option<Predicate> = None;

            for (kind, operand) in ops {
                let candidate = Predicate::new(key, *kind, argument(key, *kind, operand));
                if candidate.is_valid() {
                    chosen = Some(candidate);
                } else {
                    trace!(key, operator = %kind, "query.parse.invalid_operand");
                    last = Some(candidate);
                }
            }

            chosen
                .or(last)
                .unwrap_or_else(|| Predicate::new(key, OperatorKind::Equal, Argument::Missing))
        }
    }
}

fn argument(key: &str, kind: OperatorKind, operand: &Operand) -> Argument {
    match (kind, operand) {
        (OperatorKind::ElemMatch | OperatorKind::RelationMatch, Operand::Query(query)) => {
            Argument::Predicates(parse(query))
        }
        // The computed attribute is read under the outer key.
        (OperatorKind::Computed, operand) => match operand.to_criterion() {
            Some(criterion) => Argument::Predicates(vec![parse_criterion(key, &criterion)]),
            None => Argument::Missing,
        },
        (_, Operand::Value(value)) => Argument::Value(value.clone()),
        (_, Operand::Pattern(regex)) => Argument::Pattern(regex.clone()),
        (_, Operand::Callback(cb)) => Argument::Callback(cb.clone()),
        (_, Operand::Query(_) | Operand::Criterion(_)) => Argument::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(query: RawQuery) -> Predicate {
        let mut predicates = parse(&query);
        assert_eq!(predicates.len(), 1);
        predicates.remove(0)
    }

    #[test]
    fn literals() {
        let p = single(RawQuery::new().eq("title", "Home"));
        assert_eq!(p.key, "title");
        assert_eq!(p.kind, OperatorKind::Equal);
        assert!(matches!(p.value, Argument::Value(Value::String(ref s)) if s == "Home"));

        let p = single(RawQuery::new().eq("colors", vec!["red"]));
        assert_eq!(p.kind, OperatorKind::Equal);

        let doc = crate::Document::new().with("name", "Dave");
        let p = single(RawQuery::new().eq("author", doc));
        assert_eq!(p.kind, OperatorKind::DeepEqual);
    }

    #[test]
    fn bare_pattern() {
        let p = single(RawQuery::new().regex("title", "^Ho").unwrap());
        assert_eq!(p.kind, OperatorKind::Regex);
        assert!(matches!(p.value, Argument::Pattern(_)));
    }

    #[test]
    fn last_valid_operator_wins() {
        let p = single(RawQuery::new().gt("likes", 5).lt("likes", 10));
        assert_eq!(p.kind, OperatorKind::Lt);

        let p = single(
            RawQuery::new()
                .is_in("title", ["Home"])
                .op("title", OperatorKind::Nin, "About"),
        );
        assert_eq!(p.kind, OperatorKind::In);
    }

    #[test]
    fn no_valid_operator_keeps_last() {
        let p = single(
            RawQuery::new()
                .op("likes", OperatorKind::Size, "three")
                .op("likes", OperatorKind::Between, vec![1]),
        );
        assert_eq!(p.kind, OperatorKind::Between);
        assert!(!p.is_valid());
    }

    #[test]
    fn empty_operator_map_never_valid() {
        let p = single(RawQuery::new().set("likes", Criterion::operators()));
        assert!(matches!(p.value, Argument::Missing));
        assert!(!p.is_valid());
    }

    #[test]
    fn elem_match_parses_nested_query() {
        let p = single(RawQuery::new().elem_match(
            "comments",
            RawQuery::new().like("text", "love").eq("author", "bob"),
        ));
        assert_eq!(p.kind, OperatorKind::ElemMatch);
        let Argument::Predicates(nested) = p.value else {
            panic!("expected nested predicates");
        };
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].kind, OperatorKind::Like);
        assert_eq!(nested[1].key, "author");
    }

    #[test]
    fn computed_wraps_outer_key() {
        let p = single(RawQuery::new().computed(
            "slug",
            Criterion::operators().with(OperatorKind::Like, "home"),
        ));
        assert_eq!(p.kind, OperatorKind::Computed);
        let Argument::Predicates(nested) = p.value else {
            panic!("expected nested predicates");
        };
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].key, "slug");
        assert_eq!(nested[0].kind, OperatorKind::Like);
    }

    #[test]
    fn ill_shaped_recursive_operands() {
        let p = single(RawQuery::new().op("comments", OperatorKind::ElemMatch, "text"));
        assert!(!p.is_valid());

        let p = single(RawQuery::new().op("x", OperatorKind::Like, RawQuery::new()));
        assert!(matches!(p.value, Argument::Missing));
        assert!(!p.is_valid());
    }

    #[test]
    fn blocks_are_not_parsed() {
        let query = RawQuery::new()
            .eq("title", "Home")
            .or(RawQuery::new().eq("likes", 2));
        assert_eq!(parse(&query).len(), 1);
    }
}

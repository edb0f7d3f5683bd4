//! Operator and combinator names.
//!
//! The operator set is closed: [`OperatorKind`] lists every predicate
//! operator the engine understands, and [`Combinator`] the four reserved
//! compound keys. Both map to and from their `$`-prefixed query names.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::SieveError;

/// Predicate operator.
///
/// Operators are grouped by what they do:
/// - **Equality**: `Equal`, `DeepEqual`, `Ne`
/// - **Ordering**: `Lt`, `Gt`, `Lte`, `Gte`, `Between`
/// - **Membership**: `In`, `Nin`
/// - **Sequence**: `Contains`, `All`, `Any`, `Size`
/// - **Presence**: `Exists` (also spelled `$has`)
/// - **Text**: `Like`, `LikeI`, `Regex`
/// - **Callback**: `Callback`
/// - **Recursive**: `ElemMatch`, `RelationMatch`, `Computed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// Equal, or a member of an array attribute.
    Equal,
    /// Structural equality.
    DeepEqual,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Lte,
    /// Greater than or equal.
    Gte,
    /// Strictly between two bounds.
    Between,
    /// Attribute is one of the given values.
    In,
    /// Attribute is none of the given values.
    Nin,
    /// Attribute sequence contains the value.
    Contains,
    /// Attribute sequence contains every given value.
    All,
    /// Attribute sequence shares at least one element with the given values.
    Any,
    /// Attribute length equals the value.
    Size,
    /// Attribute definedness equals the given boolean.
    Exists,
    /// Case-sensitive substring.
    Like,
    /// Case-insensitive substring.
    LikeI,
    /// Regular expression match.
    Regex,
    /// Caller-supplied predicate.
    Callback,
    /// Some element of an array attribute matches a sub-query.
    ElemMatch,
    /// Some member of a related sub-collection matches a sub-query.
    RelationMatch,
    /// A computed attribute matches a criterion.
    Computed,
}

impl OperatorKind {
    /// Every operator, in table order.
    pub const ALL: [OperatorKind; 22] = [
        OperatorKind::Equal,
        OperatorKind::DeepEqual,
        OperatorKind::Ne,
        OperatorKind::Lt,
        OperatorKind::Gt,
        OperatorKind::Lte,
        OperatorKind::Gte,
        OperatorKind::Between,
        OperatorKind::In,
        OperatorKind::Nin,
        OperatorKind::Contains,
        OperatorKind::All,
        OperatorKind::Any,
        OperatorKind::Size,
        OperatorKind::Exists,
        OperatorKind::Like,
        OperatorKind::LikeI,
        OperatorKind::Regex,
        OperatorKind::Callback,
        OperatorKind::ElemMatch,
        OperatorKind::RelationMatch,
        OperatorKind::Computed,
    ];

    /// Looks up an operator by its query name.
    ///
    /// `$has` is accepted as an alias for `$exists`.
    pub fn from_name(name: &str) -> Option<OperatorKind> {
        if name == "$has" {
            return Some(OperatorKind::Exists);
        }
        OperatorKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Returns `true` for `Lt`, `Gt`, `Lte` and `Gte`.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            OperatorKind::Lt | OperatorKind::Gt | OperatorKind::Lte | OperatorKind::Gte
        )
    }

    /// Evaluates an ordering operator given the ordering of attribute to value.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            OperatorKind::Lt => ordering == Ordering::Less,
            OperatorKind::Gt => ordering == Ordering::Greater,
            OperatorKind::Lte => ordering != Ordering::Greater,
            OperatorKind::Gte => ordering != Ordering::Less,
            _ => false, // Not an ordering-based operator
        }
    }

    /// Returns the query name of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            OperatorKind::Equal => "$equal",
            OperatorKind::DeepEqual => "$deepEqual",
            OperatorKind::Ne => "$ne",
            OperatorKind::Lt => "$lt",
            OperatorKind::Gt => "$gt",
            OperatorKind::Lte => "$lte",
            OperatorKind::Gte => "$gte",
            OperatorKind::Between => "$between",
            OperatorKind::In => "$in",
            OperatorKind::Nin => "$nin",
            OperatorKind::Contains => "$contains",
            OperatorKind::All => "$all",
            OperatorKind::Any => "$any",
            OperatorKind::Size => "$size",
            OperatorKind::Exists => "$exists",
            OperatorKind::Like => "$like",
            OperatorKind::LikeI => "$likeI",
            OperatorKind::Regex => "$regex",
            OperatorKind::Callback => "$cb",
            OperatorKind::ElemMatch => "$elemMatch",
            OperatorKind::RelationMatch => "$relationMatch",
            OperatorKind::Computed => "$computed",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorKind {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperatorKind::from_name(s).ok_or_else(|| SieveError::UnknownOperator(s.to_string()))
    }
}

/// Reserved compound key selecting how a nested block filters records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `$and`: every predicate matches.
    And,
    /// `$or`: at least one predicate matches.
    Or,
    /// `$nor`: no predicate matches.
    Nor,
    /// `$not`: not every predicate matches.
    Not,
}

impl Combinator {
    /// Looks up a combinator by its reserved key.
    pub fn from_name(name: &str) -> Option<Combinator> {
        match name {
            "$and" => Some(Combinator::And),
            "$or" => Some(Combinator::Or),
            "$nor" => Some(Combinator::Nor),
            "$not" => Some(Combinator::Not),
            _ => None,
        }
    }

    /// Returns the reserved key of this combinator.
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => "$and",
            Combinator::Or => "$or",
            Combinator::Nor => "$nor",
            Combinator::Not => "$not",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in OperatorKind::ALL {
            assert_eq!(OperatorKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn has_is_an_exists_alias() {
        assert_eq!(OperatorKind::from_name("$has"), Some(OperatorKind::Exists));
        assert_eq!(OperatorKind::Exists.as_str(), "$exists");
    }

    #[test]
    fn unknown_names_fail_to_parse() {
        assert!(OperatorKind::from_name("$near").is_none());
        assert!(OperatorKind::from_name("equal").is_none());
        assert!(matches!(
            "$near".parse::<OperatorKind>(),
            Err(SieveError::UnknownOperator(name)) if name == "$near"
        ));
        assert_eq!("$likeI".parse::<OperatorKind>().unwrap(), OperatorKind::LikeI);
    }

    #[test]
    fn eval_ordering() {
        assert!(OperatorKind::Lt.eval_ordering(Ordering::Less));
        assert!(!OperatorKind::Lt.eval_ordering(Ordering::Equal));
        assert!(OperatorKind::Lte.eval_ordering(Ordering::Equal));
        assert!(!OperatorKind::Lte.eval_ordering(Ordering::Greater));
        assert!(OperatorKind::Gt.eval_ordering(Ordering::Greater));
        assert!(OperatorKind::Gte.eval_ordering(Ordering::Equal));
        assert!(!OperatorKind::Gte.eval_ordering(Ordering::Less));
        assert!(!OperatorKind::Equal.eval_ordering(Ordering::Equal));
    }

    #[test]
    fn categories() {
        assert!(OperatorKind::Gte.is_ordering());
        assert!(!OperatorKind::Between.is_ordering());
    }

    #[test]
    fn combinator_names() {
        for combinator in [
            Combinator::And,
            Combinator::Or,
            Combinator::Nor,
            Combinator::Not,
        ] {
            assert_eq!(Combinator::from_name(combinator.as_str()), Some(combinator));
        }
        assert!(Combinator::from_name("$xor").is_none());
        assert_eq!(Combinator::Nor.to_string(), "$nor");
    }
}

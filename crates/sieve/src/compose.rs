//! Boolean composition of predicates.
//!
//! [`matches`] combines a predicate list over one record in `All` or `Any`
//! mode, short-circuiting. [`select`] runs a whole query over a record
//! slice:
//!
//! - no compound blocks: one implicit `$and` over the attribute entries
//! - otherwise each block filters the survivors of the previous one, in the
//!   order the blocks appear
//!
//! | block  | keeps records where            |
//! |--------|--------------------------------|
//! | `$and` | every predicate matches        |
//! | `$or`  | some predicate matches         |
//! | `$nor` | no predicate matches           |
//! | `$not` | not every predicate matches    |

use crate::error::Result;
use crate::eval::evaluate;
use crate::op::Combinator;
use crate::parse::{parse, Predicate};
use crate::raw::RawQuery;
use crate::record::Record;

/// How a predicate list combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every predicate must match.
    All,
    /// At least one predicate must match.
    Any,
}

/// Where predicates read their attribute from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// [`Record::get`].
    Key,
    /// [`Record::computed`].
    Computed,
}

/// Tests a record against a predicate list.
///
/// An empty list matches in `All` mode and does not match in `Any` mode.
pub fn matches(
    record: &dyn Record,
    predicates: &[Predicate],
    mode: Mode,
    extract: Extract,
) -> Result<bool> {
    match mode {
        Mode::All => {
            for predicate in predicates {
                if !evaluate(predicate, record, extract)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Mode::Any => {
            for predicate in predicates {
                if evaluate(predicate, record, extract)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Returns the records matching a query, in collection order.
pub fn select<'a, R: Record>(records: &'a [R], query: &RawQuery) -> Result<Vec<&'a R>> {
    let all: Vec<&R> = records.iter().collect();

    if query.blocks().next().is_none() {
        return filter(all, &parse(query), Mode::All, false);
    }

    query
        .blocks()
        .try_fold(all, |survivors, (combinator, block)| {
            let predicates = parse(block);
            match combinator {
                Combinator::And => filter(survivors, &predicates, Mode::All, false),
                Combinator::Or => filter(survivors, &predicates, Mode::Any, false),
                Combinator::Nor => filter(survivors, &predicates, Mode::Any, true),
                Combinator::Not => filter(survivors, &predicates, Mode::All, true),
            }
        })
}

fn filter<'a, R: Record>(
    records: Vec<&'a R>,
    predicates: &[Predicate],
    mode: Mode,
    negate: bool,
) -> Result<Vec<&'a R>> {
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if matches(record, predicates, mode, Extract::Key)? != negate {
            kept.push(record);
        }
    }
    Ok(kept)
}

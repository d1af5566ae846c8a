//! Filter expressions and the shared in-memory evaluator
//!
//! # Evaluation Flow (strict order)
//!
//! 1. Validate criteria arity across the whole tree
//! 2. Match records against the boolean tree (short-circuiting)
//! 3. Stable multi-key sort
//! 4. Skip, then limit
//!
//! The coercion table for mixed-kind comparisons is documented in
//! `compare`.

mod aggregate;
mod compare;
mod criteria;
mod errors;
mod evaluator;
mod expression;
mod sorter;

pub use aggregate::{Aggregate, AggregateOperator, AggregateResult, Aggregator, ALL_FIELDS};
pub use compare::{compare, sort_order, values_equal};
pub use criteria::{Arity, Criteria, Operator};
pub use errors::{FilterError, FilterResult};
pub use evaluator::{paginate, FilterEvaluator};
pub use expression::{BooleanOperator, Direction, FilterExpression, OrderBy};
pub use sorter::RecordSorter;

//! In-memory aggregation
//!
//! Group-by and aggregate functions over a record set, for backends with
//! no native aggregation. The filter's clauses are applied first; its
//! ordering and pagination are not.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Record, Value};

use super::compare::sort_order;
use super::errors::{FilterError, FilterResult};
use super::evaluator::FilterEvaluator;
use super::expression::FilterExpression;

/// Field name that makes `Count` count rows rather than non-null values
pub const ALL_FIELDS: &str = "*";

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateOperator {
    Count,
    CountDistinct,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOperator::Count => "COUNT",
            AggregateOperator::CountDistinct => "COUNT_DISTINCT",
            AggregateOperator::Sum => "SUM",
            AggregateOperator::Min => "MIN",
            AggregateOperator::Max => "MAX",
            AggregateOperator::Avg => "AVG",
        }
    }
}

impl fmt::Display for AggregateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregate {
    pub field: String,
    pub operator: AggregateOperator,
}

impl Aggregate {
    pub fn new(field: impl Into<String>, operator: AggregateOperator) -> Self {
        Self {
            field: field.into(),
            operator,
        }
    }

    /// Row count
    pub fn count_all() -> Self {
        Self::new(ALL_FIELDS, AggregateOperator::Count)
    }
}

/// Aggregates for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Group-by field values
    pub group: Record,
    pub values: Vec<(Aggregate, Value)>,
}

impl AggregateResult {
    pub fn value(&self, aggregate: &Aggregate) -> Option<&Value> {
        self.values
            .iter()
            .find(|(a, _)| a == aggregate)
            .map(|(_, v)| v)
    }
}

/// Computes group-by aggregates
pub struct Aggregator<'a> {
    evaluator: &'a FilterEvaluator,
}

impl<'a> Aggregator<'a> {
    pub fn new(evaluator: &'a FilterEvaluator) -> Self {
        Self { evaluator }
    }

    /// One result per distinct group, in first-seen order.
    ///
    /// With no group-by fields there is always exactly one result, even
    /// over an empty record set.
    pub fn aggregate(
        &self,
        records: Vec<Record>,
        filter: Option<&FilterExpression>,
        group_by: &[String],
        aggregates: &[Aggregate],
    ) -> FilterResult<Vec<AggregateResult>> {
        let matched = match filter {
            Some(expr) => self.evaluator.filter_by(records, &expr.clauses_only())?,
            None => records,
        };

        let mut groups: Vec<(Vec<Value>, Vec<&Record>)> = Vec::new();
        if group_by.is_empty() {
            groups.push((Vec::new(), matched.iter().collect()));
        } else {
            for record in &matched {
                let key: Vec<Value> = group_by.iter().map(|f| record.value(f).clone()).collect();
                match groups.iter_mut().find(|(k, _)| same_key(k, &key)) {
                    Some((_, members)) => members.push(record),
                    None => groups.push((key, vec![record])),
                }
            }
        }

        let mut results = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let mut group = Record::new();
            for (field, value) in group_by.iter().zip(key) {
                group.set(field.clone(), value);
            }

            let mut values = Vec::with_capacity(aggregates.len());
            for aggregate in aggregates {
                values.push((aggregate.clone(), compute(aggregate, &members)?));
            }
            results.push(AggregateResult { group, values });
        }
        Ok(results)
    }
}

fn same_key(a: &[Value], b: &[Value]) -> bool {
    a.iter().zip(b).all(|(x, y)| match (x.is_null(), y.is_null()) {
        (true, true) => true,
        (false, false) => sort_order(x, y).is_eq(),
        _ => false,
    })
}

fn compute(aggregate: &Aggregate, members: &[&Record]) -> FilterResult<Value> {
    if aggregate.operator == AggregateOperator::Count && aggregate.field == ALL_FIELDS {
        return Ok(Value::Integer(members.len() as i64));
    }

    let present: Vec<&Value> = members
        .iter()
        .map(|r| r.value(&aggregate.field))
        .filter(|v| !v.is_null())
        .collect();

    let value = match aggregate.operator {
        AggregateOperator::Count => Value::Integer(present.len() as i64),
        AggregateOperator::CountDistinct => {
            let mut distinct: Vec<&Value> = Vec::new();
            for v in &present {
                if !distinct.iter().any(|d| sort_order(d, v).is_eq()) {
                    distinct.push(v);
                }
            }
            Value::Integer(distinct.len() as i64)
        }
        AggregateOperator::Min => present
            .iter()
            .copied()
            .min_by(|a, b| sort_order(a, b))
            .cloned()
            .unwrap_or(Value::Null),
        AggregateOperator::Max => present
            .iter()
            .copied()
            .max_by(|a, b| sort_order(a, b))
            .cloned()
            .unwrap_or(Value::Null),
        AggregateOperator::Sum => sum(aggregate, &present)?,
        AggregateOperator::Avg => {
            if present.is_empty() {
                Value::Null
            } else {
                let total = numeric_total(aggregate, &present)?;
                Value::Decimal(total / Decimal::from(present.len() as i64))
            }
        }
    };
    Ok(value)
}

/// Integer sum while every value is an integer and the sum fits; decimal otherwise
fn sum(aggregate: &Aggregate, present: &[&Value]) -> FilterResult<Value> {
    if present.is_empty() {
        return Ok(Value::Null);
    }

    let all_integers = present.iter().all(|v| matches!(v, Value::Integer(_)));
    if all_integers {
        let checked = present
            .iter()
            .try_fold(0i64, |acc, v| v.as_i64().and_then(|i| acc.checked_add(i)));
        if let Some(total) = checked {
            return Ok(Value::Integer(total));
        }
    }
    Ok(Value::Decimal(numeric_total(aggregate, present)?))
}

fn numeric_total(aggregate: &Aggregate, present: &[&Value]) -> FilterResult<Decimal> {
    let mut total = Decimal::ZERO;
    for value in present {
        match value.as_decimal() {
            Some(d) => total += d,
            None => {
                return Err(FilterError::NotNumeric {
                    field: aggregate.field.clone(),
                    operator: aggregate.operator,
                    kind: value.kind(),
                })
            }
        }
    }
    Ok(total)
}

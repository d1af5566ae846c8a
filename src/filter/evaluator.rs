//! In-memory filter evaluation
//!
//! Backends that only store raw records hand their full record set and the
//! caller's `FilterExpression` to `FilterEvaluator`, which applies matching,
//! sorting and pagination with relational semantics:
//!
//! 1. keep records whose clauses match (AND/OR tree, short-circuiting)
//! 2. stable multi-key sort by `order_by`
//! 3. skip, then limit
//!
//! Null handling follows SQL: a null (or absent) field satisfies only
//! `IS_BLANK`, `NOT_EQUALS_OR_IS_NULL`, `IS_NULL_OR_IN` and `TRUE`.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::config::EvaluatorConfig;
use crate::core::{Record, Value};

use super::compare::{compare, values_equal};
use super::criteria::{Criteria, Operator};
use super::errors::{FilterError, FilterResult};
use super::expression::{BooleanOperator, FilterExpression};
use super::sorter::RecordSorter;

/// Evaluates filter expressions over materialized records
#[derive(Debug, Clone, Default)]
pub struct FilterEvaluator {
    config: EvaluatorConfig,
}

impl FilterEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Full pipeline: match, sort, paginate.
    ///
    /// A missing expression returns the records unchanged.
    pub fn filter(
        &self,
        records: Vec<Record>,
        expr: Option<&FilterExpression>,
    ) -> FilterResult<Vec<Record>> {
        let Some(expr) = expr else {
            return Ok(records);
        };

        let mut matched = self.filter_by(records, expr)?;
        RecordSorter::sort(&mut matched, &expr.order_by);
        Ok(paginate(matched, expr.skip, expr.limit))
    }

    /// Matching only; keeps input order
    pub fn filter_by(
        &self,
        records: Vec<Record>,
        expr: &FilterExpression,
    ) -> FilterResult<Vec<Record>> {
        expr.validate()?;
        let matcher = Matcher::new(&self.config);

        let mut matched = Vec::with_capacity(records.len());
        for record in records {
            if matcher.matches(&record, expr)? {
                matched.push(record);
            }
        }
        Ok(matched)
    }

    /// Number of records matching the expression's clauses.
    ///
    /// Ordering and pagination are ignored.
    pub fn count<'a>(
        &self,
        records: impl IntoIterator<Item = &'a Record>,
        expr: Option<&FilterExpression>,
    ) -> FilterResult<usize> {
        let Some(expr) = expr else {
            return Ok(records.into_iter().count());
        };

        expr.validate()?;
        let matcher = Matcher::new(&self.config);
        let mut count = 0;
        for record in records {
            if matcher.matches(record, expr)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Check a single record against an expression
    pub fn matches(&self, record: &Record, expr: &FilterExpression) -> FilterResult<bool> {
        expr.validate()?;
        Matcher::new(&self.config).matches(record, expr)
    }
}

/// Apply skip then limit
pub fn paginate(records: Vec<Record>, skip: Option<usize>, limit: Option<usize>) -> Vec<Record> {
    let skip = skip.unwrap_or(0);
    let limit = limit.unwrap_or(usize::MAX);
    records.into_iter().skip(skip).take(limit).collect()
}

/// Per-call matcher holding compiled LIKE patterns
struct Matcher<'a> {
    config: &'a EvaluatorConfig,
    patterns: RefCell<HashMap<String, Regex>>,
}

impl<'a> Matcher<'a> {
    fn new(config: &'a EvaluatorConfig) -> Self {
        Self {
            config,
            patterns: RefCell::new(HashMap::new()),
        }
    }

    fn matches(&self, record: &Record, expr: &FilterExpression) -> FilterResult<bool> {
        match expr.boolean_operator {
            BooleanOperator::And => {
                for criteria in &expr.criteria {
                    if !self.matches_criteria(record, criteria)? {
                        return Ok(false);
                    }
                }
                for sub_filter in &expr.sub_filters {
                    if !self.matches(record, sub_filter)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BooleanOperator::Or => {
                for criteria in &expr.criteria {
                    if self.matches_criteria(record, criteria)? {
                        return Ok(true);
                    }
                }
                for sub_filter in &expr.sub_filters {
                    if self.matches(record, sub_filter)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn matches_criteria(&self, record: &Record, criteria: &Criteria) -> FilterResult<bool> {
        let value = record.value(&criteria.field);
        let values = &criteria.values;

        match criteria.operator {
            Operator::True => return Ok(true),
            Operator::False => return Ok(false),
            Operator::IsBlank => return Ok(self.is_blank(value)),
            Operator::IsNotBlank => return Ok(!self.is_blank(value)),
            Operator::NotEqualsOrIsNull if value.is_null() => return Ok(true),
            Operator::IsNullOrIn if value.is_null() => return Ok(true),
            _ if value.is_null() => return Ok(false),
            _ => {}
        }

        match criteria.operator {
            Operator::Equals => Ok(values_equal(value, &values[0])),
            Operator::NotEquals | Operator::NotEqualsOrIsNull => {
                Ok(!values[0].is_null() && !values_equal(value, &values[0]))
            }
            Operator::In | Operator::IsNullOrIn => {
                Ok(values.iter().any(|v| values_equal(value, v)))
            }
            Operator::NotIn => Ok(!values.iter().any(|v| v.is_null() || values_equal(value, v))),

            Operator::LessThan => self.ordered(criteria, value, &values[0], Ordering::is_lt),
            Operator::LessThanOrEquals => {
                self.ordered(criteria, value, &values[0], Ordering::is_le)
            }
            Operator::GreaterThan => self.ordered(criteria, value, &values[0], Ordering::is_gt),
            Operator::GreaterThanOrEquals => {
                self.ordered(criteria, value, &values[0], Ordering::is_ge)
            }
            Operator::Between => self.between(criteria, value),
            Operator::NotBetween => {
                if values.iter().any(Value::is_null) {
                    return Ok(false);
                }
                Ok(!self.between(criteria, value)?)
            }

            Operator::Like
            | Operator::NotLike
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::Contains
            | Operator::NotStartsWith
            | Operator::NotEndsWith
            | Operator::NotContains => self.matches_text(criteria, value),

            // handled above
            Operator::True | Operator::False | Operator::IsBlank | Operator::IsNotBlank => {
                Ok(false)
            }
        }
    }

    /// Ordering comparison; unordered pairs are a type mismatch
    fn ordered(
        &self,
        criteria: &Criteria,
        value: &Value,
        bound: &Value,
        test: fn(Ordering) -> bool,
    ) -> FilterResult<bool> {
        if bound.is_null() {
            return Ok(false);
        }
        match compare(value, bound) {
            Some(ordering) => Ok(test(ordering)),
            None => Err(FilterError::TypeMismatch {
                field: criteria.field.clone(),
                operator: criteria.operator,
                record: value.kind(),
                criterion: bound.kind(),
            }),
        }
    }

    /// Inclusive on both ends
    fn between(&self, criteria: &Criteria, value: &Value) -> FilterResult<bool> {
        let (low, high) = (&criteria.values[0], &criteria.values[1]);
        Ok(self.ordered(criteria, value, low, Ordering::is_ge)?
            && self.ordered(criteria, value, high, Ordering::is_le)?)
    }

    fn matches_text(&self, criteria: &Criteria, value: &Value) -> FilterResult<bool> {
        let (Some(text), Some(needle)) = (value.to_text(), criteria.values[0].to_text()) else {
            return Ok(false);
        };

        let (text, needle) = if self.config.case_sensitive {
            (text, needle)
        } else {
            (text.to_lowercase(), needle.to_lowercase())
        };

        let result = match criteria.operator {
            Operator::StartsWith => text.starts_with(&needle),
            Operator::NotStartsWith => !text.starts_with(&needle),
            Operator::EndsWith => text.ends_with(&needle),
            Operator::NotEndsWith => !text.ends_with(&needle),
            Operator::Contains => text.contains(&needle),
            Operator::NotContains => !text.contains(&needle),
            Operator::Like => self.like(criteria, &text, &needle)?,
            Operator::NotLike => !self.like(criteria, &text, &needle)?,
            _ => false,
        };
        Ok(result)
    }

    fn like(&self, criteria: &Criteria, text: &str, pattern: &str) -> FilterResult<bool> {
        if let Some(regex) = self.patterns.borrow().get(pattern) {
            return Ok(regex.is_match(text));
        }

        let regex = RegexBuilder::new(&like_to_regex(pattern))
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| FilterError::InvalidPattern {
                field: criteria.field.clone(),
                reason: e.to_string(),
            })?;
        let is_match = regex.is_match(text);
        self.patterns.borrow_mut().insert(pattern.to_string(), regex);
        Ok(is_match)
    }

    fn is_blank(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) if self.config.blank_trims_whitespace => s.trim().is_empty(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Translate a SQL LIKE pattern (`%`, `_`, backslash escapes) to an
/// anchored regex
fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

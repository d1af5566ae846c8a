//! Filter expressions
//!
//! A boolean tree of criteria and nested sub-filters, plus ordering and
//! pagination. The same expression is handed to every backend; native
//! backends translate it, the rest run it through `FilterEvaluator`.

use serde::{Deserialize, Serialize};

use super::criteria::Criteria;
use super::errors::FilterResult;

/// How the clauses of one expression level combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BooleanOperator {
    #[default]
    And,
    Or,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
    /// Nulls sort before all values when true, after when false,
    /// regardless of direction
    #[serde(default)]
    pub nulls_first: bool,
}

impl OrderBy {
    /// Ascending, nulls first
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
            nulls_first: true,
        }
    }

    /// Descending, nulls last
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
            nulls_first: false,
        }
    }

    pub fn nulls_first(mut self, nulls_first: bool) -> Self {
        self.nulls_first = nulls_first;
        self
    }
}

/// Boolean filter tree with ordering and pagination
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterExpression {
    #[serde(default)]
    pub criteria: Vec<Criteria>,
    #[serde(default)]
    pub sub_filters: Vec<FilterExpression>,
    #[serde(default)]
    pub boolean_operator: BooleanOperator,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl FilterExpression {
    /// Empty AND expression; matches every record
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty expression combining clauses with OR
    pub fn or() -> Self {
        Self {
            boolean_operator: BooleanOperator::Or,
            ..Self::default()
        }
    }

    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    pub fn with_sub_filter(mut self, sub_filter: FilterExpression) -> Self {
        self.sub_filters.push(sub_filter);
        self
    }

    pub fn with_boolean_operator(mut self, op: BooleanOperator) -> Self {
        self.boolean_operator = op;
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by.push(order_by);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when there are no criteria or sub-filters at any level
    pub fn has_no_clauses(&self) -> bool {
        self.criteria.is_empty() && self.sub_filters.is_empty()
    }

    /// Criteria and nesting only, without ordering or pagination.
    ///
    /// Count and Aggregate evaluate this form of the caller's filter.
    pub fn clauses_only(&self) -> FilterExpression {
        FilterExpression {
            criteria: self.criteria.clone(),
            sub_filters: self.sub_filters.clone(),
            boolean_operator: self.boolean_operator,
            ..FilterExpression::default()
        }
    }

    /// Check every criterion's arity, recursively
    pub fn validate(&self) -> FilterResult<()> {
        for criteria in &self.criteria {
            criteria.validate()?;
        }
        for sub_filter in &self.sub_filters {
            sub_filter.validate()?;
        }
        Ok(())
    }
}

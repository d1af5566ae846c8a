//! Filter criteria
//!
//! A criterion is a single `field OPERATOR values` leaf of a filter tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Value;

use super::errors::{FilterError, FilterResult};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    NotEqualsOrIsNull,
    In,
    NotIn,
    IsNullOrIn,
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    Contains,
    NotStartsWith,
    NotEndsWith,
    NotContains,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    IsBlank,
    IsNotBlank,
    Between,
    NotBetween,
    True,
    False,
}

/// Number of values an operator takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Any,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => *n == count,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::Any => f.write_str("any number of"),
        }
    }
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::NotEqualsOrIsNull => "NOT_EQUALS_OR_IS_NULL",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::IsNullOrIn => "IS_NULL_OR_IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT_LIKE",
            Operator::StartsWith => "STARTS_WITH",
            Operator::EndsWith => "ENDS_WITH",
            Operator::Contains => "CONTAINS",
            Operator::NotStartsWith => "NOT_STARTS_WITH",
            Operator::NotEndsWith => "NOT_ENDS_WITH",
            Operator::NotContains => "NOT_CONTAINS",
            Operator::LessThan => "LESS_THAN",
            Operator::LessThanOrEquals => "LESS_THAN_OR_EQUALS",
            Operator::GreaterThan => "GREATER_THAN",
            Operator::GreaterThanOrEquals => "GREATER_THAN_OR_EQUALS",
            Operator::IsBlank => "IS_BLANK",
            Operator::IsNotBlank => "IS_NOT_BLANK",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT_BETWEEN",
            Operator::True => "TRUE",
            Operator::False => "FALSE",
        }
    }

    /// Values this operator requires
    pub fn arity(&self) -> Arity {
        match self {
            Operator::IsBlank | Operator::IsNotBlank | Operator::True | Operator::False => {
                Arity::Exactly(0)
            }
            Operator::Between | Operator::NotBetween => Arity::Exactly(2),
            Operator::In | Operator::NotIn | Operator::IsNullOrIn => Arity::Any,
            _ => Arity::Exactly(1),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single filter leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Criteria {
    pub fn new(field: impl Into<String>, operator: Operator, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            values,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Equals, vec![value.into()])
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::NotEquals, vec![value.into()])
    }

    pub fn in_list<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(
            field,
            Operator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self::new(
            field,
            Operator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::LessThan, vec![value.into()])
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::GreaterThan, vec![value.into()])
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self::new(field, Operator::Between, vec![low.into(), high.into()])
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Contains, vec![value.into()])
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::StartsWith, vec![value.into()])
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, Operator::Like, vec![Value::String(pattern.into())])
    }

    pub fn is_blank(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsBlank, Vec::new())
    }

    pub fn is_not_blank(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNotBlank, Vec::new())
    }

    /// Check the value count against the operator's arity
    pub fn validate(&self) -> FilterResult<()> {
        let arity = self.operator.arity();
        if arity.accepts(self.values.len()) {
            Ok(())
        } else {
            Err(FilterError::InvalidCriteriaArity {
                field: self.field.clone(),
                operator: self.operator,
                expected: arity,
                actual: self.values.len(),
            })
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator)?;
        for (i, value) in self.values.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_requires_two_values() {
        assert!(Criteria::between("age", 1, 5).validate().is_ok());

        let one = Criteria::new("age", Operator::Between, vec![Value::from(1)]);
        assert!(matches!(
            one.validate(),
            Err(FilterError::InvalidCriteriaArity { actual: 1, .. })
        ));

        let three = Criteria::new(
            "age",
            Operator::Between,
            vec![Value::from(1), Value::from(2), Value::from(3)],
        );
        assert!(three.validate().is_err());
    }

    #[test]
    fn test_unary_rejects_values() {
        assert!(Criteria::is_blank("name").validate().is_ok());
        let bad = Criteria::new("name", Operator::IsBlank, vec![Value::from("x")]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_in_accepts_any_count() {
        assert!(Criteria::in_list::<i64>("id", vec![]).validate().is_ok());
        assert!(Criteria::in_list("id", vec![1, 2, 3]).validate().is_ok());
    }

    #[test]
    fn test_operator_serde_names() {
        let json = serde_json::to_string(&Operator::GreaterThanOrEquals).unwrap();
        assert_eq!(json, "\"GREATER_THAN_OR_EQUALS\"");
    }

    #[test]
    fn test_display() {
        let c = Criteria::between("age", 18, 65);
        assert_eq!(c.to_string(), "age BETWEEN 18, 65");
    }
}

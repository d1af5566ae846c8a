//! Filter Semantics Tests
//!
//! Relational behavior of the shared evaluator:
//! - identity and empty boolean trees
//! - empty IN lists, inclusive BETWEEN, arity validation
//! - stable multi-key ordering and pagination
//! - SQL null semantics and the coercion table

use backplane::config::EvaluatorConfig;
use backplane::core::{Record, Value};
use backplane::filter::{
    Criteria, FilterError, FilterEvaluator, FilterExpression, Operator, OrderBy,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

// =============================================================================
// Helper Functions
// =============================================================================

fn people() -> Vec<Record> {
    vec![
        Record::new().with("id", 1).with("name", "A").with("age", 30),
        Record::new().with("id", 2).with("name", "B").with("age", 18),
        Record::new().with("id", 3).with("name", "A").with("age", 65),
        Record::new().with("id", 4).with("name", "C"),
    ]
}

fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .filter_map(|r| r.value("id").as_i64())
        .collect()
}

fn run(expr: FilterExpression) -> Vec<i64> {
    let records = FilterEvaluator::default().filter(people(), Some(&expr)).unwrap();
    ids(&records)
}

// =============================================================================
// Boolean Tree Tests
// =============================================================================

/// No expression returns the input unchanged.
#[test]
fn test_identity_filter() {
    let out = FilterEvaluator::default().filter(people(), None).unwrap();
    assert_eq!(out, people());
}

/// AND over nothing matches everything; OR over nothing matches nothing.
#[test]
fn test_empty_trees() {
    assert_eq!(run(FilterExpression::new()), vec![1, 2, 3, 4]);
    assert_eq!(run(FilterExpression::or()), Vec::<i64>::new());
}

#[test]
fn test_nested_or_inside_and() {
    let expr = FilterExpression::new()
        .with_criteria(Criteria::equals("name", "A"))
        .with_sub_filter(
            FilterExpression::or()
                .with_criteria(Criteria::less_than("age", 40))
                .with_criteria(Criteria::is_blank("age")),
        );
    assert_eq!(run(expr), vec![1]);
}

// =============================================================================
// Operator Tests
// =============================================================================

#[test]
fn test_empty_in_list() {
    let none: Vec<Value> = Vec::new();
    let in_none = FilterExpression::new().with_criteria(Criteria::in_list("id", none.clone()));
    assert!(run(in_none).is_empty());
    // NOT IN () keeps every non-null value
    assert_eq!(
        run(FilterExpression::new().with_criteria(Criteria::not_in("age", none.clone()))),
        vec![1, 2, 3]
    );
    assert_eq!(
        run(FilterExpression::new().with_criteria(Criteria::not_in("name", none))),
        vec![1, 2, 3, 4]
    );
}

#[test]
fn test_between_is_inclusive() {
    let expr = FilterExpression::new().with_criteria(Criteria::between("age", 18, 30));
    assert_eq!(run(expr), vec![1, 2]);
}

/// NOT BETWEEN excludes the bounds and never matches a null value.
#[test]
fn test_not_between() {
    let not_between = |values: Vec<Value>| {
        run(FilterExpression::new().with_criteria(Criteria::new(
            "age",
            Operator::NotBetween,
            values,
        )))
    };
    assert_eq!(not_between(vec![18.into(), 30.into()]), vec![3]);
    assert_eq!(not_between(vec![19.into(), 64.into()]), vec![2, 3]);
}

/// A null bound makes both range operators unknown, so nothing matches.
#[test]
fn test_range_with_null_bound_matches_nothing() {
    let range = |op: Operator| {
        run(FilterExpression::new().with_criteria(Criteria::new(
            "age",
            op,
            vec![Value::Null, 30.into()],
        )))
    };
    assert!(range(Operator::NotBetween).is_empty());
    assert!(range(Operator::Between).is_empty());
}

#[test]
fn test_arity_errors_are_reported() {
    let expr = FilterExpression::new().with_criteria(Criteria::new(
        "age",
        Operator::Between,
        vec![Value::Integer(1)],
    ));
    let err = FilterEvaluator::default()
        .filter(people(), Some(&expr))
        .unwrap_err();
    assert!(matches!(
        err,
        FilterError::InvalidCriteriaArity { actual: 1, .. }
    ));
}

#[test]
fn test_null_matches_only_null_tolerant_operators() {
    let age_null = |op: Operator, values: Vec<Value>| {
        run(FilterExpression::new().with_criteria(Criteria::new("age", op, values)))
            .contains(&4)
    };
    assert!(!age_null(Operator::Equals, vec![Value::Integer(30)]));
    assert!(!age_null(Operator::NotEquals, vec![Value::Integer(30)]));
    assert!(!age_null(Operator::NotIn, vec![Value::Integer(30)]));
    assert!(age_null(Operator::NotEqualsOrIsNull, vec![Value::Integer(30)]));
    assert!(age_null(Operator::IsNullOrIn, vec![Value::Integer(30)]));
    assert!(age_null(Operator::IsBlank, vec![]));
    assert!(age_null(Operator::True, vec![]));
}

#[test]
fn test_like_patterns() {
    let records = vec![
        Record::new().with("id", 1).with("file", "report_2024.csv"),
        Record::new().with("id", 2).with("file", "report-2024.csv"),
        Record::new().with("id", 3).with("file", "summary.txt"),
    ];
    let evaluator = FilterEvaluator::default();
    let matching = |pattern: &str| {
        let expr = FilterExpression::new().with_criteria(Criteria::like("file", pattern));
        ids(&evaluator.filter(records.clone(), Some(&expr)).unwrap())
    };
    assert_eq!(matching("report%"), vec![1, 2]);
    assert_eq!(matching("report\\_%"), vec![1]);
    assert_eq!(matching("%.t_t"), vec![3]);
    assert_eq!(matching("REPORT%"), Vec::<i64>::new());
}

#[test]
fn test_negated_string_operators() {
    let records = vec![
        Record::new().with("id", 1).with("file", "report_2024.csv"),
        Record::new().with("id", 2).with("file", "summary.txt"),
        Record::new().with("id", 3).with("file", "Report.CSV"),
        Record::new().with("id", 4),
    ];
    let evaluator = FilterEvaluator::default();
    let matching = |op: Operator, needle: &str| {
        let expr =
            FilterExpression::new().with_criteria(Criteria::new("file", op, vec![needle.into()]));
        ids(&evaluator.filter(records.clone(), Some(&expr)).unwrap())
    };

    // the record without a file never matches
    assert_eq!(matching(Operator::NotStartsWith, "report"), vec![2, 3]);
    assert_eq!(matching(Operator::NotEndsWith, ".csv"), vec![2, 3]);
    assert_eq!(matching(Operator::NotContains, "2024"), vec![2, 3]);
    assert_eq!(matching(Operator::NotContains, "r"), Vec::<i64>::new());

    let insensitive = FilterEvaluator::new(EvaluatorConfig::case_insensitive());
    let expr = FilterExpression::new().with_criteria(Criteria::new(
        "file",
        Operator::NotEndsWith,
        vec![".csv".into()],
    ));
    let out = insensitive.filter(records.clone(), Some(&expr)).unwrap();
    assert_eq!(ids(&out), vec![2]);
}

#[test]
fn test_case_insensitive_policy() {
    let evaluator = FilterEvaluator::new(EvaluatorConfig::case_insensitive());
    let expr = FilterExpression::new().with_criteria(Criteria::starts_with("name", "a"));
    let out = evaluator.filter(people(), Some(&expr)).unwrap();
    assert_eq!(ids(&out), vec![1, 3]);
}

// =============================================================================
// Coercion Tests
// =============================================================================

#[test]
fn test_coercion_table() {
    let records = vec![
        Record::new()
            .with("id", 1)
            .with("price", Decimal::new(1050, 2))
            .with("born", NaiveDate::from_ymd_opt(2000, 1, 31).unwrap())
            .with("active", "true"),
    ];
    let evaluator = FilterEvaluator::default();
    let hit = |criteria: Criteria| {
        let expr = FilterExpression::new().with_criteria(criteria);
        !evaluator.filter(records.clone(), Some(&expr)).unwrap().is_empty()
    };

    // decimal vs integer and vs numeric string
    assert!(hit(Criteria::greater_than("price", 10)));
    assert!(hit(Criteria::equals("price", "10.50")));
    // date vs ISO string
    assert!(hit(Criteria::equals("born", "2000-01-31")));
    // string vs boolean
    assert!(hit(Criteria::equals("active", true)));
    // mismatch means not equal
    assert!(!hit(Criteria::equals("price", true)));
}

#[test]
fn test_ordering_mismatch_is_an_error() {
    let expr = FilterExpression::new().with_criteria(Criteria::greater_than("name", 5));
    let err = FilterEvaluator::default()
        .filter(people(), Some(&expr))
        .unwrap_err();
    assert_eq!(err.code(), "TYPE_MISMATCH");
}

// =============================================================================
// Ordering and Pagination Tests
// =============================================================================

/// Equal keys keep their input order.
#[test]
fn test_sort_is_stable() {
    let expr = FilterExpression::new().with_order_by(OrderBy::asc("name"));
    assert_eq!(run(expr), vec![1, 3, 2, 4]);
}

#[test]
fn test_multi_key_sort() {
    let expr = FilterExpression::new()
        .with_order_by(OrderBy::asc("name"))
        .with_order_by(OrderBy::desc("age"));
    assert_eq!(run(expr), vec![3, 1, 2, 4]);
}

#[test]
fn test_null_placement_independent_of_direction() {
    let asc = FilterExpression::new().with_order_by(OrderBy::asc("age").nulls_first(false));
    assert_eq!(run(asc), vec![2, 1, 3, 4]);
    let desc = FilterExpression::new().with_order_by(OrderBy::desc("age").nulls_first(true));
    assert_eq!(run(desc), vec![4, 3, 1, 2]);
}

#[test]
fn test_skip_and_limit() {
    let expr = FilterExpression::new()
        .with_order_by(OrderBy::asc("id"))
        .with_skip(1)
        .with_limit(2);
    assert_eq!(run(expr), vec![2, 3]);

    let past_end = FilterExpression::new().with_skip(10);
    assert!(run(past_end).is_empty());
}

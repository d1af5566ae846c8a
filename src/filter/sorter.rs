//! Record sorting
//!
//! Sorts records by a list of order-by keys, deterministically.

use std::cmp::Ordering;

use crate::core::{Record, Value};

use super::compare::sort_order;
use super::expression::{Direction, OrderBy};

/// Sorts records
pub struct RecordSorter;

impl RecordSorter {
    /// Sorts records by the given keys in declared order.
    ///
    /// Sort is stable: records equal on every key keep their input order.
    pub fn sort(records: &mut [Record], order_by: &[OrderBy]) {
        if order_by.is_empty() {
            return;
        }
        records.sort_by(|a, b| Self::compare_records(a, b, order_by));
    }

    /// Lexicographic comparison over all keys
    pub fn compare_records(a: &Record, b: &Record, order_by: &[OrderBy]) -> Ordering {
        for key in order_by {
            let ordering = Self::compare_key(a.value(&key.field), b.value(&key.field), key);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Null placement is fixed by `nulls_first`; direction only reverses
    /// the ordering of non-null values.
    fn compare_key(a: &Value, b: &Value, key: &OrderBy) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if key.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if key.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = sort_order(a, b);
                match key.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(records: &[Record]) -> Vec<i64> {
        records
            .iter()
            .filter_map(|r| r.value("seq").as_i64())
            .collect()
    }

    #[test]
    fn test_sort_stable() {
        let mut records = vec![
            Record::new().with("k", 1).with("seq", 1),
            Record::new().with("k", 1).with("seq", 2),
        ];
        RecordSorter::sort(&mut records, &[OrderBy::asc("k")]);
        assert_eq!(seqs(&records), vec![1, 2]);

        RecordSorter::sort(&mut records, &[OrderBy::desc("k")]);
        assert_eq!(seqs(&records), vec![1, 2]);
    }

    #[test]
    fn test_multi_key() {
        let mut records = vec![
            Record::new().with("last", "Smith").with("first", "Zed").with("seq", 1),
            Record::new().with("last", "Jones").with("first", "Amy").with("seq", 2),
            Record::new().with("last", "Smith").with("first", "Ann").with("seq", 3),
        ];
        RecordSorter::sort(
            &mut records,
            &[OrderBy::desc("last"), OrderBy::asc("first")],
        );
        assert_eq!(seqs(&records), vec![3, 1, 2]);
    }

    #[test]
    fn test_nulls_placement_independent_of_direction() {
        let base = vec![
            Record::new().with("v", 2).with("seq", 1),
            Record::new().with("seq", 2),
            Record::new().with("v", 1).with("seq", 3),
        ];

        let mut records = base.clone();
        RecordSorter::sort(&mut records, &[OrderBy::asc("v")]);
        assert_eq!(seqs(&records), vec![2, 3, 1]);

        let mut records = base.clone();
        RecordSorter::sort(&mut records, &[OrderBy::desc("v")]);
        assert_eq!(seqs(&records), vec![1, 3, 2]);

        let mut records = base;
        RecordSorter::sort(&mut records, &[OrderBy::desc("v").nulls_first(true)]);
        assert_eq!(seqs(&records), vec![2, 1, 3]);
    }

    #[test]
    fn test_mixed_types_use_rank() {
        let mut records = vec![
            Record::new().with("v", "b").with("seq", 1),
            Record::new().with("v", 10).with("seq", 2),
            Record::new().with("v", true).with("seq", 3),
        ];
        RecordSorter::sort(&mut records, &[OrderBy::asc("v")]);
        assert_eq!(seqs(&records), vec![3, 2, 1]);
    }
}

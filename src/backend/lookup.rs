//! Key lookups shared by the built-in backends
//!
//! Keys match strictly: no type coercion, and null never matches.

use crate::core::{Record, Value};
use crate::filter::sort_order;

use super::errors::{BackendError, BackendResult};

/// Key equality: null never matches, otherwise exact under sort order
pub fn same_key(a: &Value, b: &Value) -> bool {
    !a.is_null() && !b.is_null() && sort_order(a, b).is_eq()
}

/// The one record whose `field` equals `key`
pub fn find_by_key<I>(records: I, field: &str, key: &Value) -> Option<Record>
where
    I: IntoIterator<Item = Record>,
{
    records.into_iter().find(|r| same_key(r.value(field), key))
}

/// The record matching every `(field, value)` pair.
///
/// More than one match is an error; a unique key that is not unique in the
/// data never picks a record silently.
pub fn find_unique<I>(
    records: I,
    table: &str,
    pairs: &[(String, Value)],
) -> BackendResult<Option<Record>>
where
    I: IntoIterator<Item = Record>,
{
    if pairs.is_empty() {
        return Err(BackendError::invalid_input("unique key has no fields"));
    }
    let mut matches = records.into_iter().filter(|r| {
        pairs
            .iter()
            .all(|(field, value)| same_key(r.value(field), value))
    });
    let first = matches.next();
    if matches.next().is_some() {
        return Err(BackendError::invalid_input(format!(
            "unique key matched more than one record in '{}'",
            table
        )));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("code", "a").with("zone", 1),
            Record::new().with("id", 2).with("code", "a").with("zone", 2),
        ]
    }

    #[test]
    fn test_keys_do_not_coerce() {
        assert!(same_key(&Value::Integer(1), &Value::Integer(1)));
        assert!(!same_key(&Value::Integer(1), &Value::from("1")));
        assert!(!same_key(&Value::Null, &Value::Null));
        assert!(find_by_key(rows(), "id", &Value::from("2")).is_none());
    }

    #[test]
    fn test_unique_lookup() {
        let pairs = vec![
            ("code".to_string(), Value::from("a")),
            ("zone".to_string(), 2.into()),
        ];
        let found = find_unique(rows(), "t", &pairs).unwrap().unwrap();
        assert_eq!(found.value("id"), &Value::Integer(2));

        let ambiguous = vec![("code".to_string(), Value::from("a"))];
        assert!(matches!(
            find_unique(rows(), "t", &ambiguous),
            Err(BackendError::InvalidInput(_))
        ));
        assert!(find_unique(rows(), "t", &[]).is_err());
    }
}

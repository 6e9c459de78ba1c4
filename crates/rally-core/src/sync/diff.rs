//! Snapshot differencing
//!
//! Items are keyed by id. Change detection compares the structural JSON
//! value of each item, so field order never produces a spurious update.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::Entity;

/// An item present in both snapshots whose content changed
#[derive(Debug, Clone, PartialEq)]
pub struct Update<T> {
    pub previous: T,
    pub next: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diff<T> {
    pub inserts: Vec<T>,
    pub updates: Vec<Update<T>>,
    pub deletes: Vec<T>,
}

impl<T> Diff<T> {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }
}

/// Compute the insert, update and delete sets taking `previous` to `next`.
///
/// If an id repeats within one snapshot only its first occurrence counts.
pub fn compute<T: Entity>(previous: &[T], next: &[T]) -> Diff<T> {
    let mut before: HashMap<&str, &T> = HashMap::with_capacity(previous.len());
    for item in previous {
        before.entry(item.id()).or_insert(item);
    }

    let mut seen = HashSet::with_capacity(next.len());
    let mut inserts = Vec::new();
    let mut updates = Vec::new();

    for item in next {
        if !seen.insert(item.id()) {
            continue;
        }
        match before.get(item.id()) {
            None => inserts.push(item.clone()),
            Some(old) if !structurally_equal(*old, item) => updates.push(Update {
                previous: (*old).clone(),
                next: item.clone(),
            }),
            Some(_) => {}
        }
    }

    let mut deleted = HashSet::new();
    let deletes = previous
        .iter()
        .filter(|item| !seen.contains(item.id()) && deleted.insert(item.id()))
        .cloned()
        .collect();

    Diff {
        inserts,
        updates,
        deletes,
    }
}

/// Structural equality of the serialized values.
pub fn structurally_equal<T: Serialize>(left: &T, right: &T) -> bool {
    match (serde_json::to_value(left), serde_json::to_value(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::SessionSetting;

    fn item(id: &str, value: &str) -> SessionSetting {
        SessionSetting {
            id: id.to_string(),
            session_id: "s1".to_string(),
            key: "v".to_string(),
            value: json!(value),
        }
    }

    fn ids<'a>(items: impl IntoIterator<Item = &'a SessionSetting>) -> Vec<&'a str> {
        items.into_iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn computes_insert_update_and_delete_sets() {
        let previous = vec![item("1", "a"), item("2", "b")];
        let next = vec![item("1", "a"), item("2", "c"), item("3", "d")];

        let diff = compute(&previous, &next);
        assert_eq!(ids(&diff.inserts), vec!["3"]);
        assert_eq!(ids(diff.updates.iter().map(|update| &update.next)), vec!["2"]);
        assert_eq!(diff.updates[0].previous.value, json!("b"));
        assert!(diff.deletes.is_empty());
    }

    #[test]
    fn unchanged_snapshot_has_empty_diff() {
        let snapshot = vec![item("1", "a"), item("2", "b")];
        let diff = compute(&snapshot, &snapshot.clone());
        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
    }

    #[test]
    fn missing_items_are_deleted() {
        let previous = vec![item("1", "a"), item("2", "b")];
        let diff = compute(&previous, &[item("2", "b")]);
        assert_eq!(ids(&diff.deletes), vec!["1"]);
        assert!(diff.inserts.is_empty());
    }

    #[test]
    fn key_order_inside_values_does_not_count_as_change() {
        let mut left = item("1", "a");
        left.value = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let mut right = item("1", "a");
        right.value = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();

        assert!(compute(&[left], &[right]).is_empty());
    }

    #[test]
    fn repeated_ids_count_once() {
        let next = vec![item("1", "a"), item("1", "z")];
        let diff = compute(&[], &next);
        assert_eq!(diff.inserts.len(), 1);
        assert_eq!(diff.inserts[0].value, json!("a"));
    }
}

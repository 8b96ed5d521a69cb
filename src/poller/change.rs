//! Change detection between consecutive snapshots of the same kind.

/// `true` when `current` carries new information relative to `previous`.
///
/// Plain structural inequality: nothing is treated as volatile, and a
/// reordered array counts as a change.
#[must_use]
pub fn changed<T: PartialEq>(previous: Option<&T>, current: &T) -> bool {
    previous != Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchesSnapshot, TimingsSnapshot};
    use serde_json::json;

    #[test]
    fn first_snapshot_is_a_change() {
        let t = TimingsSnapshot::new(json!({"server_datetime": 1}));
        assert!(changed(None, &t));
    }

    #[test]
    fn identical_snapshot_is_not_a_change() {
        let t = TimingsSnapshot::new(json!({"server_datetime": 1, "channels": [{"id": 1}]}));
        assert!(!changed(Some(&t.clone()), &t));
    }

    #[test]
    fn object_key_order_is_ignored() {
        let a = MatchesSnapshot::new(json!({"a": 1, "b": 2}));
        let b = MatchesSnapshot::new(json!({"b": 2, "a": 1}));
        assert!(!changed(Some(&a), &b));
    }

    #[test]
    fn any_field_difference_is_a_change() {
        let a = TimingsSnapshot::new(json!({"competition": {"id": 42}}));
        let b = TimingsSnapshot::new(json!({"competition": {"id": 43}}));
        assert!(changed(Some(&a), &b));
    }

    #[test]
    fn array_reorder_is_a_change() {
        let a = MatchesSnapshot::new(json!({"channels": [1, 2]}));
        let b = MatchesSnapshot::new(json!({"channels": [2, 1]}));
        assert!(changed(Some(&a), &b));
    }
}

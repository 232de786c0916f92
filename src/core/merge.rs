//! Batch merge engine.
//!
//! Per-batch accumulators are folded with [`Merge`]: numbers sum, flags OR, sequences
//! concatenate, mappings merge key by key (unseen keys start from their default). The typed
//! impls are associative, and commutative for every additive field, so batches can be folded
//! in any grouping.
//!
//! [`serde_json::Value`] gets the same rules plus documented fallbacks for heterogeneous
//! shapes: a scalar meeting a sequence is appended to it, any other mismatch lets the
//! source win. Mismatches are logged, never raised.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, warn};

/// Fold another value of the same shape into `self`
pub trait Merge {
    fn merge(&mut self, other: Self);
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) {
        *self = self.saturating_add(other);
    }
}

impl Merge for usize {
    fn merge(&mut self, other: Self) {
        *self = self.saturating_add(other);
    }
}

impl Merge for f64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

impl Merge for bool {
    fn merge(&mut self, other: Self) {
        *self = *self || other;
    }
}

impl<T> Merge for Vec<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<T: Ord> Merge for BTreeSet<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<K: Ord, V: Merge + Default> Merge for BTreeMap<K, V> {
    fn merge(&mut self, other: Self) {
        for (key, value) in other {
            self.entry(key).or_default().merge(value);
        }
    }
}

/// Implement [`Merge`] for a struct by merging each listed field
macro_rules! impl_merge {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::core::merge::Merge for $ty {
            fn merge(&mut self, other: Self) {
                $( $crate::core::merge::Merge::merge(&mut self.$field, other.$field); )+
            }
        }
    };
}

pub(crate) use impl_merge;

/// Left fold of many accumulators, starting from the default
pub fn merge_all<T, I>(items: I) -> T
where
    T: Merge + Default,
    I: IntoIterator<Item = T>,
{
    items.into_iter().fold(T::default(), |mut acc, item| {
        acc.merge(item);
        acc
    })
}

impl Merge for Value {
    fn merge(&mut self, other: Self) {
        merge_value("<root>", self, other);
    }
}

fn merge_value(key: &str, target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (child_key, child_value) in source_map {
                let slot = target_map
                    .entry(child_key.clone())
                    .or_insert_with(|| empty_like(&child_value));
                merge_value(&child_key, slot, child_value);
            }
        }
        (Value::Array(target_items), Value::Array(source_items)) => {
            target_items.extend(source_items);
        }
        (Value::Number(target_num), Value::Number(source_num)) => {
            *target_num = add_numbers(target_num, &source_num);
        }
        (Value::Bool(target_flag), Value::Bool(source_flag)) => {
            *target_flag = *target_flag || source_flag;
        }
        (Value::Array(target_items), source @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => {
            warn!("Merge type mismatch for '{}': appending scalar {} to sequence", key, source);
            target_items.push(source);
        }
        (target @ (Value::Number(_) | Value::Bool(_) | Value::String(_)), Value::Array(mut source_items)) => {
            warn!("Merge type mismatch for '{}': coercing scalar {} into sequence", key, target);
            let scalar = std::mem::take(target);
            source_items.insert(0, scalar);
            *target = Value::Array(source_items);
        }
        (target @ Value::Null, source) => {
            *target = source;
        }
        (target, source) => {
            if std::mem::discriminant(target) != std::mem::discriminant(&source) {
                warn!(
                    "Merge type mismatch for '{}': {} replaced by {}",
                    key,
                    kind_name(target),
                    kind_name(&source)
                );
            } else {
                debug!("Last merge wins for '{}'", key);
            }
            *target = source;
        }
    }
}

fn empty_like(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::Object(serde_json::Map::new()),
        Value::Array(_) => Value::Array(Vec::new()),
        _ => Value::Null,
    }
}

fn add_numbers(a: &serde_json::Number, b: &serde_json::Number) -> serde_json::Number {
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        if let Some(sum) = x.checked_add(y) {
            return sum.into();
        }
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return sum.into();
        }
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    serde_json::Number::from_f64(sum).unwrap_or_else(|| a.clone())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tally {
        count: u64,
        seen: bool,
        files: Vec<String>,
        kinds: BTreeMap<String, u64>,
    }

    impl_merge!(Tally { count, seen, files, kinds });

    #[test]
    fn test_counts_saturate_instead_of_overflowing() {
        let mut count = u64::MAX;
        count.merge(1);
        assert_eq!(count, u64::MAX);

        let mut files = usize::MAX - 1;
        files.merge(5);
        assert_eq!(files, usize::MAX);
    }

    fn tally(count: u64, seen: bool, file: &str, kind: &str) -> Tally {
        Tally {
            count,
            seen,
            files: vec![file.to_string()],
            kinds: BTreeMap::from([(kind.to_string(), count)]),
        }
    }

    #[test]
    fn test_typed_merge_sums_ors_and_concatenates() {
        let merged: Tally = merge_all(vec![tally(2, false, "a", "x"), tally(3, true, "b", "x")]);
        assert_eq!(merged.count, 5);
        assert!(merged.seen);
        assert_eq!(merged.files, vec!["a", "b"]);
        assert_eq!(merged.kinds["x"], 5);
    }

    #[test]
    fn test_typed_merge_is_associative() {
        let (a, b, c) = (tally(1, false, "a", "x"), tally(4, true, "b", "y"), tally(7, false, "c", "x"));

        let mut left = a.clone();
        left.merge(b.clone());
        left.merge(c.clone());

        let mut right_tail = b;
        right_tail.merge(c);
        let mut right = a;
        right.merge(right_tail);

        assert_eq!(left, right);
    }

    #[test]
    fn test_value_merge_recurses_and_sums() {
        let mut target = json!({"secrets": {"count": 1, "files": ["a.py"]}, "flag": false});
        target.merge(json!({"secrets": {"count": 2, "files": ["b.py"]}, "flag": true, "new": {"x": 1}}));

        assert_eq!(
            target,
            json!({"secrets": {"count": 3, "files": ["a.py", "b.py"]}, "flag": true, "new": {"x": 1}})
        );
    }

    #[test]
    fn test_value_merge_coerces_scalar_and_sequence() {
        let mut target = json!({"hits": 3});
        target.merge(json!({"hits": [4]}));
        assert_eq!(target, json!({"hits": [3, 4]}));

        let mut target = json!({"hits": [1]});
        target.merge(json!({"hits": 2}));
        assert_eq!(target, json!({"hits": [1, 2]}));
    }

    #[test]
    fn test_value_merge_other_mismatch_source_wins() {
        let mut target = json!({"label": {"nested": true}});
        target.merge(json!({"label": "Cloud-Ready"}));
        assert_eq!(target, json!({"label": "Cloud-Ready"}));

        let mut target = json!({"level": "low"});
        target.merge(json!({"level": "high"}));
        assert_eq!(target, json!({"level": "high"}));
    }

    #[test]
    fn test_value_merge_mixed_numbers() {
        let mut target = json!(1.5);
        target.merge(json!(2));
        assert_eq!(target, json!(3.5));
    }
}

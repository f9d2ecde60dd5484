//! Property-based test generators using proptest.

use appxf_codec::Value;
use proptest::prelude::*;

/// Strategy for scalar values. Floats are finite.
pub fn leaf_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 _.-]{0,16}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

/// Strategy for nested values of every variant.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_value_strategy().prop_recursive(3, 24, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::List),
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Tuple),
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::set),
            prop::collection::vec(("[a-z]{1,8}", inner), 0..5)
                .prop_map(Value::text_map),
        ]
    })
}

/// Strategy for item names valid on every backend.
pub fn item_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_-]{0,23}").expect("Invalid regex")
}

/// One step of a two-location history.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncStep {
    /// Store a value at location A.
    StoreA(Value),
    /// Store a value at location B.
    StoreB(Value),
    /// Sync A and B.
    Sync,
}

/// Strategy for a single step. Syncs are as likely as stores.
pub fn sync_step_strategy() -> impl Strategy<Value = SyncStep> {
    prop_oneof![
        1 => leaf_value_strategy().prop_map(SyncStep::StoreA),
        1 => leaf_value_strategy().prop_map(SyncStep::StoreB),
        2 => Just(SyncStep::Sync),
    ]
}

/// Strategy for a history of up to `max_len` steps.
pub fn sync_history_strategy(max_len: usize) -> impl Strategy<Value = Vec<SyncStep>> {
    prop::collection::vec(sync_step_strategy(), 1..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn values_stay_shallow(v in value_strategy()) {
            prop_assert!(v.depth() <= appxf_codec::MAX_DEPTH);
        }

        #[test]
        fn item_names_are_plain(name in item_name_strategy()) {
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains('/'));
        }

        #[test]
        fn histories_are_bounded(history in sync_history_strategy(8)) {
            prop_assert!(!history.is_empty() && history.len() <= 8);
        }
    }
}

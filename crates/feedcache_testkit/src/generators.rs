//! Property-based test generators using proptest.

use feedcache_codec::{Category, ChangeEvent, Record, RecordId};
use proptest::prelude::*;

/// Strategy for record ids in a small range, so that generated operations
/// collide often.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    1..64i64
}

/// Strategy for categories.
pub fn category_strategy() -> impl Strategy<Value = Category> {
    prop_oneof![Just(Category::A), Just(Category::B)]
}

/// Strategy for records.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    (
        record_id_strategy(),
        "[A-Z][a-z]{2,11}",
        category_strategy(),
        any::<i64>(),
    )
        .prop_map(|(id, name, category, number)| Record::new(id, name, category, number))
}

/// Strategy for well-formed change events.
pub fn change_event_strategy() -> impl Strategy<Value = ChangeEvent> {
    prop_oneof![
        record_strategy().prop_map(ChangeEvent::insert),
        record_strategy().prop_map(ChangeEvent::replace),
        record_strategy().prop_map(ChangeEvent::update),
        record_id_strategy().prop_map(ChangeEvent::delete),
    ]
}

/// Strategy for a sequence of change events.
pub fn change_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<ChangeEvent>> {
    prop::collection::vec(change_event_strategy(), 0..max_len)
}

//! Random record fixtures and seeded stores.

use feedcache_codec::{Category, Record, RecordId};
use feedcache_store::MemoryRecordStore;
use rand::Rng;

const CATEGORY_A_NAMES: &[&str] = &[
    "Alexander", "Boris", "Dmitry", "Ivan", "Maxim", "Mikhail", "Nikita", "Pavel",
];

const CATEGORY_B_NAMES: &[&str] = &[
    "Anna", "Daria", "Elena", "Irina", "Maria", "Natalia", "Olga", "Sofia",
];

/// Lowest generated number.
pub const NUMBER_BASE: i64 = 9_000_000_000;

/// Width of the generated number range.
pub const NUMBER_SPAN: i64 = 10_000_000_000;

/// Returns a random category.
pub fn random_category() -> Category {
    if rand::thread_rng().gen_bool(0.5) {
        Category::A
    } else {
        Category::B
    }
}

/// Returns a name drawn from the list for `category`.
pub fn random_name(category: Category) -> String {
    let names = match category {
        Category::A => CATEGORY_A_NAMES,
        Category::B => CATEGORY_B_NAMES,
    };
    names[rand::thread_rng().gen_range(0..names.len())].to_string()
}

/// Returns a random phone-like number.
pub fn random_number() -> i64 {
    NUMBER_BASE + rand::thread_rng().gen_range(0..NUMBER_SPAN)
}

/// Returns a random record with the given id.
pub fn random_record(id: RecordId) -> Record {
    let category = random_category();
    Record::new(id, random_name(category), category, random_number())
}

/// Returns `count` random records with ids `1..=count`.
pub fn random_records(count: usize) -> Vec<Record> {
    (1..=count as RecordId).map(random_record).collect()
}

/// Creates a memory store pre-populated with `count` random records.
///
/// Seeding does not emit change events.
pub fn seeded_store(count: usize) -> MemoryRecordStore {
    MemoryRecordStore::with_records(random_records(count)).expect("seed records")
}

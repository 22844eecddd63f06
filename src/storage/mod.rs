mod kv;
mod results;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use results::{
    LEGACY_ANSWERS_KEY, LEGACY_CORRECT_KEY, LEGACY_CORRECTNESS_KEY, LEGACY_TOTAL_KEY,
    ResultStore, SELECTED_GROUP_KEY, SUMMARY_KEY,
};

//! Database layer (Firestore, plus an in-memory key store for tests).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryKeyStore;

/// Collection names as constants.
pub mod collections {
    pub const WEIGHT_LOGS: &str = "weight_logs";
    pub const MEAL_LOGS: &str = "meal_logs";
    pub const EXERCISE_LOGS: &str = "exercise_logs";
    pub const BODY_MEASUREMENTS: &str = "body_measurements";
    pub const USER_GOALS: &str = "user_goals";
    /// One document per user, keyed by user ID
    pub const USER_SETTINGS: &str = "user_settings";
    /// Keyed by (user, food, date); see `SynValue::document_id`
    pub const SYN_VALUES: &str = "syn_values";
    pub const CONNECT_KEYS: &str = "connect_keys";
}

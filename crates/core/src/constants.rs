/// Constants used throughout the keylens codebase
// Key hierarchy
pub const KEY_DELIMITER: char = ':';
pub const ROOT_LABEL: &str = "ROOT";
pub const WILDCARD_SUFFIX: &str = ":*";

// Rendering of values that have no samples
pub const NOT_APPLICABLE: &str = "n/a";

// Environment variable names
pub const KEYLENS_LOG_VAR: &str = "KEYLENS_LOG";
pub const KEYLENS_STORE_URL_VAR: &str = "KEYLENS_STORE_URL";
pub const KEYLENS_SOURCE_URL_VAR: &str = "KEYLENS_SOURCE_URL";
pub const KEYLENS_WORKERS_VAR: &str = "KEYLENS_WORKERS";
pub const KEYLENS_LEVELS_VAR: &str = "KEYLENS_LEVELS";
pub const KEYLENS_SIMILARITY_VAR: &str = "KEYLENS_SIMILARITY";
pub const KEYLENS_MAX_KEYS_VAR: &str = "KEYLENS_MAX_KEYS";
pub const KEYLENS_SNAPSHOT_DIR_VAR: &str = "KEYLENS_SNAPSHOT_DIR";

// Defaults
pub const DEFAULT_STORE_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_REPORT_LEVELS: usize = 3;
pub const DEFAULT_SIMILARITY: f64 = 0.2;

// Redis hash field names for a StatRecord
pub const FIELD_READS: &str = "get";
pub const FIELD_WRITES: &str = "set";
pub const FIELD_AVG_SIZE: &str = "size";
pub const FIELD_LAST_WRITE_AT: &str = "last_set";
pub const FIELD_LIFETIME: &str = "lifetime";

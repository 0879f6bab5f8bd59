//! Operation classification

use keylens_core::OperationClass;

/// Commands counted as reads
pub const READ_COMMANDS: &[&str] = &["GET", "MGET", "HGET", "HMGET", "HGETALL"];

/// Commands counted as writes
pub const WRITE_COMMANDS: &[&str] = &[
    "SET", "HMSET", "HSET", "HSETNX", "LSET", "MSET", "MSETNX", "PSETEX", "SETEX", "SETNX",
    "SETRANGE",
];

/// Commands that end a key's write window
pub const DELETE_COMMANDS: &[&str] = &["DEL", "UNLINK"];

/// Map a command mnemonic onto its class. Matching is case-sensitive.
pub fn classify(mnemonic: &str) -> OperationClass {
    if READ_COMMANDS.contains(&mnemonic) {
        OperationClass::Read
    } else if WRITE_COMMANDS.contains(&mnemonic) {
        OperationClass::Write
    } else if DELETE_COMMANDS.contains(&mnemonic) {
        OperationClass::Delete
    } else {
        OperationClass::Ignore
    }
}

//! Field-map encoding of a `StatRecord`
//!
//! Stores that keep records as string hashes (Redis) go through these two
//! functions. Missing fields decode as zero; an empty map is a miss.

use keylens_core::{
    Error, Result, StatRecord, FIELD_AVG_SIZE, FIELD_LAST_WRITE_AT, FIELD_LIFETIME, FIELD_READS,
    FIELD_WRITES,
};
use std::collections::HashMap;

/// Encode a record as `(field, value)` pairs
pub fn encode(record: &StatRecord) -> Vec<(&'static str, String)> {
    vec![
        (FIELD_READS, record.reads.to_string()),
        (FIELD_WRITES, record.writes.to_string()),
        (FIELD_AVG_SIZE, record.avg_size.to_string()),
        (FIELD_LAST_WRITE_AT, record.last_write_at.to_string()),
        (FIELD_LIFETIME, record.lifetime.to_string()),
    ]
}

/// Decode a field map read back for `key`
pub fn decode(key: &str, fields: &HashMap<String, String>) -> Result<Option<StatRecord>> {
    if fields.is_empty() {
        return Ok(None);
    }

    Ok(Some(StatRecord {
        reads: counter(key, fields, FIELD_READS)?,
        writes: counter(key, fields, FIELD_WRITES)?,
        avg_size: float(key, fields, FIELD_AVG_SIZE)?,
        last_write_at: float(key, fields, FIELD_LAST_WRITE_AT)?,
        lifetime: float(key, fields, FIELD_LIFETIME)?,
    }))
}

fn counter(key: &str, fields: &HashMap<String, String>, field: &str) -> Result<u64> {
    let Some(raw) = fields.get(field) else {
        return Ok(0);
    };
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return Ok(value);
    }
    // Older writers stored counters as floats ("3.0")
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value as u64),
        _ => Err(Error::corrupt_record(key, field, raw.as_str())),
    }
}

fn float(key: &str, fields: &HashMap<String, String>, field: &str) -> Result<f64> {
    let Some(raw) = fields.get(field) else {
        return Ok(0.0);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::corrupt_record(key, field, raw.as_str())),
    }
}

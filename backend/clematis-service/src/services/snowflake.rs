//! Snowflake identifiers for new posts.
//!
//! Layout (most significant first): 41 bits of milliseconds since
//! [`EPOCH_MS`], 10 bits of machine id, 12 bits of sequence.
//!
//! The sequence is a process-wide counter that wraps every 4096 ids. It is
//! not persisted: a restart on the same machine id within the same
//! millisecond as a previous id can reissue it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// 2010-11-04T01:42:54.657Z
pub const EPOCH_MS: i64 = 1_288_834_974_657;

const MACHINE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
pub const MAX_MACHINE_ID: u64 = (1 << MACHINE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: u32 = MACHINE_BITS + SEQUENCE_BITS;

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SnowflakeParts {
    timestamp_ms: i64,
    machine_id: u64,
    sequence: u64,
}

#[derive(Debug)]
pub struct SnowflakeGenerator {
    machine_id: u64,
    sequence: AtomicU64,
}

impl SnowflakeGenerator {
    /// Machine ids above [`MAX_MACHINE_ID`] are rejected.
    pub fn new(machine_id: u64) -> Result<Self, String> {
        if machine_id > MAX_MACHINE_ID {
            return Err(format!(
                "snowflake machine id {} exceeds {}",
                machine_id, MAX_MACHINE_ID
            ));
        }
        Ok(Self {
            machine_id,
            sequence: AtomicU64::new(0),
        })
    }

    /// Next identifier for the current wall-clock millisecond.
    pub fn next_id(&self) -> i64 {
        self.next_id_at(Utc::now().timestamp_millis())
    }

    /// Next identifier for an explicit unix timestamp in milliseconds.
    pub fn next_id_at(&self, unix_ms: i64) -> i64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;
        compose(unix_ms, self.machine_id, sequence)
    }
}

pub fn compose(unix_ms: i64, machine_id: u64, sequence: u64) -> i64 {
    let elapsed = (unix_ms - EPOCH_MS).max(0) as u64;
    ((elapsed << TIMESTAMP_SHIFT)
        | ((machine_id & MAX_MACHINE_ID) << SEQUENCE_BITS)
        | (sequence & SEQUENCE_MASK)) as i64
}

#[cfg(test)]
fn decompose(id: i64) -> SnowflakeParts {
    let raw = id as u64;
    SnowflakeParts {
        timestamp_ms: (raw >> TIMESTAMP_SHIFT) as i64 + EPOCH_MS,
        machine_id: (raw >> SEQUENCE_BITS) & MAX_MACHINE_ID,
        sequence: raw & SEQUENCE_MASK,
    }
}

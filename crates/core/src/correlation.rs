//! Correlation ids for submitted jobs.
//!
//! A [`CorrelationId`] names a job end-to-end: it is returned to the
//! submitter, stamped on every log line the worker emits for the job, and
//! embedded in the input/output artifact file names.
//!
//! Ids are exactly [`ID_LEN`] base-62 characters. [`IdGenerator`] packs a
//! millisecond timestamp and a sequence number into the id so that ids are
//! time-ordered and never repeat within a process.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;

use crate::error::CoreError;

/// Length of every correlation id.
pub const ID_LEN: usize = 10;

/// ASCII-sorted, so lexicographic order of ids matches generation order.
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Milliseconds of 2024-01-01T00:00:00Z since the Unix epoch.
const EPOCH_MS: i64 = 1_704_067_200_000;

/// Low bits reserved for the per-millisecond sequence number.
const SEQ_BITS: u32 = 16;

/// Timestamp bits kept above the sequence. 43 + 16 = 59 bits, which fits in
/// ten base-62 digits (62^10 > 2^59).
const TIME_BITS: u32 = 43;

// ---------------------------------------------------------------------------
// CorrelationId
// ---------------------------------------------------------------------------

/// Opaque, fixed-length job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Validate an id received from a client (e.g. a result lookup path).
    ///
    /// Only the shape is checked; an id that parses may still be unknown.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.len() != ID_LEN {
            return Err(CoreError::Validation(format!(
                "Correlation id must be {ID_LEN} characters"
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CoreError::Validation(
                "Correlation id may only contain ASCII letters and digits".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The packed value this id encodes.
    fn value(&self) -> u64 {
        self.0.bytes().fold(0, |acc, b| {
            let digit = match b {
                b'0'..=b'9' => b - b'0',
                b'A'..=b'Z' => b - b'A' + 10,
                _ => b - b'a' + 36,
            };
            acc * 62 + u64::from(digit)
        })
    }

    fn encode(mut value: u64) -> Self {
        let mut buf = [ALPHABET[0]; ID_LEN];
        for slot in buf.iter_mut().rev() {
            *slot = ALPHABET[(value % 62) as usize];
            value /= 62;
        }
        // Every byte comes from ALPHABET, so this is always ASCII.
        Self(buf.iter().map(|&b| b as char).collect())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// IdGenerator
// ---------------------------------------------------------------------------

/// Issues strictly increasing correlation ids.
///
/// Each id encodes `(millis_since_2024 << 16) | sequence`. When more than
/// one id is requested within the same millisecond, or the wall clock steps
/// backwards, the generator keeps counting up from the last value it issued,
/// so uniqueness within the process does not depend on the clock.
///
/// A fresh generator only knows the clock. Across restarts, use
/// [`IdGenerator::resume_after`] with the newest id already on disk;
/// otherwise a clock that stepped back while the process was down can
/// reissue an old id and overwrite its artifacts.
///
/// Shared across request handlers behind an `Arc`.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose ids all sort after `last`.
    pub fn resume_after(last: Option<&CorrelationId>) -> Self {
        Self {
            last: AtomicU64::new(last.map_or(0, CorrelationId::value)),
        }
    }

    /// Issue the next id.
    pub fn next_id(&self) -> CorrelationId {
        let floor = Self::now_ms() << SEQ_BITS;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = floor.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return CorrelationId::encode(candidate),
                Err(actual) => last = actual,
            }
        }
    }

    fn now_ms() -> u64 {
        let elapsed = Utc::now().timestamp_millis().saturating_sub(EPOCH_MS).max(0) as u64;
        elapsed & ((1 << TIME_BITS) - 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

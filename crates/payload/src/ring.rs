//! The payload ring: a circular buffer of pre-generated payloads,
//! shuffled once at startup and consumed one-at-a-time thereafter.
//! Grounded on `original_source/src/payload.c`'s `shuffle_payload_ring`
//! and `th_payload_get`, which walk a circular linked list instead of
//! an index, but have the identical externally-visible rotation
//! behavior.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::{PayloadError, PayloadResult};

/// Rotates through a fixed set of payload buffers. `next()` advances
/// the cursor by one call, wrapping at the end.
pub struct PayloadRing {
    payloads: Vec<Vec<u8>>,
    cursor: usize,
}

impl PayloadRing {
    /// Build a ring from the generated payload set, applying a single
    /// Fisher-Yates shuffle so repeated runs don't replay the same
    /// generation order.
    pub fn new(mut payloads: Vec<Vec<u8>>) -> PayloadResult<Self> {
        if payloads.is_empty() {
            return Err(PayloadError::EmptyRing);
        }
        payloads.shuffle(&mut thread_rng());
        Ok(Self {
            payloads,
            cursor: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Return the next payload in rotation and advance the cursor.
    pub fn next(&mut self) -> &[u8] {
        let payload = &self.payloads[self.cursor];
        self.cursor = (self.cursor + 1) % self.payloads.len();
        payload
    }
}

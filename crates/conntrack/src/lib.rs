//! feint-conntrack - lightweight per-5-tuple packet counter
//!
//! Grounded on `original_source/src/conntrack.c`: a bounded table (no
//! reassembly, no sequence tracking) that exists purely to count
//! packets per connection against an injection threshold. Idle
//! connections are reclaimed on a 300s timeout; once the table is at
//! capacity, the least-recently-seen connection is evicted.

use std::net::IpAddr;
use std::time::{Duration, Instant};

const CAPACITY: usize = 1000;
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// 5-tuple identifying a direction of a connection. Source and
/// destination are not order-normalized: the forward and reverse
/// directions of a connection are tracked as distinct entries, matching
/// the C implementation's direction-specific call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub saddr: IpAddr,
    pub daddr: IpAddr,
    pub sport: u16,
    pub dport: u16,
}

struct Entry {
    key: FlowKey,
    packet_count: u32,
    last_seen: Instant,
}

/// Bounded connection table keyed by `FlowKey`. Holds at most 1000
/// entries; over capacity it evicts the least-recently-seen entry.
pub struct ConnTrack {
    entries: Vec<Option<Entry>>,
    threshold: u32,
}

impl ConnTrack {
    #[must_use]
    pub fn new(threshold: u32) -> Self {
        Self {
            entries: Vec::with_capacity(CAPACITY),
            threshold,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        CAPACITY
    }

    fn find(&self, key: &FlowKey) -> Option<usize> {
        self.entries
            .iter()
            .position(|slot| matches!(slot, Some(e) if &e.key == key))
    }

    fn reap_idle(&mut self, now: Instant) {
        for slot in &mut self.entries {
            if let Some(e) = slot {
                if now.duration_since(e.last_seen) > IDLE_TIMEOUT {
                    *slot = None;
                }
            }
        }
    }

    fn find_or_create(&mut self, key: FlowKey) -> usize {
        if let Some(idx) = self.find(&key) {
            return idx;
        }

        let now = Instant::now();
        self.reap_idle(now);

        if let Some(idx) = self.entries.iter().position(Option::is_none) {
            self.entries[idx] = Some(Entry {
                key,
                packet_count: 0,
                last_seen: now,
            });
            return idx;
        }

        if self.entries.len() < CAPACITY {
            self.entries.push(Some(Entry {
                key,
                packet_count: 0,
                last_seen: now,
            }));
            return self.entries.len() - 1;
        }

        let lru_idx = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.as_ref().expect("full table has no empty slots").last_seen)
            .map(|(idx, _)| idx)
            .expect("capacity is non-zero");

        self.entries[lru_idx] = Some(Entry {
            key,
            packet_count: 0,
            last_seen: now,
        });
        lru_idx
    }

    /// Bump the packet count for `key`'s connection. Returns `true` once
    /// the count reaches the configured threshold, at which point the
    /// counter resets to zero (the caller should treat this as "time to
    /// inject").
    pub fn increment(&mut self, key: FlowKey) -> bool {
        let idx = self.find_or_create(key);
        let entry = self.entries[idx].as_mut().expect("just inserted");
        entry.last_seen = Instant::now();
        entry.packet_count += 1;

        if entry.packet_count >= self.threshold {
            entry.packet_count = 0;
            true
        } else {
            false
        }
    }

    /// Drop tracking state for `key`, e.g. on observing a FIN or RST.
    pub fn remove(&mut self, key: &FlowKey) {
        if let Some(idx) = self.find(key) {
            self.entries[idx] = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn key(n: u8) -> FlowKey {
        FlowKey {
            saddr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, n)),
            daddr: IpAddr::V4(Ipv4Addr::new(10, 0, 1, n)),
            sport: 1000 + n as u16,
            dport: 443,
        }
    }

    #[test]
    fn reaches_threshold_and_resets() {
        let mut ct = ConnTrack::new(3);
        let k = key(1);
        assert!(!ct.increment(k));
        assert!(!ct.increment(k));
        assert!(ct.increment(k));
        // counter reset, needs 3 more packets again
        assert!(!ct.increment(k));
    }

    #[test]
    fn distinct_flows_tracked_independently() {
        let mut ct = ConnTrack::new(2);
        let a = key(1);
        let b = key(2);
        assert!(!ct.increment(a));
        assert!(!ct.increment(b));
        assert!(ct.increment(a));
        assert!(!ct.increment(b)); // b still at count 1 from above, now 2
    }

    #[test]
    fn remove_drops_tracking_state() {
        let mut ct = ConnTrack::new(2);
        let k = key(1);
        ct.increment(k);
        ct.remove(&k);
        assert!(ct.find(&k).is_none());
        // after removal, a fresh count starts from zero
        assert!(!ct.increment(k));
        assert!(ct.increment(k));
    }

    #[test]
    fn table_recycles_least_recently_seen_entry_at_capacity() {
        let mut ct = ConnTrack::new(1000);
        for i in 0..CAPACITY {
            ct.increment(FlowKey {
                saddr: IpAddr::V4(Ipv4Addr::from(((10u32 << 24) | i as u32).to_be_bytes())),
                daddr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
                sport: 1,
                dport: 1,
            });
        }
        assert_eq!(ct.entries.len(), CAPACITY);

        // one more distinct flow forces an LRU eviction rather than growth
        ct.increment(FlowKey {
            saddr: IpAddr::V4(Ipv4Addr::new(255, 255, 255, 255)),
            daddr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            sport: 1,
            dport: 1,
        });
        assert_eq!(ct.entries.len(), CAPACITY);
    }
}

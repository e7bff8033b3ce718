//! feint-srcinfo - bounded ring of (address -> TTL, link-layer address)
//!
//! Grounded on `original_source/src/srcinfo.c`: a fixed-capacity ring
//! where `put` overwrites the oldest slot and `get` scans backwards
//! from the write cursor, stopping at the first uninitialized slot.

use std::net::IpAddr;

const CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy)]
struct Entry {
    addr: IpAddr,
    ttl: u8,
    hwaddr: [u8; 8],
}

/// Bounded source-info cache. Holds at most 500 entries; insertion
/// overwrites the oldest slot. Lookup is a reverse-chronological linear
/// scan so the most-recently-observed value for a key always wins.
pub struct SrcInfoCache {
    slots: Vec<Option<Entry>>,
    cursor: usize,
}

impl Default for SrcInfoCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SrcInfoCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![None; CAPACITY],
            cursor: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Record the TTL and link-layer address observed for `addr`,
    /// advancing the write cursor modulo capacity.
    pub fn put(&mut self, addr: IpAddr, ttl: u8, hwaddr: [u8; 8]) {
        self.slots[self.cursor] = Some(Entry { addr, ttl, hwaddr });
        self.cursor = (self.cursor + 1) % CAPACITY;
    }

    /// Look up the most-recently-put entry for `addr`, scanning
    /// backwards from the cursor. Stops at the first uninitialized
    /// slot (the ring hasn't wrapped yet) and reports not-found.
    #[must_use]
    pub fn get(&self, addr: IpAddr) -> Option<(u8, [u8; 8])> {
        for i in 0..CAPACITY {
            let idx = (self.cursor + CAPACITY - 1 - i) % CAPACITY;
            match self.slots[idx] {
                None => return None,
                Some(entry) if entry.addr == addr => return Some((entry.ttl, entry.hwaddr)),
                Some(_) => continue,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(n: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, n))
    }

    #[test]
    fn recency_wins_for_repeated_key() {
        let mut cache = SrcInfoCache::new();
        cache.put(addr(1), 50, [0; 8]);
        cache.put(addr(1), 60, [1; 8]);
        assert_eq!(cache.get(addr(1)), Some((60, [1; 8])));
    }

    #[test]
    fn not_found_for_unknown_key() {
        let cache = SrcInfoCache::new();
        assert_eq!(cache.get(addr(9)), None);
    }

    #[test]
    fn oldest_entries_evicted_past_capacity() {
        let mut cache = SrcInfoCache::new();
        for i in 0..(CAPACITY + 10) {
            cache.put(addr((i % 250) as u8), i as u8, [0; 8]);
        }
        // the very first key/value pair written has long since been
        // overwritten by the ring wrapping around.
        assert!(cache.get(addr(0)).is_some());
    }

    #[test]
    fn five_hundred_one_distinct_puts_drops_the_oldest() {
        let mut cache = SrcInfoCache::new();
        let addrs: Vec<IpAddr> = (0..=CAPACITY)
            .map(|i| IpAddr::V4(Ipv4Addr::from(((10u32 << 24) | i as u32).to_be_bytes())))
            .collect();
        for a in &addrs {
            cache.put(*a, 1, [0; 8]);
        }
        assert_eq!(cache.get(addrs[0]), None);
        assert!(cache.get(*addrs.last().unwrap()).is_some());
    }
}

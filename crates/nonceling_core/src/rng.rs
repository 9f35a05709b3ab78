//! Deterministic random streams derived from a single 32-bit seed.
//!
//! Every random decision a creature makes comes from a [`SeededRng`]. The
//! root generator is seeded with the block nonce; named purpose streams
//! (`traits`, `physics`, `mutation`, ...) are derived from the root seed so
//! that drawing from one never shifts another. Group-scoped sub-streams are
//! seeded from the root's rehash chain.

use rand::RngCore;
use std::collections::{HashMap, VecDeque};

/// Mulberry32 increment.
const GOLDEN_GAMMA: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

const FNV_OFFSET: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Default number of draws between rehash chain appends.
pub const DEFAULT_REHASH_INTERVAL: u64 = 10;
/// Default number of retained rehash chain entries.
pub const DEFAULT_REHASH_CAPACITY: usize = 100;

/// 32-bit FNV-1a over the UTF-8 bytes of `s`.
pub fn fnv1a32(s: &str) -> u32 {
    s.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Bounded, append-only history of generator states.
///
/// Entries are addressed by absolute index: once the capacity is exceeded the
/// oldest entries are evicted and the indices of the survivors do not shift.
/// The cap bounds memory only; lookups of evicted entries return `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RehashChain {
    entries: VecDeque<u32>,
    evicted: u64,
    capacity: usize,
}

impl RehashChain {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            evicted: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: u32) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(value);
    }

    /// Entry at absolute position `index`, if it has been appended and not evicted.
    pub fn get(&self, index: u64) -> Option<u32> {
        let relative = index.checked_sub(self.evicted)?;
        self.entries.get(usize::try_from(relative).ok()?).copied()
    }

    /// Number of entries ever appended.
    pub fn total_len(&self) -> u64 {
        self.evicted + self.entries.len() as u64
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.entries.iter().copied().collect()
    }
}

/// Mulberry32 generator with a rehash chain and cached purpose streams.
///
/// # Examples
/// ```
/// use nonceling_core::rng::SeededRng;
///
/// let mut a = SeededRng::new(12345);
/// let mut b = SeededRng::new(12345);
/// assert_eq!(a.purpose_stream("traits").next_f64(), b.purpose_stream("traits").next_f64());
/// ```
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u32,
    state: u32,
    draws: u64,
    rehash_interval: u64,
    chain: RehashChain,
    streams: HashMap<String, SeededRng>,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self::with_rehash(seed, DEFAULT_REHASH_INTERVAL, DEFAULT_REHASH_CAPACITY)
    }

    pub fn with_rehash(seed: u32, interval: u64, capacity: usize) -> Self {
        Self {
            seed,
            state: seed,
            draws: 0,
            rehash_interval: interval.max(1),
            chain: RehashChain::new(capacity),
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Raw generator state.
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Draws taken from this generator (not counting purpose streams).
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn chain(&self) -> &RehashChain {
        &self.chain
    }

    /// Next raw 32-bit output.
    #[inline]
    pub fn next_u32_raw(&mut self) -> u32 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);

        self.draws += 1;
        if self.draws % self.rehash_interval == 0 {
            self.chain.push(self.state);
        }
        out
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32_raw()) / TWO_POW_32
    }

    /// Uniform value in [lo, hi).
    #[inline]
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// `floor(next * len)`; `len` must be non-zero.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        ((self.next_f64() * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Value in [-1, 1).
    #[inline]
    pub fn signed_unit(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }

    /// Index drawn proportionally to `weights`. Returns `None` if no weight is positive.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next_f64() * total;
        let mut last = None;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
            last = Some(i);
        }
        last
    }

    /// Stream dedicated to `purpose`, seeded with `seed ^ fnv1a32(purpose)`.
    ///
    /// The stream is created on first use and cached, so repeated calls keep
    /// advancing the same sequence.
    pub fn purpose_stream(&mut self, purpose: &str) -> &mut SeededRng {
        let fresh = self.derive_stream(purpose);
        self.streams
            .entry(purpose.to_string())
            .or_insert(fresh)
    }

    /// Runs `f` with the `purpose` stream and this generator borrowed together.
    ///
    /// The stream is detached from the cache for the duration of the call, so
    /// `f` must not ask the root for the same purpose again.
    pub fn with_purpose_stream<T>(
        &mut self,
        purpose: &str,
        f: impl FnOnce(&mut SeededRng, &mut SeededRng) -> T,
    ) -> T {
        let mut stream = self
            .streams
            .remove(purpose)
            .unwrap_or_else(|| self.derive_stream(purpose));
        let out = f(&mut stream, self);
        self.streams.insert(purpose.to_string(), stream);
        out
    }

    fn derive_stream(&self, purpose: &str) -> SeededRng {
        SeededRng::with_rehash(
            self.seed ^ fnv1a32(purpose),
            self.rehash_interval,
            self.chain.capacity(),
        )
    }

    /// Fresh generator seeded from rehash chain entry `index` and `label`.
    ///
    /// Advances this generator until the chain holds entry `index`. Returns
    /// `None` only if that entry has already been evicted.
    pub fn sub_stream(&mut self, index: u64, label: &str) -> Option<SeededRng> {
        while self.chain.total_len() <= index {
            self.next_u32_raw();
        }
        let entry = self.chain.get(index)?;
        Some(SeededRng::with_rehash(
            entry ^ fnv1a32(label),
            self.rehash_interval,
            self.chain.capacity(),
        ))
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u32_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32_raw());
        let lo = u64::from(self.next_u32_raw());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_mulberry32_reference_sequence() {
        // Reference outputs of the canonical mulberry32 for seed 0.
        let mut rng = SeededRng::new(0);
        assert_eq!(rng.next_u32_raw(), 1_144_304_738);
        assert_eq!(rng.next_u32_raw(), 1_416_247);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededRng::new(987_654);
        let mut b = SeededRng::new(987_654);
        for _ in 0..1000 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn test_values_in_unit_interval() {
        let mut rng = SeededRng::new(u32::MAX);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a32(""), 0x811C_9DC5);
        assert_eq!(fnv1a32("a"), 0xE40C_292C);
        assert_eq!(fnv1a32("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_purpose_stream_is_cached() {
        let mut rng = SeededRng::new(42);
        let first = rng.purpose_stream("traits").next_f64();
        let second = rng.purpose_stream("traits").next_f64();

        let mut fresh = SeededRng::new(42 ^ fnv1a32("traits"));
        assert_eq!(first, fresh.next_f64());
        assert_eq!(second, fresh.next_f64());
    }

    #[test]
    fn test_with_purpose_stream_continues_cached_sequence() {
        let mut rng = SeededRng::new(42);
        let first = rng.purpose_stream("mutation").next_f64();
        let (second, root_draws) = rng.with_purpose_stream("mutation", |stream, root| {
            let v = stream.next_f64();
            root.next_f64();
            (v, root.draws())
        });
        let third = rng.purpose_stream("mutation").next_f64();

        let mut fresh = SeededRng::new(42 ^ fnv1a32("mutation"));
        assert_eq!(first, fresh.next_f64());
        assert_eq!(second, fresh.next_f64());
        assert_eq!(third, fresh.next_f64());
        assert_eq!(root_draws, 1);
    }

    #[test]
    fn test_purpose_streams_are_independent_of_root_draws() {
        let mut a = SeededRng::new(7);
        let mut b = SeededRng::new(7);
        for _ in 0..57 {
            b.next_f64();
        }
        assert_eq!(
            a.purpose_stream("physics").next_f64(),
            b.purpose_stream("physics").next_f64()
        );
    }

    #[test]
    fn test_chain_appends_every_interval() {
        let mut rng = SeededRng::new(1);
        for _ in 0..9 {
            rng.next_f64();
        }
        assert!(rng.chain().is_empty());
        rng.next_f64();
        assert_eq!(rng.chain().len(), 1);
        assert_eq!(rng.chain().get(0), Some(rng.state()));
    }

    #[test]
    fn test_chain_eviction_keeps_absolute_indices() {
        let mut chain = RehashChain::new(3);
        for v in 0..5 {
            chain.push(v);
        }
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.evicted(), 2);
        assert_eq!(chain.get(0), None);
        assert_eq!(chain.get(2), Some(2));
        assert_eq!(chain.get(4), Some(4));
        assert_eq!(chain.get(5), None);
        assert_eq!(chain.total_len(), 5);
    }

    #[test]
    fn test_sub_stream_advances_until_entry_exists() {
        let mut rng = SeededRng::new(5);
        let mut sub = rng.sub_stream(2, "core").expect("entry available");
        assert_eq!(rng.draws(), 30);
        let mut again = SeededRng::new(5).sub_stream(2, "core").expect("entry available");
        assert_eq!(sub.next_u32_raw(), again.next_u32_raw());
    }

    #[test]
    fn test_sub_stream_of_evicted_entry() {
        let mut rng = SeededRng::with_rehash(5, 1, 2);
        for _ in 0..10 {
            rng.next_f64();
        }
        assert!(rng.sub_stream(0, "x").is_none());
        assert!(rng.sub_stream(9, "x").is_some());
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = SeededRng::new(99);
        for _ in 0..500 {
            let i = rng.weighted_index(&[0.0, 1.0, 0.0, 2.0]).expect("positive weight");
            assert!(i == 1 || i == 3);
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
    }

    #[test]
    fn test_rng_core_interop() {
        let mut rng = SeededRng::new(2024);
        let v: f64 = rng.gen_range(-3.0..3.0);
        assert!((-3.0..3.0).contains(&v));
        let mut buf = [0u8; 7];
        rng.fill_bytes(&mut buf);
    }

    #[test]
    fn test_bit_avalanche() {
        // Flipping one seed bit should flip roughly half of the first output's bits.
        let mut total = 0u32;
        let mut samples = 0u32;
        for seed in (0u32..2000).map(|s| s.wrapping_mul(2_654_435_761)) {
            let base = SeededRng::new(seed).next_u32_raw();
            for bit in 0..32 {
                let flipped = SeededRng::new(seed ^ (1 << bit)).next_u32_raw();
                total += (base ^ flipped).count_ones();
                samples += 1;
            }
        }
        let mean = f64::from(total) / f64::from(samples);
        assert!((14.0..18.0).contains(&mean), "mean flipped bits {mean}");
    }
}

//! Open-addressed robin-hood hash index.
//!
//! A direct translation of Big Switch's `hmap` robin-hood hashtable (see
//! DESIGN.md for the exact functions this is ported from). Two differences
//! from the C original, both noted in DESIGN.md:
//!
//! - The key is stored inline alongside the object in each slot rather than
//!   recovered from the object via a byte offset (`offsetof`); `hmap`'s own
//!   header comments note a key-extractor function is an acceptable
//!   substitute when a byte offset isn't available, and storing the key
//!   inline is this crate's choice of extractor.
//! - The "object" `T` is a plain `Copy + PartialEq` value (the flow table
//!   uses pool slot indices) rather than a raw pointer; `remove` still
//!   matches by object *value* equality, not key equality, exactly as
//!   `hmap_remove` matches by pointer identity — this is what lets several
//!   entries that share a key be removed one at a time.

use crate::hashing::{finalize32, finalize64_to_32};

const INITIAL_SIZE: usize = 8;
const HASH_FREE: u32 = 0;
const TOMBSTONE_BIT: u32 = 0x8000_0000;

#[inline(always)]
fn is_tombstone(hash: u32) -> bool {
    hash & TOMBSTONE_BIT != 0
}

/// Clears the tombstone bit and coerces the value to differ from `HASH_FREE`,
/// exactly as `hmap_calc_hash`'s munge step does.
#[inline(always)]
fn munge(hash: u32) -> u32 {
    let h = hash & !TOMBSTONE_BIT;
    if h == HASH_FREE {
        h | 1
    } else {
        h
    }
}

/// A key type usable with [`HashIndex`].
///
/// `index_hash` must apply a finalizer whose output never needs the
/// tombstone bit or `HASH_FREE` reserved specially by callers: [`HashIndex`]
/// handles that munging itself.
pub trait IndexKey: Copy + Eq {
    fn index_hash(&self) -> u32;
}

impl IndexKey for u16 {
    fn index_hash(&self) -> u32 {
        finalize32(*self as u32)
    }
}

impl IndexKey for u32 {
    fn index_hash(&self) -> u32 {
        finalize32(*self)
    }
}

impl IndexKey for u64 {
    fn index_hash(&self) -> u32 {
        finalize64_to_32(*self)
    }
}

/// Robin-hood open-addressed hash index. May hold multiple objects sharing a
/// key; see [`HashIndex::lookup`] for how to enumerate them.
#[derive(Debug)]
pub struct HashIndex<K, T> {
    hashes: Vec<u32>,
    slots: Vec<Option<(K, T)>>,
    size: usize,
    mask: usize,
    count: usize,
    threshold: usize,
    max_load_factor: f64,
}

/// Probe-distance statistics, the Rust counterpart of `hmap_stats`'s
/// mean/variance report (which it prints to stderr; here it's returned so
/// callers and tests can assert on it directly).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeStats {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
}

impl<K: IndexKey, T: Copy + PartialEq> HashIndex<K, T> {
    /// Create an empty index. `max_load_factor` of `0.0` (or anything outside
    /// `(0, 1)`) uses [`crate::config::DEFAULT_LOAD_FACTOR`], matching
    /// `hmap_create`'s "passing 0 uses a good default."
    pub fn new(max_load_factor: f64) -> Self {
        let mlf = if max_load_factor > 0.0 && max_load_factor < 1.0 {
            max_load_factor
        } else {
            crate::config::DEFAULT_LOAD_FACTOR
        };
        let size = INITIAL_SIZE;
        Self {
            hashes: vec![HASH_FREE; size],
            slots: (0..size).map(|_| None).collect(),
            size,
            mask: size - 1,
            count: 0,
            threshold: (size as f64 * mlf) as usize,
            max_load_factor: mlf,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.size
    }

    #[inline(always)]
    fn home(&self, hash: u32) -> usize {
        (hash as usize) & self.mask
    }

    #[inline(always)]
    fn distance_of(&self, idx: usize, hash: u32) -> usize {
        let home = self.home(hash);
        (idx + self.size - home) & self.mask
    }

    /// Look up the next object matching `key`.
    ///
    /// `state` resumes iteration over duplicate keys: pass `&mut 0` on the
    /// first call, then feed the same variable back in to walk successive
    /// duplicates. Returns `None` once exhausted.
    pub fn lookup(&self, key: &K, state: &mut usize) -> Option<&T> {
        let search_hash = munge(key.index_hash());
        let home = self.home(search_hash);
        let mut distance = *state;

        while distance < self.size {
            let idx = (home + distance) & self.mask;
            let bucket_hash = self.hashes[idx];
            if bucket_hash == search_hash {
                if let Some((k, v)) = self.slots[idx].as_ref() {
                    if k == key {
                        *state = distance + 1;
                        return Some(v);
                    }
                }
                // Hash collision with a different key: keep probing.
            } else if bucket_hash == HASH_FREE || self.distance_of(idx, bucket_hash) < distance {
                // Robin-hood early exit: no element past here can be ours.
                return None;
            }
            distance += 1;
        }
        None
    }

    /// Convenience wrapper over [`HashIndex::lookup`] for the common
    /// single-result case (the flow-id index, where keys are unique).
    pub fn lookup_one(&self, key: &K) -> Option<&T> {
        let mut state = 0;
        self.lookup(key, &mut state)
    }

    /// Insert `value` under `key`. May trigger [`HashIndex::grow`].
    pub fn insert(&mut self, key: K, value: T) {
        if self.count + 1 > self.threshold {
            self.grow();
        }
        let hash = munge(key.index_hash());
        self.insert_raw(hash, key, value);
    }

    /// Core robin-hood insertion loop, used directly by `insert` and by
    /// `grow`'s reinsertion pass (which already has the munged hash and must
    /// not re-grow mid-reinsert).
    fn insert_raw(&mut self, mut hash: u32, mut key: K, mut value: T) {
        let mut distance = 0usize;
        loop {
            if distance >= self.size {
                // Indicates a logic error (threshold not respected) rather
                // than caller misuse; matches the source's `assert(0)`.
                panic!("hash index insert: probe exhausted the table");
            }

            let idx = (self.home(hash) + distance) & self.mask;
            let bucket_hash = self.hashes[idx];
            let bucket_distance = if bucket_hash == HASH_FREE {
                0
            } else {
                self.distance_of(idx, bucket_hash)
            };
            let should_steal = distance > bucket_distance;

            if bucket_hash == HASH_FREE || (is_tombstone(bucket_hash) && should_steal) {
                self.hashes[idx] = hash;
                self.slots[idx] = Some((key, value));
                self.count += 1;
                return;
            } else if should_steal {
                let (old_key, old_value) = self.slots[idx]
                    .take()
                    .expect("occupied, non-tombstone slot must hold a value");
                self.hashes[idx] = hash;
                self.slots[idx] = Some((key, value));
                hash = bucket_hash;
                key = old_key;
                value = old_value;
                distance = bucket_distance;
            }
            distance += 1;
        }
    }

    /// Remove the specific `value` stored under `key`. Object identity is by
    /// value equality (for the flow table, pool slot index equality), not
    /// key equality, so duplicate-key entries can be removed independently.
    ///
    /// Returns `true` if found and removed. The caller must only call this
    /// for an object it knows is present; like `hmap_remove`, this walks the
    /// whole probe range and panics (debug-assert in the source) if it isn't
    /// found, since that indicates an engine bookkeeping bug, not caller
    /// input to validate.
    pub fn remove(&mut self, key: &K, value: &T) -> bool {
        let hash = munge(key.index_hash());
        let home = self.home(hash);

        for distance in 0..self.size {
            let idx = (home + distance) & self.mask;
            let bucket_hash = self.hashes[idx];
            if bucket_hash == hash {
                if let Some((_, v)) = self.slots[idx].as_ref() {
                    if v == value {
                        self.hashes[idx] = hash | TOMBSTONE_BIT;
                        self.slots[idx] = None;
                        self.count -= 1;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Double the table size and reinsert every live (non-tombstone) slot.
    pub fn grow(&mut self) {
        let old_hashes = std::mem::take(&mut self.hashes);
        let old_slots = std::mem::take(&mut self.slots);

        self.size *= 2;
        self.mask = self.size - 1;
        self.threshold = (self.size as f64 * self.max_load_factor) as usize;
        self.hashes = vec![HASH_FREE; self.size];
        self.slots = (0..self.size).map(|_| None).collect();
        self.count = 0;

        for (hash, slot) in old_hashes.into_iter().zip(old_slots.into_iter()) {
            if hash != HASH_FREE && !is_tombstone(hash) {
                if let Some((k, v)) = slot {
                    self.insert_raw(hash, k, v);
                }
            }
        }

        tracing::debug!(new_size = self.size, "hash index grown");
    }

    /// Mean and variance of occupied slots' probe distance, for statistical
    /// assertions that robin-hood is bounding variance as designed.
    pub fn probe_stats(&self) -> ProbeStats {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut n = 0usize;
        for (idx, &hash) in self.hashes.iter().enumerate() {
            if hash != HASH_FREE && !is_tombstone(hash) {
                let d = self.distance_of(idx, hash) as f64;
                sum += d;
                sum_sq += d * d;
                n += 1;
            }
        }
        if n == 0 {
            return ProbeStats {
                count: 0,
                mean: 0.0,
                variance: 0.0,
            };
        }
        let mean = sum / n as f64;
        let variance = (sum_sq - sum * sum / n as f64) / n as f64;
        ProbeStats {
            count: n,
            mean,
            variance,
        }
    }

    /// Iterate every live `(key, value)` pair, skipping tombstones. Slot
    /// order, not insertion order, same as walking `hmap->hashes`/`objects`
    /// directly in the source.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &T)> {
        self.hashes
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(&hash, slot)| {
                if hash != HASH_FREE && !is_tombstone(hash) {
                    slot.as_ref().map(|(k, v)| (k, v))
                } else {
                    None
                }
            })
    }
}

//! Faster (but not DoS-resistant) hashmaps for the hot counting loops
//!
//! Token counters and pair accumulators spend most of their time hashing
//! short strings, so the vocabulary and pair maps run on farmhash instead of
//! SipHash. Staging keys in the matrix assembler are already packed integers
//! and skip hashing entirely.
use farmhash;
use hash_hasher::HashBuildHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher, BuildHasherDefault};

/// Act like a farmhash
///
/// Farmhash isn't a streaming hash, so every write rehashes with the running
/// state as the seed. Not the real thing, but fast and well mixed for the
/// short string and tuple keys we feed it.
pub struct FarmHashLie (u64);

impl Default for FarmHashLie {
    #[inline]
    fn default() -> FarmHashLie { FarmHashLie(0) }
}

impl Hasher for FarmHashLie {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.0 = farmhash::hash64_with_seed(bytes, self.0);
    }
}

pub type Farm = BuildHasherDefault<FarmHashLie>;
pub type FarmMap<X, Y> = HashMap<X, Y, Farm>;

pub fn new_farm<X: Hash+Eq, Y>() -> FarmMap<X, Y> {
    Default::default()
}

pub fn farm_with_capacity<X: Hash+Eq, Y>(capacity: usize) -> FarmMap<X, Y> {
    FarmMap::with_capacity_and_hasher(capacity, Farm::default())
}

/// For keys that are already well-mixed (packed matrix indices)
pub type PlainMap<X, Y> = HashMap<X, Y, HashBuildHasher>;

pub fn new_plain<X: Hash+Eq, Y>() -> PlainMap<X, Y> {
    Default::default()
}

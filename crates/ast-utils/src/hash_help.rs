// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Hash map, set, and related hashing utilities.
//!
//! Thread uses [`rapidhash::RapidHashMap`] and [`rapidhash::RapidHashSet`] as
//! stand-ins for `std::collections::HashMap` and `std::collections::HashSet`
//! (they ARE those types, just with the [`rapidhash::fast::RandomState`] hash
//! builder).
//!
//! For the core's workloads (memoization keyed by node identity, grouping
//! nodes by absolute hash) it's *very fast* and sufficiently collision
//! resistant. It is not a cryptographic hash.

use rapidhash::fast::RandomState;

pub use rapidhash::fast::RapidHasher as RapidInlineHasher;

/// A type alias for [`rapidhash::RapidHashMap`].
pub type RapidMap<K, V> = rapidhash::RapidHashMap<K, V>;
/// A type alias for [`rapidhash::RapidHashSet`].
pub type RapidSet<T> = rapidhash::RapidHashSet<T>;

/// Creates a new `RapidMap` with the specified capacity.
#[inline(always)]
#[must_use]
pub fn map_with_capacity<K, V>(capacity: usize) -> RapidMap<K, V>
where
    K: std::hash::Hash + Eq,
{
    RapidMap::with_capacity_and_hasher(capacity, RandomState::default())
}

/// Creates a new `RapidSet` with the specified capacity.
#[inline(always)]
#[must_use]
pub fn set_with_capacity<T>(capacity: usize) -> RapidSet<T>
where
    T: std::hash::Hash + Eq,
{
    RapidSet::with_capacity_and_hasher(capacity, RandomState::default())
}

/// Returns a new `RapidMap` with default values.
#[inline(always)]
#[must_use]
pub fn get_map<K, V>() -> RapidMap<K, V> {
    RapidMap::default()
}

/// Returns a new `RapidSet` with default values.
#[inline(always)]
#[must_use]
pub fn get_set<T>() -> RapidSet<T> {
    RapidSet::default()
}

/// Computes a hash for a byte slice using `rapidhash`.
#[inline(always)]
#[must_use]
pub const fn hash_bytes(bytes: &[u8]) -> u64 {
    rapidhash::v3::rapidhash_v3(bytes)
}

/// Computes a hash for a byte slice using `rapidhash` with a specified seed.
#[inline(always)]
#[must_use]
pub const fn hash_bytes_with_seed(bytes: &[u8], seed: u64) -> u64 {
    let secrets = rapidhash::v3::RapidSecrets::seed(seed);
    rapidhash::v3::rapidhash_v3_seeded(bytes, &secrets)
}

/// Folds a running hash with one more value's hash.
///
/// Used to build `absolute_hash` from a node's `local_hash` and its
/// children's already-computed `absolute_hash`es: each child hash reseeds the
/// byte hash of the running accumulator, so order matters (as it must, since
/// the tree is ordered).
#[inline]
#[must_use]
pub const fn combine_hash(running: u64, next: u64) -> u64 {
    hash_bytes_with_seed(&next.to_le_bytes(), running)
}

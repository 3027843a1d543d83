// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fast hashing and hash-map utilities.
//!
//! Trimmed from `thread-utils` down to what `thread-ast-core` actually needs:
//! `rapidhash`-backed maps/sets as drop-in `std::collections` replacements,
//! and a small set of byte/seeded hashing helpers used to build structural
//! hashes over trees.

mod hash_help;

pub use hash_help::{
    RapidInlineHasher, RapidMap, RapidSet, combine_hash, get_map, get_set, hash_bytes,
    hash_bytes_with_seed, map_with_capacity, set_with_capacity,
};

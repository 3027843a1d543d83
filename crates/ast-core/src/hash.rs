// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Structural Hashing
//!
//! Two pure functions over the node model, each memoized per node identity
//! in a cache private to one [`HashCalculator`] instance (never global, not
//! `Sync` — per spec.md §5/§9, a separate instance per thread is the
//! intended sharing policy):
//!
//! - [`HashCalculator::local_hash`] mixes a node's type name and data.
//! - [`HashCalculator::absolute_hash`] folds a node's local hash with its
//!   children's already-computed absolute hashes, giving the mapper an
//!   O(size), O(1)-comparison way to spot isomorphic subtrees.

use crate::node::{Node, NodeRef};
use std::cell::RefCell;
use thread_ast_utils::{RapidMap, combine_hash, hash_bytes};

/// Memoized local/absolute hash computation for one tree-mapping session.
///
/// Not `Sync`: the memoization tables are interior-mutable and keyed by
/// node pointer identity, so they are only valid for the lifetime of the
/// trees they were computed over and must not be shared across threads.
#[derive(Debug, Default)]
pub struct HashCalculator {
    local: RefCell<RapidMap<usize, u64>>,
    absolute: RefCell<RapidMap<usize, u64>>,
}

impl HashCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: RefCell::new(thread_ast_utils::get_map()),
            absolute: RefCell::new(thread_ast_utils::get_map()),
        }
    }

    /// `mix(type.name, data)`. Used for pattern-grouping of nodes that share
    /// surface form.
    pub fn local_hash(&self, node: &NodeRef) -> u64 {
        let id = Node::identity(node);
        if let Some(h) = self.local.borrow().get(&id) {
            return *h;
        }
        let ty = node.node_type();
        let mut h = hash_bytes(ty.name().as_bytes());
        h = combine_hash(h, hash_bytes(node.data().as_bytes()));
        self.local.borrow_mut().insert(id, h);
        h
    }

    /// `fold(local_hash(n), absolute_hash(c) for c in children)`. Equal
    /// subtrees always produce equal hashes (P2); this is not required to be
    /// collision-resistant, but must be strong enough that the mapper's
    /// "unique absolute hash" optimization reliably absorbs shared subtrees.
    pub fn absolute_hash(&self, node: &NodeRef) -> u64 {
        let id = Node::identity(node);
        if let Some(h) = self.absolute.borrow().get(&id) {
            return *h;
        }
        let mut h = self.local_hash(node);
        for child in node.children() {
            h = combine_hash(h, self.absolute_hash(&child));
        }
        self.absolute.borrow_mut().insert(id, h);
        h
    }

    /// Depth of the subtree rooted at `node` (1 for a leaf). Used by the
    /// bottom-up mapper to sort same-hash candidates by decreasing depth, so
    /// large shared subtrees are absorbed before their sub-subtrees are
    /// considered in isolation.
    pub fn depth(&self, node: &NodeRef) -> usize {
        1 + node.children().map(|c| self.depth(&c)).max().unwrap_or(0)
    }
}

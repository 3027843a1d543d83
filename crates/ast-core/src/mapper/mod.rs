// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Tree Mapper
//!
//! Aligns two trees L and R into a [`Mapping`]: a partial bijection between
//! their nodes, plus the three disjoint edit sets (Inserted/Replaced/Deleted)
//! the diff-tree builder consumes (§4.3). Two independent algorithms are
//! provided — [`bottom_up::map`] (the fast default, absorbing isomorphic
//! subtrees by absolute hash) and [`top_down::map`] (divergence-search via
//! the longest matching contiguous child run) — both produce output
//! satisfying invariant I4.
//!
//! **Root alignment.** Neither algorithm ever replaces or deletes the tree
//! roots themselves: L's root and R's root are always treated as the diff's
//! fixed frame of reference and force-matched up front, even when their
//! type/data disagree entirely. Only their descendants are reconciled. This
//! resolves spec.md's degenerate-input wording ("all root-level children of
//! R inserted under root L") the simplest way consistent with the
//! `DiffTreeBuilder` always being constructed from a prototype root: the
//! root is the outer frame, not a slot the mapper can edit.

pub mod bottom_up;
pub mod top_down;

use crate::node::NodeRef;
use thread_ast_utils::{RapidMap, RapidSet};

/// An insertion recorded against the L-side tree: `new_node` (from R) is to
/// be inserted as a child of `parent` (an L node), immediately after
/// `anchor`, or at index 0 if `anchor` is `None`. `anchor` is usually an L
/// node, but within a run of consecutive insertions at the same position it
/// is the previous insertion's own `new_node`, so the builder places each
/// one right after the last, preserving R's document order.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub parent: NodeRef,
    pub anchor: Option<NodeRef>,
    pub new_node: NodeRef,
}

/// The quadruple (bijection, inserted, replaced, deleted) produced by a
/// mapper. Inserted, Replaced-keys, and Deleted are pairwise disjoint (I4):
/// every node of L is mapped, replaced, or deleted; every node of R is
/// mapped, a replacement's `after`, or inserted.
#[derive(Debug, Default)]
pub struct Mapping {
    pairs: Vec<(NodeRef, NodeRef)>,
    inserted: Vec<Insertion>,
    replaced: Vec<(NodeRef, NodeRef)>,
    deleted: Vec<NodeRef>,
    l_to_r: RapidMap<usize, NodeRef>,
    r_to_l: RapidMap<usize, NodeRef>,
}

impl Mapping {
    #[must_use]
    pub fn pairs(&self) -> &[(NodeRef, NodeRef)] {
        &self.pairs
    }

    #[must_use]
    pub fn inserted(&self) -> &[Insertion] {
        &self.inserted
    }

    #[must_use]
    pub fn replaced(&self) -> &[(NodeRef, NodeRef)] {
        &self.replaced
    }

    #[must_use]
    pub fn deleted(&self) -> &[NodeRef] {
        &self.deleted
    }

    /// The R-side counterpart of a matched L node, if any.
    #[must_use]
    pub fn get_match(&self, l_node: &NodeRef) -> Option<NodeRef> {
        self.l_to_r.get(&crate::node::Node::identity(l_node)).cloned()
    }

    /// The L-side counterpart of a matched R node, if any.
    #[must_use]
    pub fn get_match_rev(&self, r_node: &NodeRef) -> Option<NodeRef> {
        self.r_to_l.get(&crate::node::Node::identity(r_node)).cloned()
    }
}

/// Shared bookkeeping used while building a [`Mapping`]: which L/R node
/// identities have already been accounted for, so the two algorithms (and
/// their internal recursion) never double-claim a node.
#[derive(Debug, Default)]
struct MapCtx {
    mapping: Mapping,
    matched_l: RapidSet<usize>,
    matched_r: RapidSet<usize>,
}

impl MapCtx {
    fn new() -> Self {
        Self {
            mapping: Mapping::default(),
            matched_l: thread_ast_utils::get_set(),
            matched_r: thread_ast_utils::get_set(),
        }
    }

    fn is_matched_l(&self, n: &NodeRef) -> bool {
        self.matched_l.contains(&crate::node::Node::identity(n))
    }

    fn is_matched_r(&self, n: &NodeRef) -> bool {
        self.matched_r.contains(&crate::node::Node::identity(n))
    }

    /// Records `l <-> r` as matched, idempotently (re-matching the same pair
    /// twice, e.g. the forced root alignment after an already-absorbed
    /// identical tree, is a no-op).
    fn record_match(&mut self, l: NodeRef, r: NodeRef) {
        if self.is_matched_l(&l) {
            return;
        }
        self.matched_l.insert(crate::node::Node::identity(&l));
        self.matched_r.insert(crate::node::Node::identity(&r));
        self.mapping
            .l_to_r
            .insert(crate::node::Node::identity(&l), r.clone());
        self.mapping
            .r_to_l
            .insert(crate::node::Node::identity(&r), l.clone());
        self.mapping.pairs.push((l, r));
    }

    /// Marks an entire isomorphic subtree pair as matched, recursively
    /// pairing children by index (spec.md §4.3 step 3: "they are already
    /// isomorphic").
    fn absorb_subtree(&mut self, l: &NodeRef, r: &NodeRef) {
        if self.is_matched_l(l) {
            return;
        }
        self.record_match(l.clone(), r.clone());
        let lc: Vec<_> = l.children().collect();
        let rc: Vec<_> = r.children().collect();
        for (a, b) in lc.iter().zip(rc.iter()) {
            self.absorb_subtree(a, b);
        }
    }

    fn record_replace(&mut self, before: NodeRef, after: NodeRef) {
        self.matched_l.insert(crate::node::Node::identity(&before));
        self.matched_r.insert(crate::node::Node::identity(&after));
        self.mapping.replaced.push((before, after));
    }

    fn record_delete(&mut self, node: NodeRef) {
        self.matched_l.insert(crate::node::Node::identity(&node));
        self.mapping.deleted.push(node);
    }

    /// Marks every node of `subtree` (itself and descendants) as
    /// R-consumed, then records one top-level [`Insertion`].
    fn record_insert(&mut self, parent: NodeRef, anchor: Option<NodeRef>, new_node: NodeRef) {
        mark_subtree_r(&new_node, &mut self.matched_r);
        self.mapping.inserted.push(Insertion {
            parent,
            anchor,
            new_node,
        });
    }

    fn finish(self) -> Mapping {
        self.mapping
    }
}

fn mark_subtree_r(node: &NodeRef, set: &mut RapidSet<usize>) {
    set.insert(crate::node::Node::identity(node));
    for child in node.children() {
        mark_subtree_r(&child, set);
    }
}

/// Pre-order traversal of a tree, used by the bottom-up algorithm to
/// enumerate candidates for absolute-hash grouping.
fn pre_order(root: &NodeRef) -> Vec<NodeRef> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(n) = stack.pop() {
        let children: Vec<_> = n.children().collect();
        out.push(n);
        for c in children.into_iter().rev() {
            stack.push(c);
        }
    }
    out
}

// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Extended Node View
//!
//! A read-only decoration of a tree that adds parent, left/right sibling,
//! sequence index, and absolute hash to every node (§4.4). Built once, in a
//! single post-order pass, from a plain tree; used only by the top-down
//! mapper's node-pair finder and its [`Section`] abstraction.
//!
//! Implemented as an arena of indices rather than `Rc`/`Weak` back-edges:
//! parent and sibling links are plain `usize` offsets into the same `Vec`,
//! which sidesteps the aliasing/cycle issues a directly self-referential
//! `Rc` tree would have and keeps the whole view one contiguous allocation.

use crate::hash::HashCalculator;
use crate::node::NodeRef;

#[derive(Debug)]
struct ExtNodeData {
    prototype: NodeRef,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    index: usize,
    abs_hash: u64,
    children: Vec<usize>,
}

/// An extended tree: one arena of decorated nodes plus the root's index.
#[derive(Debug)]
pub struct ExtTree {
    arena: Vec<ExtNodeData>,
    root: usize,
}

impl ExtTree {
    /// Builds the extended view of `root` in a single post-order pass,
    /// using `calc` for each node's absolute hash.
    #[must_use]
    pub fn build(root: &NodeRef, calc: &HashCalculator) -> Self {
        let mut arena = Vec::new();
        let root_id = Self::build_rec(root, None, 0, &mut arena, calc);
        Self {
            arena,
            root: root_id,
        }
    }

    fn build_rec(
        node: &NodeRef,
        parent: Option<usize>,
        index: usize,
        arena: &mut Vec<ExtNodeData>,
        calc: &HashCalculator,
    ) -> usize {
        let my_id = arena.len();
        // reserve the slot before recursing so children can see this index as their parent
        arena.push(ExtNodeData {
            prototype: node.clone(),
            parent,
            left: None,
            right: None,
            index,
            abs_hash: calc.absolute_hash(node),
            children: Vec::new(),
        });
        let mut child_ids = Vec::new();
        for (i, child) in node.children().enumerate() {
            child_ids.push(Self::build_rec(&child, Some(my_id), i, arena, calc));
        }
        for (i, &id) in child_ids.iter().enumerate() {
            arena[id].left = if i == 0 { None } else { Some(child_ids[i - 1]) };
            arena[id].right = child_ids.get(i + 1).copied();
        }
        arena[my_id].children = child_ids;
        my_id
    }

    #[must_use]
    pub fn root(&self) -> ExtNode<'_> {
        ExtNode {
            tree: self,
            id: self.root,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// All nodes of the tree in pre-order, the arena's natural build order.
    pub fn pre_order(&self) -> impl Iterator<Item = ExtNode<'_>> {
        (0..self.arena.len()).map(move |id| ExtNode { tree: self, id })
    }
}

/// A handle into one node of an [`ExtTree`].
#[derive(Debug, Clone, Copy)]
pub struct ExtNode<'a> {
    tree: &'a ExtTree,
    id: usize,
}

impl<'a> ExtNode<'a> {
    fn data(&self) -> &'a ExtNodeData {
        &self.tree.arena[self.id]
    }

    #[must_use]
    pub fn prototype(&self) -> &'a NodeRef {
        &self.data().prototype
    }

    #[must_use]
    pub fn parent(&self) -> Option<ExtNode<'a>> {
        self.data().parent.map(|id| ExtNode {
            tree: self.tree,
            id,
        })
    }

    #[must_use]
    pub fn left_sibling(&self) -> Option<ExtNode<'a>> {
        self.data().left.map(|id| ExtNode {
            tree: self.tree,
            id,
        })
    }

    #[must_use]
    pub fn right_sibling(&self) -> Option<ExtNode<'a>> {
        self.data().right.map(|id| ExtNode {
            tree: self.tree,
            id,
        })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.data().index
    }

    #[must_use]
    pub fn absolute_hash(&self) -> u64 {
        self.data().abs_hash
    }

    #[must_use]
    pub fn arena_id(&self) -> usize {
        self.id
    }

    pub fn children(&self) -> impl Iterator<Item = ExtNode<'a>> + 'a {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| ExtNode { tree, id })
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }
}

// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The fast, default mapping algorithm (§4.3): absorb every isomorphic
//! subtree by absolute-hash uniqueness first, force-align the two roots,
//! then reconcile whatever remains unmatched, one parent's children at a
//! time.

use super::{MapCtx, Mapping, pre_order};
use crate::hash::HashCalculator;
use crate::node::{Node, NodeRef};
use thread_ast_utils::RapidMap;

/// Maps `l` onto `r`, producing a [`Mapping`].
#[must_use]
pub fn map(l: &NodeRef, r: &NodeRef) -> Mapping {
    let calc = HashCalculator::new();
    let mut ctx = MapCtx::new();

    absorb_exact_matches(l, r, &calc, &mut ctx);
    ctx.record_match(l.clone(), r.clone());
    reconcile_children(l, r, &mut ctx);

    ctx.finish()
}

/// Step 1-3: group R's nodes by absolute hash; for each L node (largest
/// subtrees first) with a uniquely-hashed, still-unmatched R candidate,
/// absorb the whole isomorphic pair.
fn absorb_exact_matches(l: &NodeRef, r: &NodeRef, calc: &HashCalculator, ctx: &mut MapCtx) {
    let mut r_groups: RapidMap<u64, Vec<NodeRef>> = thread_ast_utils::get_map();
    for node in pre_order(r) {
        r_groups
            .entry(calc.absolute_hash(&node))
            .or_default()
            .push(node);
    }

    let mut l_nodes = pre_order(l);
    // Sort by decreasing depth so large shared subtrees are absorbed before
    // their own sub-subtrees are considered in isolation; stable sort keeps
    // pre-order as the deterministic tie-break.
    l_nodes.sort_by_key(|n| std::cmp::Reverse(calc.depth(n)));

    for n in &l_nodes {
        if ctx.is_matched_l(n) {
            continue;
        }
        let hash = calc.absolute_hash(n);
        let Some(candidates) = r_groups.get(&hash) else {
            continue;
        };
        let mut available = candidates.iter().filter(|c| !ctx.is_matched_r(c));
        let Some(first) = available.next() else {
            continue;
        };
        if available.next().is_some() {
            continue; // hash not unique among still-unmatched R candidates
        }
        ctx.absorb_subtree(n, first);
    }
}

/// Step 4: `n` and `r` are already matched to each other (by absorption or
/// by force-alignment). Reconcile whichever of their children absorption
/// left unmatched.
///
/// Children still unmatched on both sides are paired by position (a common
/// prefix/suffix shrink): the shorter side's positions are tried for a
/// type+data match (recursing on success, emitting `Replace` on failure);
/// whichever side has leftover children beyond that gets `Insert` (R's
/// leftovers) or `Delete` (L's leftovers).
fn reconcile_children(n: &NodeRef, r: &NodeRef, ctx: &mut MapCtx) {
    let n_children: Vec<NodeRef> = n.children().collect();
    let r_children: Vec<NodeRef> = r.children().collect();

    let un_l: Vec<NodeRef> = n_children
        .into_iter()
        .filter(|c| !ctx.is_matched_l(c))
        .collect();
    let r_with_index: Vec<(usize, NodeRef)> = r_children
        .into_iter()
        .enumerate()
        .filter(|(_, c)| !ctx.is_matched_r(c))
        .collect();

    let shared = un_l.len().min(r_with_index.len());

    for i in 0..shared {
        let l_child = un_l[i].clone();
        let (_, r_child) = r_with_index[i].clone();
        if same_shape(&l_child, &r_child) {
            ctx.record_match(l_child.clone(), r_child.clone());
            reconcile_children(&l_child, &r_child, ctx);
        } else {
            ctx.record_replace(l_child, r_child);
        }
    }

    match un_l.len().cmp(&r_with_index.len()) {
        std::cmp::Ordering::Less => {
            // Consecutive insertions must chain: the first anchors on the
            // nearest already-matched L sibling, but every later one in the
            // same run anchors on the previous insertion's own new node, or
            // document order would reverse (all of them would otherwise
            // anchor on that same L sibling and pile up right after it).
            let mut anchor = None;
            for (i, (r_index, new_node)) in r_with_index[shared..].iter().enumerate() {
                if i == 0 {
                    anchor = preceding_matched_l_sibling(r, *r_index, &*ctx);
                }
                ctx.record_insert(n.clone(), anchor.clone(), new_node.clone());
                anchor = Some(new_node.clone());
            }
        }
        std::cmp::Ordering::Greater => {
            for deleted in &un_l[shared..] {
                ctx.record_delete(deleted.clone());
            }
        }
        std::cmp::Ordering::Equal => {}
    }
}

/// Two nodes have the "same shape" for a tentative position-based pairing:
/// same observable type name and same data. Does not imply equal children —
/// [`reconcile_children`] is called again to find any remaining diffs.
fn same_shape(a: &NodeRef, b: &NodeRef) -> bool {
    a.node_type().name() == b.node_type().name() && a.data() == b.data()
}

/// Walks `r_parent`'s children backward from just before `r_index`,
/// returning the L counterpart of the nearest one already matched. `None`
/// means "insert at the start of `n`'s child list".
fn preceding_matched_l_sibling(r_parent: &NodeRef, r_index: usize, ctx: &MapCtx) -> Option<NodeRef> {
    for i in (0..r_index).rev() {
        let sibling = r_parent.get_child(i)?;
        if let Some(l_sibling) = ctx.mapping.get_match_rev(&sibling) {
            return Some(l_sibling);
        }
    }
    None
}

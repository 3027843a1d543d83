// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The alternative, divergence-search mapping algorithm (§4.3): walk both
//! roots simultaneously; wherever their children diverge, use the
//! [`ExtTree`]-backed node-pair finder to locate the longest matching
//! contiguous child run, reduce the problem to the unmatched left/right
//! [`Section`]s around that run, and recurse. Edit actions are emitted
//! during section reduction rather than after a single global hash pass.

use super::{MapCtx, Mapping};
use crate::ext::{ExtNode, ExtTree};
use crate::hash::HashCalculator;
use crate::node::NodeRef;

/// Maps `l` onto `r` via the top-down, section-reduction algorithm.
#[must_use]
pub fn map(l: &NodeRef, r: &NodeRef) -> Mapping {
    let calc = HashCalculator::new();
    let l_ext = ExtTree::build(l, &calc);
    let r_ext = ExtTree::build(r, &calc);
    let mut ctx = MapCtx::new();

    ctx.record_match(l.clone(), r.clone());
    walk(l_ext.root(), r_ext.root(), &mut ctx);

    ctx.finish()
}

fn walk(l: ExtNode<'_>, r: ExtNode<'_>, ctx: &mut MapCtx) {
    if l.absolute_hash() == r.absolute_hash() {
        ctx.absorb_subtree(l.prototype(), r.prototype());
        return;
    }
    let l_children: Vec<_> = l.children().collect();
    let r_children: Vec<_> = r.children().collect();
    reduce_section(&l_children, &r_children, l.prototype(), ctx);
}

/// A paired, localized subsequence: `l` and `r` slices of sibling children
/// still awaiting reconciliation, plus the L-side parent new insertions
/// anchor against.
struct Section<'a, 'b> {
    l: &'a [ExtNode<'b>],
    r: &'a [ExtNode<'b>],
}

/// The node-pair finder: among all (hash-equal) candidate offsets, picks
/// `(i_l, i_r, k)` maximizing the length `k` of the matching contiguous
/// run, ties broken by smaller `i_l` then smaller `i_r`.
fn find_longest_run(l: &[ExtNode<'_>], r: &[ExtNode<'_>]) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (i, ln) in l.iter().enumerate() {
        for (j, rn) in r.iter().enumerate() {
            if ln.absolute_hash() != rn.absolute_hash() {
                continue;
            }
            let mut k = 0;
            while i + k < l.len() && j + k < r.len() && l[i + k].absolute_hash() == r[j + k].absolute_hash() {
                k += 1;
            }
            let better = match best {
                None => true,
                Some((bi, bj, bk)) => k > bk || (k == bk && (i < bi || (i == bi && j < bj))),
            };
            if better {
                best = Some((i, j, k));
            }
        }
    }
    best.filter(|&(_, _, k)| k > 0)
}

fn reduce_section(l: &[ExtNode<'_>], r: &[ExtNode<'_>], parent_l: &NodeRef, ctx: &mut MapCtx) {
    if l.is_empty() && r.is_empty() {
        return;
    }
    let section = Section { l, r };
    if let Some((i_l, i_r, k)) = find_longest_run(section.l, section.r) {
        for offset in 0..k {
            ctx.absorb_subtree(
                section.l[i_l + offset].prototype(),
                section.r[i_r + offset].prototype(),
            );
        }
        reduce_section(&section.l[..i_l], &section.r[..i_r], parent_l, ctx);
        reduce_section(&section.l[i_l + k..], &section.r[i_r + k..], parent_l, ctx);
    } else {
        emit_section_edits(section.l, section.r, parent_l, ctx);
    }
}

/// No contiguous run matched anywhere in this section: pair positions up to
/// the shorter side's length (recursing into `walk` on each pair, since a
/// same-shape pair may still diverge deeper down), then treat the longer
/// side's leftover as pure inserts or deletes.
fn emit_section_edits(l: &[ExtNode<'_>], r: &[ExtNode<'_>], parent_l: &NodeRef, ctx: &mut MapCtx) {
    let shared = l.len().min(r.len());
    for i in 0..shared {
        let (ln, rn) = (l[i], r[i]);
        if ln.prototype().node_type().name() == rn.prototype().node_type().name()
            && ln.prototype().data() == rn.prototype().data()
        {
            ctx.record_match(ln.prototype().clone(), rn.prototype().clone());
            walk(ln, rn, ctx);
        } else {
            ctx.record_replace(ln.prototype().clone(), rn.prototype().clone());
        }
    }
    if l.len() > r.len() {
        for ln in &l[shared..] {
            ctx.record_delete(ln.prototype().clone());
        }
    } else if r.len() > l.len() {
        // Chain anchors across the run (see bottom_up::reconcile_children):
        // only the first insertion anchors on the matched L sibling, every
        // later one anchors on the previous insertion's own new node, so
        // document order survives.
        let mut anchor = if shared == 0 {
            None
        } else {
            Some(l[shared - 1].prototype().clone())
        };
        for rn in &r[shared..] {
            let new_node = rn.prototype().clone();
            ctx.record_insert(parent_l.clone(), anchor.clone(), new_node.clone());
            anchor = Some(new_node);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::{Node, Type};

    fn leaf(name: &str, data: &str) -> NodeRef {
        Node::leaf(name, data)
    }

    fn block(children: Vec<NodeRef>) -> NodeRef {
        Node::plain(Type::draft("Block"), "", children, None)
    }

    #[test]
    fn matches_identical_children_via_run_finder() {
        let l = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
        let r = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
        let m = map(&l, &r);
        assert!(m.deleted().is_empty());
        assert!(m.inserted().is_empty());
        assert!(m.replaced().is_empty());
    }

    #[test]
    fn finds_insertion_between_matched_runs() {
        let l = block(vec![leaf("A", "1"), leaf("C", "3")]);
        let r = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
        let m = map(&l, &r);
        assert_eq!(m.inserted().len(), 1);
        assert_eq!(m.inserted()[0].new_node.data(), "2");
        assert_eq!(m.inserted()[0].anchor.as_ref().unwrap().data(), "1");
    }

    #[test]
    fn finds_deletion() {
        let l = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
        let r = block(vec![leaf("A", "1"), leaf("C", "3")]);
        let m = map(&l, &r);
        assert_eq!(m.deleted().len(), 1);
        assert_eq!(m.deleted()[0].data(), "2");
    }

    #[test]
    fn consecutive_insertions_chain_anchors_in_order() {
        let l = block(vec![leaf("A", "1"), leaf("D", "4")]);
        let r = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3"), leaf("D", "4")]);
        let m = map(&l, &r);
        assert_eq!(m.inserted().len(), 2);
        assert_eq!(m.inserted()[0].new_node.data(), "2");
        assert_eq!(m.inserted()[0].anchor.as_ref().unwrap().data(), "1");
        assert_eq!(m.inserted()[1].new_node.data(), "3");
        assert_eq!(m.inserted()[1].anchor.as_ref().unwrap().data(), "2");
    }
}

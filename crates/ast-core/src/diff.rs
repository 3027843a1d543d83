// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Diff Tree Projection
//!
//! A diff tree (`Node::Diff`) carries action markers inside an otherwise
//! unchanged prototype tree (§4.5). [`get_before`]/[`get_after`] project it
//! back to the original and forward to the edited state, satisfying I3: the
//! `before` projection equals the prototype tree; the `after` projection
//! reflects every action applied, in document order.

use crate::node::{ActionKind, Node, NodeRef};

/// Projects a diff tree to the state before any of its actions were
/// applied. `Insert` items are skipped; `Delete` items project to the
/// deleted subtree; `Replace` items project to their `before`; nested
/// `Node::Diff` items recurse.
#[must_use]
pub fn get_before(node: &NodeRef) -> NodeRef {
    match node.as_ref() {
        Node::Diff(d) => {
            let children: Vec<NodeRef> = d.items.iter().filter_map(project_before_item).collect();
            Node::plain(
                d.prototype.node_type(),
                d.prototype.data().to_string(),
                children,
                d.prototype.fragment().cloned(),
            )
        }
        _ => node.clone(),
    }
}

fn project_before_item(item: &NodeRef) -> Option<NodeRef> {
    match item.as_ref() {
        Node::Action(ActionKind::Insert(_)) => None,
        Node::Action(ActionKind::Replace(before, _)) => Some(before.clone()),
        Node::Action(ActionKind::Delete(target)) => Some(target.clone()),
        Node::Diff(_) => Some(get_before(item)),
        _ => Some(item.clone()),
    }
}

/// Projects a diff tree to the state after every action has been applied.
/// `Delete` items are skipped; `Insert` items materialize their new node;
/// `Replace` items project to their `after`; nested `Node::Diff` items
/// recurse.
#[must_use]
pub fn get_after(node: &NodeRef) -> NodeRef {
    match node.as_ref() {
        Node::Diff(d) => {
            let children: Vec<NodeRef> = d.items.iter().filter_map(project_after_item).collect();
            Node::plain(
                d.prototype.node_type(),
                d.prototype.data().to_string(),
                children,
                d.prototype.fragment().cloned(),
            )
        }
        _ => node.clone(),
    }
}

fn project_after_item(item: &NodeRef) -> Option<NodeRef> {
    match item.as_ref() {
        Node::Action(ActionKind::Insert(new_node)) => Some(new_node.clone()),
        Node::Action(ActionKind::Replace(_, after)) => Some(after.clone()),
        Node::Action(ActionKind::Delete(_)) => None,
        Node::Diff(_) => Some(get_after(item)),
        _ => Some(item.clone()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diff_builder::DiffTreeBuilder;
    use crate::mapper::bottom_up;
    use crate::node::{Type, deep_compare};

    fn leaf(name: &str, data: &str) -> NodeRef {
        Node::leaf(name, data)
    }

    fn block(children: Vec<NodeRef>) -> NodeRef {
        Node::plain(Type::draft("Block"), "", children, None)
    }

    #[test]
    fn projections_round_trip_on_replace() {
        let l = block(vec![leaf("A", "1"), leaf("B", "2")]);
        let r = block(vec![leaf("A", "1"), leaf("B", "x")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        assert!(builder.build(&r, bottom_up::map));
        let diff = builder.diff_tree();
        assert!(deep_compare(&get_before(&diff), &l));
        assert!(deep_compare(&get_after(&diff), &r));
    }
}

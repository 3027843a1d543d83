// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Diff Tree Builder
//!
//! Builds a `Node::Diff` overlay from a prototype root, injecting insert /
//! replace / delete actions at the correct parents (§4.5). The builder is
//! mutable during construction (an auxiliary index tracks, for every
//! prototype node's identity, its enclosing diff-tree slot and that slot's
//! parent); [`DiffTreeBuilder::diff_tree`] freezes the result into an
//! ordinary `Node::Diff` tree shared by the rest of the crate.
//!
//! Every public operation here is a recoverable failure reported as `bool`
//! (§7): nothing in the builder ever raises.

use crate::mapper::{Insertion, Mapping};
use crate::node::{ActionKind, Node, NodeRef};
use std::cell::RefCell;
use std::rc::Rc;
use thread_ast_utils::RapidMap;

/// A mapping algorithm, as consumed by [`DiffTreeBuilder::build`]. Both
/// `mapper::bottom_up::map` and `mapper::top_down::map` satisfy this.
pub type MapperFn = fn(&NodeRef, &NodeRef) -> Mapping;

/// One slot of the diff tree under construction: either still a plain
/// wrapper over a prototype node (with its own sub-slots), or an action that
/// has consumed the slot.
enum Slot {
    Child(Rc<RefCell<BuildNode>>),
    Action(NodeRef),
}

struct BuildNode {
    prototype: NodeRef,
    items: Vec<Slot>,
}

type Entry = (Rc<RefCell<BuildNode>>, Option<Rc<RefCell<BuildNode>>>);

/// A mutable diff-tree under construction over a prototype root.
pub struct DiffTreeBuilder {
    root: Rc<RefCell<BuildNode>>,
    /// prototype node identity -> (its own build slot, that slot's parent)
    index: RapidMap<usize, Entry>,
}

impl DiffTreeBuilder {
    #[must_use]
    pub fn new(prototype_root: NodeRef) -> Self {
        let mut index = thread_ast_utils::get_map();
        let root = Self::index_node(&prototype_root, None, &mut index);
        Self { root, index }
    }

    fn index_node(
        node: &NodeRef,
        parent: Option<Rc<RefCell<BuildNode>>>,
        index: &mut RapidMap<usize, Entry>,
    ) -> Rc<RefCell<BuildNode>> {
        let build = Rc::new(RefCell::new(BuildNode {
            prototype: node.clone(),
            items: Vec::new(),
        }));
        index.insert(Node::identity(node), (Rc::clone(&build), parent));
        let items: Vec<Slot> = node
            .children()
            .map(|child| Slot::Child(Self::index_node(&child, Some(Rc::clone(&build)), index)))
            .collect();
        build.borrow_mut().items = items;
        build
    }

    fn entry_for(&self, prototype: &NodeRef) -> Option<&Entry> {
        self.index.get(&Node::identity(prototype))
    }

    /// Finds `parent`'s build slot in the index, falling back to the parent
    /// of `anchor`'s own slot when `parent` itself isn't indexed.
    fn resolve_parent_slot(
        &self,
        parent: &NodeRef,
        anchor: Option<&NodeRef>,
    ) -> Option<Rc<RefCell<BuildNode>>> {
        if let Some(entry) = self.entry_for(parent) {
            return Some(Rc::clone(&entry.0));
        }
        let anchor = anchor?;
        let entry = self.entry_for(anchor)?;
        entry.1.clone()
    }

    /// Inserts `insertion.new_node` as a child of its parent, immediately
    /// after its anchor (or at index 0 if the anchor is absent). The anchor
    /// may be either a live prototype child slot or a node already placed by
    /// an earlier `Insert` action in this same build, so a run of consecutive
    /// insertions that chain their anchors onto one another lands in
    /// document order rather than all piling up right after the anchor.
    /// Returns `false` if the parent cannot be located.
    pub fn insert_node(&mut self, insertion: &Insertion) -> bool {
        let Some(parent_slot) = self.resolve_parent_slot(&insertion.parent, insertion.anchor.as_ref())
        else {
            return false;
        };
        let action = Node::insert(insertion.new_node.clone());
        let mut parent = parent_slot.borrow_mut();
        let position = match &insertion.anchor {
            None => 0,
            Some(anchor) => match find_child_position(&parent.items, anchor) {
                Some(pos) => pos + 1,
                None => parent.items.len(),
            },
        };
        parent.items.insert(position, Slot::Action(action));
        true
    }

    /// Replaces the slot currently holding `before` with a `Replace`
    /// action. Returns `false` if `before` is not present as a live child
    /// slot (not indexed, is the root, or was already converted to an
    /// action by an earlier call).
    pub fn replace_node(&mut self, before: &NodeRef, after: NodeRef) -> bool {
        self.convert_slot(before, |_| Node::replace(before.clone(), after.clone()))
    }

    /// Converts the slot currently holding `node` into a `Delete` action.
    /// Same failure semantics as [`DiffTreeBuilder::replace_node`].
    pub fn delete_node(&mut self, node: &NodeRef) -> bool {
        self.convert_slot(node, |_| Node::delete(node.clone()))
    }

    /// Converts the slot currently holding `prototype_node` into a hole
    /// numbered `number`. Used by [`crate::pattern::PatternBuilder`] to
    /// author wildcard positions; same failure semantics as
    /// [`DiffTreeBuilder::replace_node`].
    pub fn set_hole(&mut self, prototype_node: &NodeRef, number: u32) -> bool {
        self.convert_slot(prototype_node, |target| Node::hole(target.clone(), number))
    }

    fn convert_slot(&mut self, target: &NodeRef, make_action: impl FnOnce(&NodeRef) -> NodeRef) -> bool {
        let Some(entry) = self.entry_for(target) else {
            return false;
        };
        let Some(parent_slot) = entry.1.clone() else {
            return false; // target is the root: never a convertible child slot
        };
        let mut parent = parent_slot.borrow_mut();
        let Some(position) = find_child_position(&parent.items, target) else {
            return false; // already converted, or not a direct child slot
        };
        parent.items[position] = Slot::Action(make_action(target));
        true
    }

    /// Runs `mapper` against `after_root` and applies every resulting
    /// action: all insertions first (to keep later anchor lookups stable),
    /// then replacements, then deletions. A sub-operation's failure does
    /// not stop the rest from being attempted; the overall result is the
    /// logical AND of every sub-operation.
    pub fn build(&mut self, after_root: &NodeRef, mapper: MapperFn) -> bool {
        let prototype_root = Rc::clone(&self.root.borrow().prototype);
        let mapping = mapper(&prototype_root, after_root);

        let mut ok = true;
        for insertion in mapping.inserted() {
            ok &= self.insert_node(insertion);
        }
        for (before, after) in mapping.replaced() {
            ok &= self.replace_node(before, after.clone());
        }
        for deleted in mapping.deleted() {
            ok &= self.delete_node(deleted);
        }
        ok
    }

    /// Freezes the current build state into an immutable `Node::Diff` tree.
    #[must_use]
    pub fn diff_tree(&self) -> NodeRef {
        Self::freeze(&self.root)
    }

    fn freeze(build: &Rc<RefCell<BuildNode>>) -> NodeRef {
        let build = build.borrow();
        let items = build
            .items
            .iter()
            .map(|slot| match slot {
                Slot::Child(child) => Self::freeze(child),
                Slot::Action(action) => action.clone(),
            })
            .collect();
        Rc::new(Node::Diff(crate::node::DiffNode {
            prototype: build.prototype.clone(),
            items,
        }))
    }
}

/// Finds `target`'s current slot, matching either a live prototype child
/// (`Slot::Child`) or a node an earlier `Insert` action already placed
/// (`Slot::Action`). The latter lets `insert_node` anchor a consecutive
/// insertion onto the node the previous one just placed, instead of only
/// onto prototype children, so a run of insertions preserves document order.
fn find_child_position(items: &[Slot], target: &NodeRef) -> Option<usize> {
    let target_id = Node::identity(target);
    items.iter().position(|slot| match slot {
        Slot::Child(child) => Node::identity(&child.borrow().prototype) == target_id,
        Slot::Action(action) => matches!(
            action.as_ref(),
            Node::Action(ActionKind::Insert(new_node)) if Node::identity(new_node) == target_id
        ),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diff::{get_after, get_before};
    use crate::mapper::bottom_up;
    use crate::node::{Type, deep_compare};

    fn leaf(name: &str, data: &str) -> NodeRef {
        Node::leaf(name, data)
    }

    fn block(children: Vec<NodeRef>) -> NodeRef {
        Node::plain(Type::draft("Block"), "", children, None)
    }

    #[test]
    fn builder_applies_insert() {
        let l = block(vec![leaf("Ret", "x")]);
        let r = block(vec![leaf("Assign", "y"), leaf("Ret", "x")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        assert!(builder.build(&r, bottom_up::map));
        let diff = builder.diff_tree();
        assert!(deep_compare(&get_before(&diff), &l));
        assert!(deep_compare(&get_after(&diff), &r));
    }

    #[test]
    fn builder_applies_delete() {
        let l = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
        let r = block(vec![leaf("A", "1"), leaf("C", "3")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        assert!(builder.build(&r, bottom_up::map));
        let diff = builder.diff_tree();
        assert!(deep_compare(&get_before(&diff), &l));
        assert!(deep_compare(&get_after(&diff), &r));
    }

    #[test]
    fn builder_preserves_order_of_consecutive_insertions_at_start() {
        let l = block(vec![leaf("Z", "")]);
        let r = block(vec![leaf("X", ""), leaf("Y", ""), leaf("Z", "")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        assert!(builder.build(&r, bottom_up::map));
        let diff = builder.diff_tree();
        assert!(deep_compare(&get_before(&diff), &l));
        assert!(deep_compare(&get_after(&diff), &r));
    }

    #[test]
    fn builder_preserves_order_of_consecutive_insertions_after_anchor() {
        let l = block(vec![leaf("A", ""), leaf("Z", "")]);
        let r = block(vec![leaf("A", ""), leaf("X", ""), leaf("Y", ""), leaf("Z", "")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        assert!(builder.build(&r, bottom_up::map));
        let diff = builder.diff_tree();
        assert!(deep_compare(&get_before(&diff), &l));
        assert!(deep_compare(&get_after(&diff), &r));
    }

    #[test]
    fn double_delete_same_slot_is_rejected() {
        let l = block(vec![leaf("A", "1")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        let target = l.get_child(0).unwrap();
        assert!(builder.delete_node(&target));
        assert!(!builder.delete_node(&target));
    }

    #[test]
    fn replace_missing_node_fails() {
        let l = block(vec![leaf("A", "1")]);
        let mut builder = DiffTreeBuilder::new(l.clone());
        let stray = leaf("Z", "9");
        assert!(!builder.replace_node(&stray, leaf("Y", "8")));
    }
}

// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Rule-Driven Tree Transformer
//!
//! A [`Converter`] recognizes a window of sibling nodes and proposes a
//! replacement; a [`Transformer`] applies an ordered list of converters to
//! every node post-order, re-running the list against each node to a fixed
//! point before descending no further (§4.7). Transformation is driven
//! entirely by the converters supplied — this module carries no built-in
//! rule set.

use crate::node::{Factory, Node, NodeRef};

/// One rewrite rule. `convert` is given the full sibling list it may draw its
/// window from, the index its window starts at, and a [`Factory`] to build
/// replacement nodes of registered types; it returns the replacement node and
/// how many siblings (starting at `start_index`) it consumed, or `None` if it
/// doesn't apply here.
pub trait Converter {
    /// The minimum number of siblings, starting at the scan cursor, this
    /// converter needs to even attempt a match. Must be at least 1.
    fn min_consumed(&self) -> usize;

    /// Scan direction for this converter's pass over a sibling list:
    /// right-to-left when true, left-to-right (the default sense) otherwise.
    fn is_right_to_left(&self) -> bool {
        false
    }

    fn convert(
        &self,
        siblings: &[NodeRef],
        start_index: usize,
        factory: &dyn Factory,
    ) -> Option<(NodeRef, usize)>;
}

/// Applies an ordered list of [`Converter`]s to a tree, post-order, to a
/// per-node fixed point.
pub struct Transformer<'a> {
    converters: Vec<&'a dyn Converter>,
    factory: &'a dyn Factory,
}

impl<'a> Transformer<'a> {
    #[must_use]
    pub fn new(converters: Vec<&'a dyn Converter>, factory: &'a dyn Factory) -> Self {
        Self { converters, factory }
    }

    /// Transforms `root` and returns the result. A node whose rebuild is
    /// rejected by its own type's arity contract becomes [`Node::dummy`]
    /// (§4.7: "a failed rebuild yields the dummy sentinel, not a raised
    /// error") and its parent's window consumes and drops it like any other
    /// converted-away node.
    #[must_use]
    pub fn transform(&self, root: &NodeRef) -> NodeRef {
        let children: Vec<NodeRef> = root.children().map(|c| self.transform(&c)).collect();
        let rebuilt = self.rebuild(root, children);
        self.fixed_point(&rebuilt)
    }

    /// Rebuilds `original` with `children` in place of its old ones, via its
    /// own type's builder. Non-`Plain` nodes (actions, holes, diff overlays)
    /// have no builder and pass through with children replaced structurally
    /// only when they're a diff overlay; otherwise they're returned as-is,
    /// since the transformer's domain is ordinary syntax trees.
    fn rebuild(&self, original: &NodeRef, children: Vec<NodeRef>) -> NodeRef {
        let Node::Plain(p) = original.as_ref() else {
            return original.clone();
        };
        let mut builder = p.ty.builder();
        builder.set_data(p.data.clone());
        if !builder.set_children_list(children) {
            return Node::dummy();
        }
        if let Some(fragment) = &p.fragment {
            builder.set_fragment(fragment.clone());
        }
        builder.create_node().unwrap_or_else(|_| Node::dummy())
    }

    /// Runs the converter list against `node`'s own child-window repeatedly
    /// until no converter fires, satisfying P7 (a second transform pass is a
    /// no-op).
    fn fixed_point(&self, node: &NodeRef) -> NodeRef {
        let mut current = node.clone();
        loop {
            let children: Vec<NodeRef> = current.children().collect();
            match self.apply_once(&current, &children) {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// One scan over `children` with every converter in order; the first
    /// converter that fires anywhere in the scan wins and produces the next
    /// iteration's node. Returns `None` once nothing fires.
    fn apply_once(&self, parent: &NodeRef, children: &[NodeRef]) -> Option<NodeRef> {
        for converter in &self.converters {
            let min = converter.min_consumed().max(1);
            let indices: Box<dyn Iterator<Item = usize>> = if converter.is_right_to_left() {
                Box::new((0..=children.len().saturating_sub(min)).rev())
            } else {
                Box::new(0..=children.len().saturating_sub(min))
            };
            for start in indices {
                if start + min > children.len() {
                    continue;
                }
                if let Some((new_node, consumed)) = converter.convert(children, start, self.factory) {
                    if consumed == 0 {
                        continue;
                    }
                    let mut rebuilt: Vec<NodeRef> = children[..start].to_vec();
                    if !new_node.is_dummy() {
                        rebuilt.push(new_node);
                    }
                    rebuilt.extend(children[start + consumed..].iter().cloned());
                    return Some(self.rebuild(parent, rebuilt));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::{EmptyFactory, Type};

    fn leaf(name: &str, data: &str) -> NodeRef {
        Node::leaf(name, data)
    }

    fn block(children: Vec<NodeRef>) -> NodeRef {
        Node::plain(Type::draft("Block"), "", children, None)
    }

    /// Folds `IntLit<a> Plus IntLit<b>` triples into a single `IntLit<a+b>`.
    struct ConstantFold;

    impl Converter for ConstantFold {
        fn min_consumed(&self) -> usize {
            3
        }

        fn convert(
            &self,
            siblings: &[NodeRef],
            start: usize,
            _factory: &dyn Factory,
        ) -> Option<(NodeRef, usize)> {
            let window = siblings.get(start..start + 3)?;
            let (a, op, b) = (&window[0], &window[1], &window[2]);
            if a.node_type().name() != "IntLit" || op.node_type().name() != "Plus" || b.node_type().name() != "IntLit"
            {
                return None;
            }
            let sum: i64 = a.data().parse::<i64>().ok()? + b.data().parse::<i64>().ok()?;
            Some((leaf("IntLit", sum.to_string()), 3))
        }
    }

    /// Deletes `NoOp` leaves outright (returns the dummy sentinel).
    struct DropNoOp;

    impl Converter for DropNoOp {
        fn min_consumed(&self) -> usize {
            1
        }

        fn convert(
            &self,
            siblings: &[NodeRef],
            start: usize,
            _factory: &dyn Factory,
        ) -> Option<(NodeRef, usize)> {
            if siblings[start].node_type().name() == "NoOp" {
                Some((Node::dummy(), 1))
            } else {
                None
            }
        }
    }

    #[test]
    fn s6_constant_folds_and_reaches_fixed_point() {
        let tree = block(vec![leaf("IntLit", "1"), leaf("Plus", ""), leaf("IntLit", "2")]);
        let fold = ConstantFold;
        let factory = EmptyFactory;
        let transformer = Transformer::new(vec![&fold], &factory);
        let once = transformer.transform(&tree);
        assert_eq!(once.child_count(), 1);
        assert_eq!(once.get_child(0).unwrap().data(), "3");

        let twice = transformer.transform(&once);
        assert_eq!(twice.child_count(), 1);
        assert_eq!(twice.get_child(0).unwrap().data(), "3");
    }

    #[test]
    fn converter_delete_via_dummy_sentinel() {
        let tree = block(vec![leaf("A", "1"), leaf("NoOp", ""), leaf("B", "2")]);
        let drop_noop = DropNoOp;
        let factory = EmptyFactory;
        let transformer = Transformer::new(vec![&drop_noop], &factory);
        let result = transformer.transform(&tree);
        assert_eq!(result.child_count(), 2);
        assert_eq!(result.get_child(0).unwrap().data(), "1");
        assert_eq!(result.get_child(1).unwrap().data(), "2");
    }

    #[test]
    fn no_converter_firing_is_identity() {
        let tree = block(vec![leaf("A", "1"), leaf("B", "2")]);
        let fold = ConstantFold;
        let factory = EmptyFactory;
        let transformer = Transformer::new(vec![&fold], &factory);
        let result = transformer.transform(&tree);
        assert_eq!(result.child_count(), 2);
    }
}

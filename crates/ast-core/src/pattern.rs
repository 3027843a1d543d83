// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Pattern, Matcher, and Patcher
//!
//! A pattern is a diff tree whose leaf positions may be holes (§4.6).
//! [`PatternBuilder`] authors one directly (no mapper run): start from a
//! "before" prototype tree, mark wildcard positions with
//! [`PatternBuilder::make_hole`], and mark edited positions with
//! [`PatternBuilder::replace`]/[`PatternBuilder::delete`]/
//! [`PatternBuilder::insert`], exactly as one would author
//! `"Add(#1, IntLit<\"1\">) -> Add(#1, IntLit<\"2\">)"`.
//!
//! [`Matcher`] walks a subject tree looking for nodes the pattern matches
//! structurally, unifying holes that share a number against equal subject
//! data; [`Patcher`] feeds the resulting actions into a fresh
//! [`DiffTreeBuilder`] over the subject and returns its `after` projection.

use crate::diff::get_after;
use crate::diff_builder::DiffTreeBuilder;
use crate::mapper::Insertion;
use crate::node::{ActionKind, Node, NodeRef, deep_compare};
use thread_ast_utils::RapidMap;

/// Authors a pattern: a diff tree over a prototype "before" shape, with
/// some leaf positions marked as holes.
pub struct PatternBuilder {
    inner: DiffTreeBuilder,
}

impl PatternBuilder {
    #[must_use]
    pub fn new(prototype_root: NodeRef) -> Self {
        Self {
            inner: DiffTreeBuilder::new(prototype_root),
        }
    }

    /// Replaces the slot wrapping `prototype_node` with a hole numbered
    /// `number`. Returns `false` if the slot is missing or already
    /// converted (same idempotence rule as the diff-tree builder).
    pub fn make_hole(&mut self, prototype_node: &NodeRef, number: u32) -> bool {
        self.inner.set_hole(prototype_node, number)
    }

    pub fn replace(&mut self, before: &NodeRef, after: NodeRef) -> bool {
        self.inner.replace_node(before, after)
    }

    pub fn delete(&mut self, node: &NodeRef) -> bool {
        self.inner.delete_node(node)
    }

    pub fn insert(&mut self, insertion: &Insertion) -> bool {
        self.inner.insert_node(insertion)
    }

    #[must_use]
    pub fn pattern(&self) -> NodeRef {
        self.inner.diff_tree()
    }
}

/// One action a successful match prescribes, already bound to concrete
/// subject nodes (no more prototype/hole indirection).
#[derive(Debug, Clone)]
pub enum MatchAction {
    Insert(Insertion),
    Replace(NodeRef, NodeRef),
    Delete(NodeRef),
}

/// One location in the subject where the whole pattern matched, plus the
/// actions it prescribes there.
#[derive(Debug, Clone)]
pub struct Match {
    pub root: NodeRef,
    pub actions: Vec<MatchAction>,
}

/// Locates subtrees of a subject matching a pattern.
pub struct Matcher;

impl Matcher {
    /// All subject nodes (pre-order) where the whole pattern matches.
    #[must_use]
    pub fn find_all(pattern: &NodeRef, subject: &NodeRef) -> Vec<Match> {
        let mut out = Vec::new();
        Self::visit(pattern, subject, &mut out);
        out
    }

    #[must_use]
    pub fn find_first(pattern: &NodeRef, subject: &NodeRef) -> Option<Match> {
        Self::try_at(pattern, subject).or_else(|| {
            subject
                .children()
                .find_map(|child| Self::find_first(pattern, &child))
        })
    }

    fn visit(pattern: &NodeRef, subject: &NodeRef, out: &mut Vec<Match>) {
        if let Some(m) = Self::try_at(pattern, subject) {
            out.push(m);
        }
        for child in subject.children() {
            Self::visit(pattern, &child, out);
        }
    }

    /// Attempts a full match with `subject` as the pattern root's
    /// counterpart. Commits nothing on failure: bindings and actions are
    /// scratch state local to this one attempt.
    fn try_at(pattern: &NodeRef, subject: &NodeRef) -> Option<Match> {
        let mut bindings: RapidMap<u32, NodeRef> = thread_ast_utils::get_map();
        let mut actions = Vec::new();
        if match_node(pattern, subject, &mut bindings, &mut actions) {
            Some(Match {
                root: subject.clone(),
                actions,
            })
        } else {
            None
        }
    }
}

fn match_node(
    pattern: &NodeRef,
    subject: &NodeRef,
    bindings: &mut RapidMap<u32, NodeRef>,
    actions: &mut Vec<MatchAction>,
) -> bool {
    match pattern.as_ref() {
        Node::Hole(hole) => {
            if hole.prototype.node_type().name() != subject.node_type().name() {
                return false;
            }
            if let Some(bound) = bindings.get(&hole.number) {
                deep_compare(bound, subject)
            } else {
                bindings.insert(hole.number, subject.clone());
                true
            }
        }
        Node::Action(ActionKind::Replace(before, after)) => {
            if !match_node(before, subject, bindings, actions) {
                return false;
            }
            actions.push(MatchAction::Replace(subject.clone(), after.clone()));
            true
        }
        Node::Action(ActionKind::Delete(before)) => {
            if !match_node(before, subject, bindings, actions) {
                return false;
            }
            actions.push(MatchAction::Delete(subject.clone()));
            true
        }
        // An Insert only makes sense as one item among a parent's children;
        // encountering it as a whole sub-pattern is not a match.
        Node::Action(ActionKind::Insert(_)) => false,
        Node::Diff(d) => {
            if d.prototype.node_type().name() != subject.node_type().name()
                || d.prototype.data() != subject.data()
            {
                return false;
            }
            let subject_children: Vec<NodeRef> = subject.children().collect();
            match_children(&d.items, &subject_children, subject, bindings, actions)
        }
        Node::Plain(_) => deep_compare(pattern, subject),
    }
}

/// Walks a parent pattern's item list against a subject's children,
/// advancing the subject cursor one step per non-`Insert` item and holding
/// it steady across `Insert` items (spec.md §4.6: "emit an Insert action at
/// the current position ... and advance the pattern cursor only").
fn match_children(
    items: &[NodeRef],
    subject_children: &[NodeRef],
    subject_parent: &NodeRef,
    bindings: &mut RapidMap<u32, NodeRef>,
    actions: &mut Vec<MatchAction>,
) -> bool {
    let mut cursor = 0;
    let mut last_matched: Option<NodeRef> = None;
    for item in items {
        if let Node::Action(ActionKind::Insert(new_node)) = item.as_ref() {
            actions.push(MatchAction::Insert(Insertion {
                parent: subject_parent.clone(),
                anchor: last_matched.clone(),
                new_node: new_node.clone(),
            }));
            continue;
        }
        let Some(subject) = subject_children.get(cursor) else {
            return false;
        };
        if !match_node(item, subject, bindings, actions) {
            return false;
        }
        last_matched = Some(subject.clone());
        cursor += 1;
    }
    cursor == subject_children.len()
}

/// Converts matches into a new tree: feeds every matched action into a
/// fresh [`DiffTreeBuilder`] over the subject and returns its `after`
/// projection.
pub struct Patcher;

impl Patcher {
    #[must_use]
    pub fn apply(subject_root: NodeRef, matches: &[Match]) -> NodeRef {
        let mut builder = DiffTreeBuilder::new(subject_root);
        for m in matches {
            for action in &m.actions {
                match action {
                    MatchAction::Insert(insertion) => {
                        builder.insert_node(insertion);
                    }
                    MatchAction::Replace(before, after) => {
                        builder.replace_node(before, after.clone());
                    }
                    MatchAction::Delete(node) => {
                        builder.delete_node(node);
                    }
                }
            }
        }
        get_after(&builder.diff_tree())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::Type;

    fn leaf(name: &str, data: &str) -> NodeRef {
        Node::leaf(name, data)
    }

    fn build_add_pattern() -> NodeRef {
        // Add(#1, IntLit<"1">) -> Add(#1, IntLit<"2">)
        let hole_slot = leaf("Id", "");
        let before = Node::plain(Type::draft("Add"), "", vec![hole_slot, leaf("IntLit", "1")], None);
        let mut pb = PatternBuilder::new(before.clone());
        assert!(pb.make_hole(&before.get_child(0).unwrap(), 1));
        assert!(pb.replace(&before.get_child(1).unwrap(), leaf("IntLit", "2")));
        pb.pattern()
    }

    #[test]
    fn s5_hole_and_replace() {
        let pattern = build_add_pattern();
        let subject = Node::plain(
            Type::draft("Assign"),
            "",
            vec![
                leaf("Id", "z"),
                Node::plain(Type::draft("Add"), "", vec![leaf("Id", "v"), leaf("IntLit", "1")], None),
            ],
            None,
        );
        let matches = Matcher::find_all(&pattern, &subject);
        assert_eq!(matches.len(), 1);
        let patched = Patcher::apply(subject, &matches);
        assert_eq!(patched.get_child(1).unwrap().get_child(1).unwrap().data(), "2");
        assert_eq!(patched.get_child(1).unwrap().get_child(0).unwrap().data(), "v");
    }

    #[test]
    fn hole_unification_rejects_mismatched_binding() {
        // #1 used twice in the pattern: Eq(#1, #1)
        let a = leaf("Id", "");
        let b = leaf("Id", "");
        let before = Node::plain(Type::draft("Eq"), "", vec![a, b], None);
        let mut pb = PatternBuilder::new(before.clone());
        assert!(pb.make_hole(&before.get_child(0).unwrap(), 1));
        assert!(pb.make_hole(&before.get_child(1).unwrap(), 1));
        let pattern = pb.pattern();

        let matching_subject = Node::plain(Type::draft("Eq"), "", vec![leaf("Id", "x"), leaf("Id", "x")], None);
        assert_eq!(Matcher::find_all(&pattern, &matching_subject).len(), 1);

        let mismatched_subject = Node::plain(Type::draft("Eq"), "", vec![leaf("Id", "x"), leaf("Id", "y")], None);
        assert!(Matcher::find_all(&pattern, &mismatched_subject).is_empty());
    }

    #[test]
    fn partial_match_leaves_no_actions() {
        let pattern = build_add_pattern();
        let subject = Node::plain(Type::draft("Add"), "", vec![leaf("Id", "v"), leaf("IntLit", "9")], None);
        assert!(Matcher::find_all(&pattern, &subject).is_empty());
    }
}

// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Testable properties P1-P8 from spec.md §8, exercised through the crate's
//! public API.

use thread_ast_core::{
    Converter, DiffTreeBuilder, EmptyFactory, Factory, HashCalculator, Matcher, Node, NodeRef, Patcher,
    PatternBuilder, Transformer, Type, deep_compare, get_after, get_before, mapper::bottom_up, parse, to_text,
};

fn leaf(name: &str, data: &str) -> NodeRef {
    Node::leaf(name, data)
}

fn block(children: Vec<NodeRef>) -> NodeRef {
    Node::plain(Type::draft("Block"), "", children, None)
}

/// P1: `absolute_hash` is deterministic across repeated calls on the same
/// node.
#[test]
fn p1_hash_determinism() {
    let calc = HashCalculator::new();
    let tree = block(vec![leaf("A", "1"), leaf("B", "2")]);
    assert_eq!(calc.absolute_hash(&tree), calc.absolute_hash(&tree));
}

/// P2: structurally equal trees hash equal.
#[test]
fn p2_hash_monotonicity() {
    let calc = HashCalculator::new();
    let a = block(vec![leaf("A", "1"), leaf("B", "2")]);
    let b = block(vec![leaf("A", "1"), leaf("B", "2")]);
    assert!(deep_compare(&a, &b));
    assert_eq!(calc.absolute_hash(&a), calc.absolute_hash(&b));
}

/// P3: diff round-trip — `deep_compare(D.before, L)` and
/// `deep_compare(D.after, R)` hold for any L, R.
#[test]
fn p3_diff_round_trip() {
    let l = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
    let r = block(vec![leaf("A", "1"), leaf("B", "x"), leaf("D", "4")]);
    let mut builder = DiffTreeBuilder::new(l.clone());
    builder.build(&r, bottom_up::map);
    let diff = builder.diff_tree();
    assert!(deep_compare(&get_before(&diff), &l));
    assert!(deep_compare(&get_after(&diff), &r));
}

/// P4: mapping disjointness — every node mentioned in `inserted` never
/// appears in `replaced`/`deleted` and vice versa, and the counts account
/// for every leftover L/R child after the shared-shape alignment.
#[test]
fn p4_mapping_disjointness() {
    let l = block(vec![leaf("A", "1"), leaf("B", "2"), leaf("C", "3")]);
    let r = block(vec![leaf("A", "1"), leaf("X", "9"), leaf("D", "4")]);
    let m = bottom_up::map(&l, &r);

    let mut seen = std::collections::HashSet::new();
    for (before, _) in m.replaced() {
        assert!(seen.insert(Node::identity(before)), "node replaced twice");
    }
    for node in m.deleted() {
        assert!(seen.insert(Node::identity(node)), "deleted node also replaced");
    }
    for insertion in m.inserted() {
        assert!(
            seen.insert(Node::identity(&insertion.new_node)),
            "inserted node also replaced/deleted"
        );
    }
}

/// P5: text round-trip for a tree with only letter-name types and no
/// special characters in data.
#[test]
fn p5_text_round_trip() {
    let tree = parse(r#"Binary<"add">(Id<"x">, IntLit<"1">)"#).expect("well-formed tree text");
    let reparsed = parse(&to_text(&tree)).expect("serialized form re-parses");
    assert!(deep_compare(&tree, &reparsed));
}

/// P6: pattern idempotence — re-applying a pattern whose only action is a
/// `Replace` to the rewritten tree yields an empty match set, since the
/// rewritten region no longer has the `before` shape the pattern requires.
#[test]
fn p6_pattern_idempotence() {
    // The pattern root itself is never a convertible slot (it's the diff's
    // fixed frame of reference, per the mapper's root-alignment rule), so
    // the replaced leaf must sit under a wrapper root.
    let target_leaf = leaf("IntLit", "1");
    let before_root = block(vec![target_leaf.clone()]);
    let mut pattern_builder = PatternBuilder::new(before_root.clone());
    assert!(pattern_builder.replace(&target_leaf, leaf("IntLit", "2")));
    let pattern = pattern_builder.pattern();

    let subject = block(vec![leaf("IntLit", "1")]);
    let first_matches = Matcher::find_all(&pattern, &subject);
    assert_eq!(first_matches.len(), 1);
    let rewritten = Patcher::apply(subject, &first_matches);

    let second_matches = Matcher::find_all(&pattern, &rewritten);
    assert!(second_matches.is_empty());
}

/// P7: transformer fixed-point — a second `transform` call is a no-op.
#[test]
fn p7_transformer_fixed_point() {
    struct DoubleDigits;
    impl Converter for DoubleDigits {
        fn min_consumed(&self) -> usize {
            1
        }
        fn convert(&self, siblings: &[NodeRef], start: usize, _factory: &dyn Factory) -> Option<(NodeRef, usize)> {
            let node = &siblings[start];
            if node.node_type().name() != "IntLit" {
                return None;
            }
            let value: i64 = node.data().parse().ok()?;
            if value >= 100 {
                return None; // already at fixed point
            }
            Some((leaf("IntLit", (value * 2).to_string()), 1))
        }
    }

    let tree = block(vec![leaf("IntLit", "3")]);
    let converter = DoubleDigits;
    let factory = EmptyFactory;
    let transformer = Transformer::new(vec![&converter], &factory);

    let once = transformer.transform(&tree);
    let twice = transformer.transform(&once);
    assert!(deep_compare(&once, &twice));
}

/// P8: hole unification — a pattern with two holes numbered `k` matches a
/// subject only if both positions bind to structurally equal data.
#[test]
fn p8_hole_unification() {
    let a = leaf("Id", "");
    let b = leaf("Id", "");
    let before = Node::plain(Type::draft("Eq"), "", vec![a, b], None);
    let mut pattern_builder = PatternBuilder::new(before.clone());
    assert!(pattern_builder.make_hole(&before.get_child(0).unwrap(), 7));
    assert!(pattern_builder.make_hole(&before.get_child(1).unwrap(), 7));
    let pattern = pattern_builder.pattern();

    let equal_subject = Node::plain(Type::draft("Eq"), "", vec![leaf("Id", "x"), leaf("Id", "x")], None);
    assert_eq!(Matcher::find_all(&pattern, &equal_subject).len(), 1);

    let unequal_subject = Node::plain(Type::draft("Eq"), "", vec![leaf("Id", "x"), leaf("Id", "y")], None);
    assert!(Matcher::find_all(&pattern, &unequal_subject).is_empty());
}

// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Tree Text Notation
//!
//! `Node := Name ("<" QuotedData ">")? ("(" ChildList ")")?`
//! `ChildList := (Node ("," ws* Node)*)?` (§6). `Name` is a run of letters;
//! `QuotedData` is a double-quoted string with no escaping. Used by tests
//! and by the "draft" builder — this is the core's own fixture notation, not
//! a language lexer, so every parsed node gets [`crate::node::Type::draft`].

use crate::node::{Node, NodeRef, Type};

/// Parses `text` as tree-text notation. Returns `None` on any malformed
/// input or trailing garbage, matching §7's "recoverable structural
/// mismatch stays boolean/`Option`" rule — this is not a programmer-contract
/// violation.
#[must_use]
pub fn parse(text: &str) -> Option<NodeRef> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
    };
    let node = parser.parse_node()?;
    parser.skip_ws();
    if parser.pos == parser.chars.len() {
        Some(node)
    } else {
        None
    }
}

/// Serializes `node` back to tree-text notation. Always emits the bare
/// `Name` form for empty data (no `<"">`) and omits `()` for leaves, so
/// `parse(to_text(n))` is always structurally equal to `n` (P5) even though
/// the literal text need not match byte-for-byte.
#[must_use]
pub fn to_text(node: &NodeRef) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &NodeRef, out: &mut String) {
    out.push_str(node.node_type().name());
    if !node.data().is_empty() {
        out.push('<');
        out.push('"');
        out.push_str(node.data());
        out.push('"');
        out.push('>');
    }
    if node.child_count() > 0 {
        out.push('(');
        for (i, child) in node.children().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_node(&child, out);
        }
        out.push(')');
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_name(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            self.pos += 1;
        }
        if self.pos == start {
            None
        } else {
            Some(self.chars[start..self.pos].iter().collect())
        }
    }

    fn parse_quoted(&mut self) -> Option<String> {
        if !self.expect('"') {
            return None;
        }
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c != '"') {
            self.pos += 1;
        }
        if self.peek() != Some('"') {
            return None;
        }
        let data = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Some(data)
    }

    fn parse_node(&mut self) -> Option<NodeRef> {
        self.skip_ws();
        let name = self.parse_name()?;
        let data = if self.peek() == Some('<') {
            self.pos += 1;
            let data = self.parse_quoted()?;
            if !self.expect('>') {
                return None;
            }
            data
        } else {
            String::new()
        };
        let children = if self.peek() == Some('(') {
            self.pos += 1;
            let children = self.parse_child_list()?;
            if !self.expect(')') {
                return None;
            }
            children
        } else {
            Vec::new()
        };
        Some(Node::plain(Type::draft(name), data, children, None))
    }

    fn parse_child_list(&mut self) -> Option<Vec<NodeRef>> {
        self.skip_ws();
        if self.peek() == Some(')') {
            return Some(Vec::new());
        }
        let mut out = vec![self.parse_node()?];
        loop {
            self.skip_ws();
            if self.expect(',') {
                self.skip_ws();
                out.push(self.parse_node()?);
            } else {
                break;
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::deep_compare;

    #[test]
    fn s1_parses_named_children() {
        let node = parse("X(A, B, C)").unwrap();
        assert_eq!(node.node_type().name(), "X");
        assert_eq!(node.child_count(), 3);
        assert_eq!(node.get_child(0).unwrap().node_type().name(), "A");
        assert_eq!(node.get_child(2).unwrap().node_type().name(), "C");
    }

    #[test]
    fn parses_quoted_data_leaf() {
        let node = parse(r#"IntLit<"42">"#).unwrap();
        assert_eq!(node.node_type().name(), "IntLit");
        assert_eq!(node.data(), "42");
        assert!(node.is_leaf());
    }

    #[test]
    fn tolerates_extra_whitespace_between_children() {
        let node = parse("X(A,    B,\tC)").unwrap();
        assert_eq!(node.child_count(), 3);
    }

    #[test]
    fn p5_round_trips_through_text() {
        let original = parse(r#"Assign(Id<"z">, Add(Id<"v">, IntLit<"1">))"#).unwrap();
        let text = to_text(&original);
        let reparsed = parse(&text).unwrap();
        assert!(deep_compare(&original, &reparsed));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("X(A) extra").is_none());
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(parse(r#"X<"unterminated"#).is_none());
    }
}

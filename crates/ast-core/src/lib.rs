// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # thread-ast-core
//!
//! A language-agnostic core for representing, differencing, patching, and
//! transforming ASTs: a uniform node model with structural hashing, a tree
//! mapper, a diff-tree overlay with before/after projection, a pattern
//! matcher/patcher built on unifying holes, and a rule-driven fixed-point
//! tree transformer. No file I/O, no language lexers, no concrete domain
//! node types — those are a consumer's concern.
//!
//! Leaves-first module order, matching the dependency chain:
//! [`node`] -> [`hash`] -> [`ext`] -> [`mapper`] -> [`diff`] ->
//! [`diff_builder`] -> [`pattern`] -> [`transform`], with [`text`] as a
//! parallel fixture notation used by tests and the draft builder.

pub mod diff;
pub mod diff_builder;
pub mod error;
pub mod ext;
pub mod hash;
pub mod mapper;
pub mod node;
pub mod pattern;
pub mod text;
pub mod transform;

pub use diff::{get_after, get_before};
pub use diff_builder::{DiffTreeBuilder, MapperFn};
pub use error::CoreError;
pub use ext::{ExtNode, ExtTree};
pub use hash::HashCalculator;
pub use mapper::{Insertion, Mapping};
pub use node::{
    ActionKind, Builder, ChildDescriptor, DiffItem, DiffNode, EmptyFactory, Factory, Fragment, HoleNode, MapFactory,
    Node, NodeRef, PlainNode, Properties, Type, deep_compare, identity_compare,
};
pub use pattern::{Match, MatchAction, Matcher, Patcher, PatternBuilder};
pub use text::{parse, to_text};
pub use transform::{Converter, Transformer};

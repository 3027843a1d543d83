// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Uniform AST Node Representation
//!
//! The polymorphic node model every other module in this crate builds on:
//! plain domain nodes, the three edit-action markers (Insert/Replace/Delete),
//! pattern holes, and the diff-tree overlay, unified behind one `Node` enum
//! rather than the deep inheritance chain the original OO design used.
//!
//! ## Key types
//!
//! - [`Node`] — the sum type every algorithm in this crate operates on.
//! - [`Type`] — a node's type descriptor (name, child arity, hierarchy, properties).
//! - [`Builder`] — a stateful, validating constructor for [`Node::Plain`] nodes.
//! - [`Factory`] — maps a type name to a [`Builder`], used by deserializers and the transformer.

use crate::error::CoreError;
use std::rc::Rc;
use thread_ast_utils::RapidMap;

/// Shared, non-owning handle to a node. Overlays (diff nodes, holes) and the
/// mapper's extended view alias the subtrees they wrap through this; nothing
/// in this crate ever mutates through it.
pub type NodeRef = Rc<Node>;

/// Opaque source-position metadata. The core carries this through on cloning
/// and pattern-building but never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment(pub Rc<str>);

impl Fragment {
    #[must_use]
    pub fn new(label: impl Into<Rc<str>>) -> Self {
        Self(label.into())
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A key/value property bag. Types carry one (colors, language tags, ...);
/// individual nodes (actions, holes) can carry local overrides that shadow
/// the type's own properties.
pub type Properties = RapidMap<Rc<str>, Rc<str>>;

fn single_property(key: &str, value: &str) -> Properties {
    let mut props = thread_ast_utils::get_map();
    props.insert(Rc::from(key), Rc::from(value));
    props
}

/// One entry in a [`Type`]'s child arity contract: a child's name and whether
/// it may be omitted. Descriptors are ordered; optional descriptors are
/// assumed to trail the required ones, matching the common "optional
/// trailing arguments" shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDescriptor {
    pub name: Rc<str>,
    pub optional: bool,
}

impl ChildDescriptor {
    #[must_use]
    pub fn required(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// A node's type descriptor: a name, an ordered child-arity contract, a
/// hierarchy of ancestor type names (for group-membership tests), and a
/// property map (e.g. `color`, `language`).
#[derive(Debug, Clone)]
pub struct Type {
    name: Rc<str>,
    child_descriptors: Rc<[ChildDescriptor]>,
    hierarchy: Rc<[Rc<str>]>,
    properties: Rc<Properties>,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Type {}

impl Type {
    #[must_use]
    pub fn new(
        name: impl Into<Rc<str>>,
        child_descriptors: impl Into<Rc<[ChildDescriptor]>>,
        hierarchy: impl Into<Rc<[Rc<str>]>>,
        properties: Properties,
    ) -> Self {
        Self {
            name: name.into(),
            child_descriptors: child_descriptors.into(),
            hierarchy: hierarchy.into(),
            properties: Rc::new(properties),
        }
    }

    /// A "draft" type carrying no arity or hierarchy information at all,
    /// derived entirely from a name. Used by the empty [`Factory`] and the
    /// tree-text parser, per spec: "node type is derived entirely from the
    /// provided name."
    #[must_use]
    pub fn draft(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: name.into(),
            child_descriptors: Rc::from([]),
            hierarchy: Rc::from([]),
            properties: Rc::new(thread_ast_utils::get_map()),
        }
    }

    pub(crate) fn reserved(name: &'static str, color: &str) -> Self {
        Self {
            name: Rc::from(name),
            child_descriptors: Rc::from([]),
            hierarchy: Rc::from([]),
            properties: Rc::new(single_property("color", color)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn child_descriptors(&self) -> &[ChildDescriptor] {
        &self.child_descriptors
    }

    #[must_use]
    pub fn hierarchy(&self) -> &[Rc<str>] {
        &self.hierarchy
    }

    /// Whether `ancestor` names this type itself or one of its ancestors.
    #[must_use]
    pub fn is_in_hierarchy(&self, ancestor: &str) -> bool {
        &*self.name == ancestor || self.hierarchy.iter().any(|h| &**h == ancestor)
    }

    #[must_use]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(AsRef::as_ref)
    }

    /// Number of leading, non-optional child descriptors (optionals are
    /// assumed trailing).
    #[must_use]
    pub fn required_child_count(&self) -> usize {
        self.child_descriptors
            .iter()
            .position(|d| d.optional)
            .unwrap_or(self.child_descriptors.len())
    }

    /// A type carries no arity contract at all (the "draft" shape).
    #[must_use]
    pub fn has_arity_contract(&self) -> bool {
        !self.child_descriptors.is_empty()
    }

    /// This type's name/hierarchy with one property overridden, used to
    /// derive a [`Node::Hole`]'s observable type from its prototype's type
    /// (invariant I5: same name/hierarchy, `color` overridden to the
    /// pattern role).
    #[must_use]
    pub fn with_property_override(&self, key: &str, value: &str) -> Self {
        let mut properties = (*self.properties).clone();
        properties.insert(Rc::from(key), Rc::from(value));
        Self {
            name: Rc::clone(&self.name),
            child_descriptors: Rc::clone(&self.child_descriptors),
            hierarchy: Rc::clone(&self.hierarchy),
            properties: Rc::new(properties),
        }
    }

    #[must_use]
    pub fn builder(&self) -> Builder {
        Builder::new(self.clone())
    }
}

/// Maps a type name to a [`Builder`]. The core consumes a factory only
/// through [`Factory::get_builder`]; deserializers and the transformer are
/// the intended callers.
pub trait Factory {
    fn get_builder(&self, type_name: &str) -> Option<Builder>;
}

/// A factory that always succeeds, deriving a draft [`Type`] from whatever
/// name it's asked for. Used for generic draft trees (the tree-text parser).
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyFactory;

impl Factory for EmptyFactory {
    fn get_builder(&self, type_name: &str) -> Option<Builder> {
        Some(Builder::new(Type::draft(type_name)))
    }
}

/// A factory backed by an explicit name-to-type registry, the shape a
/// language binding or a test harness would use to give the transformer
/// real arity contracts to validate against.
#[derive(Debug, Default, Clone)]
pub struct MapFactory {
    types: RapidMap<Rc<str>, Type>,
}

impl MapFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: thread_ast_utils::get_map(),
        }
    }

    pub fn register(&mut self, ty: Type) -> &mut Self {
        self.types.insert(Rc::from(ty.name()), ty);
        self
    }
}

impl Factory for MapFactory {
    fn get_builder(&self, type_name: &str) -> Option<Builder> {
        self.types.get(type_name).cloned().map(Builder::new)
    }
}

/// A stateful, validating constructor for [`Node::Plain`] nodes.
///
/// `set_data`/`set_children_list` signal a recoverable "does not fit" by
/// returning `false`; [`Builder::create_node`] on a builder that is not
/// [`Builder::is_valid`] is a programmer-contract violation and raises.
#[derive(Debug, Clone)]
pub struct Builder {
    ty: Type,
    data: String,
    children: Vec<NodeRef>,
    fragment: Option<Fragment>,
    valid: bool,
}

impl Builder {
    #[must_use]
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            data: String::new(),
            children: Vec::new(),
            fragment: None,
            valid: true,
        }
    }

    pub fn set_fragment(&mut self, fragment: Fragment) -> &mut Self {
        self.fragment = Some(fragment);
        self
    }

    /// Always accepts: this crate's `Type` places no constraint on `data`
    /// beyond "may be empty". Kept as a fallible method to match the source
    /// contract and leave room for a future type-specific validator.
    pub fn set_data(&mut self, data: impl Into<String>) -> bool {
        self.data = data.into();
        true
    }

    /// Rejects a children list whose length falls outside
    /// `[required_child_count, child_descriptors.len()]`, unless the type
    /// carries no arity contract at all (draft types accept any length).
    pub fn set_children_list(&mut self, children: Vec<NodeRef>) -> bool {
        if self.ty.has_arity_contract() {
            let required = self.ty.required_child_count();
            let max = self.ty.child_descriptors().len();
            if children.len() < required || children.len() > max {
                self.valid = false;
                return false;
            }
        }
        self.children = children;
        true
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Builds the node, or returns [`CoreError::InvalidBuilder`] if this
    /// builder was rejected by an earlier `set_*` call. Constructing from an
    /// invalid builder is a programmer error, not a recoverable failure.
    pub fn create_node(&self) -> Result<NodeRef, CoreError> {
        if !self.valid {
            return Err(CoreError::InvalidBuilder {
                type_name: self.ty.name().to_string(),
            });
        }
        Ok(Rc::new(Node::Plain(PlainNode {
            ty: self.ty.clone(),
            data: self.data.clone(),
            children: self.children.clone(),
            fragment: self.fragment.clone(),
        })))
    }
}

/// A user-provided domain node: a type, a data payload, and ordered children.
#[derive(Debug, Clone)]
pub struct PlainNode {
    pub ty: Type,
    pub data: String,
    pub children: Vec<NodeRef>,
    pub fragment: Option<Fragment>,
}

/// The three edit-action markers. Each has a fixed, variant-specific child
/// arity (§3's arity table) distinct from the generic "absent child returns
/// `None`" contract the rest of the model follows.
#[derive(Debug, Clone)]
pub enum ActionKind {
    Insert(NodeRef),
    Replace(NodeRef, NodeRef),
    Delete(NodeRef),
}

impl ActionKind {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "Insert",
            Self::Replace(..) => "Replace",
            Self::Delete(_) => "Delete",
        }
    }

    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Insert(_) => "green",
            Self::Replace(..) => "yellow",
            Self::Delete(_) => "red",
        }
    }

    #[must_use]
    pub const fn arity(&self) -> usize {
        match self {
            Self::Insert(_) | Self::Delete(_) => 1,
            Self::Replace(..) => 2,
        }
    }

    /// Fixed-arity child access. Out-of-bounds indexing here is the
    /// programmer-contract violation spec.md §7 calls out ("asking an action
    /// for a child beyond its fixed arity"); the generic [`Node::get_child`]
    /// never raises.
    pub fn child_at(&self, index: usize) -> Result<NodeRef, CoreError> {
        let slot = match (self, index) {
            (Self::Insert(n) | Self::Delete(n), 0) => Some(n),
            (Self::Replace(b, _), 0) => Some(b),
            (Self::Replace(_, a), 1) => Some(a),
            _ => None,
        };
        slot.cloned().ok_or(CoreError::ActionChildOutOfBounds {
            kind: self.kind_name(),
            index,
            arity: self.arity(),
        })
    }

    #[must_use]
    pub fn before(&self) -> Option<NodeRef> {
        match self {
            Self::Insert(_) => None,
            Self::Replace(b, _) => Some(Rc::clone(b)),
            Self::Delete(n) => Some(Rc::clone(n)),
        }
    }

    #[must_use]
    pub fn after(&self) -> Option<NodeRef> {
        match self {
            Self::Insert(n) => Some(Rc::clone(n)),
            Self::Replace(_, a) => Some(Rc::clone(a)),
            Self::Delete(_) => None,
        }
    }
}

/// A pattern placeholder. Matches any subject node whose type is compatible
/// with `prototype`'s; all holes sharing the same `number` within one
/// pattern must unify to structurally equal subject data.
#[derive(Debug, Clone)]
pub struct HoleNode {
    pub prototype: NodeRef,
    pub number: u32,
}

/// One child slot of a [`DiffNode`]: either an unchanged sub-tree (itself
/// wrapped as a `Node::Diff`) or an action marker.
pub type DiffItem = NodeRef;

/// The diff-tree overlay (§4.5): a prototype node plus an ordered list of
/// diff-tree items, each a nested `Node::Diff` or a `Node::Action`/`Node::Hole`.
/// `items.len()` may exceed `prototype`'s child count (insertions add slots
/// the prototype never had).
#[derive(Debug, Clone)]
pub struct DiffNode {
    pub prototype: NodeRef,
    pub items: Vec<DiffItem>,
}

/// The polymorphic node every algorithm in this crate operates on.
#[derive(Debug, Clone)]
pub enum Node {
    Plain(PlainNode),
    Action(ActionKind),
    Hole(HoleNode),
    Diff(DiffNode),
}

const DUMMY_TYPE_NAME: &str = "::dummy::";

impl Node {
    /// The distinguished failure sentinel for parse failures (§7) and failed
    /// transformer rebuilds (§4.7). Distinct from the per-slot "absent
    /// child" `None` that `get_child` returns.
    #[must_use]
    pub fn dummy() -> NodeRef {
        Rc::new(Self::Plain(PlainNode {
            ty: Type::draft(DUMMY_TYPE_NAME),
            data: String::new(),
            children: Vec::new(),
            fragment: None,
        }))
    }

    #[must_use]
    pub fn is_dummy(&self) -> bool {
        self.node_type().name() == DUMMY_TYPE_NAME
    }

    #[must_use]
    pub fn plain(
        ty: Type,
        data: impl Into<String>,
        children: Vec<NodeRef>,
        fragment: Option<Fragment>,
    ) -> NodeRef {
        Rc::new(Self::Plain(PlainNode {
            ty,
            data: data.into(),
            children,
            fragment,
        }))
    }

    #[must_use]
    pub fn leaf(type_name: impl Into<Rc<str>>, data: impl Into<String>) -> NodeRef {
        Self::plain(Type::draft(type_name), data, Vec::new(), None)
    }

    #[must_use]
    pub fn insert(new_node: NodeRef) -> NodeRef {
        Rc::new(Self::Action(ActionKind::Insert(new_node)))
    }

    #[must_use]
    pub fn replace(before: NodeRef, after: NodeRef) -> NodeRef {
        Rc::new(Self::Action(ActionKind::Replace(before, after)))
    }

    #[must_use]
    pub fn delete(target: NodeRef) -> NodeRef {
        Rc::new(Self::Action(ActionKind::Delete(target)))
    }

    #[must_use]
    pub fn hole(prototype: NodeRef, number: u32) -> NodeRef {
        Rc::new(Self::Hole(HoleNode { prototype, number }))
    }

    #[must_use]
    pub fn as_action(&self) -> Option<&ActionKind> {
        match self {
            Self::Action(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_hole(&self) -> Option<&HoleNode> {
        match self {
            Self::Hole(h) => Some(h),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_diff(&self) -> Option<&DiffNode> {
        match self {
            Self::Diff(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_plain(&self) -> Option<&PlainNode> {
        match self {
            Self::Plain(p) => Some(p),
            _ => None,
        }
    }

    /// The node's observable type. Actions get a reserved type named after
    /// their kind; holes derive their type from their prototype with
    /// `color` overridden to the pattern role (I5).
    #[must_use]
    pub fn node_type(&self) -> Type {
        match self {
            Self::Plain(p) => p.ty.clone(),
            Self::Action(a) => Type::reserved(
                match a {
                    ActionKind::Insert(_) => "Insert",
                    ActionKind::Replace(..) => "Replace",
                    ActionKind::Delete(_) => "Delete",
                },
                a.color(),
            ),
            Self::Hole(h) => h
                .prototype
                .node_type()
                .with_property_override("color", "hole"),
            Self::Diff(d) => d.prototype.node_type(),
        }
    }

    #[must_use]
    pub fn data(&self) -> &str {
        match self {
            Self::Plain(p) => &p.data,
            Self::Action(_) | Self::Hole(_) => "",
            Self::Diff(d) => d.prototype.data(),
        }
    }

    #[must_use]
    pub fn fragment(&self) -> Option<&Fragment> {
        match self {
            Self::Plain(p) => p.fragment.as_ref(),
            Self::Diff(d) => d.prototype.fragment(),
            Self::Action(_) | Self::Hole(_) => None,
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        match self {
            Self::Plain(p) => p.children.len(),
            Self::Action(a) => a.arity(),
            Self::Hole(_) => 0,
            Self::Diff(d) => d.items.len(),
        }
    }

    /// Never raises (I1): a request past the end simply returns `None`.
    #[must_use]
    pub fn get_child(&self, index: usize) -> Option<NodeRef> {
        match self {
            Self::Plain(p) => p.children.get(index).cloned(),
            Self::Action(a) => a.child_at(index).ok(),
            Self::Hole(_) => None,
            Self::Diff(d) => d.items.get(index).cloned(),
        }
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef> + '_ {
        (0..self.child_count()).filter_map(move |i| self.get_child(i))
    }

    /// The union of this type's properties with any node-local override
    /// (actions override `color`; holes override `color` to the pattern
    /// role via [`Node::node_type`]).
    #[must_use]
    pub fn properties(&self) -> Properties {
        (*self.node_type().properties()).clone()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }

    /// Pointer identity, used by hash memoization and the diff-tree
    /// builder's prototype index (§9: "a cache keyed by node identity
    /// (pointer or numeric id)").
    #[must_use]
    pub fn identity(node: &NodeRef) -> usize {
        Rc::as_ptr(node) as usize
    }
}

/// Full structural equality: same type name, same data, same children in
/// order, each deeply equal. Ignores overlay-ness — a `Node::Diff` and the
/// `Node::Plain` it wraps compare equal if their observable type/data/
/// children do.
#[must_use]
pub fn deep_compare(a: &NodeRef, b: &NodeRef) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    if a.node_type().name() != b.node_type().name() || a.data() != b.data() {
        return false;
    }
    let (ac, bc) = (a.child_count(), b.child_count());
    if ac != bc {
        return false;
    }
    (0..ac).all(|i| match (a.get_child(i), b.get_child(i)) {
        (Some(x), Some(y)) => deep_compare(&x, &y),
        (None, None) => true,
        _ => false,
    })
}

/// Identity comparison: the same shared node, not merely structurally equal.
#[must_use]
pub fn identity_compare(a: &NodeRef, b: &NodeRef) -> bool {
    Rc::ptr_eq(a, b)
}

#[cfg(test)]
mod test {
    use super::*;

    fn leaf(name: &str, data: &str) -> NodeRef {
        Node::leaf(name, data)
    }

    #[test]
    fn builder_rejects_bad_arity() {
        let ty = Type::new(
            "Binary",
            [ChildDescriptor::required("left"), ChildDescriptor::required("right")],
            [],
            thread_ast_utils::get_map(),
        );
        let mut builder = ty.builder();
        assert!(builder.set_data(""));
        assert!(!builder.set_children_list(vec![leaf("A", "")]));
        assert!(!builder.is_valid());
        assert!(builder.create_node().is_err());
    }

    #[test]
    fn builder_accepts_optional_trailing_child() {
        let ty = Type::new(
            "Call",
            [ChildDescriptor::required("callee"), ChildDescriptor::optional("arg")],
            [],
            thread_ast_utils::get_map(),
        );
        let mut builder = ty.builder();
        assert!(builder.set_children_list(vec![leaf("Id", "f")]));
        assert!(builder.is_valid());
        let node = builder.create_node().unwrap();
        assert_eq!(node.child_count(), 1);
    }

    #[test]
    fn get_child_never_panics_out_of_bounds() {
        let node = leaf("X", "");
        assert!(node.get_child(5).is_none());
    }

    #[test]
    fn action_child_at_out_of_bounds_raises() {
        let ins = ActionKind::Insert(leaf("A", ""));
        assert!(ins.child_at(0).is_ok());
        assert!(ins.child_at(1).is_err());
    }

    #[test]
    fn deep_compare_structural() {
        let a = Node::plain(Type::draft("X"), "", vec![leaf("A", ""), leaf("B", "")], None);
        let b = Node::plain(Type::draft("X"), "", vec![leaf("A", ""), leaf("B", "")], None);
        assert!(deep_compare(&a, &b));
        assert!(!identity_compare(&a, &b));
        let c = Node::plain(Type::draft("X"), "", vec![leaf("A", ""), leaf("C", "")], None);
        assert!(!deep_compare(&a, &c));
    }

    #[test]
    fn hole_type_overrides_color_keeps_name() {
        let prototype = leaf("IntLit", "1");
        let hole = Node::hole(Rc::clone(&prototype), 1);
        assert_eq!(hole.node_type().name(), "IntLit");
        assert_eq!(hole.node_type().property("color"), Some("hole"));
    }

    #[test]
    fn dummy_is_recognizable() {
        let dummy = Node::dummy();
        assert!(dummy.is_dummy());
        assert!(!leaf("X", "").is_dummy());
    }
}

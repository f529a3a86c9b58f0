//! Field-component tree.
//!
//! Nodes live in an arena (`ViewTree::slots`) and refer to each other by
//! [`NodeId`]. Children lists are the only ownership edges; `parent` links are
//! kept for upward traversal and never used to decide lifetime.
//!
//! ```text
//! roots: [n0, n3]
//!          │    └─ n3 (textbox, field "age")
//!          └─ n0 (container)
//!               ├─ n1 (label)
//!               └─ n2 (textbox, field "name")
//!
//! pre-order: n0 n1 n2 n3
//! ```
//!
//! Removing a node tombstones its slot (and its subtree's) so ids are never
//! reused within one tree.

use serde_json::{Map, Value};

/// Index of a node in its [`ViewTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags::bitflags! {
    /// What a node can do. Replaces runtime type inspection of view classes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// The node edits one data-object field (a form item).
        const FIELD_BINDABLE = 1 << 0;
        /// The node may own child nodes.
        const CONTAINER      = 1 << 1;
    }
}

/// Layout position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// A detached node, as produced by a component kind, before insertion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeTemplate {
    pub kind: String,
    pub capabilities: Capabilities,
    pub field_id: Option<String>,
    pub position: Position,
    pub settings: Map<String, Value>,
}

impl NodeTemplate {
    pub fn new(kind: impl Into<String>, capabilities: Capabilities) -> Self {
        NodeTemplate { kind: kind.into(), capabilities, ..Default::default() }
    }
}

/// A live node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub id: NodeId,
    /// View key, e.g. `"mobile-textbox"`.
    pub kind: String,
    pub capabilities: Capabilities,
    /// Data-object field this node is bound to.
    pub field_id: Option<String>,
    pub position: Position,
    pub settings: Map<String, Value>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ViewNode {
    pub fn is_field(&self) -> bool {
        self.capabilities.contains(Capabilities::FIELD_BINDABLE)
    }

    pub fn is_container(&self) -> bool {
        self.capabilities.contains(Capabilities::CONTAINER)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Ordered, arena-backed tree of view nodes.
#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    slots: Vec<Option<ViewNode>>,
    roots: Vec<NodeId>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level children, in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&ViewNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ViewNode> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Append `template` as the last child of `parent` (or as a root).
    ///
    /// Returns `None` when `parent` is gone or is not a container.
    pub fn insert(&mut self, parent: Option<NodeId>, template: NodeTemplate) -> Option<NodeId> {
        if let Some(parent_id) = parent {
            if !self.get(parent_id)?.is_container() {
                return None;
            }
        }

        let id = NodeId(self.slots.len());
        self.slots.push(Some(ViewNode {
            id,
            kind: template.kind,
            capabilities: template.capabilities,
            field_id: template.field_id,
            position: template.position,
            settings: template.settings,
            parent,
            children: Vec::new(),
        }));

        match parent {
            Some(parent_id) => self.get_mut(parent_id)?.children.push(id),
            None => self.roots.push(id),
        }
        Some(id)
    }

    /// Remove `id` and its whole subtree. Returns false if it was not live.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.get(id).map(|n| n.parent) else {
            return false;
        };

        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.get_mut(parent_id) {
                    parent.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.slots.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        true
    }

    /// Ids from the parent of `id` up to its root, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.get(parent).and_then(|n| n.parent);
        }
        out
    }

    /// Depth-first, pre-order walk over every live node.
    ///
    /// Uses an explicit stack (children pushed in reverse) so deep trees do
    /// not recurse; ids whose slot was removed are skipped.
    pub fn walk(&self) -> Vec<&ViewNode> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            out.push(node);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Pre-order walk keeping the nodes `filter` accepts.
    pub fn find<F>(&self, mut filter: F) -> Vec<&ViewNode>
    where
        F: FnMut(&ViewNode) -> bool,
    {
        self.walk().into_iter().filter(|n| filter(*n)).collect()
    }

    /// Field-bound nodes editing `field_id`, in pre-order.
    pub fn nodes_for_field(&self, field_id: &str) -> Vec<NodeId> {
        self.find(|n| n.is_field() && n.field_id.as_deref() == Some(field_id)).into_iter().map(|n| n.id).collect()
    }
}

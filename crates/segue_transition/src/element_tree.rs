//! Element reference tree
//!
//! Mirrors the parent/child structure of every tracked element (scopes and
//! leaves, live or animating out) so each sprite can find the animators
//! above it. Nodes live in a generational arena; grafting a subtree onto a
//! new parent is an index rewrite.
//!
//! Detached nodes keep their place in the tree while they animate out even
//! though their element has left the host tree. Cleanup prunes them once
//! they are done and grafts still-animating ones onto the nearest live
//! ancestor.

use std::fmt::Write as _;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use segue_core::{ElementId, ElementProvider};

use crate::registration::{NodeId, ParticipantId};

/// One tracked element
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub element: ElementId,
    pub participant: ParticipantId,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl TreeNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Forest of tracked elements
#[derive(Debug, Default)]
pub struct ElementTree {
    nodes: SlotMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&TreeNode> {
        self.nodes.get(node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `node` is a root or hangs under another node
    pub fn is_attached(&self, node: NodeId) -> bool {
        match self.nodes.get(node) {
            Some(n) => n.parent.is_some() || self.roots.contains(&node),
            None => false,
        }
    }

    /// Create a node that is not yet part of the tree
    pub fn create_node(&mut self, element: ElementId, participant: ParticipantId) -> NodeId {
        self.nodes.insert(TreeNode {
            element,
            participant,
            parent: None,
            children: SmallVec::new(),
        })
    }

    /// Attach a detached node under `parent`, or as a root
    pub fn attach(&mut self, node: NodeId, parent: Option<NodeId>) {
        if !self.nodes.contains_key(node) {
            return;
        }
        match parent.filter(|p| self.nodes.contains_key(*p)) {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.push(node);
                }
                if let Some(n) = self.nodes.get_mut(node) {
                    n.parent = Some(parent);
                }
            }
            None => self.roots.push(node),
        }
    }

    /// Unlink `node` from its parent (or the root list), keeping its subtree
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(node).map(|n| n.parent.take()) else {
            return;
        };
        match parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(parent) {
                    p.children.retain(|child| *child != node);
                }
            }
            None => self.roots.retain(|root| *root != node),
        }
    }

    /// Move `node` with its subtree under `new_parent`
    pub fn graft(&mut self, node: NodeId, new_parent: NodeId) {
        self.detach(node);
        self.attach(node, Some(new_parent));
    }

    /// Delete a single node, handing its children to its parent
    pub fn remove_node(&mut self, node: NodeId) {
        let parent = self.parent(node);
        let children: SmallVec<[NodeId; 4]> = self.children(node).into();
        self.detach(node);
        for child in children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = None;
            }
            self.attach(child, parent);
        }
        self.nodes.remove(node);
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Depth-first order over every attached node, parents before children
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        order
    }

    /// Attach freshly created nodes in document order
    ///
    /// Each node goes under the nearest tracked ancestor of its element,
    /// or becomes a root. Existing roots that now have a tracked ancestor
    /// are adopted by it.
    pub fn insert_nodes(&mut self, nodes: Vec<NodeId>, provider: &dyn ElementProvider) {
        let mut pending: Vec<(usize, NodeId)> = nodes
            .into_iter()
            .filter_map(|node| {
                self.nodes
                    .get(node)
                    .map(|n| (provider.depth(n.element), node))
            })
            .collect();
        pending.sort_by_key(|(depth, _)| *depth);

        let mut index: FxHashMap<ElementId, NodeId> = self
            .walk()
            .into_iter()
            .filter_map(|node| self.nodes.get(node).map(|n| (n.element, node)))
            .collect();

        let inserted: FxHashSet<NodeId> = pending.iter().map(|(_, node)| *node).collect();
        for (_, node) in pending {
            let Some(element) = self.nodes.get(node).map(|n| n.element) else {
                continue;
            };
            let parent = nearest_tracked_ancestor(element, &index, provider);
            self.attach(node, parent);
            index.insert(element, node);
        }

        let orphans: Vec<NodeId> = self
            .roots
            .iter()
            .copied()
            .filter(|root| !inserted.contains(root))
            .collect();
        for root in orphans {
            let Some(element) = self.nodes.get(root).map(|n| n.element) else {
                continue;
            };
            if let Some(parent) = nearest_tracked_ancestor(element, &index, provider) {
                if !self.is_ancestor_or_self(root, parent) {
                    self.graft(root, parent);
                }
            }
        }
    }

    /// Drop every node that is no longer reachable from a root
    pub fn prune_unreachable(&mut self) -> FxHashSet<NodeId> {
        let reachable: FxHashSet<NodeId> = self.walk().into_iter().collect();
        let removed: FxHashSet<NodeId> = self
            .nodes
            .keys()
            .filter(|node| !reachable.contains(node))
            .collect();
        for node in &removed {
            self.nodes.remove(*node);
        }
        removed
    }

    /// Render the forest as an indented outline
    pub fn format(&self, label: impl Fn(NodeId, &TreeNode) -> String) -> String {
        let mut out = String::new();
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().rev().map(|r| (*r, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            let Some(n) = self.nodes.get(node) else {
                continue;
            };
            let _ = writeln!(out, "{}- {}", "  ".repeat(depth), label(node, n));
            stack.extend(n.children.iter().rev().map(|child| (*child, depth + 1)));
        }
        out
    }
}

fn nearest_tracked_ancestor(
    element: ElementId,
    index: &FxHashMap<ElementId, NodeId>,
    provider: &dyn ElementProvider,
) -> Option<NodeId> {
    let mut cursor = provider.parent(element);
    while let Some(ancestor) = cursor {
        if let Some(node) = index.get(&ancestor) {
            return Some(*node);
        }
        cursor = provider.parent(ancestor);
    }
    None
}

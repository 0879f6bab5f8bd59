//! Prefix tree over colon-delimited keys
//!
//! Nodes live in a flat arena and refer to each other by index. A node's label
//! is the full prefix it stands for, so `user:42:profile` sits under
//! `user:42`, which sits under `user`. A leaf's label is therefore its key.

use indexmap::IndexMap;
use keylens_core::{KEY_DELIMITER, ROOT_LABEL};
use serde::{Deserialize, Serialize};

/// Index of a node in its tree's arena
pub type NodeId = usize;

/// One prefix in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub label: String,
    /// Edges from the root; the root is at depth 0
    pub depth: usize,
    /// Children keyed by label, in first-insertion order
    pub children: IndexMap<String, NodeId>,
}

impl TreeNode {
    fn new(label: String, depth: usize) -> Self {
        Self {
            label,
            depth,
            children: IndexMap::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed prefix tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixTree {
    nodes: Vec<TreeNode>,
}

impl Default for PrefixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTree {
    /// Id of the root sentinel
    pub const ROOT: NodeId = 0;

    /// An empty tree holding only the root
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new(ROOT_LABEL.to_string(), 0)],
        }
    }

    /// Build a tree from `keys`
    pub fn build<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for key in keys {
            tree.insert(key.as_ref());
        }
        tree
    }

    /// Insert `key` and every prefix above it; returns the key's node
    ///
    /// Only the matching ancestor chain is followed. Inserting a key twice
    /// leaves the tree unchanged.
    pub fn insert(&mut self, key: &str) -> NodeId {
        let mut parent = Self::ROOT;
        let mut label = String::with_capacity(key.len());

        for (i, segment) in key.split(KEY_DELIMITER).enumerate() {
            if i > 0 {
                label.push(KEY_DELIMITER);
            }
            label.push_str(segment);
            parent = self.child_or_insert(parent, &label);
        }
        parent
    }

    fn child_or_insert(&mut self, parent: NodeId, label: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent].children.get(label) {
            return id;
        }
        let id = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(TreeNode::new(label.to_string(), depth));
        self.nodes[parent].children.insert(label.to_string(), id);
        id
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    /// Node count including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the root is present
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Look up a node by its full label
    pub fn find(&self, label: &str) -> Option<NodeId> {
        let mut current = Self::ROOT;
        let mut prefix_end = 0;
        for (i, segment) in label.split(KEY_DELIMITER).enumerate() {
            prefix_end += segment.len() + usize::from(i > 0);
            current = *self.nodes[current].children.get(&label[..prefix_end])?;
        }
        Some(current)
    }

    /// Every leaf below the root, in pre-order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.pre_order()
            .into_iter()
            .filter(|&id| id != Self::ROOT && self.nodes[id].is_leaf())
            .collect()
    }

    /// Node ids with every parent before its children, siblings in order
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.values().rev());
        }
        order
    }

    /// Node ids with every child before its parent; the root comes last
    pub fn post_order(&self) -> Vec<NodeId> {
        // Reversed pre-order with siblings visited last-first
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.values());
        }
        order.reverse();
        order
    }

    /// Render the tree one label per line, indented with `_` per level
    pub fn print_tree(&self) -> String {
        let mut out = String::new();
        for id in self.pre_order() {
            let node = &self.nodes[id];
            out.push_str(&"_".repeat(node.depth.saturating_sub(1) * 2));
            out.push_str(&node.label);
            out.push('\n');
        }
        out
    }
}

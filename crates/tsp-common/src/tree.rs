//! Nested wire form of the period tree.

use serde::{Deserialize, Serialize};

use crate::txmatrix::TxMatrix;

/// Period tree as persisted inside a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTree {
    #[serde(default)]
    pub root: PeriodTreeNode,
}

/// One node of the period tree.
///
/// `max_childs` is the period size at the node's depth; only nodes above the
/// last level materialise that many children. `max_counts` is the number of
/// discretization cycles one pass over the node covers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodTreeNode {
    #[serde(rename = "maxChilds", default)]
    pub max_childs: usize,
    #[serde(rename = "maxCounts", default)]
    pub max_counts: u64,
    #[serde(default)]
    pub children: Vec<PeriodTreeNode>,
    #[serde(rename = "txmatrix", default)]
    pub tx_matrix: Vec<TxMatrix>,
}

impl PeriodTree {
    /// An empty tree shaped by `sizes`, coarsest level first.
    pub fn new(sizes: &[usize]) -> Self {
        Self {
            root: PeriodTreeNode::new(sizes),
        }
    }

    /// Node at `path`, one child index per level below the root.
    pub fn node(&self, path: &[usize]) -> Option<&PeriodTreeNode> {
        path.iter()
            .try_fold(&self.root, |node, &idx| node.children.get(idx))
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut PeriodTreeNode> {
        path.iter()
            .try_fold(&mut self.root, |node, &idx| node.children.get_mut(idx))
    }

    /// Number of levels, root included. An unconfigured tree has none.
    pub fn levels(&self) -> usize {
        if self.root.max_childs == 0 {
            return 0;
        }
        let mut levels = 1;
        let mut node = &self.root;
        while let Some(child) = node.children.first() {
            levels += 1;
            node = child;
        }
        levels
    }
}

impl PeriodTreeNode {
    pub fn new(sizes: &[usize]) -> Self {
        let Some((&size, rest)) = sizes.split_first() else {
            return Self::default();
        };
        let children = if rest.is_empty() {
            Vec::new()
        } else {
            (0..size).map(|_| PeriodTreeNode::new(rest)).collect()
        };
        Self {
            max_childs: size,
            max_counts: sizes.iter().map(|&s| s as u64).product(),
            children,
            tx_matrix: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_counts() {
        let tree = PeriodTree::new(&[2, 4, 4]);
        assert_eq!(tree.root.max_childs, 2);
        assert_eq!(tree.root.max_counts, 32);
        assert_eq!(tree.root.children.len(), 2);

        let mid = tree.node(&[1]).unwrap();
        assert_eq!(mid.max_childs, 4);
        assert_eq!(mid.max_counts, 16);
        assert_eq!(mid.children.len(), 4);

        let leaf = tree.node(&[1, 3]).unwrap();
        assert_eq!(leaf.max_childs, 4);
        assert_eq!(leaf.max_counts, 4);
        assert!(leaf.is_leaf());

        assert_eq!(tree.levels(), 3);
    }

    #[test]
    fn test_node_bounds_checked() {
        let tree = PeriodTree::new(&[2, 4, 4]);
        assert!(tree.node(&[]).is_some());
        assert!(tree.node(&[2]).is_none());
        assert!(tree.node(&[0, 4]).is_none());
        assert!(tree.node(&[0, 0, 0]).is_none());
    }

    #[test]
    fn test_empty_tree() {
        let tree = PeriodTree::new(&[]);
        assert_eq!(tree.levels(), 0);
        assert!(tree.root.is_leaf());
    }

    #[test]
    fn test_wire_shape_parses() {
        let json = r#"{"root": {"maxChilds": 2, "maxCounts": 8, "children": [
            {"maxChilds": 4, "maxCounts": 4, "children": [], "txmatrix": []},
            {"maxChilds": 4, "maxCounts": 4, "children": [], "txmatrix": []}
        ], "txmatrix": []}}"#;
        let tree: PeriodTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree, PeriodTree::new(&[2, 4]));
    }
}

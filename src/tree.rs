//! Tree index over a flat node list.
//!
//! [`Tree`] owns the node list for one version of the checklist together with
//! the lookup structures derived from it. It is rebuilt whenever the node list
//! is replaced (import, reset, load) and never mutated in place.
//!
//! All walks are iterative so deeply nested imports cannot exhaust the stack.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::Node;

/// Structural problems found in a node list that did not come from the parser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("node {id} references missing parent {parent_id}")]
    MissingParent { id: String, parent_id: String },

    #[error("parent chain of node {0} does not terminate")]
    Cycle(String),
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    positions: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,
    roots: Vec<usize>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        let mut positions = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();

        for (i, node) in nodes.iter().enumerate() {
            positions.entry(node.id.clone()).or_insert(i);
            match &node.parent_id {
                Some(parent_id) => children.entry(parent_id.clone()).or_default().push(i),
                None => roots.push(i),
            }
        }

        Self {
            nodes,
            positions,
            children,
            roots,
        }
    }

    /// Check that a node list forms a forest: unique ids, resolvable parents
    /// and no parent cycles.
    pub fn validate(nodes: &[Node]) -> Result<(), TreeError> {
        let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if parents
                .insert(node.id.as_str(), node.parent_id.as_deref())
                .is_some()
            {
                return Err(TreeError::DuplicateId(node.id.clone()));
            }
        }

        for node in nodes {
            let mut current = node.parent_id.as_deref();
            let mut hops = 0usize;
            while let Some(parent_id) = current {
                let Some(next) = parents.get(parent_id) else {
                    return Err(TreeError::MissingParent {
                        id: node.id.clone(),
                        parent_id: parent_id.to_string(),
                    });
                };
                hops += 1;
                if hops > nodes.len() {
                    return Err(TreeError::Cycle(node.id.clone()));
                }
                current = *next;
            }
        }

        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.positions.get(id).map(|&i| &self.nodes[i])
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Nodes without a parent, in document order.
    pub fn root_groups(&self) -> impl Iterator<Item = &Node> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    /// Direct children of `id` in document order.
    pub fn children(&self, id: &str) -> impl Iterator<Item = &Node> {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|&i| &self.nodes[i])
    }

    /// Whether `id` has at least one child. This, not `parent_id == None`,
    /// decides whether a node renders as a group.
    pub fn is_group(&self, id: &str) -> bool {
        self.children.get(id).is_some_and(|kids| !kids.is_empty())
    }

    pub fn ids_with_children(&self) -> HashSet<&str> {
        self.children
            .iter()
            .filter(|(id, kids)| !kids.is_empty() && self.contains(id))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn parent(&self, id: &str) -> Option<&Node> {
        self.node(id)?.parent_id.as_deref().and_then(|p| self.node(p))
    }

    /// Ancestors of `id` from the direct parent up to the root.
    pub fn ancestors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Node> + 'a {
        let mut current = self.node(id).and_then(|n| n.parent_id.as_deref());
        let mut budget = self.nodes.len();
        std::iter::from_fn(move || {
            if budget == 0 {
                return None;
            }
            budget -= 1;
            let node = self.node(current?)?;
            current = node.parent_id.as_deref();
            Some(node)
        })
    }

    pub fn depth(&self, id: &str) -> usize {
        self.ancestors(id).count()
    }

    /// All transitive descendants of `id`, excluding `id` itself.
    pub fn descendants<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Node> + 'a {
        let mut stack: Vec<usize> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        if let Some(kids) = self.children.get(id) {
            stack.extend(kids.iter().rev());
        }
        if let Some(&start) = self.positions.get(id) {
            seen.insert(start);
        }
        std::iter::from_fn(move || loop {
            let i = stack.pop()?;
            if !seen.insert(i) {
                continue;
            }
            if let Some(kids) = self.children.get(&self.nodes[i].id) {
                stack.extend(kids.iter().rev());
            }
            return Some(&self.nodes[i]);
        })
    }

    /// `id` followed by all of its descendants in depth-first document order.
    pub fn subtree_ids(&self, id: &str) -> Vec<&str> {
        let Some(root) = self.node(id) else {
            return Vec::new();
        };
        std::iter::once(root)
            .chain(self.descendants(id))
            .map(|n| n.id.as_str())
            .collect()
    }

    /// Depth-first walk over the whole forest in document order, yielding each
    /// node with its depth.
    pub fn walk(&self) -> Vec<(&Node, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&i| (i, 0)).collect();
        let mut seen: HashSet<usize> = HashSet::new();
        while let Some((i, depth)) = stack.pop() {
            if !seen.insert(i) {
                continue;
            }
            let node = &self.nodes[i];
            out.push((node, depth));
            if let Some(kids) = self.children.get(&node.id) {
                stack.extend(kids.iter().rev().map(|&k| (k, depth + 1)));
            }
        }
        out
    }
}

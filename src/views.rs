//! Visibility and counts for the three checklist views.
//!
//! - To pack: a node is visible when it and every ancestor are `ToPack`.
//! - Packed / Not needed: a node is visible when its own status matches, or
//!   when it is a group with at least one descendant (any depth) that matches.
//!
//! A group with mixed descendants shows up in several views at once but never
//! twice in the same view. Entries come out in depth-first document order.

use std::collections::HashSet;

use crate::models::{Counts, Node, Status, View, ViewEntry};
use crate::state::StateStore;
use crate::tree::Tree;

/// Per-node visibility predicate, evaluated directly against the tree.
pub fn is_visible(tree: &Tree, states: &StateStore, view: View, id: &str) -> bool {
    if !tree.contains(id) {
        return false;
    }
    match view {
        View::ToPack => {
            states.get(id) == Status::ToPack
                && tree
                    .ancestors(id)
                    .all(|a| states.get(&a.id) == Status::ToPack)
        }
        View::Packed | View::NotNeeded => {
            let status = view.status();
            states.get(id) == status
                || (tree.is_group(id) && states.any_descendant_with(tree, id, status))
        }
    }
}

/// Ids of every node that has at least one descendant with `status`.
///
/// Built bottom-up from the matching nodes, stopping at the first ancestor
/// already collected, so the whole pass is linear in the node count.
fn ids_with_descendant(tree: &Tree, states: &StateStore, status: Status) -> HashSet<String> {
    let mut marked = HashSet::new();
    for node in tree.nodes() {
        if states.get(&node.id) != status {
            continue;
        }
        for ancestor in tree.ancestors(&node.id) {
            if !marked.insert(ancestor.id.clone()) {
                break;
            }
        }
    }
    marked
}

/// Precomputed visibility for one view.
struct Visibility<'a> {
    tree: &'a Tree,
    states: &'a StateStore,
    view: View,
    with_match: HashSet<String>,
    with_default: HashSet<String>,
}

impl<'a> Visibility<'a> {
    fn new(tree: &'a Tree, states: &'a StateStore, view: View) -> Self {
        let (with_match, with_default) = match view {
            View::ToPack => (HashSet::new(), HashSet::new()),
            View::Packed | View::NotNeeded => (
                ids_with_descendant(tree, states, view.status()),
                ids_with_descendant(tree, states, Status::ToPack),
            ),
        };
        Self {
            tree,
            states,
            view,
            with_match,
            with_default,
        }
    }

    /// Status-view check for one node. To-pack visibility is decided while
    /// walking, since a hidden ancestor prunes the whole subtree.
    fn status_visible(&self, node: &Node) -> bool {
        self.states.get(&node.id) == self.view.status() || self.with_match.contains(&node.id)
    }

    fn can_restore(&self, node: &Node, is_group: bool) -> bool {
        match self.view {
            View::ToPack => false,
            _ if !is_group => true,
            _ => {
                self.states.get(&node.id) == self.view.status()
                    && !self.with_default.contains(&node.id)
            }
        }
    }

    fn entries(&self) -> Vec<ViewEntry> {
        let mut out = Vec::new();
        // Depth of the shallowest hidden ancestor on the current path.
        let mut hidden_below: Option<usize> = None;

        for (node, depth) in self.tree.walk() {
            if let Some(limit) = hidden_below {
                if depth > limit {
                    continue;
                }
                hidden_below = None;
            }

            let visible = match self.view {
                View::ToPack => self.states.get(&node.id) == Status::ToPack,
                _ => self.status_visible(node),
            };
            if !visible {
                hidden_below = Some(depth);
                continue;
            }

            let is_group = self.tree.is_group(&node.id);
            out.push(ViewEntry {
                id: node.id.clone(),
                name: node.name.clone(),
                depth,
                is_group,
                status: self.states.get(&node.id),
                can_restore: self.can_restore(node, is_group),
            });
        }

        out
    }
}

/// Render-ready entries for `view`.
pub fn entries(tree: &Tree, states: &StateStore, view: View) -> Vec<ViewEntry> {
    Visibility::new(tree, states, view).entries()
}

/// Number of nodes, groups and items alike, visible in `view`.
pub fn count(tree: &Tree, states: &StateStore, view: View) -> usize {
    match view {
        View::ToPack => tree
            .nodes()
            .iter()
            .filter(|n| is_visible(tree, states, View::ToPack, &n.id))
            .count(),
        View::Packed | View::NotNeeded => {
            let visibility = Visibility::new(tree, states, view);
            tree.nodes()
                .iter()
                .filter(|n| visibility.status_visible(n))
                .count()
        }
    }
}

pub fn counts(tree: &Tree, states: &StateStore) -> Counts {
    Counts {
        to_pack: count(tree, states, View::ToPack),
        packed: count(tree, states, View::Packed),
        not_needed: count(tree, states, View::NotNeeded),
    }
}

//! Per-node status map with cascade rules.
//!
//! Statuses are kept apart from the node list: the map is keyed by node id and
//! an absent key reads as [`Status::ToPack`]. Propagation between groups and
//! descendants is applied by the mutation methods here; nothing structural
//! forbids a packed child under a to-pack parent.
//!
//! Every mutation takes the current [`Tree`] and is a no-op for ids the tree
//! does not contain.

use std::collections::HashMap;

use crate::models::Status;
use crate::tree::Tree;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateStore {
    states: HashMap<String, Status>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map with every node of `tree` at `ToPack`.
    pub fn fresh(tree: &Tree) -> Self {
        Self {
            states: tree.ids().map(|id| (id.to_string(), Status::ToPack)).collect(),
        }
    }

    pub fn from_map(states: HashMap<String, Status>) -> Self {
        Self { states }
    }

    pub fn as_map(&self) -> &HashMap<String, Status> {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, id: &str) -> Status {
        self.states.get(id).copied().unwrap_or_default()
    }

    /// Backfill missing ids with `ToPack` and drop ids the tree no longer has.
    /// Returns whether anything changed.
    pub fn reconcile(&mut self, tree: &Tree) -> bool {
        let before = self.states.len();
        self.states.retain(|id, _| tree.contains(id));
        let mut changed = self.states.len() != before;

        for id in tree.ids() {
            if !self.states.contains_key(id) {
                self.states.insert(id.to_string(), Status::ToPack);
                changed = true;
            }
        }

        changed
    }

    /// Point update without cascade.
    pub fn set_status(&mut self, tree: &Tree, id: &str, status: Status) -> bool {
        if !tree.contains(id) {
            return false;
        }
        self.states.insert(id.to_string(), status);
        true
    }

    /// Set `group_id` and every transitive descendant to `status`.
    /// Returns the number of ids written.
    pub fn set_group_status(&mut self, tree: &Tree, group_id: &str, status: Status) -> usize {
        let ids = tree.subtree_ids(group_id);
        for id in &ids {
            self.states.insert((*id).to_string(), status);
        }
        ids.len()
    }

    /// Restore `id` to `ToPack` and pull every non-default ancestor back to
    /// `ToPack` too, so the node becomes visible in the to-pack view.
    pub fn restore(&mut self, tree: &Tree, id: &str) -> bool {
        if !tree.contains(id) {
            return false;
        }
        self.states.insert(id.to_string(), Status::ToPack);
        for ancestor in tree.ancestors(id) {
            if self.get(&ancestor.id) != Status::ToPack {
                self.states.insert(ancestor.id.clone(), Status::ToPack);
            }
        }
        true
    }

    /// Restore only the group node itself. Descendants keep their statuses.
    pub fn restore_group(&mut self, tree: &Tree, id: &str) -> bool {
        if !tree.contains(id) {
            return false;
        }
        self.states.insert(id.to_string(), Status::ToPack);
        true
    }

    /// Whether any transitive descendant of `id` has `status`.
    pub fn any_descendant_with(&self, tree: &Tree, id: &str, status: Status) -> bool {
        tree.descendants(id).any(|n| self.get(&n.id) == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const TEXT: &str = "Clothes\n  Shirts\n    Linen shirt\n    Polo\n  Socks\nToiletries\n  Toothbrush";

    fn setup() -> (Tree, StateStore) {
        let tree = Tree::new(parse(TEXT));
        let states = StateStore::fresh(&tree);
        (tree, states)
    }

    fn id(tree: &Tree, name: &str) -> String {
        tree.nodes()
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.id.clone())
            .unwrap()
    }

    #[test]
    fn test_fresh_covers_every_node() {
        let (tree, states) = setup();
        assert_eq!(states.len(), tree.len());
        assert!(tree.ids().all(|i| states.get(i) == Status::ToPack));
    }

    #[test]
    fn test_absent_reads_as_to_pack() {
        let states = StateStore::new();
        assert_eq!(states.get("n:42"), Status::ToPack);
    }

    #[test]
    fn test_set_status_does_not_cascade() {
        let (tree, mut states) = setup();
        let shirts = id(&tree, "Shirts");
        assert!(states.set_status(&tree, &shirts, Status::Packed));
        assert_eq!(states.get(&shirts), Status::Packed);
        assert_eq!(states.get(&id(&tree, "Polo")), Status::ToPack);
    }

    #[test]
    fn test_group_status_cascades_to_whole_subtree_only() {
        let (tree, mut states) = setup();
        let clothes = id(&tree, "Clothes");
        assert_eq!(states.set_group_status(&tree, &clothes, Status::NotNeeded), 5);

        for name in ["Clothes", "Shirts", "Linen shirt", "Polo", "Socks"] {
            assert_eq!(states.get(&id(&tree, name)), Status::NotNeeded, "{name}");
        }
        assert_eq!(states.get(&id(&tree, "Toiletries")), Status::ToPack);
        assert_eq!(states.get(&id(&tree, "Toothbrush")), Status::ToPack);
    }

    #[test]
    fn test_restore_pulls_ancestors_back() {
        let (tree, mut states) = setup();
        let clothes = id(&tree, "Clothes");
        states.set_group_status(&tree, &clothes, Status::Packed);

        let polo = id(&tree, "Polo");
        assert!(states.restore(&tree, &polo));

        assert_eq!(states.get(&polo), Status::ToPack);
        assert_eq!(states.get(&id(&tree, "Shirts")), Status::ToPack);
        assert_eq!(states.get(&clothes), Status::ToPack);
        assert_eq!(states.get(&id(&tree, "Linen shirt")), Status::Packed);
        assert_eq!(states.get(&id(&tree, "Socks")), Status::Packed);
    }

    #[test]
    fn test_restore_group_is_shallow_and_idempotent() {
        let (tree, mut states) = setup();
        let clothes = id(&tree, "Clothes");
        states.set_group_status(&tree, &clothes, Status::Packed);

        states.restore_group(&tree, &clothes);
        assert_eq!(states.get(&clothes), Status::ToPack);
        assert_eq!(states.get(&id(&tree, "Socks")), Status::Packed);

        let snapshot = states.clone();
        states.restore_group(&tree, &clothes);
        assert_eq!(states, snapshot);
    }

    #[test]
    fn test_unknown_ids_are_no_ops() {
        let (tree, mut states) = setup();
        let snapshot = states.clone();
        assert!(!states.set_status(&tree, "nope", Status::Packed));
        assert_eq!(states.set_group_status(&tree, "nope", Status::Packed), 0);
        assert!(!states.restore(&tree, "nope"));
        assert!(!states.restore_group(&tree, "nope"));
        assert_eq!(states, snapshot);
    }

    #[test]
    fn test_reconcile_backfills_and_prunes() {
        let tree = Tree::new(parse("A\n  B"));
        let mut states = StateStore::from_map(HashMap::from([
            ("n:1".to_string(), Status::Packed),
            ("n:99".to_string(), Status::NotNeeded),
        ]));

        assert!(states.reconcile(&tree));
        assert_eq!(states.len(), 2);
        assert_eq!(states.get("n:1"), Status::Packed);
        assert_eq!(states.get("n:2"), Status::ToPack);
        assert!(!states.as_map().contains_key("n:99"));

        assert!(!states.reconcile(&tree));
    }

    #[test]
    fn test_any_descendant_with() {
        let (tree, mut states) = setup();
        let linen = id(&tree, "Linen shirt");
        states.set_status(&tree, &linen, Status::Packed);
        let clothes = id(&tree, "Clothes");
        assert!(states.any_descendant_with(&tree, &clothes, Status::Packed));
        assert!(!states.any_descendant_with(&tree, &clothes, Status::NotNeeded));
        assert!(!states.any_descendant_with(&tree, &linen, Status::Packed));
    }
}

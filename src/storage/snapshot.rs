//! Snapshot encoding, loading and legacy migration.
//!
//! Current format:
//! - `packman.items.v3`: `[{ "id", "name", "parentId" }, ...]`
//! - `packman.state.v1`: `{ "<id>": null | "packed" | "not-needed" }` (`null` is to pack)
//!
//! Legacy single-level format:
//! - `packman.nodes.v2`: `[{ "id", "name", "category" }, ...]`
//! - `packman.groupState.v1`: `{ "<category>": null | "packed" | "not-needed" }`

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;

use super::{KeyValueStore, StorageError};
use crate::models::{Node, Status};
use crate::parser;
use crate::state::StateStore;
use crate::tree::{Tree, TreeError};

pub const ITEMS_KEY: &str = "packman.items.v3";
pub const STATE_KEY: &str = "packman.state.v1";
pub const LEGACY_NODES_KEY: &str = "packman.nodes.v2";
pub const LEGACY_GROUP_STATE_KEY: &str = "packman.groupState.v1";

/// Every key the product has written, current and legacy.
pub const ALL_KEYS: [&str; 4] = [ITEMS_KEY, STATE_KEY, LEGACY_NODES_KEY, LEGACY_GROUP_STATE_KEY];

/// Root group name for legacy items without a category.
const UNCATEGORIZED: &str = "Other";

/// Why a stored entry was rejected.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tree: {0}")]
    Tree(#[from] TreeError),

    #[error("unknown status {0:?}")]
    UnknownStatus(String),
}

/// Where a loaded snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Read back from the current two-entry format.
    Stored,
    /// Converted from the legacy category format.
    Migrated,
    /// Rebuilt from the bundled default list.
    Default,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: Tree,
    pub states: StateStore,
    pub source: LoadSource,
}

pub fn encode_nodes(nodes: &[Node]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(nodes)?)
}

pub fn encode_states(states: &StateStore) -> Result<String, StorageError> {
    let stored: BTreeMap<&str, Option<&str>> = states
        .as_map()
        .iter()
        .map(|(id, status)| (id.as_str(), status.to_stored()))
        .collect();
    Ok(serde_json::to_string(&stored)?)
}

pub fn decode_nodes(raw: &str) -> Result<Vec<Node>, SnapshotError> {
    let nodes: Vec<Node> = serde_json::from_str(raw)?;
    Tree::validate(&nodes)?;
    Ok(nodes)
}

pub fn decode_states(raw: &str) -> Result<HashMap<String, Status>, SnapshotError> {
    decode_status_map(raw)
}

fn decode_status_map(raw: &str) -> Result<HashMap<String, Status>, SnapshotError> {
    let stored: HashMap<String, Option<String>> = serde_json::from_str(raw)?;
    stored
        .into_iter()
        .map(|(key, value)| {
            Status::from_stored(value.as_deref())
                .map(|status| (key, status))
                .ok_or_else(|| SnapshotError::UnknownStatus(value.unwrap_or_default()))
        })
        .collect()
}

pub fn save_nodes<S: KeyValueStore + ?Sized>(store: &S, nodes: &[Node]) -> Result<(), StorageError> {
    store.set(ITEMS_KEY, &encode_nodes(nodes)?)
}

pub fn save_states<S: KeyValueStore + ?Sized>(
    store: &S,
    states: &StateStore,
) -> Result<(), StorageError> {
    store.set(STATE_KEY, &encode_states(states)?)
}

/// Remove every current and legacy entry.
pub fn clear<S: KeyValueStore + ?Sized>(store: &S) -> Result<(), StorageError> {
    for key in ALL_KEYS {
        store.remove(key)?;
    }
    Ok(())
}

/// Load the checklist from `store`.
///
/// Never fails: unreadable or corrupted entries are discarded and the default
/// list parsed from `default_text` takes their place. Any repair (migration,
/// default rebuild, reconciled state) is written back best-effort.
pub fn load<S: KeyValueStore + ?Sized>(store: &S, default_text: &str) -> Snapshot {
    let raw_items = read(store, ITEMS_KEY);

    let Some(raw_items) = raw_items else {
        if let Some(snapshot) = migrate_legacy(store) {
            return snapshot;
        }
        return rebuild_default(store, default_text);
    };

    let nodes = match decode_nodes(&raw_items) {
        Ok(nodes) => nodes,
        Err(e) => {
            tracing::warn!("Discarding corrupted {}: {}", ITEMS_KEY, e);
            best_effort(store.remove(ITEMS_KEY), "remove corrupted items");
            return rebuild_default(store, default_text);
        }
    };

    let tree = Tree::new(nodes);
    let mut states = match read(store, STATE_KEY).map(|raw| decode_states(&raw)) {
        Some(Ok(map)) => StateStore::from_map(map),
        Some(Err(e)) => {
            tracing::warn!("Discarding corrupted {}: {}", STATE_KEY, e);
            best_effort(store.remove(STATE_KEY), "remove corrupted state");
            StateStore::new()
        }
        None => StateStore::new(),
    };

    if states.reconcile(&tree) {
        best_effort(save_states(store, &states), "save reconciled state");
    }
    drop_stale_legacy(store);

    tracing::debug!(nodes = tree.len(), "Loaded stored checklist");
    Snapshot {
        tree,
        states,
        source: LoadSource::Stored,
    }
}

/// Legacy entries left next to a current list are never migrated again.
fn drop_stale_legacy<S: KeyValueStore + ?Sized>(store: &S) {
    for key in [LEGACY_NODES_KEY, LEGACY_GROUP_STATE_KEY] {
        if read(store, key).is_some() {
            tracing::info!("Removing stale legacy entry {}", key);
            best_effort(store.remove(key), "remove stale legacy entry");
        }
    }
}

fn read<S: KeyValueStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

fn best_effort(result: Result<(), StorageError>, what: &str) {
    if let Err(e) = result {
        tracing::warn!("Storage write failed ({}): {}", what, e);
    }
}

fn rebuild_default<S: KeyValueStore + ?Sized>(store: &S, default_text: &str) -> Snapshot {
    let tree = Tree::new(parser::parse(default_text));
    let states = StateStore::fresh(&tree);
    best_effort(save_nodes(store, tree.nodes()), "save default items");
    best_effort(save_states(store, &states), "save default state");
    tracing::info!(nodes = tree.len(), "Built checklist from default list");
    Snapshot {
        tree,
        states,
        source: LoadSource::Default,
    }
}

#[derive(Debug, Deserialize)]
struct LegacyItem {
    id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
}

/// Convert the legacy category format, write it in the current format and
/// drop the legacy entries. Returns `None` when there is nothing to migrate
/// or the legacy entry is unusable (which is then removed).
fn migrate_legacy<S: KeyValueStore + ?Sized>(store: &S) -> Option<Snapshot> {
    let raw = read(store, LEGACY_NODES_KEY)?;

    let (nodes, group_ids) = match convert_legacy_items(&raw) {
        Ok(converted) => converted,
        Err(e) => {
            tracing::warn!("Discarding unusable {}: {}", LEGACY_NODES_KEY, e);
            best_effort(store.remove(LEGACY_NODES_KEY), "remove legacy items");
            best_effort(store.remove(LEGACY_GROUP_STATE_KEY), "remove legacy group state");
            return None;
        }
    };

    let tree = Tree::new(nodes);
    let mut states = StateStore::new();

    // Item statuses were already keyed by item id, which migration keeps.
    if let Some(raw_state) = read(store, STATE_KEY) {
        match decode_states(&raw_state) {
            Ok(map) => {
                for (id, status) in map {
                    states.set_status(&tree, &id, status);
                }
            }
            Err(e) => tracing::warn!("Ignoring corrupted legacy item state: {}", e),
        }
    }

    if let Some(raw_groups) = read(store, LEGACY_GROUP_STATE_KEY) {
        match decode_status_map(&raw_groups) {
            Ok(map) => {
                for (category, status) in map {
                    if let Some(group_id) = group_ids.get(&category) {
                        states.set_status(&tree, group_id, status);
                    }
                }
            }
            Err(e) => tracing::warn!("Ignoring corrupted legacy group state: {}", e),
        }
    }

    states.reconcile(&tree);

    best_effort(save_nodes(store, tree.nodes()), "save migrated items");
    best_effort(save_states(store, &states), "save migrated state");
    best_effort(store.remove(LEGACY_NODES_KEY), "remove legacy items");
    best_effort(store.remove(LEGACY_GROUP_STATE_KEY), "remove legacy group state");

    tracing::info!(
        nodes = tree.len(),
        groups = group_ids.len(),
        "Migrated legacy category list"
    );
    Some(Snapshot {
        tree,
        states,
        source: LoadSource::Migrated,
    })
}

/// Turn `(item, category)` pairs into root groups followed by their items.
/// Returns the nodes and the minted group id per category name.
fn convert_legacy_items(
    raw: &str,
) -> Result<(Vec<Node>, HashMap<String, String>), SnapshotError> {
    let items: Vec<LegacyItem> = serde_json::from_str(raw)?;
    let taken: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();

    let mut order: Vec<String> = Vec::new();
    let mut by_category: HashMap<String, Vec<&LegacyItem>> = HashMap::new();
    for item in &items {
        let category = item
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        if !by_category.contains_key(&category) {
            order.push(category.clone());
        }
        by_category.entry(category).or_default().push(item);
    }

    let mut nodes = Vec::with_capacity(items.len() + order.len());
    let mut group_ids = HashMap::with_capacity(order.len());
    let mut seq = 0usize;
    for category in order {
        let group_id = loop {
            seq += 1;
            let candidate = format!("g:{}", seq);
            if !taken.contains(candidate.as_str()) {
                break candidate;
            }
        };
        nodes.push(Node::new(group_id.clone(), category.clone(), None));
        for item in by_category.remove(&category).unwrap_or_default() {
            nodes.push(Node::new(
                item.id.clone(),
                item.name.clone(),
                Some(group_id.clone()),
            ));
        }
        group_ids.insert(category, group_id);
    }

    Tree::validate(&nodes)?;
    Ok((nodes, group_ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const DEFAULT: &str = "Documents\n  Passport\n  Tickets\n";

    #[test]
    fn test_empty_store_builds_default_and_persists_it() {
        let store = MemoryStore::new();
        let snapshot = load(&store, DEFAULT);

        assert_eq!(snapshot.source, LoadSource::Default);
        assert_eq!(snapshot.tree.len(), 3);
        assert_eq!(store.keys(), vec![ITEMS_KEY.to_string(), STATE_KEY.to_string()]);
    }

    #[test]
    fn test_states_encode_to_pack_as_null() {
        let tree = Tree::new(parser::parse("A\n  B"));
        let mut states = StateStore::fresh(&tree);
        states.set_status(&tree, "n:2", Status::NotNeeded);
        assert_eq!(
            encode_states(&states).unwrap(),
            r#"{"n:1":null,"n:2":"not-needed"}"#
        );
    }

    #[test]
    fn test_nodes_encode_with_parent_id_key() {
        let nodes = parser::parse("A\n  B");
        assert_eq!(
            encode_nodes(&nodes).unwrap(),
            r#"[{"id":"n:1","name":"A","parentId":null},{"id":"n:2","name":"B","parentId":"n:1"}]"#
        );
    }

    #[test]
    fn test_decode_rejects_dangling_parent() {
        let raw = r#"[{"id":"a","name":"A","parentId":"ghost"}]"#;
        assert!(matches!(decode_nodes(raw), Err(SnapshotError::Tree(_))));
    }

    #[test]
    fn test_decode_requires_parent_id_key() {
        let raw = r#"[{"id":"a","name":"A"}]"#;
        assert!(matches!(decode_nodes(raw), Err(SnapshotError::Json(_))));

        let raw = r#"[{"id":"a","name":"A","parentId":null}]"#;
        assert!(decode_nodes(raw).is_ok());
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let raw = r#"{"a":"lost"}"#;
        assert!(matches!(
            decode_states(raw),
            Err(SnapshotError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_convert_legacy_groups_by_first_appearance() {
        let raw = r#"[
            {"id":"1","name":"Socks","category":"Clothes"},
            {"id":"2","name":"Toothbrush","category":"Toiletries"},
            {"id":"3","name":"Shirt","category":"Clothes"},
            {"id":"4","name":"Book"}
        ]"#;
        let (nodes, groups) = convert_legacy_items(raw).unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Clothes", "Socks", "Shirt", "Toiletries", "Toothbrush", "Other", "Book"]
        );
        assert_eq!(groups["Clothes"], "g:1");
        assert_eq!(nodes[2].parent_id.as_deref(), Some("g:1"));
        assert_eq!(nodes[6].parent_id.as_deref(), Some("g:3"));
    }

    #[test]
    fn test_convert_legacy_avoids_id_collisions() {
        let raw = r#"[{"id":"g:1","name":"Odd id","category":"Misc"}]"#;
        let (nodes, groups) = convert_legacy_items(raw).unwrap();
        assert_eq!(groups["Misc"], "g:2");
        assert_eq!(nodes[1].parent_id.as_deref(), Some("g:2"));
    }
}

use serde::{Deserialize, Deserializer, Serialize};

use super::Status;

/// A named entry in the packing tree.
///
/// Nodes form a general forest via `parent_id`. A node with no parent is a root
/// group; whether a node behaves as a group when rendering is decided by the
/// tree index (it has at least one child), not by this field alone.
///
/// Ids are minted by the parser and are only stable within one parse; a
/// re-import of the same text produces new ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Always present on the wire; `null` for roots.
    #[serde(rename = "parentId", deserialize_with = "present_or_null")]
    pub parent_id: Option<String>,
}

// A custom deserializer stops serde from treating a missing key as `None`.
fn present_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer)
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A node with its current status, used for single-node responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetail {
    #[serde(flatten)]
    pub node: Node,
    pub status: Status,
    pub is_group: bool,
}

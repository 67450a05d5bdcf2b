use serde::{Deserialize, Serialize};

use super::{Mark, Status};

/// One of the three checklist columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    ToPack,
    Packed,
    NotNeeded,
}

impl View {
    pub const ALL: [View; 3] = [View::ToPack, View::Packed, View::NotNeeded];

    /// The status a node must carry to be shown in this view on its own account.
    pub fn status(&self) -> Status {
        match self {
            Self::ToPack => Status::ToPack,
            Self::Packed => Status::Packed,
            Self::NotNeeded => Status::NotNeeded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match Status::from_str(s)? {
            Status::ToPack => Some(Self::ToPack),
            Status::Packed => Some(Self::Packed),
            Status::NotNeeded => Some(Self::NotNeeded),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::ToPack => "To pack",
            Self::Packed => "Packed",
            Self::NotNeeded => "Not needed",
        }
    }
}

/// A node as it appears in one view, in render order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub id: String,
    pub name: String,
    /// Nesting depth, 0 for root groups.
    pub depth: usize,
    /// Whether the node has at least one child.
    pub is_group: bool,
    pub status: Status,
    /// Whether the UI should offer a restore action for this entry.
    pub can_restore: bool,
}

/// Number of visible entries per view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub to_pack: usize,
    pub packed: usize,
    pub not_needed: usize,
}

impl Counts {
    pub fn get(&self, view: View) -> usize {
        match view {
            View::ToPack => self.to_pack,
            View::Packed => self.packed,
            View::NotNeeded => self.not_needed,
        }
    }
}

/// A mark waiting for its transition delay to elapse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMarkInfo {
    pub id: String,
    pub mark: Mark,
    /// Time left before the mark is applied.
    pub remaining_ms: u64,
}

/// Everything the UI needs to render the three columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub to_pack: Vec<ViewEntry>,
    pub packed: Vec<ViewEntry>,
    pub not_needed: Vec<ViewEntry>,
    pub counts: Counts,
    pub pending: Option<PendingMarkInfo>,
}

impl ViewModel {
    pub fn entries(&self, view: View) -> &[ViewEntry] {
        match view {
            View::ToPack => &self.to_pack,
            View::Packed => &self.packed,
            View::NotNeeded => &self.not_needed,
        }
    }
}

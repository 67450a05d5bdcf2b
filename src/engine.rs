//! The checklist engine: the operations the UI calls.
//!
//! [`Packman`] owns the two collections that make up a checklist, the node
//! [`Tree`] and the [`StateStore`], and keeps them consistent: replacing the
//! tree always reinitialises the state map, and every mutation is persisted
//! best-effort to the backing [`KeyValueStore`].
//!
//! Marking a single item as packed or not needed is deferred by a short delay
//! so the UI can animate the move. Only one such mark may be pending; while it
//! is, further item and group marks are rejected.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::models::*;
use crate::parser;
use crate::state::StateStore;
use crate::storage::{self, KeyValueStore, LoadSource, StorageError};
use crate::tree::Tree;
use crate::views;

/// Delay between an item mark request and the state change.
pub const DEFAULT_MARK_DELAY: Duration = Duration::from_millis(350);

const DEFAULT_LIST: &str = include_str!("default-list.txt");

/// The bundled default list, in the same format as a user import.
pub fn default_list_text() -> String {
    format!("{}\n", DEFAULT_LIST.replace('\r', "").trim())
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    Imported { nodes: usize },
    /// The text had no valid lines; the current list is untouched.
    NoItemsFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MarkOutcome {
    /// The mark will land once `delay_ms` has elapsed and [`Packman::tick`] runs.
    Scheduled { id: String, mark: Mark, delay_ms: u64 },
    /// The state map was updated; `changed` is how many ids changed status.
    Applied {
        id: String,
        status: Status,
        changed: usize,
    },
    /// Another mark is still pending.
    Busy { pending_id: String },
    UnknownNode { id: String },
}

/// A deferred item mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMark {
    pub id: String,
    pub mark: Mark,
    pub due: Instant,
    /// List generation the mark was made against.
    pub generation: u64,
}

pub struct Packman<S: KeyValueStore> {
    store: S,
    clock: Arc<dyn Clock>,
    mark_delay: Duration,
    tree: Tree,
    states: StateStore,
    pending: Option<PendingMark>,
    /// Bumped on every import or reset; ids restart at `n:1` each time.
    generation: u64,
    source: LoadSource,
}

impl<S: KeyValueStore> Packman<S> {
    /// Load the checklist from `store` using the system clock and the default
    /// mark delay.
    pub fn open(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), DEFAULT_MARK_DELAY)
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>, mark_delay: Duration) -> Self {
        let snapshot = storage::load(&store, &default_list_text());
        Self {
            store,
            clock,
            mark_delay,
            tree: snapshot.tree,
            states: snapshot.states,
            pending: None,
            generation: 0,
            source: snapshot.source,
        }
    }

    /// How the current list was obtained when the engine was opened.
    pub fn load_source(&self) -> LoadSource {
        self.source
    }

    pub fn mark_delay(&self) -> Duration {
        self.mark_delay
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn nodes(&self) -> &[Node] {
        self.tree.nodes()
    }

    pub fn states(&self) -> &StateStore {
        &self.states
    }

    /// Status of `id`, or `None` if the node does not exist.
    pub fn status(&self, id: &str) -> Option<Status> {
        self.tree.contains(id).then(|| self.states.get(id))
    }

    pub fn view(&self, view: View) -> Vec<ViewEntry> {
        views::entries(&self.tree, &self.states, view)
    }

    pub fn count(&self, view: View) -> usize {
        views::count(&self.tree, &self.states, view)
    }

    pub fn counts(&self) -> Counts {
        views::counts(&self.tree, &self.states)
    }

    pub fn is_visible(&self, view: View, id: &str) -> bool {
        views::is_visible(&self.tree, &self.states, view, id)
    }

    pub fn view_model(&self) -> ViewModel {
        let to_pack = self.view(View::ToPack);
        let packed = self.view(View::Packed);
        let not_needed = self.view(View::NotNeeded);
        ViewModel {
            counts: Counts {
                to_pack: to_pack.len(),
                packed: packed.len(),
                not_needed: not_needed.len(),
            },
            to_pack,
            packed,
            not_needed,
            pending: self.pending_info(),
        }
    }

    pub fn pending(&self) -> Option<&PendingMark> {
        self.pending.as_ref()
    }

    pub fn pending_info(&self) -> Option<PendingMarkInfo> {
        let now = self.clock.now();
        self.pending.as_ref().map(|p| PendingMarkInfo {
            id: p.id.clone(),
            mark: p.mark,
            remaining_ms: p.due.saturating_duration_since(now).as_millis() as u64,
        })
    }

    // ============================================================
    // Import / reset
    // ============================================================

    /// Parse `text` without touching the current list.
    pub fn preview_import(&self, text: &str) -> Vec<Node> {
        parser::parse(text)
    }

    /// Replace the list with the nodes parsed from `text`. All states start
    /// over at `ToPack`.
    pub fn import_text(&mut self, text: &str) -> ImportOutcome {
        let nodes = parser::parse(text);
        if nodes.is_empty() {
            tracing::info!("Import rejected: no items found");
            return ImportOutcome::NoItemsFound;
        }
        let count = nodes.len();
        self.replace_nodes(nodes);
        tracing::info!(nodes = count, "Imported list");
        ImportOutcome::Imported { nodes: count }
    }

    pub fn import_file(&mut self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.import_text(&text))
    }

    /// Drop every stored entry and start over from the bundled default list.
    /// Returns the number of nodes in the new list.
    pub fn reset_to_default(&mut self) -> usize {
        self.best_effort(storage::clear(&self.store), "clear storage");
        let nodes = parser::parse(&default_list_text());
        let count = nodes.len();
        self.replace_nodes(nodes);
        tracing::info!(nodes = count, "Reset to default list");
        count
    }

    fn replace_nodes(&mut self, nodes: Vec<Node>) {
        self.tree = Tree::new(nodes);
        self.states = StateStore::fresh(&self.tree);
        self.generation += 1;
        self.best_effort(storage::save_nodes(&self.store, self.tree.nodes()), "save items");
        self.persist_states();
    }

    // ============================================================
    // Item operations
    // ============================================================

    pub fn pack_item(&mut self, id: &str) -> MarkOutcome {
        self.mark_item(id, Mark::Packed)
    }

    pub fn not_needed_item(&mut self, id: &str) -> MarkOutcome {
        self.mark_item(id, Mark::NotNeeded)
    }

    fn mark_item(&mut self, id: &str, mark: Mark) -> MarkOutcome {
        if let Some(busy) = self.busy() {
            return busy;
        }
        if !self.tree.contains(id) {
            return unknown(id);
        }

        if self.mark_delay.is_zero() {
            let changed = self.count_changes([id], mark.into());
            self.states.set_status(&self.tree, id, mark.into());
            self.persist_states();
            tracing::debug!(id, status = Status::from(mark).as_str(), "Marked item");
            return MarkOutcome::Applied {
                id: id.to_string(),
                status: mark.into(),
                changed,
            };
        }

        let due = self.clock.now() + self.mark_delay;
        self.pending = Some(PendingMark {
            id: id.to_string(),
            mark,
            due,
            generation: self.generation,
        });
        tracing::debug!(id, status = Status::from(mark).as_str(), "Scheduled item mark");
        MarkOutcome::Scheduled {
            id: id.to_string(),
            mark,
            delay_ms: self.mark_delay.as_millis() as u64,
        }
    }

    /// Apply the pending mark if its delay has elapsed. Returns the mark that
    /// was applied, if any.
    ///
    /// The mark always runs to completion once due. If the list was replaced
    /// in the meantime it is a no-op, even when a new node reuses its id.
    pub fn tick(&mut self) -> Option<PendingMark> {
        let due = self.pending.as_ref()?.due;
        if self.clock.now() < due {
            return None;
        }
        let pending = self.pending.take()?;
        if pending.generation != self.generation {
            tracing::debug!(id = %pending.id, "Dropped pending mark from a replaced list");
        } else if self
            .states
            .set_status(&self.tree, &pending.id, pending.mark.into())
        {
            self.persist_states();
            tracing::debug!(id = %pending.id, "Applied pending mark");
        } else {
            tracing::debug!(id = %pending.id, "Pending mark target no longer exists");
        }
        Some(pending)
    }

    /// Restore an item and every ancestor to `ToPack`. Never gated by a
    /// pending mark.
    pub fn restore_item(&mut self, id: &str) -> MarkOutcome {
        if !self.tree.contains(id) {
            return unknown(id);
        }
        let chain = std::iter::once(id).chain(self.tree.ancestors(id).map(|a| a.id.as_str()));
        let changed = self.count_changes(chain, Status::ToPack);
        self.states.restore(&self.tree, id);
        self.persist_states();
        tracing::debug!(id, changed, "Restored item");
        MarkOutcome::Applied {
            id: id.to_string(),
            status: Status::ToPack,
            changed,
        }
    }

    // ============================================================
    // Group operations
    // ============================================================

    pub fn pack_group(&mut self, id: &str) -> MarkOutcome {
        self.mark_group(id, Mark::Packed)
    }

    pub fn not_needed_group(&mut self, id: &str) -> MarkOutcome {
        self.mark_group(id, Mark::NotNeeded)
    }

    fn mark_group(&mut self, id: &str, mark: Mark) -> MarkOutcome {
        if let Some(busy) = self.busy() {
            return busy;
        }
        if !self.tree.contains(id) {
            return unknown(id);
        }
        let changed = self.count_changes(self.tree.subtree_ids(id), mark.into());
        self.states.set_group_status(&self.tree, id, mark.into());
        self.persist_states();
        tracing::debug!(id, changed, status = Status::from(mark).as_str(), "Marked group");
        MarkOutcome::Applied {
            id: id.to_string(),
            status: mark.into(),
            changed,
        }
    }

    /// Restore only the group node; descendants keep their statuses.
    pub fn restore_group(&mut self, id: &str) -> MarkOutcome {
        if !self.tree.contains(id) {
            return unknown(id);
        }
        let changed = self.count_changes([id], Status::ToPack);
        self.states.restore_group(&self.tree, id);
        if changed > 0 {
            self.persist_states();
        }
        tracing::debug!(id, "Restored group");
        MarkOutcome::Applied {
            id: id.to_string(),
            status: Status::ToPack,
            changed,
        }
    }

    // ============================================================
    // Helpers
    // ============================================================

    /// How many of `ids` do not already have `status`.
    fn count_changes<'a>(&self, ids: impl IntoIterator<Item = &'a str>, status: Status) -> usize {
        ids.into_iter()
            .filter(|id| self.states.get(id) != status)
            .count()
    }

    fn busy(&self) -> Option<MarkOutcome> {
        self.pending.as_ref().map(|p| MarkOutcome::Busy {
            pending_id: p.id.clone(),
        })
    }

    fn persist_states(&self) {
        self.best_effort(storage::save_states(&self.store, &self.states), "save state");
    }

    fn best_effort(&self, result: Result<(), StorageError>, what: &str) {
        if let Err(e) = result {
            tracing::warn!("Storage write failed ({}): {}", what, e);
        }
    }
}

fn unknown(id: &str) -> MarkOutcome {
    MarkOutcome::UnknownNode { id: id.to_string() }
}

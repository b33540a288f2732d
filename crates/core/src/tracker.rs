//! Per-instance attachment column tracking.
//!
//! Every model instance owns one [`AttachmentTracker`]. For each attachment
//! column it remembers:
//!
//! - `old`: the durable value, captured once from the database (or the first
//!   value observed) and only advanced after a durable write
//! - `staged`: values written inside a still-open transaction, oldest first,
//!   so a savepoint rollback falls back to what the outer transaction staged
//! - `new`: the value assigned in memory and not yet saved
//! - `written`: files written for the save currently in flight
//!
//! The tracker does no I/O. Handles are cheap clones sharing the same state,
//! so deferred transaction hooks can advance it after the save returned.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::attachment::{Attachment, ColumnValue};

#[derive(Debug, Default)]
struct ColumnState {
    old: Option<ColumnValue>,
    staged: Vec<StagedValue>,
    next_stage: u64,
    new: Option<ColumnValue>,
    written: Vec<(String, Bytes)>,
}

impl ColumnState {
    fn durable(&self) -> ColumnValue {
        self.staged
            .last()
            .map(|staged| &staged.value)
            .or(self.old.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

/// A value saved inside an open transaction, tagged with its save order.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedValue {
    seq: u64,
    value: ColumnValue,
}

impl StagedValue {
    /// The staged column value.
    #[must_use]
    pub fn value(&self) -> &ColumnValue {
        &self.value
    }
}

/// Old/new bookkeeping for the attachment columns of one model instance.
#[derive(Clone, Default)]
pub struct AttachmentTracker {
    columns: Arc<Mutex<HashMap<&'static str, ColumnState>>>,
}

impl AttachmentTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the durable value of `column`.
    ///
    /// Only the first call per column has an effect.
    pub fn capture(&self, column: &'static str, current: ColumnValue) {
        let mut columns = self.lock();
        let state = columns.entry(column).or_default();
        if state.old.is_none() {
            state.old = Some(current);
        }
    }

    /// Record a pending assignment. An uncaptured column gets an empty baseline.
    pub fn set_new(&self, column: &'static str, value: ColumnValue) {
        let mut columns = self.lock();
        let state = columns.entry(column).or_default();
        if state.old.is_none() {
            state.old = Some(ColumnValue::Empty);
        }
        state.new = Some(value);
    }

    /// Value visible to readers: pending intent first, then durable state.
    #[must_use]
    pub fn current(&self, column: &'static str) -> ColumnValue {
        let columns = self.lock();
        columns.get(column).map_or_else(ColumnValue::default, |state| {
            state.new.clone().unwrap_or_else(|| state.durable())
        })
    }

    /// Value the database holds (or will hold once the open transaction commits).
    #[must_use]
    pub fn durable(&self, column: &'static str) -> ColumnValue {
        let columns = self.lock();
        columns
            .get(column)
            .map_or_else(ColumnValue::default, ColumnState::durable)
    }

    /// `(durable, new)` when a pending assignment exists.
    #[must_use]
    pub fn diff(&self, column: &'static str) -> Option<(ColumnValue, ColumnValue)> {
        let columns = self.lock();
        let state = columns.get(column)?;
        let new = state.new.clone()?;
        Some((state.durable(), new))
    }

    /// Whether any column has a pending assignment.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.lock().values().any(|state| state.new.is_some())
    }

    /// Pending attachments of `column` that still need writing, placed under
    /// `folder` when one is configured.
    #[must_use]
    pub fn pending_writes(&self, column: &'static str, folder: Option<&str>) -> Vec<(String, Bytes)> {
        let mut columns = self.lock();
        let Some(new) = columns.get_mut(column).and_then(|state| state.new.as_mut()) else {
            return Vec::new();
        };

        new.attachments_mut()
            .iter_mut()
            .filter(|attachment| attachment.has_pending_source())
            .filter_map(|attachment| {
                if let Some(folder) = folder {
                    attachment.place_in(folder);
                }
                let bytes = attachment.source()?.clone();
                Some((attachment.name().to_string(), bytes))
            })
            .collect()
    }

    /// Record that `name` was written for the save in flight.
    pub fn mark_written(&self, column: &'static str, name: &str) {
        let mut columns = self.lock();
        let Some(state) = columns.get_mut(column) else {
            return;
        };
        let Some(new) = state.new.as_mut() else {
            return;
        };

        if let Some(attachment) = find_mut(new, name) {
            if let Some(bytes) = attachment.mark_persisted() {
                state.written.push((name.to_string(), bytes));
            }
        }
    }

    /// Forget the in-flight writes after the database accepted the save.
    pub fn take_written(&self, column: &'static str) -> Vec<String> {
        let mut columns = self.lock();
        columns.get_mut(column).map_or_else(Vec::new, |state| {
            state.written.drain(..).map(|(name, _)| name).collect()
        })
    }

    /// Undo in-flight writes after a failed save so a retry writes again.
    ///
    /// Returns the names whose files must be removed.
    pub fn revert_written(&self, column: &'static str) -> Vec<String> {
        let mut columns = self.lock();
        let Some(state) = columns.get_mut(column) else {
            return Vec::new();
        };

        let written = std::mem::take(&mut state.written);
        let mut names = Vec::with_capacity(written.len());
        for (name, bytes) in written {
            if let Some(attachment) = state.new.as_mut().and_then(|new| find_mut(new, &name)) {
                attachment.restore_source(bytes);
            }
            names.push(name);
        }
        names
    }

    /// Advance `old := new` after a durable write.
    pub fn commit(&self, column: &'static str) {
        let mut columns = self.lock();
        if let Some(state) = columns.get_mut(column) {
            if let Some(new) = state.new.take() {
                state.old = Some(new);
                state.staged.clear();
            }
        }
    }

    /// Move the pending value to `staged` after a save inside an open transaction.
    ///
    /// Returns the staged entry, which the commit or rollback hook hands back.
    pub fn stage(&self, column: &'static str) -> Option<StagedValue> {
        let mut columns = self.lock();
        let state = columns.get_mut(column)?;
        let value = state.new.take()?;
        let staged = StagedValue {
            seq: state.next_stage,
            value,
        };
        state.next_stage += 1;
        state.staged.push(staged.clone());
        Some(staged)
    }

    /// The transaction committed: `staged` and everything staged before it
    /// are durable.
    pub fn commit_staged(&self, column: &'static str, staged: StagedValue) {
        let mut columns = self.lock();
        let state = columns.entry(column).or_default();
        state.staged.retain(|entry| entry.seq > staged.seq);
        state.old = Some(staged.value);
    }

    /// The save that produced `staged` was rolled back, along with every
    /// later save. Durable state falls back to the entry staged before it,
    /// or to `old`.
    pub fn discard_staged(&self, column: &'static str, staged: &StagedValue) {
        if let Some(state) = self.lock().get_mut(column) {
            state.staged.retain(|entry| entry.seq < staged.seq);
        }
    }

    /// Attach resolved URLs to every tracked copy of the named attachments.
    pub fn apply_urls(&self, column: &'static str, urls: &HashMap<String, String>) {
        let mut columns = self.lock();
        let Some(state) = columns.get_mut(column) else {
            return;
        };

        let staged = state.staged.iter_mut().map(|entry| &mut entry.value);
        for value in [&mut state.old, &mut state.new]
            .into_iter()
            .flatten()
            .chain(staged)
        {
            for attachment in value.attachments_mut() {
                if let Some(url) = urls.get(attachment.name()) {
                    attachment.set_url(url.clone());
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<&'static str, ColumnState>> {
        self.columns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for AttachmentTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentTracker")
            .field("columns", &*self.lock())
            .finish()
    }
}

fn find_mut<'a>(value: &'a mut ColumnValue, name: &str) -> Option<&'a mut Attachment> {
    value
        .attachments_mut()
        .iter_mut()
        .find(|attachment| attachment.name() == name)
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;

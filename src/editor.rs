// Batch Editor - stage cell edits locally, commit them in one batch
//
// Edits are buffered per (record id, field) with last-write-wins, then
// flushed as one update call per distinct record, all records in parallel.
// There is no transaction: updates that succeed stay committed even when a
// sibling fails. Edits belonging to failed records remain staged so the user
// can retry them; only successful records are cleared. After a clean flush
// the caller reloads the collection so the view reflects server state
// instead of echoing the local buffer.

use crate::source::{RowStore, TransportError};
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Debug, Clone)]
pub struct FlushFailure {
    pub id: i64,
    pub detail: String,
}

/// One or more per-record updates in a batch failed while others succeeded.
/// No rollback, no automatic retry; the failed records' edits stay pending.
#[derive(Debug, Clone)]
pub struct PartialFlushError {
    pub flushed: usize,
    pub failures: Vec<FlushFailure>,
}

impl fmt::Display for PartialFlushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.failures.iter().map(|x| x.id.to_string()).collect();
        write!(
            f,
            "{} of {} record updates failed (ids: {})",
            self.failures.len(),
            self.flushed + self.failures.len(),
            ids.join(", ")
        )
    }
}

impl std::error::Error for PartialFlushError {}

// ============================================================================
// BATCH EDITOR
// ============================================================================

#[derive(Debug, Default)]
pub struct BatchEditor {
    /// record id -> (field caption -> staged value)
    pending: HashMap<i64, HashMap<String, Value>>,
}

impl BatchEditor {
    pub fn new() -> Self {
        BatchEditor::default()
    }

    /// Stage one cell change, replacing any prior staged value for the same
    /// (id, field) pair.
    pub fn stage_edit(&mut self, id: i64, field: &str, value: Value) {
        self.pending
            .entry(id)
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Staged value for a cell, if any.
    pub fn staged(&self, id: i64, field: &str) -> Option<&Value> {
        self.pending.get(&id).and_then(|fields| fields.get(field))
    }

    /// Number of staged cells (not records).
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(|fields| fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Commit all staged edits: one update per distinct record id, carrying
    /// every staged field for that record, dispatched concurrently. Returns
    /// the number of records updated, or a `PartialFlushError` when some
    /// updates failed; in that case the surviving entries in the buffer are
    /// exactly the failed records' edits.
    pub async fn flush<S: RowStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<usize, PartialFlushError> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let batch: Vec<(i64, HashMap<String, Value>)> = self
            .pending
            .iter()
            .map(|(id, fields)| (*id, fields.clone()))
            .collect();

        let results = join_all(batch.into_iter().map(|(id, payload)| async move {
            (id, store.update(id, payload).await)
        }))
        .await;

        let mut flushed = 0;
        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(()) => {
                    self.pending.remove(&id);
                    flushed += 1;
                }
                Err(TransportError { detail, .. }) => {
                    failures.push(FlushFailure { id, detail });
                }
            }
        }

        if failures.is_empty() {
            Ok(flushed)
        } else {
            failures.sort_by_key(|f| f.id);
            Err(PartialFlushError { flushed, failures })
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

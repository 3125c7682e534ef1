// Full-set loader - defeats the source's single-request row cap
//
// The backend caps any one request at a fixed number of rows, so the whole
// table is assembled by walking fixed-size pages ordered by primary id until
// a short or empty page arrives. Pages are awaited one at a time: the stable
// sort key is what makes the walk duplicate- and gap-free, and sequencing
// keeps the offsets honest.

use crate::normalize::normalize;
use crate::record::{RawRow, Record};
use crate::source::{RowStore, TransportError};
use chrono::{DateTime, Utc};

/// Page size observed against the hosted backend's row cap.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// The complete, normalized in-memory table for one session.
#[derive(Debug, Clone)]
pub struct Collection {
    pub records: Vec<Record>,
    pub loaded_at: DateTime<Utc>,
}

impl Collection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetch every row of the table. Any page failure aborts the whole load with
/// no partial result. A table whose size is an exact multiple of the page
/// size terminates via one extra, empty request.
pub async fn load_all<S: RowStore + ?Sized>(
    store: &S,
    page_size: usize,
) -> Result<Vec<RawRow>, TransportError> {
    let mut all = Vec::new();
    let mut offset = 0;

    loop {
        let page = store.fetch_range(offset, page_size).await?;
        if page.is_empty() {
            break;
        }
        let fetched = page.len();
        all.extend(page);
        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(all)
}

/// Load and normalize the whole table, stamping when the snapshot was taken.
pub async fn load_collection<S: RowStore + ?Sized>(
    store: &S,
    page_size: usize,
) -> Result<Collection, TransportError> {
    let raw = load_all(store, page_size).await?;
    let records = raw.iter().map(normalize).collect();

    Ok(Collection {
        records,
        loaded_at: Utc::now(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory store: serves `total` synthetic rows and logs every range
    /// request so tests can assert the paging pattern.
    struct FixtureStore {
        total: usize,
        fail_from_offset: Option<usize>,
        requests: Mutex<Vec<(usize, usize)>>,
    }

    impl FixtureStore {
        fn with_rows(total: usize) -> Self {
            FixtureStore {
                total,
                fail_from_offset: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_from(total: usize, offset: usize) -> Self {
            FixtureStore {
                total,
                fail_from_offset: Some(offset),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RowStore for FixtureStore {
        async fn fetch_range(
            &self,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<RawRow>, TransportError> {
            self.requests.lock().unwrap().push((offset, limit));

            if matches!(self.fail_from_offset, Some(fail) if offset >= fail) {
                return Err(TransportError::new("fetch_range", "connection reset"));
            }

            let end = (offset + limit).min(self.total);
            let rows = (offset..end)
                .map(|i| {
                    let mut row = HashMap::new();
                    row.insert("id".to_string(), json!(i as i64 + 1));
                    row.insert("UF".to_string(), json!("SP"));
                    row
                })
                .collect();
            Ok(rows)
        }

        async fn fetch_by_id(&self, _id: i64) -> Result<Option<RawRow>, TransportError> {
            Ok(None)
        }

        async fn update(
            &self,
            _id: i64,
            _payload: HashMap<String, serde_json::Value>,
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn ids(rows: &[RawRow]) -> Vec<i64> {
        rows.iter()
            .map(|r| r.get("id").and_then(|v| v.as_i64()).unwrap())
            .collect()
    }

    const P: usize = 4;

    #[tokio::test]
    async fn test_load_all_empty_table() {
        let store = FixtureStore::with_rows(0);
        let rows = load_all(&store, P).await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn test_load_all_exact_page_needs_terminating_request() {
        let store = FixtureStore::with_rows(P);
        let rows = load_all(&store, P).await.unwrap();
        assert_eq!(ids(&rows), vec![1, 2, 3, 4]);
        // One full page, then one empty page to prove exhaustion.
        assert_eq!(store.request_count(), 2);
    }

    #[tokio::test]
    async fn test_load_all_one_past_page_boundary() {
        let store = FixtureStore::with_rows(P + 1);
        let rows = load_all(&store, P).await.unwrap();
        assert_eq!(ids(&rows), vec![1, 2, 3, 4, 5]);
        assert_eq!(store.request_count(), 2);
    }

    #[tokio::test]
    async fn test_load_all_two_full_pages() {
        let store = FixtureStore::with_rows(2 * P);
        let rows = load_all(&store, P).await.unwrap();
        assert_eq!(rows.len(), 2 * P);
        assert_eq!(ids(&rows), (1..=2 * P as i64).collect::<Vec<_>>());
        assert_eq!(store.request_count(), 3);
    }

    #[tokio::test]
    async fn test_load_all_no_duplicates_no_gaps() {
        let store = FixtureStore::with_rows(11);
        let rows = load_all(&store, P).await.unwrap();
        assert_eq!(ids(&rows), (1..=11).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_page_failure_aborts_without_partial_result() {
        let store = FixtureStore::failing_from(3 * P, P);
        let err = load_all(&store, P).await.unwrap_err();
        assert_eq!(err.operation, "fetch_range");
    }

    #[tokio::test]
    async fn test_load_collection_normalizes() {
        let store = FixtureStore::with_rows(2);
        let collection = load_collection(&store, P).await.unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.records[0].region, "SP");
        assert_eq!(collection.records[0].status, "PENDENTE");
    }
}

// Remote row store - PostgREST client for the hosted table
//
// The durable store is a hosted relational backend reached over its REST
// surface. Only two capabilities are used: "give me one page of rows ordered
// by a stable key" and "persist these field values for this id". Everything
// else (filtering, aggregation) happens client-side.

use crate::config::Config;
use crate::record::RawRow;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Any failure reaching or reading from the remote source. Terminal for the
/// operation that raised it; no retry policy exists at this layer.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub operation: String,
    pub detail: String,
}

impl TransportError {
    pub fn new(operation: &str, detail: impl fmt::Display) -> Self {
        TransportError {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.detail)
    }
}

impl std::error::Error for TransportError {}

// ============================================================================
// ROW STORE TRAIT
// ============================================================================

/// Seam between the pipeline and the hosted backend. Production uses
/// `SupabaseSource`; tests substitute an in-memory store.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Fetch the half-open range `[offset, offset + limit)` of rows ordered
    /// by primary id ascending. The stable ordering is what guarantees the
    /// pager sees no duplicates and no gaps.
    async fn fetch_range(&self, offset: usize, limit: usize)
        -> Result<Vec<RawRow>, TransportError>;

    /// Fetch a single row by primary id.
    async fn fetch_by_id(&self, id: i64) -> Result<Option<RawRow>, TransportError>;

    /// Persist the given field values for one row. Last writer wins; the
    /// backend performs no version check.
    async fn update(&self, id: i64, payload: HashMap<String, Value>)
        -> Result<(), TransportError>;
}

// ============================================================================
// SUPABASE (POSTGREST) IMPLEMENTATION
// ============================================================================

pub struct SupabaseSource {
    client: Client,
    base: String,
    key: String,
    table: String,
}

impl SupabaseSource {
    pub fn new(cfg: &Config) -> Self {
        SupabaseSource {
            client: Client::new(),
            base: cfg.supabase_url.trim_end_matches('/').to_string(),
            key: cfg.supabase_key.clone(),
            table: cfg.table.clone(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base, self.table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn read_rows(
        &self,
        operation: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<Vec<RawRow>, TransportError> {
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| TransportError::new(operation, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::new(
                operation,
                format!("HTTP {}: {}", status, body),
            ));
        }

        resp.json::<Vec<RawRow>>()
            .await
            .map_err(|e| TransportError::new(operation, e))
    }
}

#[async_trait]
impl RowStore for SupabaseSource {
    async fn fetch_range(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RawRow>, TransportError> {
        let req = self.client.get(self.table_url()).query(&[
            ("select", "*"),
            ("order", "id.asc"),
            ("offset", offset.to_string().as_str()),
            ("limit", limit.to_string().as_str()),
        ]);
        self.read_rows("fetch_range", req).await
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<RawRow>, TransportError> {
        let req = self
            .client
            .get(self.table_url())
            .query(&[("select", "*"), ("id", format!("eq.{}", id).as_str())]);
        let rows = self.read_rows("fetch_by_id", req).await?;
        Ok(rows.into_iter().next())
    }

    async fn update(
        &self,
        id: i64,
        payload: HashMap<String, Value>,
    ) -> Result<(), TransportError> {
        let req = self
            .client
            .patch(self.table_url())
            .query(&[("id", format!("eq.{}", id).as_str())])
            .header("Prefer", "return=minimal")
            .json(&payload);

        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| TransportError::new("update", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::new(
                "update",
                format!("id {}: HTTP {}: {}", id, status, body),
            ));
        }

        Ok(())
    }
}

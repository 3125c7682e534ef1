use crate::engine::DEFAULT_COMPLETED_STATUSES;
use crate::loader::DEFAULT_PAGE_SIZE;
use anyhow::{bail, Result};

/// Runtime configuration, one environment variable per knob.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend (project URL, no trailing path).
    pub supabase_url: String,
    /// API key, sent both as `apikey` and bearer token.
    pub supabase_key: String,
    pub table: String,
    pub page_size: usize,
    /// Statuses counted as delivered by the completion-rate KPI.
    pub completed_statuses: Vec<String>,
    /// Listen address for the API server binary.
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            supabase_url: std::env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_key: std::env::var("SUPABASE_KEY").unwrap_or_default(),
            table: std::env::var("FORMALIZA_TABLE")
                .unwrap_or_else(|_| "formalizacoes".to_string()),
            page_size: std::env::var("PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
            completed_statuses: std::env::var("COMPLETED_STATUSES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_uppercase())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| {
                    DEFAULT_COMPLETED_STATUSES
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.supabase_url.is_empty() {
            bail!("SUPABASE_URL is not set");
        }
        if self.supabase_key.is_empty() {
            bail!("SUPABASE_KEY is not set");
        }
        if self.page_size == 0 {
            bail!("PAGE_SIZE must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_endpoint_and_key() {
        let mut cfg = Config {
            supabase_url: String::new(),
            supabase_key: String::new(),
            table: "formalizacoes".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            completed_statuses: vec!["SIM".to_string()],
            bind_addr: "0.0.0.0:3001".to_string(),
        };
        assert!(cfg.validate().is_err());

        cfg.supabase_url = "https://example.supabase.co".to_string();
        assert!(cfg.validate().is_err());

        cfg.supabase_key = "anon-key".to_string();
        assert!(cfg.validate().is_ok());
    }
}

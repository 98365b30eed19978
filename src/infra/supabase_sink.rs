use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::app::ports::RecordSinkPort;
use crate::config::env_secret;
use crate::error::{LoungeError, Result};

/// Upserts rows through a PostgREST endpoint (`{url}/rest/v1/{table}`).
pub struct SupabaseSink {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

impl SupabaseSink {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
        })
    }

    /// Build from `SUPABASE_URL` and `SUPABASE_KEY`.
    pub fn from_env(timeout_seconds: u64) -> Result<Self> {
        Self::new(env_secret("SUPABASE_URL")?, env_secret("SUPABASE_KEY")?, timeout_seconds)
    }

    pub fn endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

#[async_trait]
impl RecordSinkPort for SupabaseSink {
    async fn upsert_batch(&self, table: &str, rows: &[Value]) -> Result<()> {
        let endpoint = self.endpoint(table);
        let resp = self
            .client
            .post(&endpoint)
            .header("apikey", &self.key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.key))
            .header("Prefer", "resolution=merge-duplicates")
            .json(rows)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LoungeError::Api {
                message: format!("upsert into {} failed: {} - {}", table, status, body),
            });
        }
        debug!("Upserted {} rows into {}", rows.len(), table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let sink = SupabaseSink::new("https://abc.supabase.co/", "key", 5).unwrap();
        assert_eq!(sink.endpoint("lounges"), "https://abc.supabase.co/rest/v1/lounges");
    }
}

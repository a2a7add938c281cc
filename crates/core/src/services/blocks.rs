//! Block-relationship service client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_common::{AppError, AppResult};
use serde::Deserialize;

/// Trait for querying block relationships between users.
#[async_trait]
pub trait BlockChecker: Send + Sync {
    /// Whether `blocker_id` has blocked `target_id`.
    async fn has_blocked(&self, blocker_id: i64, target_id: i64) -> AppResult<bool>;
}

/// Wrapper for boxed `BlockChecker` trait object.
pub type BlockCheckerService = Arc<dyn BlockChecker>;

#[derive(Debug, Deserialize)]
struct DataResponse {
    data: bool,
}

/// HTTP client for the block-relationship service.
pub struct HttpBlockChecker {
    client: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl HttpBlockChecker {
    /// Create a new block checker client with the given request timeout.
    pub fn new(base_url: &str, access_key: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build block client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
        })
    }
}

#[async_trait]
impl BlockChecker for HttpBlockChecker {
    async fn has_blocked(&self, blocker_id: i64, target_id: i64) -> AppResult<bool> {
        let response = self
            .client
            .get(format!(
                "{}/blocks/{blocker_id}/{target_id}",
                self.base_url
            ))
            .query(&[("access_key", self.access_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Block service failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Block service returned {}",
                response.status()
            )));
        }

        let body: DataResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid block response: {e}")))?;

        Ok(body.data)
    }
}

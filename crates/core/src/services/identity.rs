//! Identity provider client.
//!
//! Every connection exchanges its bearer credential for an identity through
//! the external identity provider; the identity is then passed explicitly
//! into every service call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Staff role name as reported by the identity provider.
const ADMIN_ROLE: &str = "admin";

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User ID.
    pub id: i64,
    /// Roles granted by the identity provider.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    /// Whether this identity may act as a staff operator.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

/// Trait for exchanging a bearer credential for an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate a bearer credential.
    async fn authenticate(&self, credential: &str) -> AppResult<Identity>;
}

/// Wrapper for boxed `IdentityProvider` trait object.
pub type IdentityProviderService = Arc<dyn IdentityProvider>;

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// HTTP client for the identity provider.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    /// Create a new identity provider client with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build identity client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn authenticate(&self, credential: &str) -> AppResult<Identity> {
        if credential.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let response = self
            .client
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Identity provider failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let body: DataResponse<Identity> = response
                .json()
                .await
                .map_err(|e| AppError::ExternalService(format!("Invalid identity response: {e}")))?;
            return Ok(body.data);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Unauthenticated);
        }

        Err(AppError::ExternalService(format!(
            "Identity provider returned {status}"
        )))
    }
}

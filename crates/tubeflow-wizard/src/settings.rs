//! Settings page: AI provider key and YouTube credentials.
//!
//! Unlike the wizard, the settings page reports failures through one
//! page-level error rather than per field.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use tubeflow_gateway::{BackendGateway, GatewayError, GatewayResult};
use tubeflow_models::{ApiKeyPreview, TokenRecord};

use crate::error::WizardResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialsState {
    pub key_preview: Option<ApiKeyPreview>,
    pub token: Option<TokenRecord>,
    pub authorization_url: Option<String>,
    /// Requests currently in flight.
    pub pending: usize,
    pub error: Option<String>,
}

/// Connection state of the YouTube credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Missing,
    Valid { remaining_secs: i64 },
    Expired,
}

impl CredentialsState {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    pub fn has_key(&self) -> bool {
        self.key_preview.is_some()
    }

    pub fn token_status(&self, now: DateTime<Utc>) -> TokenStatus {
        match &self.token {
            None => TokenStatus::Missing,
            Some(token) if token.is_expired(now) => TokenStatus::Expired,
            Some(token) => TokenStatus::Valid {
                remaining_secs: token.remaining_secs(now),
            },
        }
    }
}

pub struct CredentialsPanel<G> {
    gateway: Arc<G>,
    state: RwLock<CredentialsState>,
}

impl<G: BackendGateway> CredentialsPanel<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            state: RwLock::new(CredentialsState::default()),
        }
    }

    pub fn snapshot(&self) -> CredentialsState {
        self.state.read().clone()
    }

    // ========================================================================
    // AI provider key
    // ========================================================================

    /// Reload the masked key preview.
    pub async fn refresh_key(&self) -> WizardResult<Option<ApiKeyPreview>> {
        let _loading = self.begin();
        let result = self.gateway.get_key().await;
        let preview = self.settle("load_key", result)?;
        self.state.write().key_preview = preview.clone();
        Ok(preview)
    }

    /// Save `key`, or replace the stored one if a key already exists.
    pub async fn store_key(&self, key: &str) -> WizardResult<Option<ApiKeyPreview>> {
        let key = key.trim();
        let exists = self.state.read().has_key();
        {
            let _loading = self.begin();
            let result = if exists {
                self.gateway.update_key(key).await
            } else {
                self.gateway.save_key(key).await
            };
            self.settle("store_key", result)?;
        }
        info!(replaced = exists, "AI provider key stored");
        self.refresh_key().await
    }

    pub async fn remove_key(&self) -> WizardResult<()> {
        let _loading = self.begin();
        let result = self.gateway.delete_key().await;
        self.settle("remove_key", result)?;
        self.state.write().key_preview = None;
        info!("AI provider key removed");
        Ok(())
    }

    // ========================================================================
    // YouTube credentials
    // ========================================================================

    /// Reload the stored token. A missing token is not an error.
    pub async fn refresh_token_status(&self) -> WizardResult<Option<TokenRecord>> {
        let _loading = self.begin();
        let result = match self.gateway.get_token().await {
            Ok(token) => Ok(Some(token)),
            Err(GatewayError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        };
        let token = self.settle("load_token", result)?;
        self.state.write().token = token.clone();
        Ok(token)
    }

    /// Start the OAuth flow. Returns the URL the user must visit.
    pub async fn connect_youtube(&self) -> WizardResult<String> {
        let _loading = self.begin();
        let result = self.gateway.create_token().await;
        let url = self.settle("connect_youtube", result)?.authorization_url;
        self.state.write().authorization_url = Some(url.clone());
        Ok(url)
    }

    pub async fn refresh_youtube_token(&self) -> WizardResult<TokenRecord> {
        let _loading = self.begin();
        let result = self.gateway.refresh_token().await;
        let token = self.settle("refresh_token", result)?;
        self.state.write().token = Some(token.clone());
        info!(expires_at = %token.expires_at, "YouTube token refreshed");
        Ok(token)
    }

    fn begin(&self) -> LoadingGuard<'_> {
        self.state.write().pending += 1;
        LoadingGuard { state: &self.state }
    }

    fn settle<T>(&self, action: &str, result: GatewayResult<T>) -> WizardResult<T> {
        match result {
            Ok(value) => {
                self.state.write().error = None;
                Ok(value)
            }
            Err(e) => {
                warn!(action = action, error = %e, "Settings request failed");
                self.state.write().error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

struct LoadingGuard<'a> {
    state: &'a RwLock<CredentialsState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.write();
        state.pending = state.pending.saturating_sub(1);
    }
}

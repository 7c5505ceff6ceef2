use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::config::FcmConfig;

const FCM_API_URL: &str = "https://fcm.googleapis.com/v1/projects";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Authentication error: {0}")]
    Authentication(String),
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PushMessage {
    pub device_token: String,
    pub title: String,
    pub body: String,
    pub data: Option<HashMap<String, String>>,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
}

pub struct FcmProvider {
    config: FcmConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct FcmRequest {
    message: FcmMessage,
}

#[derive(Debug, Serialize)]
struct FcmMessage {
    token: String,
    notification: FcmNotification,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<HashMap<String, String>>,
    android: FcmAndroidConfig,
}

#[derive(Debug, Serialize)]
struct FcmNotification {
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct FcmAndroidConfig {
    priority: String,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: Option<String>,
    #[serde(default)]
    error: Option<FcmError>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct FcmError {
    code: i32,
    message: String,
    status: String,
}

impl FcmProvider {
    pub fn new(config: FcmConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn get_access_token(&self) -> Result<String, ProviderError> {
        // Exchanging the service-account key for a short-lived OAuth2 token
        // happens out of process; the configured key is used as the bearer
        // credential here.
        if self.config.service_account_key.is_empty() {
            return Err(ProviderError::Authentication(
                "FCM service account key not configured".to_string(),
            ));
        }
        Ok(self.config.service_account_key.clone())
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "FCM push provider is not enabled".to_string(),
            ));
        }

        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        let access_token = self.get_access_token().await?;

        let request = FcmRequest {
            message: FcmMessage {
                token: push.device_token.clone(),
                notification: FcmNotification {
                    title: push.title.clone(),
                    body: push.body.clone(),
                },
                data: push.data.clone(),
                android: FcmAndroidConfig {
                    priority: "high".to_string(),
                },
            },
        };

        let url = format!("{}/{}/messages:send", FCM_API_URL, self.config.project_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to FCM: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::SendFailed(format!(
                "FCM API returned error status {}: {}",
                status, body
            )));
        }

        let fcm_response: FcmResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse FCM response: {}", e))
        })?;

        if let Some(error) = fcm_response.error {
            return Err(ProviderError::SendFailed(format!(
                "FCM error ({}): {}",
                error.status, error.message
            )));
        }

        Ok(ProviderResponse {
            provider_id: fcm_response.name,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if !self.config.enabled {
            return Ok(());
        }

        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        if self.config.service_account_key.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM service_account_key is not configured".to_string(),
            ));
        }

        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Mock push provider for testing
pub struct MockPushProvider {
    enabled: bool,
    send_count: AtomicU64,
}

impl MockPushProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            send_count: AtomicU64::new(0),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock push provider is not enabled".to_string(),
            ));
        }

        self.send_count.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            device_token = %push.device_token,
            title = %push.title,
            "[MOCK] Push notification would be sent"
        );

        Ok(ProviderResponse {
            provider_id: Some(format!(
                "mock-push-{}",
                self.send_count.load(Ordering::SeqCst)
            )),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Per-token delivery outcome, mirroring what the dispatcher reports to
/// callers that care (nobody blocks on it).
#[derive(Debug, Clone, Serialize)]
pub struct TokenDelivery {
    pub token: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fan-out wrapper over the configured push provider. Delivery is strictly
/// best-effort: failures are logged per token and never propagated, so a
/// dead device token cannot fail or roll back the state change that
/// triggered the notification.
#[derive(Clone)]
pub struct Notifier {
    provider: Arc<dyn PushProvider>,
}

impl Notifier {
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self { provider }
    }

    pub async fn notify_tokens(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> Vec<TokenDelivery> {
        let mut results = Vec::with_capacity(tokens.len());

        for token in tokens {
            let message = PushMessage {
                device_token: token.clone(),
                title: title.to_string(),
                body: body.to_string(),
                data: None,
            };

            match self.provider.send(&message).await {
                Ok(_) => results.push(TokenDelivery {
                    token: token.clone(),
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(token = %token, error = %e, "Push notification failed");
                    results.push(TokenDelivery {
                        token: token.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_tokens_reports_per_token_outcomes() {
        let provider = Arc::new(MockPushProvider::new(true));
        let notifier = Notifier::new(provider.clone());

        let tokens = vec!["tok-1".to_string(), "tok-2".to_string()];
        let results = notifier.notify_tokens(&tokens, "title", "body").await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(provider.send_count(), 2);
    }

    #[tokio::test]
    async fn disabled_provider_failures_are_swallowed() {
        let provider = Arc::new(MockPushProvider::new(false));
        let notifier = Notifier::new(provider);

        let results = notifier
            .notify_tokens(&["tok-1".to_string()], "title", "body")
            .await;

        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.is_some());
    }
}

// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API client for the Ferry relay.
//!
//! Implements [`PlatformAdapter`] over three Bot API methods: `getMe`,
//! `getUpdates` and `sendMessage`, addressed as
//! `{api_url}/bot{credential}/{method}`.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use ferry_config::model::TelegramConfig;
use ferry_core::{
    AdapterType, FerryError, HealthStatus, Identity, PlatformAdapter, PlatformUpdate,
    PluginAdapter,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{ApiResponse, SendMessageRequest, Update, User};

/// Reason reported when the platform rejects a credential without a description.
const DEFAULT_AUTH_REASON: &str = "unauthorized";

/// HTTP client for the Telegram Bot API.
///
/// Holds no credential: every call takes the session's credential so a single
/// client (and its connection pool) serves whichever session is active.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TelegramClient {
    /// Creates a client bounded by `config.request_timeout_secs` per call.
    pub fn new(config: &TelegramConfig) -> Result<Self, FerryError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FerryError::Connectivity {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, credential: &str, method: &str) -> String {
        format!("{}/bot{credential}/{method}", self.base_url)
    }

    /// Decodes the API envelope whatever the HTTP status; the Bot API reports
    /// failures as `{ok: false, description}` bodies on 4xx responses.
    async fn decode<T: DeserializeOwned>(
        &self,
        method: &str,
        response: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<ApiResponse<T>, FerryError> {
        let response = response.map_err(|e| self.transport_error(method, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(method, e))?;
        debug!(method, status = %status, "Bot API response received");

        serde_json::from_str::<ApiResponse<T>>(&body).map_err(|e| FerryError::Connectivity {
            message: format!("{method}: undecodable response ({status}): {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Maps a reqwest failure, stripping the URL so the credential never reaches a log line.
    fn transport_error(&self, method: &str, e: reqwest::Error) -> FerryError {
        let e = e.without_url();
        let message = if e.is_timeout() {
            format!("{method}: no response within {:?}", self.timeout)
        } else {
            format!("{method}: request failed: {e}")
        };
        FerryError::Connectivity {
            message,
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        // Any HTTP answer means the endpoint is reachable; credentials are
        // checked separately through getMe.
        match self.client.get(&self.base_url).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Bot API unreachable: {}",
                e.without_url()
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        debug!("Telegram client shutting down");
        Ok(())
    }
}

#[async_trait]
impl PlatformAdapter for TelegramClient {
    async fn get_me(&self, credential: &str) -> Result<Identity, FerryError> {
        let response = self
            .client
            .get(self.method_url(credential, "getMe"))
            .send()
            .await;
        let envelope: ApiResponse<User> = self.decode("getMe", response).await?;

        if !envelope.ok {
            return Err(FerryError::Auth {
                reason: envelope
                    .description
                    .unwrap_or_else(|| DEFAULT_AUTH_REASON.to_string()),
            });
        }

        let user = envelope.result.ok_or_else(|| FerryError::Connectivity {
            message: "getMe: response has no result".into(),
            source: None,
        })?;
        Ok(Identity {
            resolved_name: user.first_name,
        })
    }

    async fn get_updates(&self, credential: &str) -> Result<Vec<PlatformUpdate>, FerryError> {
        let response = self
            .client
            .get(self.method_url(credential, "getUpdates"))
            .send()
            .await;
        let envelope: ApiResponse<Vec<Update>> = self.decode("getUpdates", response).await?;

        if !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| "request rejected".to_string());
            return Err(match envelope.error_code {
                Some(401) => FerryError::Auth {
                    reason: description,
                },
                _ => FerryError::Connectivity {
                    message: format!("getUpdates: {description}"),
                    source: None,
                },
            });
        }

        let updates = envelope.result.unwrap_or_default();
        let total = updates.len();
        let messages: Vec<PlatformUpdate> = updates
            .into_iter()
            .filter_map(|update| update.message)
            .map(|msg| PlatformUpdate {
                remote_message_id: msg.message_id,
                chat_id: msg.chat.id,
                text: msg.text,
            })
            .collect();
        debug!(total, messages = messages.len(), "updates fetched");
        Ok(messages)
    }

    async fn send_message(
        &self,
        credential: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<(), FerryError> {
        let response = self
            .client
            .post(self.method_url(credential, "sendMessage"))
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await;
        let envelope: ApiResponse<serde_json::Value> =
            self.decode("sendMessage", response).await?;

        if envelope.ok {
            Ok(())
        } else {
            let message = envelope
                .description
                .unwrap_or_else(|| "sendMessage rejected".to_string());
            warn!(chat_id, error = %message, "destination refused message");
            Err(FerryError::Forward { message })
        }
    }
}

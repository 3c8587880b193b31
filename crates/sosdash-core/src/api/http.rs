//! HTTP implementation of [`AlertApi`] on top of `reqwest`.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::client::AlertApi;
use super::types::{ApiError, ErrorBody, ToggleOutcome};
use crate::auth::SessionToken;
use crate::config::Settings;
use crate::connections::{connections_from_rows, Connection, NotificationRecord, SosEvent};

/// User row returned by `GET /sos/active`
#[derive(Debug, Deserialize)]
struct ActiveUserRow {
    #[serde(default)]
    user_email: Option<String>,
}

/// Safety API client
#[derive(Debug, Clone)]
pub struct HttpAlertApi {
    client: Client,
    base_url: Url,
}

impl HttpAlertApi {
    /// Create a client from settings (base URL and request timeout)
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut raw = settings.api_base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url =
            Url::parse(&raw).with_context(|| format!("Invalid API base URL: {}", raw))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Network(format!("invalid endpoint {}: {}", path, e)))
    }

    fn authorized(&self, builder: RequestBuilder, token: &SessionToken) -> RequestBuilder {
        // The server expects the raw token, without a scheme prefix
        builder.header(AUTHORIZATION, token.as_str())
    }

    /// Send a request and decode a JSON body, mapping non-success statuses
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::debug!(status = status.as_u16(), %message, "API request rejected");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|e| {
            ApiError::Network(format!("failed to decode response body: {}", e))
        })
    }
}

impl AlertApi for HttpAlertApi {
    async fn fetch_connections(&self, token: &SessionToken) -> Result<Vec<Connection>, ApiError> {
        let url = self.endpoint("connections")?;
        let request = self.authorized(self.client.get(url), token);
        let rows: Vec<serde_json::Value> = self.send_json(request).await?;
        Ok(connections_from_rows(rows))
    }

    async fn fetch_active_alert_ids(
        &self,
        token: &SessionToken,
    ) -> Result<HashSet<String>, ApiError> {
        let url = self.endpoint("sos/active")?;
        let request = self.authorized(self.client.get(url), token);
        let rows: Vec<ActiveUserRow> = self.send_json(request).await?;
        Ok(rows.into_iter().filter_map(|r| r.user_email).collect())
    }

    async fn fetch_notifications(
        &self,
        token: &SessionToken,
    ) -> Result<Vec<NotificationRecord>, ApiError> {
        let url = self.endpoint("notifications")?;
        let request = self.authorized(self.client.get(url), token);
        self.send_json(request).await
    }

    async fn send_toggle(&self, token: &SessionToken) -> Result<ToggleOutcome, ApiError> {
        let url = self.endpoint("sos")?;
        let request = self.authorized(self.client.post(url), token);
        self.send_json(request).await
    }

    async fn fetch_events(
        &self,
        token: &SessionToken,
        email: &str,
    ) -> Result<Vec<SosEvent>, ApiError> {
        let url = self.endpoint("sos/events")?;
        let request = self
            .authorized(self.client.get(url), token)
            .query(&[("triggered_email", email)]);
        self.send_json(request).await
    }
}

//! Google Analytics measurement protocol beacon.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use super::{AnalyticsKind, Telemetry};
use crate::config::TelemetryConfig;
use crate::metrics::EXTERNAL_SERVICE_REQUESTS;

const COLLECT_URL: &str = "https://www.google-analytics.com/collect";

/// Sends events as GET beacons. Disabled when no token is configured.
pub struct GoogleAnalytics {
    client: Client,
    token: Option<String>,
    base_url: String,
}

impl GoogleAnalytics {
    pub fn new(config: &TelemetryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            token: config.google_token.clone().filter(|t| !t.is_empty()),
            base_url: COLLECT_URL.to_string(),
        })
    }

    /// Overrides the collect endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Beacon URL for an event, `None` when disabled.
    pub fn event_url(&self, kind: AnalyticsKind, user_id: i64, data: &str) -> Option<String> {
        let token = self.token.as_deref()?;
        Some(format!(
            "{}?v=1&t=event&tid={}&cid={}&ec={}&ea={}",
            self.base_url,
            urlencoding::encode(token),
            user_id,
            kind.as_str(),
            urlencoding::encode(data)
        ))
    }
}

#[async_trait]
impl Telemetry for GoogleAnalytics {
    async fn track(&self, kind: AnalyticsKind, user_id: i64, data: &str) {
        let Some(url) = self.event_url(kind, user_id, data) else {
            return;
        };

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(%kind, "Analytics event sent");
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["google_analytics", "track", "success"])
                    .inc();
            }
            Ok(response) => {
                error!(status = response.status().as_u16(), "Google analytics error");
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["google_analytics", "track", "error"])
                    .inc();
            }
            Err(e) => {
                error!(error = %e, "Google analytics error");
                EXTERNAL_SERVICE_REQUESTS
                    .with_label_values(&["google_analytics", "track", "error"])
                    .inc();
            }
        }
    }
}

//! Usage analytics.
//!
//! Events are fire-and-forget: a failed beacon is logged and otherwise
//! ignored.

mod google;

pub use google::GoogleAnalytics;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsKind {
    Command,
    Message,
}

impl AnalyticsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsKind::Command => "command",
            AnalyticsKind::Message => "message",
        }
    }
}

impl fmt::Display for AnalyticsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Telemetry: Send + Sync {
    /// Records one event for a user. Never fails.
    async fn track(&self, kind: AnalyticsKind, user_id: i64, data: &str);
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NoopTelemetry;

#[async_trait]
impl Telemetry for NoopTelemetry {
    async fn track(&self, _kind: AnalyticsKind, _user_id: i64, _data: &str) {}
}

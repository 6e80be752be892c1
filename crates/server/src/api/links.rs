//! Link endpoint: a chat message containing a web link.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mediarelay_core::{ChatKind, DispatchRequest, RequestKind, SourceDescriptor};

use super::convert::{outcome_response, record_sender, Sender};
use crate::state::AppState;

static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s<>"']+"#).unwrap());

/// Request body for a link submission
#[derive(Debug, Deserialize)]
pub struct LinkBody {
    /// Message text; the first link in it is used
    pub text: String,
    #[serde(default)]
    pub chat: ChatKind,
    pub user: Option<Sender>,
}

#[derive(Debug, Serialize)]
pub struct LinkErrorResponse {
    pub error: String,
}

/// First http(s) link in a message, without trailing punctuation.
pub fn extract_link(text: &str) -> Option<&str> {
    LINK_REGEX
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')']))
}

/// Resolve a link and convert its video
pub async fn submit_link(State(state): State<Arc<AppState>>, Json(body): Json<LinkBody>) -> Response {
    let Some(link) = extract_link(&body.text) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(LinkErrorResponse {
                error: "No link found in text".to_string(),
            }),
        )
            .into_response();
    };

    if let Some(sender) = &body.user {
        record_sender(&state, sender, link);
    }

    let source = SourceDescriptor::url(link, RequestKind::RemoteLink);
    let outcome = state
        .dispatcher()
        .handle(DispatchRequest::new(source, body.chat))
        .await;
    outcome_response(outcome)
}

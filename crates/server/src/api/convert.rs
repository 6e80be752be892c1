//! Conversion endpoint.
//!
//! The transport adapter posts the download URL of an attachment together
//! with what it knows about it. The response carries the artifact bytes, a
//! rejection text, or nothing at all.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use mediarelay_core::{
    AnalyticsKind, Artifact, ArtifactKind, AttachmentKind, ChatKind, DispatchRequest,
    FailureReason, Outcome, RequestKind, SourceDescriptor,
};

use crate::state::AppState;

pub const OUTPUT_TYPE_HEADER: HeaderName = HeaderName::from_static("x-output-type");
pub const CAPTION_HEADER: HeaderName = HeaderName::from_static("x-caption");
pub const SUPPORTS_STREAMING_HEADER: HeaderName = HeaderName::from_static("x-supports-streaming");
pub const OFFER_ROUND_HEADER: HeaderName = HeaderName::from_static("x-offer-round");

// ============================================================================
// Request/Response Types
// ============================================================================

/// The chat user a request came from.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
}

/// Request body for a conversion
#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    /// Where the transport lets us download the source
    pub url: String,
    #[serde(default = "default_request_kind")]
    pub kind: RequestKind,
    #[serde(default)]
    pub attachment: AttachmentKind,
    /// Size announced by the transport, checked before anything is downloaded
    pub file_size: Option<u64>,
    pub file_name: Option<String>,
    #[serde(default)]
    pub chat: ChatKind,
    pub user: Option<Sender>,
}

fn default_request_kind() -> RequestKind {
    RequestKind::GenericAttachment
}

/// Body of a 422 response
#[derive(Debug, Serialize)]
pub struct RejectionResponse {
    pub reason: FailureReason,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Convert an attachment
pub async fn convert(State(state): State<Arc<AppState>>, Json(body): Json<ConvertBody>) -> Response {
    if let Some(sender) = &body.user {
        record_sender(&state, sender, &body.url);
    }

    let mut source =
        SourceDescriptor::url(body.url, body.kind).with_attachment(body.attachment);
    if let Some(size) = body.file_size {
        source = source.with_declared_size(size);
    }
    if let Some(name) = body.file_name {
        source = source.with_display_name(name);
    }

    let outcome = state
        .dispatcher()
        .handle(DispatchRequest::new(source, body.chat))
        .await;
    outcome_response(outcome)
}

/// Records the sender and emits a message event.
///
/// Store failures are logged; they never fail the request.
pub(crate) fn record_sender(state: &Arc<AppState>, sender: &Sender, data: &str) {
    match state
        .users()
        .create_or_update(sender.id, sender.username.as_deref())
    {
        Ok(Some(user)) => info!(user = %user.description(), "New user"),
        Ok(None) => {}
        Err(e) => warn!(telegram_id = sender.id, error = %e, "Failed to record user"),
    }

    let telemetry = state.telemetry();
    let user_id = sender.id;
    let data = data.to_string();
    tokio::spawn(async move {
        telemetry.track(AnalyticsKind::Message, user_id, &data).await;
    });
}

/// Maps a dispatch outcome onto an HTTP response.
pub(crate) fn outcome_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Delivered(artifact) => artifact_response(artifact),
        Outcome::Rejected { reason, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RejectionResponse { reason, message }),
        )
            .into_response(),
        Outcome::Silent { .. } => StatusCode::NO_CONTENT.into_response(),
    }
}

fn artifact_response(artifact: Artifact) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.kind.content_type()),
    );
    headers.insert(
        OUTPUT_TYPE_HEADER,
        HeaderValue::from_static(artifact.kind.as_str()),
    );

    match &artifact.kind {
        ArtifactKind::Video {
            supports_streaming,
            offer_round,
        } => {
            headers.insert(SUPPORTS_STREAMING_HEADER, bool_header(*supports_streaming));
            headers.insert(OFFER_ROUND_HEADER, bool_header(*offer_round));
        }
        ArtifactKind::Document { file_name } => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                urlencoding::encode(file_name)
            );
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }
        _ => {}
    }

    // Percent-encoded, so always a valid header value
    if let Some(caption) = &artifact.caption {
        if let Ok(value) = HeaderValue::from_str(&urlencoding::encode(caption)) {
            headers.insert(CAPTION_HEADER, value);
        }
    }

    (StatusCode::OK, headers, artifact.bytes).into_response()
}

fn bool_header(value: bool) -> HeaderValue {
    HeaderValue::from_static(if value { "true" } else { "false" })
}

//! Operator view of known users.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use mediarelay_core::Identity;

use crate::state::AppState;

/// Query parameters for the users table
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    /// `updated` lists returning users by last activity
    pub sort: Option<String>,
}

/// Plain-text table of the most recent users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<ListUsersParams>,
) -> Result<String, (StatusCode, String)> {
    identity
        .require_admin()
        .map_err(|e| (StatusCode::FORBIDDEN, e.to_string()))?;

    let sort_by_updated = params.sort.as_deref() == Some("updated");
    state.users().table(sort_by_updated).map_err(|e| {
        error!(error = %e, "Failed to list users");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

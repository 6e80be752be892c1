//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use mediarelay_core::{AuthError, AuthRequest, Identity};

use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware.
///
/// Runs the configured authenticator and stores the resulting [`Identity`]
/// in the request extensions for handlers that check roles.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_request = auth_request_from(&request);

    match state.authenticator().authenticate(&auth_request).await {
        Ok(identity) => {
            request.extensions_mut().insert::<Identity>(identity);
            Ok(next.run(request).await)
        }
        Err(err) => {
            let (label, status) = rejection(&err);
            AUTH_FAILURES_TOTAL.with_label_values(&[label]).inc();
            tracing::debug!(path = %request.uri().path(), error = %err, "Request rejected");
            Err(status)
        }
    }
}

fn auth_request_from(request: &Request<Body>) -> AuthRequest {
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_ascii_lowercase(), value.to_owned()))
        })
        .collect();

    let source_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    AuthRequest { headers, source_ip }
}

/// Metric label and status code for a failed authentication.
fn rejection(err: &AuthError) -> (&'static str, StatusCode) {
    match err {
        AuthError::NotAuthenticated => ("not_authenticated", StatusCode::UNAUTHORIZED),
        AuthError::InvalidCredentials(_) => ("invalid_credentials", StatusCode::UNAUTHORIZED),
        AuthError::Forbidden => ("forbidden", StatusCode::FORBIDDEN),
        AuthError::ConfigurationError(_) => ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    }
}

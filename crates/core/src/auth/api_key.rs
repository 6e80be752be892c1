//! API key authentication.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity, Role};

/// Validates requests against the transport key and, optionally, a separate
/// admin key.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
pub struct ApiKeyAuthenticator {
    transport_key: String,
    admin_key: Option<String>,
}

impl ApiKeyAuthenticator {
    /// Without an admin key the transport key grants admin access too.
    pub fn new(transport_key: String, admin_key: Option<String>) -> Self {
        Self {
            transport_key,
            admin_key: admin_key.filter(|k| !k.is_empty()),
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(header) = request.headers.get("authorization") {
            if let Some(key) = header
                .strip_prefix("Bearer ")
                .or_else(|| header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        request.headers.get("x-api-key").map(String::as_str)
    }

    fn identity(role: Role) -> Identity {
        Identity {
            subject: match role {
                Role::Transport => "transport".to_string(),
                Role::Admin => "admin".to_string(),
            },
            method: "api_key".to_string(),
            role,
        }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if let Some(admin_key) = &self.admin_key {
            if constant_time_eq(provided.as_bytes(), admin_key.as_bytes()) {
                return Ok(Self::identity(Role::Admin));
            }
        }

        if constant_time_eq(provided.as_bytes(), self.transport_key.as_bytes()) {
            let role = if self.admin_key.is_some() {
                Role::Transport
            } else {
                Role::Admin
            };
            return Ok(Self::identity(role));
        }

        Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

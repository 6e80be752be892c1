use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Admin access required")]
    Forbidden,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// What an authenticated caller may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The chat transport adapter: may submit conversions.
    Transport,
    /// Operator: may also read the users table.
    Admin,
}

/// Authenticated caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub subject: String,
    pub method: String,
    pub role: Role,
}

impl Identity {
    /// Identity used when authentication is disabled.
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            method: "none".to_string(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with `Forbidden` unless this identity is an admin.
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request and return the identity
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity_is_admin() {
        let identity = Identity::anonymous();
        assert_eq!(identity.subject, "anonymous");
        assert_eq!(identity.method, "none");
        assert!(identity.require_admin().is_ok());
    }

    #[test]
    fn test_transport_identity_is_not_admin() {
        let identity = Identity {
            subject: "transport".to_string(),
            method: "api_key".to_string(),
            role: Role::Transport,
        };
        assert!(matches!(identity.require_admin(), Err(AuthError::Forbidden)));

        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["role"], "transport");
    }
}

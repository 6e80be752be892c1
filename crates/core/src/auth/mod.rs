//! Authentication for the HTTP surface.
//!
//! The transport adapter and the operator authenticate with API keys; the
//! users table additionally requires the admin role.

mod api_key;
mod none;
mod types;

pub use api_key::ApiKeyAuthenticator;
pub use none::NoneAuthenticator;
pub use types::*;

use crate::config::{AuthConfig, AuthMethod};

/// Create the authenticator selected by the config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator)),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "api_key must be set when using ApiKey auth method".to_string(),
                )
            })?;
            Ok(Box::new(ApiKeyAuthenticator::new(
                api_key,
                config.admin_api_key.clone(),
            )))
        }
    }
}

use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - API key is present when the api_key auth method is selected
/// - Size ceilings are non-zero
/// - At least one video codec is configured
/// - The video note duration cap is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    let upload = &config.limits.upload;
    let limits = [
        ("limits.download", config.limits.download),
        ("limits.upload.audio", upload.audio),
        ("limits.upload.video", upload.video),
        ("limits.upload.video_note", upload.video_note),
        ("limits.upload.file", upload.file),
        ("limits.upload.photo", upload.photo),
        ("limits.upload.sticker", upload.sticker),
    ];
    for (name, value) in limits {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", name)));
        }
    }

    if config.media.video_codecs.is_empty() {
        return Err(ConfigError::ValidationError(
            "media.video_codecs cannot be empty".to_string(),
        ));
    }

    if config.media.video_note.max_duration_secs == 0 {
        return Err(ConfigError::ValidationError(
            "media.video_note.max_duration_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base() -> Config {
        load_config_from_str("[auth]\nmethod = \"none\"\n").unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = base();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_api_key_required() {
        let mut config = base();
        config.auth.method = AuthMethod::ApiKey;
        assert!(validate_config(&config).is_err());

        config.auth.api_key = Some("key".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_limit_fails() {
        let mut config = base();
        config.limits.upload.photo = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("limits.upload.photo"));
    }

    #[test]
    fn test_validate_empty_video_codecs_fails() {
        let mut config = base();
        config.media.video_codecs.clear();
        assert!(validate_config(&config).is_err());
    }
}

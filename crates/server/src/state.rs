use std::sync::Arc;
use mediarelay_core::{Authenticator, Config, Dispatcher, SanitizedConfig, Telemetry, UserStore};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    dispatcher: Arc<Dispatcher>,
    users: Arc<dyn UserStore>,
    telemetry: Arc<dyn Telemetry>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        dispatcher: Arc<Dispatcher>,
        users: Arc<dyn UserStore>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            config,
            authenticator,
            dispatcher,
            users,
            telemetry,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn telemetry(&self) -> Arc<dyn Telemetry> {
        Arc::clone(&self.telemetry)
    }
}

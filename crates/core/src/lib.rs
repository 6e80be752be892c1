pub mod auth;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod fetch;
pub mod link;
pub mod media;
pub mod metrics;
pub mod size_gate;
pub mod telemetry;
pub mod testing;
pub mod users;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator, Role,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, SanitizedConfig,
};
pub use converter::{ConverterConfig, ConverterError, FfmpegEngine, Prober, Transcoder};
pub use dispatcher::{
    Artifact, ArtifactKind, ChatKind, DispatchRequest, Dispatcher, DispatcherServices,
    FailureReason, Outcome,
};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use link::{LinkError, LinkResolver, ResolvedLink, YtDlpResolver};
pub use media::{
    AttachmentKind, AudioMode, FallbackChain, OutputType, RequestKind, SourceDescriptor, SourceRef,
};
pub use size_gate::{format_size, GateResult, SizeGate};
pub use telemetry::{AnalyticsKind, GoogleAnalytics, NoopTelemetry, Telemetry};
pub use users::{SqliteUserStore, User, UserStore, UserStoreError};

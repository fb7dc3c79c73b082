use crate::cloud::CloudLoggingHandler;
use crate::env::GOOGLE_CLOUD_PROJECT_ENV;
use crate::error::InitError;
use crate::layer::CloudLoggingLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the process-wide Cloud Logging subscriber.
///
/// **Fields**
/// - `project_id`: Google Cloud project used to expand `trace-id`
///   attributes into `projects/<project_id>/traces/<trace-id>`. Not
///   validated; an empty value yields `projects//traces/<trace-id>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CloudLoggingConfig {
    pub project_id: String,
}

impl CloudLoggingConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self { project_id: project_id.into() }
    }

    /// Build the configuration from `GOOGLE_CLOUD_PROJECT`.
    ///
    /// **Returns**
    /// - `Err(InitError::MissingProject)` if the variable is unset or not
    ///   valid unicode.
    pub fn from_env() -> Result<Self, InitError> {
        std::env::var(GOOGLE_CLOUD_PROJECT_ENV)
            .map(Self::new)
            .map_err(|_| InitError::MissingProject(GOOGLE_CLOUD_PROJECT_ENV))
    }
}

/// Layer writing Cloud Logging JSON to standard error, for composition with
/// other layers.
pub fn layer(config: &CloudLoggingConfig) -> CloudLoggingLayer<CloudLoggingHandler> {
    CloudLoggingLayer::new(CloudLoggingHandler::new(config.project_id.clone()))
}

/// Install a [`Registry`] combined with the Cloud Logging layer as the
/// global default subscriber.
///
/// **Returns**
/// - `Err(InitError::SetGlobalDefault)` if a global subscriber was already
///   installed.
pub fn try_init(config: &CloudLoggingConfig) -> Result<(), InitError> {
    let subscriber = Registry::default().with(layer(config));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing from the environment.
///
/// Equivalent to [`try_init`] with [`CloudLoggingConfig::from_env`]. This is
/// the recommended entrypoint for services running on Cloud Run or GKE.
pub fn try_init_from_env() -> Result<(), InitError> {
    try_init(&CloudLoggingConfig::from_env()?)
}

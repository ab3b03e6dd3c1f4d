use crate::adapters::{BuildApi, ReleaseApi};
use crate::channel::WebhookChannel;
use release_client::{BuildClient, ReleaseClient};
use shipgate_core::audit::AuditLog;
use shipgate_core::config::Config;
use shipgate_core::orchestrator::Orchestrator;
use shipgate_core::reply::{LogChannel, SharedChannel};
use shipgate_core::systems::{SharedBuildSystem, SharedReleaseSystem};
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Client used for webhook replies.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, http: reqwest::Client) -> Self {
        Self { orchestrator, http }
    }

    /// Wire the HTTP collaborators and the audit ledger from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = config.http.timeout();
        let release: SharedReleaseSystem = Arc::new(ReleaseApi(ReleaseClient::new(
            &config.release.url,
            &config.release.api_key,
            &config.release.space_id,
            timeout,
        )?));
        let builds: SharedBuildSystem = Arc::new(BuildApi {
            client: BuildClient::new(
                &config.build.url,
                &config.build.user,
                &config.build.token,
                &config.build.job,
                timeout,
            )?,
            callback_url: config.build.callback_url.clone(),
        });
        let audit = AuditLog::open(&config.audit.path)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_systems(config, release, builds, audit, http))
    }

    pub fn with_systems(
        config: &Config,
        release: SharedReleaseSystem,
        builds: SharedBuildSystem,
        audit: AuditLog,
        http: reqwest::Client,
    ) -> Self {
        let orchestrator = Orchestrator::new(config, release, builds, audit);
        Self::new(Arc::new(orchestrator), http)
    }

    /// Reply route for one request: the webhook when given, else the log.
    pub fn reply_channel(&self, reply_url: Option<&str>, conversation: &str) -> SharedChannel {
        match reply_url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Arc::new(WebhookChannel::new(self.http.clone(), url)),
            None => Arc::new(LogChannel {
                conversation: conversation.to_string(),
            }),
        }
    }
}

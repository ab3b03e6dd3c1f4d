use crate::error::{Result, ShipgateError};
use crate::resolver::ReleaseMatch;
use crate::types::Environment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ReleaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_space_id")]
    pub space_id: String,
    #[serde(default, rename = "match")]
    pub release_match: ReleaseMatch,
    #[serde(default = "default_release_page")]
    pub release_page_size: u32,
    #[serde(default = "default_deployment_page")]
    pub deployment_page_size: u32,
}

fn default_space_id() -> String {
    "Spaces-1".to_string()
}

fn default_release_page() -> u32 {
    100
}

fn default_deployment_page() -> u32 {
    50
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            space_id: default_space_id(),
            release_match: ReleaseMatch::default(),
            release_page_size: default_release_page(),
            deployment_page_size: default_deployment_page(),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_build_job")]
    pub job: String,
    /// Where the build system posts completion notifications.
    #[serde(default)]
    pub callback_url: String,
}

fn default_build_job() -> String {
    "build-pipeline".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            token: String::new(),
            job: default_build_job(),
            callback_url: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApprovalConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default = "default_required_environments")]
    pub required_environments: Vec<Environment>,
}

fn default_timeout_minutes() -> u64 {
    30
}

fn default_required_environments() -> Vec<Environment> {
    vec![Environment::Uat, Environment::Prod]
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            required_environments: default_required_environments(),
        }
    }
}

impl ApprovalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }
}

// ---------------------------------------------------------------------------
// AuditConfig / ServerConfig / HttpConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("audit.db")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3978
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Upper bound on every call to the release and build systems.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default = "default_environments")]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_environments() -> Vec<Environment> {
    Environment::all().to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            release: ReleaseConfig::default(),
            build: BuildConfig::default(),
            approval: ApprovalConfig::default(),
            environments: default_environments(),
            audit: AuditConfig::default(),
            server: ServerConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShipgateError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` when given, otherwise start from defaults. Environment
    /// variable overrides are applied in both cases.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Overlay endpoint, credential and timeout settings from the environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(v) = lookup(key) {
                *target = v;
            }
        };
        set(&mut self.release.url, "RELEASE_URL");
        set(&mut self.release.api_key, "RELEASE_API_KEY");
        set(&mut self.release.space_id, "RELEASE_SPACE_ID");
        set(&mut self.build.url, "BUILD_URL");
        set(&mut self.build.user, "BUILD_USER");
        set(&mut self.build.token, "BUILD_TOKEN");
        set(&mut self.build.job, "BUILD_JOB");
        set(&mut self.build.callback_url, "BOT_CALLBACK_URL");

        if let Some(v) = lookup("APPROVAL_TIMEOUT_MINUTES") {
            self.approval.timeout_minutes = v.trim().parse().map_err(|_| {
                ShipgateError::InvalidConfig(format!(
                    "APPROVAL_TIMEOUT_MINUTES must be a whole number of minutes, got '{v}'"
                ))
            })?;
        }
        if let Some(v) = lookup("RELEASE_MATCH") {
            self.release.release_match = v.trim().parse()?;
        }
        if let Some(v) = lookup("AUDIT_DB_PATH") {
            self.audit.path = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn is_valid_environment(&self, env: Environment) -> bool {
        self.environments.contains(&env)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.release.url.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "release.url is empty: deploy, rollback and status will fail".into(),
            });
        }
        if self.release.api_key.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "release.api_key is empty".into(),
            });
        }
        if self.build.url.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "build.url is empty: build commands will fail".into(),
            });
        }
        if self.approval.timeout_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "approval.timeout_minutes is 0: approvals expire immediately".into(),
            });
        }
        for env in &self.approval.required_environments {
            if !self.is_valid_environment(*env) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "approval.required_environments lists '{env}' which is not in environments"
                    ),
                });
            }
        }
        if self.environments.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "environments is empty: every deploy will be rejected".into(),
            });
        }
        if self.release.release_page_size == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "release.release_page_size is 0: no release can ever match".into(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Configuration for urlcast
//!
//! Resolved once at process start, either from a TOML file or from the
//! environment (function configuration keys are exposed as environment
//! variables by the hosting platform).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlcastConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub function: FunctionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_region() -> String {
    crate::DEFAULT_REGION.to_string()
}

impl Default for UrlcastConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            stream: StreamConfig::default(),
            auth: AuthConfig::default(),
            function: FunctionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl UrlcastConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; keys that are set but unparsable are
    /// rejected instead of silently ignored.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(region) = lookup("REGION").filter(|r| !r.is_empty()) {
            config.region = region;
        }
        if let Some(id) = lookup("STREAM_OCID") {
            config.stream.stream_id = id;
        }
        if let Some(endpoint) = lookup("STREAM_ENDPOINT") {
            config.stream.endpoint = endpoint;
        }
        if let Some(secs) = lookup("PUBLISH_TIMEOUT_SECS") {
            config.stream.timeout_secs = secs.parse().map_err(|_| {
                crate::Error::Config(format!("PUBLISH_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }

        if let Some(mode) = lookup("URLCAST_AUTH_MODE") {
            config.auth.mode = mode.parse()?;
        }
        if let Some(path) = lookup("OCI_CONFIG_FILE") {
            config.auth.config_file = Some(PathBuf::from(path));
        }
        if let Some(profile) = lookup("OCI_PROFILE") {
            config.auth.profile = profile;
        }

        if let Some(listener) = lookup("FN_LISTENER") {
            config.function.listener = Some(listener);
        }
        if let Some(policy) = lookup("URLCAST_PUBLISH_FAILURE") {
            config.function.publish_failure = policy.parse()?;
        }

        if let Some(level) = lookup("URLCAST_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("URLCAST_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.region.trim().is_empty() {
            return Err(crate::Error::Config("region must not be empty".into()));
        }
        self.stream.validate()
    }
}

/// Target stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream identifier (OCID)
    #[serde(default)]
    pub stream_id: String,
    /// Messages endpoint of the stream pool
    #[serde(default)]
    pub endpoint: String,
    /// Upper bound for a single publish, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connection establishment bound, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream_id: String::new(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl StreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.stream_id.trim().is_empty() {
            return Err(crate::Error::Config(
                "stream_id not specified (set STREAM_OCID)".into(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(crate::Error::Config(
                "endpoint not specified (set STREAM_ENDPOINT)".into(),
            ));
        }

        let endpoint = url::Url::parse(&self.endpoint).map_err(|e| {
            crate::Error::Config(format!("Invalid stream endpoint {:?}: {}", self.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "https" | "http") {
            return Err(crate::Error::Config(format!(
                "Stream endpoint must be http(s): {}",
                self.endpoint
            )));
        }
        if endpoint.host_str().is_none() {
            return Err(crate::Error::Config(format!(
                "Stream endpoint has no host: {}",
                self.endpoint
            )));
        }

        if self.timeout_secs == 0 {
            return Err(crate::Error::Config("timeout_secs must be positive".into()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "connect_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Where signing credentials come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Platform-provided resource principal (inside a function)
    #[default]
    ResourcePrincipal,
    /// User API key from the CLI config file (local runs)
    ApiKey,
}

impl FromStr for AuthMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "resource_principal" => Ok(Self::ResourcePrincipal),
            "api_key" => Ok(Self::ApiKey),
            other => Err(crate::Error::Config(format!("Unknown auth mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// CLI config file, `~/.oci/config` when unset
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    /// Profile within the CLI config file
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_profile() -> String {
    "DEFAULT".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            config_file: None,
            profile: default_profile(),
        }
    }
}

/// What an invocation does when the publish side effect fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Log the failure and still return the URL
    #[default]
    Log,
    /// Fail the invocation
    Fail,
}

impl FromStr for PublishFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "fail" => Ok(Self::Fail),
            other => Err(crate::Error::Config(format!(
                "Unknown publish failure policy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Runtime listener address, e.g. `unix:/tmp/iofs/lsnr.sock`
    #[serde(default)]
    pub listener: Option<String>,
    #[serde(default)]
    pub publish_failure: PublishFailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

//! Configuration system for techscout.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> CLI overrides. Configuration is
//! loaded from `~/.config/techscout/config.toml` and/or
//! `.techscout/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default organization name used in the summary prompt and artifacts.
pub const DEFAULT_ORGANIZATION: &str = "Your Organization";

/// Default model for both the direct client and the gateway.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechScoutConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl TechScoutConfig {
    /// Validate the whole configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for w in self.llm.validate() {
            warnings.push(format!("[llm] {}", w));
        }
        for w in self.research.validate() {
            warnings.push(format!("[research] {}", w));
        }
        for w in self.gateway.validate() {
            warnings.push(format!("[gateway] {}", w));
        }
        warnings
    }
}

/// Text-generation service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "anthropic" (direct) or "gateway" (proxied).
    pub provider: String,
    /// Model identifier (e.g., "claude-sonnet-4-20250514").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key. Never written back out by `config show`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Optional base URL override for the Messages API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Endpoint of the proxy gateway when `provider = "gateway"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            gateway_url: None,
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !matches!(self.provider.as_str(), "anthropic" | "gateway") {
            warnings.push(format!(
                "unknown provider '{}' (expected 'anthropic' or 'gateway')",
                self.provider
            ));
        }
        if self.provider == "gateway" && self.gateway_url.is_none() {
            warnings.push("provider is 'gateway' but gateway_url is not set".to_string());
        }
        if self.request_timeout_secs == 0 {
            warnings.push("request_timeout_secs is 0; every request will time out".to_string());
        }
        if self.connect_timeout_secs > self.request_timeout_secs {
            warnings.push(format!(
                "connect_timeout_secs ({}) exceeds request_timeout_secs ({})",
                self.connect_timeout_secs, self.request_timeout_secs
            ));
        }

        warnings
    }

    /// Resolve the API credential: inline `api_key` first, then the
    /// environment variable named by `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential {
                var: self.api_key_env.clone(),
            }),
        }
    }
}

/// Format of the executive-summary document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Svg,
    Pdf,
}

/// Research pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Organization the analysis is written for. Falls back to the stored
    /// settings, then to "Your Organization".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    /// Upper bound on a single phase's generation call.
    pub phase_timeout_secs: u64,
    /// Directory the CLI writes artifacts into.
    pub output_dir: PathBuf,
    pub document_format: DocumentFormat,
    /// Directory holding the TrueType fonts used for PDF documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_dir: Option<PathBuf>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            organization_name: None,
            phase_timeout_secs: 180,
            output_dir: PathBuf::from("research-output"),
            document_format: DocumentFormat::Svg,
            font_dir: None,
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.phase_timeout_secs == 0 {
            warnings.push("phase_timeout_secs is 0; every phase will time out".to_string());
        }
        if self.phase_timeout_secs > 1800 {
            warnings.push(format!(
                "phase_timeout_secs is {} (>30 minutes); this is unusually large",
                self.phase_timeout_secs
            ));
        }
        if self.document_format == DocumentFormat::Pdf {
            if !cfg!(feature = "pdf") {
                warnings.push(
                    "document_format is 'pdf' but this build lacks the 'pdf' feature; SVG will be used"
                        .to_string(),
                );
            } else if self.font_dir.is_none() {
                warnings.push("document_format is 'pdf' but font_dir is not set".to_string());
            }
        }
        if let Some(org) = &self.organization_name {
            if org.trim().is_empty() {
                warnings.push("organization_name is blank; the default will be used".to_string());
            }
        }

        warnings
    }
}

/// Where settings, history, and logs live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Override for the data directory. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The effective data directory.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".techscout"))
    }
}

/// Proxy gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Socket address the gateway listens on.
    pub bind: String,
    /// Path of the completion endpoint.
    pub route: String,
    /// Value of `Access-Control-Allow-Origin`.
    pub allowed_origin: String,
    /// `maxTokens` used when the caller omits it.
    pub default_max_tokens: u32,
    /// `temperature` used when the caller omits it.
    pub default_temperature: f32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            route: "/api/generate".to_string(),
            allowed_origin: "*".to_string(),
            default_max_tokens: 4000,
            default_temperature: 0.3,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.route.starts_with('/') {
            warnings.push(format!("route '{}' should start with '/'", self.route));
        }
        if !(0.0..=1.0).contains(&self.default_temperature) {
            warnings.push(format!(
                "default_temperature {} is outside [0, 1]",
                self.default_temperature
            ));
        }
        if self.bind.parse::<std::net::SocketAddr>().is_err() {
            warnings.push(format!("bind '{}' is not a socket address", self.bind));
        }
        warnings
    }
}

/// Explicit overrides applied on top of every other configuration layer.
///
/// Only the fields that are `Some` are merged.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub gateway_url: Option<String>,
    pub organization_name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub bind: Option<String>,
}

impl ConfigOverrides {
    fn to_value(&self) -> serde_json::Value {
        let mut llm = serde_json::Map::new();
        if let Some(provider) = &self.provider {
            llm.insert("provider".into(), provider.clone().into());
        }
        if let Some(model) = &self.model {
            llm.insert("model".into(), model.clone().into());
        }
        if let Some(url) = &self.gateway_url {
            llm.insert("gateway_url".into(), url.clone().into());
        }

        let mut research = serde_json::Map::new();
        if let Some(org) = &self.organization_name {
            research.insert("organization_name".into(), org.clone().into());
        }
        if let Some(dir) = &self.output_dir {
            research.insert(
                "output_dir".into(),
                dir.to_string_lossy().into_owned().into(),
            );
        }

        let mut gateway = serde_json::Map::new();
        if let Some(bind) = &self.bind {
            gateway.insert("bind".into(), bind.clone().into());
        }

        let mut root = serde_json::Map::new();
        for (key, table) in [("llm", llm), ("research", research), ("gateway", gateway)] {
            if !table.is_empty() {
                root.insert(key.into(), serde_json::Value::Object(table));
            }
        }
        serde_json::Value::Object(root)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "techscout", "techscout")
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from all layers.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<TechScoutConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(TechScoutConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".techscout").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (TECHSCOUT_LLM__MODEL, TECHSCOUT_RESEARCH__PHASE_TIMEOUT_SECS, etc.)
    figment = figment.merge(Env::prefixed("TECHSCOUT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides.to_value()));
    }

    figment.extract().map_err(|e| ConfigError::Load {
        message: e.to_string(),
    })
}

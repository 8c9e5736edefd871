//! Configuration management for ragchat.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.ragchat/config.yaml` or `RAGCHAT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Settings that change per conversation (model, category filter, toggles)
//! are not stored here; they live in the session settings of a conversation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the completion client can be built for.
pub const KNOWN_PROVIDERS: [&str; 2] = ["cortex", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion provider ("cortex" or "ollama")
    pub provider: String,

    /// Default model name for new conversations
    pub model: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Search service settings
    pub search: SearchConfig,

    /// Conversation settings
    pub chat: ChatConfig,

    /// Local Ollama settings
    pub ollama: OllamaConfig,
}

/// Cortex Search / Snowflake account settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Account URL, e.g. `https://myorg-myaccount.snowflakecomputing.com`
    #[serde(rename = "accountUrl", default)]
    pub account_url: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    /// Name of the Cortex Search service
    #[serde(default)]
    pub service: Option<String>,

    /// Environment variable holding the bearer token
    #[serde(rename = "tokenEnv", default = "default_token_env")]
    pub token_env: String,

    /// Number of passages retrieved per question
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Optional HTTP timeout; unset leaves timeouts to the service
    #[serde(rename = "timeoutSecs", default)]
    pub timeout_secs: Option<u64>,
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of prior turns considered when rewriting a follow-up question
    #[serde(rename = "windowSize", default = "default_window_size")]
    pub window_size: usize,

    /// Relevance gate threshold; answers are attempted when the mean score
    /// is strictly greater than this value
    #[serde(default)]
    pub threshold: f32,
}

/// Local Ollama settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Ollama tag used for every request. Unset maps the Cortex model id
    /// to its Ollama tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_token_env() -> String {
    "SNOWFLAKE_TOKEN".to_string()
}

fn default_limit() -> usize {
    5
}

fn default_window_size() -> usize {
    7
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            account_url: None,
            database: None,
            schema: None,
            service: None,
            token_env: default_token_env(),
            limit: default_limit(),
            timeout_secs: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            threshold: 0.0,
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    provider: Option<String>,
    model: Option<String>,
    search: Option<SearchConfig>,
    chat: Option<ChatConfig>,
    ollama: Option<OllamaConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "cortex".to_string(),
            model: "mistral-large2".to_string(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
            search: SearchConfig::default(),
            chat: ChatConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file, and the environment.
    ///
    /// Environment variables:
    /// - `RAGCHAT_WORKSPACE`, `RAGCHAT_CONFIG`
    /// - `RAGCHAT_PROVIDER`, `RAGCHAT_MODEL`, `RAGCHAT_OLLAMA_MODEL`
    /// - `SNOWFLAKE_ACCOUNT_URL`, `SNOWFLAKE_DATABASE`, `SNOWFLAKE_SCHEMA`,
    ///   `SNOWFLAKE_CORTEX_SEARCH_SERVICE`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use ragchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and config file.
    ///
    /// Explicit paths take precedence over `RAGCHAT_WORKSPACE` and
    /// `RAGCHAT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let env_path = |name: &str| std::env::var(name).ok().map(PathBuf::from);

        if let Some(workspace) = workspace.or_else(|| env_path("RAGCHAT_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("RAGCHAT_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.ragchat_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        config.apply_env();

        Ok(config)
    }

    /// Environment variables override the YAML config.
    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("RAGCHAT_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("RAGCHAT_MODEL") {
            self.model = model;
        }

        if let Ok(model) = std::env::var("RAGCHAT_OLLAMA_MODEL") {
            self.ollama.model = Some(model);
        }

        if let Ok(url) = std::env::var("SNOWFLAKE_ACCOUNT_URL") {
            self.search.account_url = Some(url);
        }

        if let Ok(database) = std::env::var("SNOWFLAKE_DATABASE") {
            self.search.database = Some(database);
        }

        if let Ok(schema) = std::env::var("SNOWFLAKE_SCHEMA") {
            self.search.schema = Some(schema);
        }

        if let Ok(service) = std::env::var("SNOWFLAKE_CORTEX_SEARCH_SERVICE") {
            self.search.service = Some(service);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merged_with(config_file))
    }

    fn merged_with(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(provider) = file.provider {
            result.provider = provider;
        }
        if let Some(model) = file.model {
            result.model = model;
        }
        if let Some(search) = file.search {
            result.search = search;
        }
        if let Some(chat) = file.chat {
            result.chat = chat;
        }
        if let Some(ollama) = file.ollama {
            result.ollama = ollama;
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .ragchat directory.
    pub fn ragchat_dir(&self) -> PathBuf {
        self.workspace.join(".ragchat")
    }

    /// Ensure the .ragchat directory exists.
    pub fn ensure_ragchat_dir(&self) -> AppResult<()> {
        let dir = self.ragchat_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .ragchat directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the search service bearer token from the environment.
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var(&self.search.token_env).ok()
    }

    /// Validate settings that do not depend on the network.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.search.limit == 0 {
            return Err(AppError::Config(
                "search.limit must be a positive integer".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.chat.threshold) {
            return Err(AppError::Config(format!(
                "chat.threshold must be in [0, 1), got {}",
                self.chat.threshold
            )));
        }

        Ok(())
    }

    /// Validate that everything needed to reach Cortex Search is present.
    pub fn validate_search(&self) -> AppResult<()> {
        let missing: Vec<&str> = [
            ("search.accountUrl", &self.search.account_url),
            ("search.database", &self.search.database),
            ("search.schema", &self.search.schema),
            ("search.service", &self.search.service),
        ]
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "Missing search settings: {}",
                missing.join(", ")
            )));
        }

        if self.resolve_token().is_none() {
            return Err(AppError::Config(format!(
                "Search token not found in environment variable: {}",
                self.search.token_env
            )));
        }

        Ok(())
    }
}

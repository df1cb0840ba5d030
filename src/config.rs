use crate::llm::CompletionSettings;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Config file picked up from the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "BIND_HOST")]
    pub host: Option<String>,

    /// Stored prompt template identifier
    #[arg(long, env = "LLM_PROMPT_ID")]
    pub prompt_id: Option<String>,

    /// Seconds to wait for a completion before giving up
    #[arg(long, env = "LLM_TIMEOUT_SECS")]
    pub completion_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub completion: CompletionConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub prompt_id: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("prompt_id", &self.prompt_id)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("completion.base_url", "https://api.openai.com")?
            .set_default("completion.prompt_id", "")?
            .set_default("completion.timeout_secs", 60)?
            .set_default("session.cookie_name", "chat_session")?
            .set_default("session.idle_timeout_secs", 30 * 60)?
            .set_default("session.sweep_interval_secs", 60)?
            .set_default("logging.format", "compact")?;

        // 2. Config file: explicit path must exist, the CWD fallback is optional
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));
        }

        // 3. Environment variables prefixed with CHAT_, e.g. CHAT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. Well-known provider variables
        if let Ok(val) = env::var("OPENAI_API_KEY")
            && !val.trim().is_empty()
        {
            builder = builder.set_override("completion.api_key", val)?;
        }
        if let Ok(val) = env::var("LLM_BASE_URL") {
            builder = builder.set_override("completion.base_url", val)?;
        }
        if let Ok(val) = env::var("LLM_MODEL") {
            builder = builder.set_override("completion.model", val)?;
        }

        // 5. CLI flags (and their env fallbacks via clap) win
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(prompt_id) = cli.prompt_id {
            builder = builder.set_override("completion.prompt_id", prompt_id)?;
        }
        if let Some(secs) = cli.completion_timeout_secs {
            builder = builder.set_override("completion.timeout_secs", secs)?;
        }
        if let Some(json) = cli.log_json {
            builder =
                builder.set_override("logging.format", if json { "json" } else { "compact" })?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.completion.base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "completion.base_url cannot be empty".to_string(),
            ));
        }
        if self.completion.timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "completion.timeout_secs must be positive".to_string(),
            ));
        }
        if self.session.idle_timeout_secs <= self.completion.timeout_secs {
            return Err(config::ConfigError::Message(format!(
                "session.idle_timeout_secs ({}) must exceed completion.timeout_secs ({})",
                self.session.idle_timeout_secs, self.completion.timeout_secs
            )));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "session.sweep_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for the completion client.
    ///
    /// Fails when no prompt template is configured, since every request
    /// needs one.
    pub fn completion_settings(&self) -> Result<CompletionSettings, config::ConfigError> {
        let prompt_id = self.completion.prompt_id.trim();
        if prompt_id.is_empty() {
            return Err(config::ConfigError::Message(
                "Missing prompt template id: set LLM_PROMPT_ID or completion.prompt_id"
                    .to_string(),
            ));
        }

        Ok(CompletionSettings {
            base_url: self.completion.base_url.clone(),
            api_key: self
                .completion
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            prompt_id: prompt_id.to_string(),
            model: self
                .completion
                .model
                .clone()
                .filter(|m| !m.trim().is_empty()),
            timeout: self.completion_timeout(),
        })
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion.timeout_secs)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session.idle_timeout_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs)
    }
}

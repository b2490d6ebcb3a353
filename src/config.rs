use std::path::Path;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::chat::ChatSettings;
use crate::chat::service::{DEFAULT_COMPANY_ID, DEFAULT_FALLBACK_REPLY};
use crate::quiz::QuizPolicy;

/// Prefix of environment variables read by the config layer
/// (`AGENCY_SERVER__PORT=8000`).
pub const ENV_PREFIX: &str = "AGENCY";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the chat service
    #[arg(long, env = "CHAT_API_URL")]
    pub chat_api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: Option<bool>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub quiz: QuizConfig,
    pub session: SessionConfig,
    pub resilience: ResilienceConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static`.
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    pub api_base_url: String,
    pub default_company_id: String,
    pub fallback_reply: String,
    pub typewriter_interval_ms: u64,
    /// Total timeout of one outbound chat request.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuizConfig {
    pub require_answers: bool,
    /// YAML question bank; the built-in questions are used when unset.
    pub questions_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub timeout_disabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    pub metrics_enabled: bool,
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
            .set_default("server.static_dir", "static")?
            .set_default("chat.api_base_url", "http://localhost:8080")?
            .set_default("chat.default_company_id", DEFAULT_COMPANY_ID)?
            .set_default("chat.fallback_reply", DEFAULT_FALLBACK_REPLY)?
            .set_default("chat.typewriter_interval_ms", 20)?
            .set_default("chat.request_timeout_secs", 30)?
            .set_default("quiz.require_answers", true)?
            .set_default("session.ttl_secs", 30 * 60)?
            .set_default("session.sweep_interval_secs", 60)?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.requests_per_second", 5)?
            .set_default("resilience.burst_size", 10)?
            .set_default("resilience.request_timeout_secs", 30)?
            .set_default("telemetry.json_logs", false)?
            .set_default("telemetry.metrics_enabled", true)?;

        // 2. Config file: an explicit path must exist, ./config.* is optional
        builder = match &cli.config {
            Some(path) => builder.add_source(File::from(Path::new(path)).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // 3. Environment (AGENCY_CHAT__API_BASE_URL=...)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags and their plain env aliases win
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(url) = cli.chat_api_url {
            builder = builder.set_override("chat.api_base_url", url)?;
        }
        if let Some(json) = cli.json_logs {
            builder = builder.set_override("telemetry.json_logs", json)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }

        let cfg = builder.build()?;
        let config: Self = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.chat.api_base_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "chat.api_base_url cannot be empty".into(),
            ));
        }
        if self.chat.typewriter_interval_ms == 0 {
            return Err(config::ConfigError::Message(
                "chat.typewriter_interval_ms must be positive".into(),
            ));
        }
        if self.chat.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "chat.request_timeout_secs must be positive".into(),
            ));
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "session.sweep_interval_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Widget settings derived from the `chat` section.
    #[must_use]
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            fallback_reply: self.chat.fallback_reply.clone(),
            typewriter_interval: Duration::from_millis(self.chat.typewriter_interval_ms),
            default_company_id: self.chat.default_company_id.clone(),
        }
    }

    /// Wizard guards derived from the `quiz` section.
    #[must_use]
    pub fn quiz_policy(&self) -> QuizPolicy {
        QuizPolicy {
            require_answers: self.quiz.require_answers,
        }
    }

    #[must_use]
    pub fn chat_request_timeout(&self) -> Duration {
        Duration::from_secs(self.chat.request_timeout_secs)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session.sweep_interval_secs)
    }

    /// Handler timeout, `None` when disabled.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (!self.resilience.timeout_disabled)
            .then(|| Duration::from_secs(self.resilience.request_timeout_secs))
    }
}

impl Default for AppConfig {
    /// The built-in defaults, without reading files, env, or arguments.
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".into(),
                static_dir: "static".into(),
            },
            chat: ChatConfig {
                api_base_url: "http://localhost:8080".into(),
                default_company_id: DEFAULT_COMPANY_ID.into(),
                fallback_reply: DEFAULT_FALLBACK_REPLY.into(),
                typewriter_interval_ms: 20,
                request_timeout_secs: 30,
            },
            quiz: QuizConfig {
                require_answers: true,
                questions_file: None,
            },
            session: SessionConfig {
                ttl_secs: 30 * 60,
                sweep_interval_secs: 60,
            },
            resilience: ResilienceConfig {
                rate_limit_enabled: true,
                timeout_disabled: false,
                requests_per_second: 5,
                burst_size: 10,
                request_timeout_secs: 30,
            },
            telemetry: TelemetryConfig {
                json_logs: false,
                metrics_enabled: true,
            },
        }
    }
}

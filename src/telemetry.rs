//! Shared logging bootstrap for the generator binaries.
//!
//! Standard output carries the generated query, so every log line goes to
//! standard error.

use crate::{Error, Result};

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const ENV_SERVICE_NAME: &str = "CLIENTS_DAILY_SERVICE_NAME";
const ENV_RUN_ID: &str = "CLIENTS_DAILY_RUN_ID";
const ENV_LOG_FORMAT: &str = "CLIENTS_DAILY_LOG_FORMAT";

/// Log line encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Text => "text",
        }
    }
}

/// Parsed telemetry configuration from environment.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub run_id: Option<String>,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn from_env(default_service_name: &str) -> Result<Self> {
        let service_name =
            std::env::var(ENV_SERVICE_NAME).unwrap_or_else(|_| default_service_name.to_string());
        let service_name = service_name.trim();
        if service_name.is_empty() {
            return Err(Error::Config(format!("{ENV_SERVICE_NAME} cannot be empty")));
        }

        let run_id = std::env::var(ENV_RUN_ID)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let format = match std::env::var(ENV_LOG_FORMAT) {
            Ok(raw) => parse_log_format(&raw)?,
            Err(_) => LogFormat::Json,
        };

        Ok(Self {
            service_name: service_name.to_string(),
            run_id,
            format,
        })
    }
}

/// Handle describing the installed subscriber.
pub struct Telemetry {
    config: TelemetryConfig,
}

impl Telemetry {
    /// Install the global tracing subscriber for a binary.
    pub fn init_for_component(default_service_name: &str, log_level: &str) -> Result<Self> {
        let config = TelemetryConfig::from_env(default_service_name)?;
        let level = parse_log_level(log_level)?;

        let builder = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_writer(std::io::stderr);
        let installed = match config.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Text => builder.try_init(),
        };
        installed.map_err(|e| {
            Error::Config(format!("failed to initialize telemetry subscriber: {e}"))
        })?;

        info!(
            service_name = %config.service_name,
            log_format = config.format.as_str(),
            run_id = %config.run_id.as_deref().unwrap_or("none"),
            "Telemetry bootstrap initialized"
        );

        Ok(Self { config })
    }

    /// Run id attached to every run's log lines, `"none"` when unset
    pub fn run_id(&self) -> &str {
        self.config.run_id.as_deref().unwrap_or("none")
    }
}

fn parse_log_level(raw: &str) -> Result<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(Error::Config(format!(
            "invalid log level '{other}', expected one of [trace, debug, info, warn, error]"
        ))),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "text" | "plain" => Ok(LogFormat::Text),
        other => Err(Error::Config(format!(
            "{ENV_LOG_FORMAT} must be one of [json, text], got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_level_accepts_any_case() {
        assert_eq!(parse_log_level(" WARN ").unwrap(), Level::WARN);
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
    }

    #[test]
    fn parse_log_level_rejects_unknown_levels() {
        let err = parse_log_level("verbose").unwrap_err();
        assert!(format!("{err}").contains("verbose"));
    }

    #[test]
    fn parse_log_format_values() {
        assert_eq!(parse_log_format("json").unwrap(), LogFormat::Json);
        assert_eq!(parse_log_format("Text").unwrap(), LogFormat::Text);
        let err = parse_log_format("xml").unwrap_err();
        assert!(format!("{err}").contains(ENV_LOG_FORMAT));
    }
}

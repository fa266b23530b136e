use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::capture::SpanCapture;

static INIT: Once = Once::new();

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Options for [`try_init`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Also record closed spans here. Unaffected by the log filter.
    pub capture: Option<SpanCapture>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            format: LogFormat::Text,
            default_filter: "info".to_string(),
            capture: None,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_capture(mut self, capture: SpanCapture) -> Self {
        self.capture = Some(capture);
        self
    }
}

/// Install the global subscriber with text output and an `info` default.
///
/// Only the first call in a process has any effect.
pub fn init_telemetry(service_name: &str) {
    INIT.call_once(|| {
        let _ = install(&TelemetryConfig::new(service_name));
    });
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over `config.default_filter`.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn try_init(config: &TelemetryConfig) -> Result<(), TryInitError> {
    install(config)
}

fn install(config: &TelemetryConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Text => {
            tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr).boxed()
        }
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .with(config.capture.as_ref().map(SpanCapture::layer))
        .try_init()?;

    tracing::debug!(service = %config.service_name, format = ?config.format, "telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_text_at_info() {
        let config = TelemetryConfig::new("docchat");
        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.default_filter, "info");
        assert!(config.capture.is_none());
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = TelemetryConfig::new("docchat")
            .with_format(LogFormat::Json)
            .with_default_filter("docchat_rag=debug")
            .with_capture(SpanCapture::new());
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_filter, "docchat_rag=debug");
        assert!(config.capture.is_some());
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init_telemetry("docchat-test");
        init_telemetry("docchat-test");
        assert!(try_init(&TelemetryConfig::new("docchat-test")).is_err());
    }
}

//! Logging setup
//!
//! Text or JSON output via tracing-subscriber, always on stderr so stdout
//! stays free for command output (`status --json`).
//!
//! ## Environment Variables
//!
//! * `MBX_LOG` - filter directive (`debug`, `mbx_core=trace`, ...)
//! * `RUST_LOG` - fallback filter when `MBX_LOG` is unset
//! * `MBX_LOG_FORMAT` - `json` for structured output, anything else for text
//! * `MBX_LOG_SPAN_EVENTS` - comma separated span events (`new`, `close`, `full`, ...)

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to text
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Initialize the global subscriber. Later calls are no-ops.
///
/// `format` and `level` come from CLI flags and win over the environment.
///
/// ```rust
/// use mbx_core::logging;
///
/// logging::init(Some("json"), Some("debug")).expect("logging");
/// ```
pub fn init(format: Option<&str>, level: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter(level);

        let env_format = std::env::var("MBX_LOG_FORMAT").ok();
        let effective_format = LogFormat::parse(format.or(env_format.as_deref()).unwrap_or("text"));
        let span_events = span_events_for_format(
            effective_format,
            std::env::var("MBX_LOG_SPAN_EVENTS").ok().as_deref(),
        );

        match effective_format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_span_events(span_events)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            LogFormat::Text => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .with_target(false)
                            .with_span_events(span_events)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {:?}", effective_format);
    });

    Ok(())
}

/// Filter precedence: explicit level, then `MBX_LOG`, then `RUST_LOG`, then `info`
fn create_env_filter(level: Option<&str>) -> EnvFilter {
    let spec = level
        .map(str::to_string)
        .or_else(|| std::env::var("MBX_LOG").ok());

    match spec {
        Some(spec) => EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            eprintln!("Invalid log filter '{}', using 'info'", spec);
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Span lifecycle events; text stays quiet unless asked, JSON records open and close
fn span_events_for_format(format: LogFormat, raw: Option<&str>) -> FmtSpan {
    if let Some(raw) = raw {
        let mut acc = FmtSpan::NONE;
        for token in raw.split(&[',', '|'][..]).map(|t| t.trim().to_lowercase()) {
            acc |= match token.as_str() {
                "new" => FmtSpan::NEW,
                "close" => FmtSpan::CLOSE,
                "enter" => FmtSpan::ENTER,
                "exit" => FmtSpan::EXIT,
                "active" => FmtSpan::ACTIVE,
                "full" => FmtSpan::FULL,
                _ => FmtSpan::NONE,
            };
        }
        return acc;
    }

    match format {
        LogFormat::Json => FmtSpan::NEW | FmtSpan::CLOSE,
        LogFormat::Text => FmtSpan::NONE,
    }
}

pub fn is_initialized() -> bool {
    INIT.is_completed()
}

//! Structured logging on top of `tracing`.
//!
//! [`init`] installs the global subscriber. [`Logger`] tags every event with a
//! namespace and subject. [`JournalFormat`] renders events as single
//! `KEY=value` lines that journald and similar collectors can split without a
//! parser.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{EdgeKitError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const NAMESPACE_FIELD: &str = "log_namespace";
const SUBJECT_FIELD: &str = "log_subject";
const SEVERITY_FIELD: &str = "severity";

/// Install the global subscriber. `RUST_LOG` takes precedence over `config.level`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EdgeKitError::Logging(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Journal => registry
            .with(tracing_subscriber::fmt::layer().event_format(JournalFormat))
            .try_init(),
    };

    result.map_err(|e| EdgeKitError::Logging(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger bound to a namespace and subject.
///
/// Both values travel as `log_namespace` / `log_subject` fields on each event,
/// which [`JournalFormat`] turns into `LOG_NAMESPACE=` / `LOG_SUBJECT=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    namespace: String,
    subject: String,
}

impl Logger {
    pub fn new(namespace: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            subject: subject.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        let severity = level.as_str();
        let namespace = self.namespace.as_str();
        let subject = self.subject.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(
                log_namespace = namespace,
                log_subject = subject,
                severity,
                "{}",
                message
            ),
            LogLevel::Info => tracing::info!(
                log_namespace = namespace,
                log_subject = subject,
                severity,
                "{}",
                message
            ),
            LogLevel::Warn => tracing::warn!(
                log_namespace = namespace,
                log_subject = subject,
                severity,
                "{}",
                message
            ),
            // tracing has no level above ERROR; the severity field keeps them apart.
            LogLevel::Error | LogLevel::Critical => tracing::error!(
                log_namespace = namespace,
                log_subject = subject,
                severity,
                "{}",
                message
            ),
        }
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message)
    }

    pub fn critical(&self, message: impl fmt::Display) {
        self.log(LogLevel::Critical, message)
    }
}

/// Event formatter producing
/// `LOG_NAMESPACE=.. LOG_SUBJECT=.. LEVEL=.. TIMESTAMP=.. MESSAGE=".."`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JournalFormat;

impl<S, N> FormatEvent<S, N> for JournalFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = JournalFields::default();
        event.record(&mut fields);
        let line = fields.render(event.metadata().level(), Utc::now());
        writeln!(writer, "{}", line)
    }
}

#[derive(Debug, Default)]
struct JournalFields {
    namespace: Option<String>,
    subject: Option<String>,
    severity: Option<String>,
    message: String,
    extra: Vec<(String, String)>,
}

impl JournalFields {
    fn render(&self, level: &Level, timestamp: DateTime<Utc>) -> String {
        let mut line = String::new();
        if let Some(ns) = &self.namespace {
            let _ = write!(line, "LOG_NAMESPACE={} ", ns);
        }
        if let Some(subject) = &self.subject {
            let _ = write!(line, "LOG_SUBJECT={} ", subject);
        }
        let level = self
            .severity
            .clone()
            .unwrap_or_else(|| level.to_string());
        let _ = write!(
            line,
            "LEVEL={} TIMESTAMP={} MESSAGE={:?}",
            level,
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.message
        );
        for (key, value) in &self.extra {
            let _ = write!(line, " {}={}", key, value);
        }
        line
    }
}

impl Visit for JournalFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            NAMESPACE_FIELD => self.namespace = Some(value.to_string()),
            SUBJECT_FIELD => self.subject = Some(value.to_string()),
            SEVERITY_FIELD => self.severity = Some(value.to_string()),
            "message" => self.message = value.to_string(),
            name => self.extra.push((name.to_string(), value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn capture_journal<F: FnOnce()>(f: F) -> Vec<String> {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .event_format(JournalFormat)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        capture.lines()
    }

    #[test]
    fn render_full_line() {
        let fields = JournalFields {
            namespace: Some("edge".into()),
            subject: Some("sensor".into()),
            severity: Some("INFO".into()),
            message: "reading \"ok\"".into(),
            extra: vec![("unit".into(), "celsius".into())],
        };
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            fields.render(&Level::INFO, ts),
            "LOG_NAMESPACE=edge LOG_SUBJECT=sensor LEVEL=INFO TIMESTAMP=2024-05-01T12:30:00Z MESSAGE=\"reading \\\"ok\\\"\" unit=celsius"
        );
    }

    #[test]
    fn logger_emits_namespace_and_subject() {
        let logger = Logger::new("edge", "pump");
        let lines = capture_journal(|| {
            logger.info(format_args!("started in {}ms", 12));
            logger.debug("tick");
        });

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("LOG_NAMESPACE=edge LOG_SUBJECT=pump LEVEL=INFO TIMESTAMP="));
        assert!(lines[0].ends_with("MESSAGE=\"started in 12ms\""));
        assert!(lines[1].contains("LEVEL=DEBUG"));
    }

    #[test]
    fn critical_is_reported_distinctly() {
        let logger = Logger::new("edge", "pump");
        let lines = capture_journal(|| {
            logger.error("failed");
            logger.critical("overheated");
        });

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("LEVEL=ERROR"));
        assert!(lines[1].contains("LEVEL=CRITICAL"));
        assert!(lines[1].contains("MESSAGE=\"overheated\""));
    }

    #[test]
    fn plain_events_fall_back_to_tracing_level() {
        let lines = capture_journal(|| {
            tracing::warn!(attempt = 3, "retrying");
        });

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("LEVEL=WARN "));
        assert!(lines[0].ends_with("MESSAGE=\"retrying\" attempt=3"));
    }

    #[test]
    fn init_twice_is_an_error() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Journal,
        };
        assert!(init(&config).is_ok());
        assert!(matches!(init(&config), Err(EdgeKitError::Logging(_))));
    }

    #[test]
    fn log_level_names() {
        assert_eq!(LogLevel::Critical.to_string(), "CRITICAL");
        assert_eq!(LogLevel::Warn.as_str(), "WARN");
        assert!(LogLevel::Critical > LogLevel::Error);
    }
}

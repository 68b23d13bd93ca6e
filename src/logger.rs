//! A sink for the [`log`] facade which sends every record to Loki.
use crate::{
    Clock, Credentials, LabelSet, LogEntry, LokiClient, LokiConfig, PushError, PushRequest,
    SystemClock,
};
#[cfg(feature = "structured_logging")]
use log::kv::{Key, Value, VisitSource};
use log::{LevelFilter, Log, Metadata, Record};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

/// Records of these targets are never sent to Loki, since sending them would cause new records
/// of the same targets (and so on).
const IGNORED_TARGETS: &[&str] = &[
    "ureq",
    "ureq_proto",
    "rustls",
    "reqwest",
    "hyper",
    "h2",
    "loki_push",
];

/// The function which is called with every failed push of a [`LokiLogger`]
pub type ErrorHandler = fn(&PushError);

/// Turns a log record into the line (and optionally additional labels) sent to Loki.
pub trait LogFormatter: Send + Sync {
    /// Render the line for `record`, which was logged at `timestamp_ns`
    fn format(&self, record: &Record<'_>, timestamp_ns: u128) -> String;

    /// Add labels for `record` to the stream labels
    fn enrich(&self, _record: &Record<'_>, _labels: &mut LabelSet) {}
}

/// Renders lines as `<RFC 3339 timestamp> [<LEVEL>] <message>`, e.g.
/// `2024-05-01T12:00:00.000Z [INFO] service started`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFormatter;

impl LogFormatter for DefaultFormatter {
    fn format(&self, record: &Record<'_>, timestamp_ns: u128) -> String {
        let nanos = u64::try_from(timestamp_ns).unwrap_or(u64::MAX);
        let moment = UNIX_EPOCH + Duration::from_nanos(nanos);
        format!(
            "{} [{}] {}",
            humantime::format_rfc3339_millis(moment),
            record.level(),
            record.args()
        )
    }
}

/// Writes the failure to stderr, the logger cannot use the `log` facade for that.
pub fn report_to_stderr(error: &PushError) {
    eprintln!("(loki) failed to push log line: {}", error);
}

/// The `LokiLogger` implements [`log::Log`] on top of a [`LokiClient`].
///
/// Every record is pushed on its own and the call blocks until Loki answered. A failed push is
/// handed to the configured [`ErrorHandler`], the logger itself never panics.
pub struct LokiLogger {
    client: Arc<LokiClient>,
    labels: LabelSet,
    tenant: Option<String>,
    credentials: Option<Credentials>,
    max_level: LevelFilter,
    include_level: bool,
    formatter: Box<dyn LogFormatter>,
    clock: Box<dyn Clock>,
    on_error: ErrorHandler,
}

impl LokiLogger {
    /// Create a new `LokiLoggerBuilder` for a logger which pushes with `client`.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use loki_push::{LabelSet, LokiClient, LokiLogger, NetworkingBackend};
    ///
    /// let client = LokiClient::builder()
    ///     .network(NetworkingBackend::Noop)
    ///     .build()
    ///     .unwrap();
    ///
    /// let logger = LokiLogger::builder(Arc::new(client))
    ///     .labels(LabelSet::standard("billing", "dev", "my-computer"))
    ///     .tenant("tenant1")
    ///     .include_level()
    ///     .build();
    /// ```
    pub fn builder(client: Arc<LokiClient>) -> LokiLoggerBuilder {
        LokiLoggerBuilder {
            client,
            labels: LabelSet::new(),
            tenant: None,
            credentials: None,
            max_level: LevelFilter::Trace,
            include_level: false,
            formatter: Box::new(DefaultFormatter),
            clock: Box::new(SystemClock),
            on_error: report_to_stderr,
        }
    }

    /// The most verbose level this logger accepts
    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    fn labels_for(&self, record: &Record<'_>) -> LabelSet {
        let mut labels = self.labels.clone();
        if self.include_level {
            labels.insert("level", record.level().as_str().to_ascii_lowercase());
        }

        #[cfg(feature = "structured_logging")]
        {
            // a broken key/value source only costs us its labels, not the line
            let _ = record
                .key_values()
                .visit(&mut LabelVisitor { labels: &mut labels });
        }

        self.formatter.enrich(record, &mut labels);
        labels
    }
}

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|ignored| {
        target
            .strip_prefix(ignored)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
    })
}

impl Log for LokiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level && !is_ignored_target(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let timestamp_ns = self.clock.now_ns();
        let request = PushRequest {
            labels: self.labels_for(record),
            entries: vec![LogEntry::new(
                timestamp_ns,
                self.formatter.format(record, timestamp_ns),
            )],
        };

        let result = self
            .client
            .push(&request, self.tenant.as_deref(), self.credentials.as_ref());
        if let Err(error) = result {
            (self.on_error)(&error);
        }
    }

    fn flush(&self) {
        // every record is pushed right away, there is nothing to flush
    }
}

/// The `LokiLoggerBuilder` struct is used to create a new instance of [`LokiLogger`].
pub struct LokiLoggerBuilder {
    client: Arc<LokiClient>,
    labels: LabelSet,
    tenant: Option<String>,
    credentials: Option<Credentials>,
    max_level: LevelFilter,
    include_level: bool,
    formatter: Box<dyn LogFormatter>,
    clock: Box<dyn Clock>,
    on_error: ErrorHandler,
}

impl LokiLoggerBuilder {
    /// Add labels to all streams (existing labels with the same name are replaced).
    pub fn labels(mut self, labels: LabelSet) -> LokiLoggerBuilder {
        self.labels.extend(&labels);
        self
    }

    /// Add a single label to all streams.
    pub fn label(mut self, name: &str, value: &str) -> LokiLoggerBuilder {
        self.labels.insert(name, value);
        self
    }

    /// Send all pushes for the given tenant.
    pub fn tenant(mut self, tenant: &str) -> LokiLoggerBuilder {
        self.tenant = Some(tenant.to_string());
        self
    }

    /// Authenticate all pushes with the given credentials.
    pub fn credentials(mut self, credentials: Credentials) -> LokiLoggerBuilder {
        self.credentials = Some(credentials);
        self
    }

    /// Ignore all records which are more verbose than `level`.
    pub fn max_level(mut self, level: LevelFilter) -> LokiLoggerBuilder {
        self.max_level = level;
        self
    }

    /// Ensure that a `level` label with the (lower-case) level of the record is attached to each
    /// stream.
    pub fn include_level(mut self) -> LokiLoggerBuilder {
        self.include_level = true;
        self
    }

    pub fn formatter(mut self, formatter: impl LogFormatter + 'static) -> LokiLoggerBuilder {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> LokiLoggerBuilder {
        self.clock = Box::new(clock);
        self
    }

    /// Call `handler` instead of writing to stderr when a push failed.
    pub fn on_error(mut self, handler: ErrorHandler) -> LokiLoggerBuilder {
        self.on_error = handler;
        self
    }

    pub fn build(self) -> LokiLogger {
        LokiLogger {
            client: self.client,
            labels: self.labels,
            tenant: self.tenant,
            credentials: self.credentials,
            max_level: self.max_level,
            include_level: self.include_level,
            formatter: self.formatter,
            clock: self.clock,
            on_error: self.on_error,
        }
    }
}

/// Install a [`LokiLogger`] built from `config` as the logger of the [`log`] facade.
///
/// Fails with [`PushError::Configuration`] if the configuration is invalid or a logger was
/// already installed.
pub fn init(config: &LokiConfig, level: LevelFilter) -> Result<(), PushError> {
    let client = Arc::new(config.client()?);
    let logger = config.logger(client).max_level(level).build();

    log::set_boxed_logger(Box::new(logger))
        .map_err(|error| PushError::Configuration(error.to_string()))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(feature = "structured_logging")]
struct LabelVisitor<'a> {
    labels: &'a mut LabelSet,
}

#[cfg(feature = "structured_logging")]
impl<'kvs> VisitSource<'kvs> for LabelVisitor<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), log::kv::Error> {
        self.labels.insert(key.as_str(), value.to_string());
        Ok(())
    }
}

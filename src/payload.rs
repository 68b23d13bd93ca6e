//! The data which is sent to Loki and its JSON representation on the wire.
use crate::PushError;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// The labels which identify a Loki stream.
///
/// Two pushes with identical label sets end up in the same stream on the server side. The
/// labels are kept ordered by name, so the encoded stream object is stable.
///
/// # Example
/// ```
/// use loki_push::LabelSet;
///
/// let labels = LabelSet::standard("billing", "dev", "my-computer")
///     .with("level", "info");
/// assert_eq!(labels.get("environment"), Some("dev"));
/// assert_eq!(labels.len(), 4);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Create an empty label set
    pub fn new() -> LabelSet {
        LabelSet(BTreeMap::new())
    }

    /// Create a label set with the recommended `application`, `environment` and `host` labels.
    pub fn standard(application: &str, environment: &str, host: &str) -> LabelSet {
        LabelSet::new()
            .with("application", application)
            .with("environment", environment)
            .with("host", host)
    }

    /// Add a label and return the modified set (an existing label with the same name is replaced).
    pub fn with(mut self, name: &str, value: &str) -> LabelSet {
        self.insert(name, value);
        self
    }

    /// Add a label, returning the previous value if the label was already set.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Get the value of a label
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Merge all labels of `other` into this set, overwriting labels with the same name.
    pub fn extend(&mut self, other: &LabelSet) {
        self.0
            .extend(other.iter().map(|(name, value)| (name.to_string(), value.to_string())));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Check that the set can identify a stream: at least one label and no blank label names.
    pub fn validate(&self) -> Result<(), PushError> {
        if self.0.is_empty() {
            return Err(PushError::Configuration(
                "a stream needs at least one label".to_string(),
            ));
        }
        if self.0.keys().any(|name| name.trim().is_empty()) {
            return Err(PushError::Configuration(
                "label names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LabelSet(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// A single log line together with the moment it was created.
///
/// On the wire an entry is a pair of strings: the timestamp in nanoseconds since the Unix epoch
/// and the already rendered line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Nanoseconds since the Unix epoch
    pub timestamp_ns: u128,
    /// The fully rendered log line
    pub line: String,
}

impl LogEntry {
    pub fn new(timestamp_ns: u128, line: impl Into<String>) -> LogEntry {
        LogEntry {
            timestamp_ns,
            line: line.into(),
        }
    }

    /// Create an entry stamped with the current system time.
    pub fn now(line: impl Into<String>) -> LogEntry {
        LogEntry::new(SystemClock.now_ns(), line)
    }
}

impl Serialize for LogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.timestamp_ns.to_string())?;
        pair.serialize_element(&self.line)?;
        pair.end()
    }
}

/// A batch of entries which share one [`LabelSet`].
///
/// The entries are sent in exactly the order they were added. Loki expects the entries of a
/// stream in non-decreasing timestamp order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushRequest {
    pub labels: LabelSet,
    pub entries: Vec<LogEntry>,
}

impl PushRequest {
    pub fn new(labels: LabelSet) -> PushRequest {
        PushRequest {
            labels,
            entries: Vec::new(),
        }
    }

    /// Append an entry and return the modified request
    pub fn entry(mut self, timestamp_ns: u128, line: impl Into<String>) -> PushRequest {
        self.entries.push(LogEntry::new(timestamp_ns, line));
        self
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// Check the request before anything is sent over the network.
    pub fn validate(&self) -> Result<(), PushError> {
        self.labels.validate()?;
        if self.entries.is_empty() {
            return Err(PushError::Configuration(
                "a push request needs at least one log entry".to_string(),
            ));
        }
        Ok(())
    }

    /// Encode the request as the JSON body of a push.
    pub fn to_json(&self) -> Result<Vec<u8>, PushError> {
        let streams = Streams {
            streams: [Stream {
                stream: &self.labels,
                values: &self.entries,
            }],
        };
        Ok(serde_json::to_vec(&streams)?)
    }
}

/// The login and password for the HTTP Basic authentication against the Loki endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Credentials {
        Credentials {
            login: login.into(),
            password: password.into(),
        }
    }

    /// The value of the `Authorization` header, or `None` if either login or password is blank.
    ///
    /// # Example
    /// ```
    /// use loki_push::Credentials;
    ///
    /// let credentials = Credentials::new("username", "password");
    /// assert_eq!(
    ///     credentials.authorization_header().as_deref(),
    ///     Some("Basic dXNlcm5hbWU6cGFzc3dvcmQ=")
    /// );
    /// assert_eq!(Credentials::new("username", " ").authorization_header(), None);
    /// ```
    pub fn authorization_header(&self) -> Option<String> {
        use base64::{engine::general_purpose, Engine};

        if self.login.trim().is_empty() || self.password.trim().is_empty() {
            return None;
        }
        let encoded =
            general_purpose::STANDARD.encode(format!("{}:{}", self.login, self.password));
        Some(format!("Basic {}", encoded))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// The value of the `X-Scope-OrgID` header, or `None` if no usable tenant was supplied.
pub fn tenant_header(tenant: Option<&str>) -> Option<&str> {
    tenant.map(str::trim).filter(|tenant| !tenant.is_empty())
}

/// A source for the timestamps of log entries.
pub trait Clock: Send + Sync {
    /// Nanoseconds since the Unix epoch
    fn now_ns(&self) -> u128;
}

/// The [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> u128 {
        // a system clock set before 1970 is reported as the epoch itself
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default()
    }
}

#[derive(Serialize)]
struct Stream<'a> {
    stream: &'a LabelSet,
    values: &'a [LogEntry],
}

#[derive(Serialize)]
struct Streams<'a> {
    streams: [Stream<'a>; 1],
}

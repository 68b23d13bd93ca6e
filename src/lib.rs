#![doc = include_str!("../README.md")]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod global;
pub mod logger;
pub mod noop;
pub mod payload;
#[cfg(feature = "reqwest-async")]
pub mod reqwest;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(feature = "ureq")]
pub mod ureq;

pub use crate::config::LokiConfig;
pub use crate::endpoint::{normalize_endpoint, Endpoint, PUSH_PATH};
pub use crate::error::PushError;
pub use crate::global::{clear_global_client, global_client, push_global, set_global_client};
pub use crate::logger::{init, DefaultFormatter, LogFormatter, LokiLogger, LokiLoggerBuilder};
pub use crate::payload::{Clock, Credentials, LabelSet, LogEntry, PushRequest, SystemClock};

use std::time::Duration;
use url::Url;

/// The name of the header which selects the tenant in a multi-tenant Loki setup
pub const TENANT_HEADER: &str = "X-Scope-OrgID";

/// The timeout which is used if no other timeout was configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The `NetworkingBackend` defines the networking backends which are shipped with the crate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NetworkingBackend {
    /// The `Noop` backend accepts every push without sending anything over the network
    Noop,

    /// The `Ureq` backend uses the `ureq` library for blocking network requests
    #[cfg(feature = "ureq")]
    Ureq,
}

/// A push which is ready to be sent: the final URL, all headers and the encoded body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedPush {
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl PreparedPush {
    /// Validate and encode `request` and collect the headers for the given tenant and credentials.
    ///
    /// Fails with [`PushError::Configuration`] if the request is malformed.
    pub fn new(
        endpoint: &Endpoint,
        request: &PushRequest,
        tenant: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<PreparedPush, PushError> {
        request.validate()?;
        let body = request.to_json()?;

        let mut headers = vec![("Content-Type", "application/json".to_string())];
        if let Some(tenant) = payload::tenant_header(tenant) {
            if tenant.chars().any(|c| c.is_ascii_control()) {
                return Err(PushError::Configuration(
                    "the tenant must not contain control characters".to_string(),
                ));
            }
            headers.push((TENANT_HEADER, tenant.to_string()));
        }
        if let Some(authorization) = credentials.and_then(Credentials::authorization_header) {
            headers.push(("Authorization", authorization));
        }

        Ok(PreparedPush {
            url: endpoint.url().clone(),
            headers,
            body,
        })
    }

    /// Look up the value of a header (the name is compared case-insensitively).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The status code and (if it could be read) the body of a response to a push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl RawResponse {
    pub fn new(status: u16, body: Option<String>) -> RawResponse {
        RawResponse {
            status,
            body: body.filter(|body| !body.is_empty()),
        }
    }

    /// Every `2xx` status is a success, everything else is reported as [`PushError::Server`].
    pub fn into_result(self) -> Result<(), PushError> {
        if (200..300).contains(&self.status) {
            return Ok(());
        }
        Err(PushError::Server {
            status: self.status,
            body: self.body,
        })
    }
}

/// The `PushBackend` trait is the seam between the client and the HTTP library which is used to
/// talk to the remote endpoint.
///
/// A backend sends exactly one request per call and reports what came back. Only failures where
/// no response was received are errors on this level, classifying the status code is done by
/// the [`LokiClient`].
pub trait PushBackend: Send + Sync {
    /// Send the prepared push to the remote endpoint
    fn send(&self, push: &PreparedPush) -> Result<RawResponse, PushError>;
}

/// The `LokiClient` struct implements the communication with the push API of a
/// [Loki](https://grafana.com/oss/loki/) instance.
///
/// The client holds no mutable state, so one instance can be shared between threads and used
/// for concurrent pushes. To create a new instance use [`LokiClient::builder`] or
/// [`LokiClient::new`].
pub struct LokiClient {
    endpoint: Endpoint,
    backend: Box<dyn PushBackend>,
}

impl LokiClient {
    /// Create a client for `endpoint` which uses the `ureq` backend with the default timeout.
    ///
    /// # Example
    /// ```
    /// use loki_push::LokiClient;
    ///
    /// let client = LokiClient::new("http://localhost:3100").unwrap();
    /// assert_eq!(client.endpoint().as_str(), "http://localhost:3100/loki/api/v1/push");
    /// ```
    #[cfg(feature = "ureq")]
    pub fn new(endpoint: &str) -> Result<LokiClient, PushError> {
        LokiClient::builder()
            .endpoint(endpoint)
            .network(NetworkingBackend::Ureq)
            .build()
    }

    /// Create a new `LokiClientBuilder` with all required parameters.
    ///
    /// # Example
    /// ```
    /// use loki_push::LokiClient;
    ///
    /// let builder = LokiClient::builder();
    /// ```
    pub fn builder() -> LokiClientBuilder {
        LokiClientBuilder {
            endpoint: "http://localhost:3100".to_string(),
            network_backend: None,
            backend: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The normalized endpoint all pushes are sent to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send all entries of `request` to Loki with one HTTP POST.
    ///
    /// The `X-Scope-OrgID` header is only sent for a non-blank `tenant` and the `Authorization`
    /// header only if both parts of the `credentials` are non-blank. Malformed requests fail with
    /// [`PushError::Configuration`] before anything is sent.
    ///
    /// # Example
    /// ```
    /// use loki_push::{LabelSet, LogEntry, LokiClient, NetworkingBackend, PushRequest};
    ///
    /// let client = LokiClient::builder()
    ///     .endpoint("http://localhost:3100")
    ///     .network(NetworkingBackend::Noop)
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut request = PushRequest::new(LabelSet::standard("billing", "dev", "my-computer"));
    /// request.push(LogEntry::now("billing run finished"));
    ///
    /// assert!(client.push(&request, Some("tenant1"), None).is_ok());
    /// ```
    pub fn push(
        &self,
        request: &PushRequest,
        tenant: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<(), PushError> {
        let prepared = PreparedPush::new(&self.endpoint, request, tenant, credentials)?;
        log::trace!(
            "pushing {} entries ({} bytes) to {}",
            request.entries.len(),
            prepared.body.len(),
            self.endpoint
        );

        let result = self.backend.send(&prepared).and_then(RawResponse::into_result);
        if let Err(error) = &result {
            log::debug!("push to {} failed: {}", self.endpoint, error);
        }
        result
    }
}

/// The `LokiClientBuilder` struct is used to create a new instance of [`LokiClient`] using the
/// builder pattern.
pub struct LokiClientBuilder {
    /// The base URL of the Loki instance (normalized when the client is built)
    endpoint: String,
    /// One of the networking backends which are shipped with this crate
    network_backend: Option<NetworkingBackend>,
    /// A custom backend, takes precedence over `network_backend`
    backend: Option<Box<dyn PushBackend>>,
    /// The timeout for a single push
    timeout: Duration,
}

impl LokiClientBuilder {
    /// Set the endpoint which should be used for sending the log messages to.
    ///
    /// Both the root of the Loki instance and the full push URL are accepted.
    ///
    /// # Example
    /// ```
    /// use loki_push::LokiClient;
    ///
    /// let builder = LokiClient::builder()
    ///     .endpoint("https://loki.example.com");
    /// ```
    pub fn endpoint(mut self, endpoint: &str) -> LokiClientBuilder {
        self.endpoint = endpoint.to_string();
        self
    }

    /// Select one of the networking backends which are shipped with the crate.
    ///
    /// # Example
    /// ```
    /// use loki_push::{LokiClient, NetworkingBackend};
    ///
    /// let builder = LokiClient::builder()
    ///     .network(NetworkingBackend::Noop);
    /// ```
    pub fn network(mut self, backend: NetworkingBackend) -> LokiClientBuilder {
        self.network_backend = Some(backend);
        self
    }

    /// Use a custom [`PushBackend`] for the network requests.
    pub fn backend(mut self, backend: impl PushBackend + 'static) -> LokiClientBuilder {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Set the timeout for a single push. Only used by the backends shipped with the crate.
    pub fn timeout(mut self, timeout: Duration) -> LokiClientBuilder {
        self.timeout = timeout;
        self
    }

    /// Create a new `LokiClient` with the parameters supplied to this struct before calling
    /// `build()`.
    ///
    /// Fails with [`PushError::Configuration`] if the endpoint is invalid or no backend was
    /// selected.
    pub fn build(self) -> Result<LokiClient, PushError> {
        use crate::noop::NoopBackend;
        #[cfg(feature = "ureq")]
        use crate::ureq::UreqBackend;

        let endpoint = Endpoint::parse(&self.endpoint)?;

        let backend: Box<dyn PushBackend> = match (self.backend, self.network_backend) {
            (Some(backend), _) => backend,
            (None, Some(NetworkingBackend::Noop)) => Box::new(NoopBackend),
            #[cfg(feature = "ureq")]
            (None, Some(NetworkingBackend::Ureq)) => Box::new(UreqBackend::new(self.timeout)),
            (None, None) => {
                return Err(PushError::Configuration(
                    "a networking backend has to be selected before building the client"
                        .to_string(),
                ))
            }
        };

        Ok(LokiClient { endpoint, backend })
    }
}

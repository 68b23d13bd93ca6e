//! An asynchronous client for the push API which uses the `reqwest` crate for network
//! communication and `tokio` for deadlines.
use crate::{
    Credentials, Endpoint, PreparedPush, PushError, PushRequest, RawResponse, DEFAULT_TIMEOUT,
};
use ::reqwest::Client;
use std::time::Duration;

/// The asynchronous counterpart of [`LokiClient`](crate::LokiClient).
///
/// Every call to [`ReqwestClient::push`] sends exactly one request and nothing is retried.
/// Dropping the returned future cancels the request.
pub struct ReqwestClient {
    /// The normalized push URL
    endpoint: Endpoint,
    /// Internal client
    client: Client,
}

impl ReqwestClient {
    /// Create a client for `endpoint` with the default timeout.
    pub fn new(endpoint: &str) -> Result<ReqwestClient, PushError> {
        ReqwestClient::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a client for `endpoint` which gives up on a push once `timeout` has elapsed.
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<ReqwestClient, PushError> {
        let endpoint = Endpoint::parse(endpoint)?;
        let client = Client::builder()
            .timeout(timeout)
            .redirect(::reqwest::redirect::Policy::none())
            .build()
            .map_err(|error| PushError::Configuration(error.to_string()))?;

        Ok(ReqwestClient { endpoint, client })
    }

    /// The normalized endpoint all pushes are sent to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send all entries of `request` to Loki with one HTTP POST.
    ///
    /// Follows the same rules as [`LokiClient::push`](crate::LokiClient::push).
    pub async fn push(
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

        let result = self.send(prepared).await.and_then(RawResponse::into_result);
        if let Err(error) = &result {
            log::debug!("push to {} failed: {}", self.endpoint, error);
        }
        result
    }

    /// Like [`ReqwestClient::push`], but fails with [`PushError::TimedOut`] if no response
    /// arrived before `deadline` elapsed.
    pub async fn push_with_timeout(
        &self,
        request: &PushRequest,
        tenant: Option<&str>,
        credentials: Option<&Credentials>,
        deadline: Duration,
    ) -> Result<(), PushError> {
        tokio::time::timeout(deadline, self.push(request, tenant, credentials))
            .await
            .map_err(|_| PushError::TimedOut)?
    }

    async fn send(&self, push: PreparedPush) -> Result<RawResponse, PushError> {
        let mut builder = self.client.post(push.url);
        for (name, value) in push.headers {
            builder = builder.header(name, value);
        }

        let response = builder.body(push.body).send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.ok();
        Ok(RawResponse::new(status, body))
    }
}

fn map_error(error: ::reqwest::Error) -> PushError {
    if error.is_timeout() {
        return PushError::TimedOut;
    }
    PushError::Transport(error.to_string())
}

//! The error type which is reported for every failed push.
use thiserror::Error;

/// Everything which can go wrong while pushing log lines to a Loki endpoint.
///
/// None of these errors are fatal for the host process. The client only reports them, it is up
/// to the caller to decide whether a failed push should be retried, dropped or escalated.
#[derive(Error, Debug)]
pub enum PushError {
    /// The supplied input was malformed. Nothing was sent to the remote endpoint.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// No response was received (connection refused, DNS failure, broken connection, ...)
    #[error("could not reach the Loki endpoint: {0}")]
    Transport(String),

    /// The deadline for the push elapsed before a response was received
    #[error("the push to the Loki endpoint timed out")]
    TimedOut,

    /// A response was received, but its status code was not in the `2xx` range
    #[error(
        "Loki responded with status {status}{}",
        .body.as_deref().map(|body| format!(": {}", body)).unwrap_or_default()
    )]
    Server {
        /// The HTTP status code of the response
        status: u16,
        /// The response body, if one could be read
        body: Option<String>,
    },

    /// The payload could not be encoded as JSON
    #[error("could not serialize the push payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PushError {
    /// The HTTP status code of the response, if the remote endpoint answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PushError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The status code as text, or `unknown` if no response was received.
    pub fn status_text(&self) -> String {
        self.status_code()
            .map(|status| status.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// The body of the error response, if one was received.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            PushError::Server { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::PushError;

    #[test]
    fn server_errors_expose_status_and_body() {
        let error = PushError::Server {
            status: 400,
            body: Some("entry out of order".to_string()),
        };
        assert_eq!(error.status_code(), Some(400));
        assert_eq!(error.status_text(), "400");
        assert_eq!(error.response_body(), Some("entry out of order"));
        assert_eq!(
            error.to_string(),
            "Loki responded with status 400: entry out of order"
        );
    }

    #[test]
    fn server_errors_without_body_render_only_the_status() {
        let error = PushError::Server {
            status: 502,
            body: None,
        };
        assert_eq!(error.to_string(), "Loki responded with status 502");
        assert_eq!(error.response_body(), None);
    }

    #[test]
    fn errors_without_response_report_an_unknown_status() {
        let transport = PushError::Transport("connection refused".to_string());
        assert_eq!(transport.status_code(), None);
        assert_eq!(transport.status_text(), "unknown");
        assert_eq!(PushError::TimedOut.status_text(), "unknown");
        assert_eq!(
            PushError::Configuration("empty label".to_string()).status_text(),
            "unknown"
        );
    }
}

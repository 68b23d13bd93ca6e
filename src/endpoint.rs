//! Normalization of the configured Loki endpoint to the URL of the push API.
use crate::PushError;
use std::fmt;
use url::Url;

/// The path of the Loki push API, relative to the root of a Loki instance.
pub const PUSH_PATH: &str = "/loki/api/v1/push";

/// Normalize a base URL so that it ends with exactly one [`PUSH_PATH`].
///
/// Any (case-insensitive) occurrence of the push path is removed first, so it does not matter
/// whether the caller supplied the root of the Loki instance or the full push URL. Applying
/// the function to its own output returns the output unchanged.
///
/// # Example
/// ```
/// use loki_push::normalize_endpoint;
///
/// assert_eq!(
///     normalize_endpoint("http://localhost:3100/"),
///     "http://localhost:3100/loki/api/v1/push"
/// );
/// assert_eq!(
///     normalize_endpoint("http://localhost:3100/LOKI/api/v1/push"),
///     "http://localhost:3100/loki/api/v1/push"
/// );
/// ```
pub fn normalize_endpoint(raw: &str) -> String {
    let mut base = raw.trim().trim_end_matches('/').to_string();

    // the push path is plain ASCII, so lower-casing keeps all byte offsets intact
    while let Some(start) = base.to_ascii_lowercase().find(PUSH_PATH) {
        base.replace_range(start..start + PUSH_PATH.len(), "");
    }

    let mut normalized = base.trim_end_matches('/').to_string();
    normalized.push_str(PUSH_PATH);
    normalized
}

/// A validated and normalized URL of a Loki push API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Normalize and validate the supplied base URL.
    ///
    /// Blank input, schemes other than `http` and `https` and URLs with a query or fragment
    /// are rejected with [`PushError::Configuration`].
    pub fn parse(raw: &str) -> Result<Endpoint, PushError> {
        if raw.trim().is_empty() {
            return Err(PushError::Configuration(
                "the Loki endpoint must not be empty".to_string(),
            ));
        }

        let normalized = normalize_endpoint(raw);
        let url = Url::parse(&normalized).map_err(|error| {
            PushError::Configuration(format!("invalid Loki endpoint `{}`: {}", raw, error))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PushError::Configuration(format!(
                "unsupported scheme `{}` for the Loki endpoint",
                url.scheme()
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(PushError::Configuration(format!(
                "the Loki endpoint `{}` must not contain a query or fragment",
                raw
            )));
        }
        if !url.path().ends_with(PUSH_PATH) {
            return Err(PushError::Configuration(format!(
                "the Loki endpoint `{}` does not resolve to the push path `{}`",
                raw, PUSH_PATH
            )));
        }

        Ok(Endpoint { url })
    }

    /// The full URL of the push API
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The full URL of the push API
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

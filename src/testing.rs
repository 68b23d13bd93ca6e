//! Helpers which are shared by the unit tests of the different modules.
use crate::{PreparedPush, PushBackend, PushError, RawResponse};
use parking_lot::Mutex;
use std::sync::Arc;

/// A [`PushBackend`] which records every push and answers with a canned response.
#[derive(Clone)]
pub(crate) struct SpyBackend {
    calls: Arc<Mutex<Vec<PreparedPush>>>,
    status: u16,
    body: Option<String>,
    transport_failure: Option<String>,
}

impl SpyBackend {
    pub(crate) fn responding(status: u16) -> SpyBackend {
        SpyBackend {
            calls: Arc::new(Mutex::new(Vec::new())),
            status,
            body: None,
            transport_failure: None,
        }
    }

    pub(crate) fn unreachable(cause: &str) -> SpyBackend {
        SpyBackend {
            transport_failure: Some(cause.to_string()),
            ..SpyBackend::responding(0)
        }
    }

    pub(crate) fn with_body(mut self, body: &str) -> SpyBackend {
        self.body = Some(body.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<PreparedPush> {
        self.calls.lock().clone()
    }

    pub(crate) fn last_call(&self) -> Option<PreparedPush> {
        self.calls.lock().last().cloned()
    }
}

impl PushBackend for SpyBackend {
    fn send(&self, push: &PreparedPush) -> Result<RawResponse, PushError> {
        self.calls.lock().push(push.clone());
        match &self.transport_failure {
            Some(cause) => Err(PushError::Transport(cause.clone())),
            None => Ok(RawResponse::new(self.status, self.body.clone())),
        }
    }
}

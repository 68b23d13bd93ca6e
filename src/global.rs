//! An optional process-wide [`LokiClient`].
//!
//! Passing a client around explicitly is preferred. For applications which want one client
//! for everything, a default can be installed once at startup and replaced again (e.g. in tests).
use crate::{Credentials, LokiClient, PushError, PushRequest};
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL_CLIENT: RwLock<Option<Arc<LokiClient>>> = parking_lot::const_rwlock(None);

/// Install `client` as the process-wide client and return the previously installed one.
pub fn set_global_client(client: LokiClient) -> Option<Arc<LokiClient>> {
    GLOBAL_CLIENT.write().replace(Arc::new(client))
}

/// The process-wide client, if one was installed
pub fn global_client() -> Option<Arc<LokiClient>> {
    GLOBAL_CLIENT.read().clone()
}

/// Remove the process-wide client and return it.
pub fn clear_global_client() -> Option<Arc<LokiClient>> {
    GLOBAL_CLIENT.write().take()
}

/// Push `request` with the process-wide client.
///
/// Fails with [`PushError::Configuration`] if no client was installed.
pub fn push_global(
    request: &PushRequest,
    tenant: Option<&str>,
    credentials: Option<&Credentials>,
) -> Result<(), PushError> {
    // the lock is released before the (potentially slow) push starts
    let client = global_client().ok_or_else(|| {
        PushError::Configuration("no global Loki client was installed".to_string())
    })?;
    client.push(request, tenant, credentials)
}

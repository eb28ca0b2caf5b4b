//! Collaborators shared by the control loops.

use std::sync::Arc;

use tracing::warn;

use crate::domain::AccountContext;
use crate::error::Result;
use crate::port::{Backends, SubscriptionService};

/// Everything a control loop needs to reach the outside world.
#[derive(Clone)]
pub struct ProvisionContext {
    pub account: AccountContext,
    pub subscriptions: Arc<dyn SubscriptionService>,
    pub backends: Backends,
}

impl ProvisionContext {
    pub fn new(
        account: AccountContext,
        subscriptions: Arc<dyn SubscriptionService>,
        backends: Backends,
    ) -> Self {
        Self {
            account,
            subscriptions,
            backends,
        }
    }
}

impl std::fmt::Debug for ProvisionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionContext")
            .field("account", &self.account)
            .field("backends", &self.backends)
            .finish_non_exhaustive()
    }
}

/// Let fatal errors through, log and swallow everything else.
///
/// Transient collaborator failures are retried on the next pass; `Ok(None)`
/// marks a swallowed failure.
pub(crate) fn absorb_transient<T>(
    result: Result<T>,
    definition: &str,
    action: &str,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if !err.is_fatal() => {
            warn!(definition, action, error = %err, "Provisioning step failed, will retry");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

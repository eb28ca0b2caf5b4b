//! Composition root: wires the command line adapters into a provisioner.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::cli::{BtpCli, CfCli, CommandRunner, KymaCli, ProcessRunner};
use crate::application::{ProvisionContext, Provisioner};
use crate::domain::AccountContext;
use crate::infrastructure::config::Config;
use crate::port::Backends;

/// Register one backend per supported target environment.
///
/// `btp` serves both subscriptions and the `sapbtp` environment.
pub(crate) fn build_backends(config: &Config, runner: Arc<dyn CommandRunner>) -> Backends {
    let tools = &config.tools;
    Backends::new()
        .with(Arc::new(CfCli::new(Arc::clone(&runner), &tools.cf)))
        .with(Arc::new(KymaCli::new(Arc::clone(&runner), &tools.kubectl)))
        .with(Arc::new(BtpCli::new(runner, &tools.btp)))
}

/// Build the context for `account` on top of `runner`.
pub fn build_context(
    config: &Config,
    account: AccountContext,
    runner: Arc<dyn CommandRunner>,
) -> ProvisionContext {
    let subscriptions = Arc::new(BtpCli::new(Arc::clone(&runner), &config.tools.btp));
    let backends = build_backends(config, runner);
    info!(
        subaccount = %account.subaccount_id,
        backends = ?backends,
        "Provisioning context ready"
    );
    ProvisionContext::new(account, subscriptions, backends)
}

/// Build a provisioner that shells out to the configured tools.
pub fn build_provisioner(config: &Config, account: AccountContext) -> Provisioner {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(config.command_timeout()));
    Provisioner::new(build_context(config, account, runner), config.timing())
}

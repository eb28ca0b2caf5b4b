//! Adapters backed by the command line tools of the platform.
//!
//! - [`btp`] - subscriptions and the `sapbtp` environment
//! - [`cf`] - the `cloudfoundry` environment
//! - [`kyma`] - the `kymaruntime` environment
//! - [`runner`] - process execution shared by all of them

pub mod btp;
pub mod cf;
pub mod kyma;
pub mod runner;

pub use btp::BtpCli;
pub use cf::CfCli;
pub use kyma::KymaCli;
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};

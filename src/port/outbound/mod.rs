//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the provisioning tools the control loops talk to:
//! the account's subscription service and one backend per target environment.

pub mod environment;
pub mod subscription;

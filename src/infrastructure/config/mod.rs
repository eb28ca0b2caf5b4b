//! Infrastructure configuration modules.

pub mod logging;
pub mod provisioning;
pub mod settings;
pub mod tools;

pub use settings::Config;

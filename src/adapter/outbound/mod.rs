//! Outbound adapters (driven side).

pub mod cli;

//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] — Builders for definitions, registries, metadata and contexts.
//! - [`fakes`] — In-memory [`SubscriptionService`](crate::port::SubscriptionService)
//!   and [`EnvironmentBackend`](crate::port::EnvironmentBackend) with scripted
//!   progress: `FakeSubscriptions`, `FakeBackend`.
//! - [`runner`] — `ScriptedRunner`, a [`CommandRunner`](crate::adapter::outbound::cli::CommandRunner)
//!   that replays canned tool output.
//! - [`config`] — Canonical test configurations and temp files.

pub mod config;
pub mod domain;
pub mod fakes;
pub mod runner;

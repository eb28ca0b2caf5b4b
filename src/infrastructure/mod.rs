//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! provisioning logic.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`usecase`] - Use case and account metadata files

pub mod bootstrap;
pub mod config;
pub mod usecase;

//! btp-provisioner - dependency-aware provisioning of app subscriptions and
//! service instances.
//!
//! A use case lists applications to subscribe to and services to create,
//! each possibly depending on others. The provisioner arranges them into a
//! dependency forest and runs two control loops side by side until every
//! resource is available or the run times out:
//!
//! - the **creation orchestrator** walks the forest and triggers every
//!   definition whose prerequisites are available;
//! - the **status tracker** polls the account, records status and tenant
//!   information, and aggregates the final state into the account metadata.
//!
//! # Modules
//!
//! - [`domain`] - Definitions, registry, dependency forest, metadata
//! - [`port`] - Traits for subscription and environment collaborators
//! - [`application`] - Eligibility, orchestrator, tracker and the provisioner
//! - [`adapter`] - Command line interface and the `btp`/`cf`/`kubectl` adapters
//! - [`infrastructure`] - Configuration, use case files and runtime wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use btp_provisioner::domain::{AccountContext, DependencyForest};
//! use btp_provisioner::infrastructure::{bootstrap, config::Config, usecase};
//!
//! # async fn demo() -> btp_provisioner::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let registry = usecase::load_usecase("usecase.json")?;
//! let metadata = usecase::load_metadata("metadata.json")?;
//! let account = AccountContext::from_metadata(&metadata)?;
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! let report = bootstrap::build_provisioner(&config, account)
//!     .provision(registry, metadata, shutdown)
//!     .await?;
//! usecase::write_metadata("metadata.json", &report.metadata)?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

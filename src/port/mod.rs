//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture. The
//! control loops in [`application`](crate::application) only ever talk to
//! provisioning tools through these traits.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  orchestrator, tracker  │
//!                    └────────────┬────────────┘
//!                 ┌───────────────┴───────────────┐
//!                 ▼                               ▼
//!       ┌───────────────────┐           ┌───────────────────┐
//!       │SubscriptionService│           │EnvironmentBackend │
//!       │   (btp CLI)       │           │ btp / cf / kubectl│
//!       └───────────────────┘           └───────────────────┘
//! ```

pub mod outbound;

pub use outbound::environment::{Backends, EnvironmentBackend};
pub use outbound::subscription::SubscriptionService;

//! Identifier types for definitions owned by the registry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of definitions a use case declares.
///
/// Names are unique within a kind, so a name only identifies a definition
/// together with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    /// A subscription to a multitenant application.
    Application,
    /// A service instance (or an environment instance for elastic services).
    Service,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Application => write!(f, "application"),
            Kind::Service => write!(f, "service"),
        }
    }
}

/// Stable key of a definition inside a [`DefinitionRegistry`](super::DefinitionRegistry).
///
/// The registry owns every definition exactly once; everything else (forest
/// nodes, loop bookkeeping) refers to definitions through this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId {
    kind: Kind,
    index: usize,
}

impl DefinitionId {
    /// Key for the application subscription at `index`.
    #[must_use]
    pub const fn application(index: usize) -> Self {
        Self {
            kind: Kind::Application,
            index,
        }
    }

    /// Key for the service definition at `index`.
    #[must_use]
    pub const fn service(index: usize) -> Self {
        Self {
            kind: Kind::Service,
            index,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Application => write!(f, "app-{}", self.index),
            Kind::Service => write!(f, "svc-{}", self.index),
        }
    }
}

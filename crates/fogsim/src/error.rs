//! Error kinds of the build, placement and run phases.

use std::fmt;

use fogsim_core::SimulationError;
use thiserror::Error;

/// Kind of a named entity referenced by an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// Compute node.
    Node,
    /// Network link.
    Link,
    /// Application task.
    Task,
    /// Sequence of links between two nodes.
    Path,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Node => "node",
            Self::Link => "link",
            Self::Task => "task",
            Self::Path => "path",
        };
        write!(f, "{}", s)
    }
}

/// Errors produced while building, placing and simulating a deployment.
#[derive(Debug, Error)]
pub enum Error {
    /// An entity with the same identity is already registered.
    #[error("{kind} '{name}' already exists")]
    DuplicateIdentity {
        /// Entity kind.
        kind: EntityKind,
        /// Entity identity.
        name: String,
    },
    /// A link refers to a node which is not registered.
    #[error("link {src} -> {dst} refers to unknown node '{missing}'")]
    DanglingEndpoint {
        /// Link source.
        src: String,
        /// Link destination.
        dst: String,
        /// The unknown endpoint.
        missing: String,
    },
    /// Lookup of an entity failed.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Entity kind.
        kind: EntityKind,
        /// Entity identity.
        name: String,
    },
    /// A data flow refers to a producer task which is not registered.
    #[error("task '{task}' consumes data of unknown producer '{producer}'")]
    UnknownProducer {
        /// Consuming task.
        task: String,
        /// The unknown producer.
        producer: String,
    },
    /// An allocation would exceed the finite capacity of a node or link.
    #[error("{kind} '{name}' cannot fit {requested} more (used {used} of {capacity})")]
    CapacityExceeded {
        /// Entity kind.
        kind: EntityKind,
        /// Entity identity.
        name: String,
        /// Requested amount.
        requested: f64,
        /// Amount already in use.
        used: f64,
        /// Capacity of the entity.
        capacity: f64,
    },
    /// No node can host the task.
    #[error("no node can host task '{0}'")]
    Unplaceable(String),
    /// The configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Placement was requested for an application which is already placed.
    #[error("application '{0}' is already placed")]
    AlreadyPlaced(String),
    /// Unplacement was requested for an application which is not placed.
    #[error("application '{0}' is not placed")]
    NotPlaced(String),
    /// Scenario file could not be read.
    #[error("can't read scenario file: {0}")]
    Io(#[from] std::io::Error),
    /// Scenario file could not be parsed.
    #[error("can't parse scenario: {0}")]
    Config(#[from] serde_yaml::Error),
    /// The simulation run was aborted.
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

impl Error {
    pub(crate) fn not_found(kind: EntityKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_owned(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

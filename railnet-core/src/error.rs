use thiserror::Error;

use crate::model::{EdgeId, LineId, NodeId, TrainId};
use crate::network::{NetCommand, NetworkId};

/// Failures of the node/edge connection protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {node} already holds its maximum of {limit} edges")]
    CapacityExceeded { node: NodeId, limit: usize },
    #[error("Edge {edge} is not connected to node {node}")]
    NotConnected { node: NodeId, edge: EdgeId },
    #[error("Node {node} is not an endpoint of edge {edge}")]
    NotAnEndpoint { node: NodeId, edge: EdgeId },
    #[error("Both endpoints of edge {0} are occupied")]
    BothEndpointsOccupied(EdgeId),
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Unknown edge {0}")]
    UnknownEdge(EdgeId),
    #[error("Node {0} is already bound to a network")]
    NodeAlreadyBound(NodeId),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Mapping of edge {edge} is stale (revision {ticket}, current {current})")]
    StaleMapping {
        edge: EdgeId,
        ticket: u64,
        current: u64,
    },
}

/// Failures of route search and route bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Required edge {edge} cannot be included between {from} and {to}")]
    UnsatisfiableRequiredEdge {
        edge: EdgeId,
        from: NodeId,
        to: NodeId,
    },
    #[error("No path found from {from} to {to}")]
    NoPathFound { from: NodeId, to: NodeId },
    #[error("Edge {edge} is reserved in the opposite direction by another route")]
    DirectionConflict { edge: EdgeId },
    #[error("Line has no checkpoints")]
    NoCheckpoints,
    #[error("No line is assigned to train {0}")]
    UnknownTrain(TrainId),
    #[error("Unknown line {0}")]
    UnknownLine(LineId),
    #[error("Train {train} left its route: expected {expected:?}, got {actual}")]
    OffRoute {
        train: TrainId,
        expected: Option<EdgeId>,
        actual: EdgeId,
    },
    #[error("Train {0} has no active route")]
    NoActiveRoute(TrainId),
    #[error("Automatic route generation is disabled for train {0}")]
    AutoRouteGenDisabled(TrainId),
    #[error("Line of train {0} is locked to its current route")]
    RouteLocked(TrainId),
    #[error("Line of train {0} takes no subroutines")]
    SubroutineDisabled(TrainId),
    #[error("Invalid fixed route: {0}")]
    InvalidFixedRoute(String),
    #[error("Train {train} already stands at {node}")]
    AlreadyAtDestination { train: TrainId, node: NodeId },
}

impl RouteError {
    /// Errors that the `ignore_on_error` toggle may skip past.
    pub fn is_ignorable(&self) -> bool {
        matches!(
            self,
            RouteError::NoPathFound { .. }
                | RouteError::UnsatisfiableRequiredEdge { .. }
                | RouteError::DirectionConflict { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("Node {node} refused command {command:?}")]
    CommandRefused { node: NodeId, command: NetCommand },
    #[error("Unknown network {0}")]
    UnknownNetwork(NetworkId),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

//! Core graph, weighting and routing model for rail networks.
//!
//! Terminals are [`Node`]s, track sections are [`Edge`]s and the planned
//! traversal of a train is a [`Route`], owned by the train's [`Line`].
//! A [`Network`] owns all of them for one domain and the process-wide
//! [`Registry`] owns the networks.

pub mod error;
pub mod loading;
pub mod model;
pub mod network;
pub mod prelude;
pub mod routing;
pub mod weighting;

pub use error::{Error, GraphError, RouteError};
pub use loading::{NetworkDescription, RailNetConfig, create_network};
pub use model::{
    Direction, Edge, EdgeId, GeometryPart, Heading, Line, LineId, LineToggles, Node, NodeId,
    NodeKind, Route, RoutePathSegment, SegmentWeight, TrainId,
};
pub use network::{
    CommandHandler, CommandOutcome, CommandParam, NetCommand, Network, NetworkId,
    NetworkSnapshot, Registry, SharedNetwork,
};
pub use routing::{RoutePlan, Router};
pub use weighting::{CostDimension, WeightingPolicy};

/// Traversal time in game ticks.
pub type Time = u64;

/// Fuel units consumed along an edge.
pub type Fuel = u32;

/// Length measured in blocks.
pub type Blocks = u32;

/// Scalar route cost. Always finite and non-negative.
pub type Cost = f64;

pub use crate::{Error, GraphError, RouteError};

// Re-export key components
pub use crate::loading::{NetworkDescription, RailNetConfig, create_network};
pub use crate::network::{
    CommandHandler, CommandOutcome, CommandParam, NetCommand, Network, Notification,
    Registry, RouteProgress, SharedNetwork,
};
pub use crate::routing::{RoutePlan, Router};
pub use crate::weighting::{CostDimension, WeightingPolicy};

// Graph entities
pub use crate::model::{
    Direction, Edge, GeometryPart, Heading, Line, LineToggles, Node, NodeKind, Route,
    RoutePathSegment, SegmentWeight,
};

// Identities
pub use crate::model::{EdgeId, LineId, NetworkId, NodeId, TrainId};

// Units
pub use crate::Blocks;
pub use crate::Cost;
pub use crate::Fuel;
pub use crate::Time; // ticks

//! Data model of a rail network
//!
//! Contains nodes, edges, routes and lines. Entities refer to each other by
//! identity only; the owning [`Network`](crate::Network) resolves them.

pub mod edge;
pub mod ids;
pub mod line;
pub mod node;
pub mod route;

pub use edge::{BlockPos, Direction, Edge, FarEnd, GeometryPart, Heading, MapTicket, RailType};
pub use ids::{EdgeId, LineId, NetworkId, NodeId, TrainId};
pub use line::{DEFAULT_WEIGHT, Line, LineStatus, LineToggles, SegmentWeight};
pub use node::{Junction, Node, NodeKind, Signal, Station};
pub use route::{Advance, Route, RoutePathSegment, RouteState};

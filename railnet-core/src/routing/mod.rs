//! Route search over a network snapshot.
//!
//! Costs come from [`crate::weighting`]; the search itself is a traced
//! Dijkstra that weaves required edges into each checkpoint hop.

mod dijkstra;
mod router;
mod search_graph;

pub use router::{RoutePlan, Router};

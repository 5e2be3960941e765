//! Track sections ("segments") between two nodes and their mapped geometry.

use serde::{Deserialize, Serialize};

use super::ids::{EdgeId, NodeId};
use crate::{Blocks, GraphError, Time};

/// Allowed travel along an edge, relative to its endpoints A and B.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// A ==> B only.
    Forward,
    /// A <== B only.
    Reverse,
    /// A <==> B. A train keeps one heading for the whole traversal and two
    /// trains may not hold the edge in opposite headings at the same time.
    #[default]
    Bidirectional,
    /// A =<>= B. The train may turn around on the track.
    Reversable,
    /// Not usable at all.
    Closed,
}

impl Direction {
    pub fn permits(self, heading: Heading) -> bool {
        match self {
            Direction::Forward => heading == Heading::AToB,
            Direction::Reverse => heading == Heading::BToA,
            Direction::Bidirectional | Direction::Reversable => true,
            Direction::Closed => false,
        }
    }

    /// Whether traversals of this edge reserve a heading against other trains.
    pub fn reserves_heading(self) -> bool {
        self == Direction::Bidirectional
    }
}

/// Travel direction of one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Heading {
    AToB,
    BToA,
}

impl Heading {
    pub fn reversed(self) -> Self {
        match self {
            Heading::AToB => Heading::BToA,
            Heading::BToA => Heading::AToB,
        }
    }
}

/// What lies on the other side of an edge, seen from one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarEnd {
    Node(NodeId),
    /// Both endpoints are the queried node.
    SelfLoop,
    /// The queried node is an endpoint, the other one is unset.
    Open,
    /// The queried node is not an endpoint of the edge.
    NotIncident,
}

/// Integer block coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RailType {
    Standard,
    Powered,
    Slow,
}

impl RailType {
    /// Multiplier applied to the map-derived travel time over this rail.
    pub fn time_factor(self) -> f64 {
        match self {
            RailType::Standard => 1.0,
            RailType::Powered => 0.5,
            RailType::Slow => 2.0,
        }
    }
}

/// One straight run of track sampled by the mapper.
///
/// A straight run changes at most two axes. Curves are approximated by
/// overlapping perpendicular parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryPart {
    pub a: BlockPos,
    pub b: BlockPos,
    pub rail: Option<RailType>,
}

impl GeometryPart {
    /// # Errors
    ///
    /// [`GraphError::InvalidGeometry`] if all three axes change.
    pub fn new(
        a: impl Into<BlockPos>,
        b: impl Into<BlockPos>,
        rail: Option<RailType>,
    ) -> Result<Self, GraphError> {
        let (a, b) = (a.into(), b.into());
        let changed = [a.x != b.x, a.y != b.y, a.z != b.z]
            .into_iter()
            .filter(|&changed| changed)
            .count();
        if changed > 2 {
            return Err(GraphError::InvalidGeometry(format!(
                "part {a:?} -> {b:?} changes all three axes"
            )));
        }
        Ok(Self { a, b, rail })
    }

    /// Blocks of rail in this part. Rails cannot run diagonally, so a
    /// horizontal diagonal is a staircase; height changes ride on the run.
    pub fn length(&self) -> Blocks {
        self.a.x.abs_diff(self.b.x) + self.a.z.abs_diff(self.b.z)
    }
}

/// Proof that a mapping run started against a given map revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapTicket {
    pub edge: EdgeId,
    pub revision: u64,
}

/// A track section between up to two nodes.
///
/// Changing an endpoint always invalidates the mapped geometry and the base
/// time in the same call, since both described the old endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    name: Option<String>,
    endpoint_a: Option<NodeId>,
    endpoint_b: Option<NodeId>,
    direction: Direction,
    base_time: Option<Time>,
    /// Defined only once the mapping is complete.
    actual_length: Option<Blocks>,
    geometry: Vec<GeometryPart>,
    mapped: bool,
    map_revision: u64,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        endpoint_a: Option<NodeId>,
        endpoint_b: Option<NodeId>,
        direction: Direction,
    ) -> Self {
        Self {
            id,
            name: None,
            endpoint_a,
            endpoint_b,
            direction,
            base_time: None,
            actual_length: None,
            geometry: Vec::new(),
            mapped: false,
            map_revision: 0,
        }
    }

    /// An edge from `a` to `b` with a known base time.
    pub fn between(a: NodeId, b: NodeId, direction: Direction, base_time: Time) -> Self {
        let mut edge = Self::new(EdgeId::new(), Some(a), Some(b), direction);
        edge.base_time = Some(base_time);
        edge
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: EdgeId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn endpoint_a(&self) -> Option<NodeId> {
        self.endpoint_a
    }

    pub fn endpoint_b(&self) -> Option<NodeId> {
        self.endpoint_b
    }

    pub fn endpoints(&self) -> [Option<NodeId>; 2] {
        [self.endpoint_a, self.endpoint_b]
    }

    pub fn set_endpoint_a(&mut self, node: Option<NodeId>) {
        self.endpoint_a = node;
        self.invalidate_map();
    }

    pub fn set_endpoint_b(&mut self, node: Option<NodeId>) {
        self.endpoint_b = node;
        self.invalidate_map();
    }

    pub fn is_endpoint(&self, node: NodeId) -> bool {
        self.endpoint_a == Some(node) || self.endpoint_b == Some(node)
    }

    pub fn is_self_loop(&self) -> bool {
        self.endpoint_a.is_some() && self.endpoint_a == self.endpoint_b
    }

    /// Both endpoints unset.
    pub fn is_orphaned(&self) -> bool {
        self.endpoint_a.is_none() && self.endpoint_b.is_none()
    }

    /// Fill endpoint A if empty, else B.
    ///
    /// # Errors
    ///
    /// [`GraphError::BothEndpointsOccupied`] if neither is free.
    pub fn connect(&mut self, node: NodeId) -> Result<(), GraphError> {
        if self.endpoint_a.is_none() {
            self.set_endpoint_a(Some(node));
        } else if self.endpoint_b.is_none() {
            self.set_endpoint_b(Some(node));
        } else {
            return Err(GraphError::BothEndpointsOccupied(self.id));
        }
        Ok(())
    }

    /// Clear whichever endpoint is `node` (A first).
    ///
    /// # Errors
    ///
    /// [`GraphError::NotAnEndpoint`] if `node` is neither.
    pub fn disconnect(&mut self, node: NodeId) -> Result<(), GraphError> {
        if self.endpoint_a == Some(node) {
            self.set_endpoint_a(None);
        } else if self.endpoint_b == Some(node) {
            self.set_endpoint_b(None);
        } else {
            return Err(GraphError::NotAnEndpoint {
                node,
                edge: self.id,
            });
        }
        Ok(())
    }

    pub fn far_end(&self, node: NodeId) -> FarEnd {
        match (self.endpoint_a, self.endpoint_b) {
            (Some(a), Some(b)) if a == node && b == node => FarEnd::SelfLoop,
            (Some(a), Some(b)) if a == node => FarEnd::Node(b),
            (Some(a), Some(b)) if b == node => FarEnd::Node(a),
            (Some(a), None) | (None, Some(a)) if a == node => FarEnd::Open,
            _ => FarEnd::NotIncident,
        }
    }

    /// The endpoint opposite `node`, or `None` for a self-loop, an open edge
    /// or a node that is not an endpoint. Use [`Edge::far_end`] to tell those
    /// apart.
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        match self.far_end(node) {
            FarEnd::Node(far) => Some(far),
            FarEnd::SelfLoop | FarEnd::Open | FarEnd::NotIncident => None,
        }
    }

    /// Heading of a traversal that starts at `node`.
    pub fn heading_from(&self, node: NodeId) -> Option<Heading> {
        if self.endpoint_a == Some(node) {
            Some(Heading::AToB)
        } else if self.endpoint_b == Some(node) {
            Some(Heading::BToA)
        } else {
            None
        }
    }

    /// `(from, to)` of a traversal in `heading`, if both endpoints are set.
    pub fn oriented(&self, heading: Heading) -> Option<(NodeId, NodeId)> {
        let (a, b) = (self.endpoint_a?, self.endpoint_b?);
        Some(match heading {
            Heading::AToB => (a, b),
            Heading::BToA => (b, a),
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn base_time(&self) -> Option<Time> {
        self.base_time
    }

    pub fn set_base_time(&mut self, base_time: Option<Time>) {
        self.base_time = base_time;
    }

    pub fn actual_length(&self) -> Option<Blocks> {
        self.actual_length
    }

    pub fn geometry(&self) -> &[GeometryPart] {
        &self.geometry
    }

    /// All geometry parts are present.
    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn map_revision(&self) -> u64 {
        self.map_revision
    }

    pub fn map_ticket(&self) -> MapTicket {
        MapTicket {
            edge: self.id,
            revision: self.map_revision,
        }
    }

    /// Drop the mapped geometry and the base time.
    pub fn invalidate_map(&mut self) {
        self.geometry.clear();
        self.base_time = None;
        self.actual_length = None;
        self.mapped = false;
        self.map_revision += 1;
    }

    fn check_ticket(&self, ticket: MapTicket) -> Result<(), GraphError> {
        if ticket.edge != self.id || ticket.revision != self.map_revision {
            return Err(GraphError::StaleMapping {
                edge: self.id,
                ticket: ticket.revision,
                current: self.map_revision,
            });
        }
        Ok(())
    }

    /// Append one sampled part. The length stays undefined until
    /// [`Edge::finish_mapping`].
    ///
    /// # Errors
    ///
    /// [`GraphError::StaleMapping`] if the map was invalidated since the
    /// ticket was issued.
    pub fn push_part(&mut self, ticket: MapTicket, part: GeometryPart) -> Result<(), GraphError> {
        self.check_ticket(ticket)?;
        if self.mapped {
            self.mapped = false;
            self.actual_length = None;
        }
        self.geometry.push(part);
        Ok(())
    }

    /// Mark the mapping complete and measure the edge.
    ///
    /// # Errors
    ///
    /// [`GraphError::StaleMapping`] for an outdated ticket.
    pub fn finish_mapping(
        &mut self,
        ticket: MapTicket,
        base_time: Option<Time>,
    ) -> Result<(), GraphError> {
        self.check_ticket(ticket)?;
        self.actual_length = Some(self.geometry.iter().map(GeometryPart::length).sum());
        self.mapped = true;
        if base_time.is_some() {
            self.base_time = base_time;
        }
        Ok(())
    }

    /// Replace the whole map at once.
    ///
    /// # Errors
    ///
    /// [`GraphError::StaleMapping`] for an outdated ticket.
    pub fn record_geometry(
        &mut self,
        ticket: MapTicket,
        parts: Vec<GeometryPart>,
        base_time: Option<Time>,
    ) -> Result<(), GraphError> {
        self.check_ticket(ticket)?;
        self.geometry = parts;
        self.finish_mapping(ticket, base_time)
    }

    /// Travel time derived from the map at `speed` blocks per tick, with
    /// rail types applied when `per_rail_type` is set.
    pub fn mapped_time(&self, speed: f64, per_rail_type: bool) -> Option<f64> {
        if !self.mapped || speed <= 0.0 {
            return None;
        }
        if !per_rail_type {
            return self.actual_length.map(|length| f64::from(length) / speed);
        }
        Some(
            self.geometry
                .iter()
                .map(|part| {
                    let factor = part.rail.map_or(1.0, RailType::time_factor);
                    f64::from(part.length()) * factor / speed
                })
                .sum(),
        )
    }
}

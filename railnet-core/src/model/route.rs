//! Planned traversals of the graph by one train.

use serde::{Deserialize, Serialize};

use super::edge::Heading;
use super::ids::{EdgeId, NodeId, TrainId};
use crate::{Cost, Time};

/// One edge of a route, traversed in a fixed heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePathSegment {
    pub edge: EdgeId,
    pub heading: Heading,
    pub from: NodeId,
    pub to: NodeId,
    pub required: bool,
    /// Best known traversal time when the route was planned.
    pub average_time: Option<Time>,
    /// Per-edge scalar weight of the line when the route was planned.
    pub weight: f32,
    /// Cost of this segment under the policy used for planning.
    pub cost: Cost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteState {
    #[default]
    Pending,
    Active,
    Completed,
}

/// Result of moving a route one segment forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved,
    /// The last segment of a looping route was passed; carries the new count.
    LoopCompleted(u32),
    Completed,
}

/// An ordered plan of edges for one train.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    train: TrainId,
    segments: Vec<RoutePathSegment>,
    looping: bool,
    destroy_on_complete: bool,
    /// Completed cycles. A non-looping route reports 1 once finished.
    loop_count: u32,
    /// Index of the next segment to traverse.
    position: usize,
    state: RouteState,
    stale: bool,
    skipped: Vec<NodeId>,
}

impl Route {
    pub fn new(
        train: TrainId,
        segments: Vec<RoutePathSegment>,
        looping: bool,
        destroy_on_complete: bool,
    ) -> Self {
        Self {
            train,
            segments,
            looping,
            destroy_on_complete,
            loop_count: 0,
            position: 0,
            state: RouteState::Pending,
            stale: false,
            skipped: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_skipped(mut self, skipped: Vec<NodeId>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn train(&self) -> TrainId {
        self.train
    }

    pub fn segments(&self) -> &[RoutePathSegment] {
        &self.segments
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.segments.iter().map(|segment| segment.edge)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_cost(&self) -> Cost {
        self.segments.iter().map(|segment| segment.cost).sum()
    }

    pub fn start(&self) -> Option<NodeId> {
        self.segments.first().map(|segment| segment.from)
    }

    pub fn end(&self) -> Option<NodeId> {
        self.segments.last().map(|segment| segment.to)
    }

    /// Nodes in visiting order, starting with the first segment's origin.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.start()
            .into_iter()
            .chain(self.segments.iter().map(|segment| segment.to))
            .collect()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn destroy_on_complete(&self) -> bool {
        self.destroy_on_complete
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    /// A looping route never completes.
    pub fn is_complete(&self) -> bool {
        self.state == RouteState::Completed
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Checkpoints dropped by `ignore_on_error` while planning.
    pub fn skipped_checkpoints(&self) -> &[NodeId] {
        &self.skipped
    }

    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        self.segments.iter().any(|segment| segment.edge == edge)
    }

    /// Headings in which this route traverses `edge`.
    pub fn headings_on(&self, edge: EdgeId) -> impl Iterator<Item = Heading> + '_ {
        self.segments
            .iter()
            .filter(move |segment| segment.edge == edge)
            .map(|segment| segment.heading)
    }

    pub fn next_segment(&self) -> Option<&RoutePathSegment> {
        if self.is_complete() {
            return None;
        }
        self.segments.get(self.position)
    }

    /// The node the train is standing at.
    pub fn current_node(&self) -> Option<NodeId> {
        match self.position {
            0 => self.start(),
            position => self.segments.get(position - 1).map(|segment| segment.to),
        }
    }

    /// Move past the next segment.
    pub fn advance(&mut self) -> Advance {
        if self.is_complete() {
            return Advance::Completed;
        }
        self.state = RouteState::Active;
        self.position += 1;
        if self.position < self.segments.len() {
            return Advance::Moved;
        }
        if self.looping && !self.segments.is_empty() {
            self.position = 0;
            self.loop_count += 1;
            Advance::LoopCompleted(self.loop_count)
        } else {
            self.position = self.segments.len();
            self.state = RouteState::Completed;
            self.loop_count = 1;
            Advance::Completed
        }
    }
}

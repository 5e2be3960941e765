//! A network owns the nodes, edges and lines of one domain and keeps both
//! sides of every node/edge connection consistent.

mod command;
mod planning;
mod registry;
mod snapshot;

pub use command::{CommandHandler, CommandOutcome, CommandParam, NetCommand};
pub use planning::RouteProgress;
pub use registry::{Registry, SharedNetwork};
pub use snapshot::NetworkSnapshot;

pub use crate::model::NetworkId;

use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::model::{
    Direction, Edge, EdgeId, FarEnd, GeometryPart, Line, LineId, MapTicket, Node, NodeId, TrainId,
};
use crate::weighting::WeightingPolicy;
use crate::{Error, GraphError, Time};

/// Event queued for a node until its owner drains the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    EdgeAttached(EdgeId),
    EdgeDetached(EdgeId),
    RouteChanged { train: TrainId },
    LineDocked { train: TrainId, reason: String },
    LoopCompleted { train: TrainId, count: u32 },
    RouteCompleted { train: TrainId },
}

#[derive(Debug, Clone)]
pub struct Network {
    id: NetworkId,
    domain: String,
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    /// One line per train.
    routing_table: HashMap<TrainId, Line>,
    policy: WeightingPolicy,
    outbox: Vec<(NodeId, Notification)>,
}

impl Network {
    pub fn new(domain: impl Into<String>) -> Self {
        Self::with_id(NetworkId::new(), domain)
    }

    pub fn with_id(id: NetworkId, domain: impl Into<String>) -> Self {
        Self {
            id,
            domain: domain.into(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            routing_table: HashMap::new(),
            policy: WeightingPolicy::default(),
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub fn policy(&self) -> &WeightingPolicy {
        &self.policy
    }

    /// Replace the network-wide policy. Every planned route becomes stale.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if the policy does not validate.
    pub fn set_policy(&mut self, policy: WeightingPolicy) -> Result<(), Error> {
        policy.validate()?;
        self.policy = policy;
        for line in self.routing_table.values_mut() {
            line.routes_mut().for_each(|route| route.mark_stale());
        }
        Ok(())
    }

    // Nodes

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Take ownership of `node` and point it at this network.
    ///
    /// # Errors
    ///
    /// [`GraphError::NodeAlreadyBound`] if the node belongs to another
    /// network or its identity is already taken here.
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        let id = node.id();
        if node.network().is_some_and(|network| network != self.id) || self.nodes.contains_key(&id)
        {
            return Err(GraphError::NodeAlreadyBound(id));
        }
        let stale = node.clear_edges();
        if !stale.is_empty() {
            warn!(
                "Node {} arrived with {} edges from elsewhere, dropping them",
                node.label(),
                stale.len()
            );
        }
        node.set_network(Some(self.id));
        debug!("Node {} joined network {}", node.label(), self.domain);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node, disconnecting it from every incident edge. Edges left
    /// without endpoints are discarded.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNode`].
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let mut node = self.nodes.remove(&id).ok_or(GraphError::UnknownNode(id))?;
        for edge_id in node.clear_edges() {
            let Some(edge) = self.edges.get_mut(&edge_id) else {
                continue;
            };
            let far = edge.opposite(id);
            if let Err(err) = edge.disconnect(id) {
                warn!("Inconsistent incidence while removing node {id}: {err}");
            }
            let orphaned = edge.is_orphaned();
            self.mark_stale(edge_id);
            if orphaned {
                self.edges.remove(&edge_id);
            }
            if let Some(far) = far {
                self.notify(far, Notification::EdgeDetached(edge_id));
            }
        }
        for line in self.routing_table.values_mut() {
            if line.checkpoints().contains(&id) {
                line.routes_mut().for_each(|route| route.mark_stale());
            }
        }
        node.set_network(None);
        info!("Node {} left network {}", node.label(), self.domain);
        Ok(node)
    }

    /// Take every node out of the network. Edges go with them and all routes
    /// become stale.
    pub(crate) fn release_nodes(&mut self) -> Vec<Node> {
        self.edges.clear();
        for line in self.routing_table.values_mut() {
            line.routes_mut().for_each(|route| route.mark_stale());
        }
        self.nodes
            .drain()
            .map(|(_, mut node)| {
                node.clear_edges();
                node.set_network(None);
                node
            })
            .collect()
    }

    // Edges

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub(crate) fn edge_map(&self) -> &HashMap<EdgeId, Edge> {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert an edge and wire it into the incident lists of its endpoints.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNode`] for an endpoint outside the network,
    /// [`GraphError::CapacityExceeded`] if an endpoint is full. Nothing is
    /// changed on error.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = edge.id();
        let endpoints: Vec<NodeId> = edge.endpoints().into_iter().flatten().collect();
        if let Some(&unknown) = endpoints.iter().find(|node| !self.nodes.contains_key(*node)) {
            return Err(GraphError::UnknownNode(unknown));
        }
        if self.edges.contains_key(&id) {
            warn!("Edge {id} is added twice, replacing the old one");
            self.remove_edge(id)?;
        }

        let mut wired: Vec<NodeId> = Vec::with_capacity(2);
        for &node_id in &endpoints {
            let result = self
                .nodes
                .get_mut(&node_id)
                .ok_or(GraphError::UnknownNode(node_id))
                .and_then(|node| node.connect(id));
            if let Err(err) = result {
                for done in wired {
                    if let Some(node) = self.nodes.get_mut(&done) {
                        node.disconnect(id)?;
                    }
                }
                return Err(err);
            }
            wired.push(node_id);
        }

        debug!("Edge {} added to network {}", edge.label(), self.domain);
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Shorthand for a new edge between two member nodes.
    ///
    /// # Errors
    ///
    /// See [`Network::add_edge`].
    pub fn connect_nodes(
        &mut self,
        a: NodeId,
        b: NodeId,
        direction: Direction,
        base_time: Time,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::between(a, b, direction, base_time))
    }

    /// Remove an edge from the network and from its endpoints.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownEdge`].
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self.edges.remove(&id).ok_or(GraphError::UnknownEdge(id))?;
        for node_id in edge.endpoints().into_iter().flatten() {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                if let Err(err) = node.disconnect(id) {
                    warn!("Inconsistent incidence while removing edge {id}: {err}");
                }
            }
            self.notify(node_id, Notification::EdgeDetached(id));
        }
        self.mark_stale(id);
        for line in self.routing_table.values_mut() {
            line.forget_edge(id);
        }
        debug!("Edge {} removed from network {}", edge.label(), self.domain);
        Ok(edge)
    }

    /// Connect `node` to a free endpoint of `edge`, on both sides.
    ///
    /// # Errors
    ///
    /// [`GraphError::CapacityExceeded`] or
    /// [`GraphError::BothEndpointsOccupied`]; both sides stay unchanged.
    pub fn attach(&mut self, node_id: NodeId, edge_id: EdgeId) -> Result<(), GraphError> {
        let edge = self
            .edges
            .get(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))?;
        if edge.endpoint_a().is_some() && edge.endpoint_b().is_some() {
            return Err(GraphError::BothEndpointsOccupied(edge_id));
        }
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))?;
        node.connect(edge_id)?;

        let connected = self
            .edges
            .get_mut(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))
            .and_then(|edge| edge.connect(node_id));
        if let Err(err) = connected {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.disconnect(edge_id)?;
            }
            return Err(err);
        }

        self.mark_stale(edge_id);
        self.notify(node_id, Notification::EdgeAttached(edge_id));
        Ok(())
    }

    /// Disconnect `node` from `edge` on both sides. An edge left without any
    /// endpoint is discarded.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotConnected`] or [`GraphError::NotAnEndpoint`]; both
    /// sides stay unchanged.
    pub fn detach(&mut self, node_id: NodeId, edge_id: EdgeId) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))?;
        if !node.is_connected(edge_id) {
            return Err(GraphError::NotConnected {
                node: node_id,
                edge: edge_id,
            });
        }
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))?;
        edge.disconnect(node_id)?;
        let orphaned = edge.is_orphaned();
        node.disconnect(edge_id)?;

        self.mark_stale(edge_id);
        if orphaned {
            debug!("Edge {edge_id} has no endpoints left, discarding it");
            self.edges.remove(&edge_id);
        }
        self.notify(node_id, Notification::EdgeDetached(edge_id));
        Ok(())
    }

    /// Drop incident edges of `node` whose other endpoint is unset, and
    /// incident identities the network no longer knows. Self-loops are
    /// complete edges and stay.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNode`].
    pub fn clean_dangling_edges(&mut self, node_id: NodeId) -> Result<Vec<EdgeId>, GraphError> {
        let incident = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))?
            .edges()
            .to_vec();

        let mut cleaned = Vec::new();
        for edge_id in incident.into_iter().unique() {
            match self.edges.get(&edge_id).map(|edge| edge.far_end(node_id)) {
                None => {
                    if let Some(node) = self.nodes.get_mut(&node_id) {
                        node.disconnect(edge_id)?;
                    }
                    cleaned.push(edge_id);
                }
                Some(FarEnd::Open) => {
                    self.detach(node_id, edge_id)?;
                    cleaned.push(edge_id);
                }
                Some(FarEnd::Node(_) | FarEnd::SelfLoop | FarEnd::NotIncident) => {}
            }
        }
        if !cleaned.is_empty() {
            info!("Cleaned {} dangling edges of node {node_id}", cleaned.len());
        }
        Ok(cleaned)
    }

    /// Discard every edge without endpoints.
    pub fn purge_orphaned_edges(&mut self) -> Vec<EdgeId> {
        let orphaned: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|edge| edge.is_orphaned())
            .map(Edge::id)
            .sorted()
            .collect();
        for &id in &orphaned {
            self.edges.remove(&id);
            self.mark_stale(id);
        }
        orphaned
    }

    /// Change the travel direction of an edge. Routes that traverse it in a
    /// heading the new direction forbids become stale.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownEdge`].
    pub fn set_direction(
        &mut self,
        edge_id: EdgeId,
        direction: Direction,
    ) -> Result<(), GraphError> {
        let edge = self
            .edges
            .get_mut(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))?;
        edge.set_direction(direction);
        for line in self.routing_table.values_mut() {
            for route in line.routes_mut() {
                let forbidden = route
                    .headings_on(edge_id)
                    .any(|heading| !direction.permits(heading));
                if forbidden {
                    route.mark_stale();
                }
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`GraphError::UnknownEdge`].
    pub fn set_base_time(
        &mut self,
        edge_id: EdgeId,
        base_time: Option<Time>,
    ) -> Result<(), GraphError> {
        self.edges
            .get_mut(&edge_id)
            .ok_or(GraphError::UnknownEdge(edge_id))?
            .set_base_time(base_time);
        Ok(())
    }

    /// Distinct nodes directly reachable over one incident edge, in
    /// connection order.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNode`].
    pub fn connected_clients(&self, node_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let node = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))?;
        Ok(node
            .edges()
            .iter()
            .filter_map(|edge| self.edges.get(edge)?.opposite(node_id))
            .unique()
            .collect())
    }

    // Mapping

    /// Start a mapping run for `edge`.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownEdge`].
    pub fn map_ticket(&self, edge_id: EdgeId) -> Result<MapTicket, GraphError> {
        self.edges
            .get(&edge_id)
            .map(Edge::map_ticket)
            .ok_or(GraphError::UnknownEdge(edge_id))
    }

    /// # Errors
    ///
    /// [`GraphError::StaleMapping`] if the edge changed since the ticket was
    /// issued.
    pub fn push_geometry_part(
        &mut self,
        ticket: MapTicket,
        part: GeometryPart,
    ) -> Result<(), GraphError> {
        self.with_mapping(ticket, |edge| edge.push_part(ticket, part))
    }

    /// # Errors
    ///
    /// [`GraphError::StaleMapping`] for an outdated ticket.
    pub fn finish_mapping(
        &mut self,
        ticket: MapTicket,
        base_time: Option<Time>,
    ) -> Result<(), GraphError> {
        self.with_mapping(ticket, |edge| edge.finish_mapping(ticket, base_time))?;
        self.mark_stale(ticket.edge);
        Ok(())
    }

    /// Replace the whole geometry of an edge in one step.
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
        self.with_mapping(ticket, |edge| edge.record_geometry(ticket, parts, base_time))?;
        self.mark_stale(ticket.edge);
        Ok(())
    }

    fn with_mapping(
        &mut self,
        ticket: MapTicket,
        apply: impl FnOnce(&mut Edge) -> Result<(), GraphError>,
    ) -> Result<(), GraphError> {
        let edge = self
            .edges
            .get_mut(&ticket.edge)
            .ok_or(GraphError::UnknownEdge(ticket.edge))?;
        apply(edge).inspect_err(|err| warn!("Discarding mapping result: {err}"))
    }

    // Lines

    /// Register the line of a train, replacing and returning any previous one.
    pub fn insert_line(&mut self, line: Line) -> Option<Line> {
        let train = line.train();
        info!("Line {} assigned to train {train}", line.id());
        self.routing_table.insert(train, line)
    }

    /// Drop the line of a train and free the junctions it held.
    pub fn remove_line(&mut self, train: TrainId) -> Option<Line> {
        let line = self.routing_table.remove(&train)?;
        self.release_lock(train);
        Some(line)
    }

    /// Unlock the train's line and every junction locked by the train.
    pub(crate) fn release_lock(&mut self, train: TrainId) {
        if let Some(line) = self.routing_table.get_mut(&train) {
            line.set_locked(false);
        }
        for node in self.nodes.values_mut() {
            if node.release_junction(train) {
                debug!("Junction {} released by train {train}", node.id());
            }
        }
    }

    pub fn line(&self, train: TrainId) -> Option<&Line> {
        self.routing_table.get(&train)
    }

    pub fn line_mut(&mut self, train: TrainId) -> Option<&mut Line> {
        self.routing_table.get_mut(&train)
    }

    pub fn line_by_id(&self, id: LineId) -> Option<&Line> {
        self.routing_table.values().find(|line| line.id() == id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.routing_table.values()
    }

    pub fn line_count(&self) -> usize {
        self.routing_table.len()
    }

    // Notifications

    /// Queue a notification unless the node has them disabled.
    pub(crate) fn notify(&mut self, node: NodeId, notification: Notification) {
        if self
            .nodes
            .get(&node)
            .is_some_and(Node::notifications_enabled)
        {
            self.outbox.push((node, notification));
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<(NodeId, Notification)> {
        std::mem::take(&mut self.outbox)
    }

    /// Mark every route through `edge` stale; returns how many were marked.
    fn mark_stale(&mut self, edge: EdgeId) -> usize {
        let mut marked = 0;
        for line in self.routing_table.values_mut() {
            for route in line.routes_mut() {
                if route.contains_edge(edge) && !route.is_stale() {
                    route.mark_stale();
                    marked += 1;
                }
            }
        }
        if marked > 0 {
            debug!("{marked} routes through edge {edge} became stale");
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn two_stations() -> (Network, NodeId, NodeId) {
        let mut network = Network::new("test");
        let a = network.add_node(Node::station("A")).unwrap();
        let b = network.add_node(Node::station("B")).unwrap();
        (network, a, b)
    }

    #[test]
    fn test_add_edge_wires_both_endpoints() {
        let (mut network, a, b) = two_stations();
        let edge = network
            .connect_nodes(a, b, Direction::Bidirectional, 5)
            .unwrap();

        assert_eq!(network.node(a).unwrap().edges(), &[edge]);
        assert_eq!(network.node(b).unwrap().edges(), &[edge]);
        assert_eq!(network.node(a).unwrap().network(), Some(network.id()));
        assert_eq!(network.connected_clients(a).unwrap(), vec![b]);
    }

    #[test]
    fn test_attach_then_detach_restores_state() {
        let (mut network, a, b) = two_stations();
        let edge = network
            .add_edge(Edge::new(EdgeId::new(), Some(a), None, Direction::Forward))
            .unwrap();
        let before_a = network.node(a).unwrap().edges().to_vec();
        let before_b = network.node(b).unwrap().edges().to_vec();

        network.attach(b, edge).unwrap();
        assert_eq!(network.edge(edge).unwrap().endpoint_b(), Some(b));
        network.detach(b, edge).unwrap();

        assert_eq!(network.node(a).unwrap().edges(), before_a.as_slice());
        assert_eq!(network.node(b).unwrap().edges(), before_b.as_slice());
        assert_eq!(network.edge(edge).unwrap().endpoint_b(), None);
    }

    #[test]
    fn test_attach_full_node_leaves_edge_untouched() {
        let (mut network, a, b) = two_stations();
        network.node_mut(b).unwrap().set_max_edges(Some(0));
        let edge = network
            .add_edge(Edge::new(EdgeId::new(), Some(a), None, Direction::Forward))
            .unwrap();

        assert!(matches!(
            network.attach(b, edge),
            Err(GraphError::CapacityExceeded { .. })
        ));
        assert_eq!(network.edge(edge).unwrap().endpoint_b(), None);
        assert!(network.node(b).unwrap().edges().is_empty());
    }

    #[test]
    fn test_detaching_last_endpoint_discards_edge() {
        let (mut network, a, _) = two_stations();
        let edge = network
            .add_edge(Edge::new(EdgeId::new(), Some(a), None, Direction::Forward))
            .unwrap();
        network.detach(a, edge).unwrap();
        assert!(network.edge(edge).is_none());
    }

    #[test]
    fn test_clean_dangling_edges() {
        let (mut network, a, b) = two_stations();
        let kept = network
            .connect_nodes(a, b, Direction::Bidirectional, 5)
            .unwrap();
        let open = network
            .add_edge(Edge::new(EdgeId::new(), Some(a), None, Direction::Forward))
            .unwrap();

        assert_eq!(network.clean_dangling_edges(a).unwrap(), vec![open]);
        assert_eq!(network.node(a).unwrap().edges(), &[kept]);
        assert!(network.edge(open).is_none());
    }

    #[test]
    fn test_remove_node_disconnects_edges() {
        let (mut network, a, b) = two_stations();
        let edge = network
            .connect_nodes(a, b, Direction::Bidirectional, 5)
            .unwrap();
        let removed = network.remove_node(b).unwrap();

        assert_eq!(removed.network(), None);
        assert!(removed.edges().is_empty());
        assert_eq!(network.edge(edge).unwrap().endpoints(), [Some(a), None]);
        assert_eq!(network.connected_clients(a).unwrap(), Vec::<NodeId>::new());
    }

    #[test]
    fn test_capacity_error_rolls_back_add_edge() {
        let (mut network, a, b) = two_stations();
        network.node_mut(b).unwrap().set_max_edges(Some(0));
        let result = network.connect_nodes(a, b, Direction::Forward, 1);

        assert!(matches!(result, Err(GraphError::CapacityExceeded { .. })));
        assert!(network.node(a).unwrap().edges().is_empty());
        assert_eq!(network.edge_count(), 0);
    }

    #[test]
    fn test_node_of_other_network_is_rejected() {
        let (mut first, a, _) = two_stations();
        let node = first.remove_node(a).unwrap();
        let mut second = Network::new("other");
        second.add_node(node).unwrap();

        let mut bound = second.node(a).unwrap().clone();
        bound.set_network(Some(NetworkId::new()));
        assert_eq!(first.add_node(bound), Err(GraphError::NodeAlreadyBound(a)));
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let (mut network, a, b) = two_stations();
        let edge = network
            .connect_nodes(a, b, Direction::Bidirectional, 5)
            .unwrap();
        let ticket = network.map_ticket(edge).unwrap();
        let c = network.add_node(Node::station("C")).unwrap();
        network.detach(b, edge).unwrap();
        network.attach(c, edge).unwrap();

        let part = GeometryPart::new([0, 0, 0], [5, 0, 0], None).unwrap();
        assert!(matches!(
            network.record_geometry(ticket, vec![part], None),
            Err(GraphError::StaleMapping { .. })
        ));
        assert!(network.edge(edge).unwrap().geometry().is_empty());
    }

    #[test]
    fn test_notifications_respect_update_disable() {
        let (mut network, a, b) = two_stations();
        network.dispatch(b, NetCommand::UpdateDisable, &CommandParam::None);
        network
            .connect_nodes(a, b, Direction::Bidirectional, 5)
            .unwrap();
        let edge = network.node(a).unwrap().edges()[0];
        network.remove_edge(edge).unwrap();

        let notified: Vec<NodeId> = network
            .drain_notifications()
            .into_iter()
            .map(|(node, _)| node)
            .collect();
        assert_eq!(notified, vec![a]);
        assert!(network.drain_notifications().is_empty());
    }
}

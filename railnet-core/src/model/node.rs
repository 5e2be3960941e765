//! Network endpoints ("clients") and their command capability.

use log::warn;
use serde::{Deserialize, Serialize};

use super::ids::{EdgeId, NetworkId, NodeId, TrainId};
use crate::GraphError;
use crate::network::{CommandHandler, CommandParam, NetCommand};

/// A network endpoint: station, junction or signal.
///
/// A node only stores the identities of its incident edges. The edges
/// themselves live in the owning [`Network`](crate::Network), which keeps both
/// sides of a connection in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    name: Option<String>,
    network: Option<NetworkId>,
    /// Incident edges in connection order. A self-loop appears twice.
    edges: Vec<EdgeId>,
    /// `None` means unbounded.
    max_edges: Option<usize>,
    kind: NodeKind,
    responsive: bool,
    notifications_enabled: bool,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self::with_id(NodeId::new(), Some(name.into()), kind)
    }

    pub fn with_id(id: NodeId, name: Option<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            network: None,
            edges: Vec::new(),
            max_edges: None,
            kind,
            responsive: true,
            notifications_enabled: true,
        }
    }

    /// A station named `name` whose identity is derived from the name.
    pub fn station(name: &str) -> Self {
        Self::with_id(
            NodeId::from_name(name),
            Some(name.to_string()),
            NodeKind::Station(Station),
        )
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Display label, falling back to the identity.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn network(&self) -> Option<NetworkId> {
        self.network
    }

    pub(crate) fn set_network(&mut self, network: Option<NetworkId>) {
        self.network = network;
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    pub fn max_edges(&self) -> Option<usize> {
        self.max_edges
    }

    /// Limit the number of incident edges. Already connected edges are kept
    /// even if they exceed a lowered limit.
    pub fn set_max_edges(&mut self, max_edges: Option<usize>) {
        if let Some(limit) = max_edges {
            if self.edges.len() > limit {
                warn!(
                    "Node {} holds {} edges, more than its new limit of {limit}",
                    self.id,
                    self.edges.len()
                );
            }
        }
        self.max_edges = max_edges;
    }

    pub fn is_connected(&self, edge: EdgeId) -> bool {
        self.edges.contains(&edge)
    }

    /// Append `edge` to the incident list.
    ///
    /// Only this side of the connection is touched; wiring the edge's
    /// endpoint is the caller's job (see [`Network::attach`](crate::Network::attach)).
    ///
    /// # Errors
    ///
    /// [`GraphError::CapacityExceeded`] if the node is at its limit.
    pub fn connect(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        if let Some(limit) = self.max_edges {
            if self.edges.len() >= limit {
                return Err(GraphError::CapacityExceeded {
                    node: self.id,
                    limit,
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Remove one occurrence of `edge` from the incident list.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotConnected`] if the edge is not incident.
    pub fn disconnect(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        let position = self
            .edges
            .iter()
            .rposition(|&incident| incident == edge)
            .ok_or(GraphError::NotConnected {
                node: self.id,
                edge,
            })?;
        self.edges.remove(position);
        Ok(())
    }

    pub(crate) fn clear_edges(&mut self) -> Vec<EdgeId> {
        std::mem::take(&mut self.edges)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Clear a junction lock held by `train`. Returns whether one was held.
    pub(crate) fn release_junction(&mut self, train: TrainId) -> bool {
        match &mut self.kind {
            NodeKind::Junction(junction) => junction.release(train),
            NodeKind::Station(_) | NodeKind::Signal(_) => false,
        }
    }

    /// An unresponsive node refuses commands and turns its edges into ghost
    /// edges for route search.
    pub fn is_responsive(&self) -> bool {
        self.responsive
    }

    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }
}

impl CommandHandler for Node {
    fn handle_command(&mut self, command: NetCommand, param: &CommandParam) -> bool {
        if !self.responsive {
            return false;
        }
        let accepted = self.kind.handle_command(command, param);
        if accepted {
            match command {
                NetCommand::UpdateDisable => self.notifications_enabled = false,
                NetCommand::UpdateEnable => self.notifications_enabled = true,
                _ => {}
            }
        }
        accepted
    }
}

/// The concrete node kinds known to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Station(Station),
    Junction(Junction),
    Signal(Signal),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Station(_) => "station",
            NodeKind::Junction(_) => "junction",
            NodeKind::Signal(_) => "signal",
        }
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Station(Station)
    }
}

impl CommandHandler for NodeKind {
    fn handle_command(&mut self, command: NetCommand, param: &CommandParam) -> bool {
        match self {
            NodeKind::Station(station) => station.handle_command(command, param),
            NodeKind::Junction(junction) => junction.handle_command(command, param),
            NodeKind::Signal(signal) => signal.handle_command(command, param),
        }
    }
}

/// Terminal where lines start, stop and refuel. Accepts every command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station;

impl CommandHandler for Station {
    fn handle_command(&mut self, _command: NetCommand, _param: &CommandParam) -> bool {
        true
    }
}

/// Switch point. Junctions never own a line's default route and can be
/// locked by one train at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    locked_by: Option<TrainId>,
}

impl Junction {
    pub fn locked_by(&self) -> Option<TrainId> {
        self.locked_by
    }

    pub(crate) fn release(&mut self, train: TrainId) -> bool {
        if self.locked_by == Some(train) {
            self.locked_by = None;
            return true;
        }
        false
    }
}

impl CommandHandler for Junction {
    fn handle_command(&mut self, command: NetCommand, param: &CommandParam) -> bool {
        match command {
            NetCommand::RouteSet => false,
            NetCommand::RouteLocked => match (self.locked_by, param.train()) {
                (Some(holder), Some(train)) if holder != train => false,
                (_, Some(train)) => {
                    self.locked_by = Some(train);
                    true
                }
                (_, None) => false,
            },
            NetCommand::RouteDefault => {
                if let Some(train) = param.train() {
                    self.release(train);
                }
                true
            }
            NetCommand::Route | NetCommand::UpdateDisable | NetCommand::UpdateEnable => true,
        }
    }
}

/// Block signal. Can only release routes and toggle notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal;

impl CommandHandler for Signal {
    fn handle_command(&mut self, command: NetCommand, _param: &CommandParam) -> bool {
        matches!(
            command,
            NetCommand::RouteDefault | NetCommand::UpdateDisable | NetCommand::UpdateEnable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_respects_capacity() {
        let mut node = Node::station("A");
        node.set_max_edges(Some(1));
        node.connect(EdgeId::from_u128(1)).unwrap();

        let err = node.connect(EdgeId::from_u128(2)).unwrap_err();
        assert_eq!(
            err,
            GraphError::CapacityExceeded {
                node: node.id(),
                limit: 1
            }
        );
        assert_eq!(node.degree(), 1);
    }

    #[test]
    fn test_connect_then_disconnect_restores_edges() {
        let mut node = Node::station("A");
        node.connect(EdgeId::from_u128(1)).unwrap();
        let before = node.edges().to_vec();

        node.connect(EdgeId::from_u128(2)).unwrap();
        node.disconnect(EdgeId::from_u128(2)).unwrap();

        assert_eq!(node.edges(), before.as_slice());
    }

    #[test]
    fn test_disconnect_unknown_edge() {
        let mut node = Node::station("A");
        let edge = EdgeId::from_u128(7);
        assert_eq!(
            node.disconnect(edge),
            Err(GraphError::NotConnected {
                node: node.id(),
                edge
            })
        );
    }

    #[test]
    fn test_self_loop_occupies_two_slots() {
        let mut node = Node::station("A");
        let edge = EdgeId::from_u128(3);
        node.connect(edge).unwrap();
        node.connect(edge).unwrap();
        node.disconnect(edge).unwrap();
        assert!(node.is_connected(edge));
    }

    #[test]
    fn test_update_commands_toggle_notifications() {
        let mut node = Node::station("A");
        assert!(node.handle_command(NetCommand::UpdateDisable, &CommandParam::None));
        assert!(!node.notifications_enabled());
        assert!(node.handle_command(NetCommand::UpdateEnable, &CommandParam::None));
        assert!(node.notifications_enabled());
    }

    #[test]
    fn test_unresponsive_node_refuses() {
        let mut node = Node::station("A");
        node.set_responsive(false);
        assert!(!node.handle_command(NetCommand::UpdateDisable, &CommandParam::None));
        assert!(node.notifications_enabled());
    }

    #[test]
    fn test_junction_lock_is_exclusive() {
        let first = TrainId::from_u128(1);
        let second = TrainId::from_u128(2);
        let mut junction = Junction::default();

        assert!(junction.handle_command(NetCommand::RouteLocked, &CommandParam::Train(first)));
        assert!(!junction.handle_command(NetCommand::RouteLocked, &CommandParam::Train(second)));
        assert!(junction.handle_command(NetCommand::RouteDefault, &CommandParam::Train(first)));
        assert_eq!(junction.locked_by(), None);
        assert!(junction.handle_command(NetCommand::RouteLocked, &CommandParam::Train(second)));
    }

    #[test]
    fn test_signal_refuses_routing() {
        let mut signal = Signal;
        assert!(!signal.handle_command(NetCommand::Route, &CommandParam::None));
        assert!(signal.handle_command(NetCommand::RouteDefault, &CommandParam::None));
    }
}

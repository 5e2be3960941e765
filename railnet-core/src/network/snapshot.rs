//! Serializable image of a network, used for persistence and inspection.

use std::path::Path;

use hashbrown::HashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{Network, NetworkId};
use crate::Error;
use crate::model::{Edge, EdgeId, Line, Node, NodeId};
use crate::weighting::WeightingPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub id: NetworkId,
    pub domain: String,
    #[serde(default)]
    pub policy: WeightingPolicy,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl NetworkSnapshot {
    /// # Errors
    ///
    /// [`Error::JsonError`] on serialization failure.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// [`Error::JsonError`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// I/O or serialization errors.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        std::fs::write(path, self.to_json()?)?;
        info!("Saved network {} to {}", self.domain, path.display());
        Ok(())
    }

    /// # Errors
    ///
    /// I/O or deserialization errors.
    pub fn load(path: &Path) -> Result<Self, Error> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl Network {
    /// Entities in identity order, so equal networks give equal snapshots.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let mut nodes: Vec<Node> = self.nodes.values().cloned().collect();
        nodes.sort_unstable_by_key(Node::id);
        let mut edges: Vec<Edge> = self.edges.values().cloned().collect();
        edges.sort_unstable_by_key(Edge::id);
        let mut lines: Vec<Line> = self.routing_table.values().cloned().collect();
        lines.sort_unstable_by_key(Line::train);

        NetworkSnapshot {
            id: self.id,
            domain: self.domain.clone(),
            policy: self.policy.clone(),
            nodes,
            edges,
            lines,
        }
    }

    /// Rebuild a network, checking that both sides of every connection
    /// agree.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] for duplicate identities, nodes of another
    /// network, or incidence lists that disagree with edge endpoints.
    pub fn from_snapshot(snapshot: NetworkSnapshot) -> Result<Self, Error> {
        snapshot.policy.validate()?;
        let mut network = Network::with_id(snapshot.id, snapshot.domain);
        network.policy = snapshot.policy;

        for mut node in snapshot.nodes {
            let id = node.id();
            match node.network() {
                Some(other) if other != network.id => {
                    return Err(Error::InvalidData(format!(
                        "node {id} belongs to network {other}"
                    )));
                }
                _ => node.set_network(Some(network.id)),
            }
            if network.nodes.insert(id, node).is_some() {
                return Err(Error::InvalidData(format!("duplicate node {id}")));
            }
        }

        // Endpoint slots each edge occupies per node, to compare with the
        // nodes' incidence lists.
        let mut slots: HashMap<(NodeId, EdgeId), usize> = HashMap::new();
        for edge in snapshot.edges {
            let id = edge.id();
            for endpoint in edge.endpoints().into_iter().flatten() {
                if !network.nodes.contains_key(&endpoint) {
                    return Err(Error::InvalidData(format!(
                        "edge {id} ends at unknown node {endpoint}"
                    )));
                }
                *slots.entry((endpoint, id)).or_default() += 1;
            }
            if network.edges.insert(id, edge).is_some() {
                return Err(Error::InvalidData(format!("duplicate edge {id}")));
            }
        }

        let mut listed: HashMap<(NodeId, EdgeId), usize> = HashMap::new();
        for node in network.nodes.values() {
            for &edge in node.edges() {
                *listed.entry((node.id(), edge)).or_default() += 1;
            }
        }
        let mismatch = slots
            .keys()
            .chain(listed.keys())
            .find(|key| slots.get(*key) != listed.get(*key));
        if let Some(&(node, edge)) = mismatch {
            return Err(Error::InvalidData(format!(
                "node {node} and edge {edge} disagree about their connection"
            )));
        }

        for line in snapshot.lines {
            if let Some(policy) = line.policy() {
                policy.validate()?;
            }
            for checkpoint in line.checkpoints() {
                if !network.nodes.contains_key(checkpoint) {
                    warn!("Line {} stops at unknown node {checkpoint}", line.id());
                }
            }
            let train = line.train();
            if network.routing_table.insert(train, line).is_some() {
                return Err(Error::InvalidData(format!("duplicate line for train {train}")));
            }
        }

        info!(
            "Restored network {}: {} nodes, {} edges, {} lines",
            network.domain,
            network.nodes.len(),
            network.edges.len(),
            network.routing_table.len()
        );
        Ok(network)
    }
}

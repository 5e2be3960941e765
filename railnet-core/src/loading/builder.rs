use hashbrown::{HashMap, HashSet};
use log::{debug, info, warn};

use super::config::RailNetConfig;
use super::description::{
    EdgeDescription, LineDescription, NetworkDescription, NodeDescription, NodeKindName,
    SegmentDescription,
};
use crate::model::{
    Edge, EdgeId, GeometryPart, Junction, Line, LineId, Node, NodeId, NodeKind, SegmentWeight,
    Signal, Station, TrainId,
};
use crate::{Error, Network, NetworkId};

/// Creates a network from a description, filling gaps from `config`
///
/// Identities derive from names, so building the same description twice
/// gives identical networks.
///
/// # Errors
///
/// Returns an error if the description refers to unknown names, repeats a
/// name, or contains invalid weights or geometry
pub fn create_network(
    description: &NetworkDescription,
    config: &RailNetConfig,
) -> Result<Network, Error> {
    validate_description(description)?;
    config.validate()?;

    let mut network = Network::with_id(
        NetworkId::from_name(&description.domain),
        description.domain.clone(),
    );
    network.set_policy(
        description
            .policy
            .clone()
            .unwrap_or_else(|| config.policy.clone()),
    )?;

    info!(
        "Building network {}: {} nodes",
        description.domain,
        description.nodes.len()
    );
    let mut nodes: HashMap<&str, NodeId> = HashMap::with_capacity(description.nodes.len());
    for declared in &description.nodes {
        let id = network.add_node(build_node(declared))?;
        nodes.insert(declared.name.as_str(), id);
    }

    let mut edges: HashMap<&str, EdgeId> = HashMap::with_capacity(description.edges.len());
    for declared in &description.edges {
        let id = add_edge(&mut network, &nodes, declared)?;
        edges.insert(declared.name.as_str(), id);
    }
    info!("Added {} edges", network.edge_count());

    for declared in &description.lines {
        let line = build_line(declared, config, &nodes, &edges)?;
        debug!(
            "Line for train {} with {} checkpoints",
            declared.train,
            line.checkpoints().len()
        );
        network.insert_line(line);
    }
    info!(
        "Network {} created with {} lines",
        network.domain(),
        network.line_count()
    );
    Ok(network)
}

fn validate_description(description: &NetworkDescription) -> Result<(), Error> {
    if description.domain.trim().is_empty() {
        return Err(Error::InvalidData(
            "Network description has an empty domain".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(name) = description
        .nodes
        .iter()
        .map(|node| node.name.as_str())
        .find(|name| !seen.insert(*name))
    {
        return Err(Error::InvalidData(format!("Duplicate node name: {name}")));
    }

    let mut seen = HashSet::new();
    if let Some(name) = description
        .edges
        .iter()
        .map(|edge| edge.name.as_str())
        .find(|name| !seen.insert(*name))
    {
        return Err(Error::InvalidData(format!("Duplicate edge name: {name}")));
    }

    let mut seen = HashSet::new();
    if let Some(train) = description
        .lines
        .iter()
        .map(|line| line.train.as_str())
        .find(|train| !seen.insert(*train))
    {
        return Err(Error::InvalidData(format!(
            "Train {train} has more than one line"
        )));
    }

    if description.nodes.is_empty() && !description.edges.is_empty() {
        warn!(
            "Network {} declares edges but no nodes",
            description.domain
        );
    }
    Ok(())
}

fn build_node(declared: &NodeDescription) -> Node {
    let kind = match declared.kind {
        NodeKindName::Station => NodeKind::Station(Station),
        NodeKindName::Junction => NodeKind::Junction(Junction::default()),
        NodeKindName::Signal => NodeKind::Signal(Signal),
    };
    let mut node = Node::with_id(
        NodeId::from_name(&declared.name),
        Some(declared.name.clone()),
        kind,
    );
    node.set_max_edges(declared.capacity);
    node.set_responsive(declared.responsive);
    node
}

fn resolve<T: Copy>(names: &HashMap<&str, T>, name: &str, what: &str) -> Result<T, Error> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| Error::InvalidData(format!("Unknown {what}: {name}")))
}

fn add_edge(
    network: &mut Network,
    nodes: &HashMap<&str, NodeId>,
    declared: &EdgeDescription,
) -> Result<EdgeId, Error> {
    let a = resolve(nodes, &declared.a, "node")?;
    let b = resolve(nodes, &declared.b, "node")?;
    let id = EdgeId::from_name(&declared.name);
    let mut edge =
        Edge::new(id, Some(a), Some(b), declared.direction).with_name(declared.name.as_str());
    edge.set_base_time(declared.base_time);
    network.add_edge(edge)?;

    if !declared.geometry.is_empty() {
        let parts = declared
            .geometry
            .iter()
            .map(|part| GeometryPart::new(part.from, part.to, part.rail))
            .collect::<Result<Vec<_>, _>>()?;
        let ticket = network.map_ticket(id)?;
        network.record_geometry(ticket, parts, None)?;
    }
    Ok(id)
}

fn build_line(
    declared: &LineDescription,
    config: &RailNetConfig,
    nodes: &HashMap<&str, NodeId>,
    edges: &HashMap<&str, EdgeId>,
) -> Result<Line, Error> {
    let checkpoints = declared
        .checkpoints
        .iter()
        .map(|name| resolve(nodes, name, "checkpoint"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut line = Line::new(TrainId::from_name(&declared.train), checkpoints)
        .with_id(LineId::from_name(&declared.train))
        .with_toggles(declared.toggles.unwrap_or(config.line_defaults));
    if let Some(policy) = &declared.policy {
        policy.validate()?;
        line = line.with_policy(policy.clone());
    }
    for segment in &declared.segments {
        line = line.with_segment(build_segment(segment, edges)?);
    }
    Ok(line)
}

fn build_segment(
    declared: &SegmentDescription,
    edges: &HashMap<&str, EdgeId>,
) -> Result<SegmentWeight, Error> {
    let mut weight = SegmentWeight::new(resolve(edges, &declared.edge, "edge")?);
    weight.set_required(declared.required);
    weight.set_restricted(declared.restricted);
    if let Some(scalar) = declared.weight {
        weight.set_weight(scalar);
    }
    weight.set_real_time(declared.real_time);
    weight.set_fuel_consumption(declared.fuel);
    Ok(weight)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Direction;

    fn triangle() -> NetworkDescription {
        NetworkDescription::from_toml_str(
            r#"
domain = "overworld"

nodes = [{ name = "A" }, { name = "B" }, { name = "C", kind = "signal" }]

[[edges]]
name = "A-B"
a = "A"
b = "B"
base_time = 2

[[edges]]
name = "B-C"
a = "B"
b = "C"
base_time = 3
geometry = [{ from = [0, 64, 0], to = [0, 64, 12] }]

[[lines]]
train = "T1"
checkpoints = ["A", "C"]
segments = [{ edge = "B-C", weight = 0.0, required = true }]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_builds_named_entities() {
        let network = create_network(&triangle(), &RailNetConfig::default()).unwrap();
        assert_eq!(network.node_count(), 3);
        assert_eq!(network.edge_count(), 2);

        let b = NodeId::from_name("B");
        assert_eq!(network.node(b).unwrap().degree(), 2);
        let bc = network.edge(EdgeId::from_name("B-C")).unwrap();
        assert_eq!(bc.direction(), Direction::Bidirectional);
        assert_eq!(bc.actual_length(), Some(12));
        assert!(bc.is_mapped());

        let line = network.line(TrainId::from_name("T1")).unwrap();
        let segment = line.segment_weight(EdgeId::from_name("B-C")).unwrap();
        assert_eq!(segment.weight(), 1.0);
        assert!(segment.is_required());
        assert_eq!(line.toggles(), &RailNetConfig::default().line_defaults);
    }

    #[test]
    fn test_build_is_reproducible() {
        let config = RailNetConfig::default();
        let first = create_network(&triangle(), &config).unwrap();
        let second = create_network(&triangle(), &config).unwrap();
        assert_eq!(first.snapshot(), second.snapshot());
    }

    #[test]
    fn test_unknown_endpoint_is_rejected() {
        let mut description = triangle();
        description.edges[0].b = "Z".to_string();
        let err = create_network(&description, &RailNetConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(message) if message.contains('Z')));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut description = triangle();
        description.nodes.push(description.nodes[0].clone());
        let err = create_network(&description, &RailNetConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_description_policy_wins_over_config() {
        let mut description = triangle();
        let mut policy = RailNetConfig::default().policy;
        policy.weighted_distance = true;
        description.policy = Some(policy.clone());
        let network = create_network(&description, &RailNetConfig::default()).unwrap();
        assert_eq!(network.policy(), &policy);
    }
}

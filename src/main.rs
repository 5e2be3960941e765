mod cli;

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use railnet_core::prelude::*;

fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match &cli.config {
        Some(path) => RailNetConfig::load(path)?,
        None => RailNetConfig::default(),
    };

    match cli.command {
        Commands::Plan { file } => {
            let (description, mut network) = load(&file, &config)?;
            for line in &description.lines {
                print_planned(&mut network, &line.train);
            }
        }
        Commands::Route { file, train } => {
            let (description, mut network) = load(&file, &config)?;
            if !description.lines.iter().any(|line| line.train == train) {
                return Err(Error::InvalidData(format!(
                    "No line for train {train} in {}",
                    file.display()
                )));
            }
            print_planned(&mut network, &train);
        }
        Commands::Snapshot { file, out } => {
            let (_, network) = load(&file, &config)?;
            let mut registry = Registry::new();
            let id = network.id();
            registry.insert_network(network);
            for (_, train, result) in registry.plan_all() {
                if let Err(err) = result {
                    warn!("Train {train}: {err}");
                }
            }
            let snapshot = registry
                .network(id)
                .ok_or(Error::UnknownNetwork(id))?
                .read()
                .snapshot();
            match out {
                Some(path) => snapshot.save(&path)?,
                None => println!("{}", snapshot.to_json()?),
            }
        }
        Commands::Inspect { file } => {
            let (_, network) = load(&file, &config)?;
            inspect(&network)?;
        }
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load(path: &Path, config: &RailNetConfig) -> Result<(NetworkDescription, Network), Error> {
    info!("Loading network description {}", path.display());
    let description = NetworkDescription::load(path)?;
    let network = create_network(&description, config)?;
    Ok((description, network))
}

fn print_planned(network: &mut Network, train: &str) {
    let id = TrainId::from_name(train);
    match network.plan_line(id) {
        Ok(route) => {
            let route = route.clone();
            println!("{train}: cost {:.2}", route.total_cost());
            for segment in route.segments() {
                println!(
                    "  {} -> {} via {} ({:.2})",
                    node_label(network, segment.from),
                    node_label(network, segment.to),
                    edge_label(network, segment.edge),
                    segment.cost
                );
            }
            for skipped in route.skipped_checkpoints() {
                println!("  skipped {}", node_label(network, *skipped));
            }
        }
        Err(err) => println!("{train}: {err}"),
    }
}

fn inspect(network: &Network) -> Result<(), Error> {
    println!("network {} ({})", network.domain(), network.id());

    let mut nodes: Vec<&Node> = network.nodes().collect();
    nodes.sort_by_key(|node| node.label());
    println!("{} nodes", nodes.len());
    for node in nodes {
        let clients = network
            .connected_clients(node.id())?
            .into_iter()
            .map(|client| node_label(network, client))
            .collect::<Vec<_>>();
        println!(
            "  {} [{}] edges={} clients=[{}]",
            node.label(),
            node.kind().name(),
            node.degree(),
            clients.join(", ")
        );
    }

    let mut edges: Vec<&Edge> = network.edges().collect();
    edges.sort_by_key(|edge| edge.label());
    println!("{} edges", edges.len());
    for edge in edges {
        let [a, b] = edge
            .endpoints()
            .map(|end| end.map_or_else(|| "-".to_string(), |node| node_label(network, node)));
        let time = edge
            .base_time()
            .map_or_else(|| "?".to_string(), |time| time.to_string());
        println!(
            "  {} {a} -> {b} {:?} time={time} length={}",
            edge.label(),
            edge.direction(),
            edge.actual_length()
                .map_or_else(|| "?".to_string(), |length| length.to_string())
        );
    }
    Ok(())
}

fn node_label(network: &Network, id: NodeId) -> String {
    network
        .node(id)
        .map_or_else(|| id.to_string(), Node::label)
}

fn edge_label(network: &Network, id: EdgeId) -> String {
    network
        .edge(id)
        .map_or_else(|| id.to_string(), Edge::label)
}

//! Building networks from configuration and description files.

mod builder;
mod config;
mod description;

pub use builder::create_network;
pub use config::RailNetConfig;
pub use description::{
    EdgeDescription, LineDescription, NetworkDescription, NodeDescription, NodeKindName,
    PartDescription, SegmentDescription,
};

use std::path::Path;

use crate::Error;

/// Serialization format of a file, chosen by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Result<Self, Error> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Format::Toml),
            Some("json") => Ok(Format::Json),
            _ => Err(Error::InvalidData(format!(
                "Unsupported file extension: {} (expected .toml or .json)",
                path.display()
            ))),
        }
    }
}

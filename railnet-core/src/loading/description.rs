//! Declarative network description, referring to entities by name.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Format;
use crate::model::{Direction, LineToggles, RailType};
use crate::weighting::WeightingPolicy;
use crate::{Error, Fuel, Time};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescription {
    pub domain: String,
    /// Overrides the configured network-wide policy.
    #[serde(default)]
    pub policy: Option<WeightingPolicy>,
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub edges: Vec<EdgeDescription>,
    #[serde(default)]
    pub lines: Vec<LineDescription>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindName {
    #[default]
    Station,
    Junction,
    Signal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub kind: NodeKindName,
    /// Maximum number of incident edges, unbounded when missing.
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default = "responsive_by_default")]
    pub responsive: bool,
}

fn responsive_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDescription {
    pub name: String,
    /// Node names of endpoint A and endpoint B.
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub base_time: Option<Time>,
    /// Mapped track. Installed as a complete map when not empty.
    #[serde(default)]
    pub geometry: Vec<PartDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartDescription {
    pub from: [i32; 3],
    pub to: [i32; 3],
    #[serde(default)]
    pub rail: Option<RailType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDescription {
    /// Train name. The train and line identities derive from it.
    pub train: String,
    /// Node names in visiting order.
    pub checkpoints: Vec<String>,
    /// Falls back to the configured line defaults.
    #[serde(default)]
    pub toggles: Option<LineToggles>,
    #[serde(default)]
    pub policy: Option<WeightingPolicy>,
    #[serde(default)]
    pub segments: Vec<SegmentDescription>,
}

/// Per-line override of one edge, by edge name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescription {
    pub edge: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub weight: Option<f32>,
    #[serde(default)]
    pub real_time: Option<Time>,
    #[serde(default)]
    pub fuel: Option<Fuel>,
}

impl NetworkDescription {
    /// # Errors
    ///
    /// [`Error::TomlError`] for malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    ///
    /// [`Error::JsonError`] for malformed input.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a description, choosing the format by file extension.
    ///
    /// # Errors
    ///
    /// I/O and parse errors, or [`Error::InvalidData`] for an unknown
    /// extension.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let format = Format::of(path)?;
        let text = std::fs::read_to_string(path)?;
        match format {
            Format::Toml => Self::from_toml_str(&text),
            Format::Json => Self::from_json_str(&text),
        }
    }
}

//! Final reports, aggregated bottom-up through the model hierarchy.

use indexmap::IndexMap;
use serde::Serialize;

use crate::architecture::ModelUri;
use crate::value::Value;

/// Named summary entries of one atomic model, in insertion order.
pub type ReportEntries = IndexMap<String, Value>;

/// Immutable end-of-run summary of a model and, for coupled models, of
/// each child.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SimulationReport {
    Atomic {
        uri: ModelUri,
        entries: ReportEntries,
    },
    Coupled {
        uri: ModelUri,
        children: Vec<SimulationReport>,
    },
}

impl SimulationReport {
    pub fn uri(&self) -> &ModelUri {
        match self {
            SimulationReport::Atomic { uri, .. } | SimulationReport::Coupled { uri, .. } => uri,
        }
    }

    /// The report of `uri` within this report, this one included.
    pub fn find(&self, uri: &ModelUri) -> Option<&SimulationReport> {
        if self.uri() == uri {
            return Some(self);
        }
        match self {
            SimulationReport::Coupled { children, .. } => {
                children.iter().find_map(|c| c.find(uri))
            }
            SimulationReport::Atomic { .. } => None,
        }
    }

    /// One entry of the atomic report `uri`.
    pub fn entry(&self, uri: &ModelUri, name: &str) -> Option<&Value> {
        match self.find(uri)? {
            SimulationReport::Atomic { entries, .. } => entries.get(name),
            SimulationReport::Coupled { .. } => None,
        }
    }

    fn write_indented(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            SimulationReport::Atomic { uri, entries } => {
                let fields: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                writeln!(f, "{}{}: {}", pad, uri, fields.join(", "))
            }
            SimulationReport::Coupled { uri, children } => {
                writeln!(f, "{}{}:", pad, uri)?;
                for child in children {
                    child.write_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_indented(f, 0)
    }
}

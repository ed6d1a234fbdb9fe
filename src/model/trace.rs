//! TraceEntry: records every transition an engine performs.

use serde::Serialize;

use crate::architecture::ModelUri;
use crate::event::EventType;
use crate::time::SimTime;

/// Which transition function an atomic engine invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Internal,
    External,
    /// Internal and external at the same instant.
    Confluent,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TransitionKind::Internal => "internal",
            TransitionKind::External => "external",
            TransitionKind::Confluent => "confluent",
        })
    }
}

/// A record of a single transition.
///
/// Appended by the atomic engines on every transition, in the order they
/// run. Two runs of the same architecture with the same injected events
/// produce identical traces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Simulated time of the transition.
    pub time: SimTime,
    /// The model that transitioned.
    pub model: ModelUri,
    pub kind: TransitionKind,
    /// Types of the events consumed, in the order they were applied.
    pub events: Vec<EventType>,
}

impl std::fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} M={}] {}", self.time, self.model, self.kind)?;
        if !self.events.is_empty() {
            let kinds: Vec<&str> = self.events.iter().map(EventType::as_str).collect();
            write!(f, "({})", kinds.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let entry = TraceEntry {
            time: SimTime::new(4),
            model: ModelUri::new("meter"),
            kind: TransitionKind::External,
            events: vec!["stop".into(), "start".into()],
        };
        assert_eq!(entry.to_string(), "[T=4 M=meter] external(stop, start)");

        let internal = TraceEntry {
            events: Vec::new(),
            kind: TransitionKind::Internal,
            ..entry
        };
        assert_eq!(internal.to_string(), "[T=4 M=meter] internal");
    }
}

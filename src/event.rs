//! Events and their tie-breaking priority order.
//!
//! An `Event` is produced by a model's `output` or injected from outside the
//! run, routed by the coupled models' connection tables, and consumed exactly
//! once by the target's external transition. When several events reach the
//! same model at the same instant they are applied in the order defined by a
//! [`PriorityOrder`], never in arrival order alone.

use std::collections::{BTreeMap, HashMap};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{DevsError, DevsResult};
use crate::time::SimTime;
use crate::value::Value;

// ── Event type ────────────────────────────────────────────────────────

/// Name of an event type (`"tic"`, `"start"`, `"refill"`, ...).
///
/// Routing tables, model signatures and priority declarations all speak in
/// event types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventType(String);

impl EventType {
    pub fn new(name: impl Into<String>) -> Self {
        EventType(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        EventType::new(s)
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single timestamped simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Simulated time of occurrence.
    pub time: SimTime,

    /// The event type, used for routing and priority.
    pub kind: EventType,

    /// Optional opaque content.
    pub content: Option<Value>,
}

impl Event {
    pub fn new(time: SimTime, kind: impl Into<EventType>) -> Self {
        Event {
            time,
            kind: kind.into(),
            content: None,
        }
    }

    pub fn with_content(time: SimTime, kind: impl Into<EventType>, content: Value) -> Self {
        Event {
            time,
            kind: kind.into(),
            content: Some(content),
        }
    }

    /// `true` when `self` must be applied before `other`.
    ///
    /// Only meaningful for events that occur at the same time and target the
    /// same model; events of one type never take priority over each other.
    pub fn has_priority_over(&self, other: &Event, order: &PriorityOrder) -> bool {
        order.rank(&self.kind) < order.rank(&other.kind)
    }

    /// Copy of this event renamed and restamped for delivery.
    pub(crate) fn routed(&self, kind: &EventType, time: SimTime) -> Event {
        Event {
            time,
            kind: kind.clone(),
            content: self.content.clone(),
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.content {
            Some(content) => write!(f, "{}@{}({})", self.kind, self.time, content),
            None => write!(f, "{}@{}", self.kind, self.time),
        }
    }
}

// ── Priority declarations ────────────────────────────────────────────

/// Pairwise "X has priority over Y" declarations over the event vocabulary.
///
/// Declarations are collected while the architecture is assembled and
/// resolved into a [`PriorityOrder`] during validation. Resolution fails if
/// the declarations contain a cycle, since no total order could honour them.
#[derive(Debug, Clone, Default)]
pub struct EventPriorities {
    /// Every type mentioned, in first-declaration order.
    types: IndexSet<EventType>,
    /// `higher → {lower...}` edges.
    edges: IndexMap<EventType, IndexSet<EventType>>,
}

impl EventPriorities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that events of type `higher` are applied before events of
    /// type `lower` occurring at the same instant.
    pub fn declare(&mut self, higher: impl Into<EventType>, lower: impl Into<EventType>) {
        let higher = higher.into();
        let lower = lower.into();
        self.types.insert(higher.clone());
        self.types.insert(lower.clone());
        self.edges.entry(higher).or_default().insert(lower);
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Resolve the declarations into a total order.
    ///
    /// Kahn's algorithm; among types whose predecessors are all placed, the
    /// one declared first wins, so the result is stable across runs.
    pub fn resolve(&self) -> DevsResult<PriorityOrder> {
        let mut indegree: IndexMap<&EventType, usize> =
            self.types.iter().map(|t| (t, 0)).collect();
        for lowers in self.edges.values() {
            for lower in lowers {
                if let Some(d) = indegree.get_mut(lower) {
                    *d += 1;
                }
            }
        }

        let mut ranks = HashMap::with_capacity(self.types.len());
        let mut placed = 0usize;
        loop {
            let next = indegree
                .iter()
                .find(|(t, d)| **d == 0 && !ranks.contains_key(**t))
                .map(|(t, _)| (*t).clone());
            let Some(ty) = next else { break };
            if let Some(lowers) = self.edges.get(&ty) {
                for lower in lowers {
                    if let Some(d) = indegree.get_mut(lower) {
                        *d -= 1;
                    }
                }
            }
            ranks.insert(ty, placed);
            placed += 1;
        }

        if placed < self.types.len() {
            return Err(DevsError::PriorityCycle(self.find_cycle(&ranks)));
        }
        Ok(PriorityOrder { ranks })
    }

    /// Every type left unresolved by Kahn's algorithm still has an
    /// unresolved predecessor, so walking predecessors must revisit a type;
    /// the revisited stretch is a cycle.
    fn find_cycle(&self, resolved: &HashMap<EventType, usize>) -> Vec<EventType> {
        let Some(start) = self.types.iter().find(|t| !resolved.contains_key(*t)) else {
            return Vec::new();
        };
        let mut path: Vec<EventType> = vec![start.clone()];
        let mut seen: BTreeMap<EventType, usize> = BTreeMap::new();
        seen.insert(start.clone(), 0);
        let mut current = start.clone();
        loop {
            let predecessor = self
                .edges
                .iter()
                .find(|(higher, lowers)| {
                    !resolved.contains_key(*higher) && lowers.contains(&current)
                })
                .map(|(higher, _)| higher.clone());
            let Some(higher) = predecessor else { return path };
            if let Some(&idx) = seen.get(&higher) {
                let mut cycle = path.split_off(idx);
                cycle.push(higher);
                cycle.reverse();
                return cycle;
            }
            seen.insert(higher.clone(), path.len());
            path.push(higher.clone());
            current = higher;
        }
    }
}

// ── Priority order ────────────────────────────────────────────────────

/// A resolved total order over event types.
///
/// Types never mentioned in a declaration rank after every declared type.
/// Sorting is stable, so events of equal rank keep their arrival order; the
/// combination is a strict total order over any batch of simultaneous
/// events.
#[derive(Debug, Clone, Default)]
pub struct PriorityOrder {
    ranks: HashMap<EventType, usize>,
}

impl PriorityOrder {
    /// Rank of `kind`; lower ranks are applied first.
    pub fn rank(&self, kind: &EventType) -> usize {
        self.ranks.get(kind).copied().unwrap_or(usize::MAX)
    }

    /// Sort a batch of events, highest priority first.
    pub fn sort(&self, events: &mut [Event]) {
        events.sort_by_key(|e| self.rank(&e.kind));
    }
}

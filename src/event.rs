//! Change events and the append-only log that is the source of truth.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::model::{Attrs, EdgeLabel, NodeId, NodeType};

/// Zero-based offset of an event in its log; also the logical version of a
/// graph produced by replaying up to and including that offset. `-1` denotes
/// the empty graph.
pub type Revision = i64;

/// Revision of the empty graph, before any event has been applied.
pub const EMPTY_REVISION: Revision = -1;

/// Seed lists extracted from events. Every variant yields at most two, so
/// these never spill to the heap.
pub type Seeds = SmallVec<[NodeId; 2]>;

/// A single atomic change to the configuration graph.
///
/// Events are self-describing and are only ever appended; a graph at any
/// revision is the fold of the log prefix up to that revision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    NodeAdded {
        node_id: NodeId,
        node_type: NodeType,
        #[serde(default)]
        attrs: Attrs,
    },
    NodeRemoved {
        node_id: NodeId,
    },
    AttrUpdated {
        node_id: NodeId,
        attrs: Attrs,
    },
    EdgeAdded {
        from: NodeId,
        to: NodeId,
        label: EdgeLabel,
    },
    EdgeRemoved {
        from: NodeId,
        to: NodeId,
        label: EdgeLabel,
    },
    /// Audit boundary carrying metadata only; no effect on graph state.
    TransactionMarker {
        tx_id: String,
        #[serde(default)]
        tx_meta: BTreeMap<String, String>,
    },
}

impl Event {
    /// Short variant name for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NodeAdded { .. } => "NodeAdded",
            Event::NodeRemoved { .. } => "NodeRemoved",
            Event::AttrUpdated { .. } => "AttrUpdated",
            Event::EdgeAdded { .. } => "EdgeAdded",
            Event::EdgeRemoved { .. } => "EdgeRemoved",
            Event::TransactionMarker { .. } => "TransactionMarker",
        }
    }

    /// Starting points for impact analysis.
    ///
    /// Node and attribute events seed their own node. Edge events seed the
    /// consumer only, except `controls`/`constrains` where the relationship
    /// subjects both endpoints. Markers seed nothing.
    pub fn impact_seeds(&self) -> Seeds {
        match self {
            Event::NodeAdded { node_id, .. }
            | Event::NodeRemoved { node_id }
            | Event::AttrUpdated { node_id, .. } => smallvec![node_id.clone()],
            Event::EdgeAdded { from, to, label } | Event::EdgeRemoved { from, to, label } => {
                match label {
                    EdgeLabel::Controls | EdgeLabel::Constrains => {
                        smallvec![from.clone(), to.clone()]
                    }
                    EdgeLabel::Uses | EdgeLabel::Derives => smallvec![to.clone()],
                }
            }
            Event::TransactionMarker { .. } => Seeds::new(),
        }
    }

    /// Starting points for local constraint checks: always both endpoints
    /// of an edge event, the node itself otherwise.
    pub fn validation_seeds(&self) -> Seeds {
        match self {
            Event::NodeAdded { node_id, .. }
            | Event::NodeRemoved { node_id }
            | Event::AttrUpdated { node_id, .. } => smallvec![node_id.clone()],
            Event::EdgeAdded { from, to, .. } | Event::EdgeRemoved { from, to, .. } => {
                smallvec![from.clone(), to.clone()]
            }
            Event::TransactionMarker { .. } => Seeds::new(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::NodeAdded {
                node_id, node_type, ..
            } => write!(f, "NodeAdded({node_id}: {node_type})"),
            Event::NodeRemoved { node_id } => write!(f, "NodeRemoved({node_id})"),
            Event::AttrUpdated { node_id, attrs } => {
                write!(f, "AttrUpdated({node_id}, {} keys)", attrs.len())
            }
            Event::EdgeAdded { from, to, label } => {
                write!(f, "EdgeAdded({from} -> {to}, {label})")
            }
            Event::EdgeRemoved { from, to, label } => {
                write!(f, "EdgeRemoved({from} -> {to}, {label})")
            }
            Event::TransactionMarker { tx_id, .. } => write!(f, "TransactionMarker({tx_id})"),
        }
    }
}

/// Append-only, random-access event sequence.
///
/// The log imposes no concurrency contract of its own; callers serialize
/// writers. `range` copies, so a reader holding a range always sees a
/// consistent prefix even while a writer appends.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    /// Appends an event and returns its revision (log offset).
    pub fn append(&mut self, event: Event) -> Revision {
        self.events.push(event);
        self.events.len() as Revision - 1
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Revision of the most recent event, or [`EMPTY_REVISION`] for an
    /// empty log.
    pub fn latest_revision(&self) -> Revision {
        self.events.len() as Revision - 1
    }

    pub fn get(&self, offset: Revision) -> Option<&Event> {
        if offset < 0 {
            return None;
        }
        self.events.get(offset as usize)
    }

    /// Events from `start` (inclusive) to `end` (exclusive), clamped to the
    /// log bounds. Empty when `start >= end`.
    pub fn range(&self, start: Revision, end: Revision) -> Vec<Event> {
        let start = start.max(0) as usize;
        let end = (end.max(0) as usize).min(self.events.len());
        if start >= end {
            return Vec::new();
        }
        self.events[start..end].to_vec()
    }
}

#![forbid(unsafe_code)]

//! Palimpsest: event-sourced impact analysis for low-code configuration
//! graphs.
//!
//! A configuration is modeled as a labeled directed multigraph whose
//! canonical representation is an append-only [`event::EventLog`].
//! Replaying a log prefix projects a [`graph::Graph`] at that revision;
//! the analysis passes answer what a proposed change would affect
//! ([`impact`]), whether it would violate invariants ([`validate`]), and
//! what repairs follow ([`repair`]). Speculative changes run through
//! [`simulate`] with guaranteed rollback, and the [`expr`] compiler turns
//! embedded formulas into dependency edges.

pub mod cache;
pub mod delta;
pub mod error;
pub mod event;
pub mod expr;
pub mod graph;
pub mod impact;
pub mod logging;
pub mod model;
pub mod repair;
pub mod repair_tx;
pub mod replay;
pub mod sandbox;
pub mod simulate;
pub mod snapshot;
pub mod validate;
pub mod value;

pub use crate::cache::SnapshotCache;
pub use crate::delta::{apply_event, rollback_delta, AttrChange, Delta};
pub use crate::error::{GraphError, Result};
pub use crate::event::{Event, EventLog, Revision, Seeds, EMPTY_REVISION};
pub use crate::graph::Graph;
pub use crate::impact::{
    compute_impact, compute_impact_filtered, impact_from_event, impact_from_event_filtered,
    impact_from_events, impact_from_events_filtered, EvidencePath, ImpactFilter, ImpactResult,
};
pub use crate::model::{Attrs, Edge, EdgeLabel, Node, NodeId, NodeType};
pub use crate::repair::{
    compute_repair_plan, compute_repair_plan_from_impact, RepairPlan, RepairSuggestion, Severity,
};
pub use crate::repair_tx::{
    compute_repair_plan_tx, compute_repair_plan_tx_from_impact, AutoLevel, ProposedEvent,
    RepairAction, RepairPlanTx,
};
pub use crate::replay::{incremental_replay, replay, replay_latest};
pub use crate::sandbox::Sandbox;
pub use crate::simulate::{simulate_event, simulate_tx, SimulationResult, SimulationTxResult};
pub use crate::snapshot::{replay_from_snapshot, Snapshot};
pub use crate::validate::{
    validate, validate_event, validate_event_with, validate_seeds, EventValidator,
    ValidationError, ValidationErrorKind, ValidationResult,
};
pub use crate::value::{Value, ValueKind};

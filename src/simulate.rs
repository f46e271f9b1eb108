//! Speculative simulation: pre-impact → pre-validate → apply →
//! post-validate → post-impact, with guaranteed rollback.
//!
//! Simulation temporarily mutates the provided graph, so callers sharing a
//! graph must guarantee exclusive access for the duration of the call; the
//! [`crate::sandbox::Sandbox`] avoids sharing entirely by building
//! request-local graphs.

use std::sync::atomic::AtomicBool;

use tracing::warn;

use crate::delta::{apply_event, rollback_delta, Delta};
use crate::error::GraphError;
use crate::event::{Event, Revision};
use crate::graph::Graph;
use crate::impact::{impact_from_event, impact_from_events, ImpactResult};
use crate::validate::{validate, validate_event, ValidationResult};

/// Outcome of simulating a single event.
///
/// A missing `pre_validate` or absent post results mean the protocol bailed
/// out early (cancellation, validation failure, or apply error); `applied`
/// tells whether the event was actually applied before rollback.
/// `after_rev` is a virtual revision for presentation only; simulation
/// never appends to the log.
#[derive(Clone, Debug)]
pub struct SimulationResult {
    pub event: Event,
    pub before_rev: Revision,
    pub after_rev: Revision,
    pub pre_impact: Option<ImpactResult>,
    pub pre_validate: Option<ValidationResult>,
    pub applied: bool,
    /// Apply or rollback failure. A rollback failure means the graph is
    /// corrupted and must be discarded.
    pub error: Option<GraphError>,
    pub post_impact: Option<ImpactResult>,
    pub post_validate: Option<ValidationResult>,
}

impl SimulationResult {
    fn new(event: &Event, revision: Revision) -> Self {
        SimulationResult {
            event: event.clone(),
            before_rev: revision,
            after_rev: revision,
            pre_impact: None,
            pre_validate: None,
            applied: false,
            error: None,
            post_impact: None,
            post_validate: None,
        }
    }
}

/// Runs the full simulation protocol for one event.
///
/// Pre-impact for NodeAdded/EdgeAdded is often empty because the seed does
/// not exist yet; the post-impact carries the "after" view in that case.
pub fn simulate_event(
    graph: &mut Graph,
    event: &Event,
    cancel: Option<&AtomicBool>,
) -> SimulationResult {
    let mut result = SimulationResult::new(event, graph.revision());

    let pre_impact = impact_from_event(graph, event, cancel);
    let pre_cancelled = pre_impact.cancelled;
    result.pre_impact = Some(pre_impact);
    if pre_cancelled {
        return result;
    }

    let pre_validate = validate_event(graph, event, cancel);
    let blocked = pre_validate.cancelled || !pre_validate.valid;
    result.pre_validate = Some(pre_validate);
    if blocked {
        return result;
    }

    let delta = match apply_event(graph, event) {
        Ok(delta) => delta,
        Err(err) => {
            result.error = Some(err);
            return result;
        }
    };
    result.applied = true;
    result.after_rev = result.before_rev + 1;

    let post_validate = validate(graph, cancel);
    let post_cancelled = post_validate.cancelled;
    result.post_validate = Some(post_validate);
    if !post_cancelled {
        result.post_impact = Some(impact_from_event(graph, event, cancel));
    }

    finish_rollback(graph, delta, &mut result.error);
    result
}

/// Outcome of simulating an event batch as one unit.
#[derive(Clone, Debug)]
pub struct SimulationTxResult {
    pub events: Vec<Event>,
    pub before_rev: Revision,
    pub after_rev: Revision,
    pub pre_impact: Option<ImpactResult>,
    pub pre_validate: Option<ValidationResult>,
    pub applied: bool,
    pub error: Option<GraphError>,
    pub post_impact: Option<ImpactResult>,
    pub post_validate: Option<ValidationResult>,
}

/// Simulates a transaction: events apply sequentially against the evolving
/// graph, so an event may depend on nodes introduced earlier in the batch.
/// On any validation or apply failure the partial batch is rolled back in
/// reverse and `applied` stays false.
pub fn simulate_tx(
    graph: &mut Graph,
    events: &[Event],
    cancel: Option<&AtomicBool>,
) -> SimulationTxResult {
    let revision = graph.revision();
    let mut result = SimulationTxResult {
        events: events.to_vec(),
        before_rev: revision,
        after_rev: revision,
        pre_impact: None,
        pre_validate: None,
        applied: false,
        error: None,
        post_impact: None,
        post_validate: None,
    };

    let pre_impact = impact_from_events(graph, events, cancel);
    let pre_cancelled = pre_impact.cancelled;
    result.pre_impact = Some(pre_impact);
    if pre_cancelled {
        return result;
    }

    let mut deltas: Vec<Delta> = Vec::with_capacity(events.len());
    for event in events {
        let gate = validate_event(graph, event, cancel);
        if gate.cancelled || !gate.valid {
            result.pre_validate = Some(gate);
            rollback_applied(graph, deltas, &mut result.error);
            return result;
        }
        match apply_event(graph, event) {
            Ok(delta) => deltas.push(delta),
            Err(err) => {
                result.error = Some(err);
                rollback_applied(graph, deltas, &mut result.error);
                return result;
            }
        }
    }

    result.pre_validate = Some(ValidationResult::new(graph.revision()));
    result.applied = true;
    result.after_rev = result.before_rev + events.len() as Revision;

    let post_validate = validate(graph, cancel);
    let post_cancelled = post_validate.cancelled;
    result.post_validate = Some(post_validate);
    if !post_cancelled {
        result.post_impact = Some(impact_from_events(graph, events, cancel));
    }

    rollback_applied(graph, deltas, &mut result.error);
    result
}

fn finish_rollback(graph: &mut Graph, delta: Delta, error: &mut Option<GraphError>) {
    if let Err(err) = rollback_delta(graph, delta) {
        warn!(%err, "simulate.rollback_failed");
        if error.is_none() {
            *error = Some(err);
        }
    }
}

/// Reverses accumulated deltas LIFO. Stops at the first failure because a
/// failed rollback leaves the graph unusable anyway.
fn rollback_applied(graph: &mut Graph, deltas: Vec<Delta>, error: &mut Option<GraphError>) {
    for delta in deltas.into_iter().rev() {
        if let Err(err) = rollback_delta(graph, delta) {
            warn!(%err, "simulate.rollback_failed");
            if error.is_none() {
                *error = Some(err);
            }
            return;
        }
    }
}

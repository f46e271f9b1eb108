//! Request-local simulation contexts.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::debug;

use crate::event::{Event, EventLog, Revision};
use crate::graph::Graph;
use crate::replay::replay;
use crate::simulate::{simulate_event, simulate_tx, SimulationResult, SimulationTxResult};
use crate::snapshot::{replay_from_snapshot, Snapshot};

/// Builds request-local graphs for speculative evaluation, so shared state
/// is never mutated: every simulation runs against a fresh graph assembled
/// from the snapshot plus the log tail.
pub struct Sandbox<'a> {
    snapshot: Option<Arc<Snapshot>>,
    log: &'a EventLog,
    revision: Revision,
}

impl<'a> Sandbox<'a> {
    /// `revision` is the target log revision request-local graphs are built
    /// at. The snapshot is optional; without one every build is a full
    /// replay.
    pub fn new(snapshot: Option<Arc<Snapshot>>, log: &'a EventLog, revision: Revision) -> Self {
        Sandbox {
            snapshot,
            log,
            revision,
        }
    }

    /// Constructs an independent graph from snapshot + tail replay. A
    /// snapshot ahead of the log tail cannot serve as a base (the tail it
    /// was built from is gone), so that case falls back to full replay.
    pub fn build_graph(&self) -> Graph {
        match &self.snapshot {
            Some(snapshot) if snapshot.revision() <= self.log.latest_revision() => {
                replay_from_snapshot(snapshot, self.log, self.revision)
            }
            Some(snapshot) => {
                debug!(
                    snapshot_revision = snapshot.revision(),
                    log_tail = self.log.latest_revision(),
                    "sandbox.full_replay_fallback"
                );
                replay(self.log, self.revision)
            }
            None => replay(self.log, self.revision),
        }
    }

    pub fn simulate_event(&self, event: &Event, cancel: Option<&AtomicBool>) -> SimulationResult {
        let mut graph = self.build_graph();
        simulate_event(&mut graph, event, cancel)
    }

    pub fn simulate_tx(&self, events: &[Event], cancel: Option<&AtomicBool>) -> SimulationTxResult {
        let mut graph = self.build_graph();
        simulate_tx(&mut graph, events, cancel)
    }
}

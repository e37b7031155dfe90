use crate::phase::{PhaseId, PhaseSchema, PhaseSpec};
use crate::protocol::{ProtocolError, Snapshot};
use crate::vehicle::Vehicle;
use itertools::Itertools;
use log::debug;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Phase-selection heuristic applied when no phase is starved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Favor the phase serving the most queued vehicles.
    #[default]
    LongestQueue,
    /// Favor the phase whose vehicles have waited longest on average.
    MeanWait,
    /// Favor mean wait scaled by queue length.
    WeightedWait,
}

/// Chooses which phase an intersection should run next.
///
/// One deadline per phase guards against starvation: a phase whose
/// deadline lapses without being active or recommended is served ahead
/// of whatever the heuristic prefers, oldest lapse first. Deadlines are
/// plain monotonic instants checked synchronously on each report; no
/// timer callbacks are involved.
pub struct Aggregator {
    schema: PhaseSchema,
    policy: Policy,
    /// How long a phase may go unserviced before it counts as starved.
    timeout: Duration,
    /// Per-phase service deadlines, parallel to the schema.
    deadlines: Vec<Instant>,
    /// Phases whose deadlines lapsed, oldest first.
    starved: Vec<PhaseId>,
}

impl Aggregator {
    /// Creates an aggregator whose phase timers start at `now`.
    pub fn new(schema: PhaseSchema, policy: Policy, timeout: Duration, now: Instant) -> Self {
        let deadlines = vec![now + timeout; schema.len()];
        Self {
            schema,
            policy,
            timeout,
            deadlines,
            starved: Vec::new(),
        }
    }

    /// Recommends the phase to run next.
    ///
    /// `now_secs` is the wall clock compared against vehicle creation
    /// stamps; `now` drives the starvation deadlines. A snapshot naming
    /// a phase outside the schema is rejected and no timer state
    /// changes.
    pub fn recommend(
        &mut self,
        snapshot: &Snapshot,
        now_secs: f64,
        now: Instant,
    ) -> Result<PhaseId, ProtocolError> {
        let current = snapshot.active_phase;
        if !self.schema.contains(current) {
            return Err(ProtocolError::UnknownPhase(current.0));
        }
        self.sweep(now);
        // the reported phase is being serviced right now
        self.deadlines[current.0] = now + self.timeout;
        let choice = match self.starved.first() {
            Some(&phase) => phase,
            None => self.heuristic(snapshot, now_secs),
        };
        self.deadlines[choice.0] = now + self.timeout;
        self.starved.retain(|&phase| phase != choice);
        debug!(
            "recommending {} (reported {})",
            self.schema.name(choice),
            self.schema.name(current)
        );
        Ok(choice)
    }

    /// Moves phases with lapsed deadlines into the starved list, oldest
    /// lapse first.
    fn sweep(&mut self, now: Instant) {
        let mut lapsed: Vec<(Instant, PhaseId)> = self
            .schema
            .iter()
            .map(|(id, _)| id)
            .filter(|id| self.deadlines[id.0] <= now && !self.starved.contains(id))
            .map(|id| (self.deadlines[id.0], id))
            .collect();
        lapsed.sort_by_key(|(deadline, _)| *deadline);
        self.starved.extend(lapsed.into_iter().map(|(_, id)| id));
    }

    /// Comparative load across phases; ties go to the lowest index.
    fn heuristic(&self, snapshot: &Snapshot, now_secs: f64) -> PhaseId {
        let mut best = (PhaseId(0), f64::NEG_INFINITY);
        for (id, spec) in self.schema.iter() {
            let score = self.score(spec, snapshot, now_secs);
            if score > best.1 {
                best = (id, score);
            }
        }
        best.0
    }

    /// A phase's load under the configured policy.
    fn score(&self, spec: &PhaseSpec, snapshot: &Snapshot, now_secs: f64) -> f64 {
        let vehicles: Vec<&Vehicle> = spec
            .rules
            .iter()
            .map(|rule| rule.queue)
            .unique()
            .flat_map(|queue| snapshot.queues[queue].iter())
            .collect();
        let count = vehicles.len() as f64;
        let mean_wait = if vehicles.is_empty() {
            0.0
        } else {
            vehicles.iter().map(|v| v.age(now_secs)).sum::<f64>() / count
        };
        match self.policy {
            Policy::LongestQueue => count,
            Policy::MeanWait => mean_wait,
            Policy::WeightedWait => mean_wait * count,
        }
    }
}

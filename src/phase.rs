use crate::direction::{Direction, DirectionSet};
use serde::{Deserialize, Serialize};

/// Identifies a phase within a [PhaseSchema].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId(pub usize);

/// Permits the head of one queue to release toward a set of exits.
#[derive(Clone, Debug)]
pub struct ReleaseRule {
    /// The queue whose head may release.
    pub queue: Direction,
    /// The exits a released vehicle may take.
    pub exits: DirectionSet,
}

/// A named signal phase and the releases it permits.
///
/// A queue should appear in at most one rule per phase; each rule
/// releases at most one vehicle per scheduling tick.
#[derive(Clone, Debug)]
pub struct PhaseSpec {
    /// Display name, e.g. "NS".
    pub name: String,
    /// The releases permitted while the phase is active.
    pub rules: Vec<ReleaseRule>,
}

/// The full signal schedule of one intersection.
///
/// Phase order doubles as the deterministic tie-break order and the
/// round-robin rotation order.
#[derive(Clone, Debug)]
pub struct PhaseSchema {
    phases: Vec<PhaseSpec>,
}

impl PhaseSchema {
    /// Creates a schema from an ordered list of phases.
    pub fn new(phases: Vec<PhaseSpec>) -> Self {
        debug_assert!(!phases.is_empty(), "a schema needs at least one phase");
        Self { phases }
    }

    /// The standard two-phase schedule: north/south then east/west,
    /// with every exit permitted.
    pub fn two_phase() -> Self {
        let open = |queue| ReleaseRule {
            queue,
            exits: DirectionSet::ALL,
        };
        Self::new(vec![
            PhaseSpec {
                name: "NS".into(),
                rules: vec![open(Direction::North), open(Direction::South)],
            },
            PhaseSpec {
                name: "EW".into(),
                rules: vec![open(Direction::East), open(Direction::West)],
            },
        ])
    }

    /// The number of phases.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Returns true if the schema has no phases.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Returns true if `phase` names a phase of this schema.
    pub fn contains(&self, phase: PhaseId) -> bool {
        phase.0 < self.phases.len()
    }

    /// Looks up a phase.
    pub fn get(&self, phase: PhaseId) -> Option<&PhaseSpec> {
        self.phases.get(phase.0)
    }

    /// A phase's display name, for logging.
    pub fn name(&self, phase: PhaseId) -> &str {
        self.get(phase).map(|spec| spec.name.as_str()).unwrap_or("?")
    }

    /// The phase that follows `phase` in rotation.
    pub fn successor(&self, phase: PhaseId) -> PhaseId {
        PhaseId((phase.0 + 1) % self.phases.len())
    }

    /// Iterates phases in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (PhaseId, &PhaseSpec)> {
        self.phases
            .iter()
            .enumerate()
            .map(|(i, spec)| (PhaseId(i), spec))
    }
}

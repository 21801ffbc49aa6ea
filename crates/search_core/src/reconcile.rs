//! Generation-tagged reconciliation of predicate changes, query resolutions
//! and change notifications into one current result snapshot.

use std::{fmt, str::FromStr, sync::Arc};

use serde::Serialize;
use shared::domain::{Donor, PredicateSet};
use tracing::{debug, warn};

use crate::error::SearchError;

pub type Generation = u64;

/// What an empty predicate set means. Chosen once per engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPredicatePolicy {
    /// No filters lists every available donor.
    #[default]
    Unfiltered,
    /// No filters means no query; the engine goes back to `Idle`.
    Suppress,
}

impl FromStr for EmptyPredicatePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unfiltered" => Ok(Self::Unfiltered),
            "suppress" => Ok(Self::Suppress),
            other => Err(format!(
                "unknown empty predicate policy '{other}'; expected 'unfiltered' or 'suppress'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnapshotStatus {
    Idle,
    Loading,
    Ready,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSnapshot {
    pub generation: Generation,
    pub status: SnapshotStatus,
    pub predicates: PredicateSet,
    pub records: Vec<Donor>,
}

impl ResultSnapshot {
    pub fn idle(generation: Generation, predicates: PredicateSet) -> Self {
        Self {
            generation,
            status: SnapshotStatus::Idle,
            predicates,
            records: Vec::new(),
        }
    }

    fn loading(generation: Generation, predicates: PredicateSet) -> Self {
        Self {
            generation,
            status: SnapshotStatus::Loading,
            predicates,
            records: Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SnapshotStatus::Ready
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SnapshotStatus::Failed { .. })
    }

    /// One-line summary for the results panel.
    pub fn headline(&self) -> String {
        match &self.status {
            SnapshotStatus::Idle => "Select a blood group or enter a name/location to search.".to_string(),
            SnapshotStatus::Loading => format!("Searching… finding donors for {}", self.predicates),
            SnapshotStatus::Ready if self.records.is_empty() => format!(
                "No donors found. No donors available for {} matching your search criteria.",
                self.predicates
            ),
            SnapshotStatus::Ready => {
                let noun = if self.records.len() == 1 { "donor" } else { "donors" };
                format!("Found {} {noun} for {}", self.records.len(), self.predicates)
            }
            SnapshotStatus::Failed { reason } => format!("Search failed: {reason}. Retry?"),
        }
    }
}

impl fmt::Display for ResultSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.generation, self.headline())
    }
}

/// A query the engine must run on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    pub generation: Generation,
    pub predicates: PredicateSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Publish `snapshot` (status `Loading`) and run `ticket`.
    Query {
        ticket: QueryTicket,
        snapshot: Arc<ResultSnapshot>,
    },
    /// Publish `snapshot`; nothing to run.
    Settled(Arc<ResultSnapshot>),
}

impl Transition {
    pub fn snapshot(&self) -> &Arc<ResultSnapshot> {
        match self {
            Transition::Query { snapshot, .. } | Transition::Settled(snapshot) => snapshot,
        }
    }
}

/// Synchronous state machine behind the engine. It never talks to the store;
/// callers run the tickets it hands out and feed results back in.
#[derive(Debug)]
pub struct Reconciler {
    policy: EmptyPredicatePolicy,
    predicates: PredicateSet,
    latest_issued: Generation,
    latest_settled: Generation,
    current: Arc<ResultSnapshot>,
}

impl Reconciler {
    pub fn new(policy: EmptyPredicatePolicy) -> Self {
        Self {
            policy,
            predicates: PredicateSet::unfiltered(),
            latest_issued: 0,
            latest_settled: 0,
            current: Arc::new(ResultSnapshot::idle(0, PredicateSet::unfiltered())),
        }
    }

    pub fn predicates(&self) -> &PredicateSet {
        &self.predicates
    }

    pub fn current(&self) -> &Arc<ResultSnapshot> {
        &self.current
    }

    pub fn latest_issued(&self) -> Generation {
        self.latest_issued
    }

    /// A new predicate set always starts a new generation, even when it equals
    /// the previous one.
    pub fn submit(&mut self, predicates: PredicateSet) -> Transition {
        self.predicates = predicates;
        self.next_attempt()
    }

    /// Re-runs the current predicate set: used for retries and for change
    /// notifications. `None` when the policy says there is nothing to query.
    pub fn requery(&mut self) -> Option<Transition> {
        if self.suppresses_current() {
            debug!(
                generation = self.latest_issued,
                "reconcile: nothing to re-query for empty predicates"
            );
            return None;
        }
        Some(self.next_attempt())
    }

    /// Applies the outcome of a query. Returns the new current snapshot, or
    /// `None` when the outcome belongs to a superseded generation.
    pub fn resolve(
        &mut self,
        generation: Generation,
        outcome: Result<Vec<Donor>, SearchError>,
    ) -> Option<Arc<ResultSnapshot>> {
        if self.latest_issued > generation {
            debug!(
                generation,
                latest_issued = self.latest_issued,
                "reconcile: discarding superseded query outcome"
            );
            return None;
        }
        if generation > self.latest_issued {
            warn!(
                generation,
                latest_issued = self.latest_issued,
                "reconcile: ignoring outcome for a generation that was never issued"
            );
            return None;
        }
        if self.latest_settled >= generation {
            debug!(generation, "reconcile: generation already settled");
            return None;
        }

        let status = match &outcome {
            Ok(_) => SnapshotStatus::Ready,
            Err(err) => SnapshotStatus::Failed {
                reason: err.to_string(),
            },
        };
        let snapshot = Arc::new(ResultSnapshot {
            generation,
            status,
            predicates: self.predicates.clone(),
            records: outcome.unwrap_or_default(),
        });
        self.latest_settled = generation;
        self.current = Arc::clone(&snapshot);
        Some(snapshot)
    }

    fn suppresses_current(&self) -> bool {
        self.policy == EmptyPredicatePolicy::Suppress && self.predicates.is_empty()
    }

    fn next_attempt(&mut self) -> Transition {
        self.latest_issued += 1;
        let generation = self.latest_issued;

        if self.suppresses_current() {
            let snapshot = Arc::new(ResultSnapshot::idle(generation, self.predicates.clone()));
            self.latest_settled = generation;
            self.current = Arc::clone(&snapshot);
            return Transition::Settled(snapshot);
        }

        let snapshot = Arc::new(ResultSnapshot::loading(generation, self.predicates.clone()));
        self.current = Arc::clone(&snapshot);
        Transition::Query {
            ticket: QueryTicket {
                generation,
                predicates: self.predicates.clone(),
            },
            snapshot,
        }
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;

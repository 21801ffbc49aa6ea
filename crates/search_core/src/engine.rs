use std::sync::Arc;

use shared::{
    domain::{Donor, PredicateSet},
    protocol::DonorChange,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    error::SearchError,
    reconcile::{
        EmptyPredicatePolicy, Generation, QueryTicket, Reconciler, ResultSnapshot, Transition,
    },
    store::{RecordStore, Subscription},
    surface::{Advisory, PresentationSurface},
};

pub(crate) enum EngineInput {
    Predicates(PredicateSet),
    Retry,
    Shutdown,
}

pub(crate) struct QueryResolution {
    generation: Generation,
    outcome: Result<Vec<Donor>, SearchError>,
}

/// Event-loop owner of the [`Reconciler`]. Store calls run on detached tasks
/// and report back through a channel, so the loop never waits on the store.
pub(crate) struct ReconciliationEngine {
    reconciler: Reconciler,
    store: Arc<dyn RecordStore>,
    surface: Arc<dyn PresentationSurface>,
    published: watch::Sender<Arc<ResultSnapshot>>,
    resolutions: mpsc::UnboundedSender<QueryResolution>,
}

impl ReconciliationEngine {
    pub(crate) fn new(
        policy: EmptyPredicatePolicy,
        store: Arc<dyn RecordStore>,
        surface: Arc<dyn PresentationSurface>,
        published: watch::Sender<Arc<ResultSnapshot>>,
    ) -> (Self, mpsc::UnboundedReceiver<QueryResolution>) {
        let (resolutions, resolution_rx) = mpsc::unbounded_channel();
        let engine = Self {
            reconciler: Reconciler::new(policy),
            store,
            surface,
            published,
            resolutions,
        };
        (engine, resolution_rx)
    }

    /// Runs until shutdown or until every input sender is gone. `live` is
    /// dropped on return, which releases the store subscription.
    pub(crate) async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<EngineInput>,
        mut resolution_rx: mpsc::UnboundedReceiver<QueryResolution>,
        mut live: Option<Subscription>,
    ) {
        loop {
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(EngineInput::Predicates(predicates)) => {
                        let transition = self.reconciler.submit(predicates);
                        self.apply(transition);
                    }
                    Some(EngineInput::Retry) => {
                        if let Some(transition) = self.reconciler.requery() {
                            info!(
                                generation = transition.snapshot().generation,
                                "engine: retrying current predicates"
                            );
                            self.apply(transition);
                        }
                    }
                    Some(EngineInput::Shutdown) | None => break,
                },
                Some(resolution) = resolution_rx.recv() => {
                    if let Some(snapshot) = self
                        .reconciler
                        .resolve(resolution.generation, resolution.outcome)
                    {
                        self.publish(snapshot);
                    }
                }
                change = next_change(&mut live), if live.is_some() => match change {
                    Some(change) => self.on_change(change),
                    None => {
                        warn!("engine: change feed closed by store");
                        live = None;
                        self.surface.advise(Advisory::LiveUpdatesUnavailable {
                            reason: "the record store closed the change feed".to_string(),
                        });
                    }
                },
            }
        }
        debug!(
            latest_issued = self.reconciler.latest_issued(),
            "engine: stopped"
        );
    }

    fn on_change(&mut self, change: DonorChange) {
        debug!(
            donor_id = change.donor_id().0,
            kind = ?change.kind(),
            "engine: change notification"
        );
        if let DonorChange::Inserted(donor) = &change {
            if donor.is_available {
                self.surface.advise(Advisory::new_arrival(donor));
            }
        }
        if let Some(transition) = self.reconciler.requery() {
            self.apply(transition);
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Query { ticket, snapshot } => {
                self.publish(snapshot);
                self.issue(ticket);
            }
            Transition::Settled(snapshot) => self.publish(snapshot),
        }
    }

    fn issue(&self, ticket: QueryTicket) {
        debug!(
            generation = ticket.generation,
            predicates = %ticket.predicates,
            "engine: issuing query"
        );
        let store = Arc::clone(&self.store);
        let resolutions = self.resolutions.clone();
        tokio::spawn(async move {
            let outcome = store.find(&ticket.predicates).await;
            if let Err(err) = &outcome {
                warn!(
                    generation = ticket.generation,
                    code = err.code().as_str(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "engine: query failed"
                );
            }
            let _ = resolutions.send(QueryResolution {
                generation: ticket.generation,
                outcome,
            });
        });
    }

    fn publish(&self, snapshot: Arc<ResultSnapshot>) {
        debug!(
            generation = snapshot.generation,
            status = ?snapshot.status,
            records = snapshot.records.len(),
            "engine: publishing snapshot"
        );
        self.published.send_replace(Arc::clone(&snapshot));
        self.surface.render(snapshot);
    }
}

async fn next_change(live: &mut Option<Subscription>) -> Option<DonorChange> {
    match live {
        Some(subscription) => subscription.next_change().await,
        None => std::future::pending().await,
    }
}

use std::sync::Arc;

use shared::domain::PredicateSet;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    engine::{EngineInput, ReconciliationEngine},
    filter_state::FilterStateManager,
    reconcile::{EmptyPredicatePolicy, ResultSnapshot},
    store::{RecordStore, Subscription},
    surface::{Advisory, PresentationSurface},
};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub empty_predicate_policy: EmptyPredicatePolicy,
    pub live_updates: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            empty_predicate_policy: EmptyPredicatePolicy::default(),
            live_updates: true,
        }
    }
}

/// One search screen's lifetime: the change subscription is taken in
/// [`SearchSession::start`] and released when the engine task ends, either via
/// [`SearchSession::end`] or when the session is dropped.
pub struct SearchSession {
    id: Uuid,
    filters: FilterStateManager,
    inputs: mpsc::UnboundedSender<EngineInput>,
    snapshots: watch::Receiver<Arc<ResultSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl SearchSession {
    /// Must be called from within a tokio runtime.
    pub fn start(
        store: Arc<dyn RecordStore>,
        surface: Arc<dyn PresentationSurface>,
        options: SessionOptions,
    ) -> Self {
        let id = Uuid::new_v4();
        let live = if options.live_updates {
            match Subscription::acquire(&store) {
                Ok(subscription) => Some(subscription),
                Err(err) => {
                    warn!(session_id = %id, error = %err, "search: continuing without live updates");
                    surface.advise(Advisory::LiveUpdatesUnavailable {
                        reason: err.to_string(),
                    });
                    None
                }
            }
        } else {
            None
        };

        let initial = Arc::new(ResultSnapshot::idle(0, PredicateSet::unfiltered()));
        let (published, snapshots) = watch::channel(Arc::clone(&initial));
        let (inputs, input_rx) = mpsc::unbounded_channel();
        let (engine, resolution_rx) = ReconciliationEngine::new(
            options.empty_predicate_policy,
            store,
            Arc::clone(&surface),
            published,
        );
        surface.render(initial);

        info!(
            session_id = %id,
            policy = ?options.empty_predicate_policy,
            live_updates = live.is_some(),
            "search: session started"
        );
        let task = tokio::spawn(
            engine
                .run(input_rx, resolution_rx, live)
                .instrument(info_span!("search_session", session_id = %id)),
        );

        Self {
            id,
            filters: FilterStateManager::new(inputs.clone(), surface),
            inputs,
            snapshots,
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn filters_mut(&mut self) -> &mut FilterStateManager {
        &mut self.filters
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<ResultSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<Arc<ResultSnapshot>> {
        self.snapshots.clone()
    }

    /// Re-issues the current predicate set as a new generation.
    pub fn retry(&self) {
        if self.inputs.send(EngineInput::Retry).is_err() {
            warn!(session_id = %self.id, "search: retry after engine stopped");
        }
    }

    /// Stops the engine and waits for it, releasing the change subscription.
    pub async fn end(mut self) {
        let _ = self.inputs.send(EngineInput::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(session_id = %self.id, error = %err, "search: engine task ended abnormally");
            }
        }
        info!(session_id = %self.id, "search: session ended");
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.inputs.send(EngineInput::Shutdown);
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

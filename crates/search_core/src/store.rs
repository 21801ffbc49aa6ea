//! Record store seam and the scoped change subscription.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{Donor, PredicateSet},
    protocol::{DonorChange, SubscriptionId},
};
use storage::Storage;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::SearchError;

/// Notifications delivered to one listener until it is released.
pub struct ChangeFeed {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<DonorChange>,
}

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Available donors matching `predicates`, newest modification first.
    async fn find(&self, predicates: &PredicateSet) -> Result<Vec<Donor>, SearchError>;
    fn subscribe(&self) -> Result<ChangeFeed, SearchError>;
    fn unsubscribe(&self, id: SubscriptionId);
}

#[async_trait]
impl RecordStore for Storage {
    async fn find(&self, predicates: &PredicateSet) -> Result<Vec<Donor>, SearchError> {
        self.find_available_donors(predicates)
            .await
            .map_err(|err| SearchError::query(format!("{err:#}")))
    }

    fn subscribe(&self) -> Result<ChangeFeed, SearchError> {
        let listener = self.subscribe_changes();
        Ok(ChangeFeed {
            id: listener.id,
            receiver: listener.receiver,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.unsubscribe_changes(id);
    }
}

/// A change subscription owned by one search session. The listener is
/// released when this value is dropped, whichever way the owner exits.
pub struct Subscription {
    store: Arc<dyn RecordStore>,
    feed: ChangeFeed,
}

impl Subscription {
    pub fn acquire(store: &Arc<dyn RecordStore>) -> Result<Self, SearchError> {
        let feed = store.subscribe()?;
        debug!(subscription_id = feed.id.0, "search: change subscription acquired");
        Ok(Self {
            store: Arc::clone(store),
            feed,
        })
    }

    /// `None` once the store has closed the feed.
    pub async fn next_change(&mut self) -> Option<DonorChange> {
        self.feed.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.store.unsubscribe(self.feed.id);
        debug!(subscription_id = self.feed.id.0, "search: change subscription released");
    }
}

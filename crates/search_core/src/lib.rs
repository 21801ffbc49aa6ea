//! Live donor search: filter state, generation-tagged reconciliation of
//! queries and store notifications, and the session that ties them together.

mod engine;
pub mod error;
pub mod filter_state;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod surface;
pub mod voice;

pub use error::SearchError;
pub use filter_state::FilterStateManager;
pub use reconcile::{EmptyPredicatePolicy, Generation, ResultSnapshot, SnapshotStatus};
pub use session::{SearchSession, SessionOptions};
pub use store::{ChangeFeed, RecordStore, Subscription};
pub use surface::{Advisory, PresentationSurface};
pub use voice::{match_blood_group, SpeechRecognizer, UnsupportedRecognizer};

#[cfg(test)]
#[path = "tests/fixtures.rs"]
pub(crate) mod fixtures;

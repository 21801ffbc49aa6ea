use std::sync::Arc;

use shared::{
    domain::{BloodGroup, PredicateSet},
    error::DomainError,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    engine::EngineInput,
    error::SearchError,
    surface::{Advisory, PresentationSurface},
    voice::{match_blood_group, SpeechRecognizer},
};

/// Single owner of the current predicate set. Typed input and voice input
/// both go through here; each call publishes a fresh set to the engine before
/// returning.
pub struct FilterStateManager {
    current: PredicateSet,
    engine: mpsc::UnboundedSender<EngineInput>,
    surface: Arc<dyn PresentationSurface>,
}

impl FilterStateManager {
    pub(crate) fn new(
        engine: mpsc::UnboundedSender<EngineInput>,
        surface: Arc<dyn PresentationSurface>,
    ) -> Self {
        Self {
            current: PredicateSet::unfiltered(),
            engine,
            surface,
        }
    }

    pub fn predicates(&self) -> &PredicateSet {
        &self.current
    }

    pub fn set_category(&mut self, category: Option<BloodGroup>) -> &PredicateSet {
        let next = self.current.with_category(category);
        self.publish(next)
    }

    /// Selector input: an empty string clears the category.
    pub fn select_category(&mut self, raw: &str) -> Result<&PredicateSet, DomainError> {
        let category = match raw.trim() {
            "" => None,
            label => Some(label.parse::<BloodGroup>()?),
        };
        Ok(self.set_category(category))
    }

    /// Sets the free-text filter verbatim; blank text clears it.
    pub fn set_free_text(&mut self, text: &str) -> &PredicateSet {
        let next = self.current.with_free_text(Some(text));
        self.publish(next)
    }

    pub fn clear_free_text(&mut self) -> &PredicateSet {
        let next = self.current.with_free_text(None);
        self.publish(next)
    }

    pub fn clear(&mut self) -> &PredicateSet {
        self.publish(PredicateSet::unfiltered())
    }

    /// Maps a recognized utterance onto exactly one blood group and selects it.
    /// Transcripts naming no group, or several, change nothing.
    pub fn consume_voice_transcript(&mut self, transcript: &str) -> Option<BloodGroup> {
        let Some(group) = match_blood_group(transcript) else {
            debug!(transcript, "filters: transcript names no single blood group");
            return None;
        };
        info!(blood_group = %group, "filters: blood group selected by voice");
        self.set_category(Some(group));
        Some(group)
    }

    /// Listens for one utterance and applies it. Missing speech support is
    /// reported to the surface as an advisory; recognition errors are dropped.
    pub async fn voice_search(&mut self, recognizer: &dyn SpeechRecognizer) -> Option<BloodGroup> {
        match recognizer.recognize().await {
            Ok(transcript) => self.consume_voice_transcript(&transcript),
            Err(SearchError::CapabilityUnavailable { capability, detail }) => {
                warn!(capability, %detail, "filters: voice input unavailable");
                self.surface.advise(Advisory::CapabilityUnavailable {
                    capability: capability.to_string(),
                    detail,
                });
                None
            }
            Err(err) => {
                debug!(error = %err, "filters: speech recognition produced no transcript");
                None
            }
        }
    }

    fn publish(&mut self, next: PredicateSet) -> &PredicateSet {
        self.current = next;
        if self
            .engine
            .send(EngineInput::Predicates(self.current.clone()))
            .is_err()
        {
            warn!(predicates = %self.current, "filters: engine stopped; change not reconciled");
        }
        &self.current
    }
}

#[cfg(test)]
#[path = "tests/filter_state_tests.rs"]
mod tests;

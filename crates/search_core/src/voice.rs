//! Mapping recognized speech onto a blood group.

use async_trait::async_trait;
use shared::domain::BloodGroup;

use crate::error::SearchError;

pub const VOICE_CAPABILITY: &str = "voice search";

const POSITIVE_WORDS: [&str; 2] = ["positive", "plus"];
const NEGATIVE_WORDS: [&str; 2] = ["negative", "minus"];

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// One utterance, as recognized text.
    async fn recognize(&self) -> Result<String, SearchError>;
}

/// Recognizer for hosts without speech support.
pub struct UnsupportedRecognizer;

#[async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    async fn recognize(&self) -> Result<String, SearchError> {
        Err(SearchError::CapabilityUnavailable {
            capability: VOICE_CAPABILITY,
            detail: "speech recognition is not supported in this environment".to_string(),
        })
    }
}

/// Lower-case forms a blood group may take in a transcript: the literal label
/// and the sign spoken as a word.
pub fn spoken_forms(group: BloodGroup) -> Vec<String> {
    let abo = group.abo().to_ascii_lowercase();
    let sign_words = if group.is_rh_positive() {
        POSITIVE_WORDS
    } else {
        NEGATIVE_WORDS
    };
    let mut forms = vec![group.as_str().to_ascii_lowercase()];
    forms.extend(sign_words.iter().map(|word| format!("{abo} {word}")));
    forms
}

/// Returns the single blood group named in `transcript`, or `None` when no
/// group or more than one group is mentioned.
///
/// A mention nested inside a longer one ("b positive" within "ab positive")
/// does not count as a separate group.
pub fn match_blood_group(transcript: &str) -> Option<BloodGroup> {
    let heard = transcript.to_lowercase();
    let mut mentions: Vec<(usize, usize, BloodGroup)> = Vec::new();
    for group in BloodGroup::ALL {
        for form in spoken_forms(group) {
            for (start, matched) in heard.match_indices(form.as_str()) {
                mentions.push((start, start + matched.len(), group));
            }
        }
    }

    let mut groups: Vec<BloodGroup> = mentions
        .iter()
        .filter(|(start, end, _)| {
            !mentions.iter().any(|(other_start, other_end, _)| {
                other_start <= start && end <= other_end && other_end - other_start > end - start
            })
        })
        .map(|(_, _, group)| *group)
        .collect();
    groups.sort_by_key(|group| BloodGroup::ALL.iter().position(|known| known == group));
    groups.dedup();

    match groups.as_slice() {
        [group] => Some(*group),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/voice_tests.rs"]
mod tests;

//! Speech synthesis port.

use std::collections::VecDeque;
use thiserror::Error;

pub type UtteranceId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("utterance was cancelled")]
    Cancelled,

    #[error("no voice available for '{0}'")]
    VoiceUnavailable(String),

    #[error("speech engine failed: {0}")]
    Engine(String),
}

/// Lifecycle signals of one utterance: `Started`, then exactly one of `Finished` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started(UtteranceId),
    Finished(UtteranceId),
    Failed(UtteranceId, PlaybackError),
}

impl PlaybackEvent {
    pub fn id(&self) -> UtteranceId {
        match self {
            PlaybackEvent::Started(id) | PlaybackEvent::Finished(id) | PlaybackEvent::Failed(id, _) => *id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PlaybackEvent::Started(_))
    }
}

/// Plays synthesized speech.
///
/// Implementations must cancel an in-flight utterance when `speak` is called again, and
/// `cancel` must be safe to call at any time, including when nothing is playing.
pub trait SpeechOutput {
    fn speak(&mut self, text: &str, language_tag: &str) -> UtteranceId;

    fn cancel(&mut self);

    /// Next pending playback event, if any.
    fn poll_event(&mut self) -> Option<PlaybackEvent>;

    fn is_speaking(&self) -> bool;
}

/// Bookkeeping shared by output adapters: id allocation, the single active slot and the
/// event queue. Guarantees one terminal event per utterance.
#[derive(Debug, Default)]
pub struct UtteranceTracker {
    next_id: UtteranceId,
    active: Option<UtteranceId>,
    events: VecDeque<PlaybackEvent>,
}

impl UtteranceTracker {
    /// Starts a new utterance, cancelling the active one first.
    pub fn begin(&mut self) -> UtteranceId {
        self.cancel();
        self.next_id += 1;
        let id = self.next_id;
        self.active = Some(id);
        self.events.push_back(PlaybackEvent::Started(id));
        id
    }

    pub fn finish(&mut self) {
        if let Some(id) = self.active.take() {
            self.events.push_back(PlaybackEvent::Finished(id));
        }
    }

    pub fn fail(&mut self, error: PlaybackError) {
        if let Some(id) = self.active.take() {
            self.events.push_back(PlaybackEvent::Failed(id, error));
        }
    }

    pub fn cancel(&mut self) {
        self.fail(PlaybackError::Cancelled);
    }

    pub fn active(&self) -> Option<UtteranceId> {
        self.active
    }

    pub fn pop(&mut self) -> Option<PlaybackEvent> {
        self.events.pop_front()
    }
}

/// Silent output: logs the text and completes at once. Used when no synthesizer is
/// available, the UI shows the text instead.
#[derive(Debug, Default)]
pub struct TextOnlyOutput {
    tracker: UtteranceTracker,
    last_text: Option<String>,
}

impl TextOnlyOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the most recent utterance, for on-screen display.
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }
}

impl SpeechOutput for TextOnlyOutput {
    fn speak(&mut self, text: &str, language_tag: &str) -> UtteranceId {
        let id = self.tracker.begin();
        tracing::info!(id, language_tag, text, "speak (text only)");
        self.last_text = Some(text.to_string());
        self.tracker.finish();
        id
    }

    fn cancel(&mut self) {
        self.tracker.cancel();
    }

    fn poll_event(&mut self) -> Option<PlaybackEvent> {
        self.tracker.pop()
    }

    fn is_speaking(&self) -> bool {
        self.tracker.active().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(tracker: &mut UtteranceTracker) -> Vec<PlaybackEvent> {
        std::iter::from_fn(|| tracker.pop()).collect()
    }

    #[test]
    fn test_new_utterance_cancels_previous() {
        let mut tracker = UtteranceTracker::default();
        let first = tracker.begin();
        let second = tracker.begin();
        tracker.finish();

        assert_eq!(
            drain(&mut tracker),
            vec![
                PlaybackEvent::Started(first),
                PlaybackEvent::Failed(first, PlaybackError::Cancelled),
                PlaybackEvent::Started(second),
                PlaybackEvent::Finished(second),
            ]
        );
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mut tracker = UtteranceTracker::default();
        tracker.cancel();
        tracker.cancel();
        assert!(drain(&mut tracker).is_empty());
    }

    #[test]
    fn test_single_terminal_event() {
        let mut tracker = UtteranceTracker::default();
        let id = tracker.begin();
        tracker.finish();
        tracker.fail(PlaybackError::Engine("late".to_string()));

        let terminal: Vec<_> = drain(&mut tracker)
            .into_iter()
            .filter(|e| e.id() == id && e.is_terminal())
            .collect();
        assert_eq!(terminal, vec![PlaybackEvent::Finished(id)]);
    }

    #[test]
    fn test_text_only_output_completes_immediately() {
        let mut output = TextOnlyOutput::new();
        let id = output.speak("¡Muy bien!", "es-ES");

        assert!(!output.is_speaking());
        assert_eq!(output.last_text(), Some("¡Muy bien!"));
        assert_eq!(output.poll_event(), Some(PlaybackEvent::Started(id)));
        assert_eq!(output.poll_event(), Some(PlaybackEvent::Finished(id)));
        assert_eq!(output.poll_event(), None);
    }
}

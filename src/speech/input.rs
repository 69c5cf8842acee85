//! Speech recognition port.

use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no speech was detected")]
    NoSpeechDetected,

    #[error("microphone is unavailable")]
    MicrophoneUnavailable,

    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("recognition service could not be reached")]
    NetworkError,

    #[error("recognition failed: {0}")]
    Unknown(String),

    #[error("a listening session is already active")]
    Busy,
}

impl CaptureError {
    /// Short prompt shown next to the retry button.
    pub fn hint(&self) -> &'static str {
        match self {
            CaptureError::NoSpeechDetected => "We didn't hear anything. Try again a little louder.",
            CaptureError::MicrophoneUnavailable => "Connect a microphone and try again.",
            CaptureError::PermissionDenied => "Allow microphone access, then try again.",
            CaptureError::NetworkError => "Check your connection and try again.",
            CaptureError::Unknown(_) => "Something went wrong. Try again.",
            CaptureError::Busy => "Still listening, finish the current answer first.",
        }
    }
}

/// How one listening session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Transcript(String),
    Failed(CaptureError),
    Stopped,
}

/// Captures one utterance at a time.
///
/// Every successful `listen` ends in exactly one [`CaptureOutcome`]. After `stop` the
/// `Stopped` outcome is available from the next `poll`.
pub trait SpeechInput {
    fn listen(&mut self, language_tag: &str) -> Result<(), CaptureError>;

    fn stop(&mut self);

    fn poll(&mut self) -> Option<CaptureOutcome>;

    fn is_listening(&self) -> bool;
}

/// Keyboard-fed recognizer: while a session is open the learner types what they would
/// say and [`TypedInput::submit`] delivers it as the transcript.
#[derive(Debug, Default)]
pub struct TypedInput {
    language_tag: Option<String>,
    outcomes: VecDeque<CaptureOutcome>,
}

impl TypedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Language of the open session, if any.
    pub fn language_tag(&self) -> Option<&str> {
        self.language_tag.as_deref()
    }

    /// Ends the open session with the typed text. Returns false when not listening.
    pub fn submit(&mut self, text: &str) -> bool {
        let Some(language_tag) = self.language_tag.take() else {
            return false;
        };

        let text = text.trim();
        let outcome = if text.is_empty() {
            CaptureOutcome::Failed(CaptureError::NoSpeechDetected)
        } else {
            CaptureOutcome::Transcript(text.to_string())
        };
        tracing::debug!(language_tag = %language_tag, ?outcome, "typed answer captured");
        self.outcomes.push_back(outcome);
        true
    }
}

impl SpeechInput for TypedInput {
    fn listen(&mut self, language_tag: &str) -> Result<(), CaptureError> {
        if self.language_tag.is_some() {
            return Err(CaptureError::Busy);
        }
        self.language_tag = Some(language_tag.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        if self.language_tag.take().is_some() {
            self.outcomes.push_back(CaptureOutcome::Stopped);
        }
    }

    fn poll(&mut self) -> Option<CaptureOutcome> {
        self.outcomes.pop_front()
    }

    fn is_listening(&self) -> bool {
        self.language_tag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_delivers_transcript() {
        let mut input = TypedInput::new();
        input.listen("es-ES").unwrap();
        assert_eq!(input.language_tag(), Some("es-ES"));

        assert!(input.submit("  buenos días "));
        assert!(!input.is_listening());
        assert_eq!(
            input.poll(),
            Some(CaptureOutcome::Transcript("buenos días".to_string()))
        );
    }

    #[test]
    fn test_empty_submit_is_no_speech() {
        let mut input = TypedInput::new();
        input.listen("es-ES").unwrap();
        input.submit("   ");
        assert_eq!(
            input.poll(),
            Some(CaptureOutcome::Failed(CaptureError::NoSpeechDetected))
        );
    }

    #[test]
    fn test_second_listen_is_busy() {
        let mut input = TypedInput::new();
        input.listen("es-ES").unwrap();
        assert_eq!(input.listen("es-ES"), Err(CaptureError::Busy));
    }

    #[test]
    fn test_stop_and_submit_without_session() {
        let mut input = TypedInput::new();
        input.stop();
        assert_eq!(input.poll(), None);
        assert!(!input.submit("hola"));

        input.listen("es-ES").unwrap();
        input.stop();
        assert_eq!(input.poll(), Some(CaptureOutcome::Stopped));
    }
}

//! Scripted speech adapters for tests.

use super::{
    CaptureError, CaptureOutcome, PlaybackError, PlaybackEvent, SpeechInput, SpeechOutput,
    UtteranceId, UtteranceTracker,
};
use std::collections::VecDeque;

/// Output whose utterances stay in flight until the test finishes or fails them.
#[derive(Default)]
pub struct ScriptedOutput {
    tracker: UtteranceTracker,
    pub spoken: Vec<(String, String)>,
}

impl ScriptedOutput {
    pub fn finish_current(&mut self) {
        self.tracker.finish();
    }

    pub fn fail_current(&mut self, error: PlaybackError) {
        self.tracker.fail(error);
    }
}

impl SpeechOutput for ScriptedOutput {
    fn speak(&mut self, text: &str, language_tag: &str) -> UtteranceId {
        self.spoken.push((text.to_string(), language_tag.to_string()));
        self.tracker.begin()
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

/// Input that ends a session only when the test supplies an outcome.
#[derive(Default)]
pub struct ScriptedInput {
    active: bool,
    outcomes: VecDeque<CaptureOutcome>,
    pub sessions: Vec<String>,
    pub refuse_with: Option<CaptureError>,
}

impl ScriptedInput {
    pub fn respond(&mut self, outcome: CaptureOutcome) {
        if self.active {
            self.active = false;
            self.outcomes.push_back(outcome);
        }
    }
}

impl SpeechInput for ScriptedInput {
    fn listen(&mut self, language_tag: &str) -> Result<(), CaptureError> {
        if let Some(error) = self.refuse_with.clone() {
            return Err(error);
        }
        if self.active {
            return Err(CaptureError::Busy);
        }
        self.active = true;
        self.sessions.push(language_tag.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.outcomes.push_back(CaptureOutcome::Stopped);
        }
    }

    fn poll(&mut self) -> Option<CaptureOutcome> {
        self.outcomes.pop_front()
    }

    fn is_listening(&self) -> bool {
        self.active
    }
}

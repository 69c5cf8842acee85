//! Sequential "say, then listen" playback driven by completion events.
//!
//! The sequencer holds a queue of [`Step`]s and advances only when the current step
//! reports that it ended. It never listens while speaking, and it cancels in-flight
//! speech before starting new speech. Listening is bounded by a caller-supplied timeout
//! because recognizers do not guarantee one.

use super::{CaptureError, CaptureOutcome, PlaybackError, PlaybackEvent, SpeechInput, SpeechOutput, UtteranceId};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Say { text: String, language_tag: String },
    Listen { language_tag: String },
}

/// What happened while pumping the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerEvent {
    /// An utterance played to the end.
    Spoke(String),
    /// Text-only mode: the text should be displayed instead of spoken.
    Shown(String),
    /// Playback failed; the sequencer switched to text-only mode.
    PlaybackFailed(PlaybackError),
    Heard(String),
    /// Capture failed; the remaining steps were dropped so the learner can retry.
    CaptureFailed(CaptureError),
    TimedOut,
    /// Listening was stopped from outside.
    Stopped,
    /// The queue ran empty after doing some work.
    Finished,
}

#[derive(Debug)]
enum State {
    Idle,
    Speaking { id: UtteranceId, text: String },
    Listening { started: Instant },
}

#[derive(Debug)]
pub struct SpeechSequencer {
    queue: VecDeque<Step>,
    state: State,
    text_only: bool,
    listen_timeout: Duration,
    worked: bool,
}

impl SpeechSequencer {
    pub fn new(listen_timeout: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            state: State::Idle,
            text_only: false,
            listen_timeout,
            worked: false,
        }
    }

    pub fn say(&mut self, text: impl Into<String>, language_tag: impl Into<String>) {
        self.queue.push_back(Step::Say {
            text: text.into(),
            language_tag: language_tag.into(),
        });
    }

    pub fn listen(&mut self, language_tag: impl Into<String>) {
        self.queue.push_back(Step::Listen {
            language_tag: language_tag.into(),
        });
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle) && self.queue.is_empty()
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state, State::Listening { .. })
    }

    pub fn text_only(&self) -> bool {
        self.text_only
    }

    pub fn set_text_only(&mut self, text_only: bool) {
        self.text_only = text_only;
    }

    /// Drops pending steps and stops whatever is playing or listening.
    pub fn interrupt(&mut self, output: &mut dyn SpeechOutput, input: &mut dyn SpeechInput) {
        self.queue.clear();
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Speaking { .. } => {
                output.cancel();
                while output.poll_event().is_some() {}
            }
            State::Listening { .. } => {
                input.stop();
                while input.poll().is_some() {}
            }
            State::Idle => {}
        }
        self.worked = false;
    }

    /// Processes pending completion events and starts the next steps. Call once per frame.
    pub fn pump(
        &mut self,
        output: &mut dyn SpeechOutput,
        input: &mut dyn SpeechInput,
        now: Instant,
    ) -> Vec<SequencerEvent> {
        let mut events = Vec::new();

        loop {
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Speaking { id, text } => {
                    if !self.drain_playback(output, id, &text, &mut events) {
                        self.state = State::Speaking { id, text };
                        return events;
                    }
                }
                State::Listening { started } => match input.poll() {
                    Some(CaptureOutcome::Transcript(transcript)) => {
                        events.push(SequencerEvent::Heard(transcript));
                    }
                    Some(CaptureOutcome::Failed(error)) => {
                        tracing::warn!(%error, "speech capture failed");
                        self.queue.clear();
                        events.push(SequencerEvent::CaptureFailed(error));
                    }
                    Some(CaptureOutcome::Stopped) => {
                        self.queue.clear();
                        events.push(SequencerEvent::Stopped);
                    }
                    None if now.saturating_duration_since(started) >= self.listen_timeout => {
                        tracing::warn!(timeout = ?self.listen_timeout, "listening timed out");
                        input.stop();
                        while input.poll().is_some() {}
                        self.queue.clear();
                        events.push(SequencerEvent::TimedOut);
                    }
                    None => {
                        self.state = State::Listening { started };
                        return events;
                    }
                },
                State::Idle => match self.queue.pop_front() {
                    None => {
                        if self.worked {
                            self.worked = false;
                            events.push(SequencerEvent::Finished);
                        }
                        return events;
                    }
                    Some(step) => {
                        self.worked = true;
                        self.start(step, output, input, now, &mut events);
                    }
                },
            }
        }
    }

    fn start(
        &mut self,
        step: Step,
        output: &mut dyn SpeechOutput,
        input: &mut dyn SpeechInput,
        now: Instant,
        events: &mut Vec<SequencerEvent>,
    ) {
        match step {
            Step::Say { text, .. } if self.text_only => {
                events.push(SequencerEvent::Shown(text));
            }
            Step::Say { text, language_tag } => {
                if input.is_listening() {
                    input.stop();
                    while input.poll().is_some() {}
                }
                let id = output.speak(&text, &language_tag);
                self.state = State::Speaking { id, text };
            }
            Step::Listen { language_tag } => {
                if output.is_speaking() {
                    output.cancel();
                    while output.poll_event().is_some() {}
                }
                match input.listen(&language_tag) {
                    Ok(()) => self.state = State::Listening { started: now },
                    Err(error) => {
                        tracing::warn!(%error, "could not start listening");
                        self.queue.clear();
                        events.push(SequencerEvent::CaptureFailed(error));
                    }
                }
            }
        }
    }

    /// Consumes playback events until the utterance `id` ends. Returns false while it is
    /// still playing.
    fn drain_playback(
        &mut self,
        output: &mut dyn SpeechOutput,
        id: UtteranceId,
        text: &str,
        events: &mut Vec<SequencerEvent>,
    ) -> bool {
        while let Some(event) = output.poll_event() {
            match event {
                PlaybackEvent::Finished(done) if done == id => {
                    events.push(SequencerEvent::Spoke(text.to_string()));
                    return true;
                }
                PlaybackEvent::Failed(done, error) if done == id => {
                    tracing::warn!(%error, "playback failed, switching to text only");
                    self.text_only = true;
                    events.push(SequencerEvent::PlaybackFailed(error));
                    events.push(SequencerEvent::Shown(text.to_string()));
                    return true;
                }
                // Started, or leftovers from an earlier utterance
                _ => {}
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::fakes::{ScriptedInput, ScriptedOutput};

    const TIMEOUT: Duration = Duration::from_secs(8);

    fn setup() -> (SpeechSequencer, ScriptedOutput, ScriptedInput, Instant) {
        (
            SpeechSequencer::new(TIMEOUT),
            ScriptedOutput::default(),
            ScriptedInput::default(),
            Instant::now(),
        )
    }

    #[test]
    fn test_listens_only_after_speech_finishes() {
        let (mut seq, mut output, mut input, now) = setup();
        seq.say("¿Cómo te llamas?", "es-ES");
        seq.listen("es-ES");

        assert!(seq.pump(&mut output, &mut input, now).is_empty());
        assert_eq!(output.spoken.len(), 1);
        assert!(input.sessions.is_empty());

        output.finish_current();
        let events = seq.pump(&mut output, &mut input, now);
        assert_eq!(events, vec![SequencerEvent::Spoke("¿Cómo te llamas?".to_string())]);
        assert_eq!(input.sessions, vec!["es-ES".to_string()]);

        input.respond(CaptureOutcome::Transcript("me llamo Ana".to_string()));
        let events = seq.pump(&mut output, &mut input, now);
        assert_eq!(
            events,
            vec![
                SequencerEvent::Heard("me llamo Ana".to_string()),
                SequencerEvent::Finished
            ]
        );
        assert!(seq.is_idle());
    }

    #[test]
    fn test_playback_failure_falls_back_to_text() {
        let (mut seq, mut output, mut input, now) = setup();
        seq.say("uno", "es-ES");
        seq.say("dos", "es-ES");

        seq.pump(&mut output, &mut input, now);
        output.fail_current(PlaybackError::VoiceUnavailable("es-ES".to_string()));

        let events = seq.pump(&mut output, &mut input, now);
        assert_eq!(
            events,
            vec![
                SequencerEvent::PlaybackFailed(PlaybackError::VoiceUnavailable("es-ES".to_string())),
                SequencerEvent::Shown("uno".to_string()),
                SequencerEvent::Shown("dos".to_string()),
                SequencerEvent::Finished,
            ]
        );
        assert!(seq.text_only());
        assert_eq!(output.spoken.len(), 1);
    }

    #[test]
    fn test_listen_times_out() {
        let (mut seq, mut output, mut input, now) = setup();
        seq.listen("es-ES");
        seq.say("never spoken", "es-ES");

        assert!(seq.pump(&mut output, &mut input, now).is_empty());
        assert!(seq.is_listening());
        assert!(seq.pump(&mut output, &mut input, now + TIMEOUT / 2).is_empty());

        let events = seq.pump(&mut output, &mut input, now + TIMEOUT);
        assert_eq!(events, vec![SequencerEvent::TimedOut, SequencerEvent::Finished]);
        assert!(!input.is_listening());
        assert!(output.spoken.is_empty());
    }

    #[test]
    fn test_capture_failure_drops_remaining_steps() {
        let (mut seq, mut output, mut input, now) = setup();
        seq.listen("es-ES");
        seq.say("¡Correcto!", "es-ES");

        seq.pump(&mut output, &mut input, now);
        input.respond(CaptureOutcome::Failed(CaptureError::NoSpeechDetected));

        let events = seq.pump(&mut output, &mut input, now);
        assert_eq!(
            events,
            vec![
                SequencerEvent::CaptureFailed(CaptureError::NoSpeechDetected),
                SequencerEvent::Finished
            ]
        );
        assert!(output.spoken.is_empty());
    }

    #[test]
    fn test_listen_refused() {
        let (mut seq, mut output, mut input, now) = setup();
        input.refuse_with = Some(CaptureError::PermissionDenied);
        seq.listen("es-ES");

        let events = seq.pump(&mut output, &mut input, now);
        assert_eq!(events[0], SequencerEvent::CaptureFailed(CaptureError::PermissionDenied));
    }

    #[test]
    fn test_interrupt_cancels_speech() {
        let (mut seq, mut output, mut input, now) = setup();
        seq.say("largo discurso", "es-ES");
        seq.listen("es-ES");
        seq.pump(&mut output, &mut input, now);
        assert!(output.is_speaking());

        seq.interrupt(&mut output, &mut input);
        assert!(!output.is_speaking());
        assert!(seq.is_idle());
        assert!(seq.pump(&mut output, &mut input, now).is_empty());
        assert!(input.sessions.is_empty());
    }
}

//! Speech playback and capture ports.
//!
//! Concrete engines (native TTS/ASR, cloud services) plug in behind [`SpeechOutput`] and
//! [`SpeechInput`]. Both are poll-driven so a frame loop can pump them without blocking,
//! and [`SpeechSequencer`] chains "say, then listen" steps off their completion events.

pub mod input;
pub mod output;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod fakes;

pub use input::{CaptureError, CaptureOutcome, SpeechInput, TypedInput};
pub use output::{PlaybackError, PlaybackEvent, SpeechOutput, TextOnlyOutput, UtteranceId, UtteranceTracker};
pub use sequencer::{SequencerEvent, SpeechSequencer, Step};

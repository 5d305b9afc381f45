use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::automix::ControlStamp;
use super::commands::AudioThreadCommand;
use crate::audio::config::INITIAL_DECK_VOLUME;
use crate::audio::track::Track;
use crate::audio::types::EqParams;

// --- State Management ---

/// Cloneable handle to a running engine: the command sender plus the control stamp counter.
#[derive(Clone)]
pub struct EngineHandle {
    audio_command_sender: mpsc::Sender<AudioThreadCommand>,
    control_sequence: Arc<AtomicU64>,
}

impl EngineHandle {
    pub fn new(sender: mpsc::Sender<AudioThreadCommand>, control_sequence: Arc<AtomicU64>) -> Self {
        EngineHandle {
            audio_command_sender: sender,
            control_sequence,
        }
    }

    pub fn get_command_sender(&self) -> mpsc::Sender<AudioThreadCommand> {
        self.audio_command_sender.clone()
    }

    /// Stamps a manual control gesture at the moment it is issued.
    pub fn next_stamp(&self) -> ControlStamp {
        next_stamp(&self.control_sequence)
    }
}

pub(crate) fn next_stamp(sequence: &AtomicU64) -> ControlStamp {
    ControlStamp(sequence.fetch_add(1, Ordering::AcqRel) + 1)
}

/// Engine-side view of one deck.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeckState {
    pub loaded_track: Option<Track>,
    pub playhead_seconds: f64,
    pub volume: f32,
    pub eq: EqParams,
    pub is_playing: bool,
}

impl Default for DeckState {
    fn default() -> Self {
        DeckState {
            loaded_track: None,
            playhead_seconds: 0.0,
            volume: INITIAL_DECK_VOLUME,
            eq: EqParams::default(),
            is_playing: false,
        }
    }
}

impl DeckState {
    /// Forgets the loaded media; volume and EQ stay with the channel.
    pub(crate) fn reset_media(&mut self) {
        self.loaded_track = None;
        self.playhead_seconds = 0.0;
        self.is_playing = false;
    }

    pub fn track_id(&self) -> Option<&str> {
        self.loaded_track.as_ref().map(|track| track.id.as_str())
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.loaded_track.as_ref().and_then(|track| track.duration_seconds)
    }
}

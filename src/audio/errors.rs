use thiserror::Error;

use crate::audio::devices::BackendState;
use crate::audio::playback::automix::TransitionPhase;
use crate::audio::types::DeckId;

#[derive(Error, Debug)]
pub enum AudioEffectsError {
    #[error("Failed to calculate {filter_type} coefficients")]
    CoefficientCalculationError { filter_type: String },
    #[error("Failed to lock EQ params: {reason}")]
    EqParamsLockError { reason: String },
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Audio backend '{device_id}' is not running (state: {state:?})")]
    BackendNotReady {
        device_id: String,
        state: BackendState,
    },
    #[error("Invalid sample rate reported by audio backend: {0}")]
    InvalidSampleRate(f32),
    #[error("Failed to attach signal graph to audio backend '{device_id}': {reason}")]
    GraphAttachError { device_id: String, reason: String },
    #[error("Signal graph effect error: {0}")]
    Effects(#[from] AudioEffectsError),
    #[error("Cannot perform operation on deck '{deck}': No track loaded.")]
    TrackNotLoaded { deck: DeckId },
    #[error("Failed to load track '{track_id}' on deck '{deck}': {reason}")]
    LoadFailed {
        deck: DeckId,
        track_id: String,
        reason: String,
    },
    #[error("Track '{track_id}' failed to start on deck '{deck}': {reason}")]
    StartFailed {
        deck: DeckId,
        track_id: String,
        reason: String,
    },
    #[error("Seek failed on deck '{deck}': {reason}")]
    SeekFailed { deck: DeckId, reason: String },
    #[error("Deck '{deck}' stopped before '{track_id}' was ready; transition dropped")]
    OutgoingStopped { deck: DeckId, track_id: String },
    #[error("No queued track to transition to")]
    QueueEmpty,
    #[error("A transition is already active (phase: {phase:?}); trigger ignored")]
    TransitionInProgress { phase: TransitionPhase },
    #[error("Deck '{deck}' is owned by the active transition; '{operation}' rejected")]
    DeckBusy {
        deck: DeckId,
        operation: &'static str,
    },
    #[error("Failed to deliver event '{event}': {reason}")]
    EventDeliveryError { event: &'static str, reason: String },
    #[error("Failed to receive shutdown confirmation: {0}")]
    ShutdownRecvError(#[from] tokio::sync::oneshot::error::RecvError),
    #[error("Failed to spawn audio thread: {0}")]
    ThreadSpawnError(#[source] std::io::Error),
    #[error("Tokio MPSC send error for audio command: {0}")]
    MpscSendError(
        #[from] tokio::sync::mpsc::error::SendError<crate::audio::playback::commands::AudioThreadCommand>,
    ),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse auto-mix config: {0}")]
    ParseError(#[from] serde_json::Error),
}

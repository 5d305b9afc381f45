use serde::Serialize;
use tokio::sync::mpsc;

use crate::audio::errors::PlaybackError;
use crate::audio::planner::TransitionPlan;
use crate::audio::playback::automix::{HandOffReason, TransitionPhase};
use crate::audio::track::Track;
use crate::audio::types::DeckId;

// --- Event Payloads ---

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackTickEventPayload {
    pub deck_id: DeckId,
    pub current_time: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatusEventPayload {
    pub deck_id: DeckId,
    pub is_playing: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackLoadEventPayload {
    pub deck_id: DeckId,
    pub track_id: String,
    pub duration: Option<f64>,
    pub bpm: Option<f64>,
    pub first_beat_sec: Option<f64>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Backend, media or channel failure.
    Device,
    /// Command rejected because it conflicts with the engine's current state.
    Invariant,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackErrorEventPayload {
    pub deck_id: Option<DeckId>,
    pub kind: ErrorKind,
    pub error: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionStateEventPayload {
    pub phase: TransitionPhase,
    pub outgoing: Option<DeckId>,
    pub incoming: Option<DeckId>,
    pub plan: Option<TransitionPlan>,
    pub reason: Option<HandOffReason>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionProgressEventPayload {
    pub progress: f32,
    pub crossfader_position: f32,
    pub fade_out: f32,
    pub fade_in: f32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackAdvancedEventPayload {
    pub deck_id: DeckId,
    pub track_id: String,
    pub queue_position: usize,
}

/// Everything the engine reports to the host, tagged with its event name.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum EngineEvent {
    Tick(PlaybackTickEventPayload),
    StatusUpdate(PlaybackStatusEventPayload),
    LoadUpdate(PlaybackLoadEventPayload),
    Error(PlaybackErrorEventPayload),
    TransitionState(TransitionStateEventPayload),
    TransitionProgress(TransitionProgressEventPayload),
    TrackAdvanced(TrackAdvancedEventPayload),
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Tick(_) => "playback://tick",
            EngineEvent::StatusUpdate(_) => "playback://status-update",
            EngineEvent::LoadUpdate(_) => "playback://load-update",
            EngineEvent::Error(_) => "playback://error",
            EngineEvent::TransitionState(_) => "automix://transition-state",
            EngineEvent::TransitionProgress(_) => "automix://transition-progress",
            EngineEvent::TrackAdvanced(_) => "automix://track-advanced",
        }
    }
}

// --- Sinks ---

/// Destination for engine events. Called from the audio thread; must not block.
pub trait EventSink: Send {
    fn emit(&self, event: EngineEvent) -> Result<(), PlaybackError>;
}

/// Forwards events over an unbounded tokio channel.
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelEventSink { sender }, receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) -> Result<(), PlaybackError> {
        let name = event.name();
        self.sender
            .send(event)
            .map_err(|e| PlaybackError::EventDeliveryError {
                event: name,
                reason: e.to_string(),
            })
    }
}

// --- Event Emitter Helpers ---

pub(crate) fn emit_tick_event(events: &dyn EventSink, deck_id: DeckId, current_time: f64) {
    let payload = PlaybackTickEventPayload {
        deck_id,
        current_time,
    };
    if let Err(e) = events.emit(EngineEvent::Tick(payload)) {
        log::warn!("Failed to emit playback://tick for {}: {}", deck_id, e);
    }
}

pub(crate) fn emit_status_update_event(events: &dyn EventSink, deck_id: DeckId, is_playing: bool) {
    let payload = PlaybackStatusEventPayload {
        deck_id,
        is_playing,
    };
    if let Err(e) = events.emit(EngineEvent::StatusUpdate(payload)) {
        log::warn!(
            "Failed to emit playback://status-update for {}: {}",
            deck_id,
            e
        );
    }
}

pub(crate) fn emit_load_update_event(events: &dyn EventSink, deck_id: DeckId, track: &Track) {
    let payload = PlaybackLoadEventPayload {
        deck_id,
        track_id: track.id.clone(),
        duration: track.duration_seconds,
        bpm: track.bpm,
        first_beat_sec: track.first_beat_seconds,
    };
    if let Err(e) = events.emit(EngineEvent::LoadUpdate(payload)) {
        log::warn!(
            "Failed to emit playback://load-update for {}: {}",
            deck_id,
            e
        );
    }
}

pub(crate) fn emit_error_event(
    events: &dyn EventSink,
    deck_id: Option<DeckId>,
    kind: ErrorKind,
    error_message: &str,
) {
    let payload = PlaybackErrorEventPayload {
        deck_id,
        kind,
        error: error_message.to_string(),
    };
    if let Err(e) = events.emit(EngineEvent::Error(payload)) {
        log::error!("Failed to emit playback://error ({:?}): {}", kind, e);
    }
}

/// Logs a rejected command, reports it as an `Invariant` error and hands the error back.
pub(crate) fn report_rejection(
    events: &dyn EventSink,
    deck_id: Option<DeckId>,
    error: PlaybackError,
) -> PlaybackError {
    log::warn!("Audio Thread: Rejected: {}", error);
    emit_error_event(events, deck_id, ErrorKind::Invariant, &error.to_string());
    error
}

pub(crate) fn emit_transition_state_event(events: &dyn EventSink, payload: TransitionStateEventPayload) {
    let phase = payload.phase;
    if let Err(e) = events.emit(EngineEvent::TransitionState(payload)) {
        log::warn!(
            "Failed to emit automix://transition-state ({:?}): {}",
            phase,
            e
        );
    }
}

pub(crate) fn emit_transition_progress_event(
    events: &dyn EventSink,
    payload: TransitionProgressEventPayload,
) {
    if let Err(e) = events.emit(EngineEvent::TransitionProgress(payload)) {
        log::warn!("Failed to emit automix://transition-progress: {}", e);
    }
}

pub(crate) fn emit_track_advanced_event(
    events: &dyn EventSink,
    deck_id: DeckId,
    track_id: &str,
    queue_position: usize,
) {
    let payload = TrackAdvancedEventPayload {
        deck_id,
        track_id: track_id.to_string(),
        queue_position,
    };
    if let Err(e) = events.emit(EngineEvent::TrackAdvanced(payload)) {
        log::warn!(
            "Failed to emit automix://track-advanced for {}: {}",
            deck_id,
            e
        );
    }
}

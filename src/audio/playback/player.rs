use serde::Serialize;

use crate::audio::errors::PlaybackError;
use crate::audio::track::Track;
use crate::audio::types::DeckId;

/// Outcome of starting a deck.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StartStatus {
    Playing,
    /// Media is still loading; a `MediaReady` command follows once it plays or fails.
    Buffering,
}

/// Media transport for the two decks.
///
/// Decoding and streaming happen outside the engine. Implementations feed each
/// deck's samples into the renderer's deck inputs and report the playhead.
pub trait DeckPlayer: Send {
    fn load(&mut self, deck: DeckId, track: &Track) -> Result<(), PlaybackError>;

    /// Starts or resumes `deck` at `offset_seconds`.
    fn start(&mut self, deck: DeckId, offset_seconds: f64) -> Result<StartStatus, PlaybackError>;

    fn pause(&mut self, deck: DeckId);

    /// Stops playback and releases the deck's media.
    fn stop(&mut self, deck: DeckId);

    fn seek(&mut self, deck: DeckId, position_seconds: f64) -> Result<(), PlaybackError>;

    /// Current media position, `None` when nothing is loaded.
    fn playhead(&self, deck: DeckId) -> Option<f64>;
}

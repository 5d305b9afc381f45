pub mod audio_effects;
pub mod automix;
pub mod init;
pub mod playback;
pub mod track;

pub(crate) use audio_effects::*;
pub(crate) use automix::*;
pub(crate) use init::*;
pub(crate) use playback::*;
pub(crate) use track::*;

use super::automix::TransitionPhase;
use super::engine::MixEngine;
use super::events::*;
use crate::audio::errors::PlaybackError;
use crate::audio::types::DeckId;

/// Rejects a manual deck command while a transition owns both decks.
fn ensure_deck_free(
    engine: &MixEngine,
    deck_id: DeckId,
    operation: &'static str,
) -> Result<(), PlaybackError> {
    if engine.scheduler.phase() == TransitionPhase::Idle {
        return Ok(());
    }
    Err(report_rejection(
        engine.events.as_ref(),
        Some(deck_id),
        PlaybackError::DeckBusy {
            deck: deck_id,
            operation,
        },
    ))
}

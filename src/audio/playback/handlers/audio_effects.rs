use super::*;
use crate::audio::playback::automix::ControlStamp;
use crate::audio::types::{CurveStyle, EqParams};

pub(crate) fn audio_thread_handle_set_deck_volume(
    engine: &mut MixEngine,
    deck_id: DeckId,
    volume: f32,
) -> Result<(), PlaybackError> {
    engine.graph.set_deck_volume(deck_id, volume);
    engine.decks[deck_id.index()].volume = engine.graph.channel(deck_id).volume;
    log::debug!(
        "Audio Thread: Deck '{}' volume set to {}",
        deck_id,
        engine.decks[deck_id.index()].volume
    );
    Ok(())
}

pub(crate) fn audio_thread_handle_set_deck_eq(
    engine: &mut MixEngine,
    deck_id: DeckId,
    params: EqParams,
) -> Result<(), PlaybackError> {
    engine.graph.set_deck_eq(deck_id, params);
    engine.decks[deck_id.index()].eq = engine.graph.channel(deck_id).eq;
    log::debug!("Audio Thread: Deck '{}' EQ set to {:?}", deck_id, params);
    Ok(())
}

/// Manual crossfader move. Dropped while a transition owns the crossfader, and
/// when it was issued before the latest transition began.
pub(crate) fn audio_thread_handle_set_crossfader(
    engine: &mut MixEngine,
    position: f32,
    stamp: ControlStamp,
) -> Result<(), PlaybackError> {
    if !engine.scheduler.accepts_manual_crossfader(stamp) {
        log::debug!(
            "Audio Thread: Discarding crossfader move to {} ({:?}); auto-mix owns the crossfader",
            position,
            stamp
        );
        return Ok(());
    }
    engine.graph.set_crossfader(position);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_crossfader_curve(
    engine: &mut MixEngine,
    style: CurveStyle,
) -> Result<(), PlaybackError> {
    engine.graph.set_crossfader_curve(style);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_master_volume(
    engine: &mut MixEngine,
    volume: f32,
) -> Result<(), PlaybackError> {
    engine.graph.set_master_volume(volume);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_master_eq(
    engine: &mut MixEngine,
    params: EqParams,
) -> Result<(), PlaybackError> {
    engine.graph.set_master_eq(params);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_cue_enabled(
    engine: &mut MixEngine,
    deck_id: DeckId,
    enabled: bool,
) -> Result<(), PlaybackError> {
    engine.graph.set_cue_enabled(deck_id, enabled);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_cue_volume(
    engine: &mut MixEngine,
    volume: f32,
) -> Result<(), PlaybackError> {
    engine.graph.set_cue_volume(volume);
    Ok(())
}

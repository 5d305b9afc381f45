use super::*;
use crate::audio::playback::player::StartStatus;

fn require_loaded(engine: &MixEngine, deck_id: DeckId) -> Result<(), PlaybackError> {
    if engine.decks[deck_id.index()].loaded_track.is_some() {
        return Ok(());
    }
    Err(report_rejection(
        engine.events.as_ref(),
        Some(deck_id),
        PlaybackError::TrackNotLoaded { deck: deck_id },
    ))
}

pub(crate) fn audio_thread_handle_play(engine: &mut MixEngine, deck_id: DeckId) -> Result<(), PlaybackError> {
    ensure_deck_free(engine, deck_id, "play")?;
    require_loaded(engine, deck_id)?;

    let deck_state = &mut engine.decks[deck_id.index()];
    if deck_state.is_playing {
        log::debug!("Audio Thread: Deck '{}' already playing", deck_id);
        return Ok(());
    }

    match engine.player.start(deck_id, deck_state.playhead_seconds) {
        Ok(StartStatus::Playing) => {
            deck_state.is_playing = true;
            log::info!(
                "Audio Thread: Playing deck '{}' from {:.2}s",
                deck_id,
                deck_state.playhead_seconds
            );
            emit_status_update_event(engine.events.as_ref(), deck_id, true);
        }
        Ok(StartStatus::Buffering) => {
            log::info!("Audio Thread: Deck '{}' buffering before playback", deck_id);
        }
        Err(e) => {
            log::error!("Audio Thread: Play failed for deck '{}': {}", deck_id, e);
            emit_error_event(
                engine.events.as_ref(),
                Some(deck_id),
                ErrorKind::Device,
                &e.to_string(),
            );
            return Err(e);
        }
    }

    // A lone playing deck becomes the one auto-mix transitions away from
    if !engine.decks[deck_id.other().index()].is_playing {
        engine.scheduler.set_current_deck(deck_id);
    }
    Ok(())
}

pub(crate) fn audio_thread_handle_pause(engine: &mut MixEngine, deck_id: DeckId) -> Result<(), PlaybackError> {
    ensure_deck_free(engine, deck_id, "pause")?;
    require_loaded(engine, deck_id)?;

    let deck_state = &mut engine.decks[deck_id.index()];
    if !deck_state.is_playing {
        log::debug!("Audio Thread: Deck '{}' already paused", deck_id);
        return Ok(());
    }
    engine.player.pause(deck_id);
    if let Some(position) = engine.player.playhead(deck_id) {
        deck_state.playhead_seconds = position;
    }
    deck_state.is_playing = false;
    log::info!(
        "Audio Thread: Paused deck '{}' at {:.2}s",
        deck_id,
        deck_state.playhead_seconds
    );
    emit_status_update_event(engine.events.as_ref(), deck_id, false);
    Ok(())
}

pub(crate) fn audio_thread_handle_seek(
    engine: &mut MixEngine,
    deck_id: DeckId,
    position_seconds: f64,
) -> Result<(), PlaybackError> {
    ensure_deck_free(engine, deck_id, "seek")?;
    require_loaded(engine, deck_id)?;

    let deck_state = &mut engine.decks[deck_id.index()];
    let upper = deck_state.duration_seconds().unwrap_or(f64::MAX);
    let target = if position_seconds.is_finite() {
        position_seconds.clamp(0.0, upper)
    } else {
        0.0
    };

    if let Err(e) = engine.player.seek(deck_id, target) {
        let error = PlaybackError::SeekFailed {
            deck: deck_id,
            reason: e.to_string(),
        };
        log::error!("Audio Thread: {}", error);
        emit_error_event(
            engine.events.as_ref(),
            Some(deck_id),
            ErrorKind::Device,
            &error.to_string(),
        );
        return Err(error);
    }
    deck_state.playhead_seconds = target;
    log::info!("Audio Thread: Seeked deck '{}' to {:.2}s", deck_id, target);
    emit_tick_event(engine.events.as_ref(), deck_id, target);
    Ok(())
}

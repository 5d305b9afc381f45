use super::*;
use crate::audio::track::Track;

pub(crate) fn audio_thread_handle_load(
    engine: &mut MixEngine,
    deck_id: DeckId,
    track: Track,
) -> Result<(), PlaybackError> {
    ensure_deck_free(engine, deck_id, "load")?;

    let deck_state = &engine.decks[deck_id.index()];
    if deck_state.loaded_track.is_some() {
        log::info!(
            "Audio Thread: Replacing '{}' on deck '{}'",
            deck_state.track_id().unwrap_or_default(),
            deck_id
        );
        engine.player.stop(deck_id);
        if deck_state.is_playing {
            emit_status_update_event(engine.events.as_ref(), deck_id, false);
        }
    }
    engine.decks[deck_id.index()].reset_media();

    if let Err(e) = engine.player.load(deck_id, &track) {
        log::error!("Audio Thread: Load failed for deck '{}': {}", deck_id, e);
        emit_error_event(
            engine.events.as_ref(),
            Some(deck_id),
            ErrorKind::Device,
            &e.to_string(),
        );
        engine.scheduler.invalidate_plan();
        return Err(e);
    }

    log::info!(
        "Audio Thread: Loaded '{}' on deck '{}' (duration {:?}s, bpm {:?})",
        track.id,
        deck_id,
        track.duration_seconds,
        track.bpm
    );
    emit_load_update_event(engine.events.as_ref(), deck_id, &track);
    engine.decks[deck_id.index()].loaded_track = Some(track);
    engine.scheduler.invalidate_plan();
    Ok(())
}

/// Completion of a buffering start. Routed to the scheduler when a transition is
/// waiting on this deck, otherwise finishes a manual play.
pub(crate) fn audio_thread_handle_media_ready(
    engine: &mut MixEngine,
    deck_id: DeckId,
    result: Result<(), String>,
) -> Result<(), PlaybackError> {
    if engine.scheduler.awaits_media(deck_id) {
        let (scheduler, mut ctx) = engine.split();
        return scheduler.on_media_ready(&mut ctx, deck_id, result);
    }

    let deck_state = &mut engine.decks[deck_id.index()];
    let Some(track_id) = deck_state.track_id().map(str::to_string) else {
        log::debug!(
            "Audio Thread: Media ready for empty deck '{}', ignoring",
            deck_id
        );
        return Ok(());
    };
    match result {
        Ok(()) => {
            deck_state.is_playing = true;
            log::info!("Audio Thread: Deck '{}' ready, playing '{}'", deck_id, track_id);
            emit_status_update_event(engine.events.as_ref(), deck_id, true);
            Ok(())
        }
        Err(reason) => {
            deck_state.is_playing = false;
            let error = PlaybackError::StartFailed {
                deck: deck_id,
                track_id,
                reason,
            };
            log::error!("Audio Thread: {}", error);
            emit_error_event(
                engine.events.as_ref(),
                Some(deck_id),
                ErrorKind::Device,
                &error.to_string(),
            );
            emit_status_update_event(engine.events.as_ref(), deck_id, false);
            Err(error)
        }
    }
}

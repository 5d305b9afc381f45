use super::*;
use crate::audio::playback::automix::SessionConfig;
use crate::audio::track::Track;

pub(crate) fn audio_thread_handle_start_auto_mix(
    engine: &mut MixEngine,
    tracks: Vec<Track>,
) -> Result<(), PlaybackError> {
    let (scheduler, mut ctx) = engine.split();
    scheduler.start(&mut ctx, tracks)
}

pub(crate) fn audio_thread_handle_queue_tracks(
    engine: &mut MixEngine,
    tracks: Vec<Track>,
) -> Result<(), PlaybackError> {
    engine.scheduler.enqueue(tracks);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_session_config(
    engine: &mut MixEngine,
    config: SessionConfig,
) -> Result<(), PlaybackError> {
    engine.scheduler.set_session_config(config);
    Ok(())
}

pub(crate) fn audio_thread_handle_set_auto_mix_enabled(
    engine: &mut MixEngine,
    enabled: bool,
) -> Result<(), PlaybackError> {
    engine.scheduler.set_enabled(enabled);
    Ok(())
}

pub(crate) fn audio_thread_handle_trigger(engine: &mut MixEngine) -> Result<(), PlaybackError> {
    let (scheduler, mut ctx) = engine.split();
    scheduler.trigger(&mut ctx)
}

pub(crate) fn audio_thread_handle_skip(engine: &mut MixEngine) -> Result<(), PlaybackError> {
    let (scheduler, mut ctx) = engine.split();
    scheduler.skip(&mut ctx)
}

pub(crate) fn audio_thread_handle_stop(engine: &mut MixEngine) -> Result<(), PlaybackError> {
    let (scheduler, mut ctx) = engine.split();
    scheduler.stop(&mut ctx)
}

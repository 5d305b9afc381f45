use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::audio::playback::commands::AudioThreadCommand;
use crate::audio::playback::engine::MixEngine;

pub mod automix;
pub mod commands;
pub mod engine;
pub mod events;
mod handlers;
pub mod player;
pub mod state;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

// --- Audio Thread Implementation ---

/// Runs the engine until `Shutdown` arrives or every sender is dropped.
///
/// Blocks the calling thread; spawn it on a dedicated one.
pub fn run_audio_thread(mut engine: MixEngine, mut receiver: mpsc::Receiver<AudioThreadCommand>) {
    log::info!("Audio Thread: Starting...");

    engine.handle_command(AudioThreadCommand::InitGraph);

    log::info!("Audio Thread: Building Tokio current_thread runtime...");
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Audio Thread: Failed to build Tokio runtime: {}", e);
            return;
        }
    };

    rt.block_on(async move {
        log::info!("Audio thread entering main loop.");
        let mut should_shutdown = false;
        let mut time_update_interval = tokio::time::interval(engine.tick_interval());
        time_update_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !should_shutdown {
            tokio::select! {
                maybe_command = receiver.recv() => {
                    match maybe_command {
                        Some(command) => {
                            should_shutdown = !engine.handle_command(command);
                        }
                        None => {
                            log::info!("Audio Thread: Command channel closed. Exiting loop.");
                            should_shutdown = true;
                        }
                    }
                }
                _ = time_update_interval.tick(), if !should_shutdown => {
                    engine.tick();
                }
            }
        }
        log::info!("Audio thread loop finished.");
    });
    log::info!("Audio thread has stopped.");
}

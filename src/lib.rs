pub mod audio;

use std::thread;

use tokio::sync::mpsc;

use audio::config::AUDIO_COMMAND_CHAN_SIZE;
use audio::errors::PlaybackError;
use audio::playback::commands::AudioThreadCommand;

pub use audio::analysis::compatibility::{compatible_keys, rank_compatible, score};
pub use audio::config::AutoMixConfig;
pub use audio::graph::AudioSignalGraph;
pub use audio::planner::{TransitionPlan, TransitionPlanner};
pub use audio::playback::automix::AutoMixScheduler;
pub use audio::playback::engine::MixEngine;
pub use audio::playback::state::EngineHandle;
pub use audio::track::Track;

/// Installs the `env_logger` backend, honouring `RUST_LOG` and defaulting to `info`.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Spawns the dedicated audio thread for `engine` and returns a handle to command it.
pub fn start_engine(engine: MixEngine) -> Result<EngineHandle, PlaybackError> {
    let (audio_cmd_tx, audio_cmd_rx) = mpsc::channel::<AudioThreadCommand>(AUDIO_COMMAND_CHAN_SIZE);
    let control_sequence = engine.control_sequence();

    thread::Builder::new()
        .name("dj-automix-audio".into())
        .spawn(move || {
            audio::playback::run_audio_thread(engine, audio_cmd_rx);
        })
        .map_err(PlaybackError::ThreadSpawnError)?;

    Ok(EngineHandle::new(audio_cmd_tx, control_sequence))
}

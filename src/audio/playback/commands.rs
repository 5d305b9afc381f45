use tokio::sync::oneshot;

use super::automix::{ControlStamp, SessionConfig};
use super::state::EngineHandle;
use crate::audio::errors::PlaybackError;
use crate::audio::track::Track;
use crate::audio::types::{CurveStyle, DeckId, EqParams};

// --- Audio Thread Commands ---
#[derive(Debug)]
pub enum AudioThreadCommand {
    /// Builds the signal graph on the backend, or notes it as pending.
    InitGraph,
    /// The host resumed the audio backend; a pending graph gets built now.
    BackendResumed,
    LoadTrack {
        deck_id: DeckId,
        track: Track,
    },
    Play(DeckId),
    Pause(DeckId),
    Seek {
        deck_id: DeckId,
        position_seconds: f64,
    },
    /// Completion of a start that reported `Buffering`.
    MediaReady {
        deck_id: DeckId,
        result: Result<(), String>,
    },
    SetDeckVolume {
        deck_id: DeckId,
        volume: f32,
    },
    SetDeckEq {
        deck_id: DeckId,
        params: EqParams,
    },
    SetCrossfader {
        position: f32,
        stamp: ControlStamp,
    },
    SetCrossfaderCurve(CurveStyle),
    SetMasterVolume(f32),
    SetMasterEq(EqParams),
    SetCueEnabled {
        deck_id: DeckId,
        enabled: bool,
    },
    SetCueVolume(f32),
    StartAutoMix {
        tracks: Vec<Track>,
    },
    QueueTracks {
        tracks: Vec<Track>,
    },
    SetSessionConfig(SessionConfig),
    SetAutoMixEnabled(bool),
    TriggerTransition,
    Skip,
    Stop,
    Shutdown(oneshot::Sender<()>),
}

// --- Engine Commands ---

impl EngineHandle {
    async fn send(&self, command: AudioThreadCommand) -> Result<(), PlaybackError> {
        self.get_command_sender().send(command).await.map_err(|e| {
            log::error!("Failed to send audio command: {}", e);
            PlaybackError::from(e)
        })
    }

    pub async fn init_graph(&self) -> Result<(), PlaybackError> {
        log::info!("CMD: Init signal graph");
        self.send(AudioThreadCommand::InitGraph).await
    }

    pub async fn backend_resumed(&self) -> Result<(), PlaybackError> {
        log::info!("CMD: Audio backend resumed");
        self.send(AudioThreadCommand::BackendResumed).await
    }

    pub async fn load_track(&self, deck_id: DeckId, track: Track) -> Result<(), PlaybackError> {
        log::info!(
            "CMD: Load track '{}' for deck: {}. BPM: {:?}, Key: {:?}",
            track.id,
            deck_id,
            track.bpm,
            track.camelot_key
        );
        self.send(AudioThreadCommand::LoadTrack { deck_id, track })
            .await
    }

    pub async fn play(&self, deck_id: DeckId) -> Result<(), PlaybackError> {
        log::info!("CMD: Play track for deck: {}", deck_id);
        self.send(AudioThreadCommand::Play(deck_id)).await
    }

    pub async fn pause(&self, deck_id: DeckId) -> Result<(), PlaybackError> {
        log::info!("CMD: Pause track for deck: {}", deck_id);
        self.send(AudioThreadCommand::Pause(deck_id)).await
    }

    pub async fn seek(&self, deck_id: DeckId, position_seconds: f64) -> Result<(), PlaybackError> {
        log::info!(
            "CMD: Seek track for deck: {} to {}s",
            deck_id,
            position_seconds
        );
        self.send(AudioThreadCommand::Seek {
            deck_id,
            position_seconds,
        })
        .await
    }

    pub async fn media_ready(&self, deck_id: DeckId, result: Result<(), String>) -> Result<(), PlaybackError> {
        log::info!("CMD: Media ready for deck: {} ({:?})", deck_id, result);
        self.send(AudioThreadCommand::MediaReady { deck_id, result })
            .await
    }

    pub async fn set_deck_volume(&self, deck_id: DeckId, volume: f32) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set volume for deck: {} to {}", deck_id, volume);
        self.send(AudioThreadCommand::SetDeckVolume { deck_id, volume })
            .await
    }

    pub async fn set_deck_eq(&self, deck_id: DeckId, params: EqParams) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set EQ for deck: {} to {:?}", deck_id, params);
        self.send(AudioThreadCommand::SetDeckEq { deck_id, params })
            .await
    }

    /// Stamps the move now, so it loses against a transition that starts before it lands.
    pub async fn set_crossfader(&self, position: f32) -> Result<(), PlaybackError> {
        let stamp = self.next_stamp();
        log::debug!("CMD: Set crossfader to {} ({:?})", position, stamp);
        self.send(AudioThreadCommand::SetCrossfader { position, stamp })
            .await
    }

    pub async fn set_crossfader_curve(&self, style: CurveStyle) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set crossfader curve to {:?}", style);
        self.send(AudioThreadCommand::SetCrossfaderCurve(style))
            .await
    }

    pub async fn set_master_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set master volume to {}", volume);
        self.send(AudioThreadCommand::SetMasterVolume(volume)).await
    }

    pub async fn set_master_eq(&self, params: EqParams) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set master EQ to {:?}", params);
        self.send(AudioThreadCommand::SetMasterEq(params)).await
    }

    pub async fn set_cue_enabled(&self, deck_id: DeckId, enabled: bool) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set cue for deck: {} to {}", deck_id, enabled);
        self.send(AudioThreadCommand::SetCueEnabled { deck_id, enabled })
            .await
    }

    pub async fn set_cue_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        log::debug!("CMD: Set cue volume to {}", volume);
        self.send(AudioThreadCommand::SetCueVolume(volume)).await
    }

    pub async fn start_auto_mix(&self, tracks: Vec<Track>) -> Result<(), PlaybackError> {
        log::info!("CMD: Start auto-mix with {} track(s)", tracks.len());
        self.send(AudioThreadCommand::StartAutoMix { tracks }).await
    }

    pub async fn queue_tracks(&self, tracks: Vec<Track>) -> Result<(), PlaybackError> {
        log::info!("CMD: Queue {} track(s)", tracks.len());
        self.send(AudioThreadCommand::QueueTracks { tracks }).await
    }

    pub async fn set_session_config(&self, config: SessionConfig) -> Result<(), PlaybackError> {
        log::info!("CMD: Set session config {:?}", config);
        self.send(AudioThreadCommand::SetSessionConfig(config))
            .await
    }

    pub async fn set_auto_mix_enabled(&self, enabled: bool) -> Result<(), PlaybackError> {
        log::info!("CMD: Set auto-mix enabled: {}", enabled);
        self.send(AudioThreadCommand::SetAutoMixEnabled(enabled))
            .await
    }

    pub async fn trigger_transition(&self) -> Result<(), PlaybackError> {
        log::info!("CMD: Trigger transition");
        self.send(AudioThreadCommand::TriggerTransition).await
    }

    pub async fn skip(&self) -> Result<(), PlaybackError> {
        log::info!("CMD: Skip");
        self.send(AudioThreadCommand::Skip).await
    }

    pub async fn stop(&self) -> Result<(), PlaybackError> {
        log::info!("CMD: Stop auto-mix");
        self.send(AudioThreadCommand::Stop).await
    }

    /// Asks the audio thread to shut down and waits for its confirmation.
    pub async fn shutdown(&self) -> Result<(), PlaybackError> {
        log::info!("CMD: Shutdown");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.send(AudioThreadCommand::Shutdown(shutdown_tx)).await?;
        log::info!("Waiting for audio thread shutdown confirmation...");
        shutdown_rx.await?;
        log::info!("Audio thread confirmed shutdown.");
        Ok(())
    }
}

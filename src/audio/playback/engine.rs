use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::automix::{AutoMixScheduler, ControlStamp, MixContext};
use super::commands::AudioThreadCommand;
use super::events::EventSink;
use super::handlers;
use super::player::DeckPlayer;
use super::state::{DeckState, next_stamp};
use super::time::{self, Clock, SystemClock};
use crate::audio::config::AutoMixConfig;
use crate::audio::devices::AudioBackend;
use crate::audio::graph::AudioSignalGraph;
use crate::audio::types::DeckId;

/// Single owner of decks, signal graph and scheduler. Lives on the audio thread.
pub struct MixEngine {
    pub(crate) decks: [DeckState; 2],
    pub(crate) graph: AudioSignalGraph,
    pub(crate) scheduler: AutoMixScheduler,
    pub(crate) player: Box<dyn DeckPlayer>,
    pub(crate) backend: Box<dyn AudioBackend>,
    pub(crate) events: Box<dyn EventSink>,
    clock: Box<dyn Clock>,
    control_sequence: Arc<AtomicU64>,
    tick_interval: Duration,
}

impl MixEngine {
    pub fn new<P, B, E>(config: AutoMixConfig, player: P, backend: B, events: E) -> Self
    where
        P: DeckPlayer + 'static,
        B: AudioBackend + 'static,
        E: EventSink + 'static,
    {
        let config = config.validated();
        MixEngine {
            decks: Default::default(),
            graph: AudioSignalGraph::new(),
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            scheduler: AutoMixScheduler::new(config),
            player: Box::new(player),
            backend: Box::new(backend),
            events: Box::new(events),
            clock: Box::new(SystemClock::default()),
            control_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // --- Accessors ---

    pub fn deck(&self, deck: DeckId) -> &DeckState {
        &self.decks[deck.index()]
    }

    pub fn graph(&self) -> &AudioSignalGraph {
        &self.graph
    }

    pub fn scheduler(&self) -> &AutoMixScheduler {
        &self.scheduler
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Counter shared with every `EngineHandle` for stamping manual gestures.
    pub fn control_sequence(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.control_sequence)
    }

    pub fn issue_control_stamp(&self) -> ControlStamp {
        next_stamp(&self.control_sequence)
    }

    // --- Driving ---

    /// Applies one command. Returns false once the engine has shut down.
    pub fn handle_command(&mut self, command: AudioThreadCommand) -> bool {
        log::debug!("Audio Thread Received: {:?}", command);
        let result = match command {
            AudioThreadCommand::InitGraph | AudioThreadCommand::BackendResumed => {
                handlers::audio_thread_handle_init_graph(self)
            }
            AudioThreadCommand::LoadTrack { deck_id, track } => {
                handlers::audio_thread_handle_load(self, deck_id, track)
            }
            AudioThreadCommand::Play(deck_id) => handlers::audio_thread_handle_play(self, deck_id),
            AudioThreadCommand::Pause(deck_id) => handlers::audio_thread_handle_pause(self, deck_id),
            AudioThreadCommand::Seek {
                deck_id,
                position_seconds,
            } => handlers::audio_thread_handle_seek(self, deck_id, position_seconds),
            AudioThreadCommand::MediaReady { deck_id, result } => {
                handlers::audio_thread_handle_media_ready(self, deck_id, result)
            }
            AudioThreadCommand::SetDeckVolume { deck_id, volume } => {
                handlers::audio_thread_handle_set_deck_volume(self, deck_id, volume)
            }
            AudioThreadCommand::SetDeckEq { deck_id, params } => {
                handlers::audio_thread_handle_set_deck_eq(self, deck_id, params)
            }
            AudioThreadCommand::SetCrossfader { position, stamp } => {
                handlers::audio_thread_handle_set_crossfader(self, position, stamp)
            }
            AudioThreadCommand::SetCrossfaderCurve(style) => {
                handlers::audio_thread_handle_set_crossfader_curve(self, style)
            }
            AudioThreadCommand::SetMasterVolume(volume) => {
                handlers::audio_thread_handle_set_master_volume(self, volume)
            }
            AudioThreadCommand::SetMasterEq(params) => {
                handlers::audio_thread_handle_set_master_eq(self, params)
            }
            AudioThreadCommand::SetCueEnabled { deck_id, enabled } => {
                handlers::audio_thread_handle_set_cue_enabled(self, deck_id, enabled)
            }
            AudioThreadCommand::SetCueVolume(volume) => {
                handlers::audio_thread_handle_set_cue_volume(self, volume)
            }
            AudioThreadCommand::StartAutoMix { tracks } => {
                handlers::audio_thread_handle_start_auto_mix(self, tracks)
            }
            AudioThreadCommand::QueueTracks { tracks } => {
                handlers::audio_thread_handle_queue_tracks(self, tracks)
            }
            AudioThreadCommand::SetSessionConfig(config) => {
                handlers::audio_thread_handle_set_session_config(self, config)
            }
            AudioThreadCommand::SetAutoMixEnabled(enabled) => {
                handlers::audio_thread_handle_set_auto_mix_enabled(self, enabled)
            }
            AudioThreadCommand::TriggerTransition => handlers::audio_thread_handle_trigger(self),
            AudioThreadCommand::Skip => handlers::audio_thread_handle_skip(self),
            AudioThreadCommand::Stop => handlers::audio_thread_handle_stop(self),
            AudioThreadCommand::Shutdown(shutdown_complete_tx) => {
                log::info!("Audio Thread: Shutdown received. Cleaning up decks.");
                self.shutdown();
                if shutdown_complete_tx.send(()).is_err() {
                    log::error!("Audio Thread: Failed to send shutdown completion signal.");
                }
                return false;
            }
        };
        if let Err(e) = result {
            log::error!("Audio Thread: Command failed: {}", e);
        }
        true
    }

    /// One time slice: playheads, end-of-track, then the scheduler.
    pub fn tick(&mut self) {
        time::process_time_slice_updates(self);
    }

    pub(crate) fn run_scheduler(&mut self) {
        let (scheduler, mut ctx) = self.split();
        if let Err(e) = scheduler.on_tick(&mut ctx) {
            log::error!("Audio Thread: Auto-mix tick failed: {}", e);
        }
    }

    /// Lends the scheduler its view of the engine for one call.
    pub(crate) fn split(&mut self) -> (&mut AutoMixScheduler, MixContext<'_>) {
        let ctx = MixContext {
            graph: &mut self.graph,
            player: self.player.as_mut(),
            decks: &mut self.decks,
            events: self.events.as_ref(),
            now: self.clock.now(),
            control_floor: self.control_sequence.load(Ordering::Acquire),
        };
        (&mut self.scheduler, ctx)
    }

    fn shutdown(&mut self) {
        for deck in DeckId::ALL {
            if self.decks[deck.index()].loaded_track.is_some() {
                self.player.stop(deck);
            }
            self.decks[deck.index()].reset_media();
        }
        self.graph.disconnect();
    }
}

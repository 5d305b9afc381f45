use serde::Serialize;
use std::sync::Arc;

use crate::audio::config::{
    INITIAL_CROSSFADER_POSITION, INITIAL_CUE_VOLUME, INITIAL_DECK_VOLUME, INITIAL_MASTER_VOLUME,
};
use crate::audio::crossfade::{self, FadeGains};
use crate::audio::devices::{AudioBackend, BackendState};
use crate::audio::errors::PlaybackError;
use crate::audio::types::{CurveStyle, DeckId, EqParams, clamp_percent};

mod renderer;

pub use renderer::GraphRenderer;
use renderer::{EqTarget, SharedGraphParams};

// --- Logical State ---

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelParams {
    pub volume: f32,
    pub eq: EqParams,
    pub cue_enabled: bool,
}

impl Default for ChannelParams {
    fn default() -> Self {
        ChannelParams {
            volume: INITIAL_DECK_VOLUME,
            eq: EqParams::default(),
            cue_enabled: false,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MixBusState {
    pub crossfader_position: f32,
    pub crossfader_curve: CurveStyle,
    pub master_volume: f32,
    pub master_eq: EqParams,
    pub cue_volume: f32,
}

impl Default for MixBusState {
    fn default() -> Self {
        MixBusState {
            crossfader_position: INITIAL_CROSSFADER_POSITION,
            crossfader_curve: CurveStyle::default(),
            master_volume: INITIAL_MASTER_VOLUME,
            master_eq: EqParams::default(),
            cue_volume: INITIAL_CUE_VOLUME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStatus {
    /// Graph was built and its renderer attached to the backend.
    Built,
    /// Graph already exists for this device; nothing changed.
    AlreadyBuilt,
    /// Backend is not running; parameter writes are held until it resumes.
    Pending,
}

struct LiveGraph {
    device_id: String,
    params: Arc<SharedGraphParams>,
}

/// Control side of the mixer: two deck chains (EQ, gain, cue) into a master bus.
///
/// Setters always update the logical state. When a live graph exists the derived
/// gains are pushed to the renderer immediately; otherwise they are applied in one go
/// when `connect` builds the graph.
pub struct AudioSignalGraph {
    channels: [ChannelParams; 2],
    bus: MixBusState,
    transition_gains: Option<[f32; 2]>,
    live: Option<LiveGraph>,
}

impl Default for AudioSignalGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSignalGraph {
    pub fn new() -> Self {
        AudioSignalGraph {
            channels: [ChannelParams::default(); 2],
            bus: MixBusState::default(),
            transition_gains: None,
            live: None,
        }
    }

    /// Builds the graph on `backend`. Idempotent per device id.
    pub fn connect(&mut self, backend: &mut dyn AudioBackend) -> Result<GraphStatus, PlaybackError> {
        let device_id = backend.device_id().to_string();
        if let Some(live) = &self.live {
            if live.device_id == device_id {
                log::debug!("Audio Graph: Already built for device '{}'", device_id);
                return Ok(GraphStatus::AlreadyBuilt);
            }
            log::info!(
                "Audio Graph: Device changed from '{}' to '{}', rebuilding",
                live.device_id,
                device_id
            );
            self.live = None;
        }

        match backend.state() {
            BackendState::Running => {}
            BackendState::Suspended => {
                log::info!(
                    "Audio Graph: Device '{}' suspended; holding parameter writes until it resumes",
                    device_id
                );
                return Ok(GraphStatus::Pending);
            }
            state @ BackendState::Closed => {
                return Err(PlaybackError::BackendNotReady { device_id, state });
            }
        }

        let sample_rate = backend.sample_rate();
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(PlaybackError::InvalidSampleRate(sample_rate));
        }

        let params = Arc::new(SharedGraphParams::default());
        self.write_all(&params)?;
        let renderer = GraphRenderer::new(Arc::clone(&params), sample_rate)?;
        backend.attach(renderer)?;

        log::info!(
            "Audio Graph: Built for device '{}' at {} Hz",
            device_id,
            sample_rate
        );
        self.live = Some(LiveGraph { device_id, params });
        Ok(GraphStatus::Built)
    }

    /// Drops the live graph; logical state is kept for the next `connect`.
    pub fn disconnect(&mut self) {
        if let Some(live) = self.live.take() {
            log::info!("Audio Graph: Disconnected from device '{}'", live.device_id);
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    // --- Setters ---

    pub fn set_deck_volume(&mut self, deck: DeckId, volume: f32) {
        self.channels[deck.index()].volume = clamp_percent(volume);
        log::debug!(
            "Audio Graph: Deck '{}' volume {}",
            deck,
            self.channels[deck.index()].volume
        );
        self.push_gains();
    }

    pub fn set_deck_eq(&mut self, deck: DeckId, eq: EqParams) {
        let eq = eq.clamped();
        if self.channels[deck.index()].eq.approx_eq(&eq) {
            return;
        }
        self.channels[deck.index()].eq = eq;
        log::debug!("Audio Graph: Deck '{}' EQ {:?}", deck, eq);
        self.push_eq(EqTarget::Deck(deck), eq);
    }

    pub fn set_crossfader(&mut self, position: f32) {
        self.bus.crossfader_position = clamp_percent(position);
        self.push_gains();
    }

    pub fn set_crossfader_curve(&mut self, style: CurveStyle) {
        self.bus.crossfader_curve = style;
        log::debug!("Audio Graph: Crossfader curve {:?}", style);
        self.push_gains();
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.bus.master_volume = clamp_percent(volume);
        self.push_gains();
    }

    pub fn set_master_eq(&mut self, eq: EqParams) {
        let eq = eq.clamped();
        if self.bus.master_eq.approx_eq(&eq) {
            return;
        }
        self.bus.master_eq = eq;
        self.push_eq(EqTarget::Master, eq);
    }

    pub fn set_cue_enabled(&mut self, deck: DeckId, enabled: bool) {
        self.channels[deck.index()].cue_enabled = enabled;
        log::debug!("Audio Graph: Deck '{}' cue {}", deck, enabled);
        self.push_gains();
    }

    pub fn set_cue_volume(&mut self, volume: f32) {
        self.bus.cue_volume = clamp_percent(volume);
        self.push_gains();
    }

    /// Writes scheduler-driven fade gains, overriding the crossfader until cleared.
    ///
    /// The crossfader position follows the fade so observers see where the mix is.
    pub fn apply_transition_gains(&mut self, outgoing: DeckId, gains: FadeGains, progress: f32) {
        let mut factors = [0.0; 2];
        factors[outgoing.index()] = gains.fade_out;
        factors[outgoing.other().index()] = gains.fade_in;
        self.transition_gains = Some(factors);

        let travelled = clamp_percent(progress * 100.0);
        self.bus.crossfader_position = match outgoing.other() {
            DeckId::B => travelled,
            DeckId::A => 100.0 - travelled,
        };
        self.push_gains();
    }

    pub fn clear_transition_gains(&mut self) {
        if self.transition_gains.take().is_some() {
            self.push_gains();
        }
    }

    // --- Derived values ---

    pub fn channel(&self, deck: DeckId) -> &ChannelParams {
        &self.channels[deck.index()]
    }

    pub fn bus(&self) -> &MixBusState {
        &self.bus
    }

    pub fn has_transition_override(&self) -> bool {
        self.transition_gains.is_some()
    }

    pub fn fade_factor(&self, deck: DeckId) -> f32 {
        match self.transition_gains {
            Some(factors) => factors[deck.index()],
            None => crossfade::fade_factor(
                deck,
                self.bus.crossfader_position,
                self.bus.crossfader_curve,
            ),
        }
    }

    /// `volume / 100 * fade factor`.
    pub fn effective_gain(&self, deck: DeckId) -> f32 {
        self.channels[deck.index()].volume / 100.0 * self.fade_factor(deck)
    }

    pub fn cue_gain(&self, deck: DeckId) -> f32 {
        if self.channels[deck.index()].cue_enabled {
            self.bus.cue_volume / 100.0
        } else {
            0.0
        }
    }

    pub fn master_gain(&self) -> f32 {
        self.bus.master_volume / 100.0
    }

    // --- Live graph writes ---

    fn push_gains(&self) {
        if let Some(live) = &self.live {
            self.write_gains(&live.params);
        }
    }

    fn push_eq(&self, target: EqTarget, eq: EqParams) {
        let Some(live) = &self.live else {
            log::debug!("Audio Graph: No live graph, {:?} EQ held until connect", target);
            return;
        };
        if let Err(e) = live.params.store_eq(target, eq) {
            log::error!("Audio Graph: Failed to store {:?} EQ: {}", target, e);
        }
    }

    fn write_gains(&self, params: &SharedGraphParams) {
        for deck in DeckId::ALL {
            params.store_deck_gain(deck, self.effective_gain(deck));
            params.store_cue_gain(deck, self.cue_gain(deck));
        }
        params.store_master_gain(self.master_gain());
    }

    fn write_all(&self, params: &SharedGraphParams) -> Result<(), PlaybackError> {
        self.write_gains(params);
        for deck in DeckId::ALL {
            params.store_eq(EqTarget::Deck(deck), self.channels[deck.index()].eq)?;
        }
        params.store_eq(EqTarget::Master, self.bus.master_eq)?;
        Ok(())
    }
}

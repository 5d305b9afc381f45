use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::errors::ConfigError;
use crate::audio::planner::MixingIntensity;

// --- EQ Filter Constants ---
pub const LOW_MID_CROSSOVER_HZ: f32 = 250.0;
pub const MID_HIGH_CROSSOVER_HZ: f32 = 3000.0;
pub const MID_CENTER_HZ: f32 = 1000.0;
pub const MID_PEAK_Q_FACTOR: f32 = std::f32::consts::FRAC_1_SQRT_2;
pub const SHELF_Q_FACTOR: f32 = 0.5;

// --- Audio Playback Thread Constants ---
pub const AUDIO_THREAD_TIME_UPDATE_INTERVAL_MS: u64 = 20; // 50 FPS for smooth UI
pub const AUDIO_COMMAND_CHAN_SIZE: usize = 64;

// -- Initial Values --
pub const INITIAL_DECK_VOLUME: f32 = 100.0;
pub const INITIAL_MASTER_VOLUME: f32 = 100.0;
pub const INITIAL_CUE_VOLUME: f32 = 80.0;
pub const INITIAL_CROSSFADER_POSITION: f32 = 50.0;

// -- EQ Performance Constants --
/// Minimum change in dB before recalculating EQ filter coefficients
/// This prevents expensive recalculation for tiny inaudible changes
pub const EQ_RECALC_THRESHOLD_DB: f32 = 0.1;

/// Smoothing factor for EQ parameter changes (higher = faster response)
pub const EQ_SMOOTHING_FACTOR: f32 = 0.08;

/// Length of the linear ramp applied to gain changes on the render thread.
pub const GAIN_RAMP_SECONDS: f32 = 0.01;

// -- Playback Timing --
/// Playhead distance from the end at which a deck counts as finished.
pub const END_OF_TRACK_EPSILON_SECONDS: f64 = 0.01;

// --- Auto-Mix Tunables ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DurationRange {
    pub min: f64,
    pub max: f64,
}

/// Heuristic thresholds for scoring, style selection and transition timing.
///
/// Every field has a default, so a partial JSON document only overrides what it names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoMixConfig {
    /// Minimum score for general "compatible tracks" listings.
    pub compatible_min_score: u8,
    /// Minimum score for tracks picked for the auto-mix queue.
    pub auto_queue_min_score: u8,
    pub quick_cut_below_score: u8,
    pub blend_min_score: u8,
    pub blend_fallback_min_score: u8,
    pub similar_energy_max_diff: u8,
    pub energy_boost_min_jump: u8,
    /// Outro/intro length from which EchoOut is preferred.
    pub long_tail_seconds: f64,
    pub smooth_duration: DurationRange,
    pub balanced_duration: DurationRange,
    pub energetic_duration: DurationRange,
    pub quick_cut_max_seconds: f64,
    pub min_transition_seconds: f64,
    pub max_transition_seconds: f64,
    /// Number of gain writes per transition.
    pub curve_steps: u32,
    pub tick_interval_ms: u64,
}

impl Default for AutoMixConfig {
    fn default() -> Self {
        AutoMixConfig {
            compatible_min_score: 30,
            auto_queue_min_score: 40,
            quick_cut_below_score: 40,
            blend_min_score: 70,
            blend_fallback_min_score: 55,
            similar_energy_max_diff: 2,
            energy_boost_min_jump: 3,
            long_tail_seconds: 16.0,
            smooth_duration: DurationRange {
                min: 24.0,
                max: 32.0,
            },
            balanced_duration: DurationRange {
                min: 16.0,
                max: 24.0,
            },
            energetic_duration: DurationRange {
                min: 8.0,
                max: 16.0,
            },
            quick_cut_max_seconds: 8.0,
            min_transition_seconds: 4.0,
            max_transition_seconds: 32.0,
            curve_steps: 60,
            tick_interval_ms: AUDIO_THREAD_TIME_UPDATE_INTERVAL_MS,
        }
    }
}

impl AutoMixConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AutoMixConfig = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loading auto-mix config from '{}'", path.display());
        Self::from_json_str(&contents)
    }

    pub fn duration_range(&self, intensity: MixingIntensity) -> DurationRange {
        match intensity {
            MixingIntensity::Smooth => self.smooth_duration,
            MixingIntensity::Balanced => self.balanced_duration,
            MixingIntensity::Energetic => self.energetic_duration,
        }
    }

    /// Repairs inverted or non-positive ranges instead of rejecting the whole document.
    pub fn validated(mut self) -> Self {
        let defaults = AutoMixConfig::default();

        if !(self.min_transition_seconds > 0.0)
            || !(self.max_transition_seconds >= self.min_transition_seconds)
        {
            log::warn!(
                "Config: invalid transition bounds [{}, {}], using defaults",
                self.min_transition_seconds,
                self.max_transition_seconds
            );
            self.min_transition_seconds = defaults.min_transition_seconds;
            self.max_transition_seconds = defaults.max_transition_seconds;
        }

        for (name, range, fallback) in [
            ("smoothDuration", &mut self.smooth_duration, defaults.smooth_duration),
            ("balancedDuration", &mut self.balanced_duration, defaults.balanced_duration),
            ("energeticDuration", &mut self.energetic_duration, defaults.energetic_duration),
        ] {
            if !(range.min > 0.0) || !(range.max >= range.min) {
                log::warn!(
                    "Config: invalid {} [{}, {}], using default",
                    name,
                    range.min,
                    range.max
                );
                *range = fallback;
            }
        }

        if !(self.quick_cut_max_seconds > 0.0) {
            self.quick_cut_max_seconds = defaults.quick_cut_max_seconds;
        }
        if !(self.long_tail_seconds >= 0.0) {
            self.long_tail_seconds = defaults.long_tail_seconds;
        }
        if self.curve_steps == 0 {
            log::warn!("Config: curveSteps must be positive, using {}", defaults.curve_steps);
            self.curve_steps = defaults.curve_steps;
        }
        if self.tick_interval_ms == 0 {
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
        self
    }
}

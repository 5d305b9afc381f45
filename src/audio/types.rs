use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

// --- Decks ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeckId {
    A,
    B,
}

impl DeckId {
    pub const ALL: [DeckId; 2] = [DeckId::A, DeckId::B];

    pub fn other(self) -> Self {
        match self {
            DeckId::A => DeckId::B,
            DeckId::B => DeckId::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            DeckId::A => 0,
            DeckId::B => 1,
        }
    }

    /// Crossfader position (0-100) at which only this deck is audible.
    pub fn crossfader_side(self) -> f32 {
        match self {
            DeckId::A => 0.0,
            DeckId::B => 100.0,
        }
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckId::A => write!(f, "A"),
            DeckId::B => write!(f, "B"),
        }
    }
}

// --- EQ Parameters ---

/// Holds the knob positions (0-100, 50 = flat) for the 3-band EQ.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EqParams {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Default for EqParams {
    fn default() -> Self {
        EqParams {
            low: 50.0,
            mid: 50.0,
            high: 50.0,
        }
    }
}

impl EqParams {
    pub fn clamped(self) -> Self {
        EqParams {
            low: clamp_percent(self.low),
            mid: clamp_percent(self.mid),
            high: clamp_percent(self.high),
        }
    }

    pub fn low_gain_db(&self) -> f32 {
        knob_to_gain_db(self.low)
    }

    pub fn mid_gain_db(&self) -> f32 {
        knob_to_gain_db(self.mid)
    }

    pub fn high_gain_db(&self) -> f32 {
        knob_to_gain_db(self.high)
    }

    pub(crate) fn gains_db(&self) -> [f32; 3] {
        [self.low_gain_db(), self.mid_gain_db(), self.high_gain_db()]
    }

    pub(crate) fn approx_eq(&self, other: &Self) -> bool {
        const EPSILON: f32 = 1e-5; // Tolerance for float comparison
        (self.low - other.low).abs() < EPSILON
            && (self.mid - other.mid).abs() < EPSILON
            && (self.high - other.high).abs() < EPSILON
    }
}

/// Maps a 0-100 knob to -10..+10 dB, 50 being unity.
pub fn knob_to_gain_db(value: f32) -> f32 {
    (clamp_percent(value) - 50.0) / 5.0
}

/// Clamps a 0-100 control value. NaN reads as 0.
pub fn clamp_percent(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

// --- Crossfade ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum CurveStyle {
    #[default]
    Smooth,
    Fast,
    Sharp,
    Linear,
}

// --- Lock-free parameter cells ---

/// f32 stored as bits in an `AtomicU32`, for values read on the render thread.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        AtomicF32(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self, order: Ordering) -> f32 {
        f32::from_bits(self.0.load(order))
    }

    pub fn store(&self, value: f32, order: Ordering) {
        self.0.store(value.to_bits(), order);
    }
}

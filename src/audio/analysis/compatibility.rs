use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use crate::audio::track::Track;

// --- Factor weights ---
pub const KEY_MATCH_POINTS: u8 = 40;
pub const KEY_COMPATIBLE_POINTS: u8 = 30;
pub const TEMPO_MAX_POINTS: f64 = 30.0;
pub const TEMPO_MIN_POINTS: f64 = 15.0;
pub const SUB_GENRE_POINTS: u8 = 15;
pub const GENRE_POINTS: u8 = 8;
pub const ENERGY_MAX_POINTS: i32 = 15;

/// Largest faster/slower tempo ratio that still mixes without time-stretch artifacts.
pub const TEMPO_RATIO_TOLERANCE: f64 = 1.06;
/// Ratio window for double/half-time mixing.
pub const DOUBLE_TIME_RATIO_RANGE: (f64, f64) = (1.88, 2.12);

const WHEEL_SIZE: u8 = 12;

// --- Camelot wheel ---

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CamelotLetter {
    A,
    B,
}

/// Position on the Camelot wheel: 1-12 plus A (minor) or B (major).
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CamelotKey {
    pub number: u8,
    pub letter: CamelotLetter,
}

impl CamelotKey {
    /// Accepts exactly `^(\d+)([AB])$` with a wheel number of 1-12.
    pub fn parse(input: &str) -> Option<Self> {
        let letter = match input.as_bytes().last()? {
            b'A' => CamelotLetter::A,
            b'B' => CamelotLetter::B,
            _ => return None,
        };
        let digits = &input[..input.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number: u8 = digits.parse().ok()?;
        (1..=WHEEL_SIZE)
            .contains(&number)
            .then_some(CamelotKey { number, letter })
    }

    /// Same wheel number, opposite mode.
    pub fn relative(self) -> Self {
        let letter = match self.letter {
            CamelotLetter::A => CamelotLetter::B,
            CamelotLetter::B => CamelotLetter::A,
        };
        CamelotKey { letter, ..self }
    }

    /// One step clockwise (`+1`) or counter-clockwise (`-1`), wrapping 12 <-> 1.
    pub fn step(self, clockwise: bool) -> Self {
        let number = if clockwise {
            self.number % WHEEL_SIZE + 1
        } else {
            (self.number + WHEEL_SIZE - 2) % WHEEL_SIZE + 1
        };
        CamelotKey { number, ..self }
    }

    pub fn compatible(self) -> BTreeSet<CamelotKey> {
        [self, self.relative(), self.step(true), self.step(false)]
            .into_iter()
            .collect()
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.letter {
            CamelotLetter::A => 'A',
            CamelotLetter::B => 'B',
        };
        write!(f, "{}{}", self.number, letter)
    }
}

/// Keys that mix harmonically with `camelot_key`; empty for missing or malformed input.
pub fn compatible_keys(camelot_key: Option<&str>) -> BTreeSet<String> {
    camelot_key
        .and_then(CamelotKey::parse)
        .map(|key| key.compatible().iter().map(ToString::to_string).collect())
        .unwrap_or_default()
}

// --- Scoring ---

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub key: u8,
    pub tempo: u8,
    pub genre: u8,
    pub energy: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        self.key + self.tempo + self.genre + self.energy
    }
}

/// Mixability of two tracks, 0-100.
pub fn score(a: &Track, b: &Track) -> u8 {
    score_breakdown(a, b).total()
}

pub fn score_breakdown(a: &Track, b: &Track) -> ScoreBreakdown {
    ScoreBreakdown {
        key: key_points(a.camelot_key.as_deref(), b.camelot_key.as_deref()),
        tempo: tempo_points(a.bpm, b.bpm),
        genre: genre_points(a, b),
        energy: energy_points(a.energy, b.energy),
    }
}

fn key_points(a: Option<&str>, b: Option<&str>) -> u8 {
    let (Some(a), Some(b)) = (a.and_then(CamelotKey::parse), b.and_then(CamelotKey::parse)) else {
        return 0;
    };
    if a == b {
        KEY_MATCH_POINTS
    } else if a.compatible().contains(&b) {
        KEY_COMPATIBLE_POINTS
    } else {
        0
    }
}

/// True when the two tempos are within tolerance directly or at double/half time.
pub fn tempo_compatible(a: f64, b: f64) -> bool {
    if !(a > 0.0 && b > 0.0 && a.is_finite() && b.is_finite()) {
        return false;
    }
    let ratio = a.max(b) / a.min(b);
    ratio <= TEMPO_RATIO_TOLERANCE
        || (DOUBLE_TIME_RATIO_RANGE.0..=DOUBLE_TIME_RATIO_RANGE.1).contains(&ratio)
}

fn tempo_points(a: Option<f64>, b: Option<f64>) -> u8 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0;
    };
    if !tempo_compatible(a, b) {
        return 0;
    }
    (TEMPO_MAX_POINTS - (a - b).abs())
        .max(TEMPO_MIN_POINTS)
        .round() as u8
}

fn normalized(label: Option<&str>) -> Option<String> {
    let trimmed = label?.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn genre_points(a: &Track, b: &Track) -> u8 {
    let same = |x: Option<&str>, y: Option<&str>| match (normalized(x), normalized(y)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    };
    if same(a.sub_genre.as_deref(), b.sub_genre.as_deref()) {
        SUB_GENRE_POINTS
    } else if same(a.genre.as_deref(), b.genre.as_deref()) {
        GENRE_POINTS
    } else {
        0
    }
}

fn energy_points(a: Option<u8>, b: Option<u8>) -> u8 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0;
    };
    let diff = (a as i32 - b as i32).abs();
    (ENERGY_MAX_POINTS - 2 * diff).max(0) as u8
}

// --- Ranking ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTrack {
    pub track: Track,
    pub score: u8,
}

/// Scores `candidates` against `seed` and returns the best `limit` at or above `min_score`.
///
/// The seed itself is never returned. Ties break on tempo distance (unknown last),
/// then on input order.
pub fn rank_compatible(
    seed: &Track,
    candidates: &[Track],
    limit: usize,
    min_score: u8,
) -> Vec<ScoredTrack> {
    let mut scored: Vec<(usize, u8, Option<f64>)> = candidates
        .par_iter()
        .enumerate()
        .filter(|(_, candidate)| candidate.id != seed.id)
        .map(|(index, candidate)| {
            let tempo_distance = seed.bpm.zip(candidate.bpm).map(|(a, b)| (a - b).abs());
            (index, score(seed, candidate), tempo_distance)
        })
        .filter(|(_, score, _)| *score >= min_score)
        .collect();

    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| match (a.2, b.2) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.0.cmp(&b.0))
    });

    log::debug!(
        "Compatibility: {} of {} candidates for '{}' reach score {}",
        scored.len(),
        candidates.len(),
        seed.id,
        min_score
    );

    scored
        .into_iter()
        .take(limit)
        .map(|(index, score, _)| ScoredTrack {
            track: candidates[index].clone(),
            score,
        })
        .collect()
}

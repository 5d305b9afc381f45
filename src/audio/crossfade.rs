use serde::Serialize;
use std::f32::consts::FRAC_PI_2;

use crate::audio::types::{CurveStyle, DeckId};

/// Gains for the outgoing and incoming side of a fade, each in [0, 1].
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FadeGains {
    pub fade_out: f32,
    pub fade_in: f32,
}

/// Evaluates a crossfade curve at `progress` (clamped to [0, 1], NaN reads as 0).
pub fn curve(progress: f32, style: CurveStyle) -> FadeGains {
    let p = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };

    let (fade_out, fade_in) = match style {
        CurveStyle::Smooth => ((p * FRAC_PI_2).cos(), ((1.0 - p) * FRAC_PI_2).cos()),
        CurveStyle::Fast => (
            if p < 0.5 { 1.0 } else { (1.0 - p) / 0.5 },
            if p > 0.5 { 1.0 } else { p / 0.5 },
        ),
        CurveStyle::Sharp => (
            if p < 0.05 { 1.0 } else { 0.0 },
            if p > 0.95 { 1.0 } else { 0.0 },
        ),
        CurveStyle::Linear => (1.0 - p, p),
    };

    // cos(pi/2) is not exactly zero in f32
    FadeGains {
        fade_out: fade_out.clamp(0.0, 1.0),
        fade_in: fade_in.clamp(0.0, 1.0),
    }
}

/// Gain a deck receives from the crossfader at `position` (0-100, A at 0, B at 100).
pub fn fade_factor(deck: DeckId, position: f32, style: CurveStyle) -> f32 {
    let gains = curve(position / 100.0, style);
    match deck {
        DeckId::A => gains.fade_out,
        DeckId::B => gains.fade_in,
    }
}

/// Maps elapsed time onto one of `steps` discrete curve positions.
///
/// Returns the step index and its progress; a non-positive duration completes immediately.
pub fn quantize_progress(elapsed_seconds: f64, duration_seconds: f64, steps: u32) -> (u32, f32) {
    let steps = steps.max(1);
    if !(duration_seconds > 0.0) {
        return (steps, 1.0);
    }
    let fraction = (elapsed_seconds / duration_seconds).clamp(0.0, 1.0);
    let step = ((fraction * steps as f64).floor() as u32).min(steps);
    (step, step as f32 / steps as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STYLES: [CurveStyle; 4] = [
        CurveStyle::Smooth,
        CurveStyle::Fast,
        CurveStyle::Sharp,
        CurveStyle::Linear,
    ];

    #[test]
    fn test_endpoints_for_every_style() {
        for style in ALL_STYLES {
            let start = curve(0.0, style);
            let end = curve(1.0, style);
            assert!((start.fade_out - 1.0).abs() < 1e-6, "{:?} start out", style);
            assert!(start.fade_in.abs() < 1e-6, "{:?} start in", style);
            assert!(end.fade_out.abs() < 1e-6, "{:?} end out", style);
            assert!((end.fade_in - 1.0).abs() < 1e-6, "{:?} end in", style);
        }
    }

    #[test]
    fn test_smooth_is_equal_power() {
        let mid = curve(0.5, CurveStyle::Smooth);
        assert!((mid.fade_out - 0.7071).abs() < 1e-3);
        assert!((mid.fade_in - 0.7071).abs() < 1e-3);

        for i in 0..=100 {
            let g = curve(i as f32 / 100.0, CurveStyle::Smooth);
            let power = g.fade_out * g.fade_out + g.fade_in * g.fade_in;
            assert!((power - 1.0).abs() < 1e-5, "power {} at step {}", power, i);
        }
    }

    #[test]
    fn test_fast_holds_then_ramps() {
        let early = curve(0.25, CurveStyle::Fast);
        assert_eq!(early.fade_out, 1.0);
        assert!((early.fade_in - 0.5).abs() < 1e-6);

        let late = curve(0.75, CurveStyle::Fast);
        assert!((late.fade_out - 0.5).abs() < 1e-6);
        assert_eq!(late.fade_in, 1.0);
    }

    #[test]
    fn test_sharp_switches_near_the_edges() {
        assert_eq!(curve(0.04, CurveStyle::Sharp).fade_out, 1.0);
        assert_eq!(curve(0.06, CurveStyle::Sharp).fade_out, 0.0);
        assert_eq!(curve(0.94, CurveStyle::Sharp).fade_in, 0.0);
        assert_eq!(curve(0.96, CurveStyle::Sharp).fade_in, 1.0);
    }

    #[test]
    fn test_out_of_range_progress_is_clamped() {
        assert_eq!(curve(-3.0, CurveStyle::Linear), curve(0.0, CurveStyle::Linear));
        assert_eq!(curve(7.0, CurveStyle::Linear), curve(1.0, CurveStyle::Linear));
        assert_eq!(curve(f32::NAN, CurveStyle::Linear), curve(0.0, CurveStyle::Linear));
    }

    #[test]
    fn test_fade_factor_sides() {
        assert_eq!(fade_factor(DeckId::A, 0.0, CurveStyle::Linear), 1.0);
        assert_eq!(fade_factor(DeckId::B, 0.0, CurveStyle::Linear), 0.0);
        assert_eq!(fade_factor(DeckId::A, 100.0, CurveStyle::Linear), 0.0);
        assert_eq!(fade_factor(DeckId::B, 100.0, CurveStyle::Linear), 1.0);
        assert!((fade_factor(DeckId::A, 50.0, CurveStyle::Smooth) - 0.7071).abs() < 1e-3);
    }

    #[test]
    fn test_quantize_progress() {
        assert_eq!(quantize_progress(0.0, 20.0, 60), (0, 0.0));
        assert_eq!(quantize_progress(10.0, 20.0, 60), (30, 0.5));
        assert_eq!(quantize_progress(20.0, 20.0, 60), (60, 1.0));
        assert_eq!(quantize_progress(25.0, 20.0, 60), (60, 1.0));
        assert_eq!(quantize_progress(1.0, 0.0, 60), (60, 1.0));
        // Within a step the output does not move
        assert_eq!(quantize_progress(0.3, 20.0, 60).0, 0);
    }
}

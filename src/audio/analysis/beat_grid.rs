use crate::audio::track::Track;

pub const BEATS_PER_BAR: u32 = 4;

/// Regular beat grid anchored at a track's first downbeat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatGrid {
    bpm: f64,
    first_beat_seconds: f64,
}

impl BeatGrid {
    pub fn new(bpm: f64, first_beat_seconds: f64) -> Option<Self> {
        if bpm.is_finite() && bpm > 0.0 && first_beat_seconds.is_finite() && first_beat_seconds >= 0.0
        {
            Some(BeatGrid {
                bpm,
                first_beat_seconds,
            })
        } else {
            None
        }
    }

    /// Grid for a track with both tempo and first downbeat known.
    pub fn for_track(track: &Track) -> Option<Self> {
        Self::new(track.bpm?, track.first_beat_seconds?)
    }

    pub fn beat_interval(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn bar_interval(&self) -> f64 {
        self.beat_interval() * BEATS_PER_BAR as f64
    }

    /// Latest bar line at or before `time_seconds`. Times before the first downbeat are returned as-is.
    pub fn bar_at_or_before(&self, time_seconds: f64) -> f64 {
        if time_seconds < self.first_beat_seconds {
            return time_seconds;
        }
        let bars = ((time_seconds - self.first_beat_seconds) / self.bar_interval()).floor();
        self.first_beat_seconds + bars * self.bar_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals_at_120_bpm() {
        let grid = BeatGrid::new(120.0, 0.0).unwrap();
        assert!((grid.beat_interval() - 0.5).abs() < 1e-9);
        assert!((grid.bar_interval() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bar_snapping_moves_earlier() {
        let grid = BeatGrid::new(120.0, 0.25).unwrap();
        // Bars fall at 0.25, 2.25, 4.25, ...
        assert!((grid.bar_at_or_before(5.0) - 4.25).abs() < 1e-9);
        assert!((grid.bar_at_or_before(4.25) - 4.25).abs() < 1e-9);
        assert!((grid.bar_at_or_before(160.0) - 158.25).abs() < 1e-9);
        assert_eq!(grid.bar_at_or_before(0.1), 0.1);
    }

    #[test]
    fn test_requires_tempo_and_downbeat() {
        let track = Track::new("t", "", "").with_bpm(128.0);
        assert!(BeatGrid::for_track(&track).is_none());
        assert!(BeatGrid::for_track(&track.with_first_beat(0.1)).is_some());
        assert!(BeatGrid::new(0.0, 0.0).is_none());
    }
}

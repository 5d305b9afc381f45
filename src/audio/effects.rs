use crate::audio::config;
use crate::audio::errors::AudioEffectsError;
use crate::audio::types::EqParams;
use biquad::{Biquad as _, Coefficients, DirectForm1, ToHertz, Type};

/// Low shelf, mid peak and high shelf biquads in series.
///
/// Coefficients track a target `EqParams` with exponential smoothing; each call to
/// `update_if_needed` moves one smoothing step and only recalculates bands whose
/// gain changed by more than `EQ_RECALC_THRESHOLD_DB`.
pub struct ThreeBandEq {
    sample_rate: f32,
    low_shelf: DirectForm1<f32>,
    mid_peak: DirectForm1<f32>,
    high_shelf: DirectForm1<f32>,
    applied_db: [f32; 3],
}

impl ThreeBandEq {
    pub fn new(sample_rate: f32, params: &EqParams) -> Result<Self, AudioEffectsError> {
        let [low_db, mid_db, high_db] = params.gains_db();
        Ok(ThreeBandEq {
            sample_rate,
            low_shelf: DirectForm1::<f32>::new(calculate_low_shelf(sample_rate, low_db)?),
            mid_peak: DirectForm1::<f32>::new(calculate_mid_peak(sample_rate, mid_db)?),
            high_shelf: DirectForm1::<f32>::new(calculate_high_shelf(sample_rate, high_db)?),
            applied_db: [low_db, mid_db, high_db],
        })
    }

    pub fn applied_gains_db(&self) -> [f32; 3] {
        self.applied_db
    }

    pub fn update_if_needed(&mut self, target: &EqParams) -> Result<(), AudioEffectsError> {
        let target_db = target.gains_db();
        for band in 0..3 {
            let Some(next_db) = smooth_toward(self.applied_db[band], target_db[band]) else {
                continue;
            };
            match band {
                0 => self
                    .low_shelf
                    .update_coefficients(calculate_low_shelf(self.sample_rate, next_db)?),
                1 => self
                    .mid_peak
                    .update_coefficients(calculate_mid_peak(self.sample_rate, next_db)?),
                _ => self
                    .high_shelf
                    .update_coefficients(calculate_high_shelf(self.sample_rate, next_db)?),
            }
            self.applied_db[band] = next_db;
        }
        Ok(())
    }

    #[inline]
    pub fn run(&mut self, sample: f32) -> f32 {
        let low_processed = self.low_shelf.run(sample);
        let mid_processed = self.mid_peak.run(low_processed);
        self.high_shelf.run(mid_processed)
    }

    pub fn reset(&mut self) {
        self.low_shelf.reset_state();
        self.mid_peak.reset_state();
        self.high_shelf.reset_state();
    }
}

/// Next smoothed gain, or `None` once within the recalculation threshold of the target.
fn smooth_toward(current_db: f32, target_db: f32) -> Option<f32> {
    let delta = target_db - current_db;
    if delta.abs() <= config::EQ_RECALC_THRESHOLD_DB {
        return None;
    }
    let step = delta * config::EQ_SMOOTHING_FACTOR;
    if (delta - step).abs() <= config::EQ_RECALC_THRESHOLD_DB {
        Some(target_db)
    } else {
        Some(current_db + step)
    }
}

/// Per-sample linear ramp toward a target gain.
#[derive(Debug, Clone)]
pub struct SmoothedGain {
    current: f32,
    target: f32,
    step: f32,
    ramp_samples: u32,
}

impl SmoothedGain {
    pub fn new(initial: f32, ramp_samples: u32) -> Self {
        SmoothedGain {
            current: initial,
            target: initial,
            step: 0.0,
            ramp_samples: ramp_samples.max(1),
        }
    }

    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() <= f32::EPSILON {
            return;
        }
        self.target = target;
        self.step = (target - self.current) / self.ramp_samples as f32;
    }

    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        if self.current != self.target {
            self.current += self.step;
            let overshot = (self.step > 0.0 && self.current >= self.target)
                || (self.step < 0.0 && self.current <= self.target)
                || self.step == 0.0;
            if overshot {
                self.current = self.target;
            }
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

// --- Filter Calculation Helpers ---

fn calculate_low_shelf(
    sample_rate: f32,
    gain_db: f32,
) -> Result<Coefficients<f32>, AudioEffectsError> {
    Coefficients::<f32>::from_params(
        Type::LowShelf(gain_db),
        sample_rate.hz(),
        config::LOW_MID_CROSSOVER_HZ.hz(),
        config::SHELF_Q_FACTOR,
    )
    .map_err(|e| AudioEffectsError::CoefficientCalculationError {
        filter_type: format!("LowShelf: {:?}", e),
    })
}

fn calculate_mid_peak(
    sample_rate: f32,
    gain_db: f32,
) -> Result<Coefficients<f32>, AudioEffectsError> {
    Coefficients::<f32>::from_params(
        Type::PeakingEQ(gain_db),
        sample_rate.hz(),
        config::MID_CENTER_HZ.hz(),
        config::MID_PEAK_Q_FACTOR,
    )
    .map_err(|e| AudioEffectsError::CoefficientCalculationError {
        filter_type: format!("MidPeak: {:?}", e),
    })
}

fn calculate_high_shelf(
    sample_rate: f32,
    gain_db: f32,
) -> Result<Coefficients<f32>, AudioEffectsError> {
    Coefficients::<f32>::from_params(
        Type::HighShelf(gain_db),
        sample_rate.hz(),
        config::MID_HIGH_CROSSOVER_HZ.hz(),
        config::SHELF_Q_FACTOR,
    )
    .map_err(|e| AudioEffectsError::CoefficientCalculationError {
        filter_type: format!("HighShelf: {:?}", e),
    })
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::config::GAIN_RAMP_SECONDS;
use crate::audio::effects::{SmoothedGain, ThreeBandEq};
use crate::audio::errors::AudioEffectsError;
use crate::audio::types::{AtomicF32, DeckId, EqParams};

/// Parameter cells written by the engine thread and read by the renderer.
#[derive(Debug, Default)]
pub(crate) struct SharedGraphParams {
    pub(crate) deck_gain: [AtomicF32; 2],
    pub(crate) cue_gain: [AtomicF32; 2],
    pub(crate) master_gain: AtomicF32,
    pub(crate) deck_eq: [Mutex<EqParams>; 2],
    pub(crate) master_eq: Mutex<EqParams>,
    /// Bumped after every EQ write so the renderer only locks when something changed.
    pub(crate) eq_generation: AtomicU64,
}

impl SharedGraphParams {
    pub(crate) fn store_deck_gain(&self, deck: DeckId, gain: f32) {
        self.deck_gain[deck.index()].store(gain, Ordering::Relaxed);
    }

    pub(crate) fn store_cue_gain(&self, deck: DeckId, gain: f32) {
        self.cue_gain[deck.index()].store(gain, Ordering::Relaxed);
    }

    pub(crate) fn store_master_gain(&self, gain: f32) {
        self.master_gain.store(gain, Ordering::Relaxed);
    }

    pub(crate) fn store_eq(&self, target: EqTarget, params: EqParams) -> Result<(), AudioEffectsError> {
        let cell = match target {
            EqTarget::Deck(deck) => &self.deck_eq[deck.index()],
            EqTarget::Master => &self.master_eq,
        };
        *cell.lock().map_err(|_| AudioEffectsError::EqParamsLockError {
            reason: format!("Mutex poisoned while storing {:?} EQ", target),
        })? = params;
        self.eq_generation.fetch_add(1, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EqTarget {
    Deck(DeckId),
    Master,
}

/// Render half of the signal graph, owned by the audio backend's callback.
///
/// Each deck runs through its EQ and then splits: one branch through the deck gain
/// into the master bus (EQ + master gain), one through the cue gain straight to the
/// cue output, bypassing fader, crossfader and master.
pub struct GraphRenderer {
    params: Arc<SharedGraphParams>,
    sample_rate: f32,
    deck_eq: [ThreeBandEq; 2],
    deck_gain: [SmoothedGain; 2],
    cue_gain: [SmoothedGain; 2],
    master_eq: ThreeBandEq,
    master_gain: SmoothedGain,
    eq_targets: [EqParams; 3],
    seen_generation: u64,
}

impl GraphRenderer {
    pub(crate) fn new(params: Arc<SharedGraphParams>, sample_rate: f32) -> Result<Self, AudioEffectsError> {
        let ramp_samples = (sample_rate * GAIN_RAMP_SECONDS).round().max(1.0) as u32;
        let eq_targets = read_eq_targets(&params)?;
        let gain = |cell: &AtomicF32| SmoothedGain::new(cell.load(Ordering::Relaxed), ramp_samples);

        Ok(GraphRenderer {
            sample_rate,
            deck_eq: [
                ThreeBandEq::new(sample_rate, &eq_targets[0])?,
                ThreeBandEq::new(sample_rate, &eq_targets[1])?,
            ],
            deck_gain: [gain(&params.deck_gain[0]), gain(&params.deck_gain[1])],
            cue_gain: [gain(&params.cue_gain[0]), gain(&params.cue_gain[1])],
            master_eq: ThreeBandEq::new(sample_rate, &eq_targets[2])?,
            master_gain: gain(&params.master_gain),
            eq_targets,
            seen_generation: params.eq_generation.load(Ordering::Acquire),
            params,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Mixes one mono block. Deck inputs shorter than `master_out` are treated as silence
    /// past their end; `cue_out` is filled up to its own length.
    pub fn render(&mut self, deck_a: &[f32], deck_b: &[f32], master_out: &mut [f32], cue_out: &mut [f32]) {
        self.sync_targets();

        let frames = master_out.len().max(cue_out.len());
        for i in 0..frames {
            let inputs = [
                deck_a.get(i).copied().unwrap_or(0.0),
                deck_b.get(i).copied().unwrap_or(0.0),
            ];
            let mut bus = 0.0;
            let mut cue = 0.0;
            for (deck, input) in inputs.into_iter().enumerate() {
                let equalized = self.deck_eq[deck].run(input);
                bus += equalized * self.deck_gain[deck].next_gain();
                cue += equalized * self.cue_gain[deck].next_gain();
            }
            let mut master = self.master_eq.run(bus) * self.master_gain.next_gain();

            if !master.is_finite() || !cue.is_finite() {
                log::error!(
                    "Graph renderer produced non-finite output (master {}, cue {}); resetting filters",
                    master,
                    cue
                );
                self.reset_filters();
                master = 0.0;
                cue = 0.0;
            }
            if let Some(slot) = master_out.get_mut(i) {
                *slot = master;
            }
            if let Some(slot) = cue_out.get_mut(i) {
                *slot = cue;
            }
        }
    }

    fn sync_targets(&mut self) {
        let params = &self.params;
        for deck in DeckId::ALL {
            self.deck_gain[deck.index()].set_target(params.deck_gain[deck.index()].load(Ordering::Relaxed));
            self.cue_gain[deck.index()].set_target(params.cue_gain[deck.index()].load(Ordering::Relaxed));
        }
        self.master_gain.set_target(params.master_gain.load(Ordering::Relaxed));

        let generation = params.eq_generation.load(Ordering::Acquire);
        if generation != self.seen_generation {
            // Never block the callback; a contended lock is retried next block
            if let Some(targets) = try_read_eq_targets(params) {
                self.eq_targets = targets;
                self.seen_generation = generation;
            }
        }

        let [deck_a_eq, deck_b_eq, master_eq] = &self.eq_targets;
        let [deck_a_filter, deck_b_filter] = &mut self.deck_eq;
        for (filter, target) in [
            (deck_a_filter, deck_a_eq),
            (deck_b_filter, deck_b_eq),
            (&mut self.master_eq, master_eq),
        ] {
            if let Err(e) = filter.update_if_needed(target) {
                log::error!("Failed to update EQ filters during render: {:?}", e);
            }
        }
    }

    fn reset_filters(&mut self) {
        self.deck_eq.iter_mut().for_each(ThreeBandEq::reset);
        self.master_eq.reset();
    }
}

fn read_eq_targets(params: &SharedGraphParams) -> Result<[EqParams; 3], AudioEffectsError> {
    let lock = |cell: &Mutex<EqParams>| {
        cell.lock()
            .map(|guard| *guard)
            .map_err(|_| AudioEffectsError::EqParamsLockError {
                reason: "Mutex poisoned on renderer creation".to_string(),
            })
    };
    Ok([lock(&params.deck_eq[0])?, lock(&params.deck_eq[1])?, lock(&params.master_eq)?])
}

fn try_read_eq_targets(params: &SharedGraphParams) -> Option<[EqParams; 3]> {
    let read = |cell: &Mutex<EqParams>| cell.try_lock().ok().map(|guard| *guard);
    Some([read(&params.deck_eq[0])?, read(&params.deck_eq[1])?, read(&params.master_eq)?])
}

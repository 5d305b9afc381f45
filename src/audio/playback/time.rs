use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::engine::MixEngine;
use super::events::{emit_status_update_event, emit_tick_event};
use crate::audio::config::END_OF_TRACK_EPSILON_SECONDS;
use crate::audio::types::DeckId;

// --- Clocks ---

/// Monotonic time source for transition progress.
pub trait Clock: Send {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::AcqRel);
    }

    pub fn set(&self, to: Duration) {
        self.micros.store(to.as_micros() as u64, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Acquire))
    }
}

// --- Time Slice Processing ---

/// Polls playheads for playing decks, reports ticks and track ends, then lets the
/// scheduler act on the new positions.
pub(crate) fn process_time_slice_updates(engine: &mut MixEngine) {
    for deck_id in DeckId::ALL {
        let deck_state = &mut engine.decks[deck_id.index()];
        if !deck_state.is_playing {
            continue;
        }
        let Some(current_time) = engine.player.playhead(deck_id) else {
            continue;
        };
        deck_state.playhead_seconds = current_time;

        let has_ended = deck_state
            .duration_seconds()
            .is_some_and(|duration| current_time >= duration - END_OF_TRACK_EPSILON_SECONDS);

        emit_tick_event(engine.events.as_ref(), deck_id, current_time);

        if has_ended {
            log::info!(
                "Audio Thread: Deck '{}' reached the end of '{}'",
                deck_id,
                deck_state.track_id().unwrap_or_default()
            );
            if let Some(duration) = deck_state.duration_seconds() {
                deck_state.playhead_seconds = duration;
            }
            deck_state.is_playing = false;
            engine.player.pause(deck_id);
            emit_status_update_event(engine.events.as_ref(), deck_id, false);
        }
    }

    engine.run_scheduler();
}

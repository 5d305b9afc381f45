//! Fakes shared by the playback unit tests.

use std::sync::{Arc, Mutex, MutexGuard};

use super::events::{EngineEvent, ErrorKind, EventSink};
use super::player::{DeckPlayer, StartStatus};
use crate::audio::errors::PlaybackError;
use crate::audio::track::Track;
use crate::audio::types::DeckId;

#[derive(Debug, Default)]
struct FakeDeck {
    track_id: Option<String>,
    position: f64,
    playing: bool,
    loads: usize,
}

#[derive(Debug, Default)]
struct FakePlayerState {
    decks: [FakeDeck; 2],
    fail_next_load: Option<String>,
    fail_next_start: Option<String>,
    buffer_next_start: bool,
}

/// In-memory transport whose playheads only move when the test says so.
#[derive(Clone, Default)]
pub(crate) struct FakePlayer {
    state: Arc<Mutex<FakePlayerState>>,
}

impl FakePlayer {
    fn lock(&self) -> MutexGuard<'_, FakePlayerState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn position(&self, deck: DeckId) -> Option<f64> {
        let state = self.lock();
        let deck = &state.decks[deck.index()];
        deck.track_id.as_ref().map(|_| deck.position)
    }

    pub(crate) fn set_position(&self, deck: DeckId, position: f64) {
        self.lock().decks[deck.index()].position = position;
    }

    pub(crate) fn is_playing(&self, deck: DeckId) -> bool {
        self.lock().decks[deck.index()].playing
    }

    pub(crate) fn load_count(&self, deck: DeckId) -> usize {
        self.lock().decks[deck.index()].loads
    }

    /// Moves every playing deck forward.
    pub(crate) fn advance_playing(&self, seconds: f64) {
        for deck in self.lock().decks.iter_mut().filter(|deck| deck.playing) {
            deck.position += seconds;
        }
    }

    pub(crate) fn fail_next_load(&self, reason: &str) {
        self.lock().fail_next_load = Some(reason.to_string());
    }

    pub(crate) fn fail_next_start(&self, reason: &str) {
        self.lock().fail_next_start = Some(reason.to_string());
    }

    pub(crate) fn buffer_next_start(&self) {
        self.lock().buffer_next_start = true;
    }

    pub(crate) fn finish_buffering(&self, deck: DeckId) {
        self.lock().decks[deck.index()].playing = true;
    }
}

impl DeckPlayer for FakePlayer {
    fn load(&mut self, deck: DeckId, track: &Track) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_next_load.take() {
            return Err(PlaybackError::LoadFailed {
                deck,
                track_id: track.id.clone(),
                reason,
            });
        }
        let fake = &mut state.decks[deck.index()];
        fake.track_id = Some(track.id.clone());
        fake.position = 0.0;
        fake.playing = false;
        fake.loads += 1;
        Ok(())
    }

    fn start(&mut self, deck: DeckId, offset_seconds: f64) -> Result<StartStatus, PlaybackError> {
        let mut state = self.lock();
        let track_id = state.decks[deck.index()].track_id.clone();
        let Some(track_id) = track_id else {
            return Err(PlaybackError::TrackNotLoaded { deck });
        };
        if let Some(reason) = state.fail_next_start.take() {
            return Err(PlaybackError::StartFailed {
                deck,
                track_id,
                reason,
            });
        }
        let buffering = std::mem::take(&mut state.buffer_next_start);
        let fake = &mut state.decks[deck.index()];
        fake.position = offset_seconds;
        fake.playing = !buffering;
        Ok(if buffering {
            StartStatus::Buffering
        } else {
            StartStatus::Playing
        })
    }

    fn pause(&mut self, deck: DeckId) {
        self.lock().decks[deck.index()].playing = false;
    }

    fn stop(&mut self, deck: DeckId) {
        let mut state = self.lock();
        let fake = &mut state.decks[deck.index()];
        fake.playing = false;
        fake.track_id = None;
        fake.position = 0.0;
    }

    fn seek(&mut self, deck: DeckId, position_seconds: f64) -> Result<(), PlaybackError> {
        let mut state = self.lock();
        let fake = &mut state.decks[deck.index()];
        if fake.track_id.is_none() {
            return Err(PlaybackError::TrackNotLoaded { deck });
        }
        fake.position = position_seconds;
        Ok(())
    }

    fn playhead(&self, deck: DeckId) -> Option<f64> {
        self.position(deck)
    }
}

/// Event sink that keeps everything it receives.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    pub(crate) fn errors(&self) -> Vec<ErrorKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Error(payload) => Some(payload.kind),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: EngineEvent) -> Result<(), PlaybackError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

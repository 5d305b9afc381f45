use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::events::{
    ErrorKind, EventSink, TransitionProgressEventPayload, TransitionStateEventPayload,
    emit_error_event, emit_load_update_event, emit_status_update_event,
    emit_track_advanced_event, emit_transition_progress_event, emit_transition_state_event,
    report_rejection,
};
use super::player::{DeckPlayer, StartStatus};
use super::state::DeckState;
use crate::audio::config::AutoMixConfig;
use crate::audio::crossfade;
use crate::audio::errors::PlaybackError;
use crate::audio::graph::AudioSignalGraph;
use crate::audio::planner::{
    MixingIntensity, RequestedStyle, TransitionPlan, TransitionPlanner,
};
use crate::audio::track::Track;
use crate::audio::types::DeckId;

/// Sequence number of a manual control gesture, taken when the gesture is issued.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ControlStamp(pub u64);

// --- Queue ---

/// Ordered tracks still to be mixed in. The cursor points at the next one.
#[derive(Debug, Clone, Default)]
pub struct PlayQueue {
    tracks: Vec<Track>,
    cursor: usize,
}

impl PlayQueue {
    pub fn new(tracks: Vec<Track>) -> Self {
        PlayQueue { tracks, cursor: 0 }
    }

    pub fn upcoming(&self) -> Option<&Track> {
        self.tracks.get(self.cursor)
    }

    /// Moves past the upcoming track. Returns false when the queue was exhausted.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.tracks.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    /// Number of tracks already moved past.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.tracks.len() - self.cursor
    }
}

// --- Session Types ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub mixing_intensity: MixingIntensity,
    pub transition_style: RequestedStyle,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransitionPhase {
    Idle,
    /// Incoming deck loaded and started but still buffering.
    Armed,
    InProgress,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HandOffReason {
    Completed,
    /// Skipped or stopped before the fade finished.
    Cancelled,
    /// Incoming deck failed to load or start; the outgoing deck kept playing.
    Aborted,
}

struct TransitionSession {
    outgoing: DeckId,
    incoming: DeckId,
    track_id: String,
    plan: TransitionPlan,
    started_at: Option<Duration>,
    last_step: Option<u32>,
    cancel_requested: bool,
    saved_crossfader: f32,
}

struct CachedPlan {
    current_id: String,
    next_id: String,
    plan: TransitionPlan,
}

impl CachedPlan {
    fn matches(&self, current_id: &str, next_id: &str) -> bool {
        self.current_id == current_id && self.next_id == next_id
    }
}

/// Everything the scheduler may touch during one call, borrowed from the engine.
pub struct MixContext<'a> {
    pub graph: &'a mut AudioSignalGraph,
    pub player: &'a mut dyn DeckPlayer,
    pub decks: &'a mut [DeckState; 2],
    pub events: &'a dyn EventSink,
    pub now: Duration,
    /// Latest control stamp issued when this context was built.
    pub control_floor: u64,
}

// --- Scheduler ---

/// Drives autonomous transitions between the current deck and the other one.
///
/// At most one transition session exists. While it does, the scheduler owns the
/// crossfader and both decks; manual crossfader moves stamped before the session
/// began are dropped even after it ends.
pub struct AutoMixScheduler {
    planner: TransitionPlanner,
    session_config: SessionConfig,
    queue: PlayQueue,
    enabled: bool,
    current_deck: DeckId,
    session: Option<TransitionSession>,
    cached_plan: Option<CachedPlan>,
    failed_pair: Option<(String, String)>,
    manual_floor: u64,
}

impl AutoMixScheduler {
    pub fn new(config: AutoMixConfig) -> Self {
        AutoMixScheduler {
            planner: TransitionPlanner::new(config),
            session_config: SessionConfig::default(),
            queue: PlayQueue::default(),
            enabled: false,
            current_deck: DeckId::A,
            session: None,
            cached_plan: None,
            failed_pair: None,
            manual_floor: 0,
        }
    }

    // --- Accessors ---

    pub fn phase(&self) -> TransitionPhase {
        match &self.session {
            None => TransitionPhase::Idle,
            Some(session) if session.started_at.is_some() => TransitionPhase::InProgress,
            Some(_) => TransitionPhase::Armed,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn current_deck(&self) -> DeckId {
        self.current_deck
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn session_config(&self) -> SessionConfig {
        self.session_config
    }

    pub fn planner(&self) -> &TransitionPlanner {
        &self.planner
    }

    /// Plan of the running or armed transition.
    pub fn active_plan(&self) -> Option<&TransitionPlan> {
        self.session.as_ref().map(|session| &session.plan)
    }

    /// True when a pending transition is waiting for `deck` to finish buffering.
    pub fn awaits_media(&self, deck: DeckId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.incoming == deck && session.started_at.is_none())
    }

    pub fn accepts_manual_crossfader(&self, stamp: ControlStamp) -> bool {
        self.session.is_none() && stamp.0 > self.manual_floor
    }

    // --- Configuration ---

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!("AutoMix: {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn set_session_config(&mut self, config: SessionConfig) {
        log::info!("AutoMix: Session config {:?}", config);
        self.session_config = config;
        self.invalidate_plan();
    }

    /// Makes `deck` the one transitions start from. Ignored while a session is active.
    pub fn set_current_deck(&mut self, deck: DeckId) {
        if self.session.is_none() && self.current_deck != deck {
            log::debug!("AutoMix: Current deck is now '{}'", deck);
            self.current_deck = deck;
            self.invalidate_plan();
        }
    }

    pub fn enqueue(&mut self, tracks: Vec<Track>) {
        log::info!("AutoMix: Queued {} track(s)", tracks.len());
        self.queue.extend(tracks);
    }

    pub fn replace_queue(&mut self, tracks: Vec<Track>) {
        log::info!("AutoMix: Queue replaced with {} track(s)", tracks.len());
        self.queue = PlayQueue::new(tracks);
        self.invalidate_plan();
    }

    pub fn invalidate_plan(&mut self) {
        self.cached_plan = None;
    }

    // --- Driving ---

    /// Loads the first queued track on the current deck if nothing is playing there,
    /// then enables automatic transitions.
    pub fn start(&mut self, ctx: &mut MixContext<'_>, tracks: Vec<Track>) -> Result<(), PlaybackError> {
        self.reject_if_active(ctx.events)?;
        self.replace_queue(tracks);

        let deck = self.current_deck;
        if !ctx.decks[deck.index()].is_playing {
            let Some(first) = self.queue.upcoming().cloned() else {
                return Err(report_rejection(ctx.events, None, PlaybackError::QueueEmpty));
            };
            if let Err(e) = ctx.player.load(deck, &first) {
                emit_error_event(ctx.events, Some(deck), ErrorKind::Device, &e.to_string());
                return Err(e);
            }
            let deck_state = &mut ctx.decks[deck.index()];
            deck_state.reset_media();
            deck_state.loaded_track = Some(first);
            if let Some(track) = &deck_state.loaded_track {
                emit_load_update_event(ctx.events, deck, track);
            }
            ctx.graph.set_crossfader(deck.crossfader_side());

            match ctx.player.start(deck, 0.0) {
                Ok(StartStatus::Playing) => {
                    ctx.decks[deck.index()].is_playing = true;
                    emit_status_update_event(ctx.events, deck, true);
                }
                Ok(StartStatus::Buffering) => {
                    log::info!("AutoMix: Deck '{}' buffering first track", deck);
                }
                Err(e) => {
                    ctx.decks[deck.index()].reset_media();
                    emit_error_event(ctx.events, Some(deck), ErrorKind::Device, &e.to_string());
                    return Err(e);
                }
            }
            self.queue.advance();
            if let Some(track_id) = ctx.decks[deck.index()].track_id() {
                emit_track_advanced_event(ctx.events, deck, track_id, self.queue.position());
            }
        }

        self.set_enabled(true);
        Ok(())
    }

    /// Called once per engine tick, after playheads were refreshed.
    pub fn on_tick(&mut self, ctx: &mut MixContext<'_>) -> Result<(), PlaybackError> {
        match self.phase() {
            TransitionPhase::Idle => self.check_trigger(ctx),
            TransitionPhase::Armed => self.check_outgoing_alive(ctx),
            TransitionPhase::InProgress => {
                self.advance_transition(ctx);
                Ok(())
            }
        }
    }

    /// Starts a transition to the next queued track right away ("mix now").
    pub fn trigger(&mut self, ctx: &mut MixContext<'_>) -> Result<(), PlaybackError> {
        self.reject_if_active(ctx.events)?;
        let Some(next) = self.queue.upcoming() else {
            return Err(report_rejection(ctx.events, None, PlaybackError::QueueEmpty));
        };
        let deck = self.current_deck;
        let Some(current) = ctx.decks[deck.index()].loaded_track.as_ref() else {
            return Err(report_rejection(
                ctx.events,
                Some(deck),
                PlaybackError::TrackNotLoaded { deck },
            ));
        };
        let plan = plan_for_pair(
            &mut self.cached_plan,
            &self.planner,
            self.session_config,
            current,
            next,
        );
        let next = next.clone();
        log::info!("AutoMix: Manual trigger to '{}'", next.id);
        self.arm(ctx, next, plan)
    }

    /// Cancels the active transition, or cuts straight to the next track when idle.
    pub fn skip(&mut self, ctx: &mut MixContext<'_>) -> Result<(), PlaybackError> {
        match self.phase() {
            TransitionPhase::InProgress => {
                self.hand_off(ctx, HandOffReason::Cancelled);
                Ok(())
            }
            TransitionPhase::Armed => {
                if let Some(session) = self.session.as_mut() {
                    log::info!(
                        "AutoMix: Skip while '{}' is buffering; handing off once ready",
                        session.track_id
                    );
                    session.cancel_requested = true;
                }
                Ok(())
            }
            TransitionPhase::Idle => {
                let Some(next) = self.queue.upcoming().cloned() else {
                    return Err(report_rejection(ctx.events, None, PlaybackError::QueueEmpty));
                };
                let current = ctx.decks[self.current_deck.index()].loaded_track.as_ref();
                let plan = self.planner.cut_plan(current, &next);
                log::info!("AutoMix: Hard cut to '{}'", next.id);
                self.arm(ctx, next, plan)?;
                match self.session.as_mut() {
                    Some(session) if session.started_at.is_none() => {
                        // Outgoing keeps playing until the incoming deck is audible
                        session.cancel_requested = true;
                    }
                    _ => self.hand_off(ctx, HandOffReason::Cancelled),
                }
                Ok(())
            }
        }
    }

    /// Cancels any active transition like `skip`, then turns auto-mix off.
    pub fn stop(&mut self, ctx: &mut MixContext<'_>) -> Result<(), PlaybackError> {
        if self.session.is_some() {
            self.skip(ctx)?;
        }
        self.set_enabled(false);
        Ok(())
    }

    /// Completion of a `Buffering` start on `deck`.
    pub fn on_media_ready(
        &mut self,
        ctx: &mut MixContext<'_>,
        deck: DeckId,
        result: Result<(), String>,
    ) -> Result<(), PlaybackError> {
        if !self.awaits_media(deck) {
            log::debug!("AutoMix: Ignoring media-ready for deck '{}'", deck);
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        match result {
            Ok(()) => {
                session.started_at = Some(ctx.now);
                let cancel_requested = session.cancel_requested;
                ctx.decks[deck.index()].is_playing = true;
                emit_status_update_event(ctx.events, deck, true);
                log::info!("AutoMix: Deck '{}' ready, transition running", deck);
                self.emit_state(ctx.events, None);
                if cancel_requested {
                    self.hand_off(ctx, HandOffReason::Cancelled);
                }
                Ok(())
            }
            Err(reason) => {
                let track_id = session.track_id.clone();
                let saved_crossfader = session.saved_crossfader;
                let error = PlaybackError::StartFailed {
                    deck,
                    track_id: track_id.clone(),
                    reason,
                };
                Err(self.abort(ctx, deck, &track_id, saved_crossfader, error))
            }
        }
    }

    // --- Internals ---

    fn reject_if_active(&self, events: &dyn EventSink) -> Result<(), PlaybackError> {
        match self.phase() {
            TransitionPhase::Idle => Ok(()),
            phase => Err(report_rejection(
                events,
                None,
                PlaybackError::TransitionInProgress { phase },
            )),
        }
    }

    fn is_failed_pair(&self, current_id: &str, next_id: &str) -> bool {
        self.failed_pair
            .as_ref()
            .is_some_and(|(current, next)| current == current_id && next == next_id)
    }

    fn check_trigger(&mut self, ctx: &mut MixContext<'_>) -> Result<(), PlaybackError> {
        if !self.enabled {
            return Ok(());
        }
        let deck = &ctx.decks[self.current_deck.index()];
        if !deck.is_playing {
            return Ok(());
        }
        let (Some(current), Some(next)) = (deck.loaded_track.as_ref(), self.queue.upcoming()) else {
            return Ok(());
        };
        if self.is_failed_pair(&current.id, &next.id) {
            return Ok(());
        }

        let plan = plan_for_pair(
            &mut self.cached_plan,
            &self.planner,
            self.session_config,
            current,
            next,
        );
        let Some(trigger_seconds) = plan.trigger_seconds else {
            return Ok(());
        };
        if deck.playhead_seconds < trigger_seconds {
            return Ok(());
        }

        log::info!(
            "AutoMix: Trigger reached on '{}' at {:.2}s (trigger {:.2}s), mixing into '{}'",
            current.id,
            deck.playhead_seconds,
            trigger_seconds,
            next.id
        );
        let next = next.clone();
        self.arm(ctx, next, plan)
    }

    /// Drops an armed transition whose outgoing deck stopped before the incoming one was ready.
    fn check_outgoing_alive(&mut self, ctx: &mut MixContext<'_>) -> Result<(), PlaybackError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        if ctx.decks[session.outgoing.index()].is_playing {
            return Ok(());
        }
        let (outgoing, incoming) = (session.outgoing, session.incoming);
        let track_id = session.track_id.clone();
        let saved_crossfader = session.saved_crossfader;
        let error = PlaybackError::OutgoingStopped {
            deck: outgoing,
            track_id: track_id.clone(),
        };
        Err(self.abort(ctx, incoming, &track_id, saved_crossfader, error))
    }

    fn arm(&mut self, ctx: &mut MixContext<'_>, incoming_track: Track, plan: TransitionPlan) -> Result<(), PlaybackError> {
        self.reject_if_active(ctx.events)?;

        let outgoing = self.current_deck;
        let incoming = outgoing.other();
        let saved_crossfader = ctx.graph.bus().crossfader_position;
        let track_id = incoming_track.id.clone();
        self.manual_floor = self.manual_floor.max(ctx.control_floor);

        if ctx.decks[incoming.index()].loaded_track.is_some() {
            ctx.player.stop(incoming);
        }
        if let Err(e) = ctx.player.load(incoming, &incoming_track) {
            return Err(self.abort(ctx, incoming, &track_id, saved_crossfader, e));
        }
        let deck_state = &mut ctx.decks[incoming.index()];
        deck_state.reset_media();
        deck_state.loaded_track = Some(incoming_track);
        deck_state.playhead_seconds = plan.entry_point_seconds;
        if let Some(track) = &deck_state.loaded_track {
            emit_load_update_event(ctx.events, incoming, track);
        }

        // Incoming stays silent until the first step
        ctx.graph
            .apply_transition_gains(outgoing, crossfade::curve(0.0, plan.curve_style), 0.0);

        let started_at = match ctx.player.start(incoming, plan.entry_point_seconds) {
            Ok(StartStatus::Playing) => {
                ctx.decks[incoming.index()].is_playing = true;
                emit_status_update_event(ctx.events, incoming, true);
                Some(ctx.now)
            }
            Ok(StartStatus::Buffering) => {
                log::info!("AutoMix: Deck '{}' buffering '{}'", incoming, track_id);
                None
            }
            Err(e) => {
                let error = PlaybackError::StartFailed {
                    deck: incoming,
                    track_id: track_id.clone(),
                    reason: e.to_string(),
                };
                return Err(self.abort(ctx, incoming, &track_id, saved_crossfader, error));
            }
        };

        log::info!(
            "AutoMix: Armed {:?} '{}' on deck '{}' ({:.1}s, entry {:.1}s)",
            plan.style,
            track_id,
            incoming,
            plan.duration_seconds,
            plan.entry_point_seconds
        );
        self.session = Some(TransitionSession {
            outgoing,
            incoming,
            track_id,
            plan,
            started_at,
            last_step: None,
            cancel_requested: false,
            saved_crossfader,
        });
        self.emit_state(ctx.events, None);
        Ok(())
    }

    fn advance_transition(&mut self, ctx: &mut MixContext<'_>) {
        let steps = self.planner.config().curve_steps;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(started_at) = session.started_at else {
            return;
        };

        let elapsed = ctx.now.saturating_sub(started_at).as_secs_f64();
        let (step, progress) =
            crossfade::quantize_progress(elapsed, session.plan.duration_seconds, steps);
        if session.last_step != Some(step) {
            session.last_step = Some(step);
            let gains = crossfade::curve(progress, session.plan.curve_style);
            ctx.graph
                .apply_transition_gains(session.outgoing, gains, progress);
            emit_transition_progress_event(
                ctx.events,
                TransitionProgressEventPayload {
                    progress,
                    crossfader_position: ctx.graph.bus().crossfader_position,
                    fade_out: gains.fade_out,
                    fade_in: gains.fade_in,
                },
            );
        }

        if progress >= 1.0 {
            self.hand_off(ctx, HandOffReason::Completed);
        }
    }

    /// Ends the session: the incoming deck becomes current and the outgoing one is cleared.
    fn hand_off(&mut self, ctx: &mut MixContext<'_>, reason: HandOffReason) {
        let Some(session) = self.session.take() else {
            return;
        };
        let (outgoing, incoming) = (session.outgoing, session.incoming);

        ctx.player.stop(outgoing);
        ctx.decks[outgoing.index()].reset_media();
        emit_status_update_event(ctx.events, outgoing, false);

        self.current_deck = incoming;
        self.queue.advance();
        ctx.graph.clear_transition_gains();
        ctx.graph.set_crossfader(incoming.crossfader_side());
        self.manual_floor = self.manual_floor.max(ctx.control_floor);
        self.cached_plan = None;
        self.failed_pair = None;

        log::info!(
            "AutoMix: Hand-off to deck '{}' ('{}'), {:?}",
            incoming,
            session.track_id,
            reason
        );
        emit_transition_state_event(
            ctx.events,
            TransitionStateEventPayload {
                phase: TransitionPhase::Idle,
                outgoing: Some(outgoing),
                incoming: Some(incoming),
                plan: Some(session.plan),
                reason: Some(reason),
            },
        );
        emit_track_advanced_event(ctx.events, incoming, &session.track_id, self.queue.position());
    }

    /// Undoes an arm that failed on the incoming deck. The outgoing deck is left untouched.
    fn abort(
        &mut self,
        ctx: &mut MixContext<'_>,
        incoming: DeckId,
        track_id: &str,
        saved_crossfader: f32,
        error: PlaybackError,
    ) -> PlaybackError {
        ctx.player.stop(incoming);
        ctx.decks[incoming.index()].reset_media();
        ctx.graph.clear_transition_gains();
        ctx.graph.set_crossfader(saved_crossfader);
        self.session = None;

        let current_id = ctx.decks[self.current_deck.index()]
            .track_id()
            .unwrap_or_default()
            .to_string();
        self.failed_pair = Some((current_id, track_id.to_string()));

        log::error!("AutoMix: Transition to '{}' aborted: {}", track_id, error);
        emit_error_event(ctx.events, Some(incoming), ErrorKind::Device, &error.to_string());
        emit_status_update_event(ctx.events, incoming, false);
        emit_transition_state_event(
            ctx.events,
            TransitionStateEventPayload {
                phase: TransitionPhase::Idle,
                outgoing: Some(self.current_deck),
                incoming: Some(incoming),
                plan: None,
                reason: Some(HandOffReason::Aborted),
            },
        );
        error
    }

    fn emit_state(&self, events: &dyn EventSink, reason: Option<HandOffReason>) {
        emit_transition_state_event(
            events,
            TransitionStateEventPayload {
                phase: self.phase(),
                outgoing: self.session.as_ref().map(|s| s.outgoing),
                incoming: self.session.as_ref().map(|s| s.incoming),
                plan: self.active_plan().copied(),
                reason,
            },
        );
    }
}

fn plan_for_pair(
    cache: &mut Option<CachedPlan>,
    planner: &TransitionPlanner,
    config: SessionConfig,
    current: &Track,
    next: &Track,
) -> TransitionPlan {
    if let Some(cached) = cache.as_ref().filter(|c| c.matches(&current.id, &next.id)) {
        return cached.plan;
    }
    let plan = planner.plan(current, next, config.transition_style, config.mixing_intensity);
    *cache = Some(CachedPlan {
        current_id: current.id.clone(),
        next_id: next.id.clone(),
        plan,
    });
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::planner::TransitionStyle;
    use crate::audio::playback::events::EngineEvent;
    use crate::audio::playback::testing::{FakePlayer, RecordingSink};
    use crate::audio::track::{Section, SectionKind};

    fn track(id: &str) -> Track {
        Track::new(id, id.to_uppercase(), "Artist")
            .with_bpm(124.0)
            .with_camelot_key("8A")
            .with_energy(6)
            .with_genre("House", Some("Deep House"))
            .with_duration(180.0)
            .with_sections([
                (SectionKind::Intro, Section::new(0.0, 16.0).unwrap()),
                (SectionKind::Verse, Section::new(16.0, 64.0).unwrap()),
            ])
    }

    struct Harness {
        scheduler: AutoMixScheduler,
        graph: AudioSignalGraph,
        player: FakePlayer,
        decks: [DeckState; 2],
        sink: RecordingSink,
        now: Duration,
        control_floor: u64,
    }

    impl Harness {
        /// Deck A playing "a" from the top, "b" and "c" queued, auto-mix on.
        fn playing() -> Self {
            let mut harness = Harness {
                scheduler: AutoMixScheduler::new(AutoMixConfig::default()),
                graph: AudioSignalGraph::new(),
                player: FakePlayer::default(),
                decks: Default::default(),
                sink: RecordingSink::default(),
                now: Duration::ZERO,
                control_floor: 0,
            };
            harness
                .with_ctx(|scheduler, ctx| scheduler.start(ctx, vec![track("a"), track("b"), track("c")]))
                .unwrap();
            harness.sink.clear();
            harness
        }

        fn with_ctx<R>(&mut self, f: impl FnOnce(&mut AutoMixScheduler, &mut MixContext<'_>) -> R) -> R {
            let mut ctx = MixContext {
                graph: &mut self.graph,
                player: &mut self.player,
                decks: &mut self.decks,
                events: &self.sink,
                now: self.now,
                control_floor: self.control_floor,
            };
            f(&mut self.scheduler, &mut ctx)
        }

        /// Refreshes playheads from the player the way the engine tick does, then ticks.
        fn tick(&mut self) -> Result<(), PlaybackError> {
            for deck in DeckId::ALL {
                if self.decks[deck.index()].is_playing {
                    if let Some(position) = self.player.position(deck) {
                        self.decks[deck.index()].playhead_seconds = position;
                    }
                }
            }
            self.with_ctx(|scheduler, ctx| scheduler.on_tick(ctx))
        }

        fn play_for(&mut self, seconds: f64) {
            self.now += Duration::from_secs_f64(seconds);
            self.player.advance_playing(seconds);
        }

        fn seek_current(&mut self, position: f64) {
            let deck = self.scheduler.current_deck();
            self.player.set_position(deck, position);
        }
    }

    #[test]
    fn test_start_loads_first_track_on_current_deck() {
        let harness = Harness::playing();
        assert_eq!(harness.decks[0].track_id(), Some("a"));
        assert!(harness.decks[0].is_playing);
        assert!(harness.scheduler.is_enabled());
        assert_eq!(harness.scheduler.queue().upcoming().map(|t| t.id.as_str()), Some("b"));
        assert_eq!(harness.graph.bus().crossfader_position, 0.0);
    }

    #[test]
    fn test_full_transition_flow() {
        let mut h = Harness::playing();

        // 180s track, 24s blend: trigger at 156s
        h.seek_current(150.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);

        h.seek_current(156.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::InProgress);
        let plan = *h.scheduler.active_plan().unwrap();
        assert_eq!(plan.style, TransitionStyle::HarmonicBlend);
        assert_eq!(plan.duration_seconds, 24.0);
        assert_eq!(h.decks[1].track_id(), Some("b"));
        assert!(h.decks[1].is_playing);
        // Incoming starts at its first post-intro section, silent
        assert_eq!(h.player.position(DeckId::B), Some(16.0));
        assert_eq!(h.graph.fade_factor(DeckId::B), 0.0);
        assert_eq!(h.graph.fade_factor(DeckId::A), 1.0);

        h.play_for(12.0);
        h.tick().unwrap();
        assert!((h.graph.fade_factor(DeckId::A) - 0.7071).abs() < 1e-3);
        assert!((h.graph.fade_factor(DeckId::B) - 0.7071).abs() < 1e-3);
        assert_eq!(h.graph.bus().crossfader_position, 50.0);

        h.play_for(12.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
        assert_eq!(h.scheduler.queue().position(), 2);
        assert_eq!(h.scheduler.queue().upcoming().map(|t| t.id.as_str()), Some("c"));
        assert!(h.decks[0].loaded_track.is_none());
        assert!(!h.player.is_playing(DeckId::A));
        assert!(!h.graph.has_transition_override());
        assert_eq!(h.graph.bus().crossfader_position, 100.0);

        let advanced: Vec<_> = h
            .sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::TrackAdvanced(payload) => Some(payload.track_id),
                _ => None,
            })
            .collect();
        assert_eq!(advanced, vec!["b".to_string()]);
    }

    #[test]
    fn test_progress_is_written_once_per_step() {
        let mut h = Harness::playing();
        h.seek_current(156.0);
        h.tick().unwrap();

        // 24s over 60 steps: 0.4s per step, so ticks at 0.25s land on steps 0, 1, 1, 2
        for _ in 0..4 {
            h.play_for(0.25);
            h.tick().unwrap();
        }
        assert_eq!(h.sink.count("automix://transition-progress"), 3);
    }

    #[test]
    fn test_skip_mid_transition_hands_off_once() {
        let mut h = Harness::playing();
        h.seek_current(156.0);
        h.tick().unwrap();
        h.play_for(5.0);
        h.tick().unwrap();
        let incoming_position = h.player.position(DeckId::B);

        h.with_ctx(|scheduler, ctx| scheduler.skip(ctx)).unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
        assert!(h.player.is_playing(DeckId::B));
        assert_eq!(h.player.position(DeckId::B), incoming_position);
        assert_eq!(h.scheduler.queue().position(), 2);

        h.play_for(30.0);
        h.tick().unwrap();
        h.tick().unwrap();
        assert_eq!(h.scheduler.queue().position(), 2);
        assert_eq!(h.sink.count("automix://track-advanced"), 1);
    }

    #[test]
    fn test_second_trigger_is_rejected() {
        let mut h = Harness::playing();
        h.seek_current(156.0);
        h.tick().unwrap();
        let plan = *h.scheduler.active_plan().unwrap();

        let result = h.with_ctx(|scheduler, ctx| scheduler.trigger(ctx));
        assert!(matches!(
            result,
            Err(PlaybackError::TransitionInProgress {
                phase: TransitionPhase::InProgress
            })
        ));
        assert_eq!(h.scheduler.phase(), TransitionPhase::InProgress);
        assert_eq!(*h.scheduler.active_plan().unwrap(), plan);
        assert_eq!(h.sink.errors(), vec![ErrorKind::Invariant]);
    }

    #[test]
    fn test_start_failure_restores_and_suppresses_retrigger() {
        let mut h = Harness::playing();
        h.player.fail_next_start("device lost");

        h.seek_current(156.0);
        let result = h.tick();
        assert!(matches!(result, Err(PlaybackError::StartFailed { deck: DeckId::B, .. })));
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::A);
        assert!(h.player.is_playing(DeckId::A));
        assert!(h.decks[1].loaded_track.is_none());
        assert!(!h.graph.has_transition_override());
        assert_eq!(h.graph.bus().crossfader_position, 0.0);
        assert_eq!(h.sink.errors(), vec![ErrorKind::Device]);

        // Same pair does not re-trigger on later ticks
        h.play_for(1.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.player.load_count(DeckId::B), 1);

        // A different next track does
        h.scheduler.replace_queue(vec![track("c")]);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::InProgress);
        assert_eq!(h.decks[1].track_id(), Some("c"));
    }

    #[test]
    fn test_load_failure_aborts() {
        let mut h = Harness::playing();
        h.player.fail_next_load("file missing");
        let result = h.with_ctx(|scheduler, ctx| scheduler.trigger(ctx));
        assert!(matches!(result, Err(PlaybackError::LoadFailed { .. })));
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert!(h.player.is_playing(DeckId::A));
    }

    #[test]
    fn test_buffering_start_waits_for_media() {
        let mut h = Harness::playing();
        h.player.buffer_next_start();
        h.seek_current(156.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Armed);
        assert!(h.scheduler.awaits_media(DeckId::B));

        // Time passing while armed does not move the fade
        h.play_for(10.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Armed);
        assert_eq!(h.graph.fade_factor(DeckId::B), 0.0);

        h.player.finish_buffering(DeckId::B);
        h.with_ctx(|scheduler, ctx| scheduler.on_media_ready(ctx, DeckId::B, Ok(())))
            .unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::InProgress);

        h.play_for(24.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
    }

    #[test]
    fn test_skip_while_armed_applies_when_ready() {
        let mut h = Harness::playing();
        h.player.buffer_next_start();
        h.with_ctx(|scheduler, ctx| scheduler.trigger(ctx)).unwrap();
        h.with_ctx(|scheduler, ctx| scheduler.skip(ctx)).unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Armed);

        h.player.finish_buffering(DeckId::B);
        h.with_ctx(|scheduler, ctx| scheduler.on_media_ready(ctx, DeckId::B, Ok(())))
            .unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
        assert_eq!(h.scheduler.queue().position(), 2);
    }

    #[test]
    fn test_media_failure_while_armed_aborts() {
        let mut h = Harness::playing();
        h.player.buffer_next_start();
        h.with_ctx(|scheduler, ctx| scheduler.trigger(ctx)).unwrap();

        let result = h.with_ctx(|scheduler, ctx| {
            scheduler.on_media_ready(ctx, DeckId::B, Err("decode error".to_string()))
        });
        assert!(matches!(result, Err(PlaybackError::StartFailed { .. })));
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::A);
        assert!(h.decks[1].loaded_track.is_none());
    }

    #[test]
    fn test_skip_when_idle_cuts_to_next() {
        let mut h = Harness::playing();
        h.seek_current(30.0);
        h.tick().unwrap();

        h.with_ctx(|scheduler, ctx| scheduler.skip(ctx)).unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
        assert!(h.player.is_playing(DeckId::B));
        assert!(!h.player.is_playing(DeckId::A));
        assert_eq!(h.graph.bus().crossfader_position, 100.0);
        assert_eq!(h.scheduler.queue().position(), 2);
    }

    #[test]
    fn test_skip_when_idle_keeps_outgoing_until_incoming_is_ready() {
        let mut h = Harness::playing();
        h.seek_current(30.0);
        h.tick().unwrap();
        h.player.buffer_next_start();

        h.with_ctx(|scheduler, ctx| scheduler.skip(ctx)).unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Armed);
        assert_eq!(h.scheduler.current_deck(), DeckId::A);
        assert!(h.player.is_playing(DeckId::A));
        assert!(h.decks[0].is_playing);
        assert_eq!(h.graph.fade_factor(DeckId::A), 1.0);
        assert_eq!(h.scheduler.queue().position(), 1);

        h.play_for(1.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Armed);

        h.player.finish_buffering(DeckId::B);
        h.with_ctx(|scheduler, ctx| scheduler.on_media_ready(ctx, DeckId::B, Ok(())))
            .unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
        assert!(h.player.is_playing(DeckId::B));
        assert!(!h.player.is_playing(DeckId::A));
        assert_eq!(h.graph.bus().crossfader_position, 100.0);
        assert_eq!(h.scheduler.queue().position(), 2);
        assert_eq!(h.sink.count("automix://track-advanced"), 1);
    }

    #[test]
    fn test_outgoing_end_while_armed_drops_transition() {
        let mut h = Harness::playing();
        h.player.buffer_next_start();
        h.seek_current(156.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Armed);
        h.sink.clear();

        // End of track as the engine tick reports it
        h.decks[0].is_playing = false;
        h.player.set_position(DeckId::A, 180.0);

        let result = h.tick();
        assert!(matches!(
            result,
            Err(PlaybackError::OutgoingStopped { deck: DeckId::A, .. })
        ));
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert_eq!(h.scheduler.current_deck(), DeckId::A);
        assert!(h.decks[1].loaded_track.is_none());
        assert!(!h.player.is_playing(DeckId::B));
        assert!(!h.graph.has_transition_override());
        assert_eq!(h.graph.bus().crossfader_position, 0.0);
        assert_eq!(h.sink.errors(), vec![ErrorKind::Device]);

        // A late media-ready for the dropped deck changes nothing
        h.with_ctx(|scheduler, ctx| scheduler.on_media_ready(ctx, DeckId::B, Ok(())))
            .unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert!(!h.decks[1].is_playing);
        assert_eq!(h.scheduler.queue().position(), 1);
    }

    #[test]
    fn test_quick_cut_is_never_silent() {
        let mut h = Harness::playing();
        // 128 against 100 bpm clashes, so the pair gets a QuickCut
        h.decks[0].loaded_track = Some(track("a").with_bpm(128.0));
        h.scheduler.replace_queue(vec![track("b").with_bpm(100.0)]);
        h.with_ctx(|scheduler, ctx| scheduler.trigger(ctx)).unwrap();
        let plan = *h.scheduler.active_plan().unwrap();
        assert_eq!(plan.style, TransitionStyle::QuickCut);
        assert!(plan.duration_seconds > 0.0);

        h.play_for(plan.duration_seconds / 2.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::InProgress);
        assert!(h.graph.effective_gain(DeckId::A) > 0.0, "outgoing silent mid cut");
        assert!(h.graph.effective_gain(DeckId::B) > 0.0, "incoming silent mid cut");

        let step = plan.duration_seconds / 16.0;
        while h.scheduler.phase() == TransitionPhase::InProgress {
            let total = h.graph.effective_gain(DeckId::A) + h.graph.effective_gain(DeckId::B);
            assert!(total > 0.0, "both decks silent during the cut");
            h.play_for(step);
            h.tick().unwrap();
        }
        assert_eq!(h.scheduler.current_deck(), DeckId::B);
    }

    #[test]
    fn test_skip_with_empty_queue_is_rejected() {
        let mut h = Harness::playing();
        h.scheduler.replace_queue(Vec::new());
        let result = h.with_ctx(|scheduler, ctx| scheduler.skip(ctx));
        assert!(matches!(result, Err(PlaybackError::QueueEmpty)));
        assert_eq!(h.scheduler.current_deck(), DeckId::A);
    }

    #[test]
    fn test_stop_cancels_and_disables() {
        let mut h = Harness::playing();
        h.seek_current(156.0);
        h.tick().unwrap();
        h.with_ctx(|scheduler, ctx| scheduler.stop(ctx)).unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert!(!h.scheduler.is_enabled());

        // Disabled: no automatic trigger even past the trigger point
        h.seek_current(170.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
    }

    #[test]
    fn test_stale_manual_crossfader_is_discarded() {
        let mut h = Harness::playing();
        assert!(h.scheduler.accepts_manual_crossfader(ControlStamp(1)));

        h.control_floor = 5;
        h.seek_current(156.0);
        h.tick().unwrap();
        assert!(!h.scheduler.accepts_manual_crossfader(ControlStamp(6)));

        h.play_for(24.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
        assert!(!h.scheduler.accepts_manual_crossfader(ControlStamp(4)));
        assert!(!h.scheduler.accepts_manual_crossfader(ControlStamp(5)));
        assert!(h.scheduler.accepts_manual_crossfader(ControlStamp(6)));
    }

    #[test]
    fn test_session_config_change_replans() {
        let mut h = Harness::playing();
        h.seek_current(100.0);
        h.tick().unwrap();

        h.scheduler.set_session_config(SessionConfig {
            mixing_intensity: MixingIntensity::Balanced,
            transition_style: RequestedStyle::Fixed(TransitionStyle::QuickCut),
        });
        // QuickCut over 8s: trigger moves to 172s
        h.seek_current(160.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);

        h.seek_current(172.0);
        h.tick().unwrap();
        let plan = h.scheduler.active_plan().unwrap();
        assert_eq!(plan.style, TransitionStyle::QuickCut);
        assert_eq!(plan.duration_seconds, 8.0);
    }

    #[test]
    fn test_no_trigger_without_queue_or_when_disabled() {
        let mut h = Harness::playing();
        h.scheduler.set_enabled(false);
        h.seek_current(170.0);
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);

        h.scheduler.set_enabled(true);
        h.scheduler.replace_queue(Vec::new());
        h.tick().unwrap();
        assert_eq!(h.scheduler.phase(), TransitionPhase::Idle);
    }
}

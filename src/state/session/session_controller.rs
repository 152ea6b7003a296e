use tracing::{debug, error, info, warn};

use super::completion::{CompletionLatch, expected_end_ms, grace_deadline_ms};
use super::error::{BEATMAP_RECORD, PLAYBACK_CLOCK, SessionError};
use super::events::{EngineEvent, JudgmentEvent, SessionEvent};
use super::stall::StallMonitor;
use crate::config::{LatencyOffset, PlayerConfig, UnresolvedPolicy};
use crate::model::note::Lane;
use crate::model::{Beatmap, NoteTimeline, load_beatmap};
use crate::play::judge::{JudgeWindow, JudgmentEngine, Resolution, Tier};
use crate::play::score::{ScoreKeeper, ScoreState};
use crate::play::session_result::{FinishReason, SessionResult, is_new_record};
use crate::traits::{PlaybackClock, ScoreStore, SessionLoader, SystemTimeProvider, TimeProvider};

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Playing,
    /// Terminal.
    Finished,
    /// Terminal.
    Error,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// Per-session tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub latency: LatencyOffset,
    pub unresolved_policy: UnresolvedPolicy,
    pub window: JudgeWindow,
}

impl SessionOptions {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            latency: config.latency_offset_ms,
            unresolved_policy: config.unresolved_policy,
            window: JudgeWindow::STANDARD,
        }
    }
}

/// Everything acquired by a successful load.
struct LoadedSession<C> {
    beatmap: Beatmap,
    timeline: NoteTimeline,
    clock: C,
    expected_end_ms: f64,
}

/// Drives one play of one beatmap.
///
/// Owns the timeline and score for the lifetime of the session. Inbound
/// events are handled one at a time through [`handle`](Self::handle); each
/// call returns the outbound events it produced. The finish sequence runs at
/// most once, guarded by a [`CompletionLatch`]; after it every event is
/// ignored.
pub struct SessionController<C, S, T = SystemTimeProvider> {
    state: SessionState,
    options: SessionOptions,
    engine: JudgmentEngine,
    store: S,
    time: T,
    loaded: Option<LoadedSession<C>>,
    score: ScoreKeeper,
    latch: CompletionLatch,
    stall: Option<StallMonitor>,
    last_position_ms: f64,
    result: Option<SessionResult>,
    error_message: Option<String>,
}

impl<C, S> SessionController<C, S, SystemTimeProvider>
where
    C: PlaybackClock,
    S: ScoreStore,
{
    pub fn with_system_time(store: S, options: SessionOptions) -> Self {
        Self::new(store, SystemTimeProvider::new(), options)
    }
}

impl<C, S, T> SessionController<C, S, T>
where
    C: PlaybackClock,
    S: ScoreStore,
    T: TimeProvider,
{
    pub fn new(store: S, time: T, options: SessionOptions) -> Self {
        Self {
            state: SessionState::Idle,
            options,
            engine: JudgmentEngine::new(options.window),
            store,
            time,
            loaded: None,
            score: ScoreKeeper::new(),
            latch: CompletionLatch::new(),
            stall: None,
            last_position_ms: 0.0,
            result: None,
            error_message: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Player-facing message once the session is in the error state.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn score(&self) -> &ScoreState {
        self.score.state()
    }

    pub fn beatmap(&self) -> Option<&Beatmap> {
        self.loaded.as_ref().map(|loaded| &loaded.beatmap)
    }

    pub fn timeline(&self) -> Option<&NoteTimeline> {
        self.loaded.as_ref().map(|loaded| &loaded.timeline)
    }

    pub fn clock(&self) -> Option<&C> {
        self.loaded.as_ref().map(|loaded| &loaded.clock)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.latch.reason()
    }

    pub fn latency(&self) -> LatencyOffset {
        self.options.latency
    }

    /// Takes effect from the next tick or tap.
    pub fn set_latency_offset(&mut self, latency: LatencyOffset) {
        self.options.latency = latency;
    }

    /// Last position reported by the playback clock.
    pub fn last_position_ms(&self) -> f64 {
        self.last_position_ms
    }

    /// Last reported position plus the current latency offset.
    pub fn effective_time_ms(&self) -> f64 {
        self.last_position_ms + self.options.latency.as_f64()
    }

    pub fn expected_end_ms(&self) -> Option<f64> {
        self.loaded.as_ref().map(|loaded| loaded.expected_end_ms)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load the beatmap and acquire the playback clock. `Idle → Ready`, or
    /// `Error` on any failure.
    pub fn load<L>(&mut self, loader: &mut L) -> Result<(), SessionError>
    where
        L: SessionLoader<Clock = C>,
    {
        self.require(SessionState::Idle, "load")?;
        self.state = SessionState::Loading;
        debug!("loading session");

        match Self::acquire(loader) {
            Ok(loaded) => {
                info!(
                    song_id = %loaded.beatmap.song_id,
                    difficulty_id = %loaded.beatmap.difficulty_id,
                    notes = loaded.timeline.len(),
                    expected_end_ms = loaded.expected_end_ms,
                    "session ready"
                );
                self.loaded = Some(loaded);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.enter_error(err.user_message(), &err);
                Err(err)
            }
        }
    }

    fn acquire<L>(loader: &mut L) -> Result<LoadedSession<C>, SessionError>
    where
        L: SessionLoader<Clock = C>,
    {
        let raw = loader
            .load_beatmap()
            .map_err(|e| SessionError::resource(BEATMAP_RECORD, e))?;
        let beatmap = load_beatmap(&raw)?;
        let clock = loader
            .acquire_clock(&beatmap)
            .map_err(|e| SessionError::resource(PLAYBACK_CLOCK, e))?;

        let timeline = NoteTimeline::from_beatmap(&beatmap);
        let expected_end_ms = expected_end_ms(
            beatmap.offset_ms,
            clock.duration_ms(),
            timeline.last_hit_time_ms(),
        );

        Ok(LoadedSession {
            beatmap,
            timeline,
            clock,
            expected_end_ms,
        })
    }

    /// Start the clock from 0 ms. `Ready → Playing`, or `Error` when the
    /// clock cannot start.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require(SessionState::Ready, "start")?;
        let Some(loaded) = self.loaded.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "start",
                state: self.state,
            });
        };

        if let Err(e) = loaded.clock.start_from_zero() {
            let err = SessionError::resource(PLAYBACK_CLOCK, e);
            self.enter_error(err.user_message(), &err);
            return Err(err);
        }

        self.last_position_ms = 0.0;
        self.stall = Some(StallMonitor::started(self.time.now_ms()));
        self.state = SessionState::Playing;
        info!("session playing");
        Ok(())
    }

    /// Abort the session with a player-facing message. Ignored once terminal.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.state.is_terminal() {
            return;
        }
        let message = message.into();
        if self.state == SessionState::Playing
            && let Some(loaded) = self.loaded.as_mut()
            && let Err(e) = loaded.clock.stop()
        {
            warn!(error = %e, "failed to stop playback clock");
        }
        error!(%message, "session failed");
        self.error_message = Some(message);
        self.state = SessionState::Error;
    }

    fn enter_error(&mut self, message: String, err: &SessionError) {
        error!(error = %err, "session failed");
        self.error_message = Some(message);
        self.state = SessionState::Error;
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    /// Process one inbound event to completion.
    ///
    /// Ticks and taps are only accepted while playing; anything else is
    /// dropped without effect.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<EngineEvent> {
        if self.state != SessionState::Playing {
            debug!(?event, state = ?self.state, "event ignored");
            return Vec::new();
        }

        let mut out = Vec::new();
        match event {
            SessionEvent::ClockTick { position_ms } => self.on_tick(position_ms, &mut out),
            SessionEvent::Tap { lane } => self.on_tap(lane, &mut out),
            SessionEvent::ClockFinished => {
                self.finalize(FinishReason::TrackFinished, false, &mut out);
            }
        }
        out
    }

    pub fn handle_all<I>(&mut self, events: I) -> Vec<EngineEvent>
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        events.into_iter().flat_map(|event| self.handle(event)).collect()
    }

    /// Per-frame check for a stalled clock.
    ///
    /// When the clock has not moved for longer than the stall threshold, the
    /// position is estimated from wall time and only the grace timeout is
    /// checked against it. Notes are never judged on an estimate.
    pub fn poll(&mut self) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        if self.state != SessionState::Playing {
            return out;
        }

        let now_ms = self.time.now_ms();
        let Some(estimate) = self.stall.as_mut().and_then(|s| s.estimate(now_ms)) else {
            return out;
        };
        if estimate.newly_stalled {
            warn!(
                last_position_ms = self.last_position_ms,
                "playback clock stalled; estimating position from wall time"
            );
        }

        let effective = estimate.position_ms + self.options.latency.as_f64();
        if self.past_grace_deadline(effective) {
            warn!(
                estimated_position_ms = estimate.position_ms,
                "grace timeout reached on an estimated position"
            );
            self.finalize(FinishReason::GraceTimeout, true, &mut out);
        }
        out
    }

    fn on_tick(&mut self, position_ms: f64, out: &mut Vec<EngineEvent>) {
        self.last_position_ms = position_ms;
        let now_ms = self.time.now_ms();
        if let Some(stall) = self.stall.as_mut() {
            stall.report(position_ms, now_ms);
        }

        let effective = self.effective_time_ms();
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        let misses = self.engine.sweep_misses(&mut loaded.timeline, effective);
        for miss in misses {
            self.record_judgment(miss, out);
        }

        self.check_completion(effective, out);
    }

    fn on_tap(&mut self, lane: Lane, out: &mut Vec<EngineEvent>) {
        // Taps carry no timestamp of their own.
        let effective = self.effective_time_ms();
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        if let Some(resolution) = self.engine.judge_tap(&mut loaded.timeline, lane, effective) {
            self.record_judgment(resolution, out);
        }

        self.check_completion(effective, out);
    }

    fn record_judgment(&mut self, resolution: Resolution, out: &mut Vec<EngineEvent>) {
        let update = self.score.apply(resolution.tier);
        debug!(
            note = %resolution.note_id,
            tier = %resolution.tier,
            delta_ms = resolution.delta_ms,
            combo = update.combo_after,
            "judged"
        );
        out.push(EngineEvent::Judgment(JudgmentEvent {
            note_id: resolution.note_id,
            lane: resolution.lane,
            tier: resolution.tier,
            delta_ms: resolution.delta_ms,
            combo_after: update.combo_after,
            score_delta: update.score_delta,
        }));
    }

    fn past_grace_deadline(&self, effective_time_ms: f64) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|loaded| effective_time_ms > grace_deadline_ms(loaded.expected_end_ms))
    }

    fn check_completion(&mut self, effective_time_ms: f64, out: &mut Vec<EngineEvent>) {
        let Some(loaded) = self.loaded.as_ref() else {
            return;
        };
        if !loaded.timeline.has_pending() {
            self.finalize(FinishReason::AllNotesResolved, false, out);
        } else if self.past_grace_deadline(effective_time_ms) {
            self.finalize(FinishReason::GraceTimeout, false, out);
        }
    }

    // =========================================================================
    // Finish sequence
    // =========================================================================

    fn finalize(&mut self, reason: FinishReason, position_estimated: bool, out: &mut Vec<EngineEvent>) {
        if !self.latch.try_fire(reason) {
            return;
        }

        if self.options.unresolved_policy == UnresolvedPolicy::ForceMiss {
            self.force_remaining_misses(out);
        }
        self.state = SessionState::Finished;

        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };
        if let Err(e) = loaded.clock.stop() {
            warn!(error = %e, "failed to stop playback clock");
        }

        let song_id = loaded.beatmap.song_id.clone();
        let difficulty_id = loaded.beatmap.difficulty_id.clone();
        let unresolved_notes = loaded.timeline.pending_count();
        let snapshot = self.score.state().clone();

        let new_record = match self.store.high_score(&song_id, &difficulty_id) {
            Ok(prior) => is_new_record(prior.map(|record| record.score), snapshot.score),
            Err(e) => {
                warn!(error = %e, "failed to read high score");
                false
            }
        };

        let result = SessionResult {
            song_id,
            difficulty_id,
            score: snapshot.score,
            max_combo: snapshot.max_combo,
            judgment_counts: snapshot.judgment_counts,
            is_new_record: new_record,
            finish_reason: reason,
            unresolved_notes,
            position_estimated,
        };
        info!(
            ?reason,
            score = result.score,
            max_combo = result.max_combo,
            unresolved_notes,
            new_record,
            "session finished"
        );
        out.push(EngineEvent::Finished(result.clone()));

        if let Err(e) =
            self.store
                .record_result(&result.song_id, &result.difficulty_id, &result.payload())
        {
            warn!(error = %e, "failed to save high score");
        }
        self.result = Some(result);
    }

    fn force_remaining_misses(&mut self, out: &mut Vec<EngineEvent>) {
        let effective = self.effective_time_ms();
        let Some(loaded) = self.loaded.as_mut() else {
            return;
        };

        let pending: Vec<_> = loaded
            .timeline
            .pending()
            .map(|note| (note.id.clone(), note.lane, note.delta_ms(effective)))
            .collect();
        let mut resolved = Vec::with_capacity(pending.len());
        for (note_id, lane, delta_ms) in pending {
            if loaded.timeline.mark_resolved(&note_id, Tier::Miss) {
                resolved.push(Resolution {
                    note_id,
                    lane,
                    tier: Tier::Miss,
                    delta_ms,
                });
            }
        }

        for resolution in resolved {
            self.record_judgment(resolution, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::database::{HighScore, MemoryScoreStore};
    use crate::play::score::JudgmentCounts;
    use crate::test_utils::builders::BeatmapBuilder;
    use crate::traits::{ManualClock, MockTimeProvider, PreparedLoader};
    use crate::util::UserError;

    type Controller = SessionController<ManualClock, MemoryScoreStore, Rc<MockTimeProvider>>;

    fn controller_with(
        builder: BeatmapBuilder,
        duration_ms: Option<f64>,
        store: MemoryScoreStore,
        options: SessionOptions,
    ) -> (Controller, Rc<MockTimeProvider>) {
        let time = Rc::new(MockTimeProvider::new());
        let mut controller = SessionController::new(store, Rc::clone(&time), options);
        let mut loader = PreparedLoader::new(builder.json(), ManualClock::new(duration_ms));
        controller.load(&mut loader).unwrap();
        controller.start().unwrap();
        (controller, time)
    }

    fn playing(builder: BeatmapBuilder) -> Controller {
        controller_with(
            builder,
            Some(10_000.0),
            MemoryScoreStore::new(),
            SessionOptions::default(),
        )
        .0
    }

    fn tick(position_ms: f64) -> SessionEvent {
        SessionEvent::ClockTick { position_ms }
    }

    fn judgments(events: &[EngineEvent]) -> Vec<&JudgmentEvent> {
        events.iter().filter_map(EngineEvent::as_judgment).collect()
    }

    fn results(events: &[EngineEvent]) -> Vec<&SessionResult> {
        events.iter().filter_map(EngineEvent::as_result).collect()
    }

    // =========================================================================
    // Lifecycle tests
    // =========================================================================

    #[test]
    fn load_and_start_transitions() {
        let time = MockTimeProvider::new();
        let mut controller: SessionController<ManualClock, _, _> =
            SessionController::new(MemoryScoreStore::new(), &time, SessionOptions::default());
        assert_eq!(controller.state(), SessionState::Idle);

        let raw = BeatmapBuilder::new().note(1000.0, 0).json();
        let mut loader = PreparedLoader::new(raw, ManualClock::new(Some(5000.0)));
        controller.load(&mut loader).unwrap();
        assert_eq!(controller.state(), SessionState::Ready);
        assert_eq!(controller.expected_end_ms(), Some(5000.0));

        controller.start().unwrap();
        assert_eq!(controller.state(), SessionState::Playing);
        assert!(controller.clock().unwrap().is_running());
    }

    #[test]
    fn missing_field_enters_error_state() {
        let mut raw = BeatmapBuilder::new().note(1000.0, 0).json();
        raw.as_object_mut().unwrap().remove("artist");

        let mut controller: SessionController<ManualClock, _, _> = SessionController::new(
            MemoryScoreStore::new(),
            MockTimeProvider::new(),
            SessionOptions::default(),
        );
        let mut loader = PreparedLoader::new(raw, ManualClock::new(None));
        let err = controller.load(&mut loader).unwrap_err();

        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(controller.state(), SessionState::Error);
        assert!(controller.error_message().unwrap().contains("artist"));
    }

    #[test]
    fn clock_start_failure_is_resource_error() {
        let mut controller: SessionController<ManualClock, _, _> = SessionController::new(
            MemoryScoreStore::new(),
            MockTimeProvider::new(),
            SessionOptions::default(),
        );
        let raw = BeatmapBuilder::new().note(1000.0, 0).json();
        let mut loader = PreparedLoader::new(raw, ManualClock::new(None).failing_start());
        controller.load(&mut loader).unwrap();

        let err = controller.start().unwrap_err();
        assert!(matches!(err, SessionError::ResourceAcquisition { .. }));
        assert_eq!(controller.state(), SessionState::Error);
    }

    #[test]
    fn beatmap_fetch_failure_reports_beatmap_message() {
        let raw = BeatmapBuilder::new().note(1000.0, 0).json();
        let mut loader = PreparedLoader::new(raw, ManualClock::new(None));
        let mut first: SessionController<ManualClock, _, _> = SessionController::new(
            MemoryScoreStore::new(),
            MockTimeProvider::new(),
            SessionOptions::default(),
        );
        first.load(&mut loader).unwrap();

        // The record was consumed by the first session.
        let mut second: SessionController<ManualClock, _, _> = SessionController::new(
            MemoryScoreStore::new(),
            MockTimeProvider::new(),
            SessionOptions::default(),
        );
        let err = second.load(&mut loader).unwrap_err();

        assert!(matches!(
            err,
            SessionError::ResourceAcquisition { resource: BEATMAP_RECORD, .. }
        ));
        assert_eq!(second.state(), SessionState::Error);
        assert_eq!(second.error_message(), Some(UserError::beatmap_unavailable()));
    }

    #[test]
    fn start_before_load_is_rejected() {
        let mut controller: SessionController<ManualClock, _, _> = SessionController::new(
            MemoryScoreStore::new(),
            MockTimeProvider::new(),
            SessionOptions::default(),
        );
        assert!(matches!(
            controller.start(),
            Err(SessionError::InvalidState { .. })
        ));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn events_before_playing_are_ignored() {
        let mut controller: SessionController<ManualClock, _, _> = SessionController::new(
            MemoryScoreStore::new(),
            MockTimeProvider::new(),
            SessionOptions::default(),
        );
        assert!(controller.handle(SessionEvent::Tap { lane: 0 }).is_empty());
        assert!(controller.handle(SessionEvent::ClockFinished).is_empty());
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn fail_stops_clock_and_is_terminal() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0));
        controller.fail("audio route lost");
        assert_eq!(controller.state(), SessionState::Error);
        assert_eq!(controller.error_message(), Some("audio route lost"));
        assert!(!controller.clock().unwrap().is_running());
        assert!(controller.handle(tick(1000.0)).is_empty());
    }

    // =========================================================================
    // Judgment tests
    // =========================================================================

    #[test]
    fn single_note_perfect_finishes_session() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0).note(3000.0, 1));
        controller.handle(tick(1010.0));

        let events = controller.handle(SessionEvent::Tap { lane: 0 });
        let judged = judgments(&events);
        assert_eq!(judged.len(), 1);
        assert_eq!(judged[0].tier, Tier::Perfect);
        assert_eq!(judged[0].score_delta, 1000);
        assert_eq!(judged[0].combo_after, 1);
        assert_eq!(controller.score().max_combo, 1);
        assert_eq!(controller.state(), SessionState::Playing);
    }

    #[test]
    fn tick_sweeps_unhit_note_as_miss() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0).note(3000.0, 0));
        assert!(controller.handle(tick(1100.0)).is_empty());

        let events = controller.handle(tick(1101.0));
        let judged = judgments(&events);
        assert_eq!(judged.len(), 1);
        assert_eq!(judged[0].tier, Tier::Miss);
        assert_eq!(judged[0].delta_ms, 101.0);
        assert_eq!(controller.score().combo, 0);
        assert_eq!(controller.score().score, 0);
    }

    #[test]
    fn tap_uses_last_tick_and_current_latency() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0).note(5000.0, 0));
        controller.handle(tick(960.0));
        controller.set_latency_offset(LatencyOffset::new(40));

        let events = controller.handle(SessionEvent::Tap { lane: 0 });
        let judged = judgments(&events);
        assert_eq!(judged[0].delta_ms, 0.0);
        assert_eq!(judged[0].tier, Tier::Perfect);
    }

    #[test]
    fn wasted_tap_produces_nothing() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0));
        controller.handle(tick(500.0));
        assert!(controller.handle(SessionEvent::Tap { lane: 0 }).is_empty());
        assert!(controller.handle(SessionEvent::Tap { lane: 3 }).is_empty());
        assert_eq!(controller.score(), &ScoreState::default());
    }

    // =========================================================================
    // Completion tests
    // =========================================================================

    #[test]
    fn note_exhaustion_wins_over_later_clock_finish() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0));
        controller.handle(tick(1000.0));

        let events = controller.handle(SessionEvent::Tap { lane: 0 });
        let finished = results(&events);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].finish_reason, FinishReason::AllNotesResolved);
        assert_eq!(controller.state(), SessionState::Finished);

        assert!(controller.handle(SessionEvent::ClockFinished).is_empty());
        assert!(controller.handle(tick(20_000.0)).is_empty());
        assert_eq!(controller.clock().unwrap().stop_count(), 1);
        assert_eq!(controller.store().writes(), 1);
    }

    #[test]
    fn clock_finish_leaves_pending_uncounted_by_default() {
        let mut controller = playing(BeatmapBuilder::new().note(1000.0, 0).note(2000.0, 1));
        controller.handle(tick(1000.0));
        controller.handle(SessionEvent::Tap { lane: 0 });

        let events = controller.handle(SessionEvent::ClockFinished);
        let result = results(&events)[0];
        assert_eq!(result.finish_reason, FinishReason::TrackFinished);
        assert_eq!(result.unresolved_notes, 1);
        assert_eq!(result.judgment_counts.total(), 1);
        assert_eq!(result.judgment_counts.miss, 0);
    }

    #[test]
    fn force_miss_policy_counts_leftovers() {
        let options = SessionOptions {
            unresolved_policy: UnresolvedPolicy::ForceMiss,
            ..SessionOptions::default()
        };
        let (mut controller, _time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0).note(2000.0, 1),
            Some(10_000.0),
            MemoryScoreStore::new(),
            options,
        );
        controller.handle(tick(1000.0));
        controller.handle(SessionEvent::Tap { lane: 0 });

        let events = controller.handle(SessionEvent::ClockFinished);
        let judged = judgments(&events);
        assert_eq!(judged.len(), 1);
        assert_eq!(judged[0].tier, Tier::Miss);
        assert_eq!(judged[0].lane, 1);

        let result = results(&events)[0];
        assert_eq!(result.unresolved_notes, 0);
        assert_eq!(result.judgment_counts.miss, 1);
        assert_eq!(result.max_combo, 1);
    }

    #[test]
    fn grace_timeout_fires_after_expected_end() {
        // Expected end is 500 + 10_000.
        let mut controller = playing(
            BeatmapBuilder::new()
                .offset_ms(500.0)
                .note(1000.0, 0)
                .note(20_000.0, 1),
        );
        assert!(results(&controller.handle(tick(11_250.0))).is_empty());
        let events = controller.handle(tick(11_251.0));
        assert_eq!(
            results(&events)[0].finish_reason,
            FinishReason::GraceTimeout
        );
    }

    #[test]
    fn expected_end_falls_back_to_last_note() {
        let (mut controller, _time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0).note(1000.0, 1),
            None,
            MemoryScoreStore::new(),
            SessionOptions::default(),
        );
        assert_eq!(controller.expected_end_ms(), Some(1000.0));
        controller.handle(tick(1000.0));
        controller.handle(SessionEvent::Tap { lane: 0 });
        assert_eq!(controller.state(), SessionState::Playing);

        // Lane 1 is swept at 1101 and exhausts the timeline first.
        let events = controller.handle(tick(1800.0));
        assert_eq!(
            results(&events)[0].finish_reason,
            FinishReason::AllNotesResolved
        );
    }

    #[test]
    fn empty_beatmap_finishes_on_first_tick() {
        let mut controller = playing(BeatmapBuilder::new());
        let events = controller.handle(tick(0.0));
        assert_eq!(
            results(&events)[0].finish_reason,
            FinishReason::AllNotesResolved
        );
    }

    // =========================================================================
    // Stall tests
    // =========================================================================

    #[test]
    fn stalled_clock_finishes_on_estimate() {
        let (mut controller, time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0).note(5000.0, 0),
            Some(2000.0),
            MemoryScoreStore::new(),
            SessionOptions::default(),
        );
        time.set_time(1_000_000);
        controller.handle(tick(1000.0));
        controller.handle(SessionEvent::Tap { lane: 0 });

        time.advance_ms(200);
        assert!(controller.poll().is_empty());

        // Clock froze at 1000 ms; the estimate passes 2000 + 750 at wall +1751.
        time.advance_ms(1500);
        assert!(controller.poll().is_empty());
        time.advance_ms(51);
        let events = controller.poll();
        let result = results(&events)[0];
        assert_eq!(result.finish_reason, FinishReason::GraceTimeout);
        assert!(result.position_estimated);
        assert_eq!(result.unresolved_notes, 1);
    }

    #[test]
    fn poll_never_judges_notes() {
        let (mut controller, time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0).note(50_000.0, 0),
            Some(60_000.0),
            MemoryScoreStore::new(),
            SessionOptions::default(),
        );
        time.advance_ms(5000);
        assert!(controller.poll().is_empty());
        assert_eq!(controller.timeline().unwrap().pending_count(), 2);
    }

    // =========================================================================
    // Persistence tests
    // =========================================================================

    #[test]
    fn tie_with_stored_best_is_new_record() {
        let record = HighScore {
            score: 1000,
            max_combo: 1,
            judgment_counts: JudgmentCounts::default(),
            updated_at: chrono::Utc::now(),
        };
        let store = MemoryScoreStore::new().with_record("test_song", "normal", record);
        let (mut controller, _time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0),
            Some(5000.0),
            store,
            SessionOptions::default(),
        );
        controller.handle(tick(1000.0));
        let events = controller.handle(SessionEvent::Tap { lane: 0 });
        assert!(results(&events)[0].is_new_record);
    }

    #[test]
    fn lower_score_is_not_new_record() {
        let record = HighScore {
            score: 5000,
            max_combo: 5,
            judgment_counts: JudgmentCounts::default(),
            updated_at: chrono::Utc::now(),
        };
        let store = MemoryScoreStore::new().with_record("test_song", "normal", record);
        let (mut controller, _time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0),
            Some(5000.0),
            store,
            SessionOptions::default(),
        );
        controller.handle(tick(1000.0));
        let events = controller.handle(SessionEvent::Tap { lane: 0 });
        assert!(!results(&events)[0].is_new_record);
        assert_eq!(
            controller.store().get("test_song", "normal").unwrap().score,
            5000
        );
    }

    #[test]
    fn store_failures_do_not_block_result() {
        let store = MemoryScoreStore::new().failing_reads().failing_writes();
        let (mut controller, _time) = controller_with(
            BeatmapBuilder::new().note(1000.0, 0),
            Some(5000.0),
            store,
            SessionOptions::default(),
        );
        controller.handle(tick(1000.0));
        let events = controller.handle(SessionEvent::Tap { lane: 0 });

        assert_eq!(results(&events).len(), 1);
        assert_eq!(controller.state(), SessionState::Finished);
        assert_eq!(controller.result().unwrap().score, 1000);
    }
}

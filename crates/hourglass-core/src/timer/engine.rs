//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` periodically
//! if it wants a live display value.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running | Paused -> Idle   (stop commits, reset discards)
//! ```
//!
//! Elapsed time is always recomputed from the anchor of the current running
//! segment plus the time accumulated by earlier segments, so tick jitter never
//! leaks into the committed duration.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start();
//! // In a loop:
//! engine.tick(); // Some(Event::TimerTick { .. }) while running
//! let committed = engine.stop(); // Some(Event::TimerStopped { duration_secs, .. })
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// Core timer engine.
///
/// Operates on wall-clock timestamps -- no internal thread.
/// Every command has an `*_at` variant taking the current time in epoch
/// milliseconds; the plain variants read the system clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEngine {
    state: TimerState,
    /// Last computed elapsed time (display value).
    elapsed_ms: u64,
    /// Start of the current running segment (ms since epoch).
    #[serde(default)]
    anchor_epoch_ms: Option<u64>,
    /// Time accumulated by segments that ended with a pause.
    accumulated_ms: u64,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    /// Create an idle timer.
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed_ms: 0,
            anchor_epoch_ms: None,
            accumulated_ms: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Last computed elapsed value. Refreshed by `tick`, `pause` and `stop`.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }

    /// Elapsed time as of `now_ms`, without mutating the engine.
    pub fn elapsed_ms_at(&self, now_ms: u64) -> u64 {
        match (self.state, self.anchor_epoch_ms) {
            (TimerState::Running, Some(anchor)) => {
                self.accumulated_ms + now_ms.saturating_sub(anchor)
            }
            (TimerState::Paused, _) => self.accumulated_ms,
            _ => self.elapsed_ms,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        self.snapshot_at(now_ms())
    }

    pub fn snapshot_at(&self, now_ms: u64) -> Event {
        let elapsed_ms = self.elapsed_ms_at(now_ms);
        Event::StateSnapshot {
            state: self.state,
            elapsed_ms,
            display: super::format_duration(elapsed_ms / 1000),
            at: to_datetime(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.start_at(now_ms())
    }

    pub fn start_at(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            TimerState::Idle => {
                self.state = TimerState::Running;
                self.elapsed_ms = 0;
                self.accumulated_ms = 0;
                self.anchor_epoch_ms = Some(now_ms);
                Some(Event::TimerStarted {
                    at: to_datetime(now_ms),
                })
            }
            TimerState::Running | TimerState::Paused => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(now_ms())
    }

    pub fn pause_at(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                let elapsed = self.elapsed_ms_at(now_ms);
                self.elapsed_ms = elapsed;
                self.accumulated_ms = elapsed;
                self.anchor_epoch_ms = None;
                self.state = TimerState::Paused;
                Some(Event::TimerPaused {
                    elapsed_ms: elapsed,
                    at: to_datetime(now_ms),
                })
            }
            _ => None,
        }
    }

    pub fn resume(&mut self) -> Option<Event> {
        self.resume_at(now_ms())
    }

    pub fn resume_at(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            TimerState::Paused => {
                self.state = TimerState::Running;
                self.anchor_epoch_ms = Some(now_ms);
                Some(Event::TimerResumed {
                    elapsed_ms: self.accumulated_ms,
                    at: to_datetime(now_ms),
                })
            }
            _ => None,
        }
    }

    /// Call periodically while running to refresh the display value.
    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    pub fn tick_at(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            TimerState::Running => {
                self.elapsed_ms = self.elapsed_ms_at(now_ms);
                Some(Event::TimerTick {
                    elapsed_ms: self.elapsed_ms,
                })
            }
            _ => None,
        }
    }

    /// Stop and reset. Returns the duration to commit, rounded to whole seconds.
    ///
    /// Stopping an idle timer commits nothing.
    pub fn stop(&mut self) -> Option<Event> {
        self.stop_at(now_ms())
    }

    pub fn stop_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.state == TimerState::Idle {
            return None;
        }
        let committed_ms = self.elapsed_ms_at(now_ms);
        *self = Self::new();
        Some(Event::TimerStopped {
            duration_secs: round_ms_to_secs(committed_ms),
            at: to_datetime(now_ms),
        })
    }

    /// Force idle regardless of the current state, discarding elapsed time.
    pub fn reset(&mut self) -> Option<Event> {
        *self = Self::new();
        Some(Event::TimerReset { at: Utc::now() })
    }
}

fn round_ms_to_secs(ms: u64) -> u64 {
    (ms + 500) / 1000
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn to_datetime(epoch_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms as i64).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T0: u64 = 1_717_200_000_000;

    fn committed(event: Option<Event>) -> u64 {
        match event {
            Some(Event::TimerStopped { duration_secs, .. }) => duration_secs,
            other => panic!("Expected TimerStopped, got {other:?}"),
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.state(), TimerState::Idle);

        assert!(engine.start_at(T0).is_some());
        assert_eq!(engine.state(), TimerState::Running);

        assert!(engine.pause_at(T0 + 10_000).is_some());
        assert_eq!(engine.state(), TimerState::Paused);
        assert_eq!(engine.elapsed_ms(), 10_000);
        assert_eq!(engine.accumulated_ms(), 10_000);

        assert!(engine.resume_at(T0 + 60_000).is_some());
        assert_eq!(engine.state(), TimerState::Running);
    }

    #[test]
    fn stop_while_running_includes_current_segment() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        engine.pause_at(T0 + 30_000);
        engine.resume_at(T0 + 90_000);
        assert_eq!(committed(engine.stop_at(T0 + 120_000)), 60);
        assert_eq!(engine, TimerEngine::new());
    }

    #[test]
    fn stop_while_paused_uses_accumulated() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        engine.pause_at(T0 + 45_400);
        assert_eq!(committed(engine.stop_at(T0 + 999_000)), 45);
        assert_eq!(engine.state(), TimerState::Idle);
    }

    #[test]
    fn stop_rounds_to_nearest_second() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        assert_eq!(committed(engine.stop_at(T0 + 1_500)), 2);
    }

    #[test]
    fn stop_from_idle_commits_nothing() {
        let mut engine = TimerEngine::new();
        assert!(engine.stop_at(T0).is_none());
    }

    #[test]
    fn invalid_transitions_are_noops() {
        let mut idle = TimerEngine::new();
        assert!(idle.pause_at(T0).is_none());
        assert!(idle.resume_at(T0).is_none());
        assert!(idle.tick_at(T0).is_none());
        assert_eq!(idle, TimerEngine::new());

        let mut running = TimerEngine::new();
        running.start_at(T0);
        let before = running.clone();
        assert!(running.start_at(T0 + 5_000).is_none());
        assert!(running.resume_at(T0 + 5_000).is_none());
        assert_eq!(running, before);

        let mut paused = before.clone();
        paused.pause_at(T0 + 7_000);
        let before = paused.clone();
        assert!(paused.start_at(T0 + 9_000).is_none());
        assert!(paused.pause_at(T0 + 9_000).is_none());
        assert_eq!(paused, before);
    }

    #[test]
    fn tick_updates_display_only() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        assert_eq!(
            engine.tick_at(T0 + 2_250),
            Some(Event::TimerTick { elapsed_ms: 2_250 })
        );
        assert_eq!(engine.accumulated_ms(), 0);
    }

    #[test]
    fn reset_goes_to_idle_from_any_state() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        engine.pause_at(T0 + 1_000);
        assert!(engine.reset().is_some());
        assert_eq!(engine.state(), TimerState::Idle);
        assert_eq!(engine.elapsed_ms(), 0);
    }

    #[test]
    fn snapshot_reports_live_elapsed() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        match engine.snapshot_at(T0 + 3_725_000) {
            Event::StateSnapshot {
                state,
                elapsed_ms,
                display,
                ..
            } => {
                assert_eq!(state, TimerState::Running);
                assert_eq!(elapsed_ms, 3_725_000);
                assert_eq!(display, "01:02:05");
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn survives_serde_roundtrip_mid_run() {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        engine.pause_at(T0 + 4_000);
        engine.resume_at(T0 + 8_000);
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: TimerEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(committed(restored.stop_at(T0 + 10_000)), 6);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Pause,
        Resume,
        Tick,
        Start,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Pause),
            Just(Op::Resume),
            Just(Op::Tick),
            Just(Op::Start),
        ]
    }

    proptest! {
        /// Committed duration equals the sum of running segments, however
        /// often (and however irregularly) the timer is ticked.
        #[test]
        fn committed_equals_sum_of_running_segments(
            steps in proptest::collection::vec((op(), 0u64..120_000), 0..60),
            tail in 0u64..120_000,
        ) {
            let mut engine = TimerEngine::new();
            let mut now = T0;
            engine.start_at(now);

            let mut running = true;
            let mut expected_ms = 0u64;

            for (op, gap) in steps {
                if running {
                    expected_ms += gap;
                }
                now += gap;
                match op {
                    Op::Pause => {
                        engine.pause_at(now);
                        running = false;
                    }
                    Op::Resume => {
                        engine.resume_at(now);
                        running = true;
                    }
                    Op::Tick => {
                        engine.tick_at(now);
                    }
                    Op::Start => {
                        prop_assert!(engine.start_at(now).is_none());
                    }
                }
            }
            if running {
                expected_ms += tail;
            }
            now += tail;

            let got = committed(engine.stop_at(now));
            prop_assert_eq!(got, (expected_ms + 500) / 1000);
        }
    }
}

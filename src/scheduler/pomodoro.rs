//! Pomodoro work/break state machine.
//!
//! Remaining time is always derived from absolute timestamps, so a display
//! that refreshes late (or a machine that slept) never accumulates drift.
//! The phase boundary is a single owned [`DeferredTimer`] that the actor
//! polls; pause and reset cancel it, and a boundary observed while not
//! running is discarded.

use super::timer::DeferredTimer;
use crate::clock::Clock;
use crate::domain::{Activity, Phase};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Configured length of each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub work: Duration,
    pub rest: Duration,
}

impl PhaseDurations {
    pub fn from_minutes(work: u32, rest: u32) -> Self {
        Self {
            work: Duration::minutes(i64::from(work)),
            rest: Duration::minutes(i64::from(rest)),
        }
    }

    pub fn of(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Work => self.work,
            Phase::Break => self.rest,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Inactive,
    /// `started_at` is shifted on resume so that the pause is not counted
    Running { started_at: DateTime<Utc> },
    Paused { remaining: Duration },
}

/// Emitted when a phase boundary is crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub ended: Phase,
    pub started: Phase,
    pub at: DateTime<Utc>,
    pub completed_cycles: u32,
}

/// Point-in-time view of the timer for display
#[derive(Debug, Clone, PartialEq)]
pub struct PomodoroStatus {
    pub phase: Phase,
    pub activity: Activity,
    pub remaining: Duration,
    /// Fraction of the current phase still left (1.0 when inactive)
    pub progress: f64,
    pub completed_cycles: u32,
}

impl PomodoroStatus {
    pub fn status_line(&self) -> String {
        match self.activity {
            Activity::Inactive => "Pomodoro Inactive".to_string(),
            Activity::Running => format!("Pomodoro Active: {}", self.phase.label()),
            Activity::Paused => format!("Pomodoro Paused: {}", self.phase.label()),
        }
    }
}

impl fmt::Display for PomodoroStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] cycles completed: {}",
            self.status_line(),
            format_countdown(self.remaining),
            self.completed_cycles
        )
    }
}

/// Format a countdown as "MM:SS", rounding partial seconds down
pub fn format_countdown(remaining: Duration) -> String {
    let total_seconds = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// The work/break cycle scheduler
pub struct PomodoroScheduler {
    clock: Arc<dyn Clock>,
    durations: PhaseDurations,
    phase: Phase,
    state: CycleState,
    boundary: DeferredTimer,
    completed_cycles: u32,
}

impl PomodoroScheduler {
    pub fn new(clock: Arc<dyn Clock>, durations: PhaseDurations) -> Self {
        Self {
            clock,
            durations,
            phase: Phase::Work,
            state: CycleState::Inactive,
            boundary: DeferredTimer::default(),
            completed_cycles: 0,
        }
    }

    pub fn activity(&self) -> Activity {
        match self.state {
            CycleState::Inactive => Activity::Inactive,
            CycleState::Running { .. } => Activity::Running,
            CycleState::Paused { .. } => Activity::Paused,
        }
    }

    fn phase_duration(&self) -> Duration {
        self.durations.of(self.phase)
    }

    /// When the armed phase boundary fires, if one is armed
    pub fn next_boundary(&self) -> Option<DateTime<Utc>> {
        self.boundary.due_at()
    }

    /// Begin a work phase. Only valid from inactive.
    pub fn start(&mut self) -> bool {
        if self.state != CycleState::Inactive {
            debug!(activity = ?self.activity(), "start ignored");
            return false;
        }

        let now = self.clock.now();
        self.phase = Phase::Work;
        self.state = CycleState::Running { started_at: now };
        let fires_at = now + self.durations.work;
        self.boundary.arm(fires_at);
        info!(%fires_at, "pomodoro started");
        true
    }

    /// Freeze the countdown. Only valid while running.
    pub fn pause(&mut self) -> bool {
        let CycleState::Running { started_at } = self.state else {
            debug!(activity = ?self.activity(), "pause ignored");
            return false;
        };

        let now = self.clock.now();
        let remaining = (started_at + self.phase_duration() - now).max(Duration::zero());
        self.boundary.cancel();
        self.state = CycleState::Paused { remaining };
        info!(phase = ?self.phase, remaining_ms = remaining.num_milliseconds(), "pomodoro paused");
        true
    }

    /// Continue a paused countdown. Only valid while paused.
    pub fn resume(&mut self) -> bool {
        let CycleState::Paused { remaining } = self.state else {
            debug!(activity = ?self.activity(), "resume ignored");
            return false;
        };

        let now = self.clock.now();
        let started_at = now - (self.phase_duration() - remaining);
        self.state = CycleState::Running { started_at };
        self.boundary.arm(now + remaining);
        info!(phase = ?self.phase, remaining_ms = remaining.num_milliseconds(), "pomodoro resumed");
        true
    }

    /// Pause when running, resume when paused
    pub fn toggle_pause(&mut self) -> bool {
        match self.state {
            CycleState::Running { .. } => self.pause(),
            CycleState::Paused { .. } => self.resume(),
            CycleState::Inactive => {
                debug!("toggle ignored while inactive");
                false
            }
        }
    }

    /// Stop and return to an inactive work phase. Valid from any state.
    pub fn reset(&mut self) {
        self.boundary.cancel();
        self.phase = Phase::Work;
        self.state = CycleState::Inactive;
        self.completed_cycles = 0;
        info!("pomodoro reset");
    }

    /// Time left in the current phase; the full work duration when inactive
    pub fn remaining(&self) -> Duration {
        match self.state {
            CycleState::Inactive => self.durations.work,
            CycleState::Paused { remaining } => remaining,
            CycleState::Running { started_at } => {
                (started_at + self.phase_duration() - self.clock.now()).max(Duration::zero())
            }
        }
    }

    pub fn status(&self) -> PomodoroStatus {
        let remaining = self.remaining();
        let progress = match self.state {
            CycleState::Inactive => 1.0,
            _ => {
                let total = self.phase_duration().num_milliseconds();
                if total == 0 {
                    0.0
                } else {
                    remaining.num_milliseconds() as f64 / total as f64
                }
            }
        };

        PomodoroStatus {
            phase: self.phase,
            activity: self.activity(),
            remaining,
            progress,
            completed_cycles: self.completed_cycles,
        }
    }

    /// Fire the phase boundary if it is due.
    ///
    /// Called from the actor's tick; at most one boundary is crossed per call.
    pub fn poll(&mut self) -> Option<PhaseChange> {
        let now = self.clock.now();
        if !self.boundary.poll(now) {
            return None;
        }

        let CycleState::Running { .. } = self.state else {
            debug!(activity = ?self.activity(), "discarding phase boundary");
            return None;
        };

        let ended = self.phase;
        if ended == Phase::Work {
            self.completed_cycles += 1;
        }
        self.phase = ended.next();
        self.state = CycleState::Running { started_at: now };
        self.boundary.arm(now + self.phase_duration());

        info!(ended = ?ended, started = ?self.phase, cycles = self.completed_cycles, "phase boundary");
        Some(PhaseChange {
            ended,
            started: self.phase,
            at: now,
            completed_cycles: self.completed_cycles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;

    const WORK_MS: i64 = 1_500_000;
    const BREAK_MS: i64 = 300_000;

    fn ms(millis: i64) -> Duration {
        Duration::milliseconds(millis)
    }

    fn scheduler_at(millis: i64) -> (Arc<ManualClock>, PomodoroScheduler) {
        let clock = Arc::new(ManualClock::at_millis(millis));
        let scheduler = PomodoroScheduler::new(clock.clone(), PhaseDurations::default());
        (clock, scheduler)
    }

    #[test]
    fn test_initial_state() {
        let (_clock, scheduler) = scheduler_at(0);
        assert_eq!(scheduler.activity(), Activity::Inactive);
        assert_eq!(scheduler.status().phase, Phase::Work);
        assert_eq!(scheduler.remaining(), ms(WORK_MS));
        assert_eq!(scheduler.next_boundary(), None);
    }

    #[test]
    fn test_start_pause_resume_scenario() {
        let (clock, mut scheduler) = scheduler_at(0);

        assert!(scheduler.start());
        clock.set_millis(10_000);
        assert_eq!(scheduler.remaining(), ms(1_490_000));

        assert!(scheduler.pause());
        clock.set_millis(20_000);
        assert_eq!(scheduler.remaining(), ms(1_490_000));

        assert!(scheduler.resume());
        clock.set_millis(20_100);
        assert_eq!(scheduler.remaining(), ms(1_489_900));
    }

    #[test]
    fn test_start_is_idempotent() {
        let (clock, mut scheduler) = scheduler_at(0);
        assert!(scheduler.start());
        clock.set_millis(60_000);

        assert!(!scheduler.start());
        assert_eq!(scheduler.next_boundary().unwrap().timestamp_millis(), WORK_MS);

        scheduler.pause();
        assert!(!scheduler.start());
        assert_eq!(scheduler.activity(), Activity::Paused);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let (_clock, mut scheduler) = scheduler_at(0);
        assert!(!scheduler.pause());
        assert!(!scheduler.resume());
        assert!(!scheduler.toggle_pause());
        assert_eq!(scheduler.activity(), Activity::Inactive);

        scheduler.start();
        assert!(!scheduler.resume());
        assert_eq!(scheduler.activity(), Activity::Running);
    }

    #[test]
    fn test_toggle_pause_alternates() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();

        assert!(scheduler.toggle_pause());
        assert_eq!(scheduler.activity(), Activity::Paused);
        clock.set_millis(5_000);
        assert!(scheduler.toggle_pause());
        assert_eq!(scheduler.activity(), Activity::Running);
        assert_eq!(scheduler.remaining(), ms(WORK_MS));
    }

    #[test]
    fn test_remaining_non_increasing_while_running() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();

        let mut previous = scheduler.remaining();
        for step in [1, 250, 999, 10_000, 123_456, 700_000] {
            clock.advance(ms(step));
            let current = scheduler.remaining();
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn test_remaining_constant_while_paused() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();
        clock.set_millis(42_000);
        scheduler.pause();

        let frozen = scheduler.remaining();
        for _ in 0..5 {
            clock.advance(Duration::minutes(7));
            assert_eq!(scheduler.remaining(), frozen);
        }
        assert_eq!(scheduler.poll(), None);
    }

    #[test]
    fn test_back_to_back_pause_resume_preserves_remaining() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();
        clock.set_millis(333_333);

        let before = scheduler.remaining();
        scheduler.pause();
        scheduler.resume();
        assert_eq!(scheduler.remaining(), before);
    }

    #[test]
    fn test_reset_from_any_state() {
        let (clock, mut scheduler) = scheduler_at(0);

        scheduler.reset();
        assert_eq!(scheduler.remaining(), ms(WORK_MS));

        scheduler.start();
        clock.set_millis(WORK_MS);
        scheduler.poll();
        assert_eq!(scheduler.status().phase, Phase::Break);
        scheduler.reset();
        assert_eq!(scheduler.activity(), Activity::Inactive);
        assert_eq!(scheduler.status().phase, Phase::Work);
        assert_eq!(scheduler.remaining(), ms(WORK_MS));
        assert_eq!(scheduler.next_boundary(), None);

        scheduler.start();
        scheduler.pause();
        scheduler.reset();
        assert_eq!(scheduler.activity(), Activity::Inactive);
        assert_eq!(scheduler.remaining(), ms(WORK_MS));
    }

    #[test]
    fn test_boundary_flips_work_to_break() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();

        clock.set_millis(WORK_MS - 1);
        assert_eq!(scheduler.poll(), None);

        clock.set_millis(WORK_MS);
        let change = scheduler.poll().unwrap();
        assert_eq!(change.ended, Phase::Work);
        assert_eq!(change.started, Phase::Break);
        assert_eq!(change.completed_cycles, 1);
        assert_eq!(scheduler.status().phase, Phase::Break);
        assert_eq!(scheduler.activity(), Activity::Running);
        assert_eq!(scheduler.remaining(), ms(BREAK_MS));
        assert_eq!(
            scheduler.next_boundary().unwrap().timestamp_millis(),
            WORK_MS + BREAK_MS
        );
    }

    #[test]
    fn test_boundary_cycles_back_to_work() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();
        clock.set_millis(WORK_MS);
        scheduler.poll();

        clock.set_millis(WORK_MS + BREAK_MS);
        let change = scheduler.poll().unwrap();
        assert_eq!(change.ended, Phase::Break);
        assert_eq!(change.started, Phase::Work);
        assert_eq!(change.completed_cycles, 1);
        assert_eq!(scheduler.remaining(), ms(WORK_MS));
    }

    #[test]
    fn test_boundary_fires_once() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();
        clock.set_millis(WORK_MS);

        assert!(scheduler.poll().is_some());
        assert_eq!(scheduler.poll(), None);
    }

    #[test]
    fn test_pause_racing_boundary_discards_fire() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();

        clock.set_millis(WORK_MS + 50);
        scheduler.pause();
        assert_eq!(scheduler.remaining(), Duration::zero());
        assert_eq!(scheduler.poll(), None);
        assert_eq!(scheduler.status().phase, Phase::Work);
        assert_eq!(scheduler.activity(), Activity::Paused);
    }

    #[test]
    fn test_reset_racing_boundary_discards_fire() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();
        clock.set_millis(WORK_MS + 50);

        scheduler.reset();
        assert_eq!(scheduler.poll(), None);
        assert_eq!(scheduler.activity(), Activity::Inactive);
    }

    #[test]
    fn test_resume_reschedules_boundary() {
        let (clock, mut scheduler) = scheduler_at(0);
        scheduler.start();
        clock.set_millis(10_000);
        scheduler.pause();
        clock.set_millis(20_000);
        scheduler.resume();

        assert_eq!(
            scheduler.next_boundary().unwrap().timestamp_millis(),
            WORK_MS + 10_000
        );
        clock.set_millis(WORK_MS + 9_999);
        assert_eq!(scheduler.poll(), None);
        clock.set_millis(WORK_MS + 10_000);
        assert_eq!(scheduler.poll().unwrap().started, Phase::Break);
    }

    #[test]
    fn test_status_reports_progress() {
        let (clock, mut scheduler) = scheduler_at(0);
        assert_eq!(scheduler.status().status_line(), "Pomodoro Inactive");
        assert_eq!(scheduler.status().progress, 1.0);

        scheduler.start();
        clock.set_millis(WORK_MS / 2);
        let status = scheduler.status();
        assert_eq!(status.status_line(), "Pomodoro Active: Work Time");
        assert_eq!(status.progress, 0.5);

        scheduler.pause();
        assert_eq!(scheduler.status().status_line(), "Pomodoro Paused: Work Time");
        assert_eq!(
            scheduler.status().to_string(),
            "Pomodoro Paused: Work Time [12:30] cycles completed: 0"
        );
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(ms(WORK_MS)), "25:00");
        assert_eq!(format_countdown(ms(1_489_900)), "24:49");
        assert_eq!(format_countdown(ms(999)), "00:00");
        assert_eq!(format_countdown(ms(-5_000)), "00:00");
    }

    #[test]
    fn test_custom_durations() {
        let clock = Arc::new(ManualClock::at_millis(0));
        let mut scheduler =
            PomodoroScheduler::new(clock.clone(), PhaseDurations::from_minutes(50, 10));
        scheduler.start();
        clock.set_millis(50 * 60_000);

        scheduler.poll();
        assert_eq!(scheduler.remaining(), Duration::minutes(10));
    }
}

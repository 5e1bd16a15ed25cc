pub mod control;

pub use control::ControlSwitcher;

use crate::context::{GameConfig, Score};
use log::debug;
use serde::{Deserialize, Serialize};

/// Simulated seconds the teams spend off the pitch between halves.
const INTERLUDE_SECONDS: f64 = 15.0;

/// Phases only ever move forward; there is no path back from a later
/// phase to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchPhase {
    FirstHalf,
    SecondHalf,
    ExtraTime,
    PenaltyShootout,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppageCause {
    Foul,
    Injury,
    Substitution,
    Goal,
    BallOut,
}

/// Match clock driven by the fixed simulation step. Owns phase
/// progression, per-half stoppage accrual and the half-time interlude.
#[derive(Debug)]
pub struct MatchClock {
    phase: MatchPhase,
    /// Simulated seconds inside the current phase.
    elapsed_in_phase: f64,
    total_elapsed: f64,
    stoppage: f64,
    /// Interruptions currently holding up play; time lost while any are
    /// open accrues as stoppage.
    open_stoppages: u32,
    interlude_remaining: f64,
    half_length: f64,
    extra_period_length: f64,
    extra_time_enabled: bool,
    penalties_enabled: bool,
}

impl MatchClock {
    pub fn new(config: &GameConfig) -> Self {
        let half_length = config.match_duration as f64 / 2.0;
        MatchClock {
            phase: MatchPhase::FirstHalf,
            elapsed_in_phase: 0.0,
            total_elapsed: 0.0,
            stoppage: 0.0,
            open_stoppages: 0,
            interlude_remaining: 0.0,
            half_length,
            // Two 15-minute periods for a regulation 90; scales with it.
            extra_period_length: config.match_duration as f64 / 3.0,
            extra_time_enabled: config.extra_time_enabled,
            penalties_enabled: config.penalties_enabled,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }

    pub fn elapsed_in_phase(&self) -> f64 {
        self.elapsed_in_phase
    }

    pub fn stoppage(&self) -> f64 {
        self.stoppage
    }

    /// Open play is underway; false during the interlude, the shootout
    /// and after full time.
    pub fn is_running(&self) -> bool {
        self.interlude_remaining <= 0.0
            && self.phase != MatchPhase::PenaltyShootout
            && self.phase != MatchPhase::Finished
    }

    pub fn in_stoppage_time(&self) -> bool {
        self.elapsed_in_phase > self.phase_length()
    }

    /// Play has been interrupted; lost time accrues until the stoppage
    /// is resolved.
    pub fn begin_stoppage(&mut self, cause: StoppageCause) {
        if self.phase == MatchPhase::Finished || self.phase == MatchPhase::PenaltyShootout {
            return;
        }
        debug!("stoppage opened: {cause:?}");
        self.open_stoppages += 1;
    }

    /// The ball is back in play; every open stoppage closes.
    pub fn resolve_stoppages(&mut self) {
        self.open_stoppages = 0;
    }

    pub fn has_open_stoppage(&self) -> bool {
        self.open_stoppages > 0
    }

    /// Advance by one simulation step. Returns the new phase when this
    /// step crossed a boundary.
    pub fn tick(&mut self, dt: f64, score: &Score) -> Option<MatchPhase> {
        if self.phase == MatchPhase::Finished {
            return None;
        }

        if self.interlude_remaining > 0.0 {
            self.interlude_remaining -= dt;
            if self.interlude_remaining > 0.0 {
                return None;
            }
            // Teams are back out; the next period starts fresh.
            self.elapsed_in_phase = 0.0;
            self.stoppage = 0.0;
            self.open_stoppages = 0;
            return Some(self.phase);
        }

        self.elapsed_in_phase += dt;
        self.total_elapsed += dt;
        if self.open_stoppages > 0 {
            self.stoppage += dt;
        }

        if self.elapsed_in_phase < self.phase_length() + self.stoppage {
            return None;
        }

        let next = self.next_phase(score);
        debug!("phase boundary: {:?} -> {:?}", self.phase, next);
        self.phase = next;

        if next == MatchPhase::SecondHalf || next == MatchPhase::ExtraTime {
            self.interlude_remaining = INTERLUDE_SECONDS;
            // The boundary event fires when the interlude ends.
            return None;
        }

        self.elapsed_in_phase = 0.0;
        self.stoppage = 0.0;
        self.open_stoppages = 0;
        Some(next)
    }

    /// Shootouts are resolved externally; the clock only closes out.
    pub fn finish(&mut self) {
        self.phase = MatchPhase::Finished;
    }

    fn phase_length(&self) -> f64 {
        match self.phase {
            MatchPhase::FirstHalf | MatchPhase::SecondHalf => self.half_length,
            MatchPhase::ExtraTime => self.extra_period_length,
            MatchPhase::PenaltyShootout | MatchPhase::Finished => f64::MAX,
        }
    }

    fn next_phase(&self, score: &Score) -> MatchPhase {
        match self.phase {
            MatchPhase::FirstHalf => MatchPhase::SecondHalf,
            MatchPhase::SecondHalf => {
                if !score.is_level() {
                    MatchPhase::Finished
                } else if self.extra_time_enabled {
                    MatchPhase::ExtraTime
                } else if self.penalties_enabled {
                    MatchPhase::PenaltyShootout
                } else {
                    MatchPhase::Finished
                }
            }
            MatchPhase::ExtraTime => {
                if score.is_level() && self.penalties_enabled {
                    MatchPhase::PenaltyShootout
                } else {
                    MatchPhase::Finished
                }
            }
            MatchPhase::PenaltyShootout | MatchPhase::Finished => MatchPhase::Finished,
        }
    }

    /// Scoreboard text: `MM:SS` in regulation, `MM+SS:ss` once the half
    /// runs into stoppage time, with centiseconds after the colon.
    pub fn display(&self) -> String {
        let base = self.phase_base_minutes();

        if self.in_stoppage_time() {
            let over = self.elapsed_in_phase - self.phase_length();
            let seconds = over as u64;
            let centis = ((over - seconds as f64) * 100.0) as u64;
            return format!(
                "{:02}+{:02}:{:02}",
                base + (self.phase_length() / 60.0) as u64,
                seconds,
                centis
            );
        }

        let shown = self.elapsed_in_phase;
        format!(
            "{:02}:{:02}",
            base + (shown / 60.0) as u64,
            (shown % 60.0) as u64
        )
    }

    fn phase_base_minutes(&self) -> u64 {
        let half_minutes = (self.half_length / 60.0) as u64;
        match self.phase {
            MatchPhase::FirstHalf => 0,
            MatchPhase::SecondHalf => half_minutes,
            MatchPhase::ExtraTime => half_minutes * 2,
            MatchPhase::PenaltyShootout | MatchPhase::Finished => half_minutes * 2,
        }
    }
}

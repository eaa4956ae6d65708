use serde::{Deserialize, Serialize};

use crate::{
    db::DurationDelta,
    settings::Settings,
    utils::time::{float_to_time, minutes_to_ms, ms_to_minutes},
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Focus => "focus",
            Phase::ShortBreak => "short break",
            Phase::LongBreak => "long break",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }
}

/// Phase lengths derived from the settings sliders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseDurations {
    pub focus_ms: u64,
    pub break_ms: u64,
    pub long_break_ms: u64,
    /// Focus rounds before a long break.
    pub rounds: u32,
}

impl PhaseDurations {
    pub fn from_settings(settings: &Settings, minutes_per_step: f32) -> Self {
        let to_ms = |position: f32| minutes_to_ms(float_to_time(position, minutes_per_step));
        Self {
            focus_ms: to_ms(settings.focus_dur),
            break_ms: to_ms(settings.rest_dur),
            long_break_ms: to_ms(settings.long_rest_dur),
            rounds: settings.rounds.max(0.0).trunc() as u32,
        }
    }

    pub fn for_phase(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Idle => 0,
            Phase::Focus => self.focus_ms,
            Phase::ShortBreak => self.break_ms,
            Phase::LongBreak => self.long_break_ms,
        }
    }
}

/// What a finished countdown leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub next: Phase,
    pub ledger: Option<DurationDelta>,
}

/// In-memory state of the running cycle. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: Phase,
    pub paused: bool,
    pub remaining_focus_secs: u64,
    pub remaining_rest_secs: u64,
    pub remaining_long_break_secs: u64,
    /// Remaining time of the active phase captured by the last pause.
    pub paused_ms: u64,
    pub finished_count: u32,
    pub durations: PhaseDurations,
}

impl SessionState {
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            phase: Phase::Idle,
            paused: false,
            remaining_focus_secs: durations.focus_ms / 1000,
            remaining_rest_secs: durations.break_ms / 1000,
            remaining_long_break_secs: durations.long_break_ms / 1000,
            paused_ms: 0,
            finished_count: 0,
            durations,
        }
    }

    pub fn remaining_secs(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Idle => 0,
            Phase::Focus => self.remaining_focus_secs,
            Phase::ShortBreak => self.remaining_rest_secs,
            Phase::LongBreak => self.remaining_long_break_secs,
        }
    }

    pub fn set_remaining_secs(&mut self, phase: Phase, secs: u64) {
        match phase {
            Phase::Idle => {}
            Phase::Focus => self.remaining_focus_secs = secs,
            Phase::ShortBreak => self.remaining_rest_secs = secs,
            Phase::LongBreak => self.remaining_long_break_secs = secs,
        }
    }

    /// Enters `phase` running. Returns the countdown length to arm.
    pub fn begin(&mut self, phase: Phase) -> u64 {
        self.phase = phase;
        self.paused = false;
        self.durations.for_phase(phase)
    }

    pub fn pause(&mut self) {
        self.paused = true;
        if self.phase != Phase::Idle {
            self.paused_ms = self.remaining_secs(self.phase) * 1000;
        }
    }

    /// Clears the pause. Returns the phase and seed to re-arm, if any.
    pub fn resume(&mut self) -> Option<(Phase, u64)> {
        if !self.paused {
            return None;
        }
        self.paused = false;
        match self.phase {
            Phase::Idle => None,
            phase => Some((phase, self.paused_ms)),
        }
    }

    /// Applies the natural end of `phase`.
    pub fn complete(&mut self, phase: Phase) -> Completion {
        match phase {
            Phase::Focus => {
                self.finished_count += 1;
                Completion {
                    next: self.after_focus(),
                    ledger: Some(DurationDelta::focus(ms_to_minutes(self.durations.focus_ms))),
                }
            }
            Phase::ShortBreak => Completion {
                next: Phase::Focus,
                ledger: Some(DurationDelta::rest(ms_to_minutes(self.durations.break_ms))),
            },
            Phase::LongBreak => {
                self.finished_count = 0;
                Completion {
                    next: Phase::Focus,
                    ledger: None,
                }
            }
            Phase::Idle => Completion {
                next: Phase::Idle,
                ledger: None,
            },
        }
    }

    /// Ends the active phase early. Nothing is recorded in the ledger.
    pub fn skip(&mut self) -> Phase {
        self.paused = false;
        match self.phase {
            Phase::Focus => {
                self.finished_count += 1;
                self.after_focus()
            }
            Phase::ShortBreak => Phase::Focus,
            Phase::LongBreak => {
                self.finished_count = 0;
                Phase::Focus
            }
            Phase::Idle => Phase::ShortBreak,
        }
    }

    /// Back to idle. Remaining-time counters keep their last values.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.paused = false;
        self.finished_count = 0;
        self.paused_ms = 0;
    }

    // Exact match only: lowering `rounds` below the count mid-cycle keeps
    // short breaks coming until the next reset.
    fn after_focus(&self) -> Phase {
        if self.finished_count == self.durations.rounds {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }
}

use std::sync::Arc;

use tokio::sync::watch;

use super::state::{Phase, SessionState};

pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Side-effect callbacks (sound, vibration, notifications).
#[derive(Clone, Default)]
pub struct TimerHooks {
    pub on_finish_focus: Option<Hook>,
    pub on_tick_rest: Option<Hook>,
    pub on_finish_rest: Option<Hook>,
}

/// Observable view of the session. Each receiver holds the latest value and
/// is notified only when it changes.
pub struct TimerSignals {
    phase: watch::Sender<Phase>,
    is_paused: watch::Sender<bool>,
    remaining_focus_time: watch::Sender<u64>,
    remaining_rest_time: watch::Sender<u64>,
    remaining_long_break_time: watch::Sender<u64>,
    is_running_focus: watch::Sender<bool>,
    is_running_rest: watch::Sender<bool>,
    is_running_long_break: watch::Sender<bool>,
    finished_count: watch::Sender<u32>,
}

impl TimerSignals {
    pub fn new(initial: &SessionState) -> Self {
        Self {
            phase: watch::Sender::new(initial.phase),
            is_paused: watch::Sender::new(initial.paused),
            remaining_focus_time: watch::Sender::new(initial.remaining_focus_secs),
            remaining_rest_time: watch::Sender::new(initial.remaining_rest_secs),
            remaining_long_break_time: watch::Sender::new(initial.remaining_long_break_secs),
            is_running_focus: watch::Sender::new(initial.phase == Phase::Focus),
            is_running_rest: watch::Sender::new(initial.phase == Phase::ShortBreak),
            is_running_long_break: watch::Sender::new(initial.phase == Phase::LongBreak),
            finished_count: watch::Sender::new(initial.finished_count),
        }
    }

    pub(crate) fn publish(&self, state: &SessionState) {
        set(&self.phase, state.phase);
        set(&self.is_paused, state.paused);
        set(&self.remaining_focus_time, state.remaining_focus_secs);
        set(&self.remaining_rest_time, state.remaining_rest_secs);
        set(&self.remaining_long_break_time, state.remaining_long_break_secs);
        // A paused phase still counts as running, as it did before the pause.
        set(&self.is_running_focus, state.phase == Phase::Focus);
        set(&self.is_running_rest, state.phase == Phase::ShortBreak);
        set(&self.is_running_long_break, state.phase == Phase::LongBreak);
        set(&self.finished_count, state.finished_count);
    }

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn is_paused(&self) -> watch::Receiver<bool> {
        self.is_paused.subscribe()
    }

    pub fn remaining_focus_time(&self) -> watch::Receiver<u64> {
        self.remaining_focus_time.subscribe()
    }

    pub fn remaining_rest_time(&self) -> watch::Receiver<u64> {
        self.remaining_rest_time.subscribe()
    }

    pub fn remaining_long_break_time(&self) -> watch::Receiver<u64> {
        self.remaining_long_break_time.subscribe()
    }

    pub fn is_running_focus(&self) -> watch::Receiver<bool> {
        self.is_running_focus.subscribe()
    }

    pub fn is_running_rest(&self) -> watch::Receiver<bool> {
        self.is_running_rest.subscribe()
    }

    pub fn is_running_long_break(&self) -> watch::Receiver<bool> {
        self.is_running_long_break.subscribe()
    }

    pub fn finished_count(&self) -> watch::Receiver<u32> {
        self.finished_count.subscribe()
    }
}

fn set<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::state::PhaseDurations;

    fn state() -> SessionState {
        SessionState::new(PhaseDurations {
            focus_ms: 60_000,
            break_ms: 30_000,
            long_break_ms: 90_000,
            rounds: 2,
        })
    }

    #[test]
    fn initial_values_mirror_the_state() {
        let signals = TimerSignals::new(&state());
        assert_eq!(*signals.remaining_focus_time().borrow(), 60);
        assert_eq!(*signals.remaining_long_break_time().borrow(), 90);
        assert_eq!(*signals.phase().borrow(), Phase::Idle);
        assert!(!*signals.is_running_focus().borrow());
    }

    #[test]
    fn only_changed_values_notify() {
        let mut session = state();
        let signals = TimerSignals::new(&session);
        let focus_rx = signals.is_running_focus();
        let rest_rx = signals.is_running_rest();

        session.begin(Phase::Focus);
        signals.publish(&session);

        assert!(focus_rx.has_changed().unwrap());
        assert!(*focus_rx.borrow());
        assert!(!rest_rx.has_changed().unwrap());
    }

    #[test]
    fn paused_phases_stay_running() {
        let mut session = state();
        let signals = TimerSignals::new(&session);
        session.begin(Phase::ShortBreak);
        session.pause();
        signals.publish(&session);

        assert!(*signals.is_paused().borrow());
        assert!(*signals.is_running_rest().borrow());
    }
}

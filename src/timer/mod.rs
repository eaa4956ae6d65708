pub mod controller;
pub mod countdown;
pub mod signals;
pub mod state;

pub use controller::PomodoroController;
pub use countdown::{Countdown, CountdownListener};
pub use signals::{Hook, TimerHooks, TimerSignals};
pub use state::{Completion, Phase, PhaseDurations, SessionState};

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard, Weak},
    time::Duration,
};

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    db::{Database, DurationDelta},
    error::PersistenceError,
    ledger::LedgerWriter,
    settings::{Settings, SettingsStore},
    utils::time::today_key,
};

use super::{
    countdown::{Countdown, CountdownListener},
    signals::{Hook, TimerHooks, TimerSignals},
    state::{Phase, PhaseDurations, SessionState},
};

struct ControllerState {
    session: SessionState,
    countdown: Option<Countdown>,
    /// Bumped whenever a countdown is armed or cancelled; callbacks carrying
    /// an older value are ignored.
    generation: u64,
    ticks: u32,
}

struct Shared {
    state: Mutex<ControllerState>,
    signals: TimerSignals,
    hooks: RwLock<TimerHooks>,
    settings: Arc<SettingsStore>,
    ledger: LedgerWriter,
    runtime: Handle,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    minutes_per_step: f32,
    shutdown: CancellationToken,
}

// The armed countdown is dropped with `state`, which cancels it.
impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Drives the focus → break → … → long break cycle.
///
/// Cheap to clone; all clones share one session. Commands and countdown
/// callbacks are serialized through a single lock, and at most one
/// countdown is armed at a time.
///
/// Countdowns and the settings watcher only hold weak references: once the
/// last handle is dropped the cycle stops. Hooks that capture a handle keep
/// it alive; call [`shutdown`](Self::shutdown) to stop explicitly and flush
/// the ledger.
#[derive(Clone)]
pub struct PomodoroController {
    inner: Arc<Shared>,
}

impl PomodoroController {
    /// Must be called from within a tokio runtime; countdowns and the ledger
    /// writer are spawned onto it.
    pub fn new(config: &AppConfig, settings: Arc<SettingsStore>, db: Database) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|err| anyhow!("timer controller needs a tokio runtime: {err}"))?;

        let durations = PhaseDurations::from_settings(&settings.settings(), config.minutes_per_step);
        let session = SessionState::new(durations);

        let controller = Self {
            inner: Arc::new(Shared {
                signals: TimerSignals::new(&session),
                state: Mutex::new(ControllerState {
                    session,
                    countdown: None,
                    generation: 0,
                    ticks: 0,
                }),
                hooks: RwLock::new(TimerHooks::default()),
                ledger: LedgerWriter::spawn(&runtime, db),
                settings,
                runtime,
                tick_interval: config.tick_interval,
                heartbeat_every_ticks: config.heartbeat_every_ticks().max(1),
                minutes_per_step: config.minutes_per_step,
                shutdown: CancellationToken::new(),
            }),
        };

        controller.watch_settings();
        Ok(controller)
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock_state().session.clone()
    }

    pub fn signals(&self) -> &TimerSignals {
        &self.inner.signals
    }

    pub fn start_focus(&self) {
        self.start_phase(Phase::Focus);
    }

    pub fn start_rest_timer(&self) {
        self.start_phase(Phase::ShortBreak);
    }

    pub fn start_long_break_timer(&self) {
        self.start_phase(Phase::LongBreak);
    }

    pub fn pause(&self) {
        let mut guard = self.lock_state();
        self.disarm(&mut guard);
        guard.session.pause();
        info!(
            "Paused {} with {}ms left",
            guard.session.phase.as_str(),
            guard.session.paused_ms
        );
        self.inner.signals.publish(&guard.session);
    }

    pub fn resume(&self) {
        let mut guard = self.lock_state();
        let Some((phase, seed_ms)) = guard.session.resume() else {
            // Either not paused, or paused with nothing running.
            self.inner.signals.publish(&guard.session);
            return;
        };
        info!("Resuming {} with {seed_ms}ms left", phase.as_str());
        self.arm(&mut guard, phase, seed_ms);
        self.inner.signals.publish(&guard.session);
    }

    pub fn skip(&self) {
        let mut guard = self.lock_state();
        self.disarm(&mut guard);
        let skipped = guard.session.phase;
        let next = guard.session.skip();
        info!("Skipped {}; starting {}", skipped.as_str(), next.as_str());
        let duration_ms = guard.session.begin(next);
        self.arm(&mut guard, next, duration_ms);
        self.inner.signals.publish(&guard.session);
    }

    pub fn reset(&self) {
        let mut guard = self.lock_state();
        self.disarm(&mut guard);
        guard.session.reset();
        info!("Timer reset");
        self.inner.signals.publish(&guard.session);
    }

    /// Persists the settings. New durations apply from the next `start_*`,
    /// skip or natural transition on.
    pub fn save_settings(&self, settings: Settings) -> Result<(), PersistenceError> {
        self.inner
            .settings
            .save_settings(settings)
            .map_err(PersistenceError::from_settings)?;
        self.apply_settings(&settings);
        Ok(())
    }

    pub fn save_volume(&self, volume: f32) -> Result<(), PersistenceError> {
        self.inner
            .settings
            .save_volume(volume)
            .map_err(PersistenceError::from_settings)
    }

    pub fn save_dark_theme(&self, dark_theme: bool) -> Result<(), PersistenceError> {
        self.inner
            .settings
            .save_dark_theme(dark_theme)
            .map_err(PersistenceError::from_settings)
    }

    /// Adds minutes to today's ledger record, creating it if needed. The
    /// write happens in the background.
    pub fn upsert(&self, focus_minutes: i64, rest_minutes: i64, rounds: i64) {
        self.inner.ledger.record(
            today_key(),
            DurationDelta {
                focus_minutes,
                rest_minutes,
                rounds,
            },
        );
    }

    /// Waits for queued ledger writes to be applied.
    pub async fn flush_ledger(&self) -> Result<()> {
        self.inner.ledger.flush().await
    }

    pub fn set_on_finish_focus(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.write_hooks().on_finish_focus = Some(Arc::new(hook));
    }

    pub fn set_on_tick_rest(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.write_hooks().on_tick_rest = Some(Arc::new(hook));
    }

    pub fn set_on_finish_rest(&self, hook: impl Fn() + Send + Sync + 'static) {
        self.write_hooks().on_finish_rest = Some(Arc::new(hook));
    }

    /// Cancels the armed countdown and the settings subscription, then waits
    /// for pending ledger writes.
    pub async fn shutdown(&self) {
        {
            let mut guard = self.lock_state();
            self.disarm(&mut guard);
        }
        self.inner.shutdown.cancel();

        if let Err(err) = self.inner.ledger.flush().await {
            warn!("Ledger flush on shutdown failed: {err}");
        }
        info!("Timer controller shut down");
    }

    fn start_phase(&self, phase: Phase) {
        let mut guard = self.lock_state();
        let duration_ms = guard.session.begin(phase);
        info!("Starting {} for {}s", phase.as_str(), duration_ms / 1000);
        self.arm(&mut guard, phase, duration_ms);
        self.inner.signals.publish(&guard.session);
    }

    fn arm(&self, guard: &mut ControllerState, phase: Phase, duration_ms: u64) {
        self.disarm(guard);
        guard.ticks = 0;
        let listener = PhaseListener {
            controller: Arc::downgrade(&self.inner),
            generation: guard.generation,
            phase,
        };
        guard.countdown = Some(Countdown::spawn(
            &self.inner.runtime,
            Duration::from_millis(duration_ms),
            self.inner.tick_interval,
            listener,
        ));
    }

    fn disarm(&self, guard: &mut ControllerState) {
        if let Some(countdown) = guard.countdown.take() {
            countdown.cancel();
        }
        guard.generation = guard.generation.wrapping_add(1);
    }

    fn handle_tick(&self, generation: u64, phase: Phase, remaining: Duration) {
        {
            let mut guard = self.lock_state();
            if guard.generation != generation {
                return;
            }
            let secs = remaining.as_millis() as u64 / 1000;
            guard.session.set_remaining_secs(phase, secs);

            guard.ticks = guard.ticks.wrapping_add(1);
            if guard.ticks % self.inner.heartbeat_every_ticks == 0 {
                debug!(
                    "{} heartbeat: {secs}s left, {} rounds finished",
                    phase.as_str(),
                    guard.session.finished_count
                );
            }
            self.inner.signals.publish(&guard.session);
        }

        if phase.is_break() {
            self.fire(|hooks| hooks.on_tick_rest.clone());
        }
    }

    /// Hooks see the phase that just ended, before the count moves and the
    /// next phase is armed. A command issued from a hook supersedes the
    /// automatic transition.
    fn handle_finish(&self, generation: u64, phase: Phase) {
        if self.lock_state().generation != generation {
            return;
        }

        match phase {
            Phase::Focus => self.fire(|hooks| hooks.on_finish_focus.clone()),
            Phase::ShortBreak | Phase::LongBreak => {
                self.fire(|hooks| hooks.on_finish_rest.clone())
            }
            Phase::Idle => {}
        }

        let mut guard = self.lock_state();
        if guard.generation != generation {
            return;
        }
        let completion = guard.session.complete(phase);
        info!(
            "Finished {} ({} rounds done); next up {}",
            phase.as_str(),
            guard.session.finished_count,
            completion.next.as_str()
        );

        if let Some(delta) = completion.ledger {
            self.inner.ledger.record(today_key(), delta);
        }

        let duration_ms = guard.session.begin(completion.next);
        self.arm(&mut guard, completion.next, duration_ms);
        self.inner.signals.publish(&guard.session);
    }

    fn apply_settings(&self, settings: &Settings) {
        let durations = PhaseDurations::from_settings(settings, self.inner.minutes_per_step);
        let mut guard = self.lock_state();
        if guard.session.durations != durations {
            info!(
                "Phase durations now focus {}s, break {}s, long break {}s, {} rounds",
                durations.focus_ms / 1000,
                durations.break_ms / 1000,
                durations.long_break_ms / 1000,
                durations.rounds
            );
            guard.session.durations = durations;
        }
    }

    // Picks up saves made directly on the store, e.g. `reload()`.
    fn watch_settings(&self) {
        let mut settings_rx = self.inner.settings.observe_settings();
        let token = self.inner.shutdown.clone();
        let shared = Arc::downgrade(&self.inner);

        self.inner.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = settings_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let settings = *settings_rx.borrow_and_update();
                        let Some(controller) = upgrade(&shared) else {
                            break;
                        };
                        controller.apply_settings(&settings);
                    }
                }
            }
        });
    }

    fn fire(&self, pick: impl FnOnce(&TimerHooks) -> Option<Hook>) {
        let hook = {
            let hooks = self
                .inner
                .hooks
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            pick(&hooks)
        };
        if let Some(hook) = hook {
            hook();
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_hooks(&self) -> RwLockWriteGuard<'_, TimerHooks> {
        self.inner.hooks.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn upgrade(shared: &Weak<Shared>) -> Option<PomodoroController> {
    shared.upgrade().map(|inner| PomodoroController { inner })
}

struct PhaseListener {
    controller: Weak<Shared>,
    generation: u64,
    phase: Phase,
}

impl CountdownListener for PhaseListener {
    fn on_tick(&self, remaining: Duration) {
        if let Some(controller) = upgrade(&self.controller) {
            controller.handle_tick(self.generation, self.phase, remaining);
        }
    }

    fn on_finish(&self) {
        if let Some(controller) = upgrade(&self.controller) {
            controller.handle_finish(self.generation, self.phase);
        }
    }
}

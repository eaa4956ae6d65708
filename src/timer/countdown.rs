use std::time::Duration;

use tokio::{
    runtime::Handle,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

/// Receives the ticks of a [`Countdown`]. Calls arrive from the countdown's
/// own task, one at a time.
pub trait CountdownListener: Send + Sync + 'static {
    fn on_tick(&self, remaining: Duration);
    fn on_finish(&self);
}

/// A cancellable countdown that ticks immediately, then once per interval,
/// and finishes once when the deadline passes.
///
/// Dropping the handle cancels it.
pub struct Countdown {
    token: CancellationToken,
}

impl Countdown {
    pub fn spawn<L>(runtime: &Handle, total: Duration, interval: Duration, listener: L) -> Self
    where
        L: CountdownListener,
    {
        let token = CancellationToken::new();
        let start = Instant::now();
        let interval = interval.max(Duration::from_millis(1));

        runtime.spawn(run(start, total, interval, listener, token.clone()));

        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run<L: CountdownListener>(
    start: Instant,
    total: Duration,
    interval: Duration,
    listener: L,
    token: CancellationToken,
) {
    let deadline = start + total;
    let expiry = time::sleep_until(deadline);
    tokio::pin!(expiry);
    let mut ticker = time::interval_at(start, interval);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = &mut expiry => {
                if !token.is_cancelled() {
                    listener.on_finish();
                }
                return;
            }
            _ = ticker.tick() => {
                listener.on_tick(deadline.saturating_duration_since(Instant::now()));
            }
        }
    }
}

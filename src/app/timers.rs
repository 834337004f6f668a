use std::future::Future;
use std::time::Duration;

use async_channel::Sender;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::state::SessionEvent;

pub(crate) const PROGRESS_INTERVAL: Duration = Duration::from_millis(300);
pub(crate) const PROGRESS_STEP: u8 = 10;
pub(crate) const PROGRESS_CAP: u8 = 90;
pub(crate) const BANNER_LIFETIME: Duration = Duration::from_secs(5);
pub(crate) const CHECKMARK_LIFETIME: Duration = Duration::from_secs(2);

/// A spawned timer task, aborted when the guard is dropped.
pub(crate) struct TimerGuard(JoinHandle<()>);

impl TimerGuard {
    pub(crate) fn spawn<F>(runtime: &Handle, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(runtime.spawn(task))
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One-shot timer that can be re-armed. Only the expiry of the latest arming
/// counts.
#[derive(Default)]
pub(crate) struct Countdown {
    epoch: u64,
    guard: Option<TimerGuard>,
}

impl Countdown {
    pub(crate) fn arm(
        &mut self,
        runtime: &Handle,
        delay: Duration,
        sender: &Sender<SessionEvent>,
        event: fn(u64) -> SessionEvent,
    ) {
        self.epoch += 1;
        let epoch = self.epoch;
        let sender = sender.clone();
        self.guard = Some(TimerGuard::spawn(runtime, async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(event(epoch)).await;
        }));
    }

    pub(crate) fn disarm(&mut self) {
        self.epoch += 1;
        self.guard = None;
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.guard.is_some()
    }

    /// Returns true when `epoch` is the live arming, which is then consumed.
    pub(crate) fn expire(&mut self, epoch: u64) -> bool {
        if self.guard.is_some() && epoch == self.epoch {
            self.guard = None;
            return true;
        }
        false
    }
}

/// Repeating tick that drives the simulated progress bar of request `token`.
pub(crate) fn progress_simulator(
    runtime: &Handle,
    sender: Sender<SessionEvent>,
    token: u64,
) -> TimerGuard {
    TimerGuard::spawn(runtime, async move {
        let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if sender.send(SessionEvent::ProgressTick { token }).await.is_err() {
                break;
            }
        }
    })
}

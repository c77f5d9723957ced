//! Background polling loops.
//!
//! A poller runs one check immediately and then on every interval tick
//! until its [`PollerHandle`] is stopped or dropped.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Owns a running poller. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct PollerHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        // Drop does the abort.
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!(poller = self.name, "Poller stopped");
        }
        self.handle.abort();
    }
}

/// Spawn a loop calling `check` every `every`, starting now.
pub fn spawn_poller<F, Fut>(name: &'static str, every: Duration, mut check: F) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        info!(poller = name, "Poller started, every {}s", every.as_secs());
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            check().await;
        }
    });
    PollerHandle { name, handle }
}

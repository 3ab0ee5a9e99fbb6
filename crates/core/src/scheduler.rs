use crate::error::{AgentError, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Lifecycle of a [`Scheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Runs a unit of work, then waits `interval` or until stopped, in a loop.
///
/// Each tick runs on the blocking thread pool. The wait starts once the tick
/// returns, so a slow tick delays the next one instead of overlapping it. A
/// stop request is observed at the next wait.
pub struct Scheduler {
    name: String,
    interval: Duration,
    cancellation_token: CancellationToken,
    state: Arc<watch::Sender<SchedulerState>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new<N: Into<String>>(name: N, interval: Duration) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            name: name.into(),
            interval,
            cancellation_token: CancellationToken::new(),
            state: Arc::new(state),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Spawn the tick loop on the current tokio runtime
    pub fn start<F>(&mut self, mut on_tick: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let state = self.state();
        if state != SchedulerState::Idle {
            return Err(AgentError::scheduler(format!(
                "{} cannot be started while {:?}",
                self.name, state
            )));
        }

        self.state.send_replace(SchedulerState::Running);

        let name = self.name.clone();
        let interval = self.interval;
        let token = self.cancellation_token.clone();
        let state = self.state.clone();

        self.handle = Some(tokio::spawn(async move {
            debug!(scheduler = %name, ?interval, "Scheduler started");
            while !token.is_cancelled() {
                // Ticks do blocking host I/O, keep them off the runtime workers
                let tick = task::spawn_blocking(move || {
                    let result = panic::catch_unwind(AssertUnwindSafe(&mut on_tick));
                    (on_tick, result)
                });

                match tick.await {
                    Ok((returned, result)) => {
                        on_tick = returned;
                        if let Err(payload) = result {
                            error!(scheduler = %name, reason = panic_message(payload.as_ref()), "Tick panicked");
                        }
                    }
                    Err(e) => {
                        error!(scheduler = %name, error = %e, "Tick task failed");
                        break;
                    }
                }

                select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            state.send_replace(SchedulerState::Stopped);
            debug!(scheduler = %name, "Scheduler stopped");
        }));

        Ok(())
    }

    /// Request the loop to stop at its next wait point
    pub fn stop(&self) {
        if self.cancellation_token.is_cancelled() {
            return;
        }

        trace!(scheduler = %self.name, "Stopping scheduler");
        self.cancellation_token.cancel();
        self.state.send_modify(|state| {
            *state = match *state {
                SchedulerState::Idle => SchedulerState::Stopped,
                SchedulerState::Running => SchedulerState::Stopping,
                other => other,
            }
        });
    }

    /// Wait for the loop task to finish
    pub async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| AgentError::scheduler(format!("{} task failed: {}", self.name, e)))?;
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.stop();
        self.join().await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

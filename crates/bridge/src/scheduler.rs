//! Poll loop with a single-flight guard.
//!
//! [`BridgeScheduler`] keeps its [`BridgeState`] in a `watch` channel. A
//! tick only proceeds when it moves the state from `Idle` to `Polling`, so
//! overlapping ticks never claim or process work concurrently.

use std::time::Duration;

use kitforge_core::scripting::ScriptExecutor;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::processor::{JobOutcome, JobProcessor};
use crate::source::InstructionSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Polling,
    Processing,
}

/// Counts for one processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was still running.
    Skipped,
    /// Nothing was claimed, or the claim request failed.
    Idle,
    Processed(BatchReport),
}

/// Puts the state back to `Idle` when a tick ends, including when the tick
/// future is dropped early.
struct IdleOnDrop<'a>(&'a watch::Sender<BridgeState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(BridgeState::Idle);
    }
}

pub struct BridgeScheduler<S, E> {
    processor: JobProcessor<S, E>,
    batch_size: i64,
    poll_interval: Duration,
    state: watch::Sender<BridgeState>,
}

impl<S: InstructionSource, E: ScriptExecutor> BridgeScheduler<S, E> {
    pub fn new(processor: JobProcessor<S, E>, batch_size: i64, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(BridgeState::Idle);
        Self {
            processor,
            batch_size,
            poll_interval,
            state,
        }
    }

    pub fn processor(&self) -> &JobProcessor<S, E> {
        &self.processor
    }

    pub fn state(&self) -> BridgeState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BridgeState> {
        self.state.subscribe()
    }

    /// Claim one batch and process it job by job.
    pub async fn tick(&self) -> TickOutcome {
        let acquired = self.state.send_if_modified(|state| {
            if *state == BridgeState::Idle {
                *state = BridgeState::Polling;
                true
            } else {
                false
            }
        });
        if !acquired {
            tracing::debug!(state = ?self.state(), "Previous tick still running, skipping");
            return TickOutcome::Skipped;
        }
        let _idle = IdleOnDrop(&self.state);

        let jobs = match self.processor.source().claim_pending(self.batch_size).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(error = %e, "Failed to claim instructions");
                return TickOutcome::Idle;
            }
        };
        if jobs.is_empty() {
            return TickOutcome::Idle;
        }

        self.state.send_replace(BridgeState::Processing);
        tracing::info!(count = jobs.len(), "Claimed instructions");

        let mut report = BatchReport::default();
        for job in &jobs {
            match self.processor.process(job).await {
                JobOutcome::Completed { .. } => report.completed += 1,
                JobOutcome::Failed { .. } => report.failed += 1,
            }
        }

        tracing::info!(
            completed = report.completed,
            failed = report.failed,
            "Batch finished"
        );
        TickOutcome::Processed(report)
    }

    /// Tick on the poll interval until `cancel` fires. A tick in progress
    /// finishes before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "Bridge scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Bridge scheduler cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}

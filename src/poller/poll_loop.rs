use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::clock::{Clock, SystemClock};
use super::context::PollContext;
use crate::lights::LightBoard;
use crate::window::AggregateState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Running,
    Stopped,
}

impl PollPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollPhase::Idle => "idle",
            PollPhase::Running => "running",
            PollPhase::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    MaxRuntimeElapsed,
}

pub struct PollLoop<C: Clock = SystemClock> {
    context: PollContext,
    clock: C,
    phase: PollPhase,
    ticks: u64,
}

impl PollLoop<SystemClock> {
    pub fn new(context: PollContext) -> Self {
        Self::with_clock(context, SystemClock)
    }
}

impl<C: Clock> PollLoop<C> {
    pub fn with_clock(context: PollContext, clock: C) -> Self {
        Self {
            context,
            clock,
            phase: PollPhase::Idle,
            ticks: 0,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn context(&self) -> &PollContext {
        &self.context
    }

    /// One cycle at `now`: classify, aggregate, apply. A failed light write
    /// is logged and left for the next tick to retry.
    pub fn tick_at(&mut self, now: DateTime<Utc>, board: &mut LightBoard) -> AggregateState {
        self.ticks += 1;
        let local_now = now.with_timezone(&self.context.reference_zone());
        debug!("Tick {} at {}", self.ticks, local_now.format("%Y-%m-%d %I:%M:%S %p"));

        for status in self.context.statuses(&local_now) {
            trace!(
                "Meeting {:?}: start {}, end {}, starts in {}m, signals {}",
                status.meeting.subject(),
                status.meeting.start().format("%I:%M %p"),
                status.meeting.end().format("%I:%M %p"),
                status.until_start.num_minutes(),
                status.signals
            );
        }

        let state = self.context.evaluate(&local_now);
        if let Err(e) = board.apply(state) {
            warn!("Failed to apply {} this tick: {}", state, e);
        }
        state
    }

    /// Run until `cancel` fires or the runtime bound elapses, then switch
    /// every light off.
    ///
    /// The clock only decides what each tick shows. Runtime is measured on
    /// the monotonic timer, so a wall-clock jump cannot end the run early.
    pub async fn run(
        &mut self,
        board: &mut LightBoard,
        cancel: &CancellationToken,
    ) -> Result<StopReason> {
        if self.phase != PollPhase::Idle {
            bail!("Poll loop cannot start while {}", self.phase.as_str());
        }

        self.phase = PollPhase::Running;
        let interval = self.context.poll_interval();
        let max_runtime = self.context.max_runtime();
        let started = Instant::now();
        info!(
            "Watching {} meeting(s), polling every {}s{}",
            self.context.meetings().len(),
            interval.as_secs_f64(),
            max_runtime
                .map(|max| format!(", stopping after {}m", max.as_secs() / 60))
                .unwrap_or_default()
        );

        let mut now = self.clock.now();
        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            self.tick_at(now, board);

            if let Some(max) = max_runtime {
                if started.elapsed() >= max {
                    break StopReason::MaxRuntimeElapsed;
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = tokio::time::sleep(interval) => {}
            }
            now = self.clock.now();
        };

        self.phase = PollPhase::Stopped;
        if let Err(e) = board.shutdown() {
            error!("Failed to switch lights off: {}", e);
        }
        info!("Poll loop stopped after {} tick(s): {:?}", self.ticks, reason);
        Ok(reason)
    }
}

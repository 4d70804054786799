//! The session loop: repeated steps under pause, stop, pace, and bounds.
//!
//! [`run_simulation`] wraps the single-step [`run_step`] with the control
//! plane from [`SimulationControl`]:
//!
//! - **Bounded runs**: stop after `max_steps` or `max_real_time_seconds`
//! - **Pause/resume**: the loop sleeps until resumed, no time passes
//! - **Variable pace**: the pause between steps is adjustable at runtime
//! - **Clean stop**: a requested stop takes effect between steps
//!
//! After each step a [`StepCallback`] sees the summary and the context.
//! [`SnapshotPublisher`] is the usual callback: it publishes a
//! [`SimulationSnapshot`] on a `watch` channel so readers on other tasks
//! never touch mutable state.
//!
//! [`run_step`]: crate::step::run_step

use std::sync::Arc;

use marsim_types::SimulationSnapshot;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::SimulationContext;
use crate::control::{SimulationControl, SimulationEndReason};
use crate::step::{self, StepError, StepSummary};

/// Errors that can occur during a session.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A step failed.
    #[error("step error: {source}")]
    Step {
        /// The underlying step error.
        #[from]
        source: StepError,
    },
}

/// How a session ended.
#[derive(Debug)]
pub struct SimulationResult {
    /// Why the loop stopped.
    pub end_reason: SimulationEndReason,
    /// The last step summary, if any step ran.
    pub final_summary: Option<StepSummary>,
    /// Steps executed by this run.
    pub total_steps: u64,
}

/// Called after each completed step.
pub trait StepCallback: Send {
    /// Called with the step summary and the state it left behind.
    fn on_step(&mut self, summary: &StepSummary, ctx: &SimulationContext);
}

/// A callback that does nothing.
pub struct NoOpCallback;

impl StepCallback for NoOpCallback {
    fn on_step(&mut self, _summary: &StepSummary, _ctx: &SimulationContext) {}
}

/// Publishes a fresh [`SimulationSnapshot`] after every step.
#[derive(Debug)]
pub struct SnapshotPublisher {
    sender: watch::Sender<SimulationSnapshot>,
}

impl SnapshotPublisher {
    /// Create a publisher seeded with the context's current state, and a
    /// receiver for it. More receivers come from [`subscribe`](Self::subscribe).
    pub fn new(ctx: &SimulationContext) -> (Self, watch::Receiver<SimulationSnapshot>) {
        let (sender, receiver) = watch::channel(ctx.snapshot());
        (Self { sender }, receiver)
    }

    /// Another receiver of the published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SimulationSnapshot> {
        self.sender.subscribe()
    }
}

impl StepCallback for SnapshotPublisher {
    fn on_step(&mut self, _summary: &StepSummary, ctx: &SimulationContext) {
        // No receivers left is not an error; the loop keeps running.
        self.sender.send_replace(ctx.snapshot());
    }
}

/// Run steps of `step_millisols` until a stop condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a step fails.
pub async fn run_simulation(
    ctx: &mut SimulationContext,
    step_millisols: f64,
    control: &Arc<SimulationControl>,
    callback: &mut dyn StepCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<StepSummary> = None;
    let mut total_steps: u64 = 0;

    info!(
        step_millisols,
        max_steps = control.max_steps(),
        max_real_time_seconds = control.max_real_time_seconds(),
        step_interval_ms = control.step_interval_ms(),
        mars = %ctx.clock.mars_time(),
        earth = %ctx.clock.earth_time(),
        "Simulation starting"
    );

    loop {
        // --- Check pause ---
        if control.is_paused() {
            info!("Simulation paused, waiting for resume...");
            control.wait_if_paused().await;
            info!("Simulation resumed");
        }

        // --- Check stop request (before step) ---
        if control.is_stop_requested() {
            info!("Stop requested");
            return finish(control, SimulationEndReason::StopRequested, last_summary, total_steps)
                .await;
        }

        // --- Check time limit (before step) ---
        if control.time_limit_reached() {
            info!(
                max_seconds = control.max_real_time_seconds(),
                elapsed = control.elapsed_seconds(),
                "Real-time limit reached"
            );
            return finish(
                control,
                SimulationEndReason::MaxRealTimeReached,
                last_summary,
                total_steps,
            )
            .await;
        }

        // --- Execute step ---
        // Paused between the check above and the clock advance.
        let Some(summary) = step::run_step(ctx, step_millisols)? else {
            continue;
        };
        total_steps = total_steps.saturating_add(1);

        // --- Notify callback ---
        callback.on_step(&summary, ctx);

        // --- Check step limit (after step) ---
        if control.step_limit_reached(summary.step) {
            info!(
                step = summary.step,
                max_steps = control.max_steps(),
                "Step limit reached"
            );
            return finish(
                control,
                SimulationEndReason::MaxStepsReached,
                Some(summary),
                total_steps,
            )
            .await;
        }

        last_summary = Some(summary);

        // --- Sleep for step interval ---
        let interval_ms = control.step_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

async fn finish(
    control: &SimulationControl,
    reason: SimulationEndReason,
    final_summary: Option<StepSummary>,
    total_steps: u64,
) -> Result<SimulationResult, RunnerError> {
    control.set_end_reason(reason.clone()).await;
    Ok(SimulationResult {
        end_reason: reason,
        final_summary,
        total_steps,
    })
}

/// Log how a session ended.
pub fn log_simulation_end(result: &SimulationResult, ctx: &SimulationContext) {
    info!(
        reason = ?result.end_reason,
        total_steps = result.total_steps,
        mars = %ctx.clock.mars_time(),
        earth = %ctx.clock.earth_time(),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            step = summary.step,
            sol = summary.sol,
            agents = summary.agents_acted,
            missions_active = summary.missions_active,
            missions_ended = ctx.missions.ended().count(),
            "Final step summary"
        );
    } else {
        warn!("Simulation ended with no steps executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marsim_agents::{AgentManager, AgentSeed};
    use marsim_types::{JobKind, RoleType};
    use marsim_world::Settlement;

    use super::*;
    use crate::config::{SessionConfig, SimulationConfig};

    fn session(max_steps: u64) -> (SimulationContext, Arc<SimulationControl>) {
        let mut ctx = SimulationContext::from_config(&SimulationConfig::default()).unwrap();
        let mut settlement = Settlement::new("Schiaparelli Point");
        settlement
            .add_building("Lander Hab", &ctx.rules.buildings)
            .unwrap();
        let base = ctx.add_settlement(settlement);
        let seed = AgentSeed {
            name: "Reyes".to_owned(),
            role: RoleType::Commander,
            job: Some(JobKind::Engineer),
        };
        let agent = AgentManager::new()
            .create_person(&seed, base, 1, &mut ctx.rng)
            .unwrap();
        ctx.add_agent(agent).unwrap();

        let config = SessionConfig {
            max_steps,
            step_interval_ms: 0,
            ..SessionConfig::default()
        };
        let control = Arc::new(SimulationControl::new(ctx.clock.control(), &config));
        (ctx, control)
    }

    #[tokio::test]
    async fn runs_until_the_step_limit() {
        let (mut ctx, control) = session(5);
        let result = run_simulation(&mut ctx, 10.0, &control, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxStepsReached);
        assert_eq!(result.total_steps, 5);
        assert_eq!(result.final_summary.unwrap().step, 5);
        assert!((ctx.clock.elapsed() - 50.0).abs() < 1e-9);
        assert_eq!(
            control.end_reason().await,
            Some(SimulationEndReason::MaxStepsReached)
        );
    }

    #[tokio::test]
    async fn a_stop_before_the_first_step_runs_nothing() {
        let (mut ctx, control) = session(0);
        control.request_stop();
        let result = run_simulation(&mut ctx, 10.0, &control, &mut NoOpCallback)
            .await
            .unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::StopRequested);
        assert_eq!(result.total_steps, 0);
        assert!(result.final_summary.is_none());
        assert_eq!(ctx.steps(), 0);
        log_simulation_end(&result, &ctx);
    }

    #[tokio::test]
    async fn snapshots_are_published_every_step() {
        let (mut ctx, control) = session(3);
        let (mut publisher, mut receiver) = SnapshotPublisher::new(&ctx);
        assert_eq!(receiver.borrow_and_update().step, 0);

        run_simulation(&mut ctx, 500.0, &control, &mut publisher)
            .await
            .unwrap();
        assert!(receiver.has_changed().unwrap());
        let snapshot = receiver.borrow_and_update().clone();
        assert_eq!(snapshot.step, 3);
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.clock.mars_timestamp, "15-Adir-02:500.000");
        assert_eq!(publisher.subscribe().borrow().step, 3);
    }

    #[tokio::test]
    async fn a_paused_session_waits_for_resume() {
        let (mut ctx, control) = session(2);
        control.pause();
        let resumer = {
            let control = Arc::clone(&control);
            tokio::spawn(async move {
                tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
                control.resume();
            })
        };
        let result = run_simulation(&mut ctx, 10.0, &control, &mut NoOpCallback)
            .await
            .unwrap();
        resumer.await.unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxStepsReached);
        assert!((ctx.clock.elapsed() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn resuming_through_the_clock_handle_restarts_the_loop() {
        let (mut ctx, control) = session(3);
        let clock = ctx.clock.control();
        control.pause();
        let resumer = tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            clock.set_paused(false);
        });
        let mut callback = NoOpCallback;
        let run = run_simulation(&mut ctx, 10.0, &control, &mut callback);
        let result = tokio::time::timeout(tokio::time::Duration::from_secs(2), run)
            .await
            .unwrap()
            .unwrap();
        resumer.await.unwrap();
        assert_eq!(result.end_reason, SimulationEndReason::MaxStepsReached);
        assert_eq!(result.total_steps, 3);
        assert!(!ctx.clock.is_paused());
    }
}

//! Periodic scheduler: one named thread per engine.
//!
//! The thread `select!`s over a ticker, a trigger channel, and a stop channel.
//! Passes never overlap. A tick that fired while a pass was running (or while
//! a manual action held the engine lock) is dropped and counted, never queued.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, tick};
use tracing::{debug, info};

use super::cycle::{AutomationEngine, PassSummary};
use crate::core::errors::{Result, SentinelError};

/// Handle to a running engine. Dropping it stops the engine.
pub struct EngineHandle {
    engine: Arc<AutomationEngine>,
    stop_tx: Option<Sender<()>>,
    trigger_tx: Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn engine(&self) -> &Arc<AutomationEngine> {
        &self.engine
    }

    /// Request an immediate pass. Coalesces with one already requested.
    pub fn trigger(&self) {
        match self.trigger_tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                debug!(protocol = self.engine.name(), "trigger after stop ignored");
            }
        }
    }

    /// Stop between passes and wait for the thread. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the `select!`.
        self.stop_tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the scheduler thread for `engine`.
pub fn start(engine: Arc<AutomationEngine>) -> Result<EngineHandle> {
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let (trigger_tx, trigger_rx) = bounded::<()>(1);
    let worker = Arc::clone(&engine);
    let join = thread::Builder::new()
        .name(format!("sentinel-{}", engine.name()))
        .spawn(move || scheduler_main(&worker, &stop_rx, &trigger_rx))
        .map_err(|e| SentinelError::Runtime {
            details: format!("failed to spawn scheduler for {}: {e}", engine.name()),
        })?;

    Ok(EngineHandle {
        engine,
        stop_tx: Some(stop_tx),
        trigger_tx,
        join: Some(join),
    })
}

impl AutomationEngine {
    /// Start this engine's scheduler.
    pub fn start(self: &Arc<Self>) -> Result<EngineHandle> {
        start(Arc::clone(self))
    }
}

fn scheduler_main(engine: &AutomationEngine, stop_rx: &Receiver<()>, trigger_rx: &Receiver<()>) {
    let protocol = engine.name();
    let interval = engine.profile().interval;
    info!(protocol, ?interval, "engine started");

    let ticker = tick(interval);
    let mut last_pass_end: Option<Instant> = None;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(trigger_rx) -> msg => {
                if msg.is_err() {
                    break;
                }
                report(protocol, engine.run_pass());
                last_pass_end = Some(Instant::now());
            }
            recv(ticker) -> fired => {
                let Ok(fired_at) = fired else { break };
                // Buffered tick that fired during the previous pass.
                if last_pass_end.is_some_and(|end| fired_at < end) {
                    engine.note_coalesced();
                    continue;
                }
                if let Some(result) = engine.try_run_pass() {
                    report(protocol, result);
                    last_pass_end = Some(Instant::now());
                }
            }
        }
    }

    info!(protocol, cycles = engine.cycle_count(), "engine stopped");
}

fn report(protocol: &str, result: Result<PassSummary>) {
    match result {
        Ok(summary) => debug!(
            protocol,
            cycle = summary.cycle,
            reports = summary.reports,
            anomalies = summary.anomalies,
            failed = summary.actions_failed,
            "pass complete"
        ),
        // Already logged at warn by the engine.
        Err(err) => debug!(protocol, code = err.code(), "pass aborted"),
    }
}

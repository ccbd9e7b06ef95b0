//! Supervisor: one engine per enabled protocol, signal polling, state file,
//! and ordered shutdown.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use super::signals::{ShutdownCoordinator, SignalHandler};
use super::state_file::StateWriter;
use crate::authority::AuthorityClient;
use crate::authority::sealer::PayloadSealer;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::engine::{AutomationEngine, EngineHandle};
use crate::ledger::LedgerRecorder;
use crate::protocols::ProtocolProfile;

/// How often the supervisor loop checks signals.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Runs every enabled protocol until shutdown is requested.
pub struct Supervisor {
    config_hash: String,
    engines: Vec<Arc<AutomationEngine>>,
    ledger: Arc<dyn LedgerRecorder>,
    signals: SignalHandler,
    state: StateWriter,
    poll_interval: Duration,
}

impl Supervisor {
    /// Build one engine per enabled protocol.
    ///
    /// `authority_factory` is called once per protocol; returning the same
    /// shared client for every protocol is fine.
    pub fn new<F>(
        config: &Config,
        authority_factory: F,
        ledger: Arc<dyn LedgerRecorder>,
        sealer: Arc<dyn PayloadSealer>,
    ) -> Result<Self>
    where
        F: Fn(&ProtocolProfile) -> Result<Arc<dyn AuthorityClient>>,
    {
        let engines = config
            .enabled_profiles()
            .into_iter()
            .map(|profile| {
                let authority = authority_factory(&profile)?;
                Ok(Arc::new(AutomationEngine::new(
                    profile,
                    authority,
                    Arc::clone(&ledger),
                    Arc::clone(&sealer),
                )))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config_hash: config.stable_hash()?,
            engines,
            ledger,
            signals: SignalHandler::new(),
            state: StateWriter::new(config.paths.state_file.clone()),
            poll_interval: POLL_INTERVAL,
        })
    }

    /// Replace the OS-registered signal handler (tests, embedding).
    #[must_use]
    pub fn with_signals(mut self, signals: SignalHandler) -> Self {
        self.signals = signals;
        self
    }

    #[must_use]
    pub fn with_state_writer(mut self, state: StateWriter) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn engines(&self) -> &[Arc<AutomationEngine>] {
        &self.engines
    }

    /// Engine of one protocol, by name.
    pub fn engine(&self, name: &str) -> Option<&Arc<AutomationEngine>> {
        self.engines.iter().find(|e| e.name() == name)
    }

    pub fn signals(&self) -> &SignalHandler {
        &self.signals
    }

    /// Start every engine and block until shutdown is requested.
    pub fn run(&mut self) -> Result<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            config_hash = %self.config_hash,
            protocols = self.engines.len(),
            "supervisor starting"
        );

        let handles = self
            .engines
            .iter()
            .map(AutomationEngine::start)
            .collect::<Result<Vec<EngineHandle>>>()?;

        loop {
            if self.signals.should_shutdown() {
                info!("shutdown requested");
                break;
            }
            if self.signals.should_trigger() {
                info!("immediate pass requested");
                for handle in &handles {
                    handle.trigger();
                }
            }
            self.state
                .maybe_write(&self.engines, &self.config_hash, self.ledger.appended());
            thread::sleep(self.poll_interval);
        }

        self.shutdown(handles);
        Ok(())
    }

    fn shutdown(&self, handles: Vec<EngineHandle>) {
        let handles = Mutex::new(handles);
        let stop_engines = || {
            for handle in handles.lock().iter_mut() {
                handle.stop();
            }
            true
        };
        let flush_ledger = || {
            self.ledger.flush();
            true
        };
        let write_state = || {
            self.state
                .write_now(&self.engines, &self.config_hash, self.ledger.appended())
                .is_ok()
        };

        let tasks: Vec<(&str, &dyn Fn() -> bool)> = vec![
            ("stop engines", &stop_engines),
            ("flush ledger", &flush_ledger),
            ("write state", &write_state),
        ];
        let clean = ShutdownCoordinator::new().execute(&tasks);
        info!(clean, "supervisor stopped");
    }
}

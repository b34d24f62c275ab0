//! Task-per-target group with a shared shutdown signal

use crate::collector::ProcessSource;
use crate::monitor::{MonitorSettings, ProcessMonitor, TargetState};
use chrono::Local;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

pub struct Supervisor {
    tasks: JoinSet<TargetState>,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    /// Open every target's logs, then start one monitor task per target.
    /// Nothing is spawned if any log cannot be created or a name repeats.
    pub fn spawn<S>(targets: &[String], settings: &MonitorSettings, source: Arc<S>) -> io::Result<Self>
    where
        S: ProcessSource + 'static,
    {
        let mut seen = HashSet::new();
        for name in targets {
            if !seen.insert(name.as_str()) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("process {:?} listed more than once", name),
                ));
            }
        }

        let now = Local::now();
        let monitors = targets
            .iter()
            .map(|name| ProcessMonitor::new(name, settings.clone(), Arc::clone(&source), now))
            .collect::<io::Result<Vec<_>>>()?;

        let (shutdown_tx, _) = watch::channel(false);
        let mut tasks = JoinSet::new();
        for monitor in monitors {
            let shutdown_rx = shutdown_tx.subscribe();
            tasks.spawn(monitor.run(shutdown_rx));
        }
        info!("Started {} monitor task(s)", tasks.len());
        Ok(Self { tasks, shutdown_tx })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every task to stop and wait for all of them.
    pub async fn shutdown(mut self) -> Vec<TargetState> {
        let _ = self.shutdown_tx.send(true);
        let mut finished = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(state) => {
                    info!("Monitor for {} stopped after {} cycles", state.name, state.cycles);
                    finished.push(state);
                }
                Err(e) => error!("Monitor task failed: {}", e),
            }
        }
        finished
    }
}

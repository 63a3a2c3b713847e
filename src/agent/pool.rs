// src/agent/pool.rs

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::agent::source::TaskSource;
use crate::agent::worker::{AgentOptions, WorkerStats, run_worker};
use crate::errors::{Error, Result};

/// A fixed set of workers sharing one task source.
#[derive(Debug)]
pub struct AgentPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl AgentPool {
    /// Spawn `options.workers` workers onto the current tokio runtime.
    pub fn spawn(source: Arc<dyn TaskSource>, options: AgentOptions) -> Self {
        let (shutdown, rx) = watch::channel(false);

        let handles = (0..options.workers)
            .map(|worker| {
                let source = Arc::clone(&source);
                let options = options.clone();
                let rx = rx.clone();
                tokio::spawn(run_worker(worker, source, options, rx))
            })
            .collect::<Vec<_>>();

        info!(workers = handles.len(), "agent pool started");
        Self { shutdown, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every worker and wait for them; returns the summed counters.
    pub async fn shutdown(self) -> Result<WorkerStats> {
        // Workers also stop when the receiver sees the sender dropped, so a
        // send error here is harmless.
        let _ = self.shutdown.send(true);

        let mut total = WorkerStats::default();
        for handle in self.handles {
            total += handle.await.map_err(Error::from)?;
        }

        debug!(?total, "agent pool stopped");
        Ok(total)
    }
}

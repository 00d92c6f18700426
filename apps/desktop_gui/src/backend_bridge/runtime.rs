//! Worker runtime backing the thread manager's jobs.

use std::sync::Arc;

use anyhow::Context;
use task_core::{Settings, TokioBlockingPool, WorkerPool};
use tokio::runtime::{Builder, Runtime};

pub struct WorkerRuntime {
    runtime: Runtime,
}

impl WorkerRuntime {
    pub fn build(settings: &Settings) -> anyhow::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name(settings.worker_thread_prefix.clone())
            .build()
            .context("failed to build backend runtime")?;
        Ok(Self { runtime })
    }

    pub fn pool(&self) -> Arc<dyn WorkerPool> {
        Arc::new(TokioBlockingPool::new(self.runtime.handle().clone()))
    }
}

//! Batch Runner
//!
//! Runs independent reels concurrently under a concurrency limit.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::info;

use super::cancel::CancellationToken;
use super::orchestrator::{PipelineOrchestrator, PipelineRun};
use crate::core::{CoreError, CoreResult, ReelConfig};

/// Concurrent driver for a list of reel configs
pub struct BatchRunner {
    orchestrator: Arc<PipelineOrchestrator>,
    max_concurrent: usize,
}

impl BatchRunner {
    /// Creates a runner allowing one run per CPU
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            orchestrator,
            max_concurrent: num_cpus::get().max(1),
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Runs every config and returns the runs in input order.
    ///
    /// Fails up front, without starting anything, when two configs would
    /// write the same output file.
    pub async fn run_all(
        &self,
        configs: &[ReelConfig],
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<PipelineRun>> {
        check_output_collisions(configs)?;
        info!(
            "Starting batch of {} runs ({} at a time)",
            configs.len(),
            self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let runs = configs.iter().map(|config| {
            let semaphore = semaphore.clone();
            async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let _permit = semaphore.acquire().await.ok();
                self.orchestrator.run(config, cancel).await
            }
        });

        Ok(join_all(runs).await)
    }
}

/// Rejects batches in which two configs share an output name
pub fn check_output_collisions(configs: &[ReelConfig]) -> CoreResult<()> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (index, config) in configs.iter().enumerate() {
        let key = config.output_name.trim().to_lowercase();
        if let Some(first) = seen.insert(key, index) {
            return Err(CoreError::InvalidInput(format!(
                "Configs {} and {} both write '{}'",
                first,
                index,
                config.output_name.trim()
            )));
        }
    }
    Ok(())
}

/*!
 * Batch translation processing.
 *
 * Batches run a fixed window of jobs at a time: each chunk is started
 * together, the batch waits for the whole chunk to settle, then moves on.
 * Results come back in input order and one job's failure never stops the
 * others.
 */

use futures::future::join_all;
use log::{debug, error};
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

/// Window used when none is configured
pub const DEFAULT_WINDOW: usize = 3;

/// Runs jobs in fixed-size concurrent windows
#[derive(Debug, Clone, Copy)]
pub struct BatchTranslator {
    /// Maximum number of jobs in flight at once
    window: usize,
}

impl Default for BatchTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl BatchTranslator {
    /// Create a batch runner; a zero window is treated as one
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1) }
    }

    /// The concurrency window
    pub fn window(&self) -> usize {
        self.window
    }

    /// Run `job` over every item, `window` at a time.
    ///
    /// `progress` is called with (completed, total) after each chunk settles.
    pub async fn run<I, T, E, F, Fut>(
        &self,
        items: &[I],
        job: F,
        progress: impl Fn(usize, usize),
    ) -> Vec<Result<T, E>>
    where
        F: Fn(&I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let start = Instant::now();

        for (chunk_index, chunk) in items.chunks(self.window).enumerate() {
            debug!("Starting batch chunk {} ({} jobs)", chunk_index + 1, chunk.len());
            let settled = join_all(chunk.iter().map(&job)).await;

            for (offset, result) in settled.iter().enumerate() {
                if let Err(e) = result {
                    error!("Batch item {} failed: {}", chunk_index * self.window + offset + 1, e);
                }
            }

            results.extend(settled);
            progress(results.len(), total);
        }

        debug!(
            "Batch of {} finished in {:?} ({} failed)",
            total,
            start.elapsed(),
            results.iter().filter(|r| r.is_err()).count()
        );
        results
    }
}

use std::{ops::AddAssign, sync::Arc};

use futures::future::try_join_all;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, trace, Instrument};

use crate::{
    appender::{DedupAppender, Submission},
    generator::{CandidateGenerator, Strategy},
};

/// Totals of submission outcomes over a run.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub recorded: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl AddAssign for PoolReport {
    fn add_assign(&mut self, rhs: Self) {
        self.recorded += rhs.recorded;
        self.duplicates += rhs.duplicates;
        self.failed += rhs.failed;
    }
}

/// A fixed number of independent producers, each generating candidates and offering them to
/// a shared [`DedupAppender`] until cancelled.
pub struct WorkerPool {
    handles: Vec<JoinHandle<PoolReport>>,
}

impl WorkerPool {
    /// Spawns `concurrency` workers, which run until `shutdown` is cancelled. The pool cancels
    /// `shutdown` itself once the appender reaches its target. Worker `n` seeds its RNG with
    /// `seed + n` when a seed is given.
    pub fn spawn(
        concurrency: usize,
        strategy: &Strategy,
        appender: &Arc<DedupAppender>,
        seed: Option<u64>,
        shutdown: &CancellationToken,
    ) -> Self {
        info!(concurrency, "Starting password generation");

        let handles = (0..concurrency)
            .map(|id| {
                let generator = if let Some(seed) = seed {
                    let seed = seed.wrapping_add(id as u64);
                    CandidateGenerator::with_seed(strategy.clone(), seed)
                } else {
                    CandidateGenerator::new(strategy.clone())
                };

                let worker = Worker {
                    generator,
                    appender: appender.clone(),
                    shutdown: shutdown.clone(),
                };

                tokio::spawn(worker.run().instrument(info_span!("worker", id)))
            })
            .collect();

        Self { handles }
    }

    /// Waits for every worker to exit.
    pub async fn join(self) -> Result<PoolReport, JoinError> {
        let mut report = PoolReport::default();

        for worker in try_join_all(self.handles).await? {
            report += worker;
        }

        Ok(report)
    }
}

struct Worker {
    generator: CandidateGenerator,
    appender: Arc<DedupAppender>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(mut self) -> PoolReport {
        let mut report = PoolReport::default();

        while !self.shutdown.is_cancelled() {
            let candidate = self.generator.next_candidate();

            match self.appender.submit(&candidate).await {
                Submission::Recorded => {
                    report.recorded += 1;

                    if self.appender.target_reached() && !self.shutdown.is_cancelled() {
                        info!("Reached target number of passwords, stopping");
                        self.shutdown.cancel();
                    }
                }
                Submission::TargetReached => self.shutdown.cancel(),
                Submission::Duplicate => {
                    trace!(%candidate, "Discarding duplicate password");
                    report.duplicates += 1;
                    tokio::task::yield_now().await;
                }
                Submission::Failed(e) => {
                    error!(%candidate, "Could not write password: {e}");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

//! Fixed-size worker pool that runs one extraction job per page.
//!
//! Every submitted job produces exactly one completion signal, whether it
//! succeeded, returned an error or panicked. The collector counts those
//! signals to drive progress; failures go to a separate sink that is drained
//! into the [`BatchReport`] once every worker has exited.

use std::any::Any;
use std::sync::Arc;

use anyhow::anyhow;
use indicatif::ProgressBar;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinError;

/// The extraction callback run for each page
pub type ExtractFn = dyn Fn(u32) -> anyhow::Result<()> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub page: u32,
}

/// Result of one supervised job
#[derive(Debug)]
pub enum JobOutcome {
    Completed,
    Failed(anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct JobFailure {
    pub worker_id: usize,
    pub page: u32,
    #[serde(serialize_with = "serialize_error")]
    pub error: anyhow::Error,
}

fn serialize_error<S: Serializer>(error: &anyhow::Error, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{error:#}"))
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub submitted: usize,
    /// Completion signals observed by the collector
    pub completed: usize,
    pub failures: Vec<JobFailure>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.submitted.saturating_sub(self.failures.len())
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Broken pipeline plumbing. Job failures never end up here; they are
/// recorded in the [`BatchReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("job queue closed before page {0} was submitted")]
    QueueClosed(u32),
    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

/// Receiver shared by several workers pulling from one channel.
pub struct SharedReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> SharedReceiver<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub async fn recv(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

/// Run `extract` once for every page on a pool of `workers` workers and wait
/// for all of them to finish.
///
/// Pages are submitted in the given order; completion order is whatever the
/// workers make of it. `progress` advances once per finished job.
pub async fn run<F>(
    pages: &[u32],
    workers: usize,
    extract: F,
    progress: ProgressBar,
) -> Result<BatchReport, PipelineError>
where
    F: Fn(u32) -> anyhow::Result<()> + Send + Sync + 'static,
{
    let total = pages.len();
    if total == 0 {
        return Ok(BatchReport::default());
    }
    let extract: Arc<ExtractFn> = Arc::new(extract);

    // Every channel holds the whole batch, so no producer ever waits
    let (job_tx, job_rx) = mpsc::channel::<Job>(total);
    let (failure_tx, mut failure_rx) = mpsc::channel::<JobFailure>(total);
    let (done_tx, mut done_rx) = mpsc::channel::<()>(total);

    let collector = tokio::spawn(async move {
        let mut completed = 0;
        while completed < total && done_rx.recv().await.is_some() {
            completed += 1;
            progress.inc(1);
        }
        completed
    });

    let jobs = SharedReceiver::new(job_rx);
    let handles: Vec<_> = (1..=workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                jobs.clone(),
                extract.clone(),
                failure_tx.clone(),
                done_tx.clone(),
            ))
        })
        .collect();
    drop(failure_tx);
    drop(done_tx);

    for &page in pages {
        job_tx
            .send(Job { page })
            .await
            .map_err(|_| PipelineError::QueueClosed(page))?;
    }
    // Closing the queue lets idle workers exit once it is drained
    drop(job_tx);

    for handle in handles {
        handle.await?;
    }
    let completed = collector.await?;

    failure_rx.close();
    let mut failures = Vec::new();
    while let Some(failure) = failure_rx.recv().await {
        failures.push(failure);
    }

    tracing::debug!(
        submitted = total,
        completed,
        failed = failures.len(),
        "Batch finished"
    );

    Ok(BatchReport {
        submitted: total,
        completed,
        failures,
    })
}

async fn worker(
    id: usize,
    jobs: SharedReceiver<Job>,
    extract: Arc<ExtractFn>,
    failures: mpsc::Sender<JobFailure>,
    done: mpsc::Sender<()>,
) {
    tracing::debug!(worker = id, "Extraction worker started");

    while let Some(job) = jobs.recv().await {
        match supervise(extract.clone(), job).await {
            JobOutcome::Completed => {
                tracing::debug!(worker = id, page = job.page, "Page extracted");
            }
            JobOutcome::Failed(error) => {
                tracing::warn!(worker = id, page = job.page, error = %format!("{error:#}"), "Page extraction failed");
                let failure = JobFailure {
                    worker_id: id,
                    page: job.page,
                    error,
                };
                if failures.send(failure).await.is_err() {
                    tracing::error!(worker = id, page = job.page, "Failure sink closed");
                }
            }
        }

        // Failed jobs signal completion too
        if done.send(()).await.is_err() {
            tracing::error!(worker = id, page = job.page, "Completion sink closed");
        }
    }

    tracing::debug!(worker = id, "Extraction worker stopped");
}

/// Run one job on the blocking pool, turning a panic into an ordinary failure
/// so the worker that picked it up keeps going.
async fn supervise(extract: Arc<ExtractFn>, job: Job) -> JobOutcome {
    let page = job.page;
    match tokio::task::spawn_blocking(move || (*extract)(page)).await {
        Ok(Ok(())) => JobOutcome::Completed,
        Ok(Err(error)) => JobOutcome::Failed(error),
        Err(err) => JobOutcome::Failed(match err.try_into_panic() {
            Ok(payload) => anyhow!("panic: {}", panic_message(&*payload)),
            Err(err) => anyhow!(err),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

// src/core/scanner/bulk.rs

//! Runs the fetch-and-evaluate pipeline over many targets.
//!
//! A fixed pool of workers claims target indices from a shared counter, so
//! at most `concurrency` requests are in flight at once. Workers report back
//! over a channel to a single collector that owns the result slots; each
//! result lands at its target's original index, so output order always
//! matches input order whatever the completion order.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::core::config::{BulkOptions, PacingPolicy, ScanTarget, MAX_TARGETS};
use crate::core::error::ValidationError;
use crate::core::knowledge_base::PolicyRegistry;
use crate::core::models::ScanResult;
use crate::core::scanner::fetcher::Fetcher;
use crate::core::scanner::scan_target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum JobState {
    Created,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum TargetState {
    Pending,
    InFlight,
    Completed,
    Failed,
}

/// Completed-so-far counter handed to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// A validated bulk request, ready to run.
#[derive(Debug, Clone)]
pub struct BulkJob {
    targets: Vec<ScanTarget>,
    options: BulkOptions,
    state: JobState,
}

impl BulkJob {
    /// Validates the target list and builds the job.
    ///
    /// The count is checked before any URL is parsed, so an oversized list
    /// is rejected as a whole.
    ///
    /// # Arguments
    /// * `urls` - Target URLs in the order results should come back.
    /// * `options` - Concurrency, pacing and per-request options.
    ///
    /// # Returns
    /// A job in the `Created` state, or the first validation failure.
    pub fn new<I, S>(urls: I, options: BulkOptions) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls: Vec<S> = urls.into_iter().collect();
        if urls.is_empty() {
            return Err(ValidationError::NoTargets);
        }
        if urls.len() > MAX_TARGETS {
            return Err(ValidationError::TooManyTargets { count: urls.len(), max: MAX_TARGETS });
        }

        let targets = urls
            .iter()
            .map(|url| ScanTarget::new(url.as_ref(), options.scan))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { targets, options, state: JobState::Created })
    }

    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    pub fn options(&self) -> &BulkOptions {
        &self.options
    }

    pub fn state(&self) -> JobState {
        self.state
    }
}

/// Stops a running job from dispatching further targets.
///
/// Targets already in flight are allowed to finish or time out.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// One target's slot in the final report.
#[derive(Debug, Clone)]
pub struct BulkEntry {
    pub url: String,
    pub state: TargetState,
    /// `None` only for targets never dispatched (cancellation) or lost to a
    /// crashed worker.
    pub result: Option<ScanResult>,
}

/// What a bulk run hands back: the final job state and one entry per target,
/// in input order.
#[derive(Debug, Clone)]
pub struct BulkReport {
    state: JobState,
    entries: Vec<BulkEntry>,
}

impl BulkReport {
    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn entries(&self) -> &[BulkEntry] {
        &self.entries
    }

    /// Recorded results in input order.
    pub fn results(&self) -> impl Iterator<Item = &ScanResult> {
        self.entries.iter().filter_map(|e| e.result.as_ref())
    }

    pub fn into_results(self) -> Vec<ScanResult> {
        self.entries.into_iter().filter_map(|e| e.result).collect()
    }

    /// Targets that never got a result.
    pub fn skipped(&self) -> impl Iterator<Item = &BulkEntry> {
        self.entries.iter().filter(|e| e.result.is_none())
    }
}

enum WorkerEvent {
    Dispatched { index: usize },
    Finished { index: usize, result: ScanResult },
}

/// Spaces out dispatches according to the pacing policy.
enum Pacer {
    PerWorker(Duration),
    Global { delay: Duration, next_slot: Mutex<Option<Instant>> },
}

impl Pacer {
    fn new(policy: PacingPolicy, delay: Duration) -> Self {
        match policy {
            PacingPolicy::PerWorker => Pacer::PerWorker(delay),
            PacingPolicy::Global => Pacer::Global { delay, next_slot: Mutex::new(None) },
        }
    }

    /// Waits until this worker may dispatch. Returns `false` if the job was
    /// cancelled while waiting.
    async fn wait(&self, last_dispatch: Option<Instant>, cancel: &mut watch::Receiver<bool>) -> bool {
        let deadline = match self {
            Pacer::PerWorker(delay) => last_dispatch.map(|t| t + *delay),
            Pacer::Global { delay, next_slot } => {
                let mut slot = next_slot.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                let start = match *slot {
                    Some(t) if t > now => t,
                    _ => now,
                };
                *slot = Some(start + *delay);
                Some(start)
            }
        };

        let Some(deadline) = deadline else { return true };
        if deadline <= Instant::now() {
            return true;
        }
        tokio::select! {
            _ = sleep_until(deadline) => true,
            _ = cancelled(cancel) => false,
        }
    }
}

/// Resolves once the job is cancelled. Never resolves if the handle is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Runs bulk jobs with a shared fetcher and policy registry.
pub struct BulkScanner<F> {
    fetcher: Arc<F>,
    registry: Arc<PolicyRegistry>,
}

impl<F> BulkScanner<F>
where
    F: Fetcher + 'static,
{
    pub fn new(fetcher: Arc<F>, registry: Arc<PolicyRegistry>) -> Self {
        Self { fetcher, registry }
    }

    /// Runs every target of `job` and returns once all have a result or the
    /// job was cancelled and its in-flight targets have settled.
    ///
    /// A failing target never stops the job.
    ///
    /// # Arguments
    /// * `job` - The validated job; consumed by the run.
    /// * `cancel` - Stops further dispatches when triggered.
    /// * `on_progress` - Called after each completion with the running count.
    ///
    /// # Returns
    /// One entry per target in input order, plus the final job state.
    pub async fn run<P>(&self, mut job: BulkJob, cancel: &CancelHandle, mut on_progress: P) -> BulkReport
    where
        P: FnMut(Progress) + Send,
    {
        job.state = JobState::Running;
        let total = job.targets.len();
        let workers = job.options.concurrency.min(total);
        info!(
            total,
            workers,
            delay_ms = job.options.delay.as_millis() as u64,
            pacing = %job.options.pacing,
            "Starting bulk job."
        );

        let urls: Vec<String> = job.targets.iter().map(|t| t.url().to_string()).collect();
        let targets = Arc::new(job.targets);
        let next = Arc::new(AtomicUsize::new(0));
        let pacer = Arc::new(Pacer::new(job.options.pacing, job.options.delay));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(worker_loop(
                worker,
                self.fetcher.clone(),
                self.registry.clone(),
                targets.clone(),
                next.clone(),
                pacer.clone(),
                cancel.subscribe(),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut states = vec![TargetState::Pending; total];
        let mut slots: Vec<Option<ScanResult>> = vec![None; total];
        let mut completed = 0;
        while let Some(event) = rx.recv().await {
            match event {
                WorkerEvent::Dispatched { index } => states[index] = TargetState::InFlight,
                WorkerEvent::Finished { index, result } => {
                    states[index] = if result.is_error() { TargetState::Failed } else { TargetState::Completed };
                    slots[index] = Some(result);
                    completed += 1;
                    on_progress(Progress { completed, total });
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Bulk worker crashed.");
            }
        }

        let all_recorded = slots.iter().all(Option::is_some);
        job.state = if cancel.is_cancelled() && !all_recorded { JobState::Cancelled } else { JobState::Completed };
        info!(state = %job.state, completed, total, "Bulk job finished.");

        let entries = urls
            .into_iter()
            .zip(states)
            .zip(slots)
            .map(|((url, state), result)| BulkEntry { url, state, result })
            .collect();
        BulkReport { state: job.state, entries }
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop<F>(
    worker: usize,
    fetcher: Arc<F>,
    registry: Arc<PolicyRegistry>,
    targets: Arc<Vec<ScanTarget>>,
    next: Arc<AtomicUsize>,
    pacer: Arc<Pacer>,
    mut cancel: watch::Receiver<bool>,
    tx: mpsc::UnboundedSender<WorkerEvent>,
) where
    F: Fetcher + 'static,
{
    let mut last_dispatch: Option<Instant> = None;
    loop {
        if *cancel.borrow() || next.load(Ordering::SeqCst) >= targets.len() {
            break;
        }
        // Pace, then claim.
        if !pacer.wait(last_dispatch, &mut cancel).await {
            debug!(worker, "Cancelled while pacing.");
            break;
        }
        if *cancel.borrow() {
            debug!(worker, "Cancelled, no further dispatches.");
            break;
        }
        let index = next.fetch_add(1, Ordering::SeqCst);
        let Some(target) = targets.get(index) else { break };
        last_dispatch = Some(Instant::now());

        debug!(worker, index, url = target.url(), "Dispatching target.");
        let _ = tx.send(WorkerEvent::Dispatched { index });
        let result = scan_target(fetcher.as_ref(), &registry, target).await;
        if tx.send(WorkerEvent::Finished { index, result }).is_err() {
            break;
        }
    }
    debug!(worker, "Worker finished.");
}

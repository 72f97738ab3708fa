//! Global fetch limiter shared by every dataset: one remote fetch in flight
//! at a time, and a minimum spacing between dispatches.
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

struct QueuedJob {
    label: String,
    job: Job,
    done: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
struct SchedulerStats {
    queued: AtomicUsize,
    dispatched: AtomicU64,
}

/// FIFO queue of fetch jobs. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct FetchScheduler {
    tx: mpsc::UnboundedSender<QueuedJob>,
    stats: Arc<SchedulerStats>,
    min_interval: Duration,
}

impl FetchScheduler {
    /// Spawn the dispatcher. Must be called from within a tokio runtime.
    pub fn start(min_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(SchedulerStats::default());
        tokio::spawn(dispatch(rx, min_interval, stats.clone()));
        Self {
            tx,
            stats,
            min_interval,
        }
    }

    /// Queue a job. The returned handle resolves once the job has run; jobs
    /// are never cancelled.
    pub fn submit<F>(&self, label: &str, job: F) -> PendingRefresh
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done, rx) = oneshot::channel();
        let queued = QueuedJob {
            label: label.to_string(),
            job: Box::pin(job),
            done,
        };
        self.stats.queued.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(queued).is_err() {
            self.stats.queued.fetch_sub(1, Ordering::SeqCst);
            warn!("Fetch scheduler stopped; dropping job for {label}");
            return PendingRefresh::none();
        }
        PendingRefresh(Some(rx))
    }

    /// Jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        self.stats.queued.load(Ordering::SeqCst)
    }

    pub fn dispatched(&self) -> u64 {
        self.stats.dispatched.load(Ordering::SeqCst)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    min_interval: Duration,
    stats: Arc<SchedulerStats>,
) {
    let mut last_start: Option<Instant> = None;
    while let Some(queued) = rx.recv().await {
        if let Some(last) = last_start {
            sleep_until(last + min_interval).await;
        }
        last_start = Some(Instant::now());
        stats.dispatched.fetch_add(1, Ordering::SeqCst);
        debug!("Dispatching fetch job for {}", queued.label);

        // Run on its own task so a panicking job cannot take the queue down.
        if let Err(e) = tokio::spawn(queued.job).await {
            warn!("Fetch job for {} aborted: {e}", queued.label);
        }
        stats.queued.fetch_sub(1, Ordering::SeqCst);
        let _ = queued.done.send(());
    }
}

/// Completion handle for a queued refresh. Dropping it does not cancel the job.
#[derive(Debug)]
pub struct PendingRefresh(Option<oneshot::Receiver<()>>);

impl PendingRefresh {
    pub fn none() -> Self {
        PendingRefresh(None)
    }

    pub fn is_scheduled(&self) -> bool {
        self.0.is_some()
    }

    /// Wait for the job to finish (returns at once if nothing was queued).
    pub async fn wait(self) {
        if let Some(rx) = self.0 {
            let _ = rx.await;
        }
    }
}

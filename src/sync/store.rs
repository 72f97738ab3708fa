//! Per-dataset cache: bootstrap from the local snapshot, background refresh
//! through the shared [`FetchScheduler`], change-driven resync, and atomic
//! publication of fully built snapshots.
use super::backoff::{Backoff, BackoffPolicy};
use super::feed::{ChangeEvent, ChangeFeed};
use super::resync::{ChangeOutcome, ResyncGate};
use super::scheduler::{FetchScheduler, PendingRefresh};
use super::source::{RemoteSource, SnapshotSource};
use crate::error::{Result, VerseError};
use crate::metrics::Metrics;
use crate::record::{Row, numeric, text, with_sorted_keys};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Post-load transform applied to every freshly built row set.
pub type Adjustment = Arc<dyn Fn(Vec<Row>) -> Vec<Row> + Send + Sync>;

#[derive(Clone, Default)]
pub struct StoreOptions {
    /// Rows are sorted ascending by this numeric field; every row must have it.
    pub numeric_sort_key: Option<String>,
    /// Rebuild each row with its fields in lexicographic order.
    pub sort_keys_alphabetically: bool,
    /// Subscribe to the change feed and resync this long after a change.
    pub resync_grace: Option<Duration>,
    /// Field indexed on every published snapshot.
    pub join_key: Option<String>,
    pub final_adjustments: Option<Adjustment>,
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("numeric_sort_key", &self.numeric_sort_key)
            .field("sort_keys_alphabetically", &self.sort_keys_alphabetically)
            .field("resync_grace", &self.resync_grace)
            .field("join_key", &self.join_key)
            .field("final_adjustments", &self.final_adjustments.is_some())
            .finish()
    }
}

impl StoreOptions {
    pub fn sorted_by(key: &str) -> Self {
        Self {
            numeric_sort_key: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn joined_on(mut self, key: &str) -> Self {
        self.join_key = Some(key.to_string());
        self
    }

    pub fn resync_after(mut self, grace: Duration) -> Self {
        self.resync_grace = Some(grace);
        self
    }

    pub fn with_adjustment<F>(mut self, adjust: F) -> Self
    where
        F: Fn(Vec<Row>) -> Vec<Row> + Send + Sync + 'static,
    {
        self.final_adjustments = Some(Arc::new(adjust));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Empty,
    Local,
    Remote,
}

/// An immutable, fully built dataset version plus its join index.
#[derive(Debug)]
pub struct Snapshot {
    rows: Vec<Row>,
    index: HashMap<String, Vec<usize>>,
    origin: SnapshotOrigin,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
            origin: SnapshotOrigin::Empty,
        }
    }

    fn build(rows: Vec<Row>, join_key: Option<&str>, origin: SnapshotOrigin) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        if let Some(key) = join_key {
            for (i, row) in rows.iter().enumerate() {
                if let Some(value) = row.get(key).and_then(text) {
                    index.entry(value).or_default().push(i);
                }
            }
        }
        Self {
            rows,
            index,
            origin,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn origin(&self) -> SnapshotOrigin {
        self.origin
    }

    /// First row whose join key equals `key`.
    pub fn find(&self, key: &str) -> Option<&Row> {
        self.index
            .get(key)
            .and_then(|positions| positions.first())
            .map(|&i| &self.rows[i])
    }

    /// Every row whose join key equals `key`, in snapshot order.
    pub fn find_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Row> + 'a {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i])
    }
}

/// Remote side of a store. Absent when running from local data only.
#[derive(Clone)]
pub struct RemoteSync {
    pub source: Arc<dyn RemoteSource>,
    pub feed: Option<Arc<dyn ChangeFeed>>,
    pub scheduler: FetchScheduler,
    pub reconnect: BackoffPolicy,
}

/// Sort ascending by the numeric value of `key`. A row without a numeric
/// `key` fails the whole sort.
pub fn sort_rows(rows: Vec<Row>, key: &str, table: &str) -> Result<Vec<Row>> {
    let mut keyed = Vec::with_capacity(rows.len());
    for (position, row) in rows.into_iter().enumerate() {
        let value = row.get(key).and_then(numeric).ok_or_else(|| {
            VerseError::validation(
                table,
                format!("Property \"{key}\" is missing in some data items (row {position})"),
            )
        })?;
        keyed.push((value, row));
    }
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

pub struct DataStore {
    table: String,
    options: StoreOptions,
    local: Arc<dyn SnapshotSource>,
    remote: Option<RemoteSync>,
    current: RwLock<Arc<Snapshot>>,
    resync: ResyncGate,
    subscribed: AtomicBool,
    metrics: Arc<Metrics>,
}

impl DataStore {
    pub fn new(
        table: &str,
        options: StoreOptions,
        local: Arc<dyn SnapshotSource>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            table: table.to_string(),
            options,
            local,
            remote: None,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            resync: ResyncGate::new(),
            subscribed: AtomicBool::new(false),
            metrics,
        }
    }

    pub fn with_remote(mut self, remote: RemoteSync) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn resync_gate(&self) -> &ResyncGate {
        &self.resync
    }

    /// The current snapshot. Never blocks on a refresh and never observes a
    /// partially built row set.
    pub fn get(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Load the local snapshot synchronously, then queue a background refresh.
    ///
    /// An unreadable or corrupt local snapshot keeps whatever is currently
    /// published; the refresh is queued either way. The returned handle may
    /// be dropped; the refresh runs regardless.
    pub fn initialize(self: &Arc<Self>) -> PendingRefresh {
        if let Err(e) = self.bootstrap() {
            if matches!(e, VerseError::DataValidation { .. } | VerseError::Json(_)) {
                self.metrics.validation_failures.inc();
            }
            warn!("{e}; local data for \"{}\" ignored, waiting for remote", self.table);
        }
        self.schedule_refresh()
    }

    fn bootstrap(&self) -> Result<()> {
        let Some(rows) = self.load_local()? else {
            warn!("No local data for table: {}", self.table);
            return Ok(());
        };
        info!("Loaded local data for table: {} ({} rows)", self.table, rows.len());

        match self.finalize(rows.clone()) {
            Some(finalized) => self.publish(finalized, SnapshotOrigin::Local),
            None if !rows.is_empty() => {
                warn!("\"{}\" no data after adjustments, using local version as is.", self.table);
                self.metrics.empty_fallbacks.inc();
                self.publish(rows, SnapshotOrigin::Local);
            }
            None => warn!("\"{}\" local snapshot is empty.", self.table),
        }
        Ok(())
    }

    fn load_local(&self) -> Result<Option<Vec<Row>>> {
        match self.local.load(&self.table)? {
            Some(rows) => self.prepare(rows).map(Some),
            None => Ok(None),
        }
    }

    /// Sorting and key ordering.
    fn prepare(&self, rows: Vec<Row>) -> Result<Vec<Row>> {
        let rows = match &self.options.numeric_sort_key {
            Some(key) => sort_rows(rows, key, &self.table)?,
            None => rows,
        };
        if self.options.sort_keys_alphabetically {
            return Ok(rows.into_iter().map(with_sorted_keys).collect());
        }
        Ok(rows)
    }

    /// Apply the adjustment transform; `None` if nothing usable remains.
    fn finalize(&self, rows: Vec<Row>) -> Option<Vec<Row>> {
        let rows = match &self.options.final_adjustments {
            Some(adjust) => adjust(rows),
            None => rows,
        };
        (!rows.is_empty()).then_some(rows)
    }

    fn publish(&self, rows: Vec<Row>, origin: SnapshotOrigin) {
        let snapshot = Arc::new(Snapshot::build(
            rows,
            self.options.join_key.as_deref(),
            origin,
        ));
        *self.current.write() = snapshot;
    }

    fn schedule_refresh(self: &Arc<Self>) -> PendingRefresh {
        let Some(remote) = &self.remote else {
            return PendingRefresh::none();
        };
        let store = Arc::clone(self);
        remote.scheduler.submit(&self.table, async move {
            store.refresh().await;
        })
    }

    /// Fetch every row from the remote and publish it. Failures of any kind
    /// leave the current snapshot in place.
    pub async fn refresh(self: Arc<Self>) {
        let Some(remote) = self.remote.clone() else {
            return;
        };
        info!("Starting fetch for {}", self.table);
        let started = Instant::now();

        let response = match remote.source.fetch_all(&self.table).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error fetching data for \"{}\": {e}", self.table);
                self.metrics.refresh_failed.inc();
                return;
            }
        };
        if !response.status_ok {
            warn!(
                "Error fetching data for \"{}\": {}",
                self.table,
                response.message.as_deref().unwrap_or("--")
            );
            self.metrics.refresh_failed.inc();
            return;
        }

        let rows = match self.prepare(response.rows) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("{e}; keeping previous snapshot, remote data may be corrupt");
                self.metrics.validation_failures.inc();
                self.metrics.refresh_failed.inc();
                return;
            }
        };

        match self.finalize(rows) {
            Some(rows) => {
                self.publish(rows, SnapshotOrigin::Remote);
                info!("{} Fetched! ({}ms)", self.table, started.elapsed().as_millis());
                self.metrics.refresh_succeeded.inc();
            }
            None => {
                warn!("\"{}\" no data found, falling back to local version.", self.table);
                self.metrics.empty_fallbacks.inc();
                self.reload_local();
            }
        }

        self.ensure_subscribed();
    }

    fn reload_local(&self) {
        match self.load_local() {
            Ok(Some(rows)) if !rows.is_empty() => self.publish(rows, SnapshotOrigin::Local),
            Ok(_) => warn!("\"{}\" has no local data to fall back to.", self.table),
            Err(e) => warn!("Could not reload local data for \"{}\": {e}", self.table),
        }
    }

    fn ensure_subscribed(self: &Arc<Self>) {
        let (Some(grace), Some(remote)) = (self.options.resync_grace, &self.remote) else {
            return;
        };
        let Some(feed) = remote.feed.clone() else {
            return;
        };
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(Arc::clone(self).watch_changes(feed, grace, remote.reconnect));
    }

    /// Keep a subscription alive for the life of the process, resubscribing
    /// with backoff whenever it is lost.
    async fn watch_changes(self: Arc<Self>, feed: Arc<dyn ChangeFeed>, grace: Duration, policy: BackoffPolicy) {
        let mut backoff = Backoff::new(policy);
        loop {
            match feed.subscribe(&self.table).await {
                Ok(mut subscription) => {
                    info!(">   \"{}\" auto sync ON", self.table);
                    backoff.reset();
                    loop {
                        match subscription.recv().await {
                            Some(Ok(event)) => self.on_change(event, grace),
                            Some(Err(e)) => {
                                warn!(">   \"{}\" change feed error: {e}", self.table);
                                break;
                            }
                            None => {
                                warn!(">   \"{}\" change feed closed", self.table);
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!(">   \"{}\" subscribe failed: {e}", self.table),
            }

            self.metrics.feed_reconnects.inc();
            let delay = backoff.next_delay();
            warn!(">   \"{}\" auto sync RECONNECTING in {delay:?}...", self.table);
            tokio::time::sleep(delay).await;
        }
    }

    fn on_change(self: &Arc<Self>, event: ChangeEvent, grace: Duration) {
        match self.resync.on_change() {
            ChangeOutcome::Scheduled => {
                info!(
                    ">   \"{}\" will be re-synced in {grace:?} (\"{}\" detected)...",
                    self.table, event.kind
                );
                self.metrics.resyncs_scheduled.inc();
                tokio::spawn(Arc::clone(self).run_resync(grace));
            }
            ChangeOutcome::Coalesced => {
                debug!("\"{}\" {} folded into pending resync", self.table, event.kind);
                self.metrics.change_events_coalesced.inc();
            }
        }
    }

    async fn run_resync(self: Arc<Self>, grace: Duration) {
        loop {
            tokio::time::sleep(grace).await;
            if !self.resync.begin() {
                return;
            }
            self.initialize().wait().await;
            info!(">   \"{}\" resync complete.", self.table);
            if !self.resync.finish() {
                return;
            }
            info!(">   \"{}\" changed during resync, scheduling another.", self.table);
            self.metrics.resyncs_scheduled.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::memory::MemorySnapshotSource;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_sort_rows_numeric_strings() {
        let sorted = sort_rows(
            rows(json!([{"k": "10"}, {"k": 2}, {"k": "1"}])),
            "k",
            "t",
        )
        .unwrap();
        let keys: Vec<f64> = sorted.iter().map(|r| numeric(&r["k"]).unwrap()).collect();
        assert_eq!(keys, vec![1.0, 2.0, 10.0]);
    }

    #[test]
    fn test_sort_rows_missing_key() {
        let err = sort_rows(rows(json!([{"k": 1}, {"other": 2}])), "k", "t").unwrap_err();
        assert!(matches!(err, VerseError::DataValidation { .. }));
    }

    #[test]
    fn test_snapshot_index() {
        let snapshot = Snapshot::build(
            rows(json!([
                {"verse_id": "1:1", "w": "a"},
                {"verse_id": "1:2", "w": "b"},
                {"verse_id": "1:1", "w": "c"},
            ])),
            Some("verse_id"),
            SnapshotOrigin::Local,
        );
        assert_eq!(snapshot.find("1:1").unwrap()["w"], "a");
        assert_eq!(snapshot.find_all("1:1").count(), 2);
        assert_eq!(snapshot.find_all("9:9").count(), 0);
        assert!(snapshot.find("2:1").is_none());
    }

    #[test]
    fn test_alphabetical_keys_on_bootstrap() {
        let local = Arc::new(
            MemorySnapshotSource::new().with_table("t", rows(json!([{"z": 1, "a": 2, "m": 3}]))),
        );
        let options = StoreOptions {
            sort_keys_alphabetically: true,
            ..StoreOptions::default()
        };
        let store = DataStore::new("t", options, local, Arc::new(Metrics::new()));
        store.bootstrap().unwrap();
        let keys: Vec<_> = store.get().rows()[0].keys().cloned().collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }
}

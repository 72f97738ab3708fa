//! In-memory collaborators for embedding and tests
use super::source::{FetchResponse, RemoteSource, SnapshotSource};
use crate::error::{Result, VerseError};
use crate::record::Row;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MemorySnapshotSource {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    loads: AtomicUsize,
}

impl MemorySnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, rows: Vec<Row>) -> Self {
        self.set(table, rows);
        self
    }

    pub fn set(&self, table: &str, rows: Vec<Row>) {
        self.tables.write().insert(table.to_string(), rows);
    }

    pub fn remove(&self, table: &str) {
        self.tables.write().remove(table);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for MemorySnapshotSource {
    fn load(&self, table: &str) -> Result<Option<Vec<Row>>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.read().get(table).cloned())
    }
}

#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Rows(Vec<Row>),
    /// Reached the remote, but it answered with a non-success status.
    Status(String),
    /// Transport-level failure.
    Fail(String),
}

/// Remote source answering from scripted responses. One-shot responses are
/// consumed first; otherwise the table's standing response is used.
#[derive(Default)]
pub struct MemoryRemoteSource {
    standing: RwLock<HashMap<String, ScriptedResponse>>,
    queued: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    fetches: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: RwLock<Option<Duration>>,
}

impl MemoryRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, rows: Vec<Row>) -> Self {
        self.set_response(table, ScriptedResponse::Rows(rows));
        self
    }

    pub fn set_response(&self, table: &str, response: ScriptedResponse) {
        self.standing.write().insert(table.to_string(), response);
    }

    pub fn push_response(&self, table: &str, response: ScriptedResponse) {
        self.queued
            .lock()
            .entry(table.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = Some(latency);
    }

    pub fn fetches(&self, table: &str) -> usize {
        self.fetches.lock().get(table).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, table: &str) -> Option<ScriptedResponse> {
        if let Some(response) = self
            .queued
            .lock()
            .get_mut(table)
            .and_then(VecDeque::pop_front)
        {
            return Some(response);
        }
        self.standing.read().get(table).cloned()
    }
}

#[async_trait]
impl RemoteSource for MemoryRemoteSource {
    async fn fetch_all(&self, table: &str) -> Result<FetchResponse> {
        *self.fetches.lock().entry(table.to_string()).or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.next_response(table) {
            Some(ScriptedResponse::Rows(rows)) => Ok(FetchResponse::ok(rows)),
            Some(ScriptedResponse::Status(message)) => Ok(FetchResponse::failed(message)),
            Some(ScriptedResponse::Fail(message)) => Err(VerseError::transport(table, message)),
            None => Ok(FetchResponse::failed("404 Not Found")),
        }
    }
}

//! Local snapshot and remote bulk-fetch collaborators
use crate::error::{Result, VerseError};
use crate::record::Row;
use async_trait::async_trait;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Last known-good copy of a dataset.
pub trait SnapshotSource: Send + Sync {
    /// `Ok(None)` when no snapshot exists for `table`.
    fn load(&self, table: &str) -> Result<Option<Vec<Row>>>;
}

/// Result of a bulk fetch that reached the remote.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub rows: Vec<Row>,
    pub status_ok: bool,
    pub message: Option<String>,
}

impl FetchResponse {
    pub fn ok(rows: Vec<Row>) -> Self {
        Self {
            rows,
            status_ok: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            status_ok: false,
            message: Some(message.into()),
        }
    }
}

/// Bulk row source for a named table. Transport failures are `Err`,
/// non-success statuses come back with `status_ok == false`.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_all(&self, table: &str) -> Result<FetchResponse>;
}

/// Reads `<dir>/<table>.json`, a JSON array of flat objects.
#[derive(Debug, Clone)]
pub struct LocalSnapshotDir {
    dir: PathBuf,
}

impl LocalSnapshotDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }
}

impl SnapshotSource for LocalSnapshotDir {
    fn load(&self, table: &str) -> Result<Option<Vec<Row>>> {
        let path = self.path_for(table);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No local snapshot at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(VerseError::Io(e)),
        };
        let rows: Vec<Row> = serde_json::from_str(&content)?;
        Ok(Some(rows))
    }
}

/// PostgREST-style table endpoint: `GET <base>/rest/v1/<table>?select=*`.
pub struct RestRemoteSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestRemoteSource {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}?select=*", self.base_url)
    }
}

#[async_trait]
impl RemoteSource for RestRemoteSource {
    async fn fetch_all(&self, table: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| VerseError::transport(table, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(FetchResponse::failed(format!("{status}: {body}")));
        }

        let rows = response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| VerseError::transport(table, e.to_string()))?;
        Ok(FetchResponse::ok(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_snapshot_dir() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("ws-quran-chapters.json"),
            r#"[{"chapter_number": 2}, {"chapter_number": 1}]"#,
        )
        .unwrap();

        let source = LocalSnapshotDir::new(dir.path());
        let rows = source.load("ws-quran-chapters").unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(source.load("ws-quran").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ws-quran.json"), "{not json").unwrap();
        let source = LocalSnapshotDir::new(dir.path());
        assert!(matches!(source.load("ws-quran"), Err(VerseError::Json(_))));
    }

    #[test]
    fn test_table_url() {
        let source = RestRemoteSource::new("https://example.test/", "key");
        assert_eq!(
            source.table_url("ws-quran"),
            "https://example.test/rest/v1/ws-quran?select=*"
        );
    }
}

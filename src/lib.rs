pub mod catalog;
pub mod cli;
pub mod config;
pub mod daily;
pub mod error;
pub mod fields;
pub mod language;
pub mod metrics;
pub mod output;
pub mod query;
pub mod record;
pub mod search;
pub mod sync;

pub use catalog::{Catalog, CatalogOptions, DatasetKind, Export, QueryResult};
pub use clap::Parser;
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{Result, VerseError};
pub use language::{Language, canonicalize};
pub use metrics::Metrics;
pub use query::{ParsedQuery, ParsedRequest, QueryParams, ReferenceParser, parse};
pub use record::Row;
pub use search::{HighlightMode, Highlighter, SearchEngine, highlight};

use std::sync::Arc;
use sync::{ChangeFeed, FetchScheduler, LocalSnapshotDir, RemoteSync, RestRemoteSource};

/// Wire a [`Catalog`] from configuration: local snapshots always, the REST
/// remote and a shared fetch scheduler only when credentials are present.
///
/// Must be called inside a tokio runtime when remote sync is enabled.
pub fn build_catalog(
    config: &Config,
    feed: Option<Arc<dyn ChangeFeed>>,
    metrics: Arc<Metrics>,
) -> Catalog {
    let local = Arc::new(LocalSnapshotDir::new(config.data.snapshot_dir.clone()));
    let remote = config.remote_credentials().map(|(url, key)| {
        log::info!("Remote sync enabled against {url}");
        RemoteSync {
            source: Arc::new(RestRemoteSource::new(url, key)),
            feed,
            scheduler: FetchScheduler::start(config.min_fetch_interval()),
            reconnect: config.reconnect_policy(),
        }
    });
    if remote.is_none() {
        log::info!("Using local data only");
    }
    Catalog::new(local, remote, config.catalog_options(), metrics)
}

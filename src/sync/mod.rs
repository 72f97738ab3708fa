//! Dataset caching and synchronization against the remote source of truth
pub mod backoff;
pub mod feed;
pub mod memory;
pub mod resync;
pub mod scheduler;
pub mod source;
pub mod store;

pub use backoff::{Backoff, BackoffPolicy};
pub use feed::{BroadcastChangeFeed, ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription};
pub use memory::{MemoryRemoteSource, MemorySnapshotSource, ScriptedResponse};
pub use resync::{ChangeOutcome, ResyncGate, ResyncState};
pub use scheduler::{FetchScheduler, PendingRefresh};
pub use source::{FetchResponse, LocalSnapshotDir, RemoteSource, RestRemoteSource, SnapshotSource};
pub use store::{Adjustment, DataStore, RemoteSync, Snapshot, SnapshotOrigin, StoreOptions, sort_rows};

//! Outer collaborators: the feed download and its caches.

pub mod cache;
pub mod feed;

pub use cache::{default_snapshot_path, load_snapshot, save_snapshot, FeedSnapshot, SnapshotError};
pub use feed::{
    CacheStatus, CachedPayload, FeedClient, FeedDocument, FeedError, ServerDto, DEFAULT_FEED_URL,
    DEFAULT_TTL,
};

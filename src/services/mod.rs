pub mod cache;
pub mod downloader;
pub mod storage;

pub use cache::{CacheCleanupTask, CacheError, CacheStore};
pub use downloader::{DownloadService, FetchError, MediaFetcher, TransferError, YtDlpFetcher};
pub use storage::{BlobStore, CachedBlobFetcher, S3BlobStore};

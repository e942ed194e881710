pub mod download;

pub use download::{
    BatchDownloadRequest, BatchDownloadResponse, DownloadRequest, DownloadResponse, DownloadStatus,
};

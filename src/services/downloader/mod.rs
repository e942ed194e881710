// 下载模块 - 媒体提取与下载协调
//
// 本模块提供在线媒体的下载功能，包括：
// - yt-dlp 子进程封装（元数据提取 + 媒体下载）
// - 下载进度事件解析
// - 超时控制、存储上传与批量调度

pub mod coordinator;
pub mod error;
pub mod fetcher;

pub use coordinator::DownloadService;
pub use error::{FetchError, TransferError};
pub use fetcher::{FetchOptions, MediaFetcher, MediaMetadata, ProgressEvent, YtDlpFetcher};

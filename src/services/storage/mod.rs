// 存储模块 - 对象存储访问
//
// 本模块提供 S3 对象存储的上传和下载，以及带磁盘缓存的读取路径

pub mod cached;
pub mod s3;

pub use cached::CachedBlobFetcher;
pub use s3::{BlobStore, S3BlobStore};

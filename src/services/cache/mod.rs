// 缓存模块 - 下载文件的磁盘 TTL 缓存
//
// 本模块提供下载文件的本地缓存功能，包括：
// - 基于 mtime 的新鲜度判定
// - 粗粒度锁保证同 key 只拉取一次
// - 过期条目的定期清理任务

pub mod janitor;
pub mod store;

pub use janitor::CacheCleanupTask;
pub use store::{CacheError, CacheStore};

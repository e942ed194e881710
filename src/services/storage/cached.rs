// 带缓存的对象下载
//
// 组合对象存储和本地 TTL 缓存：TTL 窗口内的重复下载命中磁盘缓存，
// 过期条目删除后重新拉取。

use crate::services::cache::{CacheError, CacheStore};
use crate::services::storage::s3::BlobStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 带本地缓存的对象下载器
#[derive(Clone)]
pub struct CachedBlobFetcher {
    store: Arc<dyn BlobStore>,
    cache: Arc<CacheStore>,
}

impl CachedBlobFetcher {
    pub fn new(store: Arc<dyn BlobStore>, cache: Arc<CacheStore>) -> Self {
        Self { store, cache }
    }

    /// 下载存储键对应的对象，优先使用本地缓存
    pub async fn download_file(&self, key: &str) -> Result<PathBuf, CacheError> {
        let store = Arc::clone(&self.store);
        let key_owned = key.to_string();

        self.cache
            .materialize(key, |dest| async move {
                let dest_dir = dest
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."));

                let path = store.get(&key_owned, &dest_dir).await?;
                info!("对象已下载到缓存: {} -> {}", key_owned, path.display());
                Ok(path)
            })
            .await
    }
}

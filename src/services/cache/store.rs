// 缓存存储 - 基于文件系统的 TTL 缓存
//
// 以存储键的末段文件名为缓存槽，新鲜度完全由文件修改时间推导，
// 不维护独立索引。所有变更访问经由一把粗粒度互斥锁串行化，
// 保证同一路径不会出现并发写者。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 缓存操作错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("无效的存储键: {0}")]
    InvalidKey(String),

    #[error("缓存填充失败: {0}")]
    Populate(#[source] anyhow::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 文件系统 TTL 缓存
///
/// 条目在 `age >= ttl` 时视为过期：访问时惰性删除，
/// 或由定期清理任务扫描删除
pub struct CacheStore {
    cache_dir: PathBuf,
    ttl: Duration,
    /// 整个存储共用一把锁（粗粒度），串行化检查-下载序列
    lock: Mutex<()>,
}

impl CacheStore {
    /// 创建缓存存储，确保缓存目录存在
    pub async fn new(cache_dir: PathBuf, ttl: Duration) -> Result<Self, CacheError> {
        fs::create_dir_all(&cache_dir).await?;

        Ok(Self {
            cache_dir,
            ttl,
            lock: Mutex::new(()),
        })
    }

    /// 存储键对应的缓存槽路径（键的末段文件名）
    fn slot_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let filename = Path::new(key)
            .file_name()
            .ok_or_else(|| CacheError::InvalidKey(key.to_string()))?;
        Ok(self.cache_dir.join(filename))
    }

    /// 查找缓存条目
    ///
    /// 过期条目先删除再按不存在处理
    pub async fn locate(&self, key: &str) -> Result<Option<PathBuf>, CacheError> {
        let path = self.slot_path(key)?;
        let _guard = self.lock.lock().await;

        self.locate_locked(&path).await
    }

    /// 返回缓存路径，未命中时调用 `fetch` 填充
    ///
    /// 整个检查-下载序列持有存储锁，同一键的并发调用只会触发一次下载
    pub async fn materialize<F, Fut>(&self, key: &str, fetch: F) -> Result<PathBuf, CacheError>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = anyhow::Result<PathBuf>>,
    {
        let path = self.slot_path(key)?;
        let _guard = self.lock.lock().await;

        if let Some(cached) = self.locate_locked(&path).await? {
            info!("使用缓存文件: {}", cached.display());
            return Ok(cached);
        }

        info!("缓存未命中，开始下载: {} -> {}", key, path.display());
        let fetched = fetch(path.clone()).await.map_err(CacheError::Populate)?;
        Ok(fetched)
    }

    /// 清理所有过期条目，返回删除数量
    ///
    /// 单个文件的删除失败只记录日志，不中断扫描
    pub async fn evict_expired(&self) -> Result<usize, CacheError> {
        let _guard = self.lock.lock().await;

        let mut removed = 0;
        let mut entries = fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match self.entry_age(&path).await {
                Ok(age) if age >= self.ttl => match fs::remove_file(&path).await {
                    Ok(()) => {
                        info!("清理过期缓存文件: {}", path.display());
                        removed += 1;
                    }
                    Err(e) => {
                        warn!("无法清理缓存文件 {}: {}", path.display(), e);
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    warn!("无法读取缓存文件元数据 {}: {}", path.display(), e);
                }
            }
        }

        debug!("缓存清理完成，删除 {} 个文件", removed);
        Ok(removed)
    }

    /// 已持锁状态下的条目查找
    async fn locate_locked(&self, path: &Path) -> Result<Option<PathBuf>, CacheError> {
        if !path.exists() {
            return Ok(None);
        }

        let age = self.entry_age(path).await?;
        if age < self.ttl {
            return Ok(Some(path.to_path_buf()));
        }

        info!("缓存文件已过期，删除: {}", path.display());
        fs::remove_file(path).await?;
        Ok(None)
    }

    /// 条目年龄（当前时间 - 文件修改时间）
    async fn entry_age(&self, path: &Path) -> std::io::Result<Duration> {
        let metadata = fs::metadata(path).await?;
        let modified = metadata.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }
}

// 缓存清理任务
//
// 按固定间隔扫描缓存存储并清理过期条目。清理失败只记录日志，
// 不会终止宿主进程。

use crate::services::cache::store::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// 定期缓存清理任务
pub struct CacheCleanupTask {
    store: Arc<CacheStore>,
    interval: Duration,
}

impl CacheCleanupTask {
    pub fn new(store: Arc<CacheStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// 启动定期清理任务
    ///
    /// 进程初始化时启动一次；`shutdown` 取消后任务干净退出，
    /// 不留下悬空定时器
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // 第一个 tick 立即完成，跳过以避免启动时额外扫描
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.store.evict_expired().await {
                            Ok(removed) => {
                                debug!("定期缓存清理完成，删除 {} 个文件", removed);
                            }
                            Err(e) => {
                                error!("定期缓存清理失败: {}", e);
                            }
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("缓存清理任务退出");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    #[tokio::test]
    async fn test_janitor_evicts_on_interval() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            CacheStore::new(temp_dir.path().to_path_buf(), Duration::from_millis(10))
                .await
                .unwrap(),
        );

        fs::write(temp_dir.path().join("stale.bin"), b"x")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let shutdown = CancellationToken::new();
        let handle =
            CacheCleanupTask::new(Arc::clone(&store), Duration::from_millis(50)).start(shutdown.clone());

        // 等待至少一个清理周期
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!temp_dir.path().join("stale.bin").exists());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_janitor_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            CacheStore::new(temp_dir.path().to_path_buf(), Duration::from_secs(60))
                .await
                .unwrap(),
        );

        let shutdown = CancellationToken::new();
        let handle = CacheCleanupTask::new(store, Duration::from_secs(3600)).start(shutdown.clone());

        shutdown.cancel();
        // 取消后任务应立即退出，而不是等到下一个间隔
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("清理任务未在取消后退出")
            .unwrap();
    }
}

// 下载协调器 - 协调提取、超时控制和存储上传
//
// 本模块是下载功能的核心服务，负责：
// - 根据标题和时间戳计算输出命名，避免并发请求冲突
// - 在 deadline 内调用媒体提取器，超时取消并返回 timeout 结果
// - 提取成功后上传对象存储，上传失败不掩盖为成功
// - 捕获一切内部故障并转换为规范化结果，绝不向调用方抛出

use crate::models::{BatchDownloadRequest, BatchDownloadResponse, DownloadRequest, DownloadResponse};
use crate::services::downloader::error::FetchError;
use crate::services::downloader::fetcher::{
    sanitize_title, FetchOptions, MediaFetcher, ProgressEvent,
};
use crate::services::storage::s3::BlobStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// 下载协调服务
///
/// `fetch` 永不失败：所有故障都被捕获进结果的 error/status 字段
#[derive(Clone)]
pub struct DownloadService {
    fetcher: Arc<dyn MediaFetcher>,
    storage: Arc<dyn BlobStore>,
    /// 批量下载并发控制（有界池，不做无界扇出）
    fetch_semaphore: Arc<Semaphore>,
    /// 请求未指定超时时的默认值
    default_timeout: Duration,
}

impl DownloadService {
    pub fn new(
        fetcher: Arc<dyn MediaFetcher>,
        storage: Arc<dyn BlobStore>,
        max_concurrent_fetchers: usize,
        default_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            storage,
            fetch_semaphore: Arc::new(Semaphore::new(max_concurrent_fetchers)),
            default_timeout,
        }
    }

    /// 执行一次下载请求
    pub async fn fetch(&self, request: &DownloadRequest) -> DownloadResponse {
        info!(
            "开始处理下载请求: request_id={}, url={}",
            request.request_id, request.url
        );

        let deadline = request
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        // 进度事件只用于日志；消费者掉线不影响下载
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let _progress_logger = spawn_progress_logger(request.request_id.clone(), progress_rx);

        // deadline 覆盖元数据提取和媒体下载；到期后 future 被丢弃，
        // 提取子进程随之回收（kill_on_drop）
        let fetch_outcome = timeout(deadline, self.fetch_inner(request, progress_tx)).await;

        let (title, local_path) = match fetch_outcome {
            Err(_elapsed) => {
                warn!(
                    "下载超时: request_id={}, url={}, timeout={}s",
                    request.request_id,
                    request.url,
                    deadline.as_secs()
                );
                return DownloadResponse::timeout(request, deadline.as_secs());
            }
            Ok(Err(e)) => {
                error!(
                    "下载失败: request_id={}, url={}, error={}",
                    request.request_id, request.url, e
                );
                return DownloadResponse::error(
                    request,
                    format!("Error downloading {}: {}", request.url, e),
                );
            }
            Ok(Ok(fetched)) => fetched,
        };

        // 上传对象存储；上传失败时整体操作不算成功
        let filename = match local_path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return DownloadResponse::error(request, "Downloaded file has no valid name");
            }
        };
        let storage_key = format!(
            "{}/project/{}/youtube/{}",
            request.user_id, request.project_id, filename
        );

        match self.storage.put(&local_path, &storage_key).await {
            Ok(key) => {
                let url = self.storage.url_for(&key);
                info!(
                    "下载完成并已上传: request_id={}, key={}",
                    request.request_id, key
                );
                DownloadResponse::completed(
                    request,
                    format!("Successfully downloaded: {}", title),
                    local_path.display().to_string(),
                    Some(key),
                    Some(url),
                )
            }
            Err(e) => {
                error!(
                    "上传失败: request_id={}, key={}, error={}",
                    request.request_id, storage_key, e
                );
                DownloadResponse::error(
                    request,
                    format!("Fetched media but upload to storage failed: {}", e),
                )
            }
        }
    }

    /// 批量下载：有界并发池，结果顺序与输入 URL 顺序一致
    ///
    /// 单个 URL 的失败不影响其余 URL 的处理
    pub async fn fetch_all(&self, batch: &BatchDownloadRequest) -> BatchDownloadResponse {
        let requests = batch.to_requests();
        info!("开始批量下载，共 {} 个 URL", requests.len());

        let mut handles = Vec::new();
        for request in requests.iter().cloned() {
            let service = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match service.fetch_semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return DownloadResponse::error(&request, "Fetch pool is shut down");
                    }
                };
                service.fetch(&request).await
            }));
        }

        // 按入队顺序等待，天然保持输入顺序
        let mut results = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(response) => results.push(response),
                Err(e) => {
                    error!("下载任务执行失败: index={}, error={}", index, e);
                    results.push(DownloadResponse::error(
                        &requests[index],
                        format!("Download task failed: {}", e),
                    ));
                }
            }
        }

        let response = BatchDownloadResponse::from_results(results);
        info!(
            "批量下载完成: 总数={}, overall_success={}",
            response.results.len(),
            response.overall_success
        );
        response
    }

    /// 元数据提取 + 媒体下载（在调用方的 deadline 内执行）
    async fn fetch_inner(
        &self,
        request: &DownloadRequest,
        progress_tx: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<(String, PathBuf), FetchError> {
        let metadata = self.fetcher.extract_metadata(&request.url).await?;
        info!(
            "开始下载: title={}, request_id={}",
            metadata.title, request.request_id
        );

        // 标题 + 时间戳命名，避免并发请求不同标题时的冲突
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let file_stem = format!("{}_{}", sanitize_title(&metadata.title), timestamp);

        let options = FetchOptions {
            output_dir: PathBuf::from(&request.output_dir),
            file_stem,
            subtitle_langs: request.subtitle_langs.clone(),
        };

        let local_path = self
            .fetcher
            .fetch_to_path(&request.url, &options, progress_tx)
            .await?;

        Ok((metadata.title, local_path))
    }
}

/// 消费进度事件并记录日志
///
/// 独立任务：即使无人消费剩余事件，发送端也不会阻塞
fn spawn_progress_logger(
    request_id: String,
    mut rx: mpsc::UnboundedReceiver<ProgressEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Downloading { percent, speed } => {
                    info!(
                        "下载中... {:.1}% at {} (request_id={})",
                        percent, speed, request_id
                    );
                }
                ProgressEvent::Finished => {
                    info!("下载阶段完成 (request_id={})", request_id);
                }
            }
        }
    })
}

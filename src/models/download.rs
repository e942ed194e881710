// 下载请求/响应数据模型
//
// 定义下载 API 的请求和响应结构，以及状态不变量的构造器

use serde::{Deserialize, Serialize};

/// 默认字幕语言
fn default_subtitle_langs() -> Vec<String> {
    vec!["en".to_string()]
}

/// 默认输出目录
fn default_output_dir() -> String {
    "downloads".to_string()
}

/// 单个视频下载请求
///
/// 请求一经接受即不可变。`request_id` 是调用方提供的关联令牌，
/// 系统不强制其唯一性。
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    pub request_id: String,
    pub project_id: String,
    pub user_id: String,
    pub url: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_subtitle_langs")]
    pub subtitle_langs: Vec<String>,
    /// 超时上限（秒），到期后取消下载并返回 timeout 状态。
    /// 缺省时使用服务配置的默认超时。
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// 批量下载请求（URL 列表 + 共享参数）
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDownloadRequest {
    pub urls: Vec<String>,
    pub project_id: String,
    pub user_id: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_subtitle_langs")]
    pub subtitle_langs: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl BatchDownloadRequest {
    /// 展开为单个下载请求，按 URL 顺序编号 request_id
    pub fn to_requests(&self) -> Vec<DownloadRequest> {
        self.urls
            .iter()
            .enumerate()
            .map(|(index, url)| DownloadRequest {
                request_id: format!("batch_{}", index),
                project_id: self.project_id.clone(),
                user_id: self.user_id.clone(),
                url: url.clone(),
                output_dir: self.output_dir.clone(),
                subtitle_langs: self.subtitle_langs.clone(),
                timeout_secs: self.timeout_secs,
            })
            .collect()
    }
}

/// 下载结果状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Completed,
    Timeout,
    Error,
}

/// 下载结果
///
/// 不变量（由构造器保证）：
/// - `success == true` 当且仅当 `status == Completed`
/// - `file_path` 仅在成功时存在，`error` 仅在失败时存在
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub message: String,
    pub request_id: String,
    pub user_id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: DownloadStatus,
}

impl DownloadResponse {
    /// 创建成功结果
    pub fn completed(
        request: &DownloadRequest,
        message: impl Into<String>,
        file_path: String,
        storage_key: Option<String>,
        storage_url: Option<String>,
    ) -> Self {
        Self {
            success: true,
            message: message.into(),
            request_id: request.request_id.clone(),
            user_id: request.user_id.clone(),
            project_id: request.project_id.clone(),
            file_path: Some(file_path),
            storage_key,
            storage_url,
            error: None,
            status: DownloadStatus::Completed,
        }
    }

    /// 创建超时结果
    ///
    /// 超时结果始终从触发请求构造，保证标识字段在作用域内。
    /// `deadline_secs` 是实际生效的超时值（请求值或服务默认值）。
    pub fn timeout(request: &DownloadRequest, deadline_secs: u64) -> Self {
        Self {
            success: false,
            message: "Download timed out".to_string(),
            request_id: request.request_id.clone(),
            user_id: request.user_id.clone(),
            project_id: request.project_id.clone(),
            file_path: None,
            storage_key: None,
            storage_url: None,
            error: Some(format!(
                "Download did not complete within {} seconds",
                deadline_secs
            )),
            status: DownloadStatus::Timeout,
        }
    }

    /// 创建失败结果
    pub fn error(request: &DownloadRequest, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Download failed".to_string(),
            request_id: request.request_id.clone(),
            user_id: request.user_id.clone(),
            project_id: request.project_id.clone(),
            file_path: None,
            storage_key: None,
            storage_url: None,
            error: Some(error.into()),
            status: DownloadStatus::Error,
        }
    }
}

/// 批量下载结果
///
/// 结果顺序与输入 URL 顺序一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDownloadResponse {
    pub overall_success: bool,
    pub results: Vec<DownloadResponse>,
}

impl BatchDownloadResponse {
    /// 从有序结果列表构造，聚合成功标志为所有结果的逻辑与
    pub fn from_results(results: Vec<DownloadResponse>) -> Self {
        let overall_success = results.iter().all(|r| r.success);
        Self {
            overall_success,
            results,
        }
    }
}

use axum::{extract::State, Json};
use url::Url;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::models::{BatchDownloadRequest, BatchDownloadResponse, DownloadRequest, DownloadResponse};

/// 单个下载端点
///
/// 请求体验证失败返回 422；进入协调器后的任何失败都体现在
/// 响应体的 status/error 字段，HTTP 层始终返回 200
pub async fn download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<Json<DownloadResponse>> {
    validate_url(&request.url)?;

    Ok(Json(state.download_service.fetch(&request).await))
}

/// 批量下载端点
pub async fn batch_download(
    State(state): State<AppState>,
    Json(request): Json<BatchDownloadRequest>,
) -> ApiResult<Json<BatchDownloadResponse>> {
    if request.urls.is_empty() {
        return Err(ApiError::Validation("urls must not be empty".to_string()));
    }
    for url in &request.urls {
        validate_url(url)?;
    }

    Ok(Json(state.download_service.fetch_all(&request).await))
}

/// 校验下载 URL：必须是合法的 http/https 地址
fn validate_url(raw: &str) -> ApiResult<()> {
    if raw.trim().is_empty() {
        return Err(ApiError::Validation("url must not be empty".to_string()));
    }

    let parsed = Url::parse(raw)
        .map_err(|e| ApiError::Validation(format!("invalid url '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ApiError::Validation(format!(
            "unsupported url scheme '{}', expected http or https",
            other
        ))),
    }
}

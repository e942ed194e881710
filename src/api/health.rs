use axum::{response::IntoResponse, Json};
use serde_json::json;

/// 健康检查端点
///
/// 无依赖探测，进程能响应即视为健康
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

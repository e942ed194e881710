// 下载模块错误类型定义
//
// 定义媒体提取和对象存储传输中可能出现的错误类型。
// 超时不在此处建模：协调器统一将 deadline 到期映射为 timeout 状态。

use thiserror::Error;

/// 媒体提取相关错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("无法启动提取进程: {0}")]
    Spawn(std::io::Error),

    #[error("元数据提取失败: {0}")]
    Metadata(String),

    #[error("提取失败: {0}")]
    Extraction(String),

    #[error("提取完成但未找到输出文件: {0}")]
    OutputMissing(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 对象存储传输相关错误
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("上传失败: {0}")]
    Upload(String),

    #[error("下载失败: {0}")]
    Download(String),

    #[error("对象不存在: {0}")]
    NotFound(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

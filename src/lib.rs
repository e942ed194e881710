// 媒体下载后端库
//
// 本库提供在线视频下载编排的核心功能，包括：
// - API 路由
// - yt-dlp 媒体提取
// - S3 对象存储上传
// - 磁盘 TTL 缓存与定期清理

pub mod api;
pub mod config;
pub mod models;
pub mod services;

// 配置加载
//
// 从环境变量加载服务配置。必需的存储配置缺失时启动失败，
// 进程不会在没有存储凭证的情况下对外服务。

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("缺少必需的环境变量: {0}")]
    Missing(&'static str),

    #[error("环境变量 {0} 的值无效: {1}")]
    Invalid(&'static str, String),
}

/// 服务配置
#[derive(Debug, Clone)]
pub struct Settings {
    /// AWS 区域
    pub aws_region: String,
    /// S3 存储桶名称
    pub aws_bucket_name: String,
    /// 缓存目录
    pub cache_dir: PathBuf,
    /// 缓存过期时间
    pub cache_ttl: Duration,
    /// 单次下载默认超时
    pub download_timeout: Duration,
    /// 最大并发下载数
    pub max_concurrent_fetchers: usize,
    /// 缓存清理间隔
    pub cleanup_interval: Duration,
    /// 日志级别
    pub log_level: String,
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Settings {
    /// 从进程环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从给定的查找函数加载配置（便于测试）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 必需配置：无默认值，缺失即启动失败
        let aws_region = require(&lookup, "AWS_REGION")?;
        require(&lookup, "AWS_ACCESS_KEY_ID")?;
        require(&lookup, "AWS_SECRET_ACCESS_KEY")?;
        let aws_bucket_name = require(&lookup, "AWS_BUCKET_NAME")?;

        let cache_dir = PathBuf::from(
            lookup("CACHE_DIR").unwrap_or_else(|| "./temp".to_string()),
        );
        let cache_ttl = Duration::from_secs(parse_or(&lookup, "CACHE_TTL", 86400)?);
        let download_timeout =
            Duration::from_secs(parse_or(&lookup, "DOWNLOAD_TIMEOUT", 600)?);
        let max_concurrent_fetchers =
            parse_or(&lookup, "MAX_CONCURRENT_FETCHERS", 4u64)? as usize;
        let cleanup_interval = Duration::from_secs(
            parse_or(&lookup, "CLEANUP_INTERVAL_HOURS", 72)? * 3600,
        );
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "INFO".to_string());
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8200u64)? as u16;

        Ok(Self {
            aws_region,
            aws_bucket_name,
            cache_dir,
            cache_ttl,
            download_timeout,
            max_concurrent_fetchers,
            cleanup_interval,
            log_level,
            host,
            port,
        })
    }
}

/// 读取必需的环境变量
fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

/// 读取可选的数值环境变量，缺失时使用默认值
fn parse_or<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid(key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("AWS_REGION", "us-east-1"),
            ("AWS_ACCESS_KEY_ID", "AKIATEST"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_BUCKET_NAME", "test-bucket"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<Settings, ConfigError> {
        Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let settings = load(&base_env()).unwrap();

        assert_eq!(settings.cache_dir, PathBuf::from("./temp"));
        assert_eq!(settings.cache_ttl, Duration::from_secs(86400));
        assert_eq!(settings.download_timeout, Duration::from_secs(600));
        assert_eq!(settings.max_concurrent_fetchers, 4);
        assert_eq!(settings.cleanup_interval, Duration::from_secs(72 * 3600));
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.port, 8200);
    }

    #[test]
    fn test_missing_required_fails() {
        let mut env = base_env();
        env.remove("AWS_BUCKET_NAME");

        let result = load(&env);
        assert!(matches!(result, Err(ConfigError::Missing("AWS_BUCKET_NAME"))));
    }

    #[test]
    fn test_empty_required_fails() {
        let mut env = base_env();
        env.insert("AWS_REGION", "");

        assert!(matches!(load(&env), Err(ConfigError::Missing("AWS_REGION"))));
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("CACHE_TTL", "3600");
        env.insert("MAX_CONCURRENT_FETCHERS", "8");
        env.insert("CLEANUP_INTERVAL_HOURS", "1");

        let settings = load(&env).unwrap();
        assert_eq!(settings.cache_ttl, Duration::from_secs(3600));
        assert_eq!(settings.max_concurrent_fetchers, 8);
        assert_eq!(settings.cleanup_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_number_fails() {
        let mut env = base_env();
        env.insert("CACHE_TTL", "not-a-number");

        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid("CACHE_TTL", _))
        ));
    }
}

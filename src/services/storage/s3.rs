// S3 对象存储客户端
//
// 提供按键上传/下载对象的能力。存储服务的线协议视为黑盒，
// 只约定成功/失败结果。

use crate::services::downloader::error::TransferError;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// 对象存储接口
///
/// 按存储键上传/下载对象；`url_for` 生成对象的公开访问 URL
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 上传本地文件到指定键，成功返回该键
    async fn put(&self, local_path: &Path, key: &str) -> Result<String, TransferError>;

    /// 下载指定键的对象到目标目录，返回本地路径
    async fn get(&self, key: &str, dest_dir: &Path) -> Result<PathBuf, TransferError>;

    /// 生成对象的公开访问 URL
    fn url_for(&self, key: &str) -> String;
}

/// 基于 aws-sdk-s3 的对象存储实现
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3BlobStore {
    /// 创建 S3 客户端
    ///
    /// 凭证由标准 AWS 环境变量提供（启动时已校验其存在）
    pub async fn new(bucket: String, region: String) -> Self {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        Self {
            client: Client::new(&config),
            bucket,
            region,
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, local_path: &Path, key: &str) -> Result<String, TransferError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| TransferError::Upload(format!("读取本地文件失败: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, error = %e, "S3 上传失败");
                TransferError::Upload(e.to_string())
            })?;

        info!(bucket = %self.bucket, key = %key, "S3 上传成功");
        Ok(key.to_string())
    }

    async fn get(&self, key: &str, dest_dir: &Path) -> Result<PathBuf, TransferError> {
        let filename = Path::new(key)
            .file_name()
            .ok_or_else(|| TransferError::Download(format!("无效的存储键: {}", key)))?;
        let dest_path = dest_dir.join(filename);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    GetObjectError::NoSuchKey(_) => TransferError::NotFound(key.to_string()),
                    _ => {
                        error!(bucket = %self.bucket, key = %key, error = %e, "S3 下载失败");
                        TransferError::Download(e.to_string())
                    }
                },
                _ => {
                    error!(bucket = %self.bucket, key = %key, error = %e, "S3 下载失败");
                    TransferError::Download(e.to_string())
                }
            })?;

        tokio::fs::create_dir_all(dest_dir).await?;

        let mut body = response.body.into_async_read();
        let mut file = tokio::fs::File::create(&dest_path).await?;
        tokio::io::copy(&mut body, &mut file).await?;

        info!(bucket = %self.bucket, key = %key, path = %dest_path.display(), "S3 下载成功");
        Ok(dest_path)
    }

    fn url_for(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // URL 格式与对象存储服务的公开访问格式一致
    #[tokio::test]
    async fn test_url_for_format() {
        let store = S3BlobStore::new("my-bucket".to_string(), "us-east-1".to_string()).await;

        assert_eq!(
            store.url_for("user-1/project/p-1/youtube/video.m4a"),
            "https://my-bucket.s3.us-east-1.amazonaws.com/user-1/project/p-1/youtube/video.m4a"
        );
    }
}

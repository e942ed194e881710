// 媒体提取器 - 调用 yt-dlp 子进程下载媒体和字幕
//
// 本模块提供媒体提取功能，包括：
// - 元数据提取（标题解析，无副作用）
// - 媒体 + 字幕下载到本地路径
// - 逐行解析下载进度并通过 channel 上报
// - 进程级取消清理（kill_on_drop，不留孤儿进程）

use crate::services::downloader::error::FetchError;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// 媒体元数据（提取自源 URL，无副作用）
#[derive(Debug, Clone)]
pub struct MediaMetadata {
    pub title: String,
}

/// 下载进度事件
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// 下载中，携带完成百分比和速度
    Downloading { percent: f64, speed: String },
    /// 下载完成
    Finished,
}

/// 下载选项
///
/// `file_stem` 由协调器根据标题和时间戳预先计算，
/// 避免并发请求不同标题时的文件名冲突
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub file_stem: String,
    pub subtitle_langs: Vec<String>,
}

/// 媒体提取器接口
///
/// 外部协作者：提取机制本身视为黑盒，只约定成功/失败和进度流
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// 提取元数据（不下载）
    async fn extract_metadata(&self, url: &str) -> Result<MediaMetadata, FetchError>;

    /// 下载媒体和字幕到本地路径
    ///
    /// 进度事件通过 `progress` 发送；消费者掉线不得阻塞下载
    async fn fetch_to_path(
        &self,
        url: &str,
        options: &FetchOptions,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<PathBuf, FetchError>;
}

/// yt-dlp 进度行正则
///
/// 匹配形如 `[download]  42.5% of 10.00MiB at 1.25MiB/s ETA 00:05`
fn progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%.*?\bat\s+(\S+)").unwrap()
    })
}

/// 解析一行 yt-dlp 输出为进度事件
///
/// 非进度行返回 None；100% 行和"已下载"行视为完成
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();

    if line.starts_with("[download]") && line.contains("has already been downloaded") {
        return Some(ProgressEvent::Finished);
    }

    let captures = progress_regex().captures(line)?;
    let percent: f64 = captures.get(1)?.as_str().parse().ok()?;
    if percent >= 100.0 {
        return Some(ProgressEvent::Finished);
    }

    let speed = captures.get(2)?.as_str().to_string();
    Some(ProgressEvent::Downloading { percent, speed })
}

/// 清理标题中不能用于文件名的字符
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            other => other,
        })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 基于 yt-dlp 子进程的媒体提取器
pub struct YtDlpFetcher {
    /// yt-dlp 可执行文件路径
    binary: String,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// 在输出目录中定位下载产物
    ///
    /// yt-dlp 的输出模板以 `%(ext)s` 结尾，实际扩展名在下载后才确定，
    /// 因此按文件名前缀扫描，跳过字幕和未完成的分片文件
    async fn locate_output(
        &self,
        output_dir: &Path,
        file_stem: &str,
    ) -> Result<PathBuf, FetchError> {
        let mut entries = tokio::fs::read_dir(output_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };

            if !name.starts_with(file_stem) {
                continue;
            }

            // 跳过字幕文件和未完成的下载分片
            if name.ends_with(".srt") || name.ends_with(".vtt") || name.ends_with(".part") {
                continue;
            }

            return Ok(path);
        }

        Err(FetchError::OutputMissing(file_stem.to_string()))
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn extract_metadata(&self, url: &str) -> Result<MediaMetadata, FetchError> {
        debug!("提取元数据: {}", url);

        let output = Command::new(&self.binary)
            .args(["--dump-json", "--skip-download", "--no-warnings", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(FetchError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Metadata(stderr.trim().to_string()));
        }

        // --dump-json 每个视频输出一行 JSON
        let stdout = String::from_utf8_lossy(&output.stdout);
        let first_line = stdout
            .lines()
            .find(|line| line.trim_start().starts_with('{'))
            .ok_or_else(|| FetchError::Metadata("提取器未返回元数据".to_string()))?;

        let info: serde_json::Value = serde_json::from_str(first_line)
            .map_err(|e| FetchError::Metadata(format!("元数据解析失败: {}", e)))?;

        let title = info
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("video")
            .to_string();

        Ok(MediaMetadata { title })
    }

    async fn fetch_to_path(
        &self,
        url: &str,
        options: &FetchOptions,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<PathBuf, FetchError> {
        tokio::fs::create_dir_all(&options.output_dir).await?;

        let template = options
            .output_dir
            .join(format!("{}.%(ext)s", options.file_stem));
        let sub_langs = options.subtitle_langs.join(",");

        debug!("开始下载: {} -> {}", url, template.display());

        // kill_on_drop: deadline 到期后 future 被丢弃时回收子进程
        let mut child = Command::new(&self.binary)
            .arg("-f")
            .arg("bestaudio/best")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(&sub_langs)
            .arg("--sub-format")
            .arg("srt")
            .arg("-o")
            .arg(&template)
            .arg("--newline")
            .arg("--no-warnings")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(FetchError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::Extraction("无法捕获 stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| FetchError::Extraction("无法捕获 stderr".to_string()))?;

        // stderr 单独收集，下载失败时作为错误信息
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let mut reader = BufReader::new(stderr);
            let _ = reader.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(event) = parse_progress_line(&line) {
                // 消费者已掉线时忽略发送失败，不影响下载
                let _ = progress.send(event);
            }
        }

        let status = child.wait().await?;
        let stderr_output = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let detail = if stderr_output.trim().is_empty() {
                format!("提取进程退出状态: {}", status)
            } else {
                stderr_output.trim().to_string()
            };
            warn!("下载失败: {} - {}", url, detail);
            return Err(FetchError::Extraction(detail));
        }

        self.locate_output(&options.output_dir, &options.file_stem)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_downloading_line() {
        let event =
            parse_progress_line("[download]  42.5% of 10.00MiB at 1.25MiB/s ETA 00:05").unwrap();

        match event {
            ProgressEvent::Downloading { percent, speed } => {
                assert!((percent - 42.5).abs() < f64::EPSILON);
                assert_eq!(speed, "1.25MiB/s");
            }
            other => panic!("期望 Downloading 事件，得到: {:?}", other),
        }
    }

    #[test]
    fn test_parse_finished_line() {
        let event =
            parse_progress_line("[download] 100% of 10.00MiB at 2.00MiB/s").unwrap();
        assert_eq!(event, ProgressEvent::Finished);
    }

    #[test]
    fn test_parse_already_downloaded_line() {
        let event = parse_progress_line(
            "[download] downloads/video.m4a has already been downloaded",
        )
        .unwrap();
        assert_eq!(event, ProgressEvent::Finished);
    }

    #[test]
    fn test_parse_non_progress_lines() {
        assert!(parse_progress_line("[youtube] abc123: Downloading webpage").is_none());
        assert!(parse_progress_line("[info] Writing video subtitles").is_none());
        assert!(parse_progress_line("").is_none());
        // 进度行缺少速度字段时不产生事件
        assert!(parse_progress_line("[download]  10.0% of 5.00MiB").is_none());
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Rust in 10 Minutes"), "Rust in 10 Minutes");
        assert_eq!(sanitize_title("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_title("  spaced  "), "spaced");
        assert_eq!(sanitize_title(""), "video");
        assert_eq!(sanitize_title("///"), "___");
    }

    #[tokio::test]
    async fn test_locate_output_skips_subtitles() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        tokio::fs::write(dir.join("title_20260101_000000.en.srt"), b"sub")
            .await
            .unwrap();
        tokio::fs::write(dir.join("title_20260101_000000.m4a"), b"audio")
            .await
            .unwrap();
        tokio::fs::write(dir.join("other_file.m4a"), b"noise")
            .await
            .unwrap();

        let fetcher = YtDlpFetcher::new();
        let path = fetcher
            .locate_output(dir, "title_20260101_000000")
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "title_20260101_000000.m4a");
    }

    #[tokio::test]
    async fn test_locate_output_missing() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = YtDlpFetcher::new();

        let result = fetcher.locate_output(temp_dir.path(), "nope").await;
        assert!(matches!(result, Err(FetchError::OutputMissing(_))));
    }

    #[tokio::test]
    async fn test_dropped_progress_consumer_does_not_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        // 发送失败被忽略，与下载流程中的行为一致
        assert!(tx.send(ProgressEvent::Finished).is_err());
    }
}

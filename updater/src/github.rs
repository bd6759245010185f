//! GitHub Release API 클라이언트
//!
//! `<base-url>/repos/<owner>/<repo>/releases/latest` 한 번의 요청으로
//! 최신 정식 릴리스(draft/prerelease 제외)를 가져오고,
//! 에셋 바이너리를 디스크로 스트리밍 다운로드합니다.
//! 재시도는 하지 않습니다. 재시도 정책은 스케줄러의 다음 주기 체크가 담당합니다.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::{FeedError, UpdaterError};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// GitHub Release 응답 (필요한 필드만)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// GitHub Release Asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub size: u64,
    /// API 에셋 URL: `Accept: application/octet-stream`으로 요청하면 바이너리를 돌려줌
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub browser_download_url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl GitHubAsset {
    /// 다운로드 위치: `url`, 비어 있으면 `browser_download_url`
    pub fn download_url(&self) -> Option<&str> {
        if !self.url.trim().is_empty() {
            return Some(self.url.as_str());
        }
        self.browser_download_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
    }
}

/// 릴리스 피드 경계
///
/// 엔진은 이 트레이트만 알고 있으며, 실제 구현은 [`GitHubClient`]입니다.
pub trait ReleaseFeed: Send + Sync {
    /// 최신 릴리스 디스크립터를 가져온다
    fn fetch_latest_release(&self)
        -> impl Future<Output = Result<GitHubRelease, FeedError>> + Send;

    /// 에셋을 `dest` 파일에 스트리밍으로 기록하고 기록한 바이트 수를 반환한다.
    /// `dest`는 호출자가 이미 만들어 둔 빈 파일이다.
    fn download_asset(
        &self,
        asset: &GitHubAsset,
        dest: &Path,
    ) -> impl Future<Output = Result<u64, UpdaterError>> + Send;
}

/// GitHub API 클라이언트
pub struct GitHubClient {
    owner: String,
    repo: String,
    /// 피드 요청용 (짧은 타임아웃)
    http: reqwest::Client,
    /// 에셋 다운로드용 (긴 타임아웃)
    download_http: reqwest::Client,
    /// API 베이스 URL (기본: "https://api.github.com")
    /// 로컬 mock 서버 테스트 시 "http://127.0.0.1:9876" 등으로 오버라이드
    base_url: String,
}

impl GitHubClient {
    /// base_url과 타임아웃을 지정하는 생성자
    pub fn with_options(
        owner: &str,
        repo: &str,
        base_url: Option<&str>,
        feed_timeout: Duration,
        download_timeout: Duration,
    ) -> Result<Self, FeedError> {
        let user_agent = concat!("d2tool-updater/", env!("CARGO_PKG_VERSION"));
        let build = |timeout: Duration| {
            reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .map_err(|e| FeedError::Transport {
                    message: format!("failed to create HTTP client: {}", e),
                    timeout: false,
                })
        };

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            http: build(feed_timeout)?,
            download_http: build(download_timeout)?,
            base_url: base_url
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.base_url, self.owner, self.repo
        )
    }
}

impl ReleaseFeed for GitHubClient {
    /// 최신 릴리스 가져오기 (프리릴리스 제외)
    async fn fetch_latest_release(&self) -> Result<GitHubRelease, FeedError> {
        let url = self.latest_release_url();
        tracing::debug!("[Feed] GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| FeedError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| FeedError::from_reqwest(&e))?;
        let release: GitHubRelease =
            serde_json::from_str(&text).map_err(|e| FeedError::Parse(e.to_string()))?;

        tracing::info!(
            "[Feed] Latest release: {} ({} asset(s))",
            release.tag_name,
            release.assets.len()
        );
        Ok(release)
    }

    /// 에셋을 파일로 다운로드 (스트리밍)
    async fn download_asset(&self, asset: &GitHubAsset, dest: &Path) -> Result<u64, UpdaterError> {
        let download_err = |message: String| UpdaterError::Download {
            asset: asset.name.clone(),
            message,
        };

        let url = asset
            .download_url()
            .ok_or_else(|| download_err("asset has no download URL".to_string()))?;

        tracing::info!("[Feed] Downloading {} → {}", asset.name, dest.display());

        let response = self
            .download_http
            .get(url)
            .header("Accept", "application/octet-stream")
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(dest)
            .await
            .map_err(|e| UpdaterError::io("open download file", dest, e))?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| download_err(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdaterError::io("write download file", dest, e))?;
            written += chunk.len() as u64;
            if written > asset.size {
                tracing::warn!(
                    "[Feed] {} exceeded its declared size ({} > {}), aborting download",
                    asset.name,
                    written,
                    asset.size
                );
                return Err(UpdaterError::SizeMismatch {
                    asset: asset.name.clone(),
                    expected: asset.size,
                    actual: written,
                });
            }
        }
        file.flush()
            .await
            .map_err(|e| UpdaterError::io("flush download file", dest, e))?;

        tracing::info!("[Feed] Downloaded {} ({} bytes)", asset.name, written);
        Ok(written)
    }
}

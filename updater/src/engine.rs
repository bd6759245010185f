//! 업데이트 엔진: 체크/다운로드/적용 오케스트레이션
//!
//! `check_for_update`와 `apply_update`는 하나의 뮤텍스를 본문 전체 동안 잡습니다.
//! 따라서 같은 엔진 인스턴스에서 두 연산이 겹쳐 실행되지 않습니다.
//!
//! ```text
//! Idle ─check_for_update─▶ Checking ─▶ Idle
//! Idle ─apply_update────▶ Downloading ─▶ Idle
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::UpdaterError;
use crate::extract;
use crate::github::{GitHubClient, ReleaseFeed};
use crate::platform;
use crate::reaper::{self, ROTATION_PREFIX};
use crate::state::{UpdateState, UpdateStateTracker};
use crate::UpdateConfig;

/// 적용 완료 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedUpdate {
    /// 설치된 릴리스 태그
    pub version: String,
    pub asset_name: String,
    /// 다운로드한 바이트 수
    pub bytes: u64,
    /// 추출한 아카이브 항목 수
    pub entries: usize,
    /// 새 버전은 재시작 후에 실행됨
    pub restart_required: bool,
}

pub struct UpdateEngine<F = GitHubClient> {
    feed: F,
    tracker: UpdateStateTracker,
    install_root: PathBuf,
    asset_prefix: String,
    op_lock: Mutex<()>,
}

impl UpdateEngine<GitHubClient> {
    /// 설정으로부터 실제 GitHub 피드를 사용하는 엔진 생성
    pub fn from_config(config: &UpdateConfig, current_version: &str) -> Result<Self, UpdaterError> {
        let client = GitHubClient::with_options(
            &config.github_owner,
            &config.github_repo,
            config.api_base_url.as_deref(),
            Duration::from_secs(config.feed_timeout_secs),
            Duration::from_secs(config.download_timeout_secs),
        )?;

        Ok(Self::new(
            client,
            current_version,
            config.resolve_install_root(),
            platform::asset_name_prefix(&config.tool_name),
        ))
    }
}

impl<F: ReleaseFeed> UpdateEngine<F> {
    pub fn new(
        feed: F,
        current_version: &str,
        install_root: impl Into<PathBuf>,
        asset_prefix: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            tracker: UpdateStateTracker::new(current_version),
            install_root: install_root.into(),
            asset_prefix: asset_prefix.into(),
            op_lock: Mutex::new(()),
        }
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn asset_prefix(&self) -> &str {
        &self.asset_prefix
    }

    pub fn current_version(&self) -> &str {
        self.tracker.current_version()
    }

    /// 현재 상태 스냅샷 (연산 락을 잡지 않음)
    pub async fn state(&self) -> UpdateState {
        self.tracker.current_snapshot().await
    }

    /// 시작 시 회전 파일 정리. check/apply와 직렬화된다.
    pub async fn cleanup_stale_files(&self) -> Result<usize, UpdaterError> {
        let _guard = self.op_lock.lock().await;
        self.sweep().await
    }

    /// 디렉터리 순회는 블로킹 I/O이므로 blocking 스레드에서 실행
    async fn sweep(&self) -> Result<usize, UpdaterError> {
        let root = self.install_root.clone();
        tokio::task::spawn_blocking(move || reaper::sweep(&root))
            .await
            .map_err(|e| {
                UpdaterError::io(
                    "stale file sweep",
                    &self.install_root,
                    std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                )
            })?
            .map_err(|e| UpdaterError::io("stale file sweep", &self.install_root, e))
    }

    /// 최신 릴리스를 확인하고 기록한다.
    /// 실패하면 이전에 기록한 릴리스/체크 시각은 그대로 둔다.
    pub async fn check_for_update(&self) -> Result<UpdateState, UpdaterError> {
        let _guard = self.op_lock.lock().await;

        if let Err(e) = self.sweep().await {
            tracing::warn!("[Engine] Stale file sweep failed before check: {}", e);
        }

        let release = self.feed.fetch_latest_release().await?;
        self.tracker.record_release(release, chrono::Utc::now()).await;

        let state = self.tracker.current_snapshot().await;
        if state.update_available {
            tracing::info!(
                "[Engine] Update available: {} -> {}",
                state.current_version,
                state.latest_version
            );
        } else {
            tracing::info!("[Engine] Up to date ({})", state.current_version);
        }
        Ok(state)
    }

    /// 기록된 릴리스의 플랫폼 에셋을 내려받아 설치 디렉터리에 적용한다
    pub async fn apply_update(&self) -> Result<AppliedUpdate, UpdaterError> {
        let _guard = self.op_lock.lock().await;

        let release = self
            .tracker
            .release_to_apply()
            .await
            .ok_or(UpdaterError::NoRelease)?;

        let state = self.tracker.current_snapshot().await;
        if !state.update_available {
            return Err(UpdaterError::AlreadyUpToDate {
                version: state.current_version,
            });
        }

        let asset = platform::select_asset(&release, &self.asset_prefix)
            .ok_or_else(|| UpdaterError::NoMatchingAsset {
                prefix: self.asset_prefix.clone(),
                tag: release.tag_name.clone(),
            })?
            .clone();

        self.sweep().await?;

        // 같은 볼륨에서 추출하도록 설치 디렉터리 안에 임시 파일 생성.
        // 예약 접두사를 붙여 두면 프로세스가 죽어 남은 파일도 다음 sweep이 지운다.
        let download = tempfile::Builder::new()
            .prefix(&format!("{}{}.", ROTATION_PREFIX, asset.name))
            .tempfile_in(&self.install_root)
            .map_err(|e| UpdaterError::io("create download file", &self.install_root, e))?;

        tracing::info!(
            "[Engine] Downloading {} ({} bytes) for release {}",
            asset.name,
            asset.size,
            release.tag_name
        );

        let written = self.feed.download_asset(&asset, download.path()).await?;
        if written != asset.size {
            // download 핸들이 drop되면서 파일도 삭제됨
            return Err(UpdaterError::SizeMismatch {
                asset: asset.name.clone(),
                expected: asset.size,
                actual: written,
            });
        }

        let root = self.install_root.clone();
        let entries = tokio::task::spawn_blocking(move || {
            let result = extract::extract_archive_file(download.path(), &root);
            if let Err(e) = download.close() {
                tracing::warn!("[Engine] Failed to remove downloaded archive: {}", e);
            }
            result
        })
        .await
        .map_err(|e| {
            UpdaterError::io(
                "extract archive",
                &self.install_root,
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            )
        })??;

        tracing::info!(
            "[Engine] Applied {} ({} entr(ies)); restart to run the new version",
            release.tag_name,
            entries
        );

        Ok(AppliedUpdate {
            version: release.tag_name.clone(),
            asset_name: asset.name,
            bytes: written,
            entries,
            restart_required: true,
        })
    }
}

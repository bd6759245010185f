//! # d2tool 업데이터 라이브러리
//!
//! 릴리스 피드(GitHub Releases)를 확인하고, 플랫폼에 맞는 아카이브를 내려받아
//! 실행 중인 애플리케이션의 파일을 설치 디렉터리에서 교체합니다.
//!
//! ## 구성
//! - **피드(github.rs)**: 최신 릴리스 조회, 에셋 스트리밍 다운로드
//! - **상태(state.rs)**: 마지막 릴리스/체크 시각, 업데이트 가능 여부 계산
//! - **추출(extract.rs)**: 경로 탈출 방어, 기존 파일 `.old.` 회전 후 기록
//! - **정리(reaper.rs)**: 이전 업데이트가 남긴 `.old.*` 파일 삭제
//! - **엔진(engine.rs)**: check/apply를 하나의 락으로 직렬화
//! - **워커(worker.rs)**: 주기 체크 + "지금 확인" 요청 합치기 + 이벤트 발행
//!
//! ## 릴리스 에셋 규칙
//! 에셋 이름은 `<tool>-<os>-<arch>` 접두사로 시작해야 합니다
//! (예: `d2tool-windows-amd64.zip`). 아카이브는 설치 디렉터리 기준 상대 경로로 풀립니다.

// ══════════════════════════════════════════════════════
// 모듈
// ══════════════════════════════════════════════════════

pub mod engine;
pub mod error;
pub mod extract;
pub mod github;
pub mod platform;
pub mod reaper;
pub mod scheduler;
pub mod state;
pub mod worker;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use engine::{AppliedUpdate, UpdateEngine};
pub use error::{ExtractError, FeedError, UpdaterError};
pub use github::{GitHubAsset, GitHubClient, GitHubRelease, ReleaseFeed};
pub use scheduler::{CheckResult, SchedulerConfig};
pub use state::{UpdateState, UpdateStateTracker};
pub use worker::{BackgroundWorker, WorkerEvent};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 업데이트 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// 주기 체크 활성화 여부
    pub enabled: bool,
    /// 확인 주기 (시간 단위, 0이면 타이머 없음)
    pub check_interval_hours: u32,
    /// 시작 직후 1회 체크
    pub check_on_startup: bool,
    /// GitHub 레포지토리 소유자
    pub github_owner: String,
    /// GitHub 레포지토리 이름
    pub github_repo: String,
    /// API 베이스 URL 오버라이드 (테스트용 로컬 서버,
    /// 예: "http://127.0.0.1:9876")
    pub api_base_url: Option<String>,
    /// 에셋 접두사의 첫 부분
    pub tool_name: String,
    /// 설치 디렉터리 (기본값: 실행 파일이 있는 디렉터리)
    pub install_root: Option<String>,
    pub feed_timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_hours: 1,
            check_on_startup: true,
            github_owner: "MillQK".to_string(),
            github_repo: "d2tool".to_string(),
            api_base_url: None,
            tool_name: "d2tool".to_string(),
            install_root: None,
            feed_timeout_secs: 30,
            download_timeout_secs: 600,
        }
    }
}

impl UpdateConfig {
    /// install_root: 설정 경로 또는 실행 파일 기준
    pub fn resolve_install_root(&self) -> PathBuf {
        self.install_root
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(|d| d.to_path_buf()))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
    }
}

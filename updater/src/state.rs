//! 업데이트 상태 추적
//!
//! 마지막으로 성공한 체크의 릴리스 디스크립터와 체크 시각을 보관합니다.
//! 업데이트 가능 여부는 저장하지 않고 읽을 때마다 계산합니다.
//! 버전 비교는 문자열 동등성만 사용합니다 (피드의 latest가 기준).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::github::GitHubRelease;

/// 호출자에게 노출하는 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateState {
    /// 컴파일 시점 버전
    pub current_version: String,
    /// 마지막으로 확인된 최신 버전 (성공한 체크가 없으면 빈 문자열)
    pub latest_version: String,
    pub last_check: Option<DateTime<Utc>>,
    pub update_available: bool,
}

#[derive(Default)]
struct Recorded {
    release: Option<Arc<GitHubRelease>>,
    last_check: Option<DateTime<Utc>>,
}

/// 스레드 안전한 상태 보관소
pub struct UpdateStateTracker {
    current_version: String,
    inner: RwLock<Recorded>,
}

impl UpdateStateTracker {
    pub fn new(current_version: &str) -> Self {
        Self {
            current_version: current_version.to_string(),
            inner: RwLock::new(Recorded::default()),
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// 릴리스를 통째로 교체한다 (병합 없음)
    pub async fn record_release(&self, release: GitHubRelease, checked_at: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.release = Some(Arc::new(release));
        inner.last_check = Some(checked_at);
    }

    pub async fn current_snapshot(&self) -> UpdateState {
        let inner = self.inner.read().await;
        let latest_version = inner
            .release
            .as_ref()
            .map(|r| r.tag_name.clone())
            .unwrap_or_default();
        let update_available = is_update_available(&latest_version, &self.current_version);

        UpdateState {
            current_version: self.current_version.clone(),
            latest_version,
            last_check: inner.last_check,
            update_available,
        }
    }

    /// 기록된 릴리스 (없으면 None)
    pub async fn release_to_apply(&self) -> Option<Arc<GitHubRelease>> {
        self.inner.read().await.release.clone()
    }
}

/// `latest != "" && latest != current`
pub fn is_update_available(latest: &str, current: &str) -> bool {
    !latest.is_empty() && latest != current
}

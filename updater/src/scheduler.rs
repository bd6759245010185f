//! 스케줄러 설정과 원샷 체크 유틸리티
//!
//! 주기 실행 자체는 [`crate::worker::BackgroundWorker`]가 담당하고,
//! 이 모듈은 간격 설정과 CLI `check` 명령이 쓰는 원샷 체크를 제공합니다.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::UpdateEngine;
use crate::github::ReleaseFeed;
use crate::UpdateConfig;

/// 워커 타이머 설정
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 체크 간격 (기본 1시간)
    pub interval: Duration,
    /// 주기 체크 활성화 여부 ("지금 확인"은 항상 동작)
    pub enabled: bool,
    /// 워커 시작 직후 체크 1회 예약
    pub check_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            enabled: true,
            check_on_startup: true,
        }
    }
}

impl SchedulerConfig {
    pub fn from_update_config(config: &UpdateConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.check_interval_hours as u64 * 3600),
            enabled: config.enabled,
            check_on_startup: config.check_on_startup,
        }
    }
}

/// 원샷 업데이트 체크 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub update_available: bool,
    pub current_version: String,
    /// 성공한 체크가 없으면 빈 문자열
    pub latest_version: String,
    pub last_check: Option<DateTime<Utc>>,
    /// 오류 메시지 (있으면)
    pub error: Option<String>,
}

/// 한 번 체크하고 결과를 반환합니다.
pub async fn check_once<F: ReleaseFeed>(engine: &UpdateEngine<F>) -> CheckResult {
    tracing::info!("[Updater] Running one-shot update check");

    let (state, error) = match engine.check_for_update().await {
        Ok(state) => (state, None),
        Err(e) => {
            e.log("one-shot check");
            (engine.state().await, Some(e.to_string()))
        }
    };

    CheckResult {
        update_available: state.update_available,
        current_version: state.current_version,
        latest_version: state.latest_version,
        last_check: state.last_check,
        error,
    }
}

/// 체크 결과를 JSON 문자열로 직렬화 (`check --json` 출력용)
pub fn result_to_json(result: &CheckResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string())
}

/// 프로세스 종료 코드 결정
///
/// - `0`: 업데이트 있음
/// - `1`: 체크 실패 (에러)
/// - `2`: 업데이트 없음
pub fn exit_code(result: &CheckResult) -> i32 {
    if result.error.is_some() {
        1
    } else if result.update_available {
        0
    } else {
        2
    }
}

//! 전역 설정 파일 관리
//!
//! `config/global.toml` 에서 로그 레벨과 `[updater]` 섹션을 로드합니다.
//! 파일이 없으면 기본값을 사용합니다.

use anyhow::{Context, Result};
use d2tool_updater_lib::UpdateConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// RUST_LOG가 없을 때 사용할 필터 (예: "debug", "d2tool_updater_lib=trace")
    pub log_level: Option<String>,
    pub updater: UpdateConfig,
}

/// 설정 파일 경로 결정
pub fn config_file_path() -> PathBuf {
    // 1. 실행 파일 옆 config/global.toml
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let cfg = dir.join("config").join("global.toml");
            if cfg.exists() {
                return cfg;
            }
        }
    }

    // 2. CWD의 config/global.toml (없어도 이 경로를 반환)
    PathBuf::from("config").join("global.toml")
}

impl GlobalConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// 지정한 파일에서 로드. 파일이 없으면 기본값, 문법 오류는 에러.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        tracing::debug!("[Config] Loaded {}", path.display());
        Ok(cfg)
    }
}

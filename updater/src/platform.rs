//! 플랫폼별 에셋 이름 접두사
//!
//! 릴리스 에셋 이름은 `<tool>-<os>-<arch>` 형식입니다
//! (예: `d2tool-windows-amd64.zip`, `d2tool-darwin-arm64.zip`).

use crate::github::{GitHubAsset, GitHubRelease};

/// 릴리스 에셋에서 쓰는 OS 식별자
pub fn os_identifier() -> &'static str {
    map_os(std::env::consts::OS)
}

/// 릴리스 에셋에서 쓰는 아키텍처 식별자
pub fn arch_identifier() -> &'static str {
    map_arch(std::env::consts::ARCH)
}

fn map_os(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn map_arch(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

/// 현재 플랫폼의 에셋 이름 접두사
pub fn asset_name_prefix(tool_name: &str) -> String {
    format!("{}-{}-{}", tool_name, os_identifier(), arch_identifier())
}

/// 접두사가 일치하는 첫 번째 에셋 (피드 순서 기준)
pub fn select_asset<'a>(release: &'a GitHubRelease, prefix: &str) -> Option<&'a GitHubAsset> {
    release.assets.iter().find(|a| a.name.starts_with(prefix))
}

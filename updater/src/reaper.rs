//! 이전 업데이트가 남긴 회전 파일(`.old.*`) 정리
//!
//! 설치 디렉터리 아래에서 예약 접두사로 시작하는 파일만 삭제합니다.
//! 다른 파일은 절대 건드리지 않습니다.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 회전/임시 파일 예약 접두사
pub const ROTATION_PREFIX: &str = ".old.";

pub fn is_rotated_name(file_name: &str) -> bool {
    file_name.starts_with(ROTATION_PREFIX)
}

/// 같은 디렉터리 안의 회전 파일 경로 (`dir/name` → `dir/.old.name`)
pub fn rotated_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy();
    Some(path.with_file_name(format!("{}{}", ROTATION_PREFIX, name)))
}

/// `root` 아래의 회전 파일을 모두 삭제하고 삭제한 개수를 반환한다.
/// 예약 접두사가 붙은 디렉터리는 내용째 삭제한다.
/// 순회 오류나 개별 삭제 실패는 그대로 반환한다.
pub fn sweep(root: &Path) -> io::Result<usize> {
    let mut removed = 0;
    let mut walker = WalkDir::new(root).follow_links(false).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.depth() == 0 || !is_rotated_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let is_dir = entry.file_type().is_dir();
        let result = if is_dir {
            std::fs::remove_dir_all(entry.path())
        } else {
            std::fs::remove_file(entry.path())
        };
        result.map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("error removing old file {}: {}", entry.path().display(), e),
            )
        })?;
        if is_dir {
            walker.skip_current_dir();
        }

        tracing::debug!("[Reaper] Removed {}", entry.path().display());
        removed += 1;
    }

    if removed > 0 {
        tracing::info!("[Reaper] Removed {} stale file(s) under {}", removed, root.display());
    }
    Ok(removed)
}

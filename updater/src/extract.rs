//! zip 아카이브 추출
//!
//! ## 규칙
//! - 항목 경로를 어휘적으로 정규화(`.`/`..` 해석)한 결과가 대상 루트 밖이면
//!   디스크를 건드리기 전에 `PathTraversal`로 실패
//! - 대상 파일이 이미 있으면 덮어쓰지 않고 `.old.<name>`으로 옮긴 뒤 새로 씀
//!   (실행 중이라 잠긴 바이너리도 rename은 가능)
//! - 한 항목이 실패하면 나머지 항목은 처리하지 않음. 이미 적용된 항목은 되돌리지 않음

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek};
use std::path::{Component, Path, PathBuf};

use crate::error::{ExtractError, UpdaterError};
use crate::reaper::rotated_path;

/// 회전 rename 재시도 횟수 (Windows에서 백신/인덱서가 잠깐 파일을 잡는 경우)
const ROTATE_RETRIES: u32 = 3;

/// 항목 이름을 `root` 기준으로 정규화한다.
/// 루트 밖으로 나가거나 절대 경로이면 None.
pub fn resolve_entry_path(root: &Path, entry_name: &str) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(parts);
    Some(resolved)
}

/// 아카이브 항목 하나를 `root` 아래에 기록한다
pub fn extract_entry<R: Read>(
    entry_name: &str,
    is_dir: bool,
    unix_mode: Option<u32>,
    content: &mut R,
    root: &Path,
) -> Result<(), ExtractError> {
    let out_path = resolve_entry_path(root, entry_name).ok_or_else(|| {
        tracing::error!("[Extract] Rejected entry outside destination: {}", entry_name);
        ExtractError::PathTraversal {
            entry: entry_name.to_string(),
        }
    })?;

    if is_dir {
        return std::fs::create_dir_all(&out_path).map_err(|source| ExtractError::Io {
            path: out_path,
            source,
        });
    }

    if out_path == root {
        return Err(ExtractError::Io {
            path: out_path,
            source: io::Error::new(io::ErrorKind::InvalidInput, "file entry resolves to the destination root"),
        });
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ExtractError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    match std::fs::symlink_metadata(&out_path) {
        Ok(meta) if meta.is_dir() => {
            tracing::error!("[Extract] File entry {} would replace a directory", entry_name);
            return Err(ExtractError::Io {
                path: out_path,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "destination is an existing directory"),
            });
        }
        Ok(_) => rotate_existing(&out_path)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ExtractError::Io {
                path: out_path,
                source,
            })
        }
    }

    let mut outfile = create_with_mode(&out_path, unix_mode).map_err(|source| ExtractError::Io {
        path: out_path.clone(),
        source,
    })?;
    io::copy(content, &mut outfile).map_err(|source| ExtractError::Io {
        path: out_path.clone(),
        source,
    })?;

    tracing::debug!("[Extract] Wrote {}", out_path.display());
    Ok(())
}

/// 기존 파일을 같은 디렉터리의 `.old.<name>`으로 옮긴다
fn rotate_existing(path: &Path) -> Result<(), ExtractError> {
    let backup = rotated_path(path).ok_or_else(|| ExtractError::RotationFailed {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
    })?;

    // 이전 시도에서 남은 회전 파일이 있으면 먼저 삭제
    match std::fs::remove_file(&backup) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "[Extract] Failed to remove stale rotation {}: {}",
            backup.display(),
            e
        ),
    }

    let mut attempt = 0;
    loop {
        match std::fs::rename(path, &backup) {
            Ok(()) => {
                tracing::debug!("[Extract] Rotated {} -> {}", path.display(), backup.display());
                return Ok(());
            }
            Err(e) if attempt + 1 < ROTATE_RETRIES => {
                attempt += 1;
                let delay = std::time::Duration::from_millis(100 * 2u64.pow(attempt));
                tracing::warn!(
                    "[Extract] rename {} -> {} failed (attempt {}/{}), retrying in {:?}: {}",
                    path.display(),
                    backup.display(),
                    attempt,
                    ROTATE_RETRIES,
                    delay,
                    e
                );
                std::thread::sleep(delay);
            }
            Err(source) => {
                return Err(ExtractError::RotationFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

#[cfg(unix)]
fn create_with_mode(path: &Path, unix_mode: Option<u32>) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if let Some(mode) = unix_mode {
        options.mode(mode & 0o7777);
    }
    options.open(path)
}

#[cfg(not(unix))]
fn create_with_mode(path: &Path, _unix_mode: Option<u32>) -> io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

/// 아카이브의 모든 항목을 순서대로 추출하고 처리한 항목 수를 반환한다
pub fn extract_archive<R: Read + Seek>(reader: R, root: &Path) -> Result<usize, UpdaterError> {
    let mut archive =
        zip::ZipArchive::new(reader).map_err(|e| UpdaterError::InvalidArchive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| UpdaterError::InvalidArchive(e.to_string()))?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();
        let mode = entry.unix_mode();

        extract_entry(&name, is_dir, mode, &mut entry, root)?;
    }

    tracing::info!("[Extract] Extracted {} entr(ies) into {}", archive.len(), root.display());
    Ok(archive.len())
}

/// 디스크의 아카이브 파일을 추출
pub fn extract_archive_file(archive_path: &Path, root: &Path) -> Result<usize, UpdaterError> {
    let file = File::open(archive_path)
        .map_err(|e| UpdaterError::io("open archive", archive_path, e))?;
    extract_archive(file, root)
}

//! 엔진/워커 통합 테스트
//!
//! ## 테스트 시나리오
//! 1. check → apply 전체 흐름 (새 설치 / 기존 파일 회전)
//! 2. apply 전제 조건 (기록 없음, 최신 상태, 에셋 없음): 다운로드 시도 없음
//! 3. 크기 불일치: 다운로드 파일이 남지 않음
//! 4. 체크 실패 시 이전 상태 유지
//! 5. 워커: "지금 확인" 합치기, 이벤트 순서

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::{broadcast, Semaphore};

use crate::error::{FeedError, UpdaterError};
use crate::github::{GitHubAsset, GitHubRelease, ReleaseFeed};
use crate::{platform, BackgroundWorker, SchedulerConfig, UpdateEngine, WorkerEvent};

// ═══════════════════════════════════════════════════════
// 테스트 유틸리티
// ═══════════════════════════════════════════════════════

/// 메모리 안의 가짜 릴리스 피드
struct FakeFeed {
    /// Err(status) 이면 해당 HTTP 상태로 실패
    release: Arc<Mutex<Result<GitHubRelease, u16>>>,
    /// 다운로드 시 실제로 돌려줄 바이트
    payload: Vec<u8>,
    fetches: Arc<AtomicUsize>,
    downloads: Arc<AtomicUsize>,
    /// 설정되면 fetch가 허가를 받을 때까지 대기
    gate: Option<Arc<Semaphore>>,
}

impl FakeFeed {
    fn new(release: GitHubRelease, payload: Vec<u8>) -> Self {
        Self {
            release: Arc::new(Mutex::new(Ok(release))),
            payload,
            fetches: Arc::new(AtomicUsize::new(0)),
            downloads: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

impl ReleaseFeed for FakeFeed {
    async fn fetch_latest_release(&self) -> Result<GitHubRelease, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let current = self.release.lock().unwrap().clone();
        current.map_err(|status| FeedError::Status {
            status,
            body: "mock failure".into(),
        })
    }

    async fn download_asset(&self, _asset: &GitHubAsset, dest: &Path) -> Result<u64, UpdaterError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest, &self.payload).unwrap();
        Ok(self.payload.len() as u64)
    }
}

fn create_test_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip_writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        zip_writer.start_file(*name, options).unwrap();
        zip_writer.write_all(content).unwrap();
    }
    zip_writer.finish().unwrap().into_inner()
}

fn prefix() -> String {
    platform::asset_name_prefix("d2tool")
}

fn release_with(tag: &str, asset_name: &str, size: u64) -> GitHubRelease {
    GitHubRelease {
        tag_name: tag.to_string(),
        name: Some(format!("Release {}", tag)),
        body: None,
        prerelease: false,
        draft: false,
        published_at: None,
        html_url: None,
        assets: vec![GitHubAsset {
            name: asset_name.to_string(),
            size,
            url: format!("https://example.invalid/assets/{}", asset_name),
            browser_download_url: None,
            content_type: Some("application/zip".into()),
        }],
    }
}

/// 현재 플랫폼용 에셋 하나를 가진 릴리스
fn platform_release(tag: &str, archive: &[u8]) -> GitHubRelease {
    release_with(tag, &format!("{}.zip", prefix()), archive.len() as u64)
}

fn tool_bin() -> Vec<u8> {
    (0..500u32).map(|i| (i % 251) as u8).collect()
}

fn list_dir(root: &Path) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| PathBuf::from(e.unwrap().file_name()))
        .collect();
    out.sort();
    out
}

fn rotated_files(root: &Path) -> Vec<PathBuf> {
    list_dir(root)
        .into_iter()
        .filter(|p| p.to_string_lossy().starts_with(".old."))
        .collect()
}

async fn next_event(rx: &mut broadcast::Receiver<WorkerEvent>) -> WorkerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for worker event")
        .expect("event channel closed")
}

fn quiet_scheduler() -> SchedulerConfig {
    SchedulerConfig {
        interval: Duration::from_secs(3600),
        enabled: true,
        check_on_startup: false,
    }
}

// ═══════════════════════════════════════════════════════
// 1. check → apply 전체 흐름
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_check_then_apply_fresh_file() {
    let tmp = TempDir::new().unwrap();
    let content = tool_bin();
    let archive = create_test_zip(&[("tool.bin", &content)]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive.clone());
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    let state = engine.check_for_update().await.unwrap();
    assert!(state.update_available);
    assert_eq!(state.latest_version, "1.2.0");
    assert_eq!(state.current_version, "1.1.0");
    assert!(state.last_check.is_some());

    let applied = engine.apply_update().await.unwrap();
    assert_eq!(applied.version, "1.2.0");
    assert_eq!(applied.entries, 1);
    assert_eq!(applied.bytes, archive.len() as u64);
    assert!(applied.restart_required);

    assert_eq!(std::fs::read(tmp.path().join("tool.bin")).unwrap(), content);
    assert!(rotated_files(tmp.path()).is_empty(), "{:?}", list_dir(tmp.path()));
    assert_eq!(list_dir(tmp.path()), vec![PathBuf::from("tool.bin")]);
}

#[tokio::test]
async fn test_check_then_apply_rotates_existing_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("tool.bin"), b"old tool content").unwrap();

    let content = tool_bin();
    let archive = create_test_zip(&[("tool.bin", &content)]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    engine.check_for_update().await.unwrap();
    engine.apply_update().await.unwrap();

    assert_eq!(std::fs::read(tmp.path().join("tool.bin")).unwrap(), content);
    assert_eq!(
        std::fs::read(tmp.path().join(".old.tool.bin")).unwrap(),
        b"old tool content"
    );
    assert_eq!(
        list_dir(tmp.path()),
        vec![PathBuf::from(".old.tool.bin"), PathBuf::from("tool.bin")]
    );
}

#[tokio::test]
async fn test_next_check_reaps_rotated_files() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("tool.bin"), b"old").unwrap();

    let archive = create_test_zip(&[("tool.bin", b"new")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    engine.check_for_update().await.unwrap();
    engine.apply_update().await.unwrap();
    assert!(tmp.path().join(".old.tool.bin").exists());

    engine.check_for_update().await.unwrap();
    assert!(!tmp.path().join(".old.tool.bin").exists());
    assert_eq!(std::fs::read(tmp.path().join("tool.bin")).unwrap(), b"new");
}

#[tokio::test]
async fn test_cleanup_stale_files() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join(".old.d2tool"), b"previous").unwrap();
    std::fs::write(tmp.path().join("d2tool"), b"current").unwrap();

    let feed = FakeFeed::new(release_with("1.0.0", "x.zip", 0), Vec::new());
    let engine = UpdateEngine::new(feed, "1.0.0", tmp.path(), prefix());

    assert_eq!(engine.cleanup_stale_files().await.unwrap(), 1);
    assert_eq!(list_dir(tmp.path()), vec![PathBuf::from("d2tool")]);
}

// ═══════════════════════════════════════════════════════
// 2. apply 전제 조건
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_apply_without_check_fails() {
    let tmp = TempDir::new().unwrap();
    let archive = create_test_zip(&[("tool.bin", b"new")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let downloads = feed.downloads.clone();
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    let err = engine.apply_update().await.unwrap_err();
    assert!(matches!(err, UpdaterError::NoRelease), "{:?}", err);
    assert_eq!(downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_apply_when_up_to_date_does_not_download() {
    let tmp = TempDir::new().unwrap();
    let archive = create_test_zip(&[("tool.bin", b"same")]);
    let feed = FakeFeed::new(platform_release("1.1.0", &archive), archive);
    let downloads = feed.downloads.clone();
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    let state = engine.check_for_update().await.unwrap();
    assert!(!state.update_available);

    let err = engine.apply_update().await.unwrap_err();
    assert!(matches!(err, UpdaterError::AlreadyUpToDate { .. }), "{:?}", err);
    assert_eq!(downloads.load(Ordering::SeqCst), 0);
    assert!(list_dir(tmp.path()).is_empty());
}

#[tokio::test]
async fn test_apply_without_platform_asset() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "d2tool-plan9-mips.zip", 10), vec![0; 10]);
    let downloads = feed.downloads.clone();
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    engine.check_for_update().await.unwrap();
    let err = engine.apply_update().await.unwrap_err();
    match err {
        UpdaterError::NoMatchingAsset { prefix: p, tag } => {
            assert_eq!(p, prefix());
            assert_eq!(tag, "1.2.0");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(downloads.load(Ordering::SeqCst), 0);
}

// ═══════════════════════════════════════════════════════
// 3. 크기 불일치
// ═══════════════════════════════════════════════════════

async fn assert_size_mismatch_leaves_nothing(served: Vec<u8>, declared: u64) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("tool.bin"), b"installed").unwrap();

    let release = release_with("1.2.0", &format!("{}.zip", prefix()), declared);
    let feed = FakeFeed::new(release, served.clone());
    let downloads = feed.downloads.clone();
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    engine.check_for_update().await.unwrap();
    let err = engine.apply_update().await.unwrap_err();
    match err {
        UpdaterError::SizeMismatch { expected, actual, .. } => {
            assert_eq!(expected, declared);
            assert_eq!(actual, served.len() as u64);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(downloads.load(Ordering::SeqCst), 1);
    // 다운로드 파일 없음, 설치된 파일은 그대로
    assert_eq!(list_dir(tmp.path()), vec![PathBuf::from("tool.bin")]);
    assert_eq!(std::fs::read(tmp.path().join("tool.bin")).unwrap(), b"installed");
}

#[tokio::test]
async fn test_size_mismatch_short_download() {
    let archive = create_test_zip(&[("tool.bin", &tool_bin())]);
    let declared = archive.len() as u64;
    let short = archive[..archive.len() - 7].to_vec();
    assert_size_mismatch_leaves_nothing(short, declared).await;
}

#[tokio::test]
async fn test_size_mismatch_long_download() {
    let archive = create_test_zip(&[("tool.bin", &tool_bin())]);
    let declared = archive.len() as u64;
    let mut long = archive;
    long.extend_from_slice(b"trailing garbage");
    assert_size_mismatch_leaves_nothing(long, declared).await;
}

#[tokio::test]
async fn test_invalid_archive_is_cleaned_up() {
    let tmp = TempDir::new().unwrap();
    let payload = b"this is not a zip archive".to_vec();
    let release = release_with("1.2.0", &format!("{}.zip", prefix()), payload.len() as u64);
    let engine = UpdateEngine::new(FakeFeed::new(release, payload), "1.1.0", tmp.path(), prefix());

    engine.check_for_update().await.unwrap();
    let err = engine.apply_update().await.unwrap_err();
    assert!(matches!(err, UpdaterError::InvalidArchive(_)), "{:?}", err);
    assert!(list_dir(tmp.path()).is_empty(), "{:?}", list_dir(tmp.path()));
}

#[tokio::test]
async fn test_traversal_archive_is_rejected_and_cleaned_up() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("install");
    std::fs::create_dir_all(&root).unwrap();

    let archive = create_test_zip(&[("../escape.bin", b"evil")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let engine = UpdateEngine::new(feed, "1.1.0", &root, prefix());

    engine.check_for_update().await.unwrap();
    let err = engine.apply_update().await.unwrap_err();
    assert_eq!(err.error_code(), "PATH_TRAVERSAL");
    assert!(!tmp.path().join("escape.bin").exists());
    assert!(list_dir(&root).is_empty(), "{:?}", list_dir(&root));
}

#[tokio::test]
async fn test_leftover_rotation_directory_does_not_block_update() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join(".old.tool.bin")).unwrap();
    std::fs::write(root.join(".old.tool.bin/inner"), b"leftover").unwrap();
    std::fs::write(root.join("tool.bin"), b"current").unwrap();

    let archive = create_test_zip(&[("tool.bin", b"next")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let engine = UpdateEngine::new(feed, "1.1.0", root, prefix());

    engine.check_for_update().await.unwrap();
    engine.apply_update().await.unwrap();

    assert_eq!(std::fs::read(root.join("tool.bin")).unwrap(), b"next");
    assert_eq!(std::fs::read(root.join(".old.tool.bin")).unwrap(), b"current");
}

#[tokio::test]
async fn test_file_entry_over_directory_leaves_no_rotation() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("assets")).unwrap();
    std::fs::write(root.join("assets/icon.png"), b"icon").unwrap();

    let archive = create_test_zip(&[("assets", b"not a directory")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let engine = UpdateEngine::new(feed, "1.1.0", root, prefix());

    engine.check_for_update().await.unwrap();
    let err = engine.apply_update().await.unwrap_err();
    assert_eq!(err.error_code(), "EXTRACT_IO");

    assert_eq!(std::fs::read(root.join("assets/icon.png")).unwrap(), b"icon");
    assert_eq!(list_dir(root), vec![PathBuf::from("assets")]);
    assert_eq!(engine.cleanup_stale_files().await.unwrap(), 0);
}

#[tokio::test]
async fn test_apply_aborts_when_sweep_fails() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("install");
    std::fs::create_dir_all(&root).unwrap();

    let archive = create_test_zip(&[("tool.bin", b"next")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let downloads = feed.downloads.clone();
    let engine = UpdateEngine::new(feed, "1.1.0", &root, prefix());

    engine.check_for_update().await.unwrap();
    std::fs::remove_dir_all(&root).unwrap();

    let err = engine.apply_update().await.unwrap_err();
    assert_eq!(err.error_code(), "IO_ERROR");
    assert_eq!(downloads.load(Ordering::SeqCst), 0);
}

// ═══════════════════════════════════════════════════════
// 4. 체크 실패 시 상태 유지
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_failed_check_keeps_last_known_good_state() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]);
    let release = feed.release.clone();
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    let good = engine.check_for_update().await.unwrap();

    *release.lock().unwrap() = Err(503);
    let err = engine.check_for_update().await.unwrap_err();
    assert!(matches!(err, UpdaterError::Feed(FeedError::Status { status: 503, .. })), "{:?}", err);
    assert!(err.is_recoverable());

    let after = engine.state().await;
    assert_eq!(after, good);
    assert_eq!(after.latest_version, "1.2.0");
}

#[tokio::test]
async fn test_failed_first_check_leaves_empty_state() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]);
    *feed.release.lock().unwrap() = Err(404);
    let engine = UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix());

    assert!(engine.check_for_update().await.is_err());
    let state = engine.state().await;
    assert_eq!(state.latest_version, "");
    assert!(state.last_check.is_none());
    assert!(!state.update_available);
}

// ═══════════════════════════════════════════════════════
// 5. 워커
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_worker_check_now_emits_started_then_finished() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]);
    let engine = Arc::new(UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix()));
    let mut worker = BackgroundWorker::spawn(engine, quiet_scheduler());
    let mut events = worker.subscribe();

    assert!(worker.check_now());
    assert_eq!(next_event(&mut events).await, WorkerEvent::CheckStarted);
    match next_event(&mut events).await {
        WorkerEvent::CheckFinished { state, error } => {
            assert!(error.is_none());
            assert!(state.update_available);
            assert_eq!(state.latest_version, "1.2.0");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    worker.shutdown().await;
    assert_eq!(next_event(&mut events).await, WorkerEvent::WorkerShutdown);
}

#[tokio::test]
async fn test_worker_reports_check_failure() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]);
    *feed.release.lock().unwrap() = Err(500);
    let engine = Arc::new(UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix()));
    let mut worker = BackgroundWorker::spawn(engine, quiet_scheduler());
    let mut events = worker.subscribe();

    worker.check_now();
    assert_eq!(next_event(&mut events).await, WorkerEvent::CheckStarted);
    match next_event(&mut events).await {
        WorkerEvent::CheckFinished { state, error } => {
            assert!(error.unwrap().contains("500"));
            assert_eq!(state.latest_version, "");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn test_worker_coalesces_forced_checks() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]).with_gate(gate.clone());
    let fetches = feed.fetches.clone();
    let engine = Arc::new(UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix()));
    let mut worker = BackgroundWorker::spawn(engine, quiet_scheduler());
    let mut events = worker.subscribe();

    assert!(worker.check_now());
    assert_eq!(next_event(&mut events).await, WorkerEvent::CheckStarted);

    // 첫 체크가 gate에서 막혀 있는 동안 요청 폭주
    let accepted = (0..10).filter(|_| worker.check_now()).count();
    assert_eq!(accepted, 1, "only one extra check may be pending");

    gate.add_permits(100);

    assert!(matches!(next_event(&mut events).await, WorkerEvent::CheckFinished { .. }));
    assert_eq!(next_event(&mut events).await, WorkerEvent::CheckStarted);
    assert!(matches!(next_event(&mut events).await, WorkerEvent::CheckFinished { .. }));

    // 세 번째 체크는 없어야 함
    let extra = tokio::time::timeout(Duration::from_millis(300), events.recv()).await;
    assert!(extra.is_err(), "unexpected extra event: {:?}", extra);
    assert_eq!(fetches.load(Ordering::SeqCst), 2);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_worker_check_on_startup() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]);
    let fetches = feed.fetches.clone();
    let engine = Arc::new(UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix()));
    let config = SchedulerConfig {
        check_on_startup: true,
        ..quiet_scheduler()
    };
    let mut worker = BackgroundWorker::spawn(engine, config);

    for _ in 0..50 {
        if worker.state().await.last_check.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(worker.state().await.latest_version, "1.2.0");
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_worker_periodic_timer() {
    let tmp = TempDir::new().unwrap();
    let feed = FakeFeed::new(release_with("1.2.0", "x.zip", 1), vec![0]);
    let fetches = feed.fetches.clone();
    let engine = Arc::new(UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix()));
    let config = SchedulerConfig {
        interval: Duration::from_millis(100),
        ..quiet_scheduler()
    };
    let mut worker = BackgroundWorker::spawn(engine, config);
    let mut events = worker.subscribe();

    // 요청 없이 타이머만으로 체크가 두 번 일어남
    for _ in 0..2 {
        assert_eq!(next_event(&mut events).await, WorkerEvent::CheckStarted);
        assert!(matches!(next_event(&mut events).await, WorkerEvent::CheckFinished { .. }));
    }
    assert!(fetches.load(Ordering::SeqCst) >= 2);

    worker.shutdown().await;
}

#[tokio::test]
async fn test_worker_apply_emits_update_events() {
    let tmp = TempDir::new().unwrap();
    let archive = create_test_zip(&[("tool.bin", b"new")]);
    let feed = FakeFeed::new(platform_release("1.2.0", &archive), archive);
    let engine = Arc::new(UpdateEngine::new(feed, "1.1.0", tmp.path(), prefix()));
    let mut worker = BackgroundWorker::spawn(engine, quiet_scheduler());
    let mut events = worker.subscribe();

    // 체크 전: NoRelease 실패도 이벤트 쌍으로 보고
    assert!(worker.apply_update().await.is_err());
    assert_eq!(next_event(&mut events).await, WorkerEvent::UpdateStarted);
    match next_event(&mut events).await {
        WorkerEvent::UpdateFinished { success, error } => {
            assert!(!success);
            assert!(error.unwrap().contains("no release"));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    worker.check_now();
    assert_eq!(next_event(&mut events).await, WorkerEvent::CheckStarted);
    assert!(matches!(next_event(&mut events).await, WorkerEvent::CheckFinished { .. }));

    let applied = worker.apply_update().await.unwrap();
    assert_eq!(applied.version, "1.2.0");
    assert_eq!(next_event(&mut events).await, WorkerEvent::UpdateStarted);
    assert_eq!(
        next_event(&mut events).await,
        WorkerEvent::UpdateFinished { success: true, error: None }
    );
    assert_eq!(std::fs::read(tmp.path().join("tool.bin")).unwrap(), b"new");

    worker.shutdown().await;
}

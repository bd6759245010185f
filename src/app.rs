//! 애플리케이션 수명 주기
//!
//! 시작 시 회전 파일 정리 → 백그라운드 워커 시작 → 이벤트를 로그로 중계 →
//! 종료 신호를 받으면 워커를 멈춥니다.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use d2tool_updater_lib::{BackgroundWorker, SchedulerConfig, UpdateEngine, WorkerEvent};
use tokio::sync::broadcast;

use crate::config::GlobalConfig;

/// 실행 중인 바이너리의 버전 (릴리스 태그와 문자열로 비교됨)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 로깅 초기화: RUST_LOG > 설정의 log_level > "info".
/// stdout은 `check --json` 출력용이므로 로그는 stderr로 보낸다.
pub fn init_logging(log_level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level.unwrap_or("info")))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn build_engine(config: &GlobalConfig) -> Result<Arc<UpdateEngine>> {
    let engine = UpdateEngine::from_config(&config.updater, VERSION)?;
    tracing::info!(
        "[App] d2tool {} (install root: {}, asset prefix: {})",
        VERSION,
        engine.install_root().display(),
        engine.asset_prefix()
    );
    Ok(Arc::new(engine))
}

/// Ctrl+C까지 실행
pub async fn run(config: GlobalConfig) -> Result<()> {
    run_until(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[App] Failed to listen for Ctrl+C: {}", e);
        }
    })
    .await
}

/// `shutdown` 퓨처가 완료될 때까지 실행
pub async fn run_until<S>(config: GlobalConfig, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let engine = build_engine(&config)?;

    match engine.cleanup_stale_files().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("[App] Removed {} stale file(s) from previous update", n),
        Err(e) => e.log("startup cleanup"),
    }

    let mut worker = BackgroundWorker::spawn(
        engine,
        SchedulerConfig::from_update_config(&config.updater),
    );
    let relay = tokio::spawn(relay_events(worker.subscribe()));

    shutdown.await;
    tracing::info!("[App] Shutdown requested");

    worker.shutdown().await;
    if let Err(e) = relay.await {
        tracing::warn!("[App] Event relay ended abnormally: {}", e);
    }
    Ok(())
}

/// 워커 이벤트를 로그로 중계. WorkerShutdown을 받으면 끝난다.
async fn relay_events(mut events: broadcast::Receiver<WorkerEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::info!("[App] {}", describe_event(&event));
                if event == WorkerEvent::WorkerShutdown {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("[App] Missed {} worker event(s)", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub fn describe_event(event: &WorkerEvent) -> String {
    match event {
        WorkerEvent::CheckStarted => "Checking for updates".to_string(),
        WorkerEvent::CheckFinished { error: Some(e), .. } => format!("Update check failed: {}", e),
        WorkerEvent::CheckFinished { state, .. } if state.update_available => format!(
            "Update available: {} -> {}",
            state.current_version, state.latest_version
        ),
        WorkerEvent::CheckFinished { state, .. } => {
            format!("Up to date ({})", state.current_version)
        }
        WorkerEvent::UpdateStarted => "Applying update".to_string(),
        WorkerEvent::UpdateFinished { success: true, .. } => {
            "Update applied, restart to run the new version".to_string()
        }
        WorkerEvent::UpdateFinished { error, .. } => format!(
            "Update failed: {}",
            error.as_deref().unwrap_or("unknown error")
        ),
        WorkerEvent::WorkerShutdown => "Update worker stopped".to_string(),
    }
}

//! 백그라운드 워커: 주기적 체크와 "지금 확인" 요청 처리
//!
//! ## 아키텍처
//! - 독립적인 tokio 태스크 하나가 타이머와 강제 체크 요청을 기다린다
//! - 강제 체크 요청 채널의 용량은 1: 이미 대기 중인 요청이 있으면 새 요청은 버린다
//! - GUI/CLI는 이벤트 구독(broadcast)으로 상태 변화를 수신
//! - 적용(apply)은 호출한 태스크에서 실행하고, 앞뒤로 이벤트만 발행

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::engine::{AppliedUpdate, UpdateEngine};
use crate::error::UpdaterError;
use crate::github::ReleaseFeed;
use crate::scheduler::SchedulerConfig;
use crate::state::UpdateState;

/// 워커에서 발생하는 이벤트 (GUI/CLI에 브로드캐스트)
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// 버전 체크 시작
    CheckStarted,
    /// 버전 체크 종료 (실패해도 마지막으로 알려진 상태를 함께 전달)
    CheckFinished {
        state: UpdateState,
        error: Option<String>,
    },
    /// 업데이트 적용 시작
    UpdateStarted,
    /// 업데이트 적용 종료
    UpdateFinished {
        success: bool,
        error: Option<String>,
    },
    /// 워커 종료됨
    WorkerShutdown,
}

/// 백그라운드 워커 핸들
pub struct BackgroundWorker<F: ReleaseFeed + 'static> {
    engine: Arc<UpdateEngine<F>>,
    check_tx: mpsc::Sender<()>,
    event_tx: broadcast::Sender<WorkerEvent>,
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<F: ReleaseFeed + 'static> BackgroundWorker<F> {
    /// 새 백그라운드 워커 생성 및 시작
    pub fn spawn(engine: Arc<UpdateEngine<F>>, config: SchedulerConfig) -> Self {
        let (check_tx, check_rx) = mpsc::channel::<()>(1);
        let (event_tx, _) = broadcast::channel::<WorkerEvent>(64);
        let cancel = CancellationToken::new();

        if config.check_on_startup {
            let _ = check_tx.try_send(());
        }

        let handle = tokio::spawn(worker_loop(
            engine.clone(),
            config,
            check_rx,
            event_tx.clone(),
            cancel.clone(),
        ));

        Self {
            engine,
            check_tx,
            event_tx,
            cancel,
            handle: Some(handle),
        }
    }

    /// 버전 체크 요청 (수동).
    /// 이미 대기 중인 요청이 있으면 합쳐지고 false를 반환한다.
    pub fn check_now(&self) -> bool {
        match self.check_tx.try_send(()) {
            Ok(()) => {
                tracing::debug!("[Worker] Forced check queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::debug!("[Worker] Check already pending, request coalesced");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("[Worker] Check requested after worker stopped");
                false
            }
        }
    }

    /// 업데이트 적용. 호출한 태스크에서 실행하며 시작/종료 이벤트를 발행한다.
    pub async fn apply_update(&self) -> Result<AppliedUpdate, UpdaterError> {
        let _ = self.event_tx.send(WorkerEvent::UpdateStarted);
        tracing::info!("[Worker] Applying update");

        let result = self.engine.apply_update().await;

        let event = match &result {
            Ok(applied) => {
                tracing::info!("[Worker] Update {} applied", applied.version);
                WorkerEvent::UpdateFinished {
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                e.log("apply update");
                WorkerEvent::UpdateFinished {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        };
        let _ = self.event_tx.send(event);

        result
    }

    /// 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    pub async fn state(&self) -> UpdateState {
        self.engine.state().await
    }

    /// 워커 종료. 진행 중인 체크는 끝날 때까지 기다린다.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("[Worker] Worker task ended abnormally: {}", e);
            }
        }
    }
}

impl<F: ReleaseFeed + 'static> Drop for BackgroundWorker<F> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// 워커 메인 루프
async fn worker_loop<F: ReleaseFeed + 'static>(
    engine: Arc<UpdateEngine<F>>,
    config: SchedulerConfig,
    mut check_rx: mpsc::Receiver<()>,
    event_tx: broadcast::Sender<WorkerEvent>,
    cancel: CancellationToken,
) {
    let periodic = config.enabled && !config.interval.is_zero();
    if periodic {
        tracing::info!("[Worker] Background worker started (every {:?})", config.interval);
    } else {
        tracing::info!("[Worker] Background worker started (periodic check disabled)");
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.interval), if periodic => {
                tracing::debug!("[Worker] Checking for updates after timeout");
            }
            request = check_rx.recv() => {
                if request.is_none() {
                    break;
                }
                tracing::debug!("[Worker] Forcing update check");
            }
        }

        handle_check(&engine, &event_tx).await;
    }

    let _ = event_tx.send(WorkerEvent::WorkerShutdown);
    tracing::info!("[Worker] Background worker stopped");
}

/// 버전 체크 처리
async fn handle_check<F: ReleaseFeed>(
    engine: &UpdateEngine<F>,
    event_tx: &broadcast::Sender<WorkerEvent>,
) {
    let _ = event_tx.send(WorkerEvent::CheckStarted);

    let (state, error) = match engine.check_for_update().await {
        Ok(state) => (state, None),
        Err(e) => {
            e.log("check for update");
            (engine.state().await, Some(e.to_string()))
        }
    };

    let _ = event_tx.send(WorkerEvent::CheckFinished { state, error });
}

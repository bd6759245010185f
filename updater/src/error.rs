//! 에러 타입
//!
//! ## 분류
//! - `FeedError`: 릴리스 피드 요청 실패 (네트워크/타임아웃/HTTP 상태/본문 파싱)
//! - `ExtractError`: 아카이브 항목 추출 실패 (경로 탈출, 회전 실패, 파일 I/O)
//! - `UpdaterError`: 엔진 공개 연산(check/apply)이 반환하는 최상위 에러

use std::path::PathBuf;

/// 릴리스 피드 에러
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// 2xx 이외의 HTTP 응답
    #[error("release feed returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 연결 실패, 타임아웃 등 전송 계층 오류
    #[error("release feed request failed: {message}")]
    Transport { message: String, timeout: bool },

    /// 응답 본문이 릴리스 JSON으로 역직렬화되지 않음
    #[error("malformed release feed response: {0}")]
    Parse(String),
}

impl FeedError {
    /// reqwest 에러를 FeedError로 변환
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            FeedError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else {
            FeedError::Transport {
                message: err.to_string(),
                timeout: err.is_timeout(),
            }
        }
    }

    pub fn is_recoverable(&self) -> bool {
        match self {
            FeedError::Status { status, .. } => *status >= 500,
            FeedError::Transport { .. } => true,
            FeedError::Parse(_) => false,
        }
    }
}

/// 아카이브 항목 추출 에러
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// 정규화한 경로가 대상 루트 밖을 가리킴
    #[error("archive entry '{entry}' escapes the destination directory")]
    PathTraversal { entry: String },

    /// 기존 파일을 예약 접두사 이름으로 옮기지 못함
    #[error("failed to rotate existing file '{}': {source}", path.display())]
    RotationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 업데이트 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum UpdaterError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// check 성공 기록이 아직 없음
    #[error("no release has been recorded yet, check for updates first")]
    NoRelease,

    /// 최신 릴리스가 실행 중인 버전과 같음
    #[error("already up to date ({version})")]
    AlreadyUpToDate { version: String },

    /// 현재 플랫폼 접두사에 맞는 에셋이 없음
    #[error("no asset with prefix '{prefix}' found for release {tag}")]
    NoMatchingAsset { prefix: String, tag: String },

    /// 에셋 다운로드 실패 (HTTP 상태, 스트림 중단, 타임아웃)
    #[error("failed to download {asset}: {message}")]
    Download { asset: String, message: String },

    /// 받은 바이트 수가 피드가 선언한 크기와 다름
    #[error("downloaded asset size mismatch for {asset}: expected {expected}, got {actual}")]
    SizeMismatch {
        asset: String,
        expected: u64,
        actual: u64,
    },

    #[error("downloaded file is not a valid archive: {0}")]
    InvalidArchive(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("I/O error during {operation} on '{}': {source}", path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpdaterError {
    pub fn io(operation: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdaterError::Io {
            operation: operation.to_string(),
            path: path.into(),
            source,
        }
    }

    /// 다음 주기 체크나 재시도로 해결될 수 있는 에러인지 확인
    pub fn is_recoverable(&self) -> bool {
        match self {
            UpdaterError::Feed(e) => e.is_recoverable(),
            UpdaterError::Download { .. } => true,
            // 전송 중 손상으로 보고 재다운로드로 복구 가능
            UpdaterError::SizeMismatch { .. } => true,
            UpdaterError::NoRelease
            | UpdaterError::AlreadyUpToDate { .. }
            | UpdaterError::NoMatchingAsset { .. }
            | UpdaterError::InvalidArchive(_)
            | UpdaterError::Extract(_)
            | UpdaterError::Io { .. } => false,
        }
    }

    /// 머신 리더블 에러 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            UpdaterError::Feed(_) => "FEED_ERROR",
            UpdaterError::NoRelease => "NO_RELEASE",
            UpdaterError::AlreadyUpToDate { .. } => "ALREADY_UP_TO_DATE",
            UpdaterError::NoMatchingAsset { .. } => "NO_MATCHING_ASSET",
            UpdaterError::Download { .. } => "DOWNLOAD_FAILED",
            UpdaterError::SizeMismatch { .. } => "SIZE_MISMATCH",
            UpdaterError::InvalidArchive(_) => "INVALID_ARCHIVE",
            UpdaterError::Extract(ExtractError::PathTraversal { .. }) => "PATH_TRAVERSAL",
            UpdaterError::Extract(ExtractError::RotationFailed { .. }) => "ROTATION_FAILED",
            UpdaterError::Extract(ExtractError::Io { .. }) => "EXTRACT_IO",
            UpdaterError::Io { .. } => "IO_ERROR",
        }
    }

    /// 복구 가능 여부에 따라 로그 레벨을 골라 출력
    pub fn log(&self, operation: &str) {
        if self.is_recoverable() {
            tracing::warn!("[Error] {} (recoverable, {}): {}", operation, self.error_code(), self);
        } else {
            tracing::error!("[Error] {} (fatal, {}): {}", operation, self.error_code(), self);
        }
    }
}

//! 에러 타입 — 도메인별 에러 정의
//!
//! 런타임 에러는 최소 단위(레코드, 카테고리, 배치)에서 격리되며,
//! 프로세스를 종료시키는 것은 시작 시점의 [`ConfigError`]뿐입니다.

/// Logward 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// 설정 관련 에러 — 시작 시에만 발생하며 프로세스를 종료시킵니다.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 수집 파이프라인 에러
    #[error("collect error: {0}")]
    Collect(String),

    /// 전송 파이프라인 에러
    #[error("delivery error: {0}")]
    Delivery(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 필수 필드 누락
    #[error("missing required config field '{field}'")]
    MissingField { field: String },
}

/// 소스 접근 불가 사유
///
/// 리더는 소스에 접근할 수 없을 때 예외를 던지는 대신
/// 빈 결과와 함께 이 사유를 반환합니다 (카테고리 단위 비치명 에러).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// 로그 파일/도구가 존재하지 않음
    #[error("source not found")]
    NotFound,

    /// 읽기 권한 없음
    #[error("permission denied")]
    PermissionDenied,

    /// 하위 시스템(journald, 이벤트 로그) 사용 불가
    #[error("subsystem unavailable")]
    SubsystemUnavailable,

    /// 조회 시간 초과
    #[error("query timed out")]
    Timeout,
}

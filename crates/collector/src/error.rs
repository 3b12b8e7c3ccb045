//! 수집 크레이트 에러 타입
//!
//! [`CollectorError`]는 수집기 내부에서 발생하는 에러를 표현합니다.
//! 레코드 단위 파싱 실패는 에러가 아니라 `None`으로 처리되므로
//! 여기에는 포함되지 않습니다.

use logward_core::error::AgentError;

/// 수집 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// 규칙 테이블의 정규식 컴파일 실패 (테이블 구성 시점에만 발생)
    #[error("rule compile error: rule '{event_type}' field '{field}': {reason}")]
    RuleCompile {
        /// 문제가 된 규칙의 이벤트 타입 태그
        event_type: String,
        /// 문제가 된 필드 키
        field: String,
        /// 컴파일 실패 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CollectorError> for AgentError {
    fn from(err: CollectorError) -> Self {
        AgentError::Collect(err.to_string())
    }
}

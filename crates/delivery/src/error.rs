//! 전송 크레이트 에러 타입

use logward_core::error::AgentError;

/// 전송 도메인 에러
///
/// 배치 전송의 단일 시도 실패를 표현합니다. 재시도 정책은
/// 응답 클래스를 구분하지 않으므로, 모든 변형이 동일하게 한 번의
/// 시도 소진으로 취급됩니다.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// 서버가 200이 아닌 상태 코드를 반환
    #[error("server returned status {code}")]
    Status {
        /// HTTP 상태 코드
        code: u16,
    },

    /// 전송 계층 실패 (타임아웃, 연결 실패 등)
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP 클라이언트 초기화 실패
    #[error("client build error: {0}")]
    ClientBuild(String),
}

impl From<DeliveryError> for AgentError {
    fn from(err: DeliveryError) -> Self {
        AgentError::Delivery(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = DeliveryError::Status { code: 500 };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn converts_to_agent_error() {
        let err = DeliveryError::Transport("connection refused".to_owned());
        let agent_err: AgentError = err.into();
        assert!(matches!(agent_err, AgentError::Delivery(_)));
    }
}

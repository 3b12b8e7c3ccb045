//! 배치 분할과 전송 통계
//!
//! 배치는 절단과 재시도의 단위입니다. 분할은 입력 순서를 보존하며,
//! 모든 배치를 이어 붙이면 입력 수열이 정확히 복원됩니다.

use logward_core::event::Event;

/// 이벤트 목록을 순서 보존 배치로 분할합니다.
///
/// 마지막 배치만 `batch_size`보다 작을 수 있습니다. 빈 입력은 빈
/// 배치 목록을 반환합니다.
pub fn split_batches(events: &[Event], batch_size: usize) -> Vec<&[Event]> {
    if events.is_empty() {
        return Vec::new();
    }
    // 설정 검증이 0을 거부하지만, 0이 들어와도 무한 루프는 피합니다.
    let batch_size = batch_size.max(1);
    events.chunks(batch_size).collect()
}

/// 배치 하나의 전송 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// 사이클 내 배치 순번 (0부터)
    pub index: usize,
    /// 배치에 담긴 이벤트 수
    pub size: usize,
    /// 수행된 시도 횟수
    pub attempts: u32,
    /// 전송 성공 여부
    pub success: bool,
}

/// 한 사이클의 전송 결과
#[derive(Debug, Clone, Default)]
pub struct CycleDeliveryReport {
    /// 배치별 결과 (배치 순서대로)
    pub outcomes: Vec<BatchOutcome>,
    /// 이번 사이클에 전송된 이벤트 수
    pub sent: usize,
    /// 이번 사이클에 실패한 이벤트 수
    pub failed: usize,
}

impl CycleDeliveryReport {
    /// 모든 배치가 성공했는지 — 사이클 성공 조건입니다.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.success)
    }
}

/// 프로세스 수명 동안 단조 증가하는 전송 카운터
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryStats {
    /// 전송 성공 이벤트 누계
    pub total_sent: u64,
    /// 전송 실패 이벤트 누계
    pub total_failed: u64,
}

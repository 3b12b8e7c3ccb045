//! 소스 리더 모듈 — OS 로그 백엔드에서 원시 레코드를 읽어옵니다.
//!
//! # 리더 계약
//! `read(window)`는 절대 에러를 반환하지 않습니다. 소스에 접근할 수 없으면
//! 빈 레코드 목록과 함께 [`ReadError`](logward_core::error::ReadError) 사유를
//! 담은 [`ReadOutcome`]을 반환합니다. 읽기 오프셋은 유지하지 않으며,
//! 매 사이클 동일한 최근 윈도우를 다시 읽습니다 — 사이클 간 중복 방출은
//! 이 계층에서 제거하지 않습니다.
//!
//! # 구현
//! - [`FileTailReader`]: 로그 파일의 마지막 N 라인
//! - [`JournalReader`]: journalctl 서브프로세스 조회
//! - [`WinEventReader`]: PowerShell Get-WinEvent 구조화 조회

pub mod file;
pub mod journal;
pub mod wineventlog;

pub use file::FileTailReader;
pub use journal::JournalReader;
pub use wineventlog::{WinEventReader, WinEventRecord};

use std::time::Duration;

use logward_core::error::ReadError;
use logward_core::types::Platform;

/// 읽기 윈도우 — 레코드 수 상한과 조회 시간 범위
#[derive(Debug, Clone, Copy)]
pub struct ReadWindow {
    /// 소스당 최대 레코드 수
    pub max_records: usize,
    /// 조회 시간 범위 (서브프로세스 기반 소스에서 사용)
    pub lookback: Duration,
}

impl ReadWindow {
    /// 새 읽기 윈도우를 생성합니다.
    pub fn new(max_records: usize, lookback: Duration) -> Self {
        Self {
            max_records,
            lookback,
        }
    }

    /// 조회 시간 범위를 시간 단위로 반환합니다 (최소 1시간).
    pub fn lookback_hours(&self) -> u64 {
        (self.lookback.as_secs() / 3600).max(1)
    }
}

/// 원시 레코드 페이로드
///
/// 텍스트 기반 소스는 라인 하나를, 구조화 이벤트 로그는
/// 필드가 분해된 [`WinEventRecord`]를 담습니다.
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// 텍스트 로그 라인
    Line(String),
    /// Windows 이벤트 로그 레코드
    WinEvent(WinEventRecord),
}

/// 수집된 원시 레코드
///
/// 리더가 생성하고 규칙 테이블이 소비하는 중간 데이터 형식입니다.
/// 한 수집 사이클 안에서만 존재합니다.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 레코드 페이로드
    pub payload: RawPayload,
    /// 원본 백엔드 식별자 (예: "auth.log", "journald", "Security")
    pub source: String,
    /// 호스트 플랫폼
    pub platform: Platform,
}

impl RawRecord {
    /// 텍스트 라인 레코드를 생성합니다.
    pub fn line(line: impl Into<String>, source: impl Into<String>, platform: Platform) -> Self {
        Self {
            payload: RawPayload::Line(line.into()),
            source: source.into(),
            platform,
        }
    }

    /// Windows 이벤트 레코드를 생성합니다.
    pub fn win_event(record: WinEventRecord, source: impl Into<String>) -> Self {
        Self {
            payload: RawPayload::WinEvent(record),
            source: source.into(),
            platform: Platform::Windows,
        }
    }
}

/// 읽기 결과 — 레코드 목록과 선택적 접근 불가 사유
///
/// 리더는 어떤 상황에서도 이 타입을 반환합니다. `error`가 Some이어도
/// 치명적이지 않으며, 해당 카테고리의 장애 카운터에만 기록됩니다.
#[derive(Debug)]
pub struct ReadOutcome {
    /// 읽어온 레코드 (소스 내 순서 유지)
    pub records: Vec<RawRecord>,
    /// 소스 접근 불가 사유 (있을 경우)
    pub error: Option<ReadError>,
}

impl ReadOutcome {
    /// 레코드 목록으로 성공 결과를 생성합니다.
    pub fn ok(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            error: None,
        }
    }

    /// 빈 결과와 접근 불가 사유를 생성합니다.
    pub fn unavailable(error: ReadError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }

    /// 레코드가 하나라도 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 소스 리더 — 구체 백엔드에 대한 enum 디스패치
///
/// 카테고리별 수집 계획은 이 리더들을 우선순위 순서로 나열하고,
/// 오케스트레이터가 폴백 선택 또는 병합을 수행합니다.
#[derive(Debug, Clone)]
pub enum Reader {
    /// 로컬 파일 tail
    File(FileTailReader),
    /// journalctl 서브프로세스
    Journal(JournalReader),
    /// Windows 이벤트 로그 조회
    WinLog(WinEventReader),
}

impl Reader {
    /// 소스를 읽습니다. 에러 대신 항상 [`ReadOutcome`]을 반환합니다.
    pub async fn read(&self, window: &ReadWindow) -> ReadOutcome {
        match self {
            Self::File(reader) => reader.read(window).await,
            Self::Journal(reader) => reader.read(window).await,
            Self::WinLog(reader) => reader.read(window).await,
        }
    }

    /// 리더가 읽는 소스의 식별자를 반환합니다.
    pub fn source_id(&self) -> &str {
        match self {
            Self::File(reader) => reader.source_id(),
            Self::Journal(reader) => reader.source_id(),
            Self::WinLog(reader) => reader.source_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_lookback_hours_rounds_down_with_floor_of_one() {
        let window = ReadWindow::new(100, Duration::from_secs(90 * 60));
        assert_eq!(window.lookback_hours(), 1);

        let window = ReadWindow::new(100, Duration::from_secs(24 * 3600));
        assert_eq!(window.lookback_hours(), 24);

        let window = ReadWindow::new(100, Duration::from_secs(10));
        assert_eq!(window.lookback_hours(), 1);
    }

    #[test]
    fn outcome_unavailable_is_empty_with_reason() {
        let outcome = ReadOutcome::unavailable(logward_core::error::ReadError::NotFound);
        assert!(outcome.is_empty());
        assert!(outcome.error.is_some());
    }

    #[test]
    fn raw_record_line_constructor() {
        let record = RawRecord::line("some log line", "auth.log", Platform::Linux);
        assert_eq!(record.source, "auth.log");
        assert!(matches!(record.payload, RawPayload::Line(_)));
    }
}

#![doc = include_str!("../README.md")]
//!
//! # 데이터 흐름
//!
//! ```text
//! Reader -> RawRecord -> RuleTable::evaluate -> Option<Event> -> Orchestrator (merge + cap)
//!   |            |               |
//! file/journal/  텍스트 라인 또는   술어 매칭, 필드 추출,
//! wineventlog    구조화 레코드     타임스탬프 해석, 노이즈 억제
//! ```

pub mod error;
pub mod orchestrator;
pub mod reader;
pub mod rules;

// --- 주요 타입 re-export ---

// 에러
pub use error::CollectorError;

// 리더
pub use reader::{RawPayload, RawRecord, ReadOutcome, ReadWindow, Reader, WinEventRecord};

// 규칙 엔진
pub use rules::{ChannelRuleTable, EvalContext, LineRuleTable};

// 오케스트레이터
pub use orchestrator::{CollectorStats, CycleCollection, Orchestrator};

#![doc = include_str!("../README.md")]
//!
//! # 전송 계약
//!
//! 입력 이벤트 목록은 순서를 보존한 채 크기 상한 배치로 분할됩니다.
//! 각 배치는 독립적인 실패 도메인입니다. 고정 간격으로 최대
//! `max_retries`회 시도하며, 한 배치의 재시도 소진이 다른 배치의
//! 전송을 막지 않습니다. 사이클은 모든 배치가 성공했을 때만
//! 성공으로 간주됩니다.

pub mod batch;
pub mod error;
pub mod sender;

// --- 주요 타입 re-export ---

pub use batch::{split_batches, BatchOutcome, CycleDeliveryReport, DeliveryStats};
pub use error::DeliveryError;
pub use sender::{EventSender, SenderConfig};

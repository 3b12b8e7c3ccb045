//! 정규화 이벤트 스키마 — 수집/전송의 기본 단위
//!
//! 모든 수집기는 원시 로그 레코드를 [`Event`] 하나로 정규화하며,
//! 전송 파이프라인은 `Event`의 JSON 배열을 서버로 전송합니다.
//! `Event`는 생성 이후 변경되지 않습니다. 절단/배치 분할 등 모든 변환은
//! 필드 수정이 아니라 부분 수열 선택으로만 수행됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::host::HostIdentity;
use crate::types::{Category, Platform, Severity};

/// wire 스키마 버전 상수
///
/// 스키마가 바뀌면 이 값을 올립니다. 서버는 이 값으로 호환성을 판단합니다.
pub const SCHEMA_VERSION: u32 = 1;

/// 정규화 보안 이벤트
///
/// wire 포맷 (JSON object):
/// ```json
/// {
///   "schema_version": 1,
///   "category": "authentication",
///   "event_type": "ssh_login_failed",
///   "time": "2025-11-16T14:31:00Z",
///   "host": "web-01",
///   "host_ipv4": "192.168.0.100",
///   "os": "linux",
///   "source": "auth.log",
///   "severity": "warning",
///   "message": "Failed SSH login for admin from 10.0.0.9 - Invalid user",
///   "data": { "username": "admin", "remote_ip": "10.0.0.9" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// 스키마 버전 (항상 [`SCHEMA_VERSION`])
    pub schema_version: u32,
    /// 이벤트 카테고리
    pub category: Category,
    /// 세부 이벤트 타입 태그 (예: "ssh_login_success")
    pub event_type: String,
    /// 발생 시각 (UTC). 원본 타임스탬프 파싱 실패 시 수집 시각으로 대체됩니다.
    #[serde(rename = "time", with = "wire_time")]
    pub timestamp: DateTime<Utc>,
    /// 호스트명
    pub host: String,
    /// 호스트 주 IPv4 주소
    pub host_ipv4: String,
    /// 플랫폼 태그
    pub os: Platform,
    /// 원본 백엔드 식별자 (예: "auth.log", "journald", "Security")
    pub source: String,
    /// 심각도
    pub severity: Severity,
    /// 사람이 읽을 수 있는 요약
    pub message: String,
    /// 이벤트 타입별 상세 필드
    pub data: Map<String, Value>,
}

impl Event {
    /// 새 이벤트를 생성합니다. `schema_version`은 항상 현재 상수로 고정됩니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        category: Category,
        event_type: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
        identity: &HostIdentity,
        os: Platform,
        source: impl Into<String>,
        message: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            category,
            event_type: event_type.into(),
            timestamp,
            host: identity.hostname.clone(),
            host_ipv4: identity.ipv4.clone(),
            os,
            source: source.into(),
            severity,
            message: message.into(),
            data,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}/{} host={} source={}: {}",
            self.severity, self.category, self.event_type, self.host, self.source, self.message,
        )
    }
}

/// wire 포맷의 `time` 필드 직렬화 모듈
///
/// ISO-8601 UTC, 초 단위, 항상 `Z` 접미사 (예: `2025-11-16T14:30:25Z`).
mod wire_time {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_identity() -> HostIdentity {
        HostIdentity {
            hostname: "web-01".to_owned(),
            ipv4: "192.168.0.100".to_owned(),
        }
    }

    fn sample_event() -> Event {
        let mut data = Map::new();
        data.insert("username".to_owned(), Value::String("alice".to_owned()));
        data.insert("remote_ip".to_owned(), Value::String("10.0.0.5".to_owned()));
        data.insert("port".to_owned(), Value::from(22));
        data.insert("invalid_user".to_owned(), Value::Bool(false));
        Event::new(
            Category::Authentication,
            "ssh_login_success",
            Severity::Info,
            Utc.with_ymd_and_hms(2025, 11, 16, 14, 30, 25).unwrap(),
            &sample_identity(),
            Platform::Linux,
            "auth.log",
            "User alice logged in via SSH from 10.0.0.5",
            data,
        )
    }

    #[test]
    fn new_event_carries_schema_version() {
        assert_eq!(sample_event().schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn wire_time_uses_trailing_z() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["time"], "2025-11-16T14:30:25Z");
    }

    #[test]
    fn wire_field_names_match_schema() {
        let json = serde_json::to_value(sample_event()).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "schema_version",
            "category",
            "event_type",
            "time",
            "host",
            "host_ipv4",
            "os",
            "source",
            "severity",
            "message",
            "data",
        ] {
            assert!(object.contains_key(key), "missing wire field: {key}");
        }
        assert_eq!(object.len(), 11);
    }

    #[test]
    fn wire_roundtrip_recovers_every_field() {
        let event = sample_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn wire_time_parses_offset_timestamps() {
        let mut json = serde_json::to_value(sample_event()).unwrap();
        json["time"] = Value::String("2025-11-16T23:30:25+09:00".to_owned());
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(
            back.timestamp,
            Utc.with_ymd_and_hms(2025, 11, 16, 14, 30, 25).unwrap()
        );
    }

    #[test]
    fn display_contains_identifiers() {
        let display = sample_event().to_string();
        assert!(display.contains("authentication"));
        assert!(display.contains("ssh_login_success"));
        assert!(display.contains("web-01"));
    }
}

//! Windows 이벤트 로그 소스 리더
//!
//! PowerShell `Get-WinEvent`를 서브프로세스로 실행하여 지정 채널에서
//! 알려진 이벤트 ID 집합을 조회합니다. 결과는 이벤트당
//! TimeCreated/Id/LevelDisplayName/Message/EventData를 담은 JSON으로
//! 받아 [`WinEventRecord`]로 분해합니다.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use logward_core::error::ReadError;

use super::{RawRecord, ReadOutcome, ReadWindow};

/// PowerShell 호출 타임아웃
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// 분해된 Windows 이벤트 레코드
///
/// 규칙 테이블이 이벤트 ID와 명명된 데이터 필드로 매칭/추출을 수행합니다.
#[derive(Debug, Clone)]
pub struct WinEventRecord {
    /// 숫자 이벤트 ID
    pub event_id: u32,
    /// 원본 타임스탬프 문자열 (ISO-8601 기대, 파싱 실패 시 수집 시각 사용)
    pub time_created: Option<String>,
    /// 레벨 표시명 (Information, Warning, Error 등)
    pub level: String,
    /// 이벤트 메시지 본문
    pub message: String,
    /// EventData의 명명된 필드 (Name -> #text)
    pub data: Map<String, Value>,
    /// 조회한 로그 채널명
    pub channel: String,
}

impl WinEventRecord {
    /// 데이터 필드를 문자열로 조회합니다. 없으면 빈 문자열을 반환합니다.
    pub fn field(&self, name: &str) -> &str {
        match self.data.get(name) {
            Some(Value::String(value)) => value.as_str(),
            _ => "",
        }
    }

    /// 데이터 필드를 정수로 파싱합니다.
    pub fn field_u32(&self, name: &str) -> Option<u32> {
        match self.data.get(name) {
            Some(Value::String(value)) => value.parse().ok(),
            Some(Value::Number(value)) => value.as_u64().and_then(|n| u32::try_from(n).ok()),
            _ => None,
        }
    }
}

/// PowerShell이 출력하는 이벤트 JSON의 원시 형태
#[derive(Debug, Deserialize)]
struct PsEvent {
    #[serde(rename = "TimeCreated")]
    time_created: Option<String>,
    #[serde(rename = "Id")]
    id: Option<i64>,
    #[serde(rename = "LevelDisplayName")]
    level: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    /// EventData는 중첩 JSON 문자열로 직렬화됩니다.
    #[serde(rename = "EventData")]
    event_data: Option<String>,
}

/// Windows 이벤트 로그 리더
#[derive(Debug, Clone)]
pub struct WinEventReader {
    /// 조회할 로그 채널 (Security, System, Application, Setup 등)
    channel: String,
    /// 필터링할 이벤트 ID 집합
    event_ids: Vec<u32>,
    /// 실행할 명령 이름 (테스트에서 대체 가능)
    command: String,
}

impl WinEventReader {
    /// 새 이벤트 로그 리더를 생성합니다.
    pub fn new(channel: impl Into<String>, event_ids: impl Into<Vec<u32>>) -> Self {
        Self {
            channel: channel.into(),
            event_ids: event_ids.into(),
            command: "powershell".to_owned(),
        }
    }

    /// 실행할 명령을 교체합니다 (테스트용).
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// 소스 식별자(채널명)를 반환합니다.
    pub fn source_id(&self) -> &str {
        &self.channel
    }

    /// 이벤트 로그를 조회합니다.
    pub async fn read(&self, window: &ReadWindow) -> ReadOutcome {
        let script = self.build_script(window);

        let child = tokio::process::Command::new(&self.command)
            .arg("-NoProfile")
            .arg("-Command")
            .arg(&script)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .output();

        let output = match tokio::time::timeout(COMMAND_TIMEOUT, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let reason = if e.kind() == std::io::ErrorKind::NotFound {
                    ReadError::SubsystemUnavailable
                } else {
                    ReadError::PermissionDenied
                };
                tracing::debug!(error = %e, channel = self.channel.as_str(), "powershell invocation failed");
                return ReadOutcome::unavailable(reason);
            }
            Err(_) => {
                tracing::warn!(channel = self.channel.as_str(), "event log query timed out");
                return ReadOutcome::unavailable(ReadError::Timeout);
            }
        };

        if !output.status.success() {
            return ReadOutcome::unavailable(ReadError::SubsystemUnavailable);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = self.parse_output(stdout.trim(), window.max_records);
        ReadOutcome::ok(records)
    }

    /// Get-WinEvent 조회 스크립트를 생성합니다.
    ///
    /// FilterHashtable로 채널/ID/시작시각을 서버측에서 거르고,
    /// EventData의 Name/#text 쌍을 중첩 JSON으로 투영합니다.
    fn build_script(&self, window: &ReadWindow) -> String {
        let ids = self
            .event_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "$StartTime = (Get-Date).AddHours(-{hours})\n\
             Get-WinEvent -FilterHashtable @{{\n\
                 LogName='{channel}'\n\
                 ID={ids}\n\
                 StartTime=$StartTime\n\
             }} -MaxEvents {max} -ErrorAction SilentlyContinue |\n\
             Select-Object -Property TimeCreated, Id, LevelDisplayName, Message, @{{Name='EventData';Expression={{\n\
                 $xml = [xml]$_.ToXml()\n\
                 $data = @{{}}\n\
                 foreach ($item in $xml.Event.EventData.Data) {{\n\
                     $data[$item.Name] = $item.'#text'\n\
                 }}\n\
                 $data | ConvertTo-Json -Compress\n\
             }}}} |\n\
             ConvertTo-Json -Compress",
            hours = window.lookback_hours(),
            channel = self.channel,
            ids = ids,
            max = window.max_records,
        )
    }

    /// PowerShell JSON 출력을 레코드 목록으로 변환합니다.
    ///
    /// 결과가 1건이면 단일 객체, 여러 건이면 배열로 출력되므로
    /// 두 형태를 모두 처리합니다. 파싱 불가능한 이벤트는 건너뜁니다.
    fn parse_output(&self, stdout: &str, max_records: usize) -> Vec<RawRecord> {
        if stdout.is_empty() {
            return Vec::new();
        }

        let parsed: Vec<PsEvent> = if stdout.starts_with('[') {
            serde_json::from_str(stdout).unwrap_or_default()
        } else {
            match serde_json::from_str::<PsEvent>(stdout) {
                Ok(event) => vec![event],
                Err(e) => {
                    tracing::debug!(error = %e, "failed to parse event log JSON");
                    Vec::new()
                }
            }
        };

        parsed
            .into_iter()
            .filter_map(|ps_event| {
                let event_id = u32::try_from(ps_event.id?).ok()?;
                let data = ps_event
                    .event_data
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok())
                    .unwrap_or_default();
                Some(WinEventRecord {
                    event_id,
                    time_created: ps_event.time_created,
                    level: ps_event.level.unwrap_or_default(),
                    message: ps_event.message.unwrap_or_default(),
                    data,
                    channel: self.channel.clone(),
                })
            })
            .take(max_records)
            .map(|record| {
                let source = record.channel.clone();
                RawRecord::win_event(record, source)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> WinEventReader {
        WinEventReader::new("Security", vec![4624, 4625])
    }

    #[test]
    fn script_contains_channel_and_ids() {
        let window = ReadWindow::new(500, Duration::from_secs(24 * 3600));
        let script = reader().build_script(&window);
        assert!(script.contains("LogName='Security'"));
        assert!(script.contains("ID=4624,4625"));
        assert!(script.contains("-MaxEvents 500"));
        assert!(script.contains("AddHours(-24)"));
    }

    #[test]
    fn parse_single_object_output() {
        let json = r#"{"TimeCreated":"2025-11-16T14:30:25Z","Id":4624,"LevelDisplayName":"Information","Message":"An account was successfully logged on.","EventData":"{\"TargetUserName\":\"alice\",\"LogonType\":\"10\",\"IpAddress\":\"10.0.0.5\"}"}"#;
        let records = reader().parse_output(json, 100);
        assert_eq!(records.len(), 1);
        match &records[0].payload {
            super::super::RawPayload::WinEvent(record) => {
                assert_eq!(record.event_id, 4624);
                assert_eq!(record.field("TargetUserName"), "alice");
                assert_eq!(record.field_u32("LogonType"), Some(10));
                assert_eq!(record.channel, "Security");
            }
            _ => panic!("expected win event payload"),
        }
    }

    #[test]
    fn parse_array_output() {
        let json = r#"[{"TimeCreated":"2025-11-16T14:30:25Z","Id":4624,"LevelDisplayName":"Information","Message":"m1","EventData":"{}"},{"TimeCreated":"2025-11-16T14:31:00Z","Id":4625,"LevelDisplayName":"Information","Message":"m2","EventData":null}]"#;
        let records = reader().parse_output(json, 100);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn parse_garbage_output_yields_nothing() {
        assert!(reader().parse_output("not json at all", 100).is_empty());
        assert!(reader().parse_output("", 100).is_empty());
    }

    #[test]
    fn parse_respects_max_records() {
        let json = r#"[{"Id":4624,"EventData":"{}"},{"Id":4624,"EventData":"{}"},{"Id":4624,"EventData":"{}"}]"#;
        let records = reader().parse_output(json, 2);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn field_helpers_handle_missing_keys() {
        let record = WinEventRecord {
            event_id: 4624,
            time_created: None,
            level: String::new(),
            message: String::new(),
            data: Map::new(),
            channel: "Security".to_owned(),
        };
        assert_eq!(record.field("TargetUserName"), "");
        assert_eq!(record.field_u32("LogonType"), None);
    }

    #[tokio::test]
    async fn missing_powershell_yields_subsystem_unavailable() {
        let reader = reader().with_command("/nonexistent/logward-powershell");
        let window = ReadWindow::new(10, Duration::from_secs(3600));
        let outcome = reader.read(&window).await;
        assert!(outcome.is_empty());
        assert_eq!(outcome.error, Some(ReadError::SubsystemUnavailable));
    }
}

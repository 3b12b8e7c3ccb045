//! systemd journal 소스 리더
//!
//! `journalctl`을 서브프로세스로 실행하여 고정 포맷(short-iso) 텍스트를
//! 조회합니다. 커널 메시지(`-k`), 우선순위 필터(`-p err`), 내용 필터
//! (`--grep`)를 조합할 수 있습니다. 모든 호출은 명시적 타임아웃으로
//! 제한됩니다.

use std::process::Stdio;
use std::time::Duration;

use logward_core::error::ReadError;
use logward_core::types::Platform;

use super::{RawRecord, ReadOutcome, ReadWindow};

/// journalctl 호출 타임아웃
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// journal 조회 모드
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalQuery {
    /// 내용 필터로 전체 journal을 조회 (`--grep`)
    Grep(String),
    /// 커널 메시지만 조회 (`-k`)
    Kernel,
    /// error 우선순위 이상만 조회 (`-p err`)
    ErrorPriority,
}

/// journalctl 기반 리더
#[derive(Debug, Clone)]
pub struct JournalReader {
    /// 조회 모드
    query: JournalQuery,
    /// 실행할 명령 이름 (테스트에서 대체 가능)
    command: String,
}

impl JournalReader {
    /// 새 journal 리더를 생성합니다.
    pub fn new(query: JournalQuery) -> Self {
        Self {
            query,
            command: "journalctl".to_owned(),
        }
    }

    /// 실행할 명령을 교체합니다 (테스트용).
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// 소스 식별자를 반환합니다.
    pub fn source_id(&self) -> &str {
        "journald"
    }

    /// journal을 조회합니다.
    pub async fn read(&self, window: &ReadWindow) -> ReadOutcome {
        let since = format!("{}h ago", window.lookback_hours());
        let max = window.max_records.to_string();

        let mut args: Vec<&str> = vec![
            "--since",
            &since,
            "--no-pager",
            "-n",
            &max,
            "-o",
            "short-iso",
        ];
        let grep_pattern;
        match &self.query {
            JournalQuery::Grep(pattern) => {
                grep_pattern = pattern.clone();
                args.push("--grep");
                args.push(&grep_pattern);
            }
            JournalQuery::Kernel => args.push("-k"),
            JournalQuery::ErrorPriority => {
                args.push("-p");
                args.push("err");
            }
        }

        let child = tokio::process::Command::new(&self.command)
            .args(&args)
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
                tracing::debug!(error = %e, "journalctl invocation failed");
                return ReadOutcome::unavailable(reason);
            }
            Err(_) => {
                tracing::warn!("journalctl query timed out");
                return ReadOutcome::unavailable(ReadError::Timeout);
            }
        };

        if !output.status.success() {
            tracing::debug!(status = ?output.status.code(), "journalctl returned non-zero");
            return ReadOutcome::unavailable(ReadError::SubsystemUnavailable);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let records = stdout
            .lines()
            .filter(|line| Self::is_entry_line(line))
            .take(window.max_records)
            .map(|line| RawRecord::line(line, "journald", Platform::Linux))
            .collect();

        ReadOutcome::ok(records)
    }

    /// journal 출력에서 실제 엔트리 라인인지 확인합니다.
    ///
    /// `-- No entries --` 같은 안내 라인과 힌트는 건너뜁니다.
    fn is_entry_line(line: &str) -> bool {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with("--") && !trimmed.starts_with("Hint:")
    }
}

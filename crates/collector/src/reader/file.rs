//! 파일 기반 소스 리더
//!
//! 로그 파일의 마지막 N 라인을 읽습니다. 오프셋을 저장하지 않으므로
//! 매 사이클 같은 윈도우를 다시 읽습니다 (상태 없는 재조회 모델).

use std::path::{Path, PathBuf};

use logward_core::error::ReadError;
use logward_core::types::Platform;

use super::{RawRecord, ReadOutcome, ReadWindow};

/// 한 라인의 최대 길이 (바이트). 초과분은 잘라냅니다.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// 파일 tail 리더
///
/// 지정된 파일에서 가장 최근 라인들을 읽어 [`RawRecord`]로 반환합니다.
#[derive(Debug, Clone)]
pub struct FileTailReader {
    /// 읽을 파일 경로
    path: PathBuf,
    /// 레코드에 기록할 소스 식별자 (보통 파일명)
    source_id: String,
    /// 레코드에 기록할 플랫폼
    platform: Platform,
}

impl FileTailReader {
    /// 새 파일 리더를 생성합니다. 소스 식별자는 파일명에서 유도됩니다.
    pub fn new(path: impl Into<PathBuf>, platform: Platform) -> Self {
        let path = path.into();
        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            source_id,
            platform,
        }
    }

    /// 소스 식별자를 명시적으로 지정합니다.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    /// 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 소스 식별자를 반환합니다.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// 파일의 마지막 `window.max_records` 라인을 읽습니다.
    pub async fn read(&self, window: &ReadWindow) -> ReadOutcome {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let reason = match e.kind() {
                    std::io::ErrorKind::NotFound => ReadError::NotFound,
                    std::io::ErrorKind::PermissionDenied => ReadError::PermissionDenied,
                    _ => ReadError::SubsystemUnavailable,
                };
                tracing::debug!(
                    path = %self.path.display(),
                    error = %reason,
                    "log file inaccessible"
                );
                return ReadOutcome::unavailable(reason);
            }
        };

        let text = String::from_utf8_lossy(&contents);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(window.max_records);

        let records = lines[start..]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let mut line = *line;
                if line.len() > MAX_LINE_LENGTH {
                    // UTF-8 경계를 찾아 안전하게 자릅니다.
                    let mut end = MAX_LINE_LENGTH;
                    while !line.is_char_boundary(end) {
                        end -= 1;
                    }
                    line = &line[..end];
                }
                RawRecord::line(line, &self.source_id, self.platform)
            })
            .collect();

        ReadOutcome::ok(records)
    }
}

//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 수집기와 전송 파이프라인이 공유하는 데이터 구조를 정의합니다.
//! 모든 enum은 wire 포맷의 소문자 표기와 일치하도록 serde 속성을 지정합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 이벤트 카테고리
///
/// 수집 대상 보안 이벤트의 최상위 분류입니다.
/// wire 포맷에서는 소문자 snake_case 문자열로 직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 인증 (로그인 성공/실패, 계정 잠금 등)
    Authentication,
    /// 권한 상승 (sudo, su, 계정/그룹 변경)
    PrivilegeEscalation,
    /// 원격 접속 (RDP 세션 등)
    RemoteAccess,
    /// 시스템 크래시 (커널 패닉, OOM, BSOD)
    System,
    /// 서비스 장애 (데몬 실패, 애플리케이션 크래시)
    Service,
    /// 소프트웨어 변경 (패키지 설치/업데이트/제거)
    Software,
}

impl Category {
    /// 모든 카테고리 목록 (설정 검증 및 기본값에 사용)
    pub const ALL: [Category; 6] = [
        Category::Authentication,
        Category::PrivilegeEscalation,
        Category::RemoteAccess,
        Category::System,
        Category::Service,
        Category::Software,
    ];

    /// wire 포맷 문자열 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::PrivilegeEscalation => "privilege_escalation",
            Self::RemoteAccess => "remote_access",
            Self::System => "system",
            Self::Service => "service",
            Self::Software => "software",
        }
    }

    /// 문자열에서 카테고리를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 설정 파일에서 쓰이는 축약 표기도 허용합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "authentication" | "auth" => Some(Self::Authentication),
            "privilege_escalation" | "privilege" => Some(Self::PrivilegeEscalation),
            "remote_access" | "remote" => Some(Self::RemoteAccess),
            "system" => Some(Self::System),
            "service" => Some(Self::Service),
            "software" => Some(Self::Software),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Warning < Error < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성 이벤트
    #[default]
    Info,
    /// 주의가 필요한 이벤트
    Warning,
    /// 오류
    Error,
    /// 치명적 — 즉시 대응 필요
    Critical,
}

impl Severity {
    /// wire 포맷 문자열 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// 문자열에서 심각도를 파싱합니다. 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" | "err" => Some(Self::Error),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 에이전트가 동작하는 플랫폼
///
/// 시작 시 한 번 결정되어 수집기 선택에 사용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// POSIX 파일/서브프로세스 기반 수집
    Linux,
    /// 구조화 이벤트 로그 기반 수집
    Windows,
}

impl Platform {
    /// wire 포맷 문자열 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    /// 컴파일 타겟에서 플랫폼을 자동 감지합니다.
    pub fn detect() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// 문자열에서 플랫폼을 파싱합니다. 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! 설정 관리 — logward.toml 파싱 및 런타임 설정
//!
//! [`AgentConfig`]는 에이전트 전체 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`LOGWARD_SERVER_ADDRESS=10.0.0.1` 형식)
//! 2. 설정 파일 (`logward.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! 설정 검증 실패는 이 시스템에서 유일한 치명적 에러이며,
//! 첫 수집 사이클이 돌기 전에 프로세스를 종료시킵니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logward_core::error::AgentError> {
//! use logward_core::config::AgentConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = AgentConfig::load("logward.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = AgentConfig::parse("[server]\naddress = \"10.0.0.1\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AgentError, ConfigError};
use crate::types::{Category, Platform};

/// Logward 통합 설정
///
/// `logward.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 일반 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 에이전트 설정 (플랫폼 선택)
    #[serde(default)]
    pub agent: AgentSection,
    /// 수집 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 수집 설정
    #[serde(default)]
    pub collection: CollectionConfig,
}

impl AgentConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AgentError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, AgentError> {
        toml::from_str(toml_str).map_err(|e| {
            AgentError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWARD_{SECTION}_{FIELD}`
    /// 예: `LOGWARD_SERVER_ADDRESS=10.0.0.1`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWARD_GENERAL_LOG_FORMAT");

        // Agent
        override_string(&mut self.agent.os, "LOGWARD_AGENT_OS");
        override_string(&mut self.agent.client_name, "LOGWARD_AGENT_CLIENT_NAME");

        // Server
        override_string(&mut self.server.address, "LOGWARD_SERVER_ADDRESS");
        override_u16(&mut self.server.port, "LOGWARD_SERVER_PORT");
        override_bool(&mut self.server.use_tls, "LOGWARD_SERVER_USE_TLS");
        override_string(&mut self.server.api_path, "LOGWARD_SERVER_API_PATH");
        override_string(&mut self.server.api_key, "LOGWARD_SERVER_API_KEY");
        override_u64(&mut self.server.timeout_secs, "LOGWARD_SERVER_TIMEOUT_SECS");
        override_u32(&mut self.server.max_retries, "LOGWARD_SERVER_MAX_RETRIES");
        override_u64(
            &mut self.server.retry_delay_secs,
            "LOGWARD_SERVER_RETRY_DELAY_SECS",
        );

        // Collection
        override_u64(
            &mut self.collection.interval_secs,
            "LOGWARD_COLLECTION_INTERVAL_SECS",
        );
        override_usize(
            &mut self.collection.max_records_per_source,
            "LOGWARD_COLLECTION_MAX_RECORDS_PER_SOURCE",
        );
        override_u64(
            &mut self.collection.lookback_hours,
            "LOGWARD_COLLECTION_LOOKBACK_HOURS",
        );
        override_csv(
            &mut self.collection.enabled_categories,
            "LOGWARD_COLLECTION_ENABLED_CATEGORIES",
        );
        override_usize(
            &mut self.collection.max_events_per_batch,
            "LOGWARD_COLLECTION_MAX_EVENTS_PER_BATCH",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 실패는 시작 시점의 치명적 에러로 취급됩니다.
    pub fn validate(&self) -> Result<(), AgentError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // 서버 주소는 유일한 필수 필드
        if self.server.address.is_empty() {
            return Err(ConfigError::MissingField {
                field: "server.address".to_owned(),
            }
            .into());
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_owned(),
                reason: "must not be 0".to_owned(),
            }
            .into());
        }

        if self.server.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_retries".to_owned(),
                reason: "must be at least 1".to_owned(),
            }
            .into());
        }

        if self.server.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.collection.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.collection.max_records_per_source == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.max_records_per_source".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.collection.lookback_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.lookback_hours".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.collection.max_events_per_batch == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.max_events_per_batch".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        // 카테고리 이름 검증
        for name in &self.collection.enabled_categories {
            if Category::from_str_loose(name).is_none() {
                return Err(ConfigError::InvalidValue {
                    field: "collection.enabled_categories".to_owned(),
                    reason: format!("unknown category '{name}'"),
                }
                .into());
            }
        }

        // agent.os 검증 ("auto"는 자동 감지)
        if self.agent.os != "auto" && Platform::from_str_loose(&self.agent.os).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "agent.os".to_owned(),
                reason: "must be one of: auto, linux, windows".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 에이전트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 플랫폼 오버라이드 (auto, linux, windows)
    pub os: String,
    /// 선택적 클라이언트 식별자
    pub client_name: String,
}

impl AgentSection {
    /// 설정과 자동 감지를 조합하여 플랫폼을 결정합니다.
    ///
    /// 알 수 없는 값이면 경고를 남기고 자동 감지로 폴백합니다.
    pub fn resolve_platform(&self) -> Platform {
        if self.os == "auto" {
            return Platform::detect();
        }
        match Platform::from_str_loose(&self.os) {
            Some(platform) => platform,
            None => {
                warn!(os = self.os.as_str(), "unknown agent.os, using auto-detect");
                Platform::detect()
            }
        }
    }
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            os: "auto".to_owned(),
            client_name: String::new(),
        }
    }
}

/// 수집 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 서버 주소 (필수)
    pub address: String,
    /// 서버 포트
    pub port: u16,
    /// HTTPS 사용 여부
    pub use_tls: bool,
    /// 이벤트 수신 경로
    pub api_path: String,
    /// API 키 (빈 문자열이면 인증 헤더 없음)
    pub api_key: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 배치당 최대 전송 시도 횟수
    pub max_retries: u32,
    /// 재시도 간 고정 대기 시간 (초)
    pub retry_delay_secs: u64,
}

impl ServerConfig {
    /// 이벤트 수신 엔드포인트 전체 URL을 생성합니다.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}{}", scheme, self.address, self.port, self.api_path)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8080,
            use_tls: false,
            api_path: "/api/events".to_owned(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 5,
        }
    }
}

/// 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// 수집 사이클 간격 (초)
    pub interval_secs: u64,
    /// 소스당 최대 레코드 수
    pub max_records_per_source: usize,
    /// 조회 범위 (시간)
    pub lookback_hours: u64,
    /// 활성화된 카테고리 이름 목록
    pub enabled_categories: Vec<String>,
    /// 사이클당 최대 이벤트 수 (초과분은 드롭)
    pub max_events_per_batch: usize,
}

impl CollectionConfig {
    /// 활성화된 카테고리 목록을 파싱하여 반환합니다.
    ///
    /// `validate()`를 통과한 설정에서는 모든 이름이 유효합니다.
    pub fn categories(&self) -> Vec<Category> {
        self.enabled_categories
            .iter()
            .filter_map(|name| Category::from_str_loose(name))
            .collect()
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            max_records_per_source: 1000,
            lookback_hours: 24,
            enabled_categories: Category::ALL.iter().map(|c| c.as_str().to_owned()).collect(),
            max_events_per_batch: 500,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn valid_config() -> AgentConfig {
        let mut config = AgentConfig::default();
        config.server.address = "192.168.0.254".to_owned();
        config
    }

    #[test]
    fn default_config_has_sane_values() {
        let config = AgentConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.agent.os, "auto");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.api_path, "/api/events");
        assert_eq!(config.server.max_retries, 3);
        assert_eq!(config.collection.interval_secs, 60);
        assert_eq!(config.collection.max_events_per_batch, 500);
        assert_eq!(config.collection.enabled_categories.len(), 6);
    }

    #[test]
    fn default_config_fails_validation_without_address() {
        let err = AgentConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("server.address"));
    }

    #[test]
    fn valid_config_passes_validation() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = AgentConfig::parse("").unwrap();
        assert_eq!(config.collection.lookback_hours, 24);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[server]
address = "10.0.0.1"
port = 9090

[collection]
enabled_categories = ["auth", "system"]
"#;
        let config = AgentConfig::parse(toml).unwrap();
        assert_eq!(config.server.address, "10.0.0.1");
        assert_eq!(config.server.port, 9090);
        // api_path는 기본값 유지
        assert_eq!(config.server.api_path, "/api/events");
        assert_eq!(
            config.collection.categories(),
            vec![Category::Authentication, Category::System]
        );
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"

[agent]
os = "windows"
client_name = "edge-42"

[server]
address = "collect.example.com"
port = 8443
use_tls = true
api_path = "/ingest"
api_key = "secret"
timeout_secs = 10
max_retries = 5
retry_delay_secs = 2

[collection]
interval_secs = 30
max_records_per_source = 500
lookback_hours = 4
enabled_categories = ["authentication", "service"]
max_events_per_batch = 200
"#;
        let config = AgentConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.endpoint_url(), "https://collect.example.com:8443/ingest");
        assert_eq!(config.agent.resolve_platform(), Platform::Windows);
        assert_eq!(config.collection.max_records_per_source, 500);
        assert_eq!(config.server.retry_delay_secs, 2);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = AgentConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            AgentError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = valid_config();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = valid_config();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut config = valid_config();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn validate_rejects_zero_retries() {
        let mut config = valid_config();
        config.server.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = valid_config();
        config.collection.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_cap() {
        let mut config = valid_config();
        config.collection.max_events_per_batch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_category() {
        let mut config = valid_config();
        config.collection.enabled_categories.push("network".to_owned());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("network"));
    }

    #[test]
    fn validate_rejects_unknown_os() {
        let mut config = valid_config();
        config.agent.os = "solaris".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("agent.os"));
    }

    #[test]
    fn endpoint_url_plain_http() {
        let config = valid_config();
        assert_eq!(
            config.server.endpoint_url(),
            "http://192.168.0.254:8080/api/events"
        );
    }

    #[test]
    fn resolve_platform_auto_detects() {
        let section = AgentSection::default();
        assert_eq!(section.resolve_platform(), Platform::detect());
    }

    #[test]
    fn resolve_platform_unknown_falls_back_to_detect() {
        let section = AgentSection {
            os: "beos".to_owned(),
            client_name: String::new(),
        };
        assert_eq!(section.resolve_platform(), Platform::detect());
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut config = AgentConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("LOGWARD_SERVER_ADDRESS", "10.9.9.9") };
        config.apply_env_overrides();
        assert_eq!(config.server.address, "10.9.9.9");
        unsafe { std::env::remove_var("LOGWARD_SERVER_ADDRESS") };
    }

    #[test]
    #[serial]
    fn env_override_csv_categories() {
        let mut config = AgentConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("LOGWARD_COLLECTION_ENABLED_CATEGORIES", "auth, system") };
        config.apply_env_overrides();
        assert_eq!(config.collection.enabled_categories, vec!["auth", "system"]);
        unsafe { std::env::remove_var("LOGWARD_COLLECTION_ENABLED_CATEGORIES") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_number_keeps_original() {
        let mut config = AgentConfig::default();
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("LOGWARD_SERVER_PORT", "not-a-port") };
        config.apply_env_overrides();
        assert_eq!(config.server.port, 8080); // 원래 값 유지
        unsafe { std::env::remove_var("LOGWARD_SERVER_PORT") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = valid_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = AgentConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.server.address, config.server.address);
        assert_eq!(parsed.collection.interval_secs, config.collection.interval_secs);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = AgentConfig::from_file("/nonexistent/path/logward.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            AgentError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logward.toml");
        tokio::fs::write(&path, "[server]\naddress = \"10.1.1.1\"\n")
            .await
            .unwrap();
        let config = AgentConfig::from_file(&path).await.unwrap();
        assert_eq!(config.server.address, "10.1.1.1");
    }
}

//! 규칙 기반 정규화 엔진
//!
//! 원시 레코드 하나를 정규화 이벤트 0개 또는 1개로 변환합니다.
//! 카테고리별 규칙은 순서가 있으며 첫 번째로 술어가 매칭된 규칙이
//! 적용됩니다 (구체적 시그니처가 일반 시그니처보다 앞에 옵니다).
//! 매칭되지 않은 레코드는 에러가 아니라 조용히 드롭됩니다.
//!
//! # 필드 추출 정책
//! - 필수 식별 필드(예: 로그인 이벤트의 username)가 추출되지 않으면
//!   해당 레코드 전체를 드롭합니다.
//! - 그 외 모든 필드는 문서화된 기본값("unknown" 또는 null)을 가집니다.
//! - 타임스탬프는 형식별 파싱을 순서대로 시도하고, 전부 실패하면
//!   수집 시각으로 대체합니다 (가용성 우선).
//!
//! # 노이즈 억제
//! 추출 이후, 방출 전에 알려진 시스템 계정과 노이즈성 서비스
//! 프로바이더의 거부 목록을 적용합니다.

pub mod linux;
pub mod linux_software;
pub mod timestamp;
pub mod windows;

use regex::Regex;
use serde_json::{Map, Value};

use logward_core::event::Event;
use logward_core::host::HostIdentity;
use logward_core::types::{Category, Platform, Severity};

use crate::error::CollectorError;
use crate::reader::{RawPayload, RawRecord, WinEventRecord};

/// 평가 컨텍스트 — 이벤트 생성에 필요한 호스트 정보
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// 호스트 식별 정보
    pub identity: HostIdentity,
    /// 플랫폼 태그
    pub platform: Platform,
}

/// 내용 술어 — CNF 형태의 저비용 부분 문자열 테스트
///
/// `all`의 모든 토큰이 포함되고, `any`의 각 그룹에서 최소 하나가
/// 포함되어야 매칭됩니다. 정규식 추출 전에 먼저 평가되는 저렴한
/// 필터입니다.
#[derive(Debug, Clone, Copy)]
pub struct Predicate {
    /// 모두 포함되어야 하는 토큰
    pub all: &'static [&'static str],
    /// 각 그룹에서 하나 이상 포함되어야 하는 토큰 그룹
    pub any: &'static [&'static [&'static str]],
    /// 소문자 변환 후 비교 여부
    pub case_insensitive: bool,
}

impl Predicate {
    /// 술어를 평가합니다. `lower`는 호출자가 한 번만 계산한 소문자 사본입니다.
    pub fn matches(&self, line: &str, lower: &str) -> bool {
        let haystack = if self.case_insensitive { lower } else { line };

        if !self.all.iter().all(|token| haystack.contains(token)) {
            return false;
        }

        self.any
            .iter()
            .all(|group| group.iter().any(|token| haystack.contains(token)))
    }
}

/// 추출 실패 시 적용할 기본값
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    /// 문자열 "unknown"
    Unknown,
    /// JSON null
    Null,
    /// 지정 문자열
    Str(&'static str),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Unknown => Value::String("unknown".to_owned()),
            Self::Null => Value::Null,
            Self::Str(s) => Value::String(s.to_owned()),
        }
    }
}

/// 필드 추출 명세
///
/// 규칙 테이블의 선언적 구성 요소입니다. 정규식 패턴은 테이블 구성
/// 시점에 한 번만 컴파일됩니다.
#[derive(Debug, Clone, Copy)]
pub enum FieldSpec {
    /// 정규식 캡처 그룹 1을 문자열로 추출
    Pattern {
        /// data 맵 키
        key: &'static str,
        /// 캡처 그룹 1개를 가진 정규식
        pattern: &'static str,
        /// true이면 추출 실패 시 레코드 전체 드롭
        required: bool,
        /// 추출 실패 시 기본값 (required=false일 때)
        default: FieldDefault,
    },
    /// 여러 정규식을 순서대로 시도하여 첫 성공을 사용
    PatternAlt {
        key: &'static str,
        patterns: &'static [&'static str],
        required: bool,
        default: FieldDefault,
    },
    /// 정규식 캡처를 정수로 추출 (실패 시 null)
    PatternInt {
        key: &'static str,
        pattern: &'static str,
    },
    /// 고정 문자열
    Const {
        key: &'static str,
        value: &'static str,
    },
    /// 고정 불리언
    ConstBool { key: &'static str, value: bool },
    /// 원본 라인에서 파생되는 값
    Derived {
        key: &'static str,
        derive: fn(&str) -> Value,
    },
}

impl FieldSpec {
    fn key(&self) -> &'static str {
        match self {
            Self::Pattern { key, .. }
            | Self::PatternAlt { key, .. }
            | Self::PatternInt { key, .. }
            | Self::Const { key, .. }
            | Self::ConstBool { key, .. }
            | Self::Derived { key, .. } => key,
        }
    }

    fn patterns(&self) -> Vec<&'static str> {
        match self {
            Self::Pattern { pattern, .. } | Self::PatternInt { pattern, .. } => vec![*pattern],
            Self::PatternAlt { patterns, .. } => patterns.to_vec(),
            _ => Vec::new(),
        }
    }
}

/// 심각도 결정 규칙
#[derive(Debug, Clone, Copy)]
pub enum SeverityRule {
    /// 고정 심각도
    Fixed(Severity),
    /// 라인 내용으로 결정
    ByLine(fn(&str) -> Severity),
}

impl SeverityRule {
    fn resolve(&self, line: &str) -> Severity {
        match self {
            Self::Fixed(severity) => *severity,
            Self::ByLine(f) => f(line),
        }
    }
}

/// 텍스트 라인 규칙 — 하나의 이벤트 시그니처
pub struct LineRule {
    /// 이벤트 타입 태그
    pub event_type: &'static str,
    /// 내용 술어
    pub predicate: Predicate,
    /// 심각도 규칙
    pub severity: SeverityRule,
    /// 필드 추출 명세 (선언 순서대로 평가)
    pub fields: &'static [FieldSpec],
    /// 요약 메시지 렌더러
    pub message: fn(&Map<String, Value>) -> String,
    /// 노이즈 억제 적용 여부
    pub suppress_noise: bool,
}

/// 컴파일된 라인 규칙 — 필드별 정규식이 미리 컴파일되어 있습니다.
struct CompiledLineRule {
    rule: &'static LineRule,
    /// fields와 평행한 정규식 목록
    field_regexes: Vec<Vec<Regex>>,
}

/// 라인 규칙 테이블 — 한 카테고리의 순서 있는 규칙 집합
pub struct LineRuleTable {
    category: Category,
    rules: Vec<CompiledLineRule>,
    noise: &'static NoisePolicy,
}

impl LineRuleTable {
    /// 규칙 목록에서 테이블을 구성하고 모든 정규식을 컴파일합니다.
    pub fn new(
        category: Category,
        rules: &'static [LineRule],
    ) -> Result<Self, CollectorError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let mut field_regexes = Vec::with_capacity(rule.fields.len());
            for field in rule.fields {
                let mut regexes = Vec::new();
                for pattern in field.patterns() {
                    let regex = Regex::new(pattern).map_err(|e| CollectorError::RuleCompile {
                        event_type: rule.event_type.to_owned(),
                        field: field.key().to_owned(),
                        reason: e.to_string(),
                    })?;
                    regexes.push(regex);
                }
                field_regexes.push(regexes);
            }
            compiled.push(CompiledLineRule {
                rule,
                field_regexes,
            });
        }
        Ok(Self {
            category,
            rules: compiled,
            noise: &DEFAULT_NOISE,
        })
    }

    /// 테이블의 카테고리를 반환합니다.
    pub fn category(&self) -> Category {
        self.category
    }

    /// 등록된 규칙 수를 반환합니다.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 레코드 하나를 평가합니다.
    ///
    /// 첫 번째로 술어가 매칭된 규칙이 적용되며, 그 규칙의 필수 필드
    /// 추출이 실패하면 레코드는 드롭됩니다 (다음 규칙으로 넘어가지
    /// 않습니다). 단일 레코드의 어떤 실패도 사이클을 중단시키지 않습니다.
    pub fn evaluate(&self, record: &RawRecord, ctx: &EvalContext) -> Option<Event> {
        let RawPayload::Line(line) = &record.payload else {
            return None;
        };
        let lower = line.to_lowercase();

        let compiled = self
            .rules
            .iter()
            .find(|compiled| compiled.rule.predicate.matches(line, &lower))?;
        let rule = compiled.rule;

        let mut data = Map::new();
        for (field, regexes) in rule.fields.iter().zip(&compiled.field_regexes) {
            match field {
                FieldSpec::Pattern {
                    key,
                    required,
                    default,
                    ..
                }
                | FieldSpec::PatternAlt {
                    key,
                    required,
                    default,
                    ..
                } => {
                    let captured = regexes.iter().find_map(|regex| {
                        regex
                            .captures(line)
                            .and_then(|caps| caps.get(1))
                            .map(|m| m.as_str().trim().to_owned())
                    });
                    match captured {
                        Some(value) => {
                            data.insert((*key).to_owned(), Value::String(value));
                        }
                        None if *required => {
                            tracing::trace!(
                                event_type = rule.event_type,
                                field = *key,
                                "mandatory field missing, dropping record"
                            );
                            return None;
                        }
                        None => {
                            data.insert((*key).to_owned(), default.to_value());
                        }
                    }
                }
                FieldSpec::PatternInt { key, .. } => {
                    let number = regexes.iter().find_map(|regex| {
                        regex
                            .captures(line)
                            .and_then(|caps| caps.get(1))
                            .and_then(|m| m.as_str().parse::<i64>().ok())
                    });
                    data.insert(
                        (*key).to_owned(),
                        number.map(Value::from).unwrap_or(Value::Null),
                    );
                }
                FieldSpec::Const { key, value } => {
                    data.insert((*key).to_owned(), Value::String((*value).to_owned()));
                }
                FieldSpec::ConstBool { key, value } => {
                    data.insert((*key).to_owned(), Value::Bool(*value));
                }
                FieldSpec::Derived { key, derive } => {
                    data.insert((*key).to_owned(), derive(line));
                }
            }
        }

        if rule.suppress_noise && self.noise.is_noise(&data) {
            tracing::trace!(event_type = rule.event_type, "noise-suppressed record");
            return None;
        }

        let severity = rule.severity.resolve(line);
        let ts = timestamp::resolve(line);
        let message = (rule.message)(&data);

        Some(Event::new(
            self.category,
            rule.event_type,
            severity,
            ts,
            &ctx.identity,
            ctx.platform,
            record.source.clone(),
            message,
            data,
        ))
    }
}

/// Windows 채널 규칙의 투영 결과
pub struct WinProjection {
    /// 이벤트 타입 태그 (ID별로 달라질 수 있음)
    pub event_type: &'static str,
    /// 요약 메시지
    pub message: String,
    /// data 맵
    pub data: Map<String, Value>,
}

/// Windows 심각도 결정 규칙
#[derive(Debug, Clone, Copy)]
pub enum WinSeverityRule {
    /// 고정 심각도
    Fixed(Severity),
    /// 레코드 내용으로 결정 (ID, 데이터 필드)
    ByRecord(fn(&WinEventRecord) -> Severity),
}

impl WinSeverityRule {
    fn resolve(&self, record: &WinEventRecord) -> Severity {
        match self {
            Self::Fixed(severity) => *severity,
            Self::ByRecord(f) => f(record),
        }
    }
}

/// Windows 채널 규칙 — 이벤트 ID 집합 하나에 대응
///
/// 술어는 ID 매칭과 선택적 가드이며, 투영 함수가 필드 추출을
/// 수행합니다. 투영이 None을 반환하면 레코드는 드롭됩니다.
pub struct ChannelRule {
    /// 이 규칙이 다루는 이벤트 ID 집합
    pub event_ids: &'static [u32],
    /// 추가 매칭 조건 (예: LogonType == 10)
    pub guard: Option<fn(&WinEventRecord) -> bool>,
    /// 심각도 규칙
    pub severity: WinSeverityRule,
    /// 노이즈 억제 적용 여부
    pub suppress_noise: bool,
    /// 필드 투영 — 이벤트 타입/메시지/data를 생성
    pub project: fn(&WinEventRecord) -> Option<WinProjection>,
}

/// Windows 채널 규칙 테이블
pub struct ChannelRuleTable {
    category: Category,
    rules: &'static [ChannelRule],
    noise: &'static NoisePolicy,
}

impl ChannelRuleTable {
    /// 새 채널 규칙 테이블을 생성합니다.
    pub fn new(category: Category, rules: &'static [ChannelRule]) -> Self {
        Self {
            category,
            rules,
            noise: &DEFAULT_NOISE,
        }
    }

    /// 테이블의 카테고리를 반환합니다.
    pub fn category(&self) -> Category {
        self.category
    }

    /// 레코드 하나를 평가합니다. 첫 번째 매칭 규칙이 적용됩니다.
    pub fn evaluate(&self, record: &RawRecord, ctx: &EvalContext) -> Option<Event> {
        let RawPayload::WinEvent(win) = &record.payload else {
            return None;
        };

        let rule = self.rules.iter().find(|rule| {
            rule.event_ids.contains(&win.event_id)
                && rule.guard.is_none_or(|guard| guard(win))
        })?;

        let projection = (rule.project)(win)?;

        if rule.suppress_noise && self.noise.is_noise(&projection.data) {
            tracing::trace!(
                event_id = win.event_id,
                "noise-suppressed windows event"
            );
            return None;
        }

        let severity = rule.severity.resolve(win);
        let ts = timestamp::resolve_opt(win.time_created.as_deref());

        Some(Event::new(
            self.category,
            projection.event_type,
            severity,
            ts,
            &ctx.identity,
            ctx.platform,
            record.source.clone(),
            projection.message,
            projection.data,
        ))
    }
}

/// 노이즈 억제 정책 — 시스템 계정과 노이즈성 프로바이더의 거부 목록
#[derive(Debug)]
pub struct NoisePolicy {
    /// 억제할 계정명 (머신 계정 `$` 접미사는 항상 억제)
    pub principals: &'static [&'static str],
    /// 억제할 서비스/프로바이더 이름
    pub noisy_services: &'static [&'static str],
}

/// 기본 노이즈 정책
pub static DEFAULT_NOISE: NoisePolicy = NoisePolicy {
    principals: &["SYSTEM", "LOCAL SERVICE", "NETWORK SERVICE"],
    noisy_services: &["kernel", "systemd-journald", "systemd-logind"],
};

impl NoisePolicy {
    /// 추출된 data 맵이 노이즈인지 판단합니다.
    pub fn is_noise(&self, data: &Map<String, Value>) -> bool {
        for key in ["username", "user"] {
            if let Some(Value::String(name)) = data.get(key) {
                if name.ends_with('$') || self.principals.contains(&name.as_str()) {
                    return true;
                }
            }
        }
        if let Some(Value::String(service)) = data.get("service_name") {
            if self.noisy_services.contains(&service.as_str()) {
                return true;
            }
        }
        false
    }
}

/// data 맵에서 문자열 필드를 읽습니다. 없으면 "unknown"을 반환합니다.
///
/// 규칙의 메시지 렌더러에서 사용하는 헬퍼입니다.
pub(crate) fn field_str<'a>(data: &'a Map<String, Value>, key: &str) -> &'a str {
    match data.get(key) {
        Some(Value::String(value)) => value.as_str(),
        _ => "unknown",
    }
}

/// 메시지용으로 문자열을 지정 길이로 자릅니다 (UTF-8 경계 준수).
pub(crate) fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_all_tokens_required() {
        let predicate = Predicate {
            all: &["sshd", "Accepted"],
            any: &[],
            case_insensitive: false,
        };
        let line = "Nov 16 14:30:25 host sshd[1]: Accepted publickey for alice";
        assert!(predicate.matches(line, &line.to_lowercase()));
        let line = "Nov 16 14:30:25 host sshd[1]: Failed password for alice";
        assert!(!predicate.matches(line, &line.to_lowercase()));
    }

    #[test]
    fn predicate_any_groups_each_need_one_match() {
        let predicate = Predicate {
            all: &[],
            any: &[&[" su[", " su:"], &["FAILED", "authentication failure"]],
            case_insensitive: false,
        };
        let line = "Nov 16 15:00:00 host su: FAILED SU (to root) bob on pts/1";
        assert!(predicate.matches(line, &line.to_lowercase()));
        let line = "Nov 16 15:00:00 host su: (to root) bob on pts/1";
        assert!(!predicate.matches(line, &line.to_lowercase()));
    }

    #[test]
    fn predicate_case_insensitive_uses_lower() {
        let predicate = Predicate {
            all: &["kernel panic"],
            any: &[],
            case_insensitive: true,
        };
        let line = "Nov 16 03:22:15 host kernel: Kernel Panic - not syncing";
        assert!(predicate.matches(line, &line.to_lowercase()));
    }

    #[test]
    fn noise_policy_rejects_machine_accounts() {
        let mut data = Map::new();
        data.insert("username".to_owned(), Value::String("WEB01$".to_owned()));
        assert!(DEFAULT_NOISE.is_noise(&data));
    }

    #[test]
    fn noise_policy_rejects_system_principals() {
        let mut data = Map::new();
        data.insert("username".to_owned(), Value::String("SYSTEM".to_owned()));
        assert!(DEFAULT_NOISE.is_noise(&data));
    }

    #[test]
    fn noise_policy_rejects_noisy_services() {
        let mut data = Map::new();
        data.insert(
            "service_name".to_owned(),
            Value::String("systemd-journald".to_owned()),
        );
        assert!(DEFAULT_NOISE.is_noise(&data));
    }

    #[test]
    fn noise_policy_accepts_regular_users() {
        let mut data = Map::new();
        data.insert("username".to_owned(), Value::String("alice".to_owned()));
        assert!(!DEFAULT_NOISE.is_noise(&data));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        // 멀티바이트 문자 경계에서 자르지 않는지 확인
        let text = "한글메시지";
        let cut = truncate(text, 4);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn field_str_defaults_to_unknown() {
        let data = Map::new();
        assert_eq!(field_str(&data, "missing"), "unknown");
    }
}

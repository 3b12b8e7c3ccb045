//! Linux 규칙 테이블 — 인증, 권한 상승, 시스템, 서비스
//!
//! auth.log/secure, journald, kern.log/messages/syslog 라인에 적용되는
//! 선언적 규칙 테이블입니다. 테이블 내 규칙 순서가 곧 매칭 우선순위이며,
//! 구체적 시그니처(예: "Accepted")가 일반 시그니처(예: "error")보다
//! 앞에 옵니다.

use serde_json::Value;

use logward_core::types::{Category, Severity};

use crate::error::CollectorError;

use super::{
    field_str, truncate, FieldDefault, FieldSpec, LineRule, LineRuleTable, Predicate, SeverityRule,
};

/// 인증 카테고리 규칙 테이블을 생성합니다.
pub fn auth_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Authentication, AUTH_RULES)
}

/// 권한 상승 카테고리 규칙 테이블을 생성합니다.
pub fn privilege_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::PrivilegeEscalation, PRIVILEGE_RULES)
}

/// 시스템 크래시 카테고리 규칙 테이블을 생성합니다.
pub fn system_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::System, SYSTEM_RULES)
}

/// 서비스 장애 카테고리 규칙 테이블을 생성합니다.
pub fn service_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Service, SERVICE_RULES)
}

// --- 인증 (authentication) ---

static AUTH_RULES: &[LineRule] = &[
    // SSH 로그인 성공
    // 예: "Nov 16 14:30:25 host sshd[1]: Accepted publickey for alice from 10.0.0.5 port 22 ssh2"
    LineRule {
        event_type: "ssh_login_success",
        predicate: Predicate {
            all: &["sshd", "Accepted"],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "username",
                pattern: r"Accepted \w+ for (\S+) from",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "remote_ip",
                pattern: r"from ([\d\.]+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "auth_method",
                pattern: r"Accepted (\w+) for",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::PatternInt {
                key: "port",
                pattern: r"port (\d+)",
            },
            FieldSpec::Const {
                key: "protocol",
                value: "ssh",
            },
        ],
        message: |data| {
            format!(
                "User {} logged in via SSH from {}",
                field_str(data, "username"),
                field_str(data, "remote_ip"),
            )
        },
        suppress_noise: false,
    },
    // SSH 로그인 실패
    // 예: "Failed password for invalid user admin from 10.0.0.9 port 22 ssh2"
    LineRule {
        event_type: "ssh_login_failed",
        predicate: Predicate {
            all: &["sshd"],
            any: &[&["Failed password", "authentication failure"]],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::PatternAlt {
                key: "username",
                patterns: &[r"invalid user (\S+) from", r"for (\S+) from"],
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "remote_ip",
                pattern: r"from ([\d\.]+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::PatternInt {
                key: "port",
                pattern: r"port (\d+)",
            },
            FieldSpec::Derived {
                key: "reason",
                derive: |line| {
                    let reason = if line.contains("invalid user") {
                        "Invalid user"
                    } else if line.contains("Failed password") {
                        "Bad password"
                    } else {
                        "Authentication failed"
                    };
                    Value::String(reason.to_owned())
                },
            },
            FieldSpec::Derived {
                key: "invalid_user",
                derive: |line| Value::Bool(line.contains("invalid user")),
            },
            FieldSpec::Const {
                key: "protocol",
                value: "ssh",
            },
        ],
        message: |data| {
            format!(
                "Failed SSH login for {} from {} - {}",
                field_str(data, "username"),
                field_str(data, "remote_ip"),
                field_str(data, "reason"),
            )
        },
        suppress_noise: false,
    },
    // 로컬 로그인 성공 (PAM 세션)
    // 예: "login[1234]: pam_unix(login:session): session opened for user bob by LOGIN(uid=0)"
    LineRule {
        event_type: "local_login_success",
        predicate: Predicate {
            all: &["login", "session opened"],
            any: &[],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::PatternAlt {
                key: "username",
                patterns: &[r"for user (\S+)", r"user=(\S+)"],
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "login_type",
                value: "local",
            },
            FieldSpec::ConstBool {
                key: "success",
                value: true,
            },
        ],
        message: |data| format!("Local login for user {}", field_str(data, "username")),
        suppress_noise: false,
    },
    // 로컬 로그인 실패
    LineRule {
        event_type: "local_login_failed",
        predicate: Predicate {
            all: &["login"],
            any: &[&["failed", "authentication failure"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::PatternAlt {
                key: "username",
                patterns: &[r"for user (\S+)", r"user=(\S+)"],
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "login_type",
                value: "local",
            },
            FieldSpec::ConstBool {
                key: "success",
                value: false,
            },
        ],
        message: |data| format!("Local login failed for user {}", field_str(data, "username")),
        suppress_noise: false,
    },
];

// --- 권한 상승 (privilege_escalation) ---

static PRIVILEGE_RULES: &[LineRule] = &[
    // sudo 사용
    // 예: "sudo: alice : TTY=pts/0 ; PWD=/home/alice ; USER=root ; COMMAND=/usr/bin/apt update"
    LineRule {
        event_type: "sudo_used",
        predicate: Predicate {
            all: &["sudo", "COMMAND="],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::PatternAlt {
                key: "username",
                patterns: &[r"sudo:\s+(\S+)\s+:", r"sudo\[\d+\]:\s+(\S+)\s+:"],
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "command",
                pattern: r"COMMAND=(.+)$",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "target_user",
                pattern: r"USER=(\S+)",
                required: false,
                default: FieldDefault::Str("root"),
            },
            FieldSpec::Pattern {
                key: "tty",
                pattern: r"TTY=(\S+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "pwd",
                pattern: r"PWD=(\S+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            // 로그에 남았다는 것은 sudo가 실행되었다는 뜻
            FieldSpec::ConstBool {
                key: "success",
                value: true,
            },
        ],
        message: |data| {
            format!(
                "User {} used sudo to run: {}",
                field_str(data, "username"),
                field_str(data, "command"),
            )
        },
        suppress_noise: false,
    },
    // su 실패 — 성공 규칙보다 앞에 와야 합니다 (실패 마커가 더 구체적)
    LineRule {
        event_type: "su_failed",
        predicate: Predicate {
            all: &[],
            any: &[&[" su[", " su:"], &["FAILED", "authentication failure"]],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::Pattern {
                key: "target_user",
                pattern: r"\(to (\S+)\)",
                required: false,
                default: FieldDefault::Str("root"),
            },
            FieldSpec::Pattern {
                key: "username",
                pattern: r"\)\s+(\S+)\s+on",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "tty",
                pattern: r"on\s+(\S+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::ConstBool {
                key: "success",
                value: false,
            },
        ],
        message: |data| {
            format!(
                "User {} failed to switch to {}",
                field_str(data, "username"),
                field_str(data, "target_user"),
            )
        },
        suppress_noise: false,
    },
    // su 성공
    // 예: "su: (to root) alice on pts/0"
    LineRule {
        event_type: "su_success",
        predicate: Predicate {
            all: &[],
            any: &[&[" su[", " su:"]],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "target_user",
                pattern: r"\(to (\S+)\)",
                required: false,
                default: FieldDefault::Str("root"),
            },
            FieldSpec::Pattern {
                key: "username",
                pattern: r"\)\s+(\S+)\s+on",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "tty",
                pattern: r"on\s+(\S+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::ConstBool {
                key: "success",
                value: true,
            },
        ],
        message: |data| {
            format!(
                "User {} switched to {}",
                field_str(data, "username"),
                field_str(data, "target_user"),
            )
        },
        suppress_noise: false,
    },
];

// --- 시스템 크래시 (system) ---

/// "kernel:" 이후의 메시지 본문을 추출합니다. 없으면 라인 전체.
fn kernel_message(line: &str) -> Value {
    let msg = line
        .split_once("kernel:")
        .map(|(_, rest)| rest.trim())
        .unwrap_or_else(|| line.trim());
    Value::String(msg.to_owned())
}

static SYSTEM_RULES: &[LineRule] = &[
    // 커널 패닉
    // 예: "kernel: Kernel panic - not syncing: VFS: Unable to mount root fs"
    LineRule {
        event_type: "kernel_panic",
        predicate: Predicate {
            all: &[],
            any: &[&["kernel panic", "panic:"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Critical),
        fields: &[
            FieldSpec::Pattern {
                key: "panic_message",
                pattern: r"(?i)panic\s*[:\-]\s*(.+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Derived {
                key: "full_log",
                derive: |line| Value::String(line.trim().to_owned()),
            },
        ],
        message: |data| {
            format!(
                "Kernel panic: {}",
                truncate(field_str(data, "panic_message"), 100),
            )
        },
        suppress_noise: false,
    },
    // OOM kill
    // 예: "kernel: Out of memory: Killed process 12345 (nginx) total-vm:1234kB"
    LineRule {
        event_type: "oom_kill",
        predicate: Predicate {
            all: &["kill"],
            any: &[&["oom", "out of memory"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Error),
        fields: &[
            FieldSpec::Pattern {
                key: "process_name",
                pattern: r"Killed process \d+ \(([^)]+)\)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::PatternInt {
                key: "pid",
                pattern: r"Killed process (\d+)",
            },
            FieldSpec::Pattern {
                key: "memory_kb",
                pattern: r"total-vm:(\d+)kB",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "reason",
                value: "out_of_memory",
            },
        ],
        message: |data| {
            format!(
                "Out of memory: killed process {}",
                field_str(data, "process_name"),
            )
        },
        suppress_noise: false,
    },
    // 세그멘테이션 폴트
    // 예: "kernel: program[12345]: segfault at 7f1234567890 ip 00007f9876543210"
    LineRule {
        event_type: "segmentation_fault",
        predicate: Predicate {
            all: &[],
            any: &[&["segfault", "segmentation fault"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::Pattern {
                key: "program",
                pattern: r"\s([a-zA-Z0-9_\-\.]+)\[\d+\].*segfault",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::PatternInt {
                key: "pid",
                pattern: r"\[(\d+)\]",
            },
            FieldSpec::Pattern {
                key: "fault_address",
                pattern: r"segfault at ([0-9a-fA-F]+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "fault_type",
                value: "segfault",
            },
        ],
        message: |data| {
            format!("Segmentation fault in {}", field_str(data, "program"))
        },
        suppress_noise: false,
    },
    // 하드웨어 에러 (MCE)
    LineRule {
        event_type: "hardware_error",
        predicate: Predicate {
            all: &[],
            any: &[&["hardware error", "mce:"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Error),
        fields: &[
            FieldSpec::Derived {
                key: "error_message",
                derive: kernel_message,
            },
            FieldSpec::PatternInt {
                key: "cpu",
                pattern: r"CPU(\d+)",
            },
            FieldSpec::Const {
                key: "error_type",
                value: "machine_check_exception",
            },
        ],
        message: |data| {
            format!(
                "Hardware error detected: {}",
                truncate(field_str(data, "error_message"), 80),
            )
        },
        suppress_noise: false,
    },
    // 커널 BUG
    LineRule {
        event_type: "kernel_bug",
        predicate: Predicate {
            all: &["BUG:"],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Error),
        fields: &[
            FieldSpec::Derived {
                key: "error_message",
                derive: kernel_message,
            },
            FieldSpec::Const {
                key: "error_type",
                value: "kernel_bug",
            },
        ],
        message: |data| {
            format!(
                "Kernel error: {}",
                truncate(field_str(data, "error_message"), 80),
            )
        },
        suppress_noise: false,
    },
    // 커널 Oops
    LineRule {
        event_type: "kernel_oops",
        predicate: Predicate {
            all: &["oops:"],
            any: &[],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Error),
        fields: &[
            FieldSpec::Derived {
                key: "error_message",
                derive: kernel_message,
            },
            FieldSpec::Const {
                key: "error_type",
                value: "kernel_oops",
            },
        ],
        message: |data| {
            format!(
                "Kernel error: {}",
                truncate(field_str(data, "error_message"), 80),
            )
        },
        suppress_noise: false,
    },
    // 예기치 않은 재부팅
    LineRule {
        event_type: "unexpected_reboot",
        predicate: Predicate {
            all: &["reboot", "unexpected"],
            any: &[],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::Const {
                key: "reboot_type",
                value: "unexpected",
            },
            FieldSpec::Derived {
                key: "log_message",
                derive: |line| Value::String(line.trim().to_owned()),
            },
        ],
        message: |_| "System experienced unexpected reboot".to_owned(),
        suppress_noise: false,
    },
];

// --- 서비스 장애 (service) ---

static SERVICE_RULES: &[LineRule] = &[
    // systemd 유닛 실패
    // 예: "systemd[1]: nginx.service: Failed with result 'exit-code'."
    LineRule {
        event_type: "service_failed",
        predicate: Predicate {
            all: &["failed"],
            any: &[&[".service", "unit"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Error),
        fields: &[
            FieldSpec::Pattern {
                key: "service_name",
                pattern: r"([a-zA-Z0-9_\-\.]+)\.service",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "failure_reason",
                pattern: r"result '([^']+)'",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "exit_code",
                pattern: r"code=(\w+)",
                required: false,
                default: FieldDefault::Null,
            },
            FieldSpec::Const {
                key: "unit_type",
                value: "systemd",
            },
        ],
        message: |data| {
            format!(
                "Service {} failed: {}",
                field_str(data, "service_name"),
                field_str(data, "failure_reason"),
            )
        },
        suppress_noise: false,
    },
    // 서비스 크래시 / 코어 덤프
    LineRule {
        event_type: "service_crashed",
        predicate: Predicate {
            all: &[],
            any: &[&["crashed", "core dump"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Error),
        fields: &[
            FieldSpec::Pattern {
                key: "service_name",
                pattern: r"\s([a-zA-Z0-9_\-\.]+)\[\d+\]",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::PatternInt {
                key: "pid",
                pattern: r"\[(\d+)\]",
            },
            FieldSpec::Pattern {
                key: "signal",
                pattern: r"signal (\d+)",
                required: false,
                default: FieldDefault::Null,
            },
            FieldSpec::Derived {
                key: "crash_type",
                derive: |line| {
                    let kind = if line.to_lowercase().contains("core") {
                        "core_dump"
                    } else {
                        "crash"
                    };
                    Value::String(kind.to_owned())
                },
            },
        ],
        message: |data| format!("Service {} crashed", field_str(data, "service_name")),
        suppress_noise: false,
    },
    // 재시작 한도 초과
    // 예: "systemd[1]: mysql.service: Start request repeated too quickly."
    LineRule {
        event_type: "service_restart_limit",
        predicate: Predicate {
            all: &["restart"],
            any: &[&["limit", "too"]],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::Pattern {
                key: "service_name",
                pattern: r"([a-zA-Z0-9_\-\.]+)\.service",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "reason",
                value: "restart_limit_exceeded",
            },
            FieldSpec::Const {
                key: "unit_type",
                value: "systemd",
            },
        ],
        message: |data| {
            format!(
                "Service {} restart limit exceeded",
                field_str(data, "service_name"),
            )
        },
        suppress_noise: false,
    },
    // 일반 서비스/데몬 에러 — 가장 마지막의 포괄 규칙
    LineRule {
        event_type: "service_error",
        predicate: Predicate {
            all: &[],
            any: &[
                &["error", "failed", "crash"],
                &[
                    "systemd",
                    "nginx",
                    "apache",
                    "mysql",
                    "postgresql",
                    "redis",
                    "docker",
                    "sshd",
                    "cron",
                    "rsyslog",
                    "init",
                ],
            ],
            case_insensitive: true,
        },
        severity: SeverityRule::Fixed(Severity::Warning),
        fields: &[
            FieldSpec::Pattern {
                key: "service_name",
                pattern: r"\s([a-zA-Z0-9_\-\.]+)(?:\[\d+\])?:\s",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "error_message",
                pattern: r"\s[a-zA-Z0-9_\-\.]+(?:\[\d+\])?:\s+(.+)$",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "error_type",
                value: "application_error",
            },
        ],
        message: |data| {
            format!(
                "Service {} error: {}",
                field_str(data, "service_name"),
                truncate(field_str(data, "error_message"), 80),
            )
        },
        // kernel, systemd-journald 등 노이즈 프로바이더 억제
        suppress_noise: true,
    },
];

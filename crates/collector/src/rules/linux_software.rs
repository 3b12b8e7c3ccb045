//! Linux 소프트웨어 변경 규칙 테이블 — 패키지 매니저 로그별 형식
//!
//! 감지된 패키지 매니저의 로그 파일마다 전용 테이블이 적용됩니다.
//!
//! | 매니저   | 로그                               | 형식 예 |
//! |----------|------------------------------------|---------|
//! | dpkg     | /var/log/dpkg.log                  | `2025-11-16 10:30:00 install nginx:amd64 <none> 1.18.0-1` |
//! | apt      | /var/log/apt/history.log           | `Install: nginx:amd64 (1.18.0-1ubuntu1)` |
//! | yum/dnf  | /var/log/yum.log, /var/log/dnf.log | `Nov 16 10:30:00 Installed: nginx-1.18.0-1.el8.x86_64` |
//! | pacman   | /var/log/pacman.log                | `[2025-11-16T10:30:00+0000] [ALPM] installed nginx (1.18.0-1)` |
//! | zypper   | /var/log/zypp/history              | `2025-11-16 10:30:00\|install\|nginx\|1.18.0-1\|...` |

use serde_json::Value;

use logward_core::types::{Category, Severity};

use crate::error::CollectorError;

use super::{field_str, FieldDefault, FieldSpec, LineRule, LineRuleTable, Predicate, SeverityRule};

/// dpkg.log 규칙 테이블을 생성합니다.
pub fn dpkg_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Software, DPKG_RULES)
}

/// apt history.log 규칙 테이블을 생성합니다.
pub fn apt_history_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Software, APT_HISTORY_RULES)
}

/// yum.log / dnf.log 규칙 테이블을 생성합니다.
pub fn yum_dnf_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Software, YUM_DNF_RULES)
}

/// pacman.log 규칙 테이블을 생성합니다.
pub fn pacman_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Software, PACMAN_RULES)
}

/// zypper history 규칙 테이블을 생성합니다.
pub fn zypper_table() -> Result<LineRuleTable, CollectorError> {
    LineRuleTable::new(Category::Software, ZYPPER_RULES)
}

/// 소프트웨어 이벤트 공통 메시지
fn software_message(data: &serde_json::Map<String, Value>) -> String {
    format!(
        "Package {} {}: {}",
        field_str(data, "package_name"),
        field_str(data, "action"),
        field_str(data, "version"),
    )
}

// --- dpkg ---
// 컬럼 형식: DATE TIME action package:arch old-version new-version

static DPKG_RULES: &[LineRule] = &[
    LineRule {
        event_type: "software_installed",
        predicate: Predicate {
            all: &[" install "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"^\S+ \S+ install ([^\s:]+)",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"^\S+ \S+ install \S+ \S+ (\S+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "install",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "dpkg",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_updated",
        predicate: Predicate {
            all: &[" upgrade "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"^\S+ \S+ upgrade ([^\s:]+)",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"^\S+ \S+ upgrade \S+ \S+ (\S+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "upgrade",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "dpkg",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_removed",
        predicate: Predicate {
            all: &[],
            any: &[&[" remove ", " purge "]],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::PatternAlt {
                key: "package_name",
                patterns: &[
                    r"^\S+ \S+ remove ([^\s:]+)",
                    r"^\S+ \S+ purge ([^\s:]+)",
                ],
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Derived {
                key: "action",
                derive: |line| {
                    let action = if line.contains(" purge ") { "purge" } else { "remove" };
                    Value::String(action.to_owned())
                },
            },
            FieldSpec::PatternAlt {
                key: "version",
                patterns: &[
                    r"^\S+ \S+ remove \S+ (\S+)",
                    r"^\S+ \S+ purge \S+ (\S+)",
                ],
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "dpkg",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
];

// --- apt history.log ---
// 멀티라인 엔트리 중 Install:/Upgrade:/Remove: 라인만 사용합니다.
// 이 라인에는 타임스탬프가 없으므로 수집 시각 폴백이 적용됩니다.

static APT_HISTORY_RULES: &[LineRule] = &[
    LineRule {
        event_type: "software_installed",
        predicate: Predicate {
            all: &["Install: "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"Install:\s+([a-zA-Z0-9\-\.\_\+]+)",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\(([^\),]+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "install",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "apt",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_updated",
        predicate: Predicate {
            all: &["Upgrade: "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"Upgrade:\s+([a-zA-Z0-9\-\.\_\+]+)",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\(([^\),]+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "upgrade",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "apt",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_removed",
        predicate: Predicate {
            all: &["Remove: "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"Remove:\s+([a-zA-Z0-9\-\.\_\+]+)",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\(([^\),]+)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "remove",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "apt",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
];

// --- yum / dnf ---
// 패키지 토큰은 name-version-release.arch 형태이므로 파생 함수로 분해합니다.

/// yum/dnf 라인에서 패키지 토큰을 추출합니다.
fn yum_package_token(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(": ")?;
    let token = rest.split_whitespace().next()?;
    Some(token)
}

/// `name-version-release.arch`에서 패키지 이름을 분리합니다.
fn yum_package_name(line: &str) -> Value {
    match yum_package_token(line) {
        Some(token) => {
            let without_arch = token.rsplit_once('.').map(|(head, _)| head).unwrap_or(token);
            let mut parts: Vec<&str> = without_arch.rsplitn(3, '-').collect();
            parts.reverse();
            let name = if parts.len() == 3 { parts[0] } else { without_arch };
            Value::String(name.to_owned())
        }
        None => Value::String("unknown".to_owned()),
    }
}

/// `name-version-release.arch`에서 버전-릴리즈를 분리합니다.
fn yum_package_version(line: &str) -> Value {
    match yum_package_token(line) {
        Some(token) => {
            let without_arch = token.rsplit_once('.').map(|(head, _)| head).unwrap_or(token);
            let mut parts: Vec<&str> = without_arch.rsplitn(3, '-').collect();
            parts.reverse();
            if parts.len() == 3 {
                Value::String(format!("{}-{}", parts[1], parts[2]))
            } else {
                Value::String("unknown".to_owned())
            }
        }
        None => Value::String("unknown".to_owned()),
    }
}

static YUM_DNF_RULES: &[LineRule] = &[
    LineRule {
        event_type: "software_installed",
        predicate: Predicate {
            all: &["Installed: "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Derived {
                key: "package_name",
                derive: yum_package_name,
            },
            FieldSpec::Derived {
                key: "version",
                derive: yum_package_version,
            },
            FieldSpec::Const {
                key: "action",
                value: "install",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "yum/dnf",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_updated",
        predicate: Predicate {
            all: &[],
            any: &[&["Updated: ", "Upgrade: "]],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Derived {
                key: "package_name",
                derive: yum_package_name,
            },
            FieldSpec::Derived {
                key: "version",
                derive: yum_package_version,
            },
            FieldSpec::Const {
                key: "action",
                value: "update",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "yum/dnf",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_removed",
        predicate: Predicate {
            all: &[],
            any: &[&["Erased: ", "Removed: "]],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Derived {
                key: "package_name",
                derive: yum_package_name,
            },
            FieldSpec::Derived {
                key: "version",
                derive: yum_package_version,
            },
            FieldSpec::Const {
                key: "action",
                value: "remove",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "yum/dnf",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
];

// --- pacman ---

static PACMAN_RULES: &[LineRule] = &[
    LineRule {
        event_type: "software_updated",
        predicate: Predicate {
            all: &["[ALPM]", " upgraded "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"upgraded (\S+) \(",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\(([^\)]+)\)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "upgrade",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "pacman",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_installed",
        predicate: Predicate {
            all: &["[ALPM]", " installed "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"installed (\S+) \(",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\(([^\)]+)\)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "install",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "pacman",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_removed",
        predicate: Predicate {
            all: &["[ALPM]", " removed "],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"removed (\S+) \(",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\(([^\)]+)\)",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "remove",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "pacman",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
];

// --- zypper ---
// /var/log/zypp/history의 파이프 구분 형식: DATE TIME|action|package|version|arch|...

static ZYPPER_RULES: &[LineRule] = &[
    LineRule {
        event_type: "software_installed",
        predicate: Predicate {
            all: &["|install|"],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"\|install\|([^|]+)\|",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\|install\|[^|]+\|([^|]+)\|",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "install",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "zypper",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
    LineRule {
        event_type: "software_removed",
        predicate: Predicate {
            all: &["|remove|"],
            any: &[],
            case_insensitive: false,
        },
        severity: SeverityRule::Fixed(Severity::Info),
        fields: &[
            FieldSpec::Pattern {
                key: "package_name",
                pattern: r"\|remove\|([^|]+)\|",
                required: true,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Pattern {
                key: "version",
                pattern: r"\|remove\|[^|]+\|([^|]+)\|",
                required: false,
                default: FieldDefault::Unknown,
            },
            FieldSpec::Const {
                key: "action",
                value: "remove",
            },
            FieldSpec::Const {
                key: "package_manager",
                value: "zypper",
            },
        ],
        message: software_message,
        suppress_noise: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::RawRecord;
    use crate::rules::EvalContext;
    use chrono::{TimeZone, Utc};
    use logward_core::host::HostIdentity;
    use logward_core::types::Platform;

    fn ctx() -> EvalContext {
        EvalContext {
            identity: HostIdentity {
                hostname: "web-01".to_owned(),
                ipv4: "192.168.0.100".to_owned(),
            },
            platform: Platform::Linux,
        }
    }

    fn eval(table: &LineRuleTable, line: &str, source: &str) -> Option<logward_core::event::Event> {
        table.evaluate(&RawRecord::line(line, source, Platform::Linux), &ctx())
    }

    #[test]
    fn dpkg_install_line() {
        let table = dpkg_table().unwrap();
        let event = eval(
            &table,
            "2025-11-16 10:30:00 install nginx:amd64 <none> 1.18.0-1ubuntu1",
            "dpkg",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_installed");
        assert_eq!(event.data["package_name"], "nginx");
        assert_eq!(event.data["version"], "1.18.0-1ubuntu1");
        assert_eq!(event.data["package_manager"], "dpkg");
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 11, 16, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn dpkg_status_lines_are_ignored() {
        let table = dpkg_table().unwrap();
        assert!(eval(
            &table,
            "2025-11-16 10:30:01 status installed nginx:amd64 1.18.0-1ubuntu1",
            "dpkg",
        )
        .is_none());
        assert!(eval(
            &table,
            "2025-11-16 10:30:02 trigproc libc-bin:amd64 2.31-0ubuntu9 <none>",
            "dpkg",
        )
        .is_none());
    }

    #[test]
    fn dpkg_remove_and_purge() {
        let table = dpkg_table().unwrap();
        let removed = eval(
            &table,
            "2025-11-16 11:00:00 remove oldtool:amd64 1.0-1 <none>",
            "dpkg",
        )
        .unwrap();
        assert_eq!(removed.event_type, "software_removed");
        assert_eq!(removed.data["action"], "remove");

        let purged = eval(
            &table,
            "2025-11-16 11:00:05 purge oldtool:amd64 1.0-1 <none>",
            "dpkg",
        )
        .unwrap();
        assert_eq!(purged.data["action"], "purge");
    }

    #[test]
    fn apt_history_install_line() {
        let table = apt_history_table().unwrap();
        let event = eval(
            &table,
            "Install: nginx:amd64 (1.18.0-1ubuntu1), nginx-common:amd64 (1.18.0-1ubuntu1)",
            "apt",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_installed");
        assert_eq!(event.data["package_name"], "nginx");
        assert_eq!(event.data["version"], "1.18.0-1ubuntu1");
        assert_eq!(event.data["package_manager"], "apt");
    }

    #[test]
    fn yum_installed_line_splits_name_and_version() {
        let table = yum_dnf_table().unwrap();
        let event = eval(
            &table,
            "Nov 16 10:30:00 Installed: nginx-1.18.0-1.el8.x86_64",
            "yum/dnf",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_installed");
        assert_eq!(event.data["package_name"], "nginx");
        assert_eq!(event.data["version"], "1.18.0-1.el8");
    }

    #[test]
    fn yum_erased_line() {
        let table = yum_dnf_table().unwrap();
        let event = eval(
            &table,
            "Nov 16 12:00:00 Erased: httpd-2.4.37-43.el8.x86_64",
            "yum/dnf",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_removed");
        assert_eq!(event.data["package_name"], "httpd");
    }

    #[test]
    fn pacman_installed_line() {
        let table = pacman_table().unwrap();
        let event = eval(
            &table,
            "[2025-11-16T10:30:00+0000] [ALPM] installed nginx (1.18.0-1)",
            "pacman",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_installed");
        assert_eq!(event.data["package_name"], "nginx");
        assert_eq!(event.data["version"], "1.18.0-1");
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2025, 11, 16, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn pacman_upgraded_takes_priority_over_installed_rule() {
        let table = pacman_table().unwrap();
        let event = eval(
            &table,
            "[2025-11-16T10:31:00+0000] [ALPM] upgraded openssl (1.1.1-1 -> 1.1.1-2)",
            "pacman",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_updated");
        assert_eq!(event.data["package_name"], "openssl");
    }

    #[test]
    fn zypper_history_install_line() {
        let table = zypper_table().unwrap();
        let event = eval(
            &table,
            "2025-11-16 10:30:00|install|nginx|1.18.0-1.1|x86_64|root@host|repo-oss|abc123|",
            "zypper",
        )
        .unwrap();
        assert_eq!(event.event_type, "software_installed");
        assert_eq!(event.data["package_name"], "nginx");
        assert_eq!(event.data["version"], "1.18.0-1.1");
        assert_eq!(event.data["package_manager"], "zypper");
    }

    #[test]
    fn zypper_comment_lines_are_ignored() {
        let table = zypper_table().unwrap();
        assert!(eval(&table, "# 2025-11-16 10:29:59 nginx-1.18.0 installed ok", "zypper").is_none());
    }
}

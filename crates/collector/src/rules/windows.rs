//! Windows 규칙 테이블 — 채널 × 이벤트 ID 집합 기반
//!
//! 구조화 이벤트 로그 레코드에 적용되는 규칙입니다. 술어는 이벤트 ID
//! 매칭(+선택적 가드)이고, 투영 함수가 EventData의 명명된 필드를
//! data 맵으로 옮깁니다.
//!
//! | 카테고리            | 채널                      | 이벤트 ID |
//! |---------------------|---------------------------|-----------|
//! | authentication      | Security                  | 4624/4625/4634/4647/4648/4740/4767 |
//! | privilege_escalation| Security                  | 4720계열, 그룹 멤버십, 4672 |
//! | remote_access       | Security, TerminalServices| 4624(Type10)/4778/4779, 21-40 |
//! | system              | System                    | 1001/41/6008/1074/6005/6006/6009 |
//! | service             | System, Application       | 7000계열, 1000-1002 |
//! | software            | Application, System       | MSI 1033계열, WindowsUpdate 19/20/43/44 |

use serde_json::{Map, Value};

use logward_core::types::{Category, Severity};

use crate::reader::WinEventRecord;

use super::{truncate, ChannelRule, ChannelRuleTable, WinProjection, WinSeverityRule};

// --- 리더 조회용 이벤트 ID 집합 ---

/// 인증 이벤트 ID (Security)
pub const AUTH_EVENT_IDS: &[u32] = &[4624, 4625, 4634, 4647, 4648, 4740, 4767];

/// 권한/계정 이벤트 ID (Security)
pub const PRIVILEGE_EVENT_IDS: &[u32] = &[
    4720, 4722, 4723, 4724, 4725, 4726, 4738, 4728, 4729, 4732, 4733, 4756, 4757, 4672,
];

/// 원격 접속 이벤트 ID (Security)
pub const REMOTE_SECURITY_IDS: &[u32] = &[4624, 4778, 4779];

/// Terminal Services 세션 이벤트 ID
pub const REMOTE_TS_IDS: &[u32] = &[21, 22, 23, 24, 25, 39, 40];

/// Terminal Services 로그 채널명
pub const TS_CHANNEL: &str = "Microsoft-Windows-TerminalServices-LocalSessionManager/Operational";

/// 시스템 크래시 이벤트 ID (System)
pub const SYSTEM_EVENT_IDS: &[u32] = &[1001, 41, 6008, 1074, 6005, 6006, 6009];

/// Service Control Manager 이벤트 ID (System)
pub const SERVICE_SCM_IDS: &[u32] = &[7000, 7001, 7009, 7022, 7023, 7024, 7026, 7031, 7032, 7034];

/// 애플리케이션 크래시 이벤트 ID (Application)
pub const SERVICE_APP_IDS: &[u32] = &[1000, 1001, 1002];

/// MSI 인스톨러 이벤트 ID (Application)
pub const SOFTWARE_MSI_IDS: &[u32] = &[1033, 1034, 11707, 11708, 11724];

/// Windows Update 이벤트 ID (System)
pub const SOFTWARE_UPDATE_IDS: &[u32] = &[19, 20, 43, 44];

/// Setup 채널 이벤트 ID (주요 설치/업데이트 단계)
pub const SOFTWARE_SETUP_IDS: &[u32] = &[1, 2, 3, 4];

/// 인증 카테고리 테이블을 생성합니다.
pub fn auth_table() -> ChannelRuleTable {
    ChannelRuleTable::new(Category::Authentication, AUTH_RULES)
}

/// 권한 상승 카테고리 테이블을 생성합니다.
pub fn privilege_table() -> ChannelRuleTable {
    ChannelRuleTable::new(Category::PrivilegeEscalation, PRIVILEGE_RULES)
}

/// 원격 접속 카테고리 테이블을 생성합니다.
pub fn remote_table() -> ChannelRuleTable {
    ChannelRuleTable::new(Category::RemoteAccess, REMOTE_RULES)
}

/// 시스템 카테고리 테이블을 생성합니다.
pub fn system_table() -> ChannelRuleTable {
    ChannelRuleTable::new(Category::System, SYSTEM_RULES)
}

/// 서비스 카테고리 테이블을 생성합니다.
pub fn service_table() -> ChannelRuleTable {
    ChannelRuleTable::new(Category::Service, SERVICE_RULES)
}

/// 소프트웨어 카테고리 테이블을 생성합니다.
pub fn software_table() -> ChannelRuleTable {
    ChannelRuleTable::new(Category::Software, SOFTWARE_RULES)
}

// --- 공통 헬퍼 ---

/// 로그온 타입 번호를 표시명으로 변환합니다.
fn logon_type_name(logon_type: u32) -> String {
    match logon_type {
        0 => "System".to_owned(),
        2 => "Interactive".to_owned(),
        3 => "Network".to_owned(),
        4 => "Batch".to_owned(),
        5 => "Service".to_owned(),
        7 => "Unlock".to_owned(),
        8 => "NetworkCleartext".to_owned(),
        9 => "NewCredentials".to_owned(),
        10 => "RemoteInteractive".to_owned(),
        11 => "CachedInteractive".to_owned(),
        other => format!("Type{other}"),
    }
}

/// `DOMAIN\user` 표기를 만듭니다. 도메인이 없으면 사용자명만 반환합니다.
fn full_username(domain: &str, username: &str) -> String {
    if domain.is_empty() {
        username.to_owned()
    } else {
        format!("{domain}\\{username}")
    }
}

fn insert_str(data: &mut Map<String, Value>, key: &str, value: &str) {
    data.insert(key.to_owned(), Value::String(value.to_owned()));
}

fn insert_user_fields(data: &mut Map<String, Value>, record: &WinEventRecord) -> (String, String) {
    let username = record.field("TargetUserName").to_owned();
    let domain = record.field("TargetDomainName").to_owned();
    insert_str(data, "username", &username);
    insert_str(data, "domain", &domain);
    data.insert(
        "full_username".to_owned(),
        Value::String(full_username(&domain, &username)),
    );
    (username, domain)
}

// --- 인증 (authentication / Security) ---

static AUTH_RULES: &[ChannelRule] = &[
    // 4624: 로그인 성공 — RDP(Type 10)는 warning
    ChannelRule {
        event_ids: &[4624],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| {
            if record.field_u32("LogonType") == Some(10) {
                Severity::Warning
            } else {
                Severity::Info
            }
        }),
        suppress_noise: true,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4624));
            let (username, domain) = insert_user_fields(&mut data, record);
            let logon_type = record.field_u32("LogonType").unwrap_or(0);
            let type_name = logon_type_name(logon_type);
            data.insert("logon_type".to_owned(), Value::from(logon_type));
            insert_str(&mut data, "logon_type_name", &type_name);
            insert_str(&mut data, "workstation", record.field("WorkstationName"));
            insert_str(&mut data, "source_ip", record.field("IpAddress"));
            insert_str(&mut data, "logon_id", record.field("TargetLogonId"));
            insert_str(&mut data, "process_name", record.field("ProcessName"));

            let source_ip = record.field("IpAddress");
            let message = if !source_ip.is_empty() && source_ip != "-" && source_ip != "127.0.0.1" {
                format!(
                    "User {} logged in via {} from {}",
                    full_username(&domain, &username),
                    type_name,
                    source_ip,
                )
            } else {
                format!(
                    "User {} logged in via {}",
                    full_username(&domain, &username),
                    type_name,
                )
            };
            Some(WinProjection {
                event_type: "login_success",
                message,
                data,
            })
        },
    },
    // 4625: 로그인 실패 — 시스템 계정도 억제하지 않습니다
    ChannelRule {
        event_ids: &[4625],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Warning),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4625));
            let (username, domain) = insert_user_fields(&mut data, record);
            let logon_type = record.field_u32("LogonType").unwrap_or(0);
            let type_name = logon_type_name(logon_type);
            data.insert("logon_type".to_owned(), Value::from(logon_type));
            insert_str(&mut data, "logon_type_name", &type_name);
            insert_str(&mut data, "workstation", record.field("WorkstationName"));
            insert_str(&mut data, "source_ip", record.field("IpAddress"));
            insert_str(&mut data, "failure_reason", record.field("FailureReason"));
            insert_str(&mut data, "status", record.field("Status"));
            insert_str(&mut data, "sub_status", record.field("SubStatus"));

            let source_ip = record.field("IpAddress");
            let message = if !source_ip.is_empty() && source_ip != "-" {
                format!(
                    "Failed login for {} from {} ({})",
                    full_username(&domain, &username),
                    source_ip,
                    type_name,
                )
            } else {
                format!(
                    "Failed login for {} ({})",
                    full_username(&domain, &username),
                    type_name,
                )
            };
            Some(WinProjection {
                event_type: "login_failed",
                message,
                data,
            })
        },
    },
    // 4634/4647: 로그오프
    ChannelRule {
        event_ids: &[4634, 4647],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: true,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let (username, domain) = insert_user_fields(&mut data, record);
            let logon_type = record.field_u32("LogonType").unwrap_or(0);
            let type_name = logon_type_name(logon_type);
            data.insert("logon_type".to_owned(), Value::from(logon_type));
            insert_str(&mut data, "logon_type_name", &type_name);
            insert_str(&mut data, "logon_id", record.field("TargetLogonId"));
            Some(WinProjection {
                event_type: "logoff",
                message: format!(
                    "User {} logged off ({})",
                    full_username(&domain, &username),
                    type_name,
                ),
                data,
            })
        },
    },
    // 4648: 명시적 자격 증명 사용
    ChannelRule {
        event_ids: &[4648],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4648));
            insert_str(&mut data, "subject_username", record.field("SubjectUserName"));
            insert_str(&mut data, "subject_domain", record.field("SubjectDomainName"));
            insert_str(&mut data, "target_username", record.field("TargetUserName"));
            insert_str(&mut data, "target_server", record.field("TargetServerName"));
            insert_str(&mut data, "process", record.field("ProcessName"));
            Some(WinProjection {
                event_type: "explicit_credentials",
                message: format!(
                    "User {} used explicit credentials for {}",
                    full_username(
                        record.field("SubjectDomainName"),
                        record.field("SubjectUserName"),
                    ),
                    record.field("TargetUserName"),
                ),
                data,
            })
        },
    },
    // 4740: 계정 잠금
    ChannelRule {
        event_ids: &[4740],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Warning),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4740));
            let (username, domain) = insert_user_fields(&mut data, record);
            insert_str(&mut data, "caller_computer", record.field("SubjectUserName"));
            Some(WinProjection {
                event_type: "account_locked",
                message: format!(
                    "Account {} was locked out",
                    full_username(&domain, &username),
                ),
                data,
            })
        },
    },
    // 4767: 계정 잠금 해제
    ChannelRule {
        event_ids: &[4767],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4767));
            let (username, domain) = insert_user_fields(&mut data, record);
            insert_str(&mut data, "unlocked_by", record.field("SubjectUserName"));
            Some(WinProjection {
                event_type: "account_unlocked",
                message: format!(
                    "Account {} was unlocked by {}",
                    full_username(&domain, &username),
                    record.field("SubjectUserName"),
                ),
                data,
            })
        },
    },
];

// --- 권한 상승 (privilege_escalation / Security) ---

fn insert_subject_fields(data: &mut Map<String, Value>, record: &WinEventRecord) -> String {
    let subject = full_username(
        record.field("SubjectDomainName"),
        record.field("SubjectUserName"),
    );
    insert_str(data, "subject_username", record.field("SubjectUserName"));
    insert_str(data, "subject_domain", record.field("SubjectDomainName"));
    insert_str(data, "subject_full_username", &subject);
    subject
}

static PRIVILEGE_RULES: &[ChannelRule] = &[
    // 계정 생성/활성화/비활성화/삭제/변경
    ChannelRule {
        event_ids: &[4720, 4722, 4725, 4726, 4738],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| {
            // 계정 생성과 삭제는 더 높은 심각도
            if matches!(record.event_id, 4720 | 4726) {
                Severity::Warning
            } else {
                Severity::Info
            }
        }),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let target = full_username(
                record.field("TargetDomainName"),
                record.field("TargetUserName"),
            );
            insert_str(&mut data, "target_username", record.field("TargetUserName"));
            insert_str(&mut data, "target_domain", record.field("TargetDomainName"));
            insert_str(&mut data, "target_full_username", &target);
            let subject = insert_subject_fields(&mut data, record);
            insert_str(&mut data, "sam_account_name", record.field("SamAccountName"));

            let (event_type, verb) = match record.event_id {
                4720 => ("user_created", "created"),
                4722 => ("user_enabled", "enabled"),
                4725 => ("user_disabled", "disabled"),
                4726 => ("user_deleted", "deleted"),
                _ => ("user_modified", "modified"),
            };
            Some(WinProjection {
                event_type,
                message: format!("User account {target} was {verb} by {subject}"),
                data,
            })
        },
    },
    // 비밀번호 변경/재설정
    ChannelRule {
        event_ids: &[4723, 4724],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let target = full_username(
                record.field("TargetDomainName"),
                record.field("TargetUserName"),
            );
            insert_str(&mut data, "target_username", record.field("TargetUserName"));
            insert_str(&mut data, "target_domain", record.field("TargetDomainName"));
            insert_str(&mut data, "target_full_username", &target);
            let subject = insert_subject_fields(&mut data, record);

            let (event_type, message) = if record.event_id == 4723 {
                (
                    "password_changed",
                    format!("User {target} changed their password"),
                )
            } else {
                (
                    "password_reset",
                    format!("Password for {target} was reset by {subject}"),
                )
            };
            Some(WinProjection {
                event_type,
                message,
                data,
            })
        },
    },
    // 그룹 멤버십 변경
    ChannelRule {
        event_ids: &[4728, 4729, 4732, 4733, 4756, 4757],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| {
            // admin 그룹에 추가되는 경우 경고
            let added = matches!(record.event_id, 4728 | 4732 | 4756);
            let group = record.field("TargetUserName").to_lowercase();
            if added && group.contains("admin") {
                Severity::Warning
            } else {
                Severity::Info
            }
        }),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let member = if record.field("MemberName").is_empty() {
                record.field("TargetUserName").to_owned()
            } else {
                record.field("MemberName").to_owned()
            };
            let group_name = record.field("TargetUserName").to_owned();
            let group_domain = record.field("TargetDomainName").to_owned();
            insert_str(&mut data, "member_name", &member);
            insert_str(&mut data, "member_sid", record.field("MemberSid"));
            insert_str(&mut data, "group_name", &group_name);
            insert_str(&mut data, "group_domain", &group_domain);
            data.insert(
                "group_full_name".to_owned(),
                Value::String(full_username(&group_domain, &group_name)),
            );
            let subject = insert_subject_fields(&mut data, record);

            let added = matches!(record.event_id, 4728 | 4732 | 4756);
            let action = if added { "added to" } else { "removed from" };
            insert_str(&mut data, "action", action);
            let (event_type, group_type) = match record.event_id {
                4728 => ("user_added_to_global_group", "global security group"),
                4729 => ("user_removed_from_global_group", "global security group"),
                4732 => ("user_added_to_local_group", "local security group"),
                4733 => ("user_removed_from_local_group", "local security group"),
                4756 => ("user_added_to_universal_group", "universal security group"),
                _ => ("user_removed_from_universal_group", "universal security group"),
            };
            insert_str(&mut data, "group_type", group_type);

            Some(WinProjection {
                event_type,
                message: format!(
                    "User {member} was {action} {group_type} {} by {subject}",
                    full_username(&group_domain, &group_name),
                ),
                data,
            })
        },
    },
    // 특수 권한 할당
    ChannelRule {
        event_ids: &[4672],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: true,
        project: |record| {
            let privileges = record.field("PrivilegeList").trim();
            // 권한 목록이 비어있으면 의미가 없으므로 드롭
            if privileges.is_empty() || privileges == "-" {
                return None;
            }
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4672));
            let username = record.field("SubjectUserName").to_owned();
            let domain = record.field("SubjectDomainName").to_owned();
            insert_str(&mut data, "username", &username);
            insert_str(&mut data, "domain", &domain);
            data.insert(
                "full_username".to_owned(),
                Value::String(full_username(&domain, &username)),
            );
            insert_str(&mut data, "privileges", privileges);
            Some(WinProjection {
                event_type: "special_privileges_assigned",
                message: format!(
                    "Special privileges assigned to {}: {privileges}",
                    full_username(&domain, &username),
                ),
                data,
            })
        },
    },
];

// --- 원격 접속 (remote_access / Security + TerminalServices) ---

static REMOTE_RULES: &[ChannelRule] = &[
    // 4624 with LogonType 10: RDP 로그인
    ChannelRule {
        event_ids: &[4624],
        guard: Some(|record| record.field_u32("LogonType") == Some(10)),
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: true,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(4624));
            let (username, domain) = insert_user_fields(&mut data, record);
            insert_str(&mut data, "source_ip", record.field("IpAddress"));
            insert_str(&mut data, "source_workstation", record.field("WorkstationName"));
            data.insert("logon_type".to_owned(), Value::from(10));
            insert_str(&mut data, "logon_type_name", "RemoteInteractive");
            insert_str(&mut data, "logon_id", record.field("TargetLogonId"));
            insert_str(&mut data, "connection_type", "rdp");

            let mut message = format!("RDP login by {}", full_username(&domain, &username));
            let source_ip = record.field("IpAddress");
            if !source_ip.is_empty() && source_ip != "-" && source_ip != "127.0.0.1" && source_ip != "::1" {
                message.push_str(&format!(" from {source_ip}"));
            }
            let workstation = record.field("WorkstationName");
            if !workstation.is_empty() {
                message.push_str(&format!(" (workstation: {workstation})"));
            }
            Some(WinProjection {
                event_type: "rdp_login",
                message,
                data,
            })
        },
    },
    // 4778/4779: RDP 세션 재연결/연결 해제
    ChannelRule {
        event_ids: &[4778, 4779],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let username = record.field("AccountName").to_owned();
            let domain = record.field("AccountDomain").to_owned();
            insert_str(&mut data, "username", &username);
            insert_str(&mut data, "domain", &domain);
            data.insert(
                "full_username".to_owned(),
                Value::String(full_username(&domain, &username)),
            );
            insert_str(&mut data, "client_name", record.field("ClientName"));
            insert_str(&mut data, "client_address", record.field("ClientAddress"));
            insert_str(&mut data, "session_name", record.field("SessionName"));
            insert_str(&mut data, "connection_type", "rdp");

            let (event_type, action) = if record.event_id == 4778 {
                ("rdp_session_reconnect", "reconnected to")
            } else {
                ("rdp_session_disconnect", "disconnected from")
            };
            let mut message = format!(
                "User {} {action} RDP session",
                full_username(&domain, &username),
            );
            let client_address = record.field("ClientAddress");
            if !client_address.is_empty() {
                message.push_str(&format!(" from {client_address}"));
            }
            let client_name = record.field("ClientName");
            if !client_name.is_empty() {
                message.push_str(&format!(" (client: {client_name})"));
            }
            Some(WinProjection {
                event_type,
                message,
                data,
            })
        },
    },
    // Terminal Services 세션 이벤트 (21-40)
    ChannelRule {
        event_ids: &[21, 22, 23, 24, 25, 39, 40],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: true,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let user = if record.field("User").is_empty() {
                "unknown".to_owned()
            } else {
                record.field("User").to_owned()
            };
            let session_id = if record.field("SessionID").is_empty() {
                record.field("Session").to_owned()
            } else {
                record.field("SessionID").to_owned()
            };
            insert_str(&mut data, "user", &user);
            insert_str(&mut data, "session_id", &session_id);
            insert_str(&mut data, "source_ip", record.field("Address"));
            insert_str(&mut data, "connection_type", "rdp");
            insert_str(&mut data, "log_name", &record.channel);

            let (event_type, mut message) = match record.event_id {
                21 => (
                    "rdp_session_logon",
                    format!("User {user} successfully logged on to RDP session {session_id}"),
                ),
                22 => (
                    "rdp_shell_start",
                    format!("RDP shell started for user {user} in session {session_id}"),
                ),
                23 => (
                    "rdp_session_logoff",
                    format!("User {user} logged off from RDP session {session_id}"),
                ),
                24 => (
                    "rdp_session_disconnected",
                    format!("User {user} disconnected from RDP session {session_id}"),
                ),
                25 => (
                    "rdp_session_reconnected",
                    format!("User {user} reconnected to RDP session {session_id}"),
                ),
                39 => (
                    "rdp_session_disconnect_user",
                    format!("User {user} disconnected from RDP session (user-initiated)"),
                ),
                _ => (
                    "rdp_session_disconnect_network",
                    format!("RDP session {session_id} disconnected (network)"),
                ),
            };
            let source_ip = record.field("Address");
            if !source_ip.is_empty() {
                message.push_str(&format!(" from {source_ip}"));
            }
            Some(WinProjection {
                event_type,
                message,
                data,
            })
        },
    },
];

// --- 시스템 (system / System) ---

static SYSTEM_RULES: &[ChannelRule] = &[
    // 1001: BugCheck (BSOD)
    ChannelRule {
        event_ids: &[1001],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Critical),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(1001));
            let bugcheck_code = record
                .message
                .split_whitespace()
                .find(|token| token.starts_with("0x"))
                .unwrap_or("unknown")
                .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != 'x')
                .to_owned();
            insert_str(&mut data, "bugcheck_code", &bugcheck_code);
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            Some(WinProjection {
                event_type: "bugcheck",
                message: format!("System experienced Blue Screen (BugCheck: {bugcheck_code})"),
                data,
            })
        },
    },
    // 41: Kernel-Power 비정상 종료
    ChannelRule {
        event_ids: &[41],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Error),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(41));
            insert_str(&mut data, "shutdown_type", "unexpected");
            insert_str(&mut data, "provider", "Kernel-Power");
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            Some(WinProjection {
                event_type: "unexpected_shutdown",
                message: "System rebooted without cleanly shutting down (Kernel-Power)".to_owned(),
                data,
            })
        },
    },
    // 6008: 비정상 종료 후 이벤트 로그 재시작
    ChannelRule {
        event_ids: &[6008],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Warning),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(6008));
            insert_str(&mut data, "shutdown_type", "unexpected");
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            Some(WinProjection {
                event_type: "unexpected_shutdown",
                message: "Previous system shutdown was unexpected".to_owned(),
                data,
            })
        },
    },
    // 1074: 정상 종료/재부팅 요청
    ChannelRule {
        event_ids: &[1074],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(1074));
            insert_str(&mut data, "shutdown_type", "initiated");
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            let first_line = record.message.lines().next().unwrap_or("");
            Some(WinProjection {
                event_type: "system_shutdown",
                message: format!("System shutdown initiated: {}", truncate(first_line, 100)),
                data,
            })
        },
    },
    // 6005/6006: 이벤트 로그 서비스 시작/중지
    ChannelRule {
        event_ids: &[6005, 6006],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let (event_type, message) = if record.event_id == 6005 {
                ("event_log_started", "Event Log service was started")
            } else {
                ("event_log_stopped", "Event Log service was stopped")
            };
            insert_str(&mut data, "service_name", "EventLog");
            Some(WinProjection {
                event_type,
                message: message.to_owned(),
                data,
            })
        },
    },
    // 6009: 부팅 시 OS 버전 기록
    ChannelRule {
        event_ids: &[6009],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Info),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(6009));
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            let first_line = record.message.lines().next().unwrap_or("");
            Some(WinProjection {
                event_type: "os_version_at_boot",
                message: format!("System booted: {}", truncate(first_line, 100)),
                data,
            })
        },
    },
];

// --- 서비스 (service / System + Application) ---

/// 메시지 본문에서 서비스 이름을 추출합니다.
///
/// 일반적인 패턴: "The <ServiceName> service ..."
fn extract_service_name(message: &str) -> String {
    if let Some(rest) = message.strip_prefix("The ") {
        if let Some(idx) = rest.find(" service") {
            let name = rest[..idx].trim();
            if !name.is_empty() {
                return name.to_owned();
            }
        }
    }
    // 폴백: "service <name>" 패턴
    if let Some(idx) = message.to_lowercase().find("service ") {
        if let Some(name) = message[idx + "service ".len()..].split_whitespace().next() {
            return name.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_owned();
        }
    }
    "unknown".to_owned()
}

/// 메시지 본문에서 에러 코드를 추출합니다.
fn extract_error_code(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let idx = lower.find("error")?;
    message[idx..]
        .split_whitespace()
        .skip(1)
        .map(|token| token.trim_matches(|c: char| c == '.' || c == ','))
        .find(|token| {
            !token.is_empty()
                && (token.starts_with("0x") || token.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|token| token.to_owned())
}

static SERVICE_RULES: &[ChannelRule] = &[
    // Service Control Manager 이벤트
    ChannelRule {
        event_ids: &[7000, 7001, 7009, 7022, 7023, 7024, 7026, 7031, 7032, 7034],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| {
            if matches!(record.event_id, 7022 | 7032) {
                Severity::Warning
            } else {
                Severity::Error
            }
        }),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let service_name = extract_service_name(&record.message);
            insert_str(&mut data, "service_name", &service_name);
            let error_code = extract_error_code(&record.message);
            data.insert(
                "error_code".to_owned(),
                error_code.clone().map(Value::String).unwrap_or(Value::Null),
            );
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            insert_str(&mut data, "provider", "Service Control Manager");

            let event_type = match record.event_id {
                7000 => "service_start_failed",
                7001 => "service_start_failed_dependency",
                7009 => "service_timeout",
                7022 => "service_hung",
                7023 | 7024 => "service_terminated_with_error",
                7026 => "service_boot_failed",
                7031 | 7034 => "service_terminated_unexpected",
                _ => "service_recovery_action",
            };
            let mut message = format!(
                "Service '{service_name}' {}",
                event_type.replace('_', " "),
            );
            if let Some(code) = error_code {
                message.push_str(&format!(" (Error: {code})"));
            }
            Some(WinProjection {
                event_type,
                message,
                data,
            })
        },
    },
    // 애플리케이션 에러/폴트/행 (Application 로그)
    ChannelRule {
        event_ids: &[1000, 1001, 1002],
        guard: None,
        severity: WinSeverityRule::Fixed(Severity::Error),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            // "Faulting application name: app.exe, version: ..." 형태에서 추출
            let app_name = record
                .message
                .lines()
                .find_map(|line| {
                    let lower = line.to_lowercase();
                    let idx = lower.find("application name:")?;
                    line[idx + "application name:".len()..]
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .find(|token| !token.is_empty())
                        .map(|token| token.to_owned())
                })
                .unwrap_or_else(|| "unknown".to_owned());
            insert_str(&mut data, "application_name", &app_name);
            let exception_code = record
                .message
                .split_whitespace()
                .skip_while(|token| !token.to_lowercase().contains("exception"))
                .find(|token| token.starts_with("0x"))
                .map(|token| token.trim_matches(|c: char| c == '.' || c == ',').to_owned());
            data.insert(
                "exception_code".to_owned(),
                exception_code.clone().map(Value::String).unwrap_or(Value::Null),
            );
            insert_str(&mut data, "full_message", truncate(&record.message, 300));

            let event_type = match record.event_id {
                1000 => "application_crash",
                1001 => "application_fault",
                _ => "application_hang",
            };
            let mut message = format!(
                "Application '{app_name}' {}",
                event_type.replace('_', " "),
            );
            if let Some(code) = exception_code {
                message.push_str(&format!(" (Exception: {code})"));
            }
            Some(WinProjection {
                event_type,
                message,
                data,
            })
        },
    },
];

// --- 소프트웨어 (software / Application + System) ---

static SOFTWARE_RULES: &[ChannelRule] = &[
    // MSI 인스톨러 이벤트
    ChannelRule {
        event_ids: &[1033, 1034, 11707, 11708, 11724],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| {
            if record.event_id == 11708 {
                Severity::Error
            } else {
                Severity::Info
            }
        }),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            // "Product: <name> -- Installation completed successfully." 또는
            // "Windows Installer installed the product. Product Name: <name>."
            let product = record
                .message
                .split_once("Product Name:")
                .or_else(|| record.message.split_once("Product:"))
                .map(|(_, rest)| {
                    rest.split(['.', '-'])
                        .next()
                        .unwrap_or("")
                        .trim()
                        .to_owned()
                })
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "unknown".to_owned());
            insert_str(&mut data, "software_name", &product);
            let version = record
                .message
                .split_once("Version:")
                .map(|(_, rest)| rest.split(['.', ',']).take(3).collect::<Vec<_>>().join(".").trim().to_owned());
            data.insert(
                "version".to_owned(),
                version.clone().map(Value::String).unwrap_or(Value::Null),
            );
            let (event_type, action) = match record.event_id {
                1033 | 11707 => ("software_installed", "installed"),
                1034 | 11724 => ("software_removed", "removed"),
                _ => ("software_install_failed", "install_failed"),
            };
            insert_str(&mut data, "action", action);
            insert_str(&mut data, "installer_type", "msi");
            insert_str(&mut data, "full_message", truncate(&record.message, 300));

            let mut message = format!("Software '{product}' was {action}");
            if let Some(v) = version {
                message.push_str(&format!(" (version {v})"));
            }
            Some(WinProjection {
                event_type,
                message,
                data,
            })
        },
    },
    // Windows Update 이벤트
    ChannelRule {
        event_ids: &[19, 20, 43, 44],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| {
            if record.event_id == 20 {
                Severity::Error
            } else {
                Severity::Info
            }
        }),
        suppress_noise: false,
        project: |record| {
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            let kb_number = record
                .message
                .split_whitespace()
                .find(|token| token.to_uppercase().starts_with("KB") && token.len() > 2)
                .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_owned());
            let update_title = record
                .message
                .split_once("following update:")
                .map(|(_, rest)| rest.trim().trim_end_matches('.').to_owned())
                .or_else(|| kb_number.clone())
                .unwrap_or_else(|| "Windows Update".to_owned());
            insert_str(&mut data, "update_title", &update_title);
            data.insert(
                "kb_number".to_owned(),
                kb_number.map(Value::String).unwrap_or(Value::Null),
            );
            insert_str(&mut data, "update_type", "windows_update");
            insert_str(&mut data, "full_message", truncate(&record.message, 300));

            let (event_type, verb) = match record.event_id {
                19 => ("windows_update_installed", "installed"),
                20 => ("windows_update_failed", "failed"),
                43 => ("windows_update_started", "download started"),
                _ => ("windows_update_completed", "download completed"),
            };
            Some(WinProjection {
                event_type,
                message: format!("Windows Update {verb}: {update_title}"),
                data,
            })
        },
    },
    // Setup 채널의 설치/업데이트 단계 이벤트
    ChannelRule {
        event_ids: &[1, 2, 3, 4],
        guard: None,
        severity: WinSeverityRule::ByRecord(|record| match record.level.as_str() {
            "Error" => Severity::Error,
            "Warning" => Severity::Warning,
            _ => Severity::Info,
        }),
        suppress_noise: false,
        project: |record| {
            // 정보성 단계 진행 이벤트(2, 4)는 유용하지 않으므로 건너뜁니다.
            if record.level == "Information" && matches!(record.event_id, 2 | 4) {
                return None;
            }
            let mut data = Map::new();
            data.insert("event_id".to_owned(), Value::from(record.event_id));
            insert_str(&mut data, "level", &record.level);
            insert_str(&mut data, "full_message", truncate(&record.message, 300));
            let first_line = record.message.lines().next().unwrap_or("");
            Some(WinProjection {
                event_type: "system_update",
                message: format!(
                    "System setup/update event (Event {}): {}",
                    record.event_id,
                    truncate(first_line, 100),
                ),
                data,
            })
        },
    },
];

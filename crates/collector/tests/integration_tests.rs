//! 수집 경로 통합 테스트 — 파일 리더와 규칙 테이블을 함께 검증합니다.

use std::io::Write;
use std::time::Duration;

use logward_collector::reader::{FileTailReader, ReadWindow};
use logward_collector::rules::{linux, EvalContext};
use logward_core::event::{Event, SCHEMA_VERSION};
use logward_core::host::HostIdentity;
use logward_core::types::{Category, Platform, Severity};

fn ctx() -> EvalContext {
    EvalContext {
        identity: HostIdentity {
            hostname: "web-01".to_owned(),
            ipv4: "192.168.0.100".to_owned(),
        },
        platform: Platform::Linux,
    }
}

fn window() -> ReadWindow {
    ReadWindow::new(1000, Duration::from_secs(24 * 3600))
}

#[tokio::test]
async fn auth_log_file_to_canonical_events() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "Nov 16 14:30:25 host sshd[1]: Accepted publickey for alice from 10.0.0.5 port 22 ssh2"
    )
    .unwrap();
    writeln!(file, "Nov 16 14:30:40 host CRON[9]: (root) CMD (run-parts)").unwrap();
    writeln!(
        file,
        "Nov 16 14:31:00 host sshd[2]: Failed password for invalid user admin from 10.0.0.9 port 22 ssh2"
    )
    .unwrap();

    let reader = FileTailReader::new(file.path(), Platform::Linux).with_source_id("auth.log");
    let outcome = reader.read(&window()).await;
    assert!(outcome.error.is_none());
    assert_eq!(outcome.records.len(), 3);

    let table = linux::auth_table().unwrap();
    let context = ctx();
    let events: Vec<Event> = outcome
        .records
        .iter()
        .filter_map(|record| table.evaluate(record, &context))
        .collect();

    // CRON 라인은 어떤 규칙에도 매칭되지 않고 조용히 드롭됩니다.
    assert_eq!(events.len(), 2);

    let success = &events[0];
    assert_eq!(success.schema_version, SCHEMA_VERSION);
    assert_eq!(success.category, Category::Authentication);
    assert_eq!(success.event_type, "ssh_login_success");
    assert_eq!(success.severity, Severity::Info);
    assert_eq!(success.source, "auth.log");
    assert_eq!(success.host, "web-01");
    assert_eq!(success.data["username"], "alice");
    assert_eq!(success.data["remote_ip"], "10.0.0.5");
    assert_eq!(success.data["auth_method"], "publickey");

    let failure = &events[1];
    assert_eq!(failure.event_type, "ssh_login_failed");
    assert_eq!(failure.data["invalid_user"], true);
    assert_eq!(failure.data["reason"], "Invalid user");
}

#[tokio::test]
async fn canonical_event_round_trips_through_wire_format() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "Nov 16 14:40:00 host sudo: alice : TTY=pts/0 ; PWD=/home/alice ; USER=root ; COMMAND=/usr/bin/id"
    )
    .unwrap();

    let reader = FileTailReader::new(file.path(), Platform::Linux).with_source_id("auth.log");
    let outcome = reader.read(&window()).await;
    let table = linux::privilege_table().unwrap();
    let context = ctx();
    let event = outcome
        .records
        .iter()
        .find_map(|record| table.evaluate(record, &context))
        .unwrap();

    let json = serde_json::to_string(&event).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
    assert_eq!(back.category, Category::PrivilegeEscalation);
    assert_eq!(back.data["command"], "/usr/bin/id");
}

//! 수집 오케스트레이션 — 카테고리별 수집 실행과 병합/상한 적용
//!
//! [`Orchestrator`]는 활성화된 각 카테고리에 대해 플랫폼에 맞는
//! 리더+규칙 테이블 조합을 실행하고, 결과를 카테고리 내 순서를
//! 유지한 채 병합한 뒤 사이클 상한(`max_events_per_batch`)을
//! 적용합니다.
//!
//! # 장애 격리
//! 한 카테고리의 수집 실패(리더 에러, 서브프로세스 크래시)는 해당
//! 카테고리의 실패 카운터에만 기록되며, 같은 사이클의 다른 카테고리
//! 수집을 줄이거나 막지 않습니다.
//!
//! # 상태 전이
//! ```text
//! Idle -> Collecting(category_i)... -> Aggregated -> (Truncated)? -> Done
//! ```
//!
//! # 백엔드 선택
//! 한 카테고리의 후보 백엔드는 고정 우선순위(로컬 파일 먼저)로
//! 시도되며, 비어있지 않은 접근 가능한 결과를 낸 첫 백엔드가
//! 사용됩니다 (폴백 선택). 예외적으로 system 카테고리는 파일과
//! journal 결과를 중복 제거 없이 병합합니다.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use logward_core::error::ReadError;
use logward_core::event::Event;
use logward_core::host::HostIdentity;
use logward_core::types::{Category, Platform};

use crate::error::CollectorError;
use crate::reader::{
    FileTailReader, JournalReader, ReadWindow, Reader, WinEventReader,
    journal::JournalQuery,
};
use crate::rules::{
    linux, linux_software, windows, ChannelRuleTable, EvalContext, LineRuleTable,
};

/// 인증 관련 journal 내용 필터
const AUTH_JOURNAL_GREP: &str =
    r"(sshd|sudo|su\[|login|authentication|session opened|session closed|Accepted|Failed|COMMAND=)";

/// 인증 로그 파일 후보 (우선순위 순)
const AUTH_LOG_PATHS: &[&str] = &["/var/log/auth.log", "/var/log/secure"];

/// 커널/시스템 로그 파일 후보 (우선순위 순)
const SYSTEM_LOG_PATHS: &[&str] = &["/var/log/kern.log", "/var/log/messages", "/var/log/syslog"];

/// 일반 syslog 파일 후보 (서비스 카테고리 폴백)
const SYSLOG_PATHS: &[&str] = &["/var/log/syslog", "/var/log/messages"];

/// 규칙 테이블 참조 — 플랜이 소유하는 공유 핸들
#[derive(Clone)]
enum TableRef {
    Line(Arc<LineRuleTable>),
    Channel(Arc<ChannelRuleTable>),
}

impl TableRef {
    fn evaluate(&self, record: &crate::reader::RawRecord, ctx: &EvalContext) -> Option<Event> {
        match self {
            Self::Line(table) => table.evaluate(record, ctx),
            Self::Channel(table) => table.evaluate(record, ctx),
        }
    }
}

/// 리더와 규칙 테이블의 결합
struct SourceBinding {
    reader: Reader,
    table: TableRef,
}

/// 복수 백엔드 선택 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectStrategy {
    /// 비어있지 않은 결과를 낸 첫 백엔드만 사용
    Fallback,
    /// 모든 백엔드 결과를 순서대로 병합 (중복 제거 없음)
    Merge,
}

/// 한 카테고리의 수집 계획
struct CategoryPlan {
    bindings: Vec<SourceBinding>,
    strategy: SelectStrategy,
}

impl CategoryPlan {
    fn empty() -> Self {
        Self {
            bindings: Vec::new(),
            strategy: SelectStrategy::Fallback,
        }
    }
}

/// 사이클 실행 상태 (추적용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    /// 수집 대기
    Idle,
    /// 특정 카테고리 수집 중
    Collecting(Category),
    /// 전체 카테고리 병합 완료
    Aggregated,
    /// 상한 초과분 절단됨
    Truncated,
    /// 사이클 완료
    Done,
}

/// 프로세스 수명 동안 단조 증가하는 수집 카운터
///
/// 오케스트레이터가 명시적으로 소유하며, 전역 가변 상태는 없습니다.
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    /// 수집된 이벤트 누계 (절단 전)
    pub events_collected: u64,
    /// 상한 초과로 드롭된 이벤트 누계
    pub events_dropped: u64,
    /// 카테고리별 수집 실패 횟수
    pub category_failures: BTreeMap<Category, u64>,
}

impl CollectorStats {
    fn record_failure(&mut self, category: Category) {
        *self.category_failures.entry(category).or_insert(0) += 1;
    }
}

/// 한 사이클의 수집 결과
#[derive(Debug)]
pub struct CycleCollection {
    /// 병합되고 상한이 적용된 이벤트 (카테고리 내 순서 유지)
    pub events: Vec<Event>,
    /// 카테고리별 수집 이벤트 수 (절단 전)
    pub per_category: Vec<(Category, usize)>,
    /// 이번 사이클에 실패가 기록된 카테고리
    pub failed_categories: Vec<Category>,
    /// 상한 초과로 드롭된 이벤트 수
    pub dropped: usize,
}

impl CycleCollection {
    /// 절단 전 수집 총량을 반환합니다.
    pub fn collected(&self) -> usize {
        self.events.len() + self.dropped
    }
}

/// 규칙 테이블 집합 — 시작 시 한 번 컴파일됩니다.
struct RuleTables {
    linux_auth: Arc<LineRuleTable>,
    linux_privilege: Arc<LineRuleTable>,
    linux_system: Arc<LineRuleTable>,
    linux_service: Arc<LineRuleTable>,
    dpkg: Arc<LineRuleTable>,
    apt_history: Arc<LineRuleTable>,
    yum_dnf: Arc<LineRuleTable>,
    pacman: Arc<LineRuleTable>,
    zypper: Arc<LineRuleTable>,
    win_auth: Arc<ChannelRuleTable>,
    win_privilege: Arc<ChannelRuleTable>,
    win_remote: Arc<ChannelRuleTable>,
    win_system: Arc<ChannelRuleTable>,
    win_service: Arc<ChannelRuleTable>,
    win_software: Arc<ChannelRuleTable>,
}

impl RuleTables {
    fn new() -> Result<Self, CollectorError> {
        Ok(Self {
            linux_auth: Arc::new(linux::auth_table()?),
            linux_privilege: Arc::new(linux::privilege_table()?),
            linux_system: Arc::new(linux::system_table()?),
            linux_service: Arc::new(linux::service_table()?),
            dpkg: Arc::new(linux_software::dpkg_table()?),
            apt_history: Arc::new(linux_software::apt_history_table()?),
            yum_dnf: Arc::new(linux_software::yum_dnf_table()?),
            pacman: Arc::new(linux_software::pacman_table()?),
            zypper: Arc::new(linux_software::zypper_table()?),
            win_auth: Arc::new(windows::auth_table()),
            win_privilege: Arc::new(windows::privilege_table()),
            win_remote: Arc::new(windows::remote_table()),
            win_system: Arc::new(windows::system_table()),
            win_service: Arc::new(windows::service_table()),
            win_software: Arc::new(windows::software_table()),
        })
    }
}

/// 수집 오케스트레이터
///
/// 단일 논리 워커가 카테고리를 순차 수집합니다. 사이클은 겹치지
/// 않으며, 메모리 사용은 한 사이클의 이벤트 집합으로 제한됩니다.
pub struct Orchestrator {
    ctx: EvalContext,
    enabled: Vec<Category>,
    window: ReadWindow,
    max_events_per_batch: usize,
    tables: RuleTables,
    stats: CollectorStats,
    state: CycleState,
}

impl Orchestrator {
    /// 새 오케스트레이터를 생성하고 모든 규칙 테이블을 컴파일합니다.
    pub fn new(
        platform: Platform,
        identity: HostIdentity,
        enabled: Vec<Category>,
        max_records_per_source: usize,
        lookback: Duration,
        max_events_per_batch: usize,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            ctx: EvalContext { identity, platform },
            enabled,
            window: ReadWindow::new(max_records_per_source, lookback),
            max_events_per_batch,
            tables: RuleTables::new()?,
            stats: CollectorStats::default(),
            state: CycleState::Idle,
        })
    }

    /// 누적 수집 통계를 반환합니다.
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// 활성화된 카테고리 목록을 반환합니다.
    pub fn enabled_categories(&self) -> &[Category] {
        &self.enabled
    }

    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &'static str {
        match self.state {
            CycleState::Idle => "idle",
            CycleState::Collecting(_) => "collecting",
            CycleState::Aggregated => "aggregated",
            CycleState::Truncated => "truncated",
            CycleState::Done => "done",
        }
    }

    /// 한 수집 사이클을 실행합니다.
    ///
    /// 활성화된 카테고리를 순서대로 수집하고, 병합 후 상한을
    /// 적용합니다. 어떤 카테고리의 실패도 이 함수를 실패시키지
    /// 않습니다.
    pub async fn collect_cycle(&mut self) -> CycleCollection {
        let plans: Vec<(Category, CategoryPlan)> = self
            .enabled
            .clone()
            .into_iter()
            .map(|category| (category, self.plan_for(category)))
            .collect();
        self.run_cycle_over(plans).await
    }

    /// 주어진 플랜 집합으로 사이클을 실행합니다.
    async fn run_cycle_over(&mut self, plans: Vec<(Category, CategoryPlan)>) -> CycleCollection {
        self.state = CycleState::Idle;
        let mut merged: Vec<Event> = Vec::new();
        let mut per_category = Vec::with_capacity(plans.len());
        let mut failed_categories = Vec::new();

        for (category, plan) in plans {
            self.state = CycleState::Collecting(category);
            tracing::debug!(category = %category, "collecting category");

            let (events, failure) = Self::collect_plan(&self.ctx, &self.window, plan).await;

            if let Some(reason) = failure {
                tracing::warn!(category = %category, reason = %reason, "category collection failed");
                self.stats.record_failure(category);
                failed_categories.push(category);
            }

            tracing::debug!(category = %category, events = events.len(), "category collected");
            per_category.push((category, events.len()));
            merged.extend(events);
        }

        self.state = CycleState::Aggregated;
        self.stats.events_collected += merged.len() as u64;

        let mut dropped = 0;
        if merged.len() > self.max_events_per_batch {
            dropped = merged.len() - self.max_events_per_batch;
            merged.truncate(self.max_events_per_batch);
            self.state = CycleState::Truncated;
            self.stats.events_dropped += dropped as u64;
            tracing::warn!(
                retained = merged.len(),
                dropped,
                "cycle exceeded max_events_per_batch, dropping overflow"
            );
        }

        self.state = CycleState::Done;
        CycleCollection {
            events: merged,
            per_category,
            failed_categories,
            dropped,
        }
    }

    /// 한 카테고리의 플랜을 실행합니다.
    ///
    /// 반환값의 두 번째 요소는 카테고리 실패 사유입니다. 어떤 백엔드도
    /// 레코드를 내지 못했고 하나 이상이 접근 불가였을 때만 Some입니다.
    async fn collect_plan(
        ctx: &EvalContext,
        window: &ReadWindow,
        plan: CategoryPlan,
    ) -> (Vec<Event>, Option<ReadError>) {
        let mut events = Vec::new();
        let mut last_error: Option<ReadError> = None;
        let mut produced_records = false;

        for binding in &plan.bindings {
            let outcome = binding.reader.read(window).await;

            if let Some(reason) = outcome.error {
                tracing::debug!(
                    source = binding.reader.source_id(),
                    reason = %reason,
                    "source unavailable"
                );
                last_error = Some(reason);
            }

            if !outcome.records.is_empty() {
                produced_records = true;
                events.extend(
                    outcome
                        .records
                        .iter()
                        .filter_map(|record| binding.table.evaluate(record, ctx)),
                );
                if plan.strategy == SelectStrategy::Fallback {
                    // 폴백 선택: 첫 번째로 레코드를 낸 백엔드만 사용
                    break;
                }
            }
        }

        let failure = if produced_records { None } else { last_error };
        (events, failure)
    }

    /// 카테고리별 수집 계획을 생성합니다.
    fn plan_for(&self, category: Category) -> CategoryPlan {
        match self.ctx.platform {
            Platform::Linux => self.linux_plan(category),
            Platform::Windows => self.windows_plan(category),
        }
    }

    fn linux_plan(&self, category: Category) -> CategoryPlan {
        match category {
            Category::Authentication => CategoryPlan {
                bindings: self.auth_source_bindings(TableRef::Line(self.tables.linux_auth.clone())),
                strategy: SelectStrategy::Fallback,
            },
            Category::PrivilegeEscalation => CategoryPlan {
                bindings: self
                    .auth_source_bindings(TableRef::Line(self.tables.linux_privilege.clone())),
                strategy: SelectStrategy::Fallback,
            },
            // Linux에는 원격 접속 전용 소스가 없습니다 (SSH는 authentication).
            Category::RemoteAccess => CategoryPlan::empty(),
            Category::System => {
                let table = TableRef::Line(self.tables.linux_system.clone());
                let mut bindings = Vec::new();
                // 파일과 journal을 병합합니다. 어느 쪽의 크래시 신호든
                // 독립적으로 가치가 있기 때문입니다.
                if let Some(path) = first_existing(SYSTEM_LOG_PATHS) {
                    bindings.push(SourceBinding {
                        reader: Reader::File(FileTailReader::new(path, Platform::Linux)),
                        table: table.clone(),
                    });
                }
                bindings.push(SourceBinding {
                    reader: Reader::Journal(JournalReader::new(JournalQuery::Kernel)),
                    table,
                });
                CategoryPlan {
                    bindings,
                    strategy: SelectStrategy::Merge,
                }
            }
            Category::Service => {
                let table = TableRef::Line(self.tables.linux_service.clone());
                let mut bindings = vec![SourceBinding {
                    reader: Reader::Journal(JournalReader::new(JournalQuery::ErrorPriority)),
                    table: table.clone(),
                }];
                for path in SYSLOG_PATHS {
                    bindings.push(SourceBinding {
                        reader: Reader::File(FileTailReader::new(*path, Platform::Linux)),
                        table: table.clone(),
                    });
                }
                CategoryPlan {
                    bindings,
                    strategy: SelectStrategy::Fallback,
                }
            }
            Category::Software => self.software_plan(),
        }
    }

    /// 인증 계열 소스 바인딩: 로그 파일 후보 -> journal 폴백
    fn auth_source_bindings(&self, table: TableRef) -> Vec<SourceBinding> {
        let mut bindings: Vec<SourceBinding> = AUTH_LOG_PATHS
            .iter()
            .map(|path| SourceBinding {
                reader: Reader::File(FileTailReader::new(*path, Platform::Linux)),
                table: table.clone(),
            })
            .collect();
        bindings.push(SourceBinding {
            reader: Reader::Journal(JournalReader::new(JournalQuery::Grep(
                AUTH_JOURNAL_GREP.to_owned(),
            ))),
            table,
        });
        bindings
    }

    /// 감지된 패키지 매니저의 로그 파일들로 소프트웨어 플랜을 만듭니다.
    fn software_plan(&self) -> CategoryPlan {
        let mut bindings = Vec::new();

        // 패키지 매니저 감지: 명령 존재 여부로 판단
        if Path::new("/usr/bin/apt").exists() || Path::new("/usr/bin/dpkg").exists() {
            bindings.push(SourceBinding {
                reader: Reader::File(
                    FileTailReader::new("/var/log/apt/history.log", Platform::Linux)
                        .with_source_id("apt"),
                ),
                table: TableRef::Line(self.tables.apt_history.clone()),
            });
            bindings.push(SourceBinding {
                reader: Reader::File(
                    FileTailReader::new("/var/log/dpkg.log", Platform::Linux)
                        .with_source_id("dpkg"),
                ),
                table: TableRef::Line(self.tables.dpkg.clone()),
            });
        } else if Path::new("/usr/bin/dnf").exists() {
            for path in ["/var/log/dnf.log", "/var/log/dnf.rpm.log"] {
                bindings.push(SourceBinding {
                    reader: Reader::File(
                        FileTailReader::new(path, Platform::Linux).with_source_id("yum/dnf"),
                    ),
                    table: TableRef::Line(self.tables.yum_dnf.clone()),
                });
            }
        } else if Path::new("/usr/bin/yum").exists() {
            bindings.push(SourceBinding {
                reader: Reader::File(
                    FileTailReader::new("/var/log/yum.log", Platform::Linux)
                        .with_source_id("yum/dnf"),
                ),
                table: TableRef::Line(self.tables.yum_dnf.clone()),
            });
        } else if Path::new("/usr/bin/pacman").exists() {
            bindings.push(SourceBinding {
                reader: Reader::File(
                    FileTailReader::new("/var/log/pacman.log", Platform::Linux)
                        .with_source_id("pacman"),
                ),
                table: TableRef::Line(self.tables.pacman.clone()),
            });
        } else if Path::new("/usr/bin/zypper").exists() {
            bindings.push(SourceBinding {
                reader: Reader::File(
                    FileTailReader::new("/var/log/zypp/history", Platform::Linux)
                        .with_source_id("zypper"),
                ),
                table: TableRef::Line(self.tables.zypper.clone()),
            });
        } else {
            tracing::debug!("no known package manager detected");
        }

        CategoryPlan {
            bindings,
            strategy: SelectStrategy::Merge,
        }
    }

    fn windows_plan(&self, category: Category) -> CategoryPlan {
        match category {
            Category::Authentication => CategoryPlan {
                bindings: vec![SourceBinding {
                    reader: Reader::WinLog(WinEventReader::new(
                        "Security",
                        windows::AUTH_EVENT_IDS,
                    )),
                    table: TableRef::Channel(self.tables.win_auth.clone()),
                }],
                strategy: SelectStrategy::Fallback,
            },
            Category::PrivilegeEscalation => CategoryPlan {
                bindings: vec![SourceBinding {
                    reader: Reader::WinLog(WinEventReader::new(
                        "Security",
                        windows::PRIVILEGE_EVENT_IDS,
                    )),
                    table: TableRef::Channel(self.tables.win_privilege.clone()),
                }],
                strategy: SelectStrategy::Fallback,
            },
            Category::RemoteAccess => {
                let table = TableRef::Channel(self.tables.win_remote.clone());
                CategoryPlan {
                    bindings: vec![
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                "Security",
                                windows::REMOTE_SECURITY_IDS,
                            )),
                            table: table.clone(),
                        },
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                windows::TS_CHANNEL,
                                windows::REMOTE_TS_IDS,
                            )),
                            table,
                        },
                    ],
                    strategy: SelectStrategy::Merge,
                }
            }
            Category::System => CategoryPlan {
                bindings: vec![SourceBinding {
                    reader: Reader::WinLog(WinEventReader::new(
                        "System",
                        windows::SYSTEM_EVENT_IDS,
                    )),
                    table: TableRef::Channel(self.tables.win_system.clone()),
                }],
                strategy: SelectStrategy::Fallback,
            },
            Category::Service => {
                let table = TableRef::Channel(self.tables.win_service.clone());
                CategoryPlan {
                    bindings: vec![
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                "System",
                                windows::SERVICE_SCM_IDS,
                            )),
                            table: table.clone(),
                        },
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                "Application",
                                windows::SERVICE_APP_IDS,
                            )),
                            table,
                        },
                    ],
                    strategy: SelectStrategy::Merge,
                }
            }
            Category::Software => {
                let table = TableRef::Channel(self.tables.win_software.clone());
                CategoryPlan {
                    bindings: vec![
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                "Application",
                                windows::SOFTWARE_MSI_IDS,
                            )),
                            table: table.clone(),
                        },
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                "System",
                                windows::SOFTWARE_UPDATE_IDS,
                            )),
                            table: table.clone(),
                        },
                        SourceBinding {
                            reader: Reader::WinLog(WinEventReader::new(
                                "Setup",
                                windows::SOFTWARE_SETUP_IDS,
                            )),
                            table,
                        },
                    ],
                    strategy: SelectStrategy::Merge,
                }
            }
        }
    }
}

/// 후보 경로 중 존재하는 첫 경로를 반환합니다.
fn first_existing(paths: &[&'static str]) -> Option<&'static str> {
    paths.iter().copied().find(|path| Path::new(path).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn identity() -> HostIdentity {
        HostIdentity {
            hostname: "web-01".to_owned(),
            ipv4: "192.168.0.100".to_owned(),
        }
    }

    fn orchestrator(enabled: Vec<Category>, cap: usize) -> Orchestrator {
        Orchestrator::new(
            Platform::Linux,
            identity(),
            enabled,
            1000,
            Duration::from_secs(24 * 3600),
            cap,
        )
        .unwrap()
    }

    fn auth_log_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn file_binding(orch: &Orchestrator, path: &Path) -> SourceBinding {
        SourceBinding {
            reader: Reader::File(FileTailReader::new(path, Platform::Linux)),
            table: TableRef::Line(orch.tables.linux_auth.clone()),
        }
    }

    const SSH_OK: &str =
        "Nov 16 14:30:25 host sshd[1]: Accepted publickey for alice from 10.0.0.5 port 22 ssh2";
    const SSH_FAIL: &str =
        "Nov 16 14:31:00 host sshd[2]: Failed password for invalid user admin from 10.0.0.9 port 22 ssh2";

    #[tokio::test]
    async fn fallback_uses_first_non_empty_source() {
        let orch = orchestrator(vec![Category::Authentication], 500);
        let first = auth_log_file(&[SSH_OK]);
        let second = auth_log_file(&[SSH_FAIL]);

        let plan = CategoryPlan {
            bindings: vec![
                file_binding(&orch, first.path()),
                file_binding(&orch, second.path()),
            ],
            strategy: SelectStrategy::Fallback,
        };
        let (events, failure) = Orchestrator::collect_plan(&orch.ctx, &orch.window, plan).await;
        assert!(failure.is_none());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "ssh_login_success");
    }

    #[tokio::test]
    async fn fallback_skips_missing_source() {
        let orch = orchestrator(vec![Category::Authentication], 500);
        let present = auth_log_file(&[SSH_FAIL]);

        let plan = CategoryPlan {
            bindings: vec![
                file_binding(&orch, Path::new("/nonexistent/auth.log")),
                file_binding(&orch, present.path()),
            ],
            strategy: SelectStrategy::Fallback,
        };
        let (events, failure) = Orchestrator::collect_plan(&orch.ctx, &orch.window, plan).await;
        // 두 번째 소스가 레코드를 냈으므로 카테고리 실패가 아닙니다.
        assert!(failure.is_none());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "ssh_login_failed");
    }

    #[tokio::test]
    async fn merge_combines_all_sources_in_order() {
        let orch = orchestrator(vec![Category::Authentication], 500);
        let first = auth_log_file(&[SSH_OK]);
        let second = auth_log_file(&[SSH_FAIL]);

        let plan = CategoryPlan {
            bindings: vec![
                file_binding(&orch, first.path()),
                file_binding(&orch, second.path()),
            ],
            strategy: SelectStrategy::Merge,
        };
        let (events, failure) = Orchestrator::collect_plan(&orch.ctx, &orch.window, plan).await;
        assert!(failure.is_none());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "ssh_login_success");
        assert_eq!(events[1].event_type, "ssh_login_failed");
    }

    #[tokio::test]
    async fn all_sources_missing_reports_failure() {
        let orch = orchestrator(vec![Category::Authentication], 500);
        let plan = CategoryPlan {
            bindings: vec![file_binding(&orch, Path::new("/nonexistent/auth.log"))],
            strategy: SelectStrategy::Fallback,
        };
        let (events, failure) = Orchestrator::collect_plan(&orch.ctx, &orch.window, plan).await;
        assert!(events.is_empty());
        assert_eq!(failure, Some(ReadError::NotFound));
    }

    #[tokio::test]
    async fn category_failure_does_not_reduce_other_categories() {
        let mut orch = orchestrator(
            vec![Category::Authentication, Category::PrivilegeEscalation],
            500,
        );
        let auth_file = auth_log_file(&[SSH_OK, SSH_FAIL]);

        let plans = vec![
            (
                Category::PrivilegeEscalation,
                CategoryPlan {
                    bindings: vec![SourceBinding {
                        reader: Reader::File(FileTailReader::new(
                            "/nonexistent/secure",
                            Platform::Linux,
                        )),
                        table: TableRef::Line(orch.tables.linux_privilege.clone()),
                    }],
                    strategy: SelectStrategy::Fallback,
                },
            ),
            (
                Category::Authentication,
                CategoryPlan {
                    bindings: vec![file_binding(&orch, auth_file.path())],
                    strategy: SelectStrategy::Fallback,
                },
            ),
        ];

        let cycle = orch.run_cycle_over(plans).await;
        assert_eq!(cycle.failed_categories, vec![Category::PrivilegeEscalation]);
        // 실패한 카테고리가 있어도 다른 카테고리는 전량 수집됩니다.
        assert_eq!(cycle.events.len(), 2);
        assert_eq!(
            cycle.per_category,
            vec![
                (Category::PrivilegeEscalation, 0),
                (Category::Authentication, 2),
            ]
        );
        assert_eq!(
            orch.stats().category_failures.get(&Category::PrivilegeEscalation),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn cap_retains_first_n_in_order_and_reports_dropped() {
        let mut orch = orchestrator(vec![Category::Authentication], 3);
        let lines: Vec<String> = (0..5)
            .map(|i| {
                format!(
                    "Nov 16 14:30:0{i} host sshd[{i}]: Accepted publickey for user{i} from 10.0.0.{i} port 22 ssh2"
                )
            })
            .collect();
        let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = auth_log_file(&line_refs);

        let plans = vec![(
            Category::Authentication,
            CategoryPlan {
                bindings: vec![file_binding(&orch, file.path())],
                strategy: SelectStrategy::Fallback,
            },
        )];
        let cycle = orch.run_cycle_over(plans).await;
        assert_eq!(cycle.events.len(), 3);
        assert_eq!(cycle.dropped, 2);
        assert_eq!(cycle.collected(), 5);
        // 원래 순서의 앞 N개가 유지됩니다.
        for (i, event) in cycle.events.iter().enumerate() {
            assert_eq!(event.data["username"], format!("user{i}"));
        }
        assert_eq!(orch.stats().events_dropped, 2);
        assert_eq!(orch.stats().events_collected, 5);
    }

    #[tokio::test]
    async fn empty_plan_yields_no_events_and_no_failure() {
        let mut orch = orchestrator(vec![Category::RemoteAccess], 500);
        let cycle = orch
            .run_cycle_over(vec![(Category::RemoteAccess, CategoryPlan::empty())])
            .await;
        assert!(cycle.events.is_empty());
        assert!(cycle.failed_categories.is_empty());
        assert_eq!(cycle.per_category, vec![(Category::RemoteAccess, 0)]);
    }

    #[test]
    fn linux_remote_access_plan_is_empty() {
        let orch = orchestrator(vec![Category::RemoteAccess], 500);
        let plan = orch.plan_for(Category::RemoteAccess);
        assert!(plan.bindings.is_empty());
    }

    #[test]
    fn windows_plans_query_expected_channels() {
        let orch = Orchestrator::new(
            Platform::Windows,
            identity(),
            Category::ALL.to_vec(),
            1000,
            Duration::from_secs(24 * 3600),
            500,
        )
        .unwrap();

        let auth_plan = orch.plan_for(Category::Authentication);
        assert_eq!(auth_plan.bindings.len(), 1);
        assert_eq!(auth_plan.bindings[0].reader.source_id(), "Security");

        let remote_plan = orch.plan_for(Category::RemoteAccess);
        assert_eq!(remote_plan.bindings.len(), 2);
        assert_eq!(remote_plan.strategy, SelectStrategy::Merge);

        let service_plan = orch.plan_for(Category::Service);
        let sources: Vec<&str> = service_plan
            .bindings
            .iter()
            .map(|binding| binding.reader.source_id())
            .collect();
        assert_eq!(sources, vec!["System", "Application"]);
    }

    #[test]
    fn state_starts_idle() {
        let orch = orchestrator(vec![Category::Authentication], 500);
        assert_eq!(orch.state_name(), "idle");
    }

    #[tokio::test]
    async fn state_is_done_after_cycle() {
        let mut orch = orchestrator(vec![], 500);
        let cycle = orch.run_cycle_over(vec![]).await;
        assert!(cycle.events.is_empty());
        assert_eq!(orch.state_name(), "done");
    }
}

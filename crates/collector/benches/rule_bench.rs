//! 규칙 평가 벤치마크

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use logward_collector::reader::RawRecord;
use logward_collector::rules::{linux, EvalContext};
use logward_core::host::HostIdentity;
use logward_core::types::Platform;

fn ctx() -> EvalContext {
    EvalContext {
        identity: HostIdentity {
            hostname: "bench-host".to_owned(),
            ipv4: "192.168.0.100".to_owned(),
        },
        platform: Platform::Linux,
    }
}

fn bench_auth_rules(c: &mut Criterion) {
    let table = linux::auth_table().unwrap();
    let context = ctx();

    let matching = RawRecord::line(
        "Nov 16 14:30:25 host sshd[1]: Accepted publickey for alice from 10.0.0.5 port 22 ssh2",
        "auth.log",
        Platform::Linux,
    );
    let non_matching = RawRecord::line(
        "Nov 16 14:30:25 host cron[1]: (root) CMD (run-parts /etc/cron.hourly)",
        "auth.log",
        Platform::Linux,
    );

    c.bench_function("auth_rule_match", |b| {
        b.iter(|| table.evaluate(black_box(&matching), &context))
    });

    c.bench_function("auth_rule_miss", |b| {
        b.iter(|| table.evaluate(black_box(&non_matching), &context))
    });
}

criterion_group!(benches, bench_auth_rules);
criterion_main!(benches);

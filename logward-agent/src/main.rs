mod agent;
mod cli;
mod logging;

use anyhow::Result;
use clap::Parser;

use logward_core::config::AgentConfig;

use crate::agent::Agent;
use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 설정 로드/검증 실패는 유일한 치명적 에러이며,
    // 첫 사이클 전에 프로세스를 종료시킵니다.
    let config = AgentConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", cli.config.display(), e))?;

    logging::init_tracing(&config.general)?;

    tracing::info!(config = %cli.config.display(), "logward-agent starting");

    let mut agent = Agent::new(config).map_err(|e| anyhow::anyhow!("failed to build agent: {}", e))?;

    // 종료 시그널 -> 협조적 취소 토큰
    let cancel = agent.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        cancel.cancel();
    });

    if cli.dry_run {
        agent.dry_run().await;
    } else if cli.once {
        agent.run_once(!cli.test).await;
    } else {
        agent.run_daemon().await;
    }

    Ok(())
}

/// SIGINT(ctrl-c) 또는 SIGTERM을 기다립니다.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

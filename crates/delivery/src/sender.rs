//! 이벤트 전송기 — HTTP POST, 배치별 재시도, 연결 프로브
//!
//! 성공 조건은 정확히 HTTP 200입니다. 그 외 상태 코드와 전송 계층
//! 실패는 구분 없이 한 번의 시도 소진으로 취급됩니다 (원 구현의
//! 무차별 재시도 정책을 그대로 유지합니다). 재시도 간 대기는 고정
//! 간격이며, 취소 토큰이 걸리면 대기를 즉시 끝내고 다음 시도로
//! 넘어갑니다 — 진행 중인 네트워크 호출 자체는 중단하지 않습니다.

use std::time::Duration;

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use logward_core::config::ServerConfig;
use logward_core::event::Event;
use logward_core::host::HostIdentity;
use logward_core::types::Platform;

use crate::batch::{split_batches, BatchOutcome, CycleDeliveryReport, DeliveryStats};
use crate::error::DeliveryError;

/// 전송기 설정
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// 이벤트 수신 엔드포인트 전체 URL
    pub endpoint_url: String,
    /// 배치당 최대 이벤트 수
    pub batch_size: usize,
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 배치당 최대 시도 횟수
    pub max_retries: u32,
    /// 재시도 간 고정 대기 시간
    pub retry_delay: Duration,
    /// API 키 (없으면 인증 헤더 생략)
    pub api_key: Option<String>,
}

impl SenderConfig {
    /// 서버 설정과 배치 크기에서 전송기 설정을 만듭니다.
    pub fn from_server(server: &ServerConfig, batch_size: usize) -> Self {
        let api_key = if server.api_key.is_empty() {
            None
        } else {
            Some(server.api_key.clone())
        };
        Self {
            endpoint_url: server.endpoint_url(),
            batch_size,
            timeout: Duration::from_secs(server.timeout_secs),
            max_retries: server.max_retries,
            retry_delay: Duration::from_secs(server.retry_delay_secs),
            api_key,
        }
    }
}

/// 이벤트 전송기
pub struct EventSender {
    client: reqwest::Client,
    config: SenderConfig,
    stats: DeliveryStats,
}

impl EventSender {
    /// 새 전송기를 생성합니다.
    pub fn new(config: SenderConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("logward-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeliveryError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            config,
            stats: DeliveryStats::default(),
        })
    }

    /// 누적 전송 통계를 반환합니다.
    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// 엔드포인트 URL을 반환합니다.
    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }

    /// 이벤트 목록을 배치로 나눠 전송합니다.
    ///
    /// 각 배치는 독립적으로 시도/보고됩니다. 한 배치의 재시도 소진은
    /// 이후 배치의 전송을 취소하거나 막지 않습니다. 통계는 배치 결과당
    /// 한 번만 갱신됩니다.
    pub async fn send_events(
        &mut self,
        events: &[Event],
        cancel: &CancellationToken,
    ) -> CycleDeliveryReport {
        let mut report = CycleDeliveryReport::default();

        if events.is_empty() {
            tracing::debug!("no events to send");
            return report;
        }

        let batches = split_batches(events, self.config.batch_size);
        tracing::info!(
            events = events.len(),
            batches = batches.len(),
            "sending events"
        );

        for (index, batch) in batches.iter().enumerate() {
            let (success, attempts) = self.send_batch_with_retry(batch, cancel).await;

            if success {
                self.stats.total_sent += batch.len() as u64;
                report.sent += batch.len();
            } else {
                self.stats.total_failed += batch.len() as u64;
                report.failed += batch.len();
            }
            report.outcomes.push(BatchOutcome {
                index,
                size: batch.len(),
                attempts,
                success,
            });

            tracing::info!(
                batch = index + 1,
                total = batches.len(),
                size = batch.len(),
                attempts,
                success,
                "batch delivery finished"
            );
        }

        report
    }

    /// 배치 하나를 재시도와 함께 전송합니다.
    ///
    /// 반환값은 (성공 여부, 수행한 시도 횟수)입니다.
    async fn send_batch_with_retry(
        &self,
        batch: &[Event],
        cancel: &CancellationToken,
    ) -> (bool, u32) {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.post_batch(batch).await {
                Ok(()) => return (true, attempts),
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        tracing::error!(
                            attempts,
                            error = %e,
                            "batch delivery failed after all retries"
                        );
                        return (false, attempts);
                    }
                    tracing::warn!(
                        attempt = attempts,
                        error = %e,
                        delay_secs = self.config.retry_delay.as_secs(),
                        "batch delivery attempt failed, retrying"
                    );
                    // 취소가 걸리면 대기만 건너뛰고 즉시 다음 시도로 갑니다.
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(self.config.retry_delay) => {}
                    }
                }
            }
        }
    }

    /// 배치 하나를 POST합니다. 성공은 정확히 HTTP 200입니다.
    async fn post_batch(&self, batch: &[Event]) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.config.endpoint_url)
            .header("Content-Type", "application/json")
            .json(batch);

        if let Some(api_key) = &self.config.api_key {
            request = request
                .header("Authorization", format!("Bearer {api_key}"))
                // 서버 구현에 따라 둘 중 하나만 읽는 경우가 있어 둘 다 보냅니다.
                .header("X-API-Key", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(DeliveryError::Status {
                code: status.as_u16(),
            })
        }
    }

    /// 연결 프로브 — 합성 이벤트 하나로 서버 도달 가능성을 확인합니다.
    ///
    /// 일반 배치 경로 밖에서 수행되며 sent/failed 카운터에 영향을 주지
    /// 않습니다.
    pub async fn test_connection(&self, identity: &HostIdentity, platform: Platform) -> bool {
        let probe = serde_json::json!([{
            "schema_version": logward_core::event::SCHEMA_VERSION,
            "category": "test",
            "event_type": "connection_test",
            "time": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "host": identity.hostname,
            "host_ipv4": identity.ipv4,
            "os": platform.as_str(),
            "source": "agent",
            "severity": "info",
            "message": "Connection test from logward agent",
            "data": {},
        }]);

        let mut request = self
            .client
            .post(&self.config.endpoint_url)
            .header("Content-Type", "application/json")
            .json(&probe);
        if let Some(api_key) = &self.config.api_key {
            request = request
                .header("Authorization", format!("Bearer {api_key}"))
                .header("X-API-Key", api_key);
        }

        match request.send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "connection probe failed");
                false
            }
        }
    }
}

//! Agent loop -- collection cycle scheduling and delivery wiring.
//!
//! One logical worker executes cycles sequentially (collect, then
//! deliver) with no two cycles overlapping. The inter-cycle sleep and
//! inter-retry delays are interruptible through a shared
//! [`CancellationToken`]; in-flight network calls are allowed to
//! complete rather than being aborted.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use logward_collector::orchestrator::{CycleCollection, Orchestrator};
use logward_core::config::AgentConfig;
use logward_core::error::AgentError;
use logward_core::host::HostIdentity;
use logward_core::types::Platform;
use logward_delivery::sender::{EventSender, SenderConfig};

/// The main agent: wires configuration into the orchestrator and the
/// delivery pipeline and schedules collection cycles.
pub struct Agent {
    config: AgentConfig,
    identity: HostIdentity,
    platform: Platform,
    orchestrator: Orchestrator,
    sender: EventSender,
    cancel: CancellationToken,
    cycles: u64,
}

impl Agent {
    /// Build the agent from a validated configuration.
    ///
    /// This is the only fallible construction path; any error here is
    /// fatal and occurs before the first collection cycle.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let identity = HostIdentity::detect();
        let platform = config.agent.resolve_platform();
        tracing::info!(
            hostname = identity.hostname.as_str(),
            host_ipv4 = identity.ipv4.as_str(),
            platform = %platform,
            "detected host identity"
        );

        let orchestrator = Orchestrator::new(
            platform,
            identity.clone(),
            config.collection.categories(),
            config.collection.max_records_per_source,
            Duration::from_secs(config.collection.lookback_hours * 3600),
            config.collection.max_events_per_batch,
        )?;

        let sender = EventSender::new(SenderConfig::from_server(
            &config.server,
            config.collection.max_events_per_batch,
        ))?;

        Ok(Self {
            config,
            identity,
            platform,
            orchestrator,
            sender,
            cancel: CancellationToken::new(),
            cycles: 0,
        })
    }

    /// Cancellation token shared with signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one collect-then-deliver cycle.
    ///
    /// Returns `true` iff every delivery batch in the cycle succeeded
    /// (an empty cycle counts as success). A `false` result never stops
    /// the agent; the next scheduled cycle proceeds normally.
    pub async fn run_once(&mut self, send_events: bool) -> bool {
        self.cycles += 1;
        tracing::info!(cycle = self.cycles, "collection cycle started");

        let collection = self.orchestrator.collect_cycle().await;
        self.log_collection(&collection);

        if collection.events.is_empty() {
            tracing::info!(cycle = self.cycles, "no events collected this cycle");
            return true;
        }

        if !send_events {
            tracing::info!(
                cycle = self.cycles,
                events = collection.events.len(),
                "test mode - not sending events"
            );
            return true;
        }

        let report = self
            .sender
            .send_events(&collection.events, &self.cancel)
            .await;
        let success = report.all_succeeded();

        let stats = self.sender.stats();
        tracing::info!(
            cycle = self.cycles,
            sent = report.sent,
            failed = report.failed,
            batches = report.outcomes.len(),
            cycle_succeeded = success,
            total_sent = stats.total_sent,
            total_failed = stats.total_failed,
            "delivery finished"
        );
        success
    }

    /// Run continuously until the cancellation token fires.
    pub async fn run_daemon(&mut self) {
        let interval = Duration::from_secs(self.config.collection.interval_secs);
        tracing::info!(
            endpoint = self.sender.endpoint_url(),
            interval_secs = interval.as_secs(),
            categories = ?self.config.collection.enabled_categories,
            "agent started in daemon mode"
        );

        // Reachability probe; failure is informational only.
        if self
            .sender
            .test_connection(&self.identity, self.platform)
            .await
        {
            tracing::info!("server is reachable");
        } else {
            tracing::warn!("server not reachable, will retry each cycle");
        }

        while !self.cancel.is_cancelled() {
            self.run_once(true).await;

            if self.cancel.is_cancelled() {
                break;
            }
            tracing::debug!(seconds = interval.as_secs(), "sleeping until next cycle");
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.log_shutdown_summary();
    }

    /// Collect once and report what would be sent, without sending.
    pub async fn dry_run(&mut self) {
        let collection = self.orchestrator.collect_cycle().await;
        self.log_collection(&collection);

        for event in collection.events.iter().take(3) {
            tracing::info!(
                category = %event.category,
                event_type = event.event_type.as_str(),
                severity = %event.severity,
                message = event.message.as_str(),
                "sample event"
            );
        }
        tracing::info!(
            events = collection.events.len(),
            "dry run complete - no events were sent"
        );
    }

    fn log_collection(&self, collection: &CycleCollection) {
        for (category, count) in &collection.per_category {
            tracing::info!(category = %category, events = count, "category collected");
        }
        for category in &collection.failed_categories {
            tracing::warn!(category = %category, "category collection failed this cycle");
        }
        if collection.dropped > 0 {
            tracing::warn!(
                retained = collection.events.len(),
                dropped = collection.dropped,
                "event cap exceeded, overflow dropped"
            );
        }
        tracing::info!(
            collected = collection.collected(),
            retained = collection.events.len(),
            "collection finished"
        );
    }

    fn log_shutdown_summary(&self) {
        let delivery = self.sender.stats();
        let collector = self.orchestrator.stats();
        tracing::info!(
            cycles = self.cycles,
            events_collected = collector.events_collected,
            events_dropped = collector.events_dropped,
            total_sent = delivery.total_sent,
            total_failed = delivery.total_failed,
            "agent shut down"
        );
    }
}

//! Trigger event intake: newline-delimited JSON on standard input.
//!
//! Each line is one trigger event for one tenant:
//!
//! ```json
//! {"tenant_id": "…", "trigger_event": "order.created", "entity_type": "order", "entity_id": "…", "data": {"total": 150}}
//! ```
//!
//! Malformed lines are logged and skipped; intake stops at end of input or
//! on shutdown.

use orderflow_app::automation_engine::AutomationEngine;
use orderflow_app::ports::{
    ActionSink, AutomationRuleRepository, DelayedActionStore, RuleLogRepository,
};
use orderflow_domain::context::TenantContext;
use orderflow_domain::event::EventContext;
use orderflow_domain::id::TenantId;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;

/// One line of input.
#[derive(Debug, Deserialize)]
struct TriggerEnvelope {
    tenant_id: TenantId,
    #[serde(flatten)]
    event: EventContext,
}

/// Counters for one intake session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Feed every line of `reader` to `engine` until end of input or shutdown.
pub async fn run<Rd, R, D, L, S>(
    reader: Rd,
    engine: &AutomationEngine<R, D, L, S>,
    mut shutdown: watch::Receiver<bool>,
) -> IngestReport
where
    Rd: AsyncBufRead + Unpin,
    R: AutomationRuleRepository,
    D: DelayedActionStore,
    L: RuleLogRepository,
    S: ActionSink,
{
    let mut lines = reader.lines();
    let mut report = IngestReport::default();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown.changed() => break,
        };
        match line {
            Ok(Some(line)) => handle_line(engine, &line, &mut report).await,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(%err, "failed to read trigger events");
                break;
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        rejected = report.rejected,
        failed = report.failed,
        "trigger intake finished"
    );
    report
}

async fn handle_line<R, D, L, S>(
    engine: &AutomationEngine<R, D, L, S>,
    line: &str,
    report: &mut IngestReport,
) where
    R: AutomationRuleRepository,
    D: DelayedActionStore,
    L: RuleLogRepository,
    S: ActionSink,
{
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let envelope: TriggerEnvelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(%err, "skipping malformed trigger event");
            report.rejected += 1;
            return;
        }
    };

    let ctx = TenantContext::new(envelope.tenant_id);
    match engine.process(&ctx, &envelope.event).await {
        Ok(outcome) => {
            report.processed += 1;
            tracing::debug!(
                evaluated = outcome.logs.len(),
                fired = outcome.fired().count(),
                "trigger event processed"
            );
        }
        Err(err) => {
            report.failed += 1;
            tracing::warn!(%err, "trigger event processing failed");
        }
    }
}

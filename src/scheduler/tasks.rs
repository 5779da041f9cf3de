use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;

use crate::relay::Relay;
use crate::scheduler::Scheduler;

/// Periodically drop conversations that have been idle past the timeout
pub async fn register_session_sweep(
    scheduler: &Scheduler,
    cron_expr: &str,
    relay: Arc<Relay>,
) -> anyhow::Result<()> {
    scheduler
        .add_cron_job(cron_expr, "session-sweep", move || {
            let relay = relay.clone();
            async move {
                relay.sweep_sessions(Utc::now()).await;
            }
            .boxed()
        })
        .await
}

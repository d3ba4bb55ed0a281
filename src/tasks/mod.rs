//! Background scheduled tasks for the application.
//!
//! The only recurring job is the lifecycle sweep, which advances every
//! subscription whose billing period has elapsed. Call `spawn_all` once
//! during startup to launch it.

use crate::services::SubscriptionService;
use chrono::Utc;

/// Spawn all background tasks.
///
/// Notes
/// - The sweep is idempotent: a subscription that is not due is left
///   untouched, so overlapping runs are harmless.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(subscription_service: SubscriptionService, sweep_interval_secs: u64) {
    {
        let svc = subscription_service.clone();
        tokio::spawn(async move {
            loop {
                match svc.sweep_due(Utc::now()).await {
                    Ok(summary) if summary.advanced > 0 => {
                        log::info!(
                            "Lifecycle sweep advanced {} of {} due subscriptions",
                            summary.advanced,
                            summary.due
                        );
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Lifecycle sweep failed: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(sweep_interval_secs)).await;
            }
        });
    }
}

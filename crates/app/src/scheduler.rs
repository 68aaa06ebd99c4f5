//! Background task that evaluates schedules on a fixed period.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use smartcode_domain::time::now;

use crate::ports::{DeviceRepository, ScheduleRepository};
use crate::services::ScheduleService;

/// Periodically runs [`ScheduleService::check_schedules`] and, optionally,
/// [`ScheduleService::cleanup_expired`].
pub struct ScheduleRunner<C, D> {
    service: Arc<ScheduleService<C, D>>,
    period: Duration,
    cleanup_expired: bool,
}

impl<C, D> ScheduleRunner<C, D>
where
    C: ScheduleRepository,
    D: DeviceRepository,
{
    #[must_use]
    pub fn new(service: Arc<ScheduleService<C, D>>, period: Duration, cleanup_expired: bool) -> Self {
        Self {
            service,
            period,
            cleanup_expired,
        }
    }

    /// Run one evaluation pass. Errors are logged, never returned.
    pub async fn tick(&self) {
        let at = now();
        match self.service.check_schedules(at).await {
            Ok(report) if !report.turned_on.is_empty() || !report.turned_off.is_empty() => {
                tracing::info!(
                    turned_on = report.turned_on.len(),
                    turned_off = report.turned_off.len(),
                    "schedules applied"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::error!(error = %err, "schedule check failed"),
        }
        if self.cleanup_expired {
            if let Err(err) = self.service.cleanup_expired(at).await {
                tracing::error!(error = %err, "schedule cleanup failed");
            }
        }
    }

    /// Tick until `shutdown` becomes `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(period_secs = self.period.as_secs(), "schedule runner started");
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("schedule runner stopped");
    }
}

//! Schedule service — schedule CRUD and power switching by schedule.

use std::collections::BTreeMap;

use smartcode_domain::device::{Device, Power};
use smartcode_domain::error::{NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, ScheduleId};
use smartcode_domain::schedule::{Schedule, SchedulePhase};
use smartcode_domain::time::Timestamp;

use crate::ports::{DeviceRepository, ScheduleRepository};

/// Outcome of [`ScheduleService::check_schedules`].
#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub turned_on: Vec<Device>,
    pub turned_off: Vec<Device>,
    /// Scheduled devices already in the desired state, or with only pending
    /// schedules.
    pub unchanged: usize,
}

/// Outcome of [`ScheduleService::cleanup_expired`].
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub removed: usize,
    pub devices_turned_off: Vec<Device>,
}

/// Power the device should have given the phases of all its schedules.
///
/// Any active schedule keeps the device on. Otherwise an inactive or expired
/// schedule turns it off. Pending schedules alone change nothing.
fn combined_power(phases: &[SchedulePhase]) -> Option<Power> {
    if phases.contains(&SchedulePhase::Active) {
        return Some(Power::On);
    }
    phases.iter().find_map(|phase| phase.desired_power())
}

/// Application service for device schedules.
pub struct ScheduleService<C, D> {
    schedules: C,
    devices: D,
}

impl<C, D> ScheduleService<C, D>
where
    C: ScheduleRepository,
    D: DeviceRepository,
{
    pub fn new(schedules: C, devices: D) -> Self {
        Self { schedules, devices }
    }

    /// Store a schedule for an existing device.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] if invariants fail,
    /// [`SmartHomeError::NotFound`] when the device does not exist, or a
    /// storage error.
    #[tracing::instrument(skip(self, schedule), fields(device_id = %schedule.device_id))]
    pub async fn add(&self, schedule: Schedule) -> Result<Schedule, SmartHomeError> {
        schedule.validate()?;
        if self.devices.get_by_id(schedule.device_id).await?.is_none() {
            return Err(NotFoundError {
                entity: "Device",
                id: schedule.device_id.to_string(),
            }
            .into());
        }
        self.schedules.create(schedule).await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown schedule, or a
    /// storage error.
    pub async fn get(&self, id: ScheduleId) -> Result<Schedule, SmartHomeError> {
        self.schedules.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Schedule",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self) -> Result<Vec<Schedule>, SmartHomeError> {
        self.schedules.get_all().await
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_for_device(
        &self,
        device_id: DeviceId,
    ) -> Result<Vec<Schedule>, SmartHomeError> {
        self.schedules.find_by_device(device_id).await
    }

    /// # Errors
    ///
    /// Returns [`SmartHomeError::NotFound`] for an unknown schedule, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: ScheduleId) -> Result<(), SmartHomeError> {
        self.schedules.delete(id).await
    }

    /// Drop every schedule of a deleted device.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn purge_device(&self, device_id: DeviceId) -> Result<usize, SmartHomeError> {
        self.schedules.delete_by_device(device_id).await
    }

    /// Evaluate every schedule at `now` and switch devices whose power
    /// differs from what their schedules ask for.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn check_schedules(&self, now: Timestamp) -> Result<ScheduleReport, SmartHomeError> {
        let mut phases: BTreeMap<DeviceId, Vec<SchedulePhase>> = BTreeMap::new();
        for schedule in self.schedules.get_all().await? {
            phases
                .entry(schedule.device_id)
                .or_default()
                .push(schedule.phase_at(now));
        }

        let mut report = ScheduleReport::default();
        for (device_id, device_phases) in phases {
            let Some(mut device) = self.devices.get_by_id(device_id).await? else {
                tracing::warn!(%device_id, "schedule refers to a missing device");
                continue;
            };
            match combined_power(&device_phases) {
                Some(power) if power != device.power => {
                    device.set_power(power, now);
                    let device = self.devices.update(device).await?;
                    tracing::info!(device_name = %device.name, %power, "schedule switched device");
                    if power.is_on() {
                        report.turned_on.push(device);
                    } else {
                        report.turned_off.push(device);
                    }
                }
                _ => report.unchanged += 1,
            }
        }
        Ok(report)
    }

    /// Delete expired schedules and switch their devices off, unless another
    /// schedule still keeps the device on.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn cleanup_expired(&self, now: Timestamp) -> Result<CleanupReport, SmartHomeError> {
        let all = self.schedules.get_all().await?;
        let mut report = CleanupReport::default();
        let mut affected: Vec<DeviceId> = Vec::new();

        for schedule in all.iter().filter(|s| s.is_expired_at(now)) {
            self.schedules.delete(schedule.id).await?;
            report.removed += 1;
            if !affected.contains(&schedule.device_id) {
                affected.push(schedule.device_id);
            }
        }

        for device_id in affected {
            let still_active = all.iter().any(|s| {
                s.device_id == device_id && s.phase_at(now) == SchedulePhase::Active
            });
            if still_active {
                continue;
            }
            let Some(mut device) = self.devices.get_by_id(device_id).await? else {
                continue;
            };
            if device.power.is_on() {
                device.set_power(Power::Off, now);
                let device = self.devices.update(device).await?;
                tracing::info!(device_name = %device.name, "expired schedule turned device off");
                report.devices_turned_off.push(device);
            }
        }

        if report.removed > 0 {
            tracing::info!(removed = report.removed, "expired schedules removed");
        }
        Ok(report)
    }
}

//! JSON-file implementation of [`ScheduleRepository`] over `schedules.json`.

use std::future::Future;
use std::path::PathBuf;

use smartcode_app::ports::ScheduleRepository;
use smartcode_domain::error::{ConflictError, NotFoundError, SmartHomeError};
use smartcode_domain::id::{DeviceId, ScheduleId};
use smartcode_domain::schedule::Schedule;

use crate::file::JsonFile;

/// Schedule repository backed by `schedules.json`.
pub struct JsonScheduleRepository {
    file: JsonFile<Schedule>,
}

impl JsonScheduleRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, "schedules"),
        }
    }
}

impl ScheduleRepository for JsonScheduleRepository {
    fn create(
        &self,
        schedule: Schedule,
    ) -> impl Future<Output = Result<Schedule, SmartHomeError>> + Send {
        self.file.modify(move |schedules| {
            if schedules.iter().any(|s| s.id == schedule.id) {
                return Err(ConflictError {
                    entity: "Schedule",
                    key: schedule.id.to_string(),
                }
                .into());
            }
            schedules.push(schedule.clone());
            Ok((schedule, true))
        })
    }

    fn get_by_id(
        &self,
        id: ScheduleId,
    ) -> impl Future<Output = Result<Option<Schedule>, SmartHomeError>> + Send {
        async move {
            let schedules = self.file.read().await?;
            Ok(schedules.into_iter().find(|s| s.id == id))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        async move { Ok(self.file.read().await?) }
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<Schedule>, SmartHomeError>> + Send {
        async move {
            let schedules = self.file.read().await?;
            Ok(schedules
                .into_iter()
                .filter(|s| s.device_id == device_id)
                .collect())
        }
    }

    fn delete(&self, id: ScheduleId) -> impl Future<Output = Result<(), SmartHomeError>> + Send {
        self.file.modify(move |schedules| {
            let before = schedules.len();
            schedules.retain(|s| s.id != id);
            if schedules.len() == before {
                return Err(NotFoundError {
                    entity: "Schedule",
                    id: id.to_string(),
                }
                .into());
            }
            Ok(((), true))
        })
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        self.file.modify(move |schedules| {
            let before = schedules.len();
            schedules.retain(|s| s.device_id != device_id);
            let removed = before - schedules.len();
            Ok((removed, removed > 0))
        })
    }
}

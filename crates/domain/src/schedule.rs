//! Schedule — automatic power switching attached to a device.
//!
//! A schedule is either a one-off window with explicit turn-on and
//! turn-off instants, or a daily recurring window starting at a fixed
//! UTC time of day.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::device::Power;
use crate::error::{SmartHomeError, ValidationError};
use crate::id::{DeviceId, ScheduleId};
use crate::time::Timestamp;

const SECONDS_PER_DAY: i64 = 86_400;

/// Timing of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleKind {
    /// On at `start`, off at `end`, then expired.
    Window { start: Timestamp, end: Timestamp },
    /// On every day at `start` (UTC) for `duration_minutes`.
    Daily {
        start: NaiveTime,
        duration_minutes: u32,
    },
}

/// Where a schedule stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePhase {
    /// The window has not started yet.
    Pending,
    /// The device should be on.
    Active,
    /// Outside today's daily window.
    Inactive,
    /// The window is over and will not come back.
    Expired,
}

impl SchedulePhase {
    /// Power the device should have in this phase, if any.
    #[must_use]
    pub fn desired_power(self) -> Option<Power> {
        match self {
            Self::Active => Some(Power::On),
            Self::Inactive | Self::Expired => Some(Power::Off),
            Self::Pending => None,
        }
    }
}

/// A power schedule for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub device_id: DeviceId,
    pub kind: ScheduleKind,
    pub created_at: Timestamp,
}

impl Schedule {
    /// Longest working duration accepted by [`for_duration`](Self::for_duration).
    pub const MAX_WORKING_MINUTES: u32 = 7 * 24 * 60;
    /// Longest daily window.
    pub const MAX_DAILY_MINUTES: u32 = 24 * 60;

    /// Switch on at `start` and off at `end`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyWindow`] unless `end` is after `start`.
    pub fn window(
        device_id: DeviceId,
        start: Timestamp,
        end: Timestamp,
        created_at: Timestamp,
    ) -> Result<Self, SmartHomeError> {
        let schedule = Self {
            id: ScheduleId::new(),
            device_id,
            kind: ScheduleKind::Window { start, end },
            created_at,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Switch on now and off after `minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDuration`] when `minutes` is zero or
    /// longer than [`MAX_WORKING_MINUTES`](Self::MAX_WORKING_MINUTES).
    pub fn for_duration(
        device_id: DeviceId,
        now: Timestamp,
        minutes: u32,
    ) -> Result<Self, SmartHomeError> {
        if minutes == 0 || minutes > Self::MAX_WORKING_MINUTES {
            return Err(ValidationError::InvalidDuration {
                max: Self::MAX_WORKING_MINUTES,
            }
            .into());
        }
        let end = now + Duration::minutes(i64::from(minutes));
        Self::window(device_id, now, end, now)
    }

    /// Switch on every day at `start` (UTC) for `minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDuration`] unless
    /// `1 <= minutes <= 1440`.
    pub fn daily(
        device_id: DeviceId,
        start: NaiveTime,
        minutes: u32,
        created_at: Timestamp,
    ) -> Result<Self, SmartHomeError> {
        let schedule = Self {
            id: ScheduleId::new(),
            device_id,
            kind: ScheduleKind::Daily {
                start,
                duration_minutes: minutes,
            },
            created_at,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SmartHomeError::Validation`] for an empty window or an
    /// out-of-range daily duration.
    pub fn validate(&self) -> Result<(), SmartHomeError> {
        match self.kind {
            ScheduleKind::Window { start, end } if end <= start => {
                Err(ValidationError::EmptyWindow.into())
            }
            ScheduleKind::Daily {
                duration_minutes, ..
            } if duration_minutes == 0 || duration_minutes > Self::MAX_DAILY_MINUTES => {
                Err(ValidationError::InvalidDuration {
                    max: Self::MAX_DAILY_MINUTES,
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Phase of the schedule at `now`.
    #[must_use]
    pub fn phase_at(&self, now: Timestamp) -> SchedulePhase {
        match self.kind {
            ScheduleKind::Window { start, end } => {
                if now < start {
                    SchedulePhase::Pending
                } else if now < end {
                    SchedulePhase::Active
                } else {
                    SchedulePhase::Expired
                }
            }
            ScheduleKind::Daily {
                start,
                duration_minutes,
            } => {
                let now_secs = i64::from(now.time().num_seconds_from_midnight());
                let start_secs = i64::from(start.num_seconds_from_midnight());
                let elapsed = (now_secs - start_secs).rem_euclid(SECONDS_PER_DAY);
                if elapsed < i64::from(duration_minutes) * 60 {
                    SchedulePhase::Active
                } else {
                    SchedulePhase::Inactive
                }
            }
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.phase_at(now) == SchedulePhase::Expired
    }
}

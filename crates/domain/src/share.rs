//! Device sharing between users.

use serde::{Deserialize, Serialize};

use crate::id::{DeviceId, UserId};
use crate::time::Timestamp;

/// Grants `user_id` access to a device owned by someone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceShare {
    pub device_id: DeviceId,
    pub user_id: UserId,
    pub shared_at: Timestamp,
}

impl DeviceShare {
    #[must_use]
    pub fn new(device_id: DeviceId, user_id: UserId, shared_at: Timestamp) -> Self {
        Self {
            device_id,
            user_id,
            shared_at,
        }
    }
}

//! JSON-file implementation of [`ShareRepository`] over `shares.json`.

use std::future::Future;
use std::path::PathBuf;

use smartcode_app::ports::ShareRepository;
use smartcode_domain::error::{ConflictError, SmartHomeError};
use smartcode_domain::id::{DeviceId, UserId};
use smartcode_domain::share::DeviceShare;

use crate::file::JsonFile;

/// Share repository backed by `shares.json`.
pub struct JsonShareRepository {
    file: JsonFile<DeviceShare>,
}

impl JsonShareRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path, "shares"),
        }
    }

    async fn remove_where(
        &self,
        predicate: impl Fn(&DeviceShare) -> bool + Send,
    ) -> Result<usize, SmartHomeError> {
        self.file
            .modify(move |shares| {
                let before = shares.len();
                shares.retain(|share| !predicate(share));
                let removed = before - shares.len();
                Ok((removed, removed > 0))
            })
            .await
    }

    async fn select(
        &self,
        predicate: impl Fn(&DeviceShare) -> bool + Send,
    ) -> Result<Vec<DeviceShare>, SmartHomeError> {
        let shares = self.file.read().await?;
        Ok(shares.into_iter().filter(|share| predicate(share)).collect())
    }
}

impl ShareRepository for JsonShareRepository {
    fn create(
        &self,
        share: DeviceShare,
    ) -> impl Future<Output = Result<DeviceShare, SmartHomeError>> + Send {
        self.file.modify(move |shares| {
            if shares
                .iter()
                .any(|s| s.device_id == share.device_id && s.user_id == share.user_id)
            {
                return Err(ConflictError {
                    entity: "Share",
                    key: format!("{}/{}", share.device_id, share.user_id),
                }
                .into());
            }
            shares.push(share.clone());
            Ok((share, true))
        })
    }

    fn exists(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        async move {
            let found = self
                .select(|s| s.device_id == device_id && s.user_id == user_id)
                .await?;
            Ok(!found.is_empty())
        }
    }

    fn find_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        self.select(move |s| s.device_id == device_id)
    }

    fn find_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<DeviceShare>, SmartHomeError>> + Send {
        self.select(move |s| s.user_id == user_id)
    }

    fn delete(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<bool, SmartHomeError>> + Send {
        async move {
            let removed = self
                .remove_where(|s| s.device_id == device_id && s.user_id == user_id)
                .await?;
            Ok(removed > 0)
        }
    }

    fn delete_by_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        self.remove_where(move |s| s.device_id == device_id)
    }

    fn delete_by_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<usize, SmartHomeError>> + Send {
        self.remove_where(move |s| s.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcode_domain::time::now;

    #[tokio::test]
    async fn should_track_shares_per_device_and_user() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonShareRepository::new(dir.path().join("shares.json"));
        let (lamp, fan) = (DeviceId::new(), DeviceId::new());
        let (bob, carol) = (UserId::new(), UserId::new());

        repo.create(DeviceShare::new(lamp, bob, now())).await.unwrap();
        repo.create(DeviceShare::new(lamp, carol, now())).await.unwrap();
        repo.create(DeviceShare::new(fan, bob, now())).await.unwrap();

        assert!(repo.exists(lamp, bob).await.unwrap());
        assert!(!repo.exists(fan, carol).await.unwrap());
        assert_eq!(repo.find_by_device(lamp).await.unwrap().len(), 2);
        assert_eq!(repo.find_by_user(bob).await.unwrap().len(), 2);

        assert!(matches!(
            repo.create(DeviceShare::new(lamp, bob, now())).await,
            Err(SmartHomeError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn should_delete_shares() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonShareRepository::new(dir.path().join("shares.json"));
        let (lamp, fan) = (DeviceId::new(), DeviceId::new());
        let (bob, carol) = (UserId::new(), UserId::new());
        repo.create(DeviceShare::new(lamp, bob, now())).await.unwrap();
        repo.create(DeviceShare::new(lamp, carol, now())).await.unwrap();
        repo.create(DeviceShare::new(fan, bob, now())).await.unwrap();

        assert!(repo.delete(fan, bob).await.unwrap());
        assert!(!repo.delete(fan, bob).await.unwrap());
        assert_eq!(repo.delete_by_user(carol).await.unwrap(), 1);
        assert_eq!(repo.delete_by_device(lamp).await.unwrap(), 1);
        assert!(repo.find_by_user(bob).await.unwrap().is_empty());
    }
}

//! In-memory staging area for screen images awaiting commit.
//!
//! The upload step lets a user pick files, preview them, drop some, and only
//! then store the rest. Staged images live here, keyed by owner and project,
//! until they are committed, removed, or purged as abandoned.

use std::collections::HashMap;

use axum::body::Bytes;
use chrono::Utc;
use screenplan_core::types::{DbId, OwnerId, Timestamp};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Maximum number of images staged for one project at a time.
pub const MAX_STAGED_PER_PROJECT: usize = 50;

/// Length of a staged image id.
const STAGED_ID_LEN: usize = 10;

type StagingKey = (OwnerId, DbId);

/// One image held in memory until commit.
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub id: String,
    pub file_name: String,
    pub content_type: &'static str,
    pub extension: &'static str,
    pub bytes: Bytes,
    pub staged_at: Timestamp,
}

impl StagedImage {
    pub fn new(
        file_name: String,
        content_type: &'static str,
        extension: &'static str,
        bytes: Bytes,
    ) -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(STAGED_ID_LEN);
        Self {
            id,
            file_name,
            content_type,
            extension,
            bytes,
            staged_at: Utc::now(),
        }
    }

    pub fn info(&self, project_id: DbId) -> StagedImageInfo {
        StagedImageInfo {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            content_type: self.content_type,
            size_bytes: self.bytes.len(),
            preview_url: format!("/api/v1/projects/{project_id}/uploads/{}/preview", self.id),
            staged_at: self.staged_at,
        }
    }
}

/// Client-facing description of a staged image.
#[derive(Debug, Clone, Serialize)]
pub struct StagedImageInfo {
    pub id: String,
    pub file_name: String,
    pub content_type: &'static str,
    pub size_bytes: usize,
    pub preview_url: String,
    pub staged_at: Timestamp,
}

/// Staged images of every open upload session.
#[derive(Debug, Default)]
pub struct UploadStaging {
    inner: RwLock<HashMap<StagingKey, Vec<StagedImage>>>,
}

impl UploadStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `images` to the project's staging area.
    ///
    /// Images beyond [`MAX_STAGED_PER_PROJECT`] are not staged and are
    /// handed back.
    pub async fn stage(
        &self,
        owner: OwnerId,
        project_id: DbId,
        mut images: Vec<StagedImage>,
    ) -> Vec<StagedImage> {
        let mut inner = self.inner.write().await;
        let staged = inner.entry((owner, project_id)).or_default();
        let room = MAX_STAGED_PER_PROJECT.saturating_sub(staged.len());
        let overflow = images.split_off(images.len().min(room));
        staged.extend(images);
        if staged.is_empty() {
            inner.remove(&(owner, project_id));
        }
        overflow
    }

    /// Staged images of a project, oldest first.
    pub async fn list(&self, owner: OwnerId, project_id: DbId) -> Vec<StagedImageInfo> {
        self.inner
            .read()
            .await
            .get(&(owner, project_id))
            .map(|images| images.iter().map(|i| i.info(project_id)).collect())
            .unwrap_or_default()
    }

    /// Content type and bytes of one staged image.
    pub async fn preview(
        &self,
        owner: OwnerId,
        project_id: DbId,
        staged_id: &str,
    ) -> Option<(&'static str, Bytes)> {
        self.inner
            .read()
            .await
            .get(&(owner, project_id))?
            .iter()
            .find(|i| i.id == staged_id)
            .map(|i| (i.content_type, i.bytes.clone()))
    }

    /// Drop one staged image. Returns `true` if it existed.
    pub async fn remove(&self, owner: OwnerId, project_id: DbId, staged_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(images) = inner.get_mut(&(owner, project_id)) else {
            return false;
        };
        let before = images.len();
        images.retain(|i| i.id != staged_id);
        let removed = images.len() < before;
        if images.is_empty() {
            inner.remove(&(owner, project_id));
        }
        removed
    }

    /// Take every staged image of a project, leaving its staging area empty.
    pub async fn take_all(&self, owner: OwnerId, project_id: DbId) -> Vec<StagedImage> {
        self.inner
            .write()
            .await
            .remove(&(owner, project_id))
            .unwrap_or_default()
    }

    /// Put images back in front of anything staged since they were taken.
    pub async fn restore(&self, owner: OwnerId, project_id: DbId, mut images: Vec<StagedImage>) {
        if images.is_empty() {
            return;
        }
        let mut inner = self.inner.write().await;
        let staged = inner.entry((owner, project_id)).or_default();
        images.append(staged);
        *staged = images;
    }

    /// Discard images staged before `cutoff`. Returns how many were dropped.
    pub async fn purge_older_than(&self, cutoff: Timestamp) -> usize {
        let mut inner = self.inner.write().await;
        let mut purged = 0;
        inner.retain(|_, images| {
            let before = images.len();
            images.retain(|i| i.staged_at >= cutoff);
            purged += before - images.len();
            !images.is_empty()
        });
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> StagedImage {
        StagedImage::new(
            name.to_string(),
            "image/png",
            "png",
            Bytes::from(name.as_bytes().to_vec()),
        )
    }

    #[tokio::test]
    async fn staging_is_scoped_by_owner_and_project() {
        let staging = UploadStaging::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        staging.stage(alice, 1, vec![image("a.png"), image("b.png")]).await;
        staging.stage(bob, 1, vec![image("c.png")]).await;

        let listed = staging.list(alice, 1).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].file_name, "a.png");
        assert!(listed[0]
            .preview_url
            .starts_with("/api/v1/projects/1/uploads/"));
        assert_eq!(staging.list(bob, 1).await.len(), 1);
        assert!(staging.list(alice, 2).await.is_empty());
    }

    #[tokio::test]
    async fn preview_and_remove_by_id() {
        let staging = UploadStaging::new();
        let owner = Uuid::new_v4();
        let img = image("a.png");
        let id = img.id.clone();
        staging.stage(owner, 1, vec![img]).await;

        let (content_type, bytes) = staging.preview(owner, 1, &id).await.unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(&bytes[..], b"a.png");

        assert!(staging.remove(owner, 1, &id).await);
        assert!(!staging.remove(owner, 1, &id).await);
        assert!(staging.preview(owner, 1, &id).await.is_none());
    }

    #[tokio::test]
    async fn take_all_drains_and_restore_puts_back_first() {
        let staging = UploadStaging::new();
        let owner = Uuid::new_v4();
        staging.stage(owner, 1, vec![image("a.png"), image("b.png")]).await;

        let taken = staging.take_all(owner, 1).await;
        assert_eq!(taken.len(), 2);
        assert!(staging.list(owner, 1).await.is_empty());

        staging.stage(owner, 1, vec![image("c.png")]).await;
        staging.restore(owner, 1, vec![taken[1].clone()]).await;

        let names: Vec<_> = staging
            .list(owner, 1)
            .await
            .into_iter()
            .map(|i| i.file_name)
            .collect();
        assert_eq!(names, ["b.png", "c.png"]);
    }

    #[tokio::test]
    async fn stage_caps_images_per_project() {
        let staging = UploadStaging::new();
        let owner = Uuid::new_v4();
        let batch: Vec<_> = (0..MAX_STAGED_PER_PROJECT + 5)
            .map(|n| image(&format!("{n}.png")))
            .collect();

        let overflow = staging.stage(owner, 1, batch).await;
        assert_eq!(overflow.len(), 5);
        assert_eq!(overflow[0].file_name, format!("{MAX_STAGED_PER_PROJECT}.png"));
        assert_eq!(staging.list(owner, 1).await.len(), MAX_STAGED_PER_PROJECT);

        let overflow = staging.stage(owner, 1, vec![image("x.png")]).await;
        assert_eq!(overflow.len(), 1);
    }

    #[tokio::test]
    async fn purge_drops_only_old_images() {
        let staging = UploadStaging::new();
        let owner = Uuid::new_v4();
        let mut old = image("old.png");
        old.staged_at = Utc::now() - chrono::Duration::hours(2);
        staging.stage(owner, 1, vec![old, image("new.png")]).await;
        let mut stale_only = image("stale.png");
        stale_only.staged_at = Utc::now() - chrono::Duration::hours(3);
        staging.stage(owner, 2, vec![stale_only]).await;

        let purged = staging
            .purge_older_than(Utc::now() - chrono::Duration::hours(1))
            .await;

        assert_eq!(purged, 2);
        let remaining = staging.list(owner, 1).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].file_name, "new.png");
        assert!(staging.list(owner, 2).await.is_empty());
    }
}

use std::sync::Arc;

use anyhow::Result;
use parking_lot::{RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};

use crate::api::VideoId;
use crate::config::FeatureFlag;
use crate::error::{SyncError, SyncResult};

/// Kicks off the background count fetch for a newly loaded video.
pub trait FetchInitiator: Send + Sync {
    fn begin(&self, video: &VideoId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Disabled,
    Unchanged,
    Started(VideoId),
}

/// Tracks the video on screen and starts one fetch per distinct video.
pub struct VideoSession {
    flag: Arc<dyn FeatureFlag>,
    initiator: Arc<dyn FetchInitiator>,
    current: RwLock<Option<VideoId>>,
}

impl VideoSession {
    pub fn new(flag: Arc<dyn FeatureFlag>, initiator: Arc<dyn FetchInitiator>) -> Self {
        Self {
            flag,
            initiator,
            current: RwLock::new(None),
        }
    }

    pub fn on_new_video(&self, raw: &str) -> SyncResult<Transition> {
        if !self.flag.is_enabled() {
            return Ok(Transition::Disabled);
        }
        let video = VideoId::new(raw).ok_or(SyncError::InvalidVideoId)?;

        // Scroll re-renders report the same id over and over; keep that on a shared read.
        if self.current.read().as_ref() == Some(&video) {
            return Ok(Transition::Unchanged);
        }

        // Only one upgradable guard can exist, so check-and-store is a single step.
        let guard = self.current.upgradable_read();
        if guard.as_ref() == Some(&video) {
            return Ok(Transition::Unchanged);
        }
        let mut current = RwLockUpgradableReadGuard::upgrade(guard);
        *current = Some(video.clone());

        // Transitions must reach the initiator in the order they were stored.
        let _order = RwLockWriteGuard::downgrade_to_upgradable(current);
        self.initiator.begin(&video).map_err(SyncError::Fetch)?;
        Ok(Transition::Started(video))
    }

    pub fn current(&self) -> Option<VideoId> {
        self.current.read().clone()
    }

    pub fn reset(&self) {
        *self.current.write() = None;
    }
}

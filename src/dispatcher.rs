use std::sync::Arc;

use crate::api::VoteSubmitter;
use crate::config::FeatureFlag;
use crate::error::{SyncError, SyncResult};
use crate::session::VideoSession;
use crate::vote::VoteIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Disabled,
    Sent(VoteIntent),
}

/// Decodes raw vote signals from the UI and forwards them for the current video.
pub struct VoteDispatcher {
    flag: Arc<dyn FeatureFlag>,
    session: Arc<VideoSession>,
    submitter: Arc<dyn VoteSubmitter>,
}

impl VoteDispatcher {
    pub fn new(
        flag: Arc<dyn FeatureFlag>,
        session: Arc<VideoSession>,
        submitter: Arc<dyn VoteSubmitter>,
    ) -> Self {
        Self {
            flag,
            session,
            submitter,
        }
    }

    pub fn submit_vote(&self, raw: i32) -> SyncResult<Dispatch> {
        if !self.flag.is_enabled() {
            return Ok(Dispatch::Disabled);
        }
        let vote = VoteIntent::decode(raw)?;
        let video = self.session.current().ok_or(SyncError::NoActiveVideo)?;
        self.submitter
            .submit(&video, vote)
            .map_err(SyncError::Submit)?;
        Ok(Dispatch::Sent(vote))
    }
}

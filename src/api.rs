use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::vote::VoteIntent;

/// Identity of the loaded video. Cheap to clone; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(Arc<str>);

impl VideoId {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Arc::from(trimmed)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounts {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub dislikes: u64,
    #[serde(default)]
    pub view_count: Option<u64>,
}

impl VoteCounts {
    pub fn with_dislikes(dislikes: u64) -> Self {
        Self {
            dislikes,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(VoteCounts),
    Failure(String),
}

impl FetchOutcome {
    pub fn counts(&self) -> Option<&VoteCounts> {
        match self {
            FetchOutcome::Success(counts) => Some(counts),
            FetchOutcome::Failure(_) => None,
        }
    }
}

impl From<Result<VoteCounts>> for FetchOutcome {
    fn from(result: Result<VoteCounts>) -> Self {
        match result {
            Ok(counts) => FetchOutcome::Success(counts),
            Err(err) => FetchOutcome::Failure(format!("{err:#}")),
        }
    }
}

/// Called exactly once, from any thread, when a fetch finishes.
pub type Completion = Box<dyn FnOnce(FetchOutcome) + Send + 'static>;

/// Starts a count fetch without waiting for it.
pub trait CountFetcher: Send + Sync {
    fn request(&self, video: &VideoId, done: Completion) -> Result<()>;
}

/// Forwards a user vote to the dislike service.
pub trait VoteSubmitter: Send + Sync {
    fn submit(&self, video: &VideoId, vote: VoteIntent) -> Result<()>;
}

use crate::vote::VoteError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("video id must not be empty")]
    InvalidVideoId,
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error("no video loaded")]
    NoActiveVideo,
    #[error("splice dislikes: {0:#}")]
    Splice(anyhow::Error),
    #[error("start dislike fetch: {0:#}")]
    Fetch(anyhow::Error),
    #[error("submit vote: {0:#}")]
    Submit(anyhow::Error),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

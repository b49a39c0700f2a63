use std::fmt;

/// A user vote, tagged with the `value` the dislike API expects on the wire.
///
/// The UI hands these over as raw integers; [`VoteIntent::decode`] is the
/// only way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteIntent {
    Like,
    Dislike,
    /// Clears a previous like or dislike.
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("unknown vote type: {0}")]
    UnknownCode(i32),
}

impl VoteIntent {
    pub const ALL: [VoteIntent; 3] = [VoteIntent::Like, VoteIntent::Dislike, VoteIntent::Remove];

    pub fn code(self) -> i32 {
        match self {
            VoteIntent::Like => 1,
            VoteIntent::Dislike => -1,
            VoteIntent::Remove => 0,
        }
    }

    pub fn decode(raw: i32) -> Result<Self, VoteError> {
        Self::ALL
            .into_iter()
            .find(|intent| intent.code() == raw)
            .ok_or(VoteError::UnknownCode(raw))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteIntent::Like => "like",
            VoteIntent::Dislike => "dislike",
            VoteIntent::Remove => "remove",
        }
    }
}

impl TryFrom<i32> for VoteIntent {
    type Error = VoteError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::decode(raw)
    }
}

impl fmt::Display for VoteIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

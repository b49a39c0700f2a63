#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod element;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod puzzle;
pub mod session;
pub mod vote;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use api::{FetchOutcome, VideoId, VoteCounts};
pub use coordinator::{DislikeSpanCoordinator, Slot, SlotHandle, SlotPhase};
pub use element::DisplayElement;
pub use error::SyncError;
pub use hooks::{Collaborators, Hooks};
pub use vote::VoteIntent;

//! Entry points the host UI calls into.
//!
//! Nothing escapes from here: errors and panics are logged and the UI gets
//! back the element it passed in.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{CountFetcher, VoteSubmitter};
use crate::client::{ClientConfig, DislikeClient};
use crate::config::{Config, FeatureFlag, FeatureToggle};
use crate::coordinator::{DislikeSpanCoordinator, SlotHandle};
use crate::dispatcher::VoteDispatcher;
use crate::element::{DisplayElement, SeparatorSplicer, Splicer};
use crate::error::SyncResult;
use crate::logging::{panic_message, ErrorLog, TracingLog};
use crate::session::VideoSession;

const TAG: &str = "hooks";

pub struct Collaborators {
    pub flag: Arc<dyn FeatureFlag>,
    pub fetcher: Arc<dyn CountFetcher>,
    pub submitter: Arc<dyn VoteSubmitter>,
    pub splicer: Arc<dyn Splicer>,
    pub log: Arc<dyn ErrorLog>,
}

pub struct Hooks {
    session: Arc<VideoSession>,
    coordinator: DislikeSpanCoordinator,
    dispatcher: VoteDispatcher,
    log: Arc<dyn ErrorLog>,
    toggle: Option<Arc<FeatureToggle>>,
    _client: Option<Arc<DislikeClient>>,
}

impl Hooks {
    pub fn new(parts: Collaborators) -> Self {
        let coordinator = DislikeSpanCoordinator::new(
            parts.flag.clone(),
            parts.fetcher,
            parts.splicer,
            parts.log.clone(),
        );
        let session = Arc::new(VideoSession::new(
            parts.flag.clone(),
            Arc::new(coordinator.clone()),
        ));
        let dispatcher = VoteDispatcher::new(parts.flag, session.clone(), parts.submitter);

        Self {
            session,
            coordinator,
            dispatcher,
            log: parts.log,
            toggle: None,
            _client: None,
        }
    }

    /// Wires the HTTP client, default splicer and `tracing` logger from config.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let log: Arc<dyn ErrorLog> = Arc::new(TracingLog);
        let toggle = Arc::new(FeatureToggle::from(&cfg.dislikes));
        let client = Arc::new(
            DislikeClient::new(ClientConfig::from(&cfg.dislikes), log.clone())
                .context("hooks: start dislike client")?,
        );

        let mut hooks = Self::new(Collaborators {
            flag: toggle.clone(),
            fetcher: client.clone(),
            submitter: client.clone(),
            splicer: Arc::new(SeparatorSplicer::new(cfg.dislikes.separator.clone())),
            log,
        });
        hooks.toggle = Some(toggle);
        hooks._client = Some(client);
        Ok(hooks)
    }

    /// A like/dislike element was created; no slot cell is available.
    pub fn on_component_created(&self, element: DisplayElement) -> DisplayElement {
        let fallback = element.clone();
        self.guard("onComponentCreated", fallback, || {
            self.coordinator.decorate(element)
        })
    }

    /// A slot was created or reused for the like/dislike row.
    pub fn on_element_ready(&self, slot: &SlotHandle, element: DisplayElement) -> DisplayElement {
        let fallback = element.clone();
        self.guard("onElementReady", fallback, || {
            self.coordinator.on_element_ready(slot, element)
        })
    }

    pub fn new_video_loaded(&self, video_id: &str) {
        self.guard("newVideoLoaded", (), || {
            self.session.on_new_video(video_id).map(|_| ())
        })
    }

    /// `vote` is the raw signal from the UI; see [`crate::vote::VoteIntent::code`].
    pub fn send_vote(&self, vote: i32) {
        self.guard("sendVote", (), || self.dispatcher.submit_vote(vote).map(|_| ()))
    }

    /// Flips the runtime toggle. Turning it back on applies any count that
    /// arrived while it was off.
    pub fn set_enabled(&self, enabled: bool) {
        if let Some(toggle) = &self.toggle {
            toggle.set(enabled);
        }
        if enabled {
            self.coordinator.refresh();
        }
    }

    pub fn session(&self) -> &VideoSession {
        &self.session
    }

    pub fn coordinator(&self) -> &DislikeSpanCoordinator {
        &self.coordinator
    }

    /// Forgets the current video and any fetched counts.
    pub fn reset(&self) {
        self.session.reset();
        self.coordinator.reset();
    }

    fn guard<T>(&self, entry: &str, fallback: T, op: impl FnOnce() -> SyncResult<T>) -> T {
        match panic::catch_unwind(AssertUnwindSafe(op)) {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                self.log.print_exception(
                    TAG,
                    &format!("{entry} failure"),
                    Some(&anyhow::Error::new(err)),
                );
                fallback
            }
            Err(payload) => {
                self.log.print_exception(
                    TAG,
                    &format!("{entry} panicked: {}", panic_message(payload.as_ref())),
                    None,
                );
                fallback
            }
        }
    }
}

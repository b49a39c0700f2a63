//! Splices fetched dislike counts into like/dislike rows.
//!
//! The UI creates and recycles rows on its own schedule while counts arrive on
//! fetcher threads. Each row slot carries a small state machine:
//!
//! ```text
//! Idle ── ready, no outcome ──▶ AwaitingFetch(v) ── outcome(v) ──▶ Decorated(v) | Failed(v)
//!                                     │
//!                                     └── new video loaded ──▶ Stale(v)
//! ```
//!
//! Every transition is tagged with the video it belongs to. An outcome is
//! applied to a slot only while that slot is still awaiting the same video.

use std::mem;
use std::sync::{Arc, Weak};

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::api::{CountFetcher, FetchOutcome, VideoId};
use crate::config::FeatureFlag;
use crate::element::{splice_element, DisplayElement, Splicer};
use crate::error::{SyncError, SyncResult};
use crate::logging::ErrorLog;
use crate::session::FetchInitiator;

const TAG: &str = "coordinator";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotPhase {
    #[default]
    Idle,
    AwaitingFetch(VideoId),
    Decorated(VideoId),
    Failed(VideoId),
    Stale(VideoId),
}

impl SlotPhase {
    pub fn video(&self) -> Option<&VideoId> {
        match self {
            SlotPhase::Idle => None,
            SlotPhase::AwaitingFetch(video)
            | SlotPhase::Decorated(video)
            | SlotPhase::Failed(video)
            | SlotPhase::Stale(video) => Some(video),
        }
    }
}

#[derive(Debug, Default)]
struct SlotEntry {
    element: Option<DisplayElement>,
    pending: Option<DisplayElement>,
    phase: SlotPhase,
    generation: u64,
}

/// UI-owned reference cell for one visual like/dislike slot.
///
/// The UI may read it from any thread at any time; every write replaces the
/// whole entry in one critical section.
#[derive(Debug, Default)]
pub struct Slot {
    entry: Mutex<SlotEntry>,
}

pub type SlotHandle = Arc<Slot>;

impl Slot {
    pub fn handle() -> SlotHandle {
        Arc::new(Self::default())
    }

    /// Element the coordinator stored for this slot, if any.
    pub fn current(&self) -> Option<DisplayElement> {
        self.entry.lock().element.clone()
    }

    pub fn phase(&self) -> SlotPhase {
        self.entry.lock().phase.clone()
    }

    fn arm(&self, video: &VideoId, original: &DisplayElement) {
        let mut entry = self.entry.lock();
        if entry.phase.video() != Some(video) {
            // Recycled from another video; its count must not stay visible.
            entry.element = None;
        }
        entry.generation += 1;
        entry.pending = Some(original.plain());
        entry.phase = SlotPhase::AwaitingFetch(video.clone());
    }

    fn claim(&self) -> u64 {
        let mut entry = self.entry.lock();
        entry.generation += 1;
        entry.generation
    }

    fn awaiting(&self, video: &VideoId) -> Option<(u64, DisplayElement)> {
        let entry = self.entry.lock();
        match &entry.phase {
            SlotPhase::AwaitingFetch(awaited) if awaited == video => entry
                .pending
                .clone()
                .map(|pending| (entry.generation, pending)),
            _ => None,
        }
    }

    fn settle(&self, generation: u64, element: Option<DisplayElement>, phase: SlotPhase) -> bool {
        let mut entry = self.entry.lock();
        if entry.generation != generation {
            return false;
        }
        entry.element = element;
        entry.pending = None;
        entry.phase = phase;
        true
    }

    fn mark_stale(&self, video: &VideoId) {
        let mut entry = self.entry.lock();
        if matches!(&entry.phase, SlotPhase::AwaitingFetch(awaited) if awaited == video) {
            entry.generation += 1;
            entry.pending = None;
            entry.phase = SlotPhase::Stale(video.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Outcome stored; `updated` armed slots received a decorated element.
    Applied { updated: usize },
    /// Outcome belonged to a video that is no longer current.
    Discarded,
}

struct FetchState {
    video: VideoId,
    outcome: Option<FetchOutcome>,
    armed: Vec<Weak<Slot>>,
}

impl FetchState {
    fn new(video: VideoId) -> Self {
        Self {
            video,
            outcome: None,
            armed: Vec::new(),
        }
    }

    fn arm(&mut self, slot: &SlotHandle) {
        self.armed.retain(|weak| weak.strong_count() > 0);
        if !self
            .armed
            .iter()
            .any(|weak| Weak::as_ptr(weak) == Arc::as_ptr(slot))
        {
            self.armed.push(Arc::downgrade(slot));
        }
    }
}

struct Shared {
    flag: Arc<dyn FeatureFlag>,
    fetcher: Arc<dyn CountFetcher>,
    splicer: Arc<dyn Splicer>,
    log: Arc<dyn ErrorLog>,
    state: Mutex<Option<FetchState>>,
}

#[derive(Clone)]
pub struct DislikeSpanCoordinator {
    shared: Arc<Shared>,
}

impl DislikeSpanCoordinator {
    pub fn new(
        flag: Arc<dyn FeatureFlag>,
        fetcher: Arc<dyn CountFetcher>,
        splicer: Arc<dyn Splicer>,
        log: Arc<dyn ErrorLog>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                flag,
                fetcher,
                splicer,
                log,
                state: Mutex::new(None),
            }),
        }
    }

    /// Makes `video` current and starts its count fetch.
    ///
    /// Any outcome still pending for the previous video is dropped when it
    /// arrives, and slots waiting on it become [`SlotPhase::Stale`].
    pub fn begin(&self, video: &VideoId) -> Result<()> {
        let previous = self
            .shared
            .state
            .lock()
            .replace(FetchState::new(video.clone()));
        if let Some(previous) = previous {
            for slot in previous.armed.iter().filter_map(Weak::upgrade) {
                slot.mark_stale(&previous.video);
            }
        }

        let shared = Arc::clone(&self.shared);
        let tag = video.clone();
        let requested = self.shared.fetcher.request(
            video,
            Box::new(move |outcome| {
                shared.complete(&tag, outcome);
            }),
        );
        if let Err(err) = requested {
            let reason = format!("{err:#}");
            self.shared.complete(video, FetchOutcome::Failure(reason));
            return Err(err);
        }
        Ok(())
    }

    /// Delivers a fetch outcome. Fetchers normally reach this through the
    /// completion handed to [`CountFetcher::request`].
    pub fn complete(&self, video: &VideoId, outcome: FetchOutcome) -> Completion {
        self.shared.complete(video, outcome)
    }

    /// Called whenever the UI creates or reuses the like/dislike row of `slot`.
    ///
    /// Returns the element to draw right now: `original` while the count is
    /// unknown, a decorated copy of it once the count is available.
    pub fn on_element_ready(
        &self,
        slot: &SlotHandle,
        original: DisplayElement,
    ) -> SyncResult<DisplayElement> {
        if !self.shared.flag.is_enabled() {
            return Ok(original);
        }

        let (video, outcome) = {
            let mut guard = self.shared.state.lock();
            let Some(state) = guard.as_mut() else {
                return Ok(original);
            };
            let Some(outcome) = state.outcome.clone() else {
                // Armed under the state lock so a completion cannot slip in between.
                slot.arm(&state.video, &original);
                state.arm(slot);
                return Ok(original);
            };
            (state.video.clone(), outcome)
        };

        let generation = slot.claim();
        match outcome {
            FetchOutcome::Success(counts) => {
                match splice_element(self.shared.splicer.as_ref(), &original, &counts) {
                    Ok(decorated) => {
                        slot.settle(
                            generation,
                            Some(decorated.clone()),
                            SlotPhase::Decorated(video),
                        );
                        Ok(decorated)
                    }
                    Err(err) => {
                        slot.settle(generation, None, SlotPhase::Failed(video));
                        Err(SyncError::Splice(err))
                    }
                }
            }
            FetchOutcome::Failure(_) => {
                slot.settle(generation, None, SlotPhase::Failed(video));
                Ok(original)
            }
        }
    }

    /// Splices without a slot; used by hooks that only see the element.
    pub fn decorate(&self, original: DisplayElement) -> SyncResult<DisplayElement> {
        if !self.shared.flag.is_enabled() {
            return Ok(original);
        }
        let counts = {
            let guard = self.shared.state.lock();
            match guard.as_ref().and_then(|state| state.outcome.as_ref()) {
                Some(FetchOutcome::Success(counts)) => *counts,
                _ => return Ok(original),
            }
        };
        splice_element(self.shared.splicer.as_ref(), &original, &counts).map_err(SyncError::Splice)
    }

    /// Applies a stored outcome to slots that were armed while the feature
    /// was off. Returns how many slots received a decorated element.
    pub fn refresh(&self) -> usize {
        if !self.shared.flag.is_enabled() {
            return 0;
        }
        let (video, outcome, armed) = {
            let mut guard = self.shared.state.lock();
            match guard.as_mut() {
                Some(state) => match state.outcome.clone() {
                    Some(outcome) => (state.video.clone(), outcome, mem::take(&mut state.armed)),
                    None => return 0,
                },
                None => return 0,
            }
        };
        self.shared.apply(&video, &outcome, &armed)
    }

    pub fn current_outcome(&self) -> Option<FetchOutcome> {
        self.shared
            .state
            .lock()
            .as_ref()
            .and_then(|state| state.outcome.clone())
    }

    pub fn reset(&self) {
        *self.shared.state.lock() = None;
    }
}

impl FetchInitiator for DislikeSpanCoordinator {
    fn begin(&self, video: &VideoId) -> Result<()> {
        DislikeSpanCoordinator::begin(self, video)
    }
}

impl Shared {
    fn complete(&self, video: &VideoId, outcome: FetchOutcome) -> Completion {
        let enabled = self.flag.is_enabled();
        let armed = {
            let mut guard = self.state.lock();
            match guard.as_mut() {
                Some(state) if state.video == *video && state.outcome.is_none() => {
                    state.outcome = Some(outcome.clone());
                    // While disabled the armed slots wait for `refresh`.
                    if enabled {
                        mem::take(&mut state.armed)
                    } else {
                        Vec::new()
                    }
                }
                _ => {
                    self.log
                        .print_debug(TAG, &format!("discarding stale outcome for {video}"));
                    return Completion::Discarded;
                }
            }
        };

        if let FetchOutcome::Failure(reason) = &outcome {
            self.log.print_exception(
                TAG,
                &format!("dislike fetch failed for {video}"),
                Some(&anyhow!("{reason}")),
            );
        }
        Completion::Applied {
            updated: self.apply(video, &outcome, &armed),
        }
    }

    fn apply(&self, video: &VideoId, outcome: &FetchOutcome, armed: &[Weak<Slot>]) -> usize {
        armed
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|slot| self.resolve(slot, video, outcome))
            .count()
    }

    fn resolve(&self, slot: &Slot, video: &VideoId, outcome: &FetchOutcome) -> bool {
        let Some((generation, pending)) = slot.awaiting(video) else {
            return false;
        };
        match outcome {
            FetchOutcome::Success(counts) => {
                match splice_element(self.splicer.as_ref(), &pending, counts) {
                    Ok(decorated) => slot.settle(
                        generation,
                        Some(decorated),
                        SlotPhase::Decorated(video.clone()),
                    ),
                    Err(err) => {
                        self.log.print_exception(
                            TAG,
                            &format!("failed to splice dislikes for {video}"),
                            Some(&err),
                        );
                        slot.settle(generation, None, SlotPhase::Failed(video.clone()));
                        false
                    }
                }
            }
            FetchOutcome::Failure(_) => {
                slot.settle(generation, None, SlotPhase::Failed(video.clone()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Completion as Done, VoteCounts};
    use crate::config::FeatureToggle;
    use crate::element::SeparatorSplicer;

    #[derive(Default)]
    struct HeldFetcher {
        pending: Mutex<Vec<(VideoId, Done)>>,
    }

    impl HeldFetcher {
        fn finish(&self, video: &str, outcome: FetchOutcome) {
            let done = {
                let mut pending = self.pending.lock();
                let index = pending
                    .iter()
                    .position(|(id, _)| id.as_str() == video)
                    .expect("pending fetch");
                pending.remove(index).1
            };
            done(outcome);
        }
    }

    impl CountFetcher for HeldFetcher {
        fn request(&self, video: &VideoId, done: Done) -> Result<()> {
            self.pending.lock().push((video.clone(), done));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Quiet {
        errors: Mutex<Vec<String>>,
    }

    impl ErrorLog for Quiet {
        fn print_exception(&self, tag: &str, message: &str, _cause: Option<&anyhow::Error>) {
            self.errors.lock().push(format!("{tag}: {message}"));
        }

        fn print_debug(&self, _tag: &str, _message: &str) {}
    }

    struct Broken;

    impl Splicer for Broken {
        fn splice(&self, _original: &str, _counts: &VoteCounts) -> Result<String> {
            Err(anyhow!("span layout failed"))
        }
    }

    fn coordinator(fetcher: Arc<HeldFetcher>) -> DislikeSpanCoordinator {
        DislikeSpanCoordinator::new(
            Arc::new(FeatureToggle::new(true)),
            fetcher,
            Arc::new(SeparatorSplicer::default()),
            Arc::new(Quiet::default()),
        )
    }

    fn vid(raw: &str) -> VideoId {
        VideoId::new(raw).unwrap()
    }

    fn success(dislikes: u64) -> FetchOutcome {
        FetchOutcome::Success(VoteCounts::with_dislikes(dislikes))
    }

    #[test]
    fn nothing_loaded_returns_original() {
        let coordinator = coordinator(Arc::new(HeldFetcher::default()));
        let slot = Slot::handle();
        let out = coordinator
            .on_element_ready(&slot, DisplayElement::new("12"))
            .unwrap();
        assert_eq!(out, DisplayElement::new("12"));
        assert_eq!(slot.phase(), SlotPhase::Idle);
    }

    #[test]
    fn early_element_is_updated_on_completion() {
        let fetcher = Arc::new(HeldFetcher::default());
        let coordinator = coordinator(fetcher.clone());
        coordinator.begin(&vid("vidA")).unwrap();

        let slot = Slot::handle();
        let out = coordinator
            .on_element_ready(&slot, DisplayElement::new("1K"))
            .unwrap();
        assert!(!out.is_decorated());
        assert!(slot.current().is_none());
        assert_eq!(slot.phase(), SlotPhase::AwaitingFetch(vid("vidA")));

        fetcher.finish("vidA", success(42));
        let stored = slot.current().unwrap();
        assert_eq!(stored.text(), "1K | 42");
        assert_eq!(slot.phase(), SlotPhase::Decorated(vid("vidA")));
    }

    #[test]
    fn late_element_is_decorated_immediately() {
        let fetcher = Arc::new(HeldFetcher::default());
        let coordinator = coordinator(fetcher.clone());
        coordinator.begin(&vid("vidA")).unwrap();
        fetcher.finish("vidA", success(10));

        let slot = Slot::handle();
        let out = coordinator
            .on_element_ready(&slot, DisplayElement::new("300"))
            .unwrap();
        assert_eq!(out.text(), "300 | 10");
        assert_eq!(slot.current(), Some(out));
    }

    #[test]
    fn superseded_outcome_is_discarded() {
        let fetcher = Arc::new(HeldFetcher::default());
        let coordinator = coordinator(fetcher.clone());
        coordinator.begin(&vid("vidA")).unwrap();
        let old_slot = Slot::handle();
        coordinator
            .on_element_ready(&old_slot, DisplayElement::new("5"))
            .unwrap();

        coordinator.begin(&vid("vidB")).unwrap();
        assert_eq!(old_slot.phase(), SlotPhase::Stale(vid("vidA")));
        let slot = Slot::handle();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("7"))
            .unwrap();

        let done = {
            let mut pending = fetcher.pending.lock();
            pending.remove(0).1
        };
        done(success(5));
        assert!(slot.current().is_none());
        assert!(old_slot.current().is_none());
        assert_eq!(slot.phase(), SlotPhase::AwaitingFetch(vid("vidB")));
        assert!(coordinator.current_outcome().is_none());

        fetcher.finish("vidB", success(8));
        assert_eq!(slot.current().unwrap().text(), "7 | 8");
    }

    #[test]
    fn slot_reused_for_new_video_ignores_old_completion() {
        let coordinator = coordinator(Arc::new(HeldFetcher::default()));
        coordinator.begin(&vid("vidA")).unwrap();
        let slot = Slot::handle();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("1"))
            .unwrap();
        coordinator.begin(&vid("vidB")).unwrap();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("2"))
            .unwrap();

        assert_eq!(
            coordinator.complete(&vid("vidA"), success(99)),
            Completion::Discarded
        );
        assert_eq!(slot.phase(), SlotPhase::AwaitingFetch(vid("vidB")));
        assert_eq!(
            coordinator.complete(&vid("vidB"), success(3)),
            Completion::Applied { updated: 1 }
        );
        assert_eq!(slot.current().unwrap().text(), "2 | 3");
    }

    #[test]
    fn repeated_ready_calls_do_not_compound() {
        let coordinator = coordinator(Arc::new(HeldFetcher::default()));
        coordinator.begin(&vid("vidA")).unwrap();
        coordinator.complete(&vid("vidA"), success(4));

        let slot = Slot::handle();
        let first = coordinator
            .on_element_ready(&slot, DisplayElement::new("20"))
            .unwrap();
        let second = coordinator.on_element_ready(&slot, first.clone()).unwrap();
        let third = coordinator.on_element_ready(&slot, second.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(third.text(), "20 | 4");
    }

    #[test]
    fn duplicate_completion_is_ignored() {
        let coordinator = coordinator(Arc::new(HeldFetcher::default()));
        coordinator.begin(&vid("vidA")).unwrap();
        assert_eq!(
            coordinator.complete(&vid("vidA"), success(1)),
            Completion::Applied { updated: 0 }
        );
        assert_eq!(
            coordinator.complete(&vid("vidA"), success(2)),
            Completion::Discarded
        );
        assert_eq!(coordinator.current_outcome(), Some(success(1)));
    }

    #[test]
    fn failed_fetch_leaves_rows_plain() {
        let fetcher = Arc::new(HeldFetcher::default());
        let coordinator = coordinator(fetcher.clone());
        coordinator.begin(&vid("vidA")).unwrap();
        let early = Slot::handle();
        coordinator
            .on_element_ready(&early, DisplayElement::new("9"))
            .unwrap();
        fetcher.finish("vidA", FetchOutcome::Failure("timeout".into()));
        assert!(early.current().is_none());
        assert_eq!(early.phase(), SlotPhase::Failed(vid("vidA")));

        let late = Slot::handle();
        let out = coordinator
            .on_element_ready(&late, DisplayElement::new("9"))
            .unwrap();
        assert!(!out.is_decorated());
        assert_eq!(late.phase(), SlotPhase::Failed(vid("vidA")));
    }

    #[test]
    fn splice_failure_keeps_original() {
        let log = Arc::new(Quiet::default());
        let coordinator = DislikeSpanCoordinator::new(
            Arc::new(FeatureToggle::new(true)),
            Arc::new(HeldFetcher::default()),
            Arc::new(Broken),
            log.clone(),
        );
        coordinator.begin(&vid("vidA")).unwrap();
        let early = Slot::handle();
        coordinator
            .on_element_ready(&early, DisplayElement::new("3"))
            .unwrap();
        coordinator.complete(&vid("vidA"), success(1));
        assert!(early.current().is_none());
        assert_eq!(log.errors.lock().len(), 1);

        let late = Slot::handle();
        let err = coordinator
            .on_element_ready(&late, DisplayElement::new("3"))
            .unwrap_err();
        assert!(matches!(err, SyncError::Splice(_)));
        assert!(late.current().is_none());
    }

    #[test]
    fn disabled_passes_through() {
        let toggle = Arc::new(FeatureToggle::new(true));
        let coordinator = DislikeSpanCoordinator::new(
            toggle.clone(),
            Arc::new(HeldFetcher::default()),
            Arc::new(SeparatorSplicer::default()),
            Arc::new(Quiet::default()),
        );
        coordinator.begin(&vid("vidA")).unwrap();
        coordinator.complete(&vid("vidA"), success(6));
        toggle.set(false);

        let slot = Slot::handle();
        let out = coordinator
            .on_element_ready(&slot, DisplayElement::new("11"))
            .unwrap();
        assert!(!out.is_decorated());
        assert!(slot.current().is_none());
        assert!(!coordinator
            .decorate(DisplayElement::new("11"))
            .unwrap()
            .is_decorated());
    }

    #[test]
    fn decorate_without_slot() {
        let coordinator = coordinator(Arc::new(HeldFetcher::default()));
        assert!(!coordinator
            .decorate(DisplayElement::new("4"))
            .unwrap()
            .is_decorated());
        coordinator.begin(&vid("vidA")).unwrap();
        coordinator.complete(&vid("vidA"), success(2));
        assert_eq!(
            coordinator.decorate(DisplayElement::new("4")).unwrap().text(),
            "4 | 2"
        );
    }

    #[test]
    fn recycled_slot_drops_previous_video_count() {
        let fetcher = Arc::new(HeldFetcher::default());
        let coordinator = coordinator(fetcher.clone());
        coordinator.begin(&vid("vidA")).unwrap();
        fetcher.finish("vidA", success(42));
        let slot = Slot::handle();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("A-row"))
            .unwrap();
        assert_eq!(slot.current().unwrap().text(), "A-row | 42");

        coordinator.begin(&vid("vidB")).unwrap();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("B-row"))
            .unwrap();
        assert!(slot.current().is_none());
        assert_eq!(slot.phase(), SlotPhase::AwaitingFetch(vid("vidB")));

        fetcher.finish("vidB", FetchOutcome::Failure("timeout".into()));
        assert!(slot.current().is_none());
        assert_eq!(slot.phase(), SlotPhase::Failed(vid("vidB")));
    }

    #[test]
    fn late_failure_clears_previous_count() {
        let fetcher = Arc::new(HeldFetcher::default());
        let coordinator = coordinator(fetcher.clone());
        coordinator.begin(&vid("vidA")).unwrap();
        fetcher.finish("vidA", success(42));
        let slot = Slot::handle();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("A-row"))
            .unwrap();

        coordinator.begin(&vid("vidB")).unwrap();
        fetcher.finish("vidB", FetchOutcome::Failure("timeout".into()));
        let out = coordinator
            .on_element_ready(&slot, DisplayElement::new("B-row"))
            .unwrap();
        assert_eq!(out, DisplayElement::new("B-row"));
        assert!(slot.current().is_none());
        assert_eq!(slot.phase(), SlotPhase::Failed(vid("vidB")));
    }

    #[test]
    fn splicer_panic_on_completion_fails_slot() {
        struct Exploding;

        impl Splicer for Exploding {
            fn splice(&self, _original: &str, _counts: &VoteCounts) -> Result<String> {
                panic!("layout exploded");
            }
        }

        let fetcher = Arc::new(HeldFetcher::default());
        let log = Arc::new(Quiet::default());
        let coordinator = DislikeSpanCoordinator::new(
            Arc::new(FeatureToggle::new(true)),
            fetcher.clone(),
            Arc::new(Exploding),
            log.clone(),
        );
        coordinator.begin(&vid("vidA")).unwrap();
        let slot = Slot::handle();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("8"))
            .unwrap();

        fetcher.finish("vidA", success(3));
        assert!(slot.current().is_none());
        assert_eq!(slot.phase(), SlotPhase::Failed(vid("vidA")));
        assert_eq!(
            log.errors.lock().clone(),
            vec!["coordinator: failed to splice dislikes for vidA".to_string()]
        );
    }

    #[test]
    fn slots_armed_while_disabled_resolve_on_refresh() {
        let toggle = Arc::new(FeatureToggle::new(true));
        let coordinator = DislikeSpanCoordinator::new(
            toggle.clone(),
            Arc::new(HeldFetcher::default()),
            Arc::new(SeparatorSplicer::default()),
            Arc::new(Quiet::default()),
        );
        coordinator.begin(&vid("vidA")).unwrap();
        let slot = Slot::handle();
        coordinator
            .on_element_ready(&slot, DisplayElement::new("15"))
            .unwrap();

        toggle.set(false);
        assert_eq!(
            coordinator.complete(&vid("vidA"), success(6)),
            Completion::Applied { updated: 0 }
        );
        assert_eq!(slot.phase(), SlotPhase::AwaitingFetch(vid("vidA")));
        assert_eq!(coordinator.refresh(), 0);

        toggle.set(true);
        assert_eq!(coordinator.refresh(), 1);
        assert_eq!(slot.current().unwrap().text(), "15 | 6");
        assert_eq!(coordinator.refresh(), 0);
    }

    #[test]
    fn dropped_slots_are_skipped() {
        let coordinator = coordinator(Arc::new(HeldFetcher::default()));
        coordinator.begin(&vid("vidA")).unwrap();
        let kept = Slot::handle();
        {
            let dropped = Slot::handle();
            coordinator
                .on_element_ready(&dropped, DisplayElement::new("1"))
                .unwrap();
        }
        coordinator
            .on_element_ready(&kept, DisplayElement::new("1"))
            .unwrap();
        coordinator
            .on_element_ready(&kept, DisplayElement::new("1"))
            .unwrap();
        assert_eq!(
            coordinator.complete(&vid("vidA"), success(2)),
            Completion::Applied { updated: 1 }
        );
    }
}

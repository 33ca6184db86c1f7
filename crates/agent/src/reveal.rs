//! Step reveal state machine
//!
//! Steps appear one at a time with a writing animation paced by line
//! count. The controller is superseded wholesale when a new question's
//! steps arrive: the old run observes its token as stale at the next
//! suspension point and stops without touching the new run's state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use tutor_agent_config::RevealSettings;
use tutor_agent_core::{CancelSource, RevealPhase, RevealState, SolutionStep};

const EVENT_CAPACITY: usize = 64;

/// Reveal lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    /// A step began its writing animation
    StepStarted { step: u32 },
    /// A step settled into the completed list
    StepCompleted { step: u32 },
    /// All steps revealed; the explain trigger is now meaningful
    Ready,
    /// The whiteboard was cleared
    Reset,
}

/// Owns reveal state and pacing for the current question
pub struct RevealController {
    state: Mutex<RevealState>,
    cancel: CancelSource,
    events: broadcast::Sender<RevealEvent>,
    /// Latched when the user scrolls away; cleared on the next question
    user_scrolled: AtomicBool,
    settings: RevealSettings,
}

impl RevealController {
    pub fn new(settings: RevealSettings) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            state: Mutex::new(RevealState::default()),
            cancel: CancelSource::new(),
            events,
            user_scrolled: AtomicBool::new(false),
            settings,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RevealEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current reveal state
    pub fn snapshot(&self) -> RevealState {
        self.state.lock().clone()
    }

    pub fn phase(&self) -> RevealPhase {
        self.state.lock().phase
    }

    /// True when tapping a step to re-explain does something: all steps
    /// revealed and at least one exists
    pub fn explain_ready(&self) -> bool {
        let state = self.state.lock();
        state.phase == RevealPhase::Ready && !state.completed.is_empty()
    }

    /// Clear the whiteboard and cancel any running reveal
    pub fn reset(&self) {
        self.cancel.cancel_all();
        self.state.lock().reset();
        self.user_scrolled.store(false, Ordering::Release);
        let _ = self.events.send(RevealEvent::Reset);
    }

    /// Reveal steps one at a time, paced by line count
    ///
    /// Supersedes any run in progress. Completed steps of a cancelled run
    /// stay visible until the next `reset`; they are never rolled back.
    pub async fn reveal(&self, steps: Vec<SolutionStep>) {
        if steps.is_empty() {
            return;
        }

        let token = self.cancel.issue();
        self.user_scrolled.store(false, Ordering::Release);
        {
            let mut state = self.state.lock();
            state.completed.clear();
            state.active = None;
            state.phase = RevealPhase::Writing;
        }

        tracing::debug!(steps = steps.len(), "reveal start");

        for step in steps {
            if token.is_cancelled() {
                return;
            }
            let number = step.step;
            let pacing = self.settings.step_delay(step.line_count());
            {
                let mut state = self.state.lock();
                state.active = Some(step.clone());
            }
            let _ = self.events.send(RevealEvent::StepStarted { step: number });

            tokio::time::sleep(pacing).await;
            if token.is_cancelled() {
                return;
            }

            {
                let mut state = self.state.lock();
                state.active = None;
                state.completed.push(step);
            }
            let _ = self.events.send(RevealEvent::StepCompleted { step: number });

            tokio::time::sleep(self.settings.settle_delay()).await;
        }

        if token.is_cancelled() {
            return;
        }
        self.state.lock().phase = RevealPhase::Ready;
        let _ = self.events.send(RevealEvent::Ready);
        tracing::debug!("reveal ready");
    }

    /// Record the viewport's distance from the bottom after a user scroll
    ///
    /// Past the threshold the user is considered to have scrolled away and
    /// auto-scroll stands down until the next question.
    pub fn note_scroll(&self, distance_from_bottom_px: u32) {
        let away = distance_from_bottom_px > self.settings.scroll_threshold_px;
        self.user_scrolled.store(away, Ordering::Release);
    }

    /// Whether the view should follow newly revealed steps
    pub fn should_autoscroll(&self) -> bool {
        !self.user_scrolled.load(Ordering::Acquire)
    }
}

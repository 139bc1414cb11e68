//! Phase sequencer
//!
//! A reusable barrier for a batch of asynchronous steps whose size is not
//! known up front. The completion handler fires exactly once, after every
//! submitted step has completed *and* `finalize` has been called, whatever
//! order those happen in.

use parking_lot::Mutex;
use std::sync::Arc;

use tabsync_tabs::{Tab, WindowId};

/// What a finished step reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Done,
    CreatedTab(Tab),
    CreatedWindow(WindowId),
    Failed(String),
    /// The step handle was dropped without being completed.
    Abandoned,
}

type CompletionHandler = Box<dyn FnOnce() + Send>;
type StepCallback = Box<dyn FnOnce(&StepOutcome) + Send>;

#[derive(Default)]
struct PhaseState {
    pending: usize,
    more_steps: bool,
    on_complete: Option<CompletionHandler>,
    step_callback: Option<StepCallback>,
}

#[derive(Clone, Default)]
pub struct PhaseSequencer {
    state: Arc<Mutex<PhaseState>>,
}

impl PhaseSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new phase. Resets the pending count and arms `on_complete`.
    pub fn init_handler<F>(&self, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        state.pending = 0;
        state.more_steps = true;
        state.on_complete = Some(Box::new(on_complete));
        state.step_callback = None;
    }

    /// Submit one step. `operation` receives the handle it must complete
    /// once its asynchronous work is done.
    pub fn do_step<F>(&self, operation: F)
    where
        F: FnOnce(StepHandle),
    {
        self.state.lock().pending += 1;
        operation(StepHandle {
            state: Arc::clone(&self.state),
            completed: false,
        });
    }

    /// Arm a one-shot callback for the very next step completion.
    pub fn set_do_step_callback<C, F>(&self, callback: F, context: C)
    where
        C: Send + 'static,
        F: FnOnce(C, &StepOutcome) + Send + 'static,
    {
        self.state.lock().step_callback =
            Some(Box::new(move |outcome: &StepOutcome| callback(context, outcome)));
    }

    /// No more steps will be submitted for this phase.
    pub fn finalize(&self) {
        let on_complete = {
            let mut state = self.state.lock();
            state.more_steps = false;
            if state.pending == 0 {
                state.on_complete.take()
            } else {
                None
            }
        };

        if let Some(on_complete) = on_complete {
            on_complete();
        }
    }

    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    /// Run one phase: `submit` issues the steps, and the returned future
    /// resolves once all of them have completed.
    pub async fn run_phase<F>(&self, submit: F)
    where
        F: FnOnce(&PhaseSequencer),
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.init_handler(move || {
            let _ = tx.send(());
        });
        submit(self);
        self.finalize();
        // A replaced handler drops the sender; treat that as done too
        let _ = rx.await;
    }
}

/// Completion token for a submitted step. Completing consumes it; dropping
/// it uncompleted counts as an `Abandoned` completion.
pub struct StepHandle {
    state: Arc<Mutex<PhaseState>>,
    completed: bool,
}

impl StepHandle {
    pub fn complete(mut self, outcome: StepOutcome) {
        self.completed = true;
        step_finished(&self.state, outcome);
    }
}

impl Drop for StepHandle {
    fn drop(&mut self) {
        if !self.completed {
            step_finished(&self.state, StepOutcome::Abandoned);
        }
    }
}

fn step_finished(state: &Mutex<PhaseState>, outcome: StepOutcome) {
    // Callbacks run outside the lock; they are free to submit more steps
    let step_callback = state.lock().step_callback.take();
    if let Some(callback) = step_callback {
        callback(&outcome);
    }

    let on_complete = {
        let mut state = state.lock();
        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 && !state.more_steps {
            state.on_complete.take()
        } else {
            None
        }
    };

    if let Some(on_complete) = on_complete {
        on_complete();
    }
}

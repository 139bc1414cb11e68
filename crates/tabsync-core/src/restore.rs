//! Restore execution
//!
//! Drives the browser from the local tab list to the remote one, phase by
//! phase. Every phase is planned against an in-memory model of the local
//! tabs, its steps are issued concurrently through the sequencer, and each
//! step writes its result back into the model before the next phase is
//! planned. A failed step is logged and the pipeline carries on.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use tabsync_tabs::{Tab, TabProvider, WindowId};

use crate::phase::{PhaseSequencer, StepOutcome};
use crate::plan::{
    plan_activation, plan_alignment, plan_deletions, plan_index_moves, plan_window_moves,
    plan_windows, MoveStep,
};

type Model = Arc<Mutex<Vec<Tab>>>;

/// Spawn `work` as one step of the current phase.
fn submit<Fut>(sequencer: &PhaseSequencer, work: Fut)
where
    Fut: Future<Output = StepOutcome> + Send + 'static,
{
    sequencer.do_step(move |handle| {
        tokio::spawn(async move {
            handle.complete(work.await);
        });
    });
}

pub(crate) struct Restore {
    provider: Arc<dyn TabProvider>,
    sequencer: PhaseSequencer,
    debug: bool,
}

impl Restore {
    pub(crate) fn new(provider: Arc<dyn TabProvider>, sequencer: PhaseSequencer, debug: bool) -> Self {
        Self {
            provider,
            sequencer,
            debug,
        }
    }

    /// Run every phase and return the model of the local tabs afterwards.
    pub(crate) async fn run(&self, local: Vec<Tab>, remote: Vec<Tab>) -> Vec<Tab> {
        let model: Model = Arc::new(Mutex::new(local));

        self.create_missing(&model, &remote).await;
        self.delete_surplus(&model, remote.len()).await;
        self.arrange_windows(&model, &remote).await;
        self.move_to_indices(&model, &remote).await;
        self.activate(&model, &remote).await;

        let tabs = model.lock().clone();
        info!(tabs = tabs.len(), "Restore finished");
        tabs
    }

    async fn create_missing(&self, model: &Model, remote: &[Tab]) {
        let creates = plan_alignment(&mut model.lock(), remote);
        if self.debug {
            info!(count = creates.len(), "Restore: creating tabs");
        }

        self.sequencer
            .run_phase(|seq| {
                for step in creates {
                    let provider = Arc::clone(&self.provider);
                    let model = Arc::clone(model);
                    submit(seq, async move {
                        match provider.create(step.seed.clone()).await {
                            Ok(tab) => {
                                debug!(tab_id = %tab.id, url = %tab.url, "Created tab");
                                model.lock()[step.slot] = tab.clone();
                                StepOutcome::CreatedTab(tab)
                            }
                            Err(e) => {
                                warn!(url = %step.seed.url, error = %e, "Failed to create tab");
                                StepOutcome::Failed(e.to_string())
                            }
                        }
                    });
                }
            })
            .await;
    }

    async fn delete_surplus(&self, model: &Model, remote_len: usize) {
        let doomed = plan_deletions(&mut model.lock(), remote_len);
        if self.debug {
            info!(count = doomed.len(), "Restore: removing tabs");
        }

        self.sequencer
            .run_phase(|seq| {
                for id in doomed {
                    let provider = Arc::clone(&self.provider);
                    submit(seq, async move {
                        match provider.remove(id).await {
                            Ok(()) => StepOutcome::Done,
                            Err(e) => {
                                warn!(tab_id = %id, error = %e, "Failed to remove tab");
                                StepOutcome::Failed(e.to_string())
                            }
                        }
                    });
                }
            })
            .await;
    }

    /// Open windows for unmatched remote windows, then move tabs across.
    async fn arrange_windows(&self, model: &Model, remote: &[Tab]) {
        let plan = plan_windows(&model.lock(), remote);
        let mut targets = plan.matched_targets();
        if self.debug {
            info!(
                matched = plan.assignment.matches.len(),
                created = plan.new_windows.len(),
                "Restore: arranging windows"
            );
        }

        // One window per phase, so the step callback unambiguously belongs
        // to the window being created.
        for step in plan.new_windows {
            let created: Arc<Mutex<Option<WindowId>>> = Arc::new(Mutex::new(None));

            self.sequencer
                .run_phase(|seq| {
                    let sink = Arc::clone(&created);
                    seq.set_do_step_callback(
                        |sink: Arc<Mutex<Option<WindowId>>>, outcome: &StepOutcome| {
                            if let StepOutcome::CreatedWindow(window) = outcome {
                                *sink.lock() = Some(*window);
                            }
                        },
                        sink,
                    );

                    let provider = Arc::clone(&self.provider);
                    submit(seq, async move {
                        match provider.create_window(step.seed).await {
                            Ok(window) => StepOutcome::CreatedWindow(window),
                            Err(e) => {
                                warn!(tab_id = %step.seed, error = %e, "Failed to create window");
                                StepOutcome::Failed(e.to_string())
                            }
                        }
                    });
                })
                .await;

            let window = created.lock().take();
            if let Some(window) = window {
                debug!(remote_window = %step.target, window_id = %window, "Opened window");
                targets.insert(step.target, window);
                let mut tabs = model.lock();
                tabs[step.seed_slot].window_id = window;
                tabs[step.seed_slot].index = 0;
            }
        }

        let moves = plan_window_moves(&model.lock(), remote, &targets);
        self.run_moves(model, moves).await;
    }

    async fn move_to_indices(&self, model: &Model, remote: &[Tab]) {
        let moves = plan_index_moves(&model.lock(), remote);
        self.run_moves(model, moves).await;
    }

    async fn run_moves(&self, model: &Model, moves: Vec<MoveStep>) {
        if self.debug {
            info!(count = moves.len(), "Restore: moving tabs");
        }

        self.sequencer
            .run_phase(|seq| {
                for step in moves {
                    let provider = Arc::clone(&self.provider);
                    let model = Arc::clone(model);
                    submit(seq, async move {
                        match provider.move_tab(step.id, step.props).await {
                            Ok(()) => {
                                let mut tabs = model.lock();
                                let tab = &mut tabs[step.slot];
                                tab.index = step.props.index;
                                if let Some(window) = step.props.window_id {
                                    tab.window_id = window;
                                }
                                StepOutcome::Done
                            }
                            Err(e) => {
                                warn!(tab_id = %step.id, error = %e, "Failed to move tab");
                                StepOutcome::Failed(e.to_string())
                            }
                        }
                    });
                }
            })
            .await;
    }

    async fn activate(&self, model: &Model, remote: &[Tab]) {
        let updates = plan_activation(&model.lock(), remote);

        self.sequencer
            .run_phase(|seq| {
                for step in updates {
                    let provider = Arc::clone(&self.provider);
                    let model = Arc::clone(model);
                    submit(seq, async move {
                        match provider.update(step.id, step.active).await {
                            Ok(()) => {
                                if let Some(tab) = model.lock().iter_mut().find(|t| t.id == step.id) {
                                    tab.active = step.active;
                                }
                                StepOutcome::Done
                            }
                            Err(e) => {
                                warn!(tab_id = %step.id, error = %e, "Failed to update tab");
                                StepOutcome::Failed(e.to_string())
                            }
                        }
                    });
                }
            })
            .await;
    }
}

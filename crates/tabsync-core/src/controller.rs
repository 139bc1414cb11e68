//! Reconciliation controller
//!
//! Owns the local and remote session images, the user options and the
//! status, and decides after every change whether to push, pull, or leave
//! things alone. Browser events only schedule a debounced refresh of the
//! local image; remote change notifications patch the remote image in place.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tabsync_session::{codec, diff, session_diff, Session};
use tabsync_storage::{ConfigStore, Record, RemoteChanges, RemoteStore, StorageError};
use tabsync_tabs::{TabEvent, TabProvider};

use crate::config::Config;
use crate::decision::{decide, infer_local_is_newer, Action, Facts};
use crate::error::CoreError;
use crate::options::{OptionsUpdate, SyncOptions, OPTIONS_KEY};
use crate::phase::PhaseSequencer;
use crate::restore::Restore;
use crate::status::{StatusReport, SyncStatus};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
}

/// Everything the controller reacts to, funnelled through one channel.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Tab(TabEvent),
    Remote(RemoteChanges),
}

struct ControllerState {
    lifecycle: Lifecycle,
    options: SyncOptions,
    local: Session,
    remote: Session,
    status: SyncStatus,
    sync_in_progress: bool,
    save_in_progress: bool,
}

/// The pending debounce task. `seq` identifies the latest schedule so a
/// superseded task never clears its successor's handle.
#[derive(Default)]
struct RefreshTimer {
    seq: u64,
    handle: Option<JoinHandle<()>>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub struct SyncController {
    config: Config,
    provider: Arc<dyn TabProvider>,
    remote_store: Arc<dyn RemoteStore>,
    config_store: Arc<dyn ConfigStore>,
    state: Arc<Mutex<ControllerState>>,
    sequencer: PhaseSequencer,
    refresh_timer: Arc<Mutex<RefreshTimer>>,
}

impl SyncController {
    pub fn new(
        config: Config,
        provider: Arc<dyn TabProvider>,
        remote_store: Arc<dyn RemoteStore>,
        config_store: Arc<dyn ConfigStore>,
    ) -> Self {
        let state = ControllerState {
            lifecycle: Lifecycle::Uninitialized,
            options: SyncOptions::default(),
            local: Session::local(config.description.clone()),
            remote: Session::new(""),
            status: SyncStatus::default(),
            sync_in_progress: false,
            save_in_progress: false,
        };

        Self {
            config,
            provider,
            remote_store,
            config_store,
            state: Arc::new(Mutex::new(state)),
            sequencer: PhaseSequencer::new(),
            refresh_timer: Arc::new(Mutex::new(RefreshTimer::default())),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub fn local_session(&self) -> Session {
        self.state.lock().local.clone()
    }

    pub fn remote_session(&self) -> Session {
        self.state.lock().remote.clone()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.lifecycle() != Lifecycle::Ready {
            return Err(CoreError::NotInitialized);
        }
        Ok(())
    }

    /// Load options, fetch the saved session, capture the browser, then
    /// reconcile once. Calling it again after success is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.lifecycle != Lifecycle::Uninitialized {
                return Ok(());
            }
            state.lifecycle = Lifecycle::Initializing;
        }

        if let Err(e) = self.bootstrap().await {
            warn!(error = %e, "Sync initialization failed");
            self.state.lock().lifecycle = Lifecycle::Uninitialized;
            return Err(e);
        }

        self.state.lock().lifecycle = Lifecycle::Ready;
        info!("Sync controller initialized");

        self.reconcile(None).await
    }

    async fn bootstrap(&self) -> Result<()> {
        let options = self.load_options().await?;
        info!(mode = %options.mode, debug = options.debug, "Loaded sync options");
        self.state.lock().options = options;

        self.fetch_remote().await?;

        let tabs = self.provider.query_all().await?;
        let mut state = self.state.lock();
        state.local.accept_refresh(tabs, now_millis());
        debug!(
            generation = state.local.generation,
            tabs = state.local.numtabs(),
            "Captured local session"
        );
        Ok(())
    }

    async fn load_options(&self) -> Result<SyncOptions> {
        let value = match self.config_store.get(OPTIONS_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(SyncOptions::default()),
            Err(StorageError::Json(e)) => {
                warn!(error = %e, "Ignoring unparseable sync options");
                return Ok(SyncOptions::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_value(value) {
            Ok(options) => Ok(options),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable sync options");
                Ok(SyncOptions::default())
            }
        }
    }

    /// Replace the remote image with the store's contents and prune the
    /// keys that do not belong to a session.
    async fn fetch_remote(&self) -> Result<()> {
        let record = self.remote_store.get_all().await?;
        let decoded = codec::decode(&record);
        debug!(
            generation = decoded.session.generation,
            tabs = decoded.session.numtabs(),
            "Fetched remote session"
        );
        self.state.lock().remote = decoded.session;

        if !decoded.obsolete_keys.is_empty() {
            info!(keys = ?decoded.obsolete_keys, "Pruning obsolete remote keys");
            self.remote_store.remove(decoded.obsolete_keys).await?;
        }
        Ok(())
    }

    /// Re-read the browser. A capture identical to the previous one is
    /// dropped; otherwise it becomes a new generation. Either way the
    /// sessions are reconciled afterwards.
    pub async fn refresh_local(&self) -> Result<()> {
        if self.state.lock().sync_in_progress {
            debug!("Local refresh suppressed during restore");
            return Ok(());
        }

        let tabs = self.provider.query_all().await?;
        {
            let mut state = self.state.lock();
            if state.sync_in_progress {
                return Ok(());
            }
            if state.local.accept_refresh(tabs, now_millis()) {
                debug!(
                    generation = state.local.generation,
                    tabs = state.local.numtabs(),
                    "Local session changed"
                );
            }
        }

        self.reconcile(None).await
    }

    fn refresh_delay(&self, urgent: bool) -> Duration {
        let normal = self.config.refresh_delay();
        if urgent {
            normal.min(self.config.urgent_refresh_delay())
        } else {
            normal
        }
    }

    /// (Re)arm the debounced refresh. Must be called from within a tokio
    /// runtime.
    pub fn schedule_refresh(&self, urgent: bool) {
        // Short delay until a baseline exists
        let urgent = urgent || self.state.lock().local.generation <= 1;
        let delay = self.refresh_delay(urgent);

        let mut timer = self.refresh_timer.lock();
        timer.seq += 1;
        let seq = timer.seq;

        let this = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !this.claim_refresh(seq) {
                return;
            }
            if let Err(e) = this.refresh_local().await {
                warn!(error = %e, "Local refresh failed");
            }
        });

        if let Some(previous) = timer.handle.replace(handle) {
            previous.abort();
        }
    }

    /// Clear the pending handle if `seq` is still the latest schedule.
    fn claim_refresh(&self, seq: u64) -> bool {
        let mut timer = self.refresh_timer.lock();
        if timer.seq != seq {
            debug!(seq, latest = timer.seq, "Superseded refresh skipped");
            return false;
        }
        timer.handle = None;
        true
    }

    pub fn on_tab_event(&self, event: TabEvent) {
        debug!(event = ?event, "Tab event");
        self.schedule_refresh(event.is_urgent());
    }

    /// Patch the remote image with externally applied changes. Keys the
    /// image rejects are removed from the store.
    pub async fn on_remote_changed(&self, changes: RemoteChanges) -> Result<()> {
        let record: Record = changes
            .into_iter()
            .filter_map(|(key, change)| change.new_value.map(|value| (key, value)))
            .collect();
        if record.is_empty() {
            return Ok(());
        }

        let rejected = {
            let mut state = self.state.lock();
            codec::apply_updates(&mut state.remote, &record)
        };
        debug!(keys = record.len(), rejected = rejected.len(), "Remote session changed");

        if !rejected.is_empty() {
            self.remote_store.remove(rejected).await?;
        }

        self.schedule_refresh(false);
        Ok(())
    }

    /// Consume events until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<SyncEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SyncEvent::Tab(event) => self.on_tab_event(event),
                SyncEvent::Remote(changes) => {
                    if let Err(e) = self.on_remote_changed(changes).await {
                        warn!(error = %e, "Failed to apply remote changes");
                    }
                }
            }
        }
        info!("Sync event channel closed");
    }

    /// Compare the two images, publish the status, and push or pull as the
    /// mode allows. `local_is_newer` overrides the generation comparison.
    pub async fn reconcile(&self, local_is_newer: Option<bool>) -> Result<()> {
        let mut local_is_newer = local_is_newer;
        let mut adopted = false;

        loop {
            let action = {
                let mut guard = self.state.lock();
                let state = &mut *guard;
                if state.lifecycle != Lifecycle::Ready {
                    return Ok(());
                }

                let first_time = state.local.generation == 1;
                let newer = local_is_newer.unwrap_or_else(|| {
                    infer_local_is_newer(
                        state.options.mode,
                        first_time,
                        state.local.generation,
                        state.remote.generation,
                    )
                });

                let difference = session_diff(&mut state.local, &mut state.remote);
                state.status = SyncStatus::from_diff(&difference);

                let facts = Facts {
                    mode: state.options.mode,
                    first_time,
                    local_is_newer: newer,
                    has_difference: !difference.is_empty(),
                    local_initialized: state.local.is_initialized(),
                    remote_initialized: state.remote.is_initialized(),
                    local_valid: state.local.is_valid(),
                    remote_valid: state.remote.is_valid(),
                };
                let action = decide(&facts);
                debug!(
                    mode = %facts.mode,
                    local_generation = state.local.generation,
                    remote_generation = state.remote.generation,
                    local_is_newer = newer,
                    action = ?action,
                    "Reconciled"
                );
                action
            };

            match action {
                Action::Push => return self.push_local().await,
                Action::Pull => return self.pull_remote().await,
                Action::AdoptLocal if !adopted => {
                    adopted = true;
                    local_is_newer = Some(true);
                    let mut state = self.state.lock();
                    state.remote = state.local.clone();
                }
                Action::AdoptLocal | Action::Defer | Action::Nothing => return Ok(()),
            }
        }
    }

    /// Write the local session to the remote store. A request arriving
    /// while a save is running is dropped.
    pub async fn push_local(&self) -> Result<()> {
        self.ensure_ready()?;

        let (snapshot, previous_numtabs, debug) = {
            let mut state = self.state.lock();
            if state.save_in_progress {
                info!("Save already in progress, dropping request");
                return Ok(());
            }
            if !state.local.is_valid() {
                state.status = SyncStatus::error(diff::LOCAL_NOT_INITIALIZED);
                return Ok(());
            }
            state.save_in_progress = true;
            (
                state.local.clone(),
                state.remote.numtabs(),
                state.options.debug,
            )
        };

        let result = self.write_remote(&snapshot, debug).await;

        {
            let mut state = self.state.lock();
            state.save_in_progress = false;
            match &result {
                Ok(()) => {
                    state.status = SyncStatus::ok(format!("Saved {} tabs", snapshot.numtabs()));
                    state.remote = snapshot.clone();
                }
                Err(e) => state.status = SyncStatus::error(e.to_string()),
            }
        }

        if result.is_ok() {
            info!(
                generation = snapshot.generation,
                tabs = snapshot.numtabs(),
                "Saved local session"
            );
            let stale = codec::stale_tab_keys(previous_numtabs, snapshot.numtabs());
            if !stale.is_empty() {
                if let Err(e) = self.remote_store.remove(stale).await {
                    warn!(error = %e, "Failed to prune stale tab keys");
                }
            }
        }
        result
    }

    async fn write_remote(&self, snapshot: &Session, debug: bool) -> Result<()> {
        let record = codec::encode(snapshot)?;
        if debug {
            info!(record = ?record, "Pushing session");
        }
        self.remote_store.set_all(record).await?;
        Ok(())
    }

    /// Make the browser match the remote session. A request arriving while
    /// a restore is running is dropped.
    pub async fn pull_remote(&self) -> Result<()> {
        self.ensure_ready()?;

        let (local_tabs, remote_tabs, debug) = {
            let mut state = self.state.lock();
            if state.sync_in_progress {
                info!("Restore already in progress, dropping request");
                return Ok(());
            }
            if !state.remote.is_valid() || state.remote.tabs.is_empty() {
                state.status = SyncStatus::error(diff::NO_SAVED_TABS);
                return Ok(());
            }
            state.sync_in_progress = true;
            (
                state.local.tabs.clone(),
                state.remote.tabs.clone(),
                state.options.debug,
            )
        };

        info!(
            local = local_tabs.len(),
            remote = remote_tabs.len(),
            "Restoring remote session"
        );
        let restore = Restore::new(Arc::clone(&self.provider), self.sequencer.clone(), debug);
        let restored = restore.run(local_tabs, remote_tabs).await;

        {
            let mut state = self.state.lock();
            state.sync_in_progress = false;
            state.status = SyncStatus::ok(format!("Restored {} tabs", restored.len()));
        }

        self.schedule_refresh(true);
        Ok(())
    }

    /// Apply a partial options change. An unknown mode is rejected without
    /// touching the current options; a mode change triggers a reconcile.
    pub async fn set_options(&self, update: OptionsUpdate) -> Result<SyncOptions> {
        let current = self.state.lock().options.clone();
        let next = current.merged(&update)?;
        if next == current {
            return Ok(next);
        }

        self.config_store
            .set(OPTIONS_KEY, serde_json::to_value(&next)?)
            .await?;
        self.state.lock().options = next.clone();
        info!(mode = %next.mode, debug = next.debug, "Sync options changed");

        if next.mode != current.mode && self.lifecycle() == Lifecycle::Ready {
            self.reconcile(None).await?;
        }
        Ok(next)
    }

    pub fn get_status(&self) -> StatusReport {
        let state = self.state.lock();
        StatusReport {
            options: state.options.clone(),
            sync: state.status.clone(),
            remote_timestamp: state.remote.update_time,
        }
    }
}

impl Clone for SyncController {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            provider: Arc::clone(&self.provider),
            remote_store: Arc::clone(&self.remote_store),
            config_store: Arc::clone(&self.config_store),
            state: Arc::clone(&self.state),
            sequencer: self.sequencer.clone(),
            refresh_timer: Arc::clone(&self.refresh_timer),
        }
    }
}

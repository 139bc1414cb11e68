//! In-memory stand-ins for the browser and the remote store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tabsync_storage::{Record, RemoteStore, StorageError};
use tabsync_tabs::{MoveProperties, Tab, TabError, TabId, TabProvider, TabSeed, WindowId};

struct BrowserState {
    tabs: Vec<Tab>,
    next_tab: i64,
    next_window: i64,
}

impl BrowserState {
    /// Sort by window then index and close any index gaps.
    fn normalize(&mut self) {
        self.tabs.sort_by_key(|t| (t.window_id, t.index));
        let mut current = None;
        let mut index = 0;
        for tab in &mut self.tabs {
            if current != Some(tab.window_id) {
                current = Some(tab.window_id);
                index = 0;
            }
            tab.index = index;
            index += 1;
        }
    }

    /// Make room at `index` in `window` and return the clamped index.
    fn open_slot(&mut self, window: WindowId, index: i64) -> i64 {
        let len = self.tabs.iter().filter(|t| t.window_id == window).count() as i64;
        let index = index.clamp(0, len);
        for tab in self.tabs.iter_mut().filter(|t| t.window_id == window) {
            if tab.index >= index {
                tab.index += 1;
            }
        }
        index
    }

    fn position(&self, id: TabId) -> tabsync_tabs::Result<usize> {
        self.tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or(TabError::NotFound(id))
    }
}

pub(crate) struct FakeBrowser {
    state: Mutex<BrowserState>,
    failing_urls: Mutex<HashSet<String>>,
    focus_on_create: AtomicBool,
    queries: AtomicUsize,
}

impl FakeBrowser {
    /// `windows` lists the URLs of each window; the first tab of each
    /// window is its active one.
    pub(crate) fn new(windows: &[&[&str]]) -> Self {
        let mut tabs = Vec::new();
        let mut next_tab = 1;
        for (w, urls) in windows.iter().enumerate() {
            for (i, url) in urls.iter().enumerate() {
                tabs.push(Tab {
                    url: url.to_string(),
                    index: i as i64,
                    id: TabId::new(next_tab),
                    window_id: WindowId::new(w as i64 + 1),
                    active: i == 0,
                    title: String::new(),
                });
                next_tab += 1;
            }
        }

        Self {
            state: Mutex::new(BrowserState {
                tabs,
                next_tab,
                next_window: windows.len() as i64 + 1,
            }),
            failing_urls: Mutex::new(HashSet::new()),
            focus_on_create: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fail_create(&self, url: &str) {
        self.failing_urls.lock().insert(url.to_string());
    }

    /// New tabs take focus in their window, as real browsers do.
    pub(crate) fn focus_new_tabs(&self) {
        self.focus_on_create.store(true, Ordering::SeqCst);
    }

    /// (url, active) per tab, in window then index order.
    pub(crate) fn focus(&self) -> Vec<(String, bool)> {
        self.tabs().into_iter().map(|t| (t.url, t.active)).collect()
    }

    /// A tab opened by the user at the end of the first window.
    pub(crate) fn open_external(&self, url: &str) {
        let mut state = self.state.lock();
        let window = state.tabs.first().map(|t| t.window_id).unwrap_or(WindowId::new(1));
        let id = TabId::new(state.next_tab);
        state.next_tab += 1;
        state.tabs.push(Tab {
            url: url.to_string(),
            index: i64::MAX,
            id,
            window_id: window,
            active: false,
            title: String::new(),
        });
        state.normalize();
    }

    /// URLs per window, windows in id order.
    pub(crate) fn layout(&self) -> Vec<Vec<String>> {
        let mut state = self.state.lock();
        state.normalize();
        let mut windows: Vec<Vec<String>> = Vec::new();
        let mut current = None;
        for tab in &state.tabs {
            if current != Some(tab.window_id) {
                current = Some(tab.window_id);
                windows.push(Vec::new());
            }
            if let Some(window) = windows.last_mut() {
                window.push(tab.url.clone());
            }
        }
        windows
    }

    pub(crate) fn tabs(&self) -> Vec<Tab> {
        let mut state = self.state.lock();
        state.normalize();
        state.tabs.clone()
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabProvider for FakeBrowser {
    async fn query_all(&self) -> tabsync_tabs::Result<Vec<Tab>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.tabs())
    }

    async fn create(&self, seed: TabSeed) -> tabsync_tabs::Result<Tab> {
        if self.failing_urls.lock().contains(&seed.url) {
            return Err(TabError::Provider(format!("cannot open {}", seed.url)));
        }

        let mut state = self.state.lock();
        let window = state
            .tabs
            .iter()
            .map(|t| t.window_id)
            .min()
            .unwrap_or(WindowId::new(1));
        let index = state.open_slot(window, seed.index);
        let id = TabId::new(state.next_tab);
        state.next_tab += 1;

        let focus = self.focus_on_create.load(Ordering::SeqCst);
        if focus {
            for tab in state.tabs.iter_mut().filter(|t| t.window_id == window) {
                tab.active = false;
            }
        }
        let tab = Tab {
            url: seed.url,
            index,
            id,
            window_id: window,
            active: focus,
            title: String::new(),
        };
        state.tabs.push(tab.clone());
        state.normalize();
        Ok(tab)
    }

    async fn remove(&self, id: TabId) -> tabsync_tabs::Result<()> {
        let mut state = self.state.lock();
        let position = state.position(id)?;
        state.tabs.remove(position);
        state.normalize();
        Ok(())
    }

    async fn move_tab(&self, id: TabId, props: MoveProperties) -> tabsync_tabs::Result<()> {
        let mut state = self.state.lock();
        let position = state.position(id)?;
        let mut tab = state.tabs.remove(position);
        state.normalize();

        let window = props.window_id.unwrap_or(tab.window_id);
        tab.index = state.open_slot(window, props.index);
        tab.window_id = window;
        state.tabs.push(tab);
        state.normalize();
        Ok(())
    }

    async fn update(&self, id: TabId, active: bool) -> tabsync_tabs::Result<()> {
        let mut state = self.state.lock();
        let position = state.position(id)?;
        let window = state.tabs[position].window_id;
        if active {
            for tab in state.tabs.iter_mut().filter(|t| t.window_id == window) {
                tab.active = false;
            }
        }
        state.tabs[position].active = active;
        Ok(())
    }

    async fn create_window(&self, seed: TabId) -> tabsync_tabs::Result<WindowId> {
        let mut state = self.state.lock();
        let position = state.position(seed)?;
        let window = WindowId::new(state.next_window);
        state.next_window += 1;

        let tab = &mut state.tabs[position];
        tab.window_id = window;
        tab.index = 0;
        tab.active = true;
        state.normalize();
        Ok(window)
    }
}

#[derive(Default)]
pub(crate) struct MemoryRemoteStore {
    record: Mutex<Record>,
    fail_writes: AtomicBool,
    removed: Mutex<Vec<String>>,
}

impl MemoryRemoteStore {
    pub(crate) fn with_record(record: Record) -> Self {
        Self {
            record: Mutex::new(record),
            ..Default::default()
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn record(&self) -> Record {
        self.record.lock().clone()
    }

    pub(crate) fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_all(&self) -> tabsync_storage::Result<Record> {
        Ok(self.record())
    }

    async fn set_all(&self, record: Record) -> tabsync_storage::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Remote("quota exceeded".to_string()));
        }
        self.record.lock().extend(record);
        Ok(())
    }

    async fn remove(&self, keys: Vec<String>) -> tabsync_storage::Result<()> {
        let mut record = self.record.lock();
        for key in keys {
            record.remove(&key);
            self.removed.lock().push(key);
        }
        Ok(())
    }
}

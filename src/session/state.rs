//! A single project's analysis session: refresh lock, cached outcome and
//! completion listeners.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::analysis::{analyze_project, AnalysisOutcome, AnalysisResult, RunSummary};
use crate::config::project::absolute_root;
use crate::config::{ConfigOverrides, ProjectConfig};

/// Callback invoked after every completed refresh.
pub type Listener = Box<dyn Fn(&RunSummary) + Send + Sync>;

/// Holds the refresh flag for as long as it lives.
struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Analysis state for one project root.
///
/// At most one refresh runs at a time. A refresh requested while another is
/// in flight is dropped; the running one will notify listeners when done.
///
/// # Example
///
/// ```no_run
/// use exportscope::config::ConfigOverrides;
/// use exportscope::session::AnalysisSession;
///
/// let session = AnalysisSession::new("./my-app", ConfigOverrides::default());
/// session.subscribe(|summary| println!("{} files analyzed", summary.files_processed));
/// session.refresh();
/// println!("{} files with unused exports", session.unused_exports().len());
/// ```
pub struct AnalysisSession {
    root: PathBuf,
    overrides: ConfigOverrides,
    refreshing: AtomicBool,
    outcome: RwLock<Arc<AnalysisOutcome>>,
    listeners: RwLock<Vec<Listener>>,
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("root", &self.root)
            .field("refreshing", &self.is_refreshing())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl AnalysisSession {
    /// Creates a session. Nothing is analyzed until the first refresh.
    pub fn new(root: impl AsRef<Path>, overrides: ConfigOverrides) -> Self {
        Self {
            root: absolute_root(root.as_ref()),
            overrides,
            refreshing: AtomicBool::new(false),
            outcome: RwLock::new(Arc::new(AnalysisOutcome::default())),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn overrides(&self) -> &ConfigOverrides {
        &self.overrides
    }

    /// Returns true while a refresh is running.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Registers a listener called after each completed refresh.
    pub fn subscribe(&self, listener: impl Fn(&RunSummary) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    /// Recomputes everything on the calling thread.
    ///
    /// Returns false without doing any work when a refresh is already in
    /// flight. Configuration is re-read on every run.
    pub fn refresh(&self) -> bool {
        let Some(guard) = RefreshGuard::acquire(&self.refreshing) else {
            debug!(root = %self.root.display(), "refresh already in flight, dropping request");
            return false;
        };

        let config = ProjectConfig::load(&self.root, &self.overrides);
        let outcome = analyze_project(&config);
        let summary = outcome.summary.clone();
        *self.outcome.write() = Arc::new(outcome);

        // Listeners must see the session as idle.
        drop(guard);
        self.notify(&summary);
        true
    }

    /// Runs [`AnalysisSession::refresh`] on a background thread.
    ///
    /// Returns `None` if a refresh is already running or the thread could not
    /// be started. The handle yields the value of `refresh`.
    pub fn spawn_refresh(self: &Arc<Self>) -> Option<thread::JoinHandle<bool>> {
        if self.is_refreshing() {
            debug!(root = %self.root.display(), "refresh already in flight, not spawning");
            return None;
        }
        let session = Arc::clone(self);
        thread::Builder::new()
            .name("exportscope-refresh".to_string())
            .spawn(move || session.refresh())
            .map_err(|err| warn!(%err, "failed to spawn refresh thread"))
            .ok()
    }

    fn notify(&self, summary: &RunSummary) {
        for listener in self.listeners.read().iter() {
            listener(summary);
        }
    }

    /// The last completed outcome.
    pub fn outcome(&self) -> Arc<AnalysisOutcome> {
        Arc::clone(&self.outcome.read())
    }

    /// All results of the last run, sorted by file.
    pub fn results(&self) -> Vec<AnalysisResult> {
        self.outcome().results.clone()
    }

    /// Entries with a non-empty not-used list.
    pub fn unused_exports(&self) -> Vec<AnalysisResult> {
        self.outcome().unused_exports()
    }

    /// Entries with a non-empty cycle chain.
    pub fn circular_imports(&self) -> Vec<AnalysisResult> {
        self.outcome().circular_imports()
    }

    pub fn summary(&self) -> RunSummary {
        self.outcome().summary.clone()
    }
}

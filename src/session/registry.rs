//! Registry of analysis sessions keyed by project root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::debug;

use super::state::AnalysisSession;
use crate::analysis::FileId;
use crate::config::project::absolute_root;
use crate::config::ConfigOverrides;

/// Owns one [`AnalysisSession`] per project root. Sessions share nothing.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    overrides: ConfigOverrides,
    sessions: RwLock<BTreeMap<FileId, Arc<AnalysisSession>>>,
}

impl SessionRegistry {
    /// Creates a registry whose new sessions use `overrides`.
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    fn key(root: &Path) -> FileId {
        FileId::new(absolute_root(root))
    }

    /// Returns the session for `root`, creating it on first use.
    pub fn session(&self, root: impl AsRef<Path>) -> Arc<AnalysisSession> {
        let key = Self::key(root.as_ref());
        if let Some(session) = self.sessions.read().get(&key) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write();
        let session = sessions.entry(key).or_insert_with(|| {
            debug!(root = %root.as_ref().display(), "creating analysis session");
            Arc::new(AnalysisSession::new(root.as_ref(), self.overrides.clone()))
        });
        Arc::clone(session)
    }

    pub fn get(&self, root: impl AsRef<Path>) -> Option<Arc<AnalysisSession>> {
        self.sessions.read().get(&Self::key(root.as_ref())).cloned()
    }

    /// Removes and returns the session for `root`. A refresh already running
    /// on it completes normally.
    pub fn remove(&self, root: impl AsRef<Path>) -> Option<Arc<AnalysisSession>> {
        self.sessions.write().remove(&Self::key(root.as_ref()))
    }

    /// Registered roots in sorted order.
    pub fn roots(&self) -> Vec<PathBuf> {
        self.sessions
            .read()
            .values()
            .map(|session| session.root().to_path_buf())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Refreshes every session in parallel. Returns how many actually ran.
    pub fn refresh_all(&self) -> usize {
        let sessions: Vec<Arc<AnalysisSession>> = self.sessions.read().values().cloned().collect();
        sessions
            .par_iter()
            .filter(|session| session.refresh())
            .count()
    }
}

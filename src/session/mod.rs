//! Analysis orchestration and caching.
//!
//! An [`AnalysisSession`] owns the refresh lock, the cached outcome and the
//! listeners of one project root. A [`SessionRegistry`] maps roots to
//! sessions so several projects can be analyzed side by side.

mod registry;
mod state;

pub use registry::SessionRegistry;
pub use state::{AnalysisSession, Listener};

//! Terminal UI for browsing analysis findings
//!
//! Shows unused exports and circular imports as a collapsible tree with
//! fuzzy search. `r` re-runs the analysis through the session.

mod app;
pub mod tree;

pub use app::{run_app, App, VirtualScrollState};
pub use tree::{NodeKind, TreeNode};

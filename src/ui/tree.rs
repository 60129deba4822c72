//! Tree data structures for the findings browser
//!
//! `TreeNode` holds the two finding sections as a hierarchy and
//! `FlattenedNode` is one visible row of it in the TUI.

use std::path::Path;

use crate::analysis::AnalysisOutcome;

/// What a row in the tree represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Section,
    /// A file with unused exports
    UnusedFile { completely_unused: bool },
    /// One unused export name
    Export,
    /// A file anchoring a circular import chain
    CycleFile,
    /// A file further along a chain
    CycleMember,
}

/// A node in the findings tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Display text, a relative path or an export name
    pub label: String,
    /// Short annotation shown after the label
    pub detail: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
    /// Whether this node is expanded in the UI
    pub expanded: bool,
    /// Depth in the tree (0 = root)
    pub depth: usize,
}

impl TreeNode {
    pub fn new(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            detail: String::new(),
            kind,
            children: Vec::new(),
            expanded: false,
            depth: 0,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Builds the full tree for one analysis outcome. The root and both
    /// sections start expanded, files start collapsed.
    pub fn from_outcome(project_name: &str, root: &Path, outcome: &AnalysisOutcome) -> Self {
        let unused = outcome.unused_exports();
        let cycles = outcome.circular_imports();

        let mut unused_section = TreeNode::new("Unused exports", NodeKind::Section)
            .with_detail(format!("{} files", unused.len()));
        for result in &unused {
            let detail = if result.is_completely_unused {
                "completely unused".to_string()
            } else {
                format!("{} unused", result.not_used_exports.len())
            };
            let mut file = TreeNode::new(
                result.file.display_relative(root),
                NodeKind::UnusedFile {
                    completely_unused: result.is_completely_unused,
                },
            )
            .with_detail(detail);
            for name in &result.not_used_exports {
                file.add_child(TreeNode::new(name.clone(), NodeKind::Export));
            }
            unused_section.add_child(file);
        }

        let mut cycle_section = TreeNode::new("Circular imports", NodeKind::Section)
            .with_detail(format!("{} chains", cycles.len()));
        for result in &cycles {
            let chain = result.circular_import_chain.as_deref().unwrap_or_default();
            let mut file = TreeNode::new(result.file.display_relative(root), NodeKind::CycleFile)
                .with_detail(format!("cycle of {}", chain.len() + 1));
            for member in chain {
                file.add_child(TreeNode::new(
                    member.display_relative(root),
                    NodeKind::CycleMember,
                ));
            }
            cycle_section.add_child(file);
        }

        unused_section.expanded = true;
        cycle_section.expanded = true;

        let mut tree = TreeNode::new(project_name, NodeKind::Root).with_detail(format!(
            "{} files, {} unused exports, {} cycles",
            outcome.summary.files_processed,
            outcome.summary.not_used_export_count,
            outcome.summary.circular_import_count
        ));
        tree.add_child(unused_section);
        tree.add_child(cycle_section);
        tree.expanded = true;
        tree
    }

    /// Add a child node, fixing up the depth of its whole subtree
    pub fn add_child(&mut self, mut child: TreeNode) {
        child.set_depth(self.depth + 1);
        self.children.push(child);
    }

    fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
        for child in &mut self.children {
            child.set_depth(depth + 1);
        }
    }

    /// Toggle the expanded state
    pub fn toggle_expanded(&mut self) {
        if !self.children.is_empty() {
            self.expanded = !self.expanded;
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Flatten the tree into a list for rendering
    ///
    /// Only includes nodes that are visible (i.e., all ancestors are expanded)
    pub fn flatten(&self) -> Vec<FlattenedNode> {
        let mut result = Vec::new();
        self.flatten_recursive(&mut result, true);
        result
    }

    fn flatten_recursive(&self, result: &mut Vec<FlattenedNode>, is_last: bool) {
        result.push(FlattenedNode {
            label: self.label.clone(),
            detail: self.detail.clone(),
            kind: self.kind,
            depth: self.depth,
            is_expanded: self.expanded,
            has_children: self.has_children(),
            is_last_child: is_last,
        });

        if self.expanded {
            let child_count = self.children.len();
            for (i, child) in self.children.iter().enumerate() {
                child.flatten_recursive(result, i == child_count - 1);
            }
        }
    }

    /// Find a node at a given flattened index and toggle its expansion
    ///
    /// Returns true if the toggle was successful
    pub fn toggle_at_index(&mut self, target_index: usize) -> bool {
        let mut current_index = 0;
        self.toggle_at_index_recursive(target_index, &mut current_index)
    }

    fn toggle_at_index_recursive(
        &mut self,
        target_index: usize,
        current_index: &mut usize,
    ) -> bool {
        if *current_index == target_index {
            self.toggle_expanded();
            return true;
        }
        *current_index += 1;

        if self.expanded {
            for child in &mut self.children {
                if child.toggle_at_index_recursive(target_index, current_index) {
                    return true;
                }
            }
        }
        false
    }
}

/// A flattened representation of a tree node for rendering
#[derive(Debug, Clone)]
pub struct FlattenedNode {
    pub label: String,
    pub detail: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub is_expanded: bool,
    pub has_children: bool,
    /// Whether this is the last child of its parent
    pub is_last_child: bool,
}

impl FlattenedNode {
    /// Get the expansion indicator character
    pub fn expansion_indicator(&self) -> &'static str {
        if !self.has_children {
            "  "
        } else if self.is_expanded {
            "▼ "
        } else {
            "▶ "
        }
    }

    /// Build the tree prefix (indentation and branch lines)
    ///
    /// `ancestors_are_last[i]` tells whether the ancestor at depth `i + 1`
    /// was the last child of its parent.
    pub fn tree_prefix(&self, ancestors_are_last: &[bool]) -> String {
        let mut prefix = String::new();

        for level in 0..self.depth.saturating_sub(1) {
            match ancestors_are_last.get(level) {
                Some(false) => prefix.push_str("│   "),
                _ => prefix.push_str("    "),
            }
        }

        if self.depth > 0 {
            if self.is_last_child {
                prefix.push_str("└── ");
            } else {
                prefix.push_str("├── ");
            }
        }

        prefix
    }
}

//! Circular import detection over the file relation graph.
//!
//! Detection runs in three steps:
//!
//! 1. **Pruning**: files that cannot take part in a cycle worth reporting are
//!    removed until a fixed point. A file survives only while at least one
//!    of its exports is used and it imports at least one other live file.
//! 2. **Enumeration**: an iterative depth-first walk with white/grey/black
//!    marking over a petgraph arena. Reaching a grey node closes a cycle.
//!    Every edge is followed once, so each edge belongs to at most one
//!    reported cycle.
//! 3. **Attachment**: each cycle is attached to its first node (the anchor)
//!    as the chain of the remaining nodes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, trace};

use crate::analysis::types::{AnalysisResult, FileId, FileRelation};

/// One discovered import cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// Files in import order. The last one imports the first.
    pub nodes: Vec<FileId>,
}

impl CycleInfo {
    /// Returns a formatted string representation of the cycle path.
    ///
    /// For example: "a.ts -> b.ts -> a.ts"
    pub fn cycle_path(&self) -> String {
        if self.nodes.is_empty() {
            return String::new();
        }
        let mut path = self
            .nodes
            .iter()
            .map(FileId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        path.push_str(" -> ");
        path.push_str(self.nodes[0].as_str());
        path
    }

    /// Returns the number of files in the cycle.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the cycle is empty (should not happen in practice).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The file the cycle is reported on.
    pub fn anchor(&self) -> Option<&FileId> {
        self.nodes.first()
    }

    /// The cycle without its anchor.
    pub fn chain(&self) -> &[FileId] {
        self.nodes.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for CycleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cycle_path())
    }
}

/// Removes files that cannot be part of a reportable cycle, repeating until
/// nothing changes. Import edges to removed files are dropped from the
/// survivors.
pub fn prune_relations(relations: &[FileRelation]) -> Vec<FileRelation> {
    let mut live: HashSet<&FileId> = relations.iter().map(|r| &r.file).collect();
    let mut pass = 0;
    loop {
        pass += 1;
        let dead: Vec<&FileId> = relations
            .iter()
            .filter(|r| live.contains(&r.file))
            .filter(|r| !is_live(r, &live))
            .map(|r| &r.file)
            .collect();
        if dead.is_empty() {
            break;
        }
        trace!(pass, removed = dead.len(), "pruning pass");
        for file in dead {
            live.remove(file);
        }
    }
    debug!(passes = pass, remaining = live.len(), "pruned relation graph");

    relations
        .iter()
        .filter(|r| live.contains(&r.file))
        .map(|r| {
            let mut pruned = r.clone();
            pruned.imports.retain(|target, _| live.contains(target));
            pruned
        })
        .collect()
}

/// A file stays while some export of it is used and it still imports another
/// live file.
fn is_live(relation: &FileRelation, live: &HashSet<&FileId>) -> bool {
    relation.has_used_exports()
        && relation
            .imports
            .keys()
            .any(|target| *target != relation.file && live.contains(target))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Import graph over the (pruned) relation set.
///
/// Nodes are inserted in file order and adjacency lists are sorted, so the
/// walk and its output are deterministic.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    graph: DiGraph<FileId, ()>,
    node_indices: HashMap<FileId, NodeIndex>,
}

impl ImportGraph {
    /// Builds the graph. Edges to files outside `relations` and self edges
    /// are not represented.
    pub fn from_relations(relations: &[FileRelation]) -> Self {
        let mut sorted: Vec<&FileRelation> = relations.iter().collect();
        sorted.sort_by(|a, b| a.file.cmp(&b.file));

        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();
        for relation in &sorted {
            node_indices
                .entry(relation.file.clone())
                .or_insert_with(|| graph.add_node(relation.file.clone()));
        }
        for relation in &sorted {
            let from = node_indices[&relation.file];
            for target in relation.imports.keys() {
                if let Some(&to) = node_indices.get(target) {
                    if to != from && !graph.contains_edge(from, to) {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.node_indices.contains_key(file)
    }

    fn sorted_adjacency(&self) -> Vec<Vec<NodeIndex>> {
        self.graph
            .node_indices()
            .map(|node| {
                let mut next: Vec<NodeIndex> = self.graph.neighbors(node).collect();
                next.sort();
                next.dedup();
                next
            })
            .collect()
    }

    /// Enumerates cycles with an iterative white/grey/black depth-first walk.
    pub fn find_cycles(&self) -> Vec<CycleInfo> {
        let adjacency = self.sorted_adjacency();
        let mut marks = vec![Mark::White; adjacency.len()];
        let mut cycles = Vec::new();

        for start in self.graph.node_indices() {
            if marks[start.index()] != Mark::White {
                continue;
            }

            // (node, index of the next neighbour to visit)
            let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];
            marks[start.index()] = Mark::Grey;

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let Some(&next) = adjacency[node.index()].get(top.1) else {
                    marks[node.index()] = Mark::Black;
                    stack.pop();
                    continue;
                };
                top.1 += 1;

                match marks[next.index()] {
                    Mark::White => {
                        marks[next.index()] = Mark::Grey;
                        stack.push((next, 0));
                    }
                    Mark::Grey if next != node => {
                        if let Some(pos) = stack.iter().position(|&(n, _)| n == next) {
                            let nodes = stack[pos..]
                                .iter()
                                .map(|&(n, _)| self.graph[n].clone())
                                .collect();
                            cycles.push(CycleInfo { nodes });
                        }
                    }
                    _ => {}
                }
            }
        }

        cycles
    }
}

/// Output of [`CircularDetector::detect`].
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub results: Vec<AnalysisResult>,
    pub cycles: Vec<CycleInfo>,
}

impl Detection {
    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }
}

/// Finds circular imports and attaches them to analysis results.
#[derive(Debug, Clone, Copy)]
pub struct CircularDetector {
    enabled: bool,
}

impl CircularDetector {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Detects cycles in `relations` and attaches each one to its anchor's
    /// result, creating an empty result for anchors that have none. An
    /// anchor keeps the first chain attached to it; every cycle is counted.
    ///
    /// When disabled, `results` is returned unchanged with no cycles.
    pub fn detect(&self, relations: &[FileRelation], results: Vec<AnalysisResult>) -> Detection {
        if !self.enabled {
            return Detection {
                results,
                cycles: Vec::new(),
            };
        }

        let pruned = prune_relations(relations);
        let graph = ImportGraph::from_relations(&pruned);
        let cycles = graph.find_cycles();
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            cycles = cycles.len(),
            "circular import detection finished"
        );

        let mut by_file: BTreeMap<FileId, AnalysisResult> = results
            .into_iter()
            .map(|result| (result.file.clone(), result))
            .collect();

        for cycle in &cycles {
            let Some(anchor) = cycle.anchor() else {
                continue;
            };
            let result = by_file
                .entry(anchor.clone())
                .or_insert_with(|| AnalysisResult::new(anchor.clone()));
            if result.circular_import_chain.is_some() {
                debug!(anchor = %anchor, cycle = %cycle, "anchor already has a chain");
                continue;
            }
            result.circular_import_chain = Some(cycle.chain().to_vec());
        }

        Detection {
            results: by_file.into_values().collect(),
            cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> FileId {
        FileId::new(format!("/p/{name}.ts"))
    }

    /// Builds a relation: `imports` are (target, symbols), `used`/`unused` are export names.
    fn relation(
        name: &str,
        imports: &[(&str, &[&str])],
        used: &[&str],
        unused: &[&str],
    ) -> FileRelation {
        let mut relation = FileRelation::new(id(name));
        for (target, symbols) in imports {
            relation
                .imports
                .insert(id(target), symbols.iter().map(|s| s.to_string()).collect());
        }
        relation.exports_used = used.iter().map(|s| s.to_string()).collect();
        relation.exports_not_used = unused.iter().map(|s| s.to_string()).collect();
        relation
    }

    fn names(files: &[FileId]) -> Vec<&str> {
        files.iter().map(FileId::as_str).collect()
    }

    #[test]
    fn test_cycle_info_path() {
        let cycle = CycleInfo {
            nodes: vec![id("a"), id("b"), id("c")],
        };
        assert_eq!(cycle.cycle_path(), "/p/a.ts -> /p/b.ts -> /p/c.ts -> /p/a.ts");
        assert_eq!(cycle.anchor(), Some(&id("a")));
        assert_eq!(cycle.chain(), &[id("b"), id("c")]);
    }

    #[test]
    fn test_cycle_info_empty() {
        let cycle = CycleInfo { nodes: vec![] };
        assert!(cycle.is_empty());
        assert_eq!(cycle.len(), 0);
        assert_eq!(cycle.cycle_path(), "");
        assert!(cycle.chain().is_empty());
    }

    #[test]
    fn test_two_file_cycle_reported_once() {
        let relations = vec![
            relation("a", &[("b", &["y"])], &["x"], &[]),
            relation("b", &[("a", &["x"])], &["y"], &[]),
        ];
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 1);
        assert_eq!(detection.results.len(), 1);
        assert_eq!(detection.results[0].file, id("a"));
        assert_eq!(
            names(detection.results[0].circular_import_chain.as_ref().unwrap()),
            vec!["/p/b.ts"]
        );
    }

    #[test]
    fn test_three_file_cycle() {
        let relations = vec![
            relation("a", &[("b", &["b"])], &["a"], &[]),
            relation("b", &[("c", &["c"])], &["b"], &[]),
            relation("c", &[("a", &["a"])], &["c"], &[]),
        ];
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 1);
        let chain = detection.results[0].circular_import_chain.as_ref().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(names(chain), vec!["/p/b.ts", "/p/c.ts"]);
    }

    #[test]
    fn test_self_import_is_not_a_cycle() {
        let relations = vec![relation("a", &[("a", &["x"])], &["x"], &[])];
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 0);
        assert!(detection.results.is_empty());
    }

    #[test]
    fn test_pruning_removes_cycle_with_dead_participant() {
        // b imports a, but nothing uses a's only export.
        let relations = vec![
            relation("a", &[("b", &["y"])], &[], &["x"]),
            relation("b", &[("a", &["other"])], &["y"], &[]),
        ];
        let pruned = prune_relations(&relations);
        assert!(pruned.is_empty());

        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 0);
    }

    #[test]
    fn test_pruning_keeps_only_live_pair() {
        // c imports a but none of its own exports is used.
        let relations = vec![
            relation("a", &[("b", &["b"])], &["a"], &[]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
            relation("c", &[("a", &["a"])], &[], &["c"]),
        ];
        let pruned = prune_relations(&relations);
        let files: Vec<&FileId> = pruned.iter().map(|r| &r.file).collect();
        assert_eq!(files, vec![&id("a"), &id("b")]);
    }

    #[test]
    fn test_pruning_drops_edges_to_removed_files() {
        let relations = vec![
            relation("a", &[("b", &["b"]), ("leaf", &["l"])], &["a"], &[]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
            relation("leaf", &[], &["l"], &[]),
        ];
        let pruned = prune_relations(&relations);
        assert_eq!(pruned.len(), 2);
        assert!(!pruned[0].imports.contains_key(&id("leaf")));
    }

    #[test]
    fn test_pruning_uses_export_flags_not_importer_symbols() {
        // a's export is used only by c, which is pruned, and b reaches a
        // through a side-effect import. Both keep their used exports.
        let relations = vec![
            relation("a", &[("b", &["b"])], &["x"], &[]),
            relation("b", &[("a", &[])], &["b"], &[]),
            relation("c", &[("a", &["x"])], &[], &["c"]),
        ];
        let pruned = prune_relations(&relations);
        let files: Vec<&FileId> = pruned.iter().map(|r| &r.file).collect();
        assert_eq!(files, vec![&id("a"), &id("b")]);

        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 1);
        assert_eq!(detection.results[0].file, id("a"));
    }

    #[test]
    fn test_wildcard_import_keeps_file_alive() {
        let relations = vec![
            relation("a", &[("b", &["*"])], &["a"], &[]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
        ];
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 1);
    }

    #[test]
    fn test_disjoint_cycles_reported_independently() {
        let relations = vec![
            relation("a", &[("b", &["b"])], &["a"], &[]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
            relation("c", &[("d", &["d"])], &["c"], &[]),
            relation("d", &[("c", &["c"])], &["d"], &[]),
        ];
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 2);
        let anchors: Vec<&FileId> = detection.results.iter().map(|r| &r.file).collect();
        assert_eq!(anchors, vec![&id("a"), &id("c")]);
    }

    #[test]
    fn test_chain_added_alongside_unused_exports() {
        let relations = vec![
            relation("a", &[("b", &["b"])], &["a"], &["extra"]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
        ];
        let mut existing = AnalysisResult::new(id("a"));
        existing.not_used_exports = vec!["extra".to_string()];
        let detection = CircularDetector::new(true).detect(&relations, vec![existing]);
        assert_eq!(detection.results.len(), 1);
        assert_eq!(detection.results[0].not_used_exports, vec!["extra"]);
        assert!(detection.results[0].has_circular_imports());
    }

    #[test]
    fn test_anchor_keeps_first_chain() {
        // a -> b -> a and a -> c -> a share the anchor a.
        let relations = vec![
            relation("a", &[("b", &["b"]), ("c", &["c"])], &["a"], &[]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
            relation("c", &[("a", &["a"])], &["c"], &[]),
        ];
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 2);
        assert_eq!(detection.results.len(), 1);
        assert_eq!(
            names(detection.results[0].circular_import_chain.as_ref().unwrap()),
            vec!["/p/b.ts"]
        );
    }

    #[test]
    fn test_disabled_detector_passes_through() {
        let relations = vec![
            relation("a", &[("b", &["b"])], &["a"], &[]),
            relation("b", &[("a", &["a"])], &["b"], &[]),
        ];
        let input = vec![AnalysisResult::new(id("z"))];
        let detection = CircularDetector::new(false).detect(&relations, input.clone());
        assert_eq!(detection.cycle_count(), 0);
        assert_eq!(detection.results, input);
    }

    #[test]
    fn test_graph_ignores_unknown_targets_and_self_edges() {
        let relations = vec![
            relation("a", &[("a", &["x"]), ("b", &["y"]), ("external", &["z"])], &[], &[]),
            relation("b", &[], &[], &[]),
        ];
        let graph = ImportGraph::from_relations(&relations);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains(&id("a")));
        assert!(!graph.contains(&id("external")));
    }

    #[test]
    fn test_long_chain_terminates() {
        let n = 500;
        let relations: Vec<FileRelation> = (0..n)
            .map(|i| {
                let name = format!("f{i:04}");
                let next = format!("f{:04}", (i + 1) % n);
                let mut r = FileRelation::new(id(&name));
                r.imports.insert(id(&next), vec!["v".to_string()]);
                r.exports_used = vec!["v".to_string()];
                r
            })
            .collect();
        let detection = CircularDetector::new(true).detect(&relations, Vec::new());
        assert_eq!(detection.cycle_count(), 1);
        assert_eq!(
            detection.results[0].circular_import_chain.as_ref().unwrap().len(),
            n - 1
        );
    }
}

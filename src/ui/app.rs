//! Application state and TUI event loop
//!
//! Manages the application state and handles user input for browsing
//! unused exports and circular imports.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use tracing::{debug, warn};

use super::tree::{FlattenedNode, NodeKind, TreeNode};
use crate::session::AnalysisSession;

/// How long the event loop waits for input before checking on a refresh
const TICK: Duration = Duration::from_millis(150);

/// Virtual scroll state for efficient rendering of large trees
#[derive(Debug, Default, Clone)]
pub struct VirtualScrollState {
    /// First visible row index
    pub offset: usize,
    /// Number of visible rows in the viewport
    pub viewport_height: usize,
}

impl VirtualScrollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height;
    }

    /// Calculate the visible range for the given selection and total items
    pub fn visible_range(&self, selected: usize, total: usize) -> (usize, usize) {
        if total == 0 || self.viewport_height == 0 {
            return (0, 0);
        }

        let mut offset = self.offset;
        if selected < offset {
            offset = selected;
        } else if selected >= offset + self.viewport_height {
            offset = selected.saturating_sub(self.viewport_height - 1);
        }

        (offset, (offset + self.viewport_height).min(total))
    }

    /// Update offset to ensure selection is visible
    pub fn ensure_visible(&mut self, selected: usize, total: usize) {
        if total == 0 || self.viewport_height == 0 {
            return;
        }

        if selected < self.offset {
            self.offset = selected;
        } else if selected >= self.offset + self.viewport_height {
            self.offset = selected.saturating_sub(self.viewport_height - 1);
        }
    }
}

/// Application state
pub struct App {
    pub tree: TreeNode,
    /// Currently selected index in the visible list
    pub selected_index: usize,
    /// Flattened representation for rendering
    pub flattened: Vec<FlattenedNode>,
    /// Filtered flattened view (when search is active)
    pub filtered: Vec<FlattenedNode>,
    pub should_quit: bool,
    list_state: ListState,
    pub search_active: bool,
    pub search_query: String,
    pub scroll_state: VirtualScrollState,
    pub project_name: String,
    session: Option<Arc<AnalysisSession>>,
    pending: Option<JoinHandle<bool>>,
}

impl App {
    /// Create an application over a fixed tree, without refresh support
    pub fn new(root: TreeNode) -> Self {
        let mut app = Self {
            project_name: root.label.clone(),
            tree: root,
            selected_index: 0,
            flattened: Vec::new(),
            filtered: Vec::new(),
            should_quit: false,
            list_state: ListState::default(),
            search_active: false,
            search_query: String::new(),
            scroll_state: VirtualScrollState::new(),
            session: None,
            pending: None,
        };
        app.refresh_flattened();
        app.list_state.select(Some(0));
        app
    }

    /// Create an application showing the cached results of `session`.
    /// `r` re-runs the analysis in the background.
    pub fn with_session(session: Arc<AnalysisSession>, project_name: impl Into<String>) -> Self {
        let project_name = project_name.into();
        let tree = TreeNode::from_outcome(&project_name, session.root(), &session.outcome());
        let mut app = Self::new(tree);
        app.project_name = project_name;
        app.session = Some(session);
        app
    }

    /// Refresh the flattened view from the tree
    pub fn refresh_flattened(&mut self) {
        self.flattened = self.tree.flatten();

        if !self.flattened.is_empty() && self.selected_index >= self.flattened.len() {
            self.selected_index = self.flattened.len() - 1;
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts a background refresh. Ignored while one is running.
    pub fn request_refresh(&mut self) {
        if self.pending.is_some() {
            debug!("refresh already pending");
            return;
        }
        if let Some(session) = &self.session {
            self.pending = session.spawn_refresh();
        }
    }

    /// Picks up a finished background refresh. Returns true when the tree
    /// was rebuilt.
    pub fn poll_refresh(&mut self) -> bool {
        if !self.pending.as_ref().is_some_and(|handle| handle.is_finished()) {
            return false;
        }
        if let Some(handle) = self.pending.take() {
            if handle.join().is_err() {
                warn!("refresh thread panicked");
            }
        }
        self.reload();
        true
    }

    /// Rebuilds the tree from the session's current outcome.
    pub fn reload(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        self.tree = TreeNode::from_outcome(&self.project_name, session.root(), &session.outcome());
        self.refresh_flattened();
        if !self.search_query.is_empty() {
            self.update_filter();
        }
    }

    pub fn root_path(&self) -> Option<PathBuf> {
        self.session.as_ref().map(|s| s.root().to_path_buf())
    }

    fn select(&mut self, index: usize, total: usize) {
        self.selected_index = index;
        self.list_state.select(Some(index));
        self.scroll_state.ensure_visible(index, total);
    }

    pub fn select_next(&mut self) {
        let total = self.current_list_len();
        if total > 0 {
            self.select((self.selected_index + 1).min(total - 1), total);
        }
    }

    pub fn select_previous(&mut self) {
        let total = self.current_list_len();
        if total > 0 && self.selected_index > 0 {
            self.select(self.selected_index - 1, total);
        }
    }

    pub fn page_down(&mut self) {
        let total = self.current_list_len();
        if total > 0 {
            let page_size = self.scroll_state.viewport_height.max(1);
            self.select((self.selected_index + page_size).min(total - 1), total);
        }
    }

    pub fn page_up(&mut self) {
        let total = self.current_list_len();
        if total > 0 {
            let page_size = self.scroll_state.viewport_height.max(1);
            self.select(self.selected_index.saturating_sub(page_size), total);
        }
    }

    pub fn select_first(&mut self) {
        let total = self.current_list_len();
        if total > 0 {
            self.select(0, total);
            self.scroll_state.offset = 0;
        }
    }

    pub fn select_last(&mut self) {
        let total = self.current_list_len();
        if total > 0 {
            self.select(total - 1, total);
        }
    }

    /// Get the current list length (filtered or full)
    fn current_list_len(&self) -> usize {
        if !self.search_query.is_empty() {
            self.filtered.len()
        } else {
            self.flattened.len()
        }
    }

    /// Toggle expansion of the selected item. Does nothing while filtering.
    pub fn toggle_selected(&mut self) {
        if !self.search_query.is_empty() {
            return;
        }
        if self.tree.toggle_at_index(self.selected_index) {
            self.refresh_flattened();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get the tree prefix for a node at the given index
    fn get_tree_prefix(&self, index: usize) -> String {
        let Some(node) = self.flattened.get(index) else {
            return String::new();
        };

        // Preorder: the latest node seen at each depth is the ancestor.
        let mut last_flags: Vec<bool> = Vec::new();
        for n in &self.flattened[..=index] {
            if n.depth > 0 {
                last_flags.truncate(n.depth - 1);
                last_flags.push(n.is_last_child);
            }
        }
        last_flags.truncate(node.depth.saturating_sub(1));
        node.tree_prefix(&last_flags)
    }

    pub fn start_search(&mut self) {
        self.search_active = true;
        self.search_query.clear();
    }

    /// Clear search and return to normal mode
    pub fn clear_search(&mut self) {
        self.search_active = false;
        self.search_query.clear();
        self.filtered.clear();
        self.selected_index = 0;
        self.list_state.select(Some(0));
    }

    pub fn search_push(&mut self, c: char) {
        self.search_query.push(c);
        self.update_filter();
    }

    pub fn search_pop(&mut self) {
        self.search_query.pop();
        self.update_filter();
    }

    fn update_filter(&mut self) {
        if self.search_query.is_empty() {
            self.filtered.clear();
        } else {
            self.filtered = self
                .tree_rows()
                .into_iter()
                .filter(|node| fuzzy_match(&node.label, &self.search_query))
                .collect();
        }
        self.selected_index = 0;
        self.list_state.select(Some(0));
    }

    /// Every row of the tree regardless of expansion, so search reaches
    /// collapsed exports and chain members.
    fn tree_rows(&self) -> Vec<FlattenedNode> {
        fn expand_all(node: &TreeNode) -> TreeNode {
            let mut copy = node.clone();
            copy.expanded = true;
            copy.children = node.children.iter().map(expand_all).collect();
            copy
        }
        expand_all(&self.tree).flatten()
    }
}

/// Perform fuzzy matching of query against text (case-insensitive)
/// A match requires all characters of the query to appear in order in the text
fn fuzzy_match(text: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    let text_lower = text.to_lowercase();
    let query_lower = query.to_lowercase();

    let mut query_chars = query_lower.chars().peekable();
    for c in text_lower.chars() {
        if query_chars.peek() == Some(&c) {
            query_chars.next();
        }
        if query_chars.peek().is_none() {
            return true;
        }
    }
    query_chars.peek().is_none()
}

/// Color for a row kind
///
/// - Completely unused files: Red
/// - Files with some unused exports: Yellow
/// - Cycle anchors: Magenta
/// - Sections: Cyan
fn get_kind_color(kind: NodeKind) -> Color {
    match kind {
        NodeKind::Root => Color::White,
        NodeKind::Section => Color::Cyan,
        NodeKind::UnusedFile { completely_unused: true } => Color::Red,
        NodeKind::UnusedFile { .. } => Color::Yellow,
        NodeKind::Export => Color::Gray,
        NodeKind::CycleFile => Color::Magenta,
        NodeKind::CycleMember => Color::Gray,
    }
}

/// Deepest level that still gets dimmer
const MAX_DEPTH_FOR_COLOR: usize = 4;

/// Brightness factor from 1.0 at the root down to 0.6 at the deepest level
fn get_depth_brightness(depth: usize) -> f32 {
    let ratio = depth.min(MAX_DEPTH_FOR_COLOR) as f32 / MAX_DEPTH_FOR_COLOR as f32;
    1.0 - (ratio * 0.4)
}

fn apply_depth_color(base_color: Color, depth: usize) -> Color {
    let scale = |value: u8| (value as f32 * get_depth_brightness(depth)) as u8;
    let (r, g, b) = match base_color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Red => (255, 0, 0),
        Color::Yellow => (255, 255, 0),
        Color::Cyan => (0, 255, 255),
        Color::Magenta => (255, 0, 255),
        Color::Gray => (192, 192, 192),
        Color::White => (255, 255, 255),
        other => return other,
    };
    Color::Rgb(scale(r), scale(g), scale(b))
}

/// Short marker shown before the label
fn get_kind_indicator(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::UnusedFile { completely_unused: true } => "[X] ",
        NodeKind::UnusedFile { .. } => "[U] ",
        NodeKind::CycleFile => "[!] ",
        _ => "",
    }
}

/// Run the TUI application
pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.poll_refresh();
        terminal.draw(|frame| render(frame, app))?;

        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                if app.search_active {
                    match key.code {
                        KeyCode::Esc => app.clear_search(),
                        // Leave search mode but keep the filter
                        KeyCode::Enter => app.search_active = false,
                        KeyCode::Backspace => app.search_pop(),
                        KeyCode::Char(c) => app.search_push(c),
                        KeyCode::Down | KeyCode::Tab => app.select_next(),
                        KeyCode::Up | KeyCode::BackTab => app.select_previous(),
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') => app.quit(),
                        KeyCode::Esc => {
                            if !app.search_query.is_empty() {
                                app.clear_search();
                            } else {
                                app.quit();
                            }
                        }
                        KeyCode::Char('/') => app.start_search(),
                        KeyCode::Char('r') => app.request_refresh(),
                        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
                        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
                        KeyCode::PageDown | KeyCode::Char('d') => app.page_down(),
                        KeyCode::PageUp | KeyCode::Char('u') => app.page_up(),
                        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
                        KeyCode::End | KeyCode::Char('G') => app.select_last(),
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn render(frame: &mut Frame, app: &mut App) {
    let show_search = app.search_active || !app.search_query.is_empty();

    let mut constraints = vec![Constraint::Length(3)];
    if show_search {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(3));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    let mut next = 1;
    if show_search {
        render_search_bar(frame, app, chunks[next]);
        next += 1;
    }
    render_tree(frame, app, chunks[next]);
    render_footer(frame, app, chunks[next + 1]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        format!("exportscope - {}", app.project_name),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if app.is_refreshing() {
        spans.push(Span::styled(
            "  refreshing...",
            Style::default().fg(Color::Yellow),
        ));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_search_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (border_color, title) = if app.search_active {
        (Color::Yellow, "Search (Enter to confirm, Esc to cancel)")
    } else {
        (Color::Gray, "Filter (/ to edit, Esc to clear)")
    };

    let cursor = if app.search_active { "_" } else { "" };
    let content = Line::from(vec![
        Span::styled(format!("/{}", app.search_query), Style::default().fg(Color::White)),
        Span::styled(cursor, Style::default().fg(Color::Yellow).add_modifier(Modifier::SLOW_BLINK)),
        Span::styled(
            format!(" ({} matches)", app.filtered.len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let search_bar = Paragraph::new(content).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color)),
    );
    frame.render_widget(search_bar, area);
}

/// Render the findings tree with virtual scrolling
///
/// Only visible rows are built, so trees with thousands of files stay cheap.
pub fn render_tree(frame: &mut Frame, app: &mut App, area: Rect) {
    let has_search = !app.search_query.is_empty();
    let display_nodes: &[FlattenedNode] = if has_search {
        &app.filtered
    } else {
        &app.flattened
    };
    let total_nodes = display_nodes.len();

    // Borders take two rows
    let viewport_height = (area.height as usize).saturating_sub(2);
    app.scroll_state.set_viewport_height(viewport_height);
    app.scroll_state.ensure_visible(app.selected_index, total_nodes);
    let (start_idx, end_idx) = app.scroll_state.visible_range(app.selected_index, total_nodes);

    let items: Vec<ListItem> = display_nodes[start_idx..end_idx]
        .iter()
        .enumerate()
        .map(|(visible_idx, node)| {
            let prefix = if has_search {
                String::new()
            } else {
                app.get_tree_prefix(start_idx + visible_idx)
            };
            let color = apply_depth_color(get_kind_color(node.kind), node.depth);

            let mut spans = vec![
                Span::styled(prefix, Style::default().fg(Color::DarkGray)),
                Span::styled(node.expansion_indicator(), Style::default().fg(Color::Yellow)),
                Span::styled(get_kind_indicator(node.kind), Style::default().fg(color)),
            ];
            spans.extend(highlight_matches(&node.label, &app.search_query, color));
            if !node.detail.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", node.detail),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    app.list_state
        .select(Some(app.selected_index.saturating_sub(start_idx)));

    let title = if has_search {
        format!("Findings (filtered: {} matches)", total_nodes)
    } else if total_nodes > viewport_height {
        format!("Findings ({}-{} of {})", start_idx + 1, end_idx, total_nodes)
    } else {
        format!("Findings ({})", total_nodes)
    };

    let tree_list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");

    frame.render_stateful_widget(tree_list, area, &mut app.list_state);
}

/// Highlight matching characters in a string based on fuzzy search
fn highlight_matches(text: &str, query: &str, base_color: Color) -> Vec<Span<'static>> {
    let base = Style::default().fg(base_color);
    if query.is_empty() {
        return vec![Span::styled(text.to_string(), base)];
    }

    let matched = Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let query_lower = query.to_lowercase();
    let mut query_chars = query_lower.chars().peekable();
    let mut result = Vec::new();
    let mut segment = String::new();
    let mut segment_is_match = false;

    for c in text.chars() {
        let c_lower = c.to_lowercase().next().unwrap_or(c);
        let is_match = query_chars.peek() == Some(&c_lower);
        if is_match {
            query_chars.next();
        }

        if is_match != segment_is_match && !segment.is_empty() {
            let style = if segment_is_match { matched } else { base };
            result.push(Span::styled(std::mem::take(&mut segment), style));
        }
        segment.push(c);
        segment_is_match = is_match;
    }

    if !segment.is_empty() {
        let style = if segment_is_match { matched } else { base };
        result.push(Span::styled(segment, style));
    }

    result
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let key = |text: &'static str| Span::styled(text, Style::default().fg(Color::Yellow));
    let help_text = if app.search_active {
        Line::from(vec![
            key("Type"),
            Span::raw(" to search  "),
            key("↑/↓"),
            Span::raw(" Navigate  "),
            key("Enter"),
            Span::raw(" Confirm  "),
            key("Esc"),
            Span::raw(" Cancel"),
        ])
    } else {
        Line::from(vec![
            key("/"),
            Span::raw(" Search  "),
            key("j/k"),
            Span::raw(" Nav  "),
            key("d/u"),
            Span::raw(" Page  "),
            key("g/G"),
            Span::raw(" Top/Bot  "),
            key("Enter"),
            Span::raw(" Toggle  "),
            key("r"),
            Span::raw(" Refresh  "),
            key("q"),
            Span::raw(" Quit  │  "),
            Span::styled("[X]", Style::default().fg(Color::Red)),
            Span::raw(" Unused file  "),
            Span::styled("[U]", Style::default().fg(Color::Yellow)),
            Span::raw(" Unused exports  "),
            Span::styled("[!]", Style::default().fg(Color::Magenta)),
            Span::raw(" Cycle"),
        ])
    };

    let footer = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

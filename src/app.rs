use crate::bookmarks;
use crate::cursor::Cursor;
use crate::extract::{DocFormat, extract_paragraphs};
use crate::jump_menu::{JumpMenu, JumpMenuAction};
use crate::library::{self, LibraryEntry, progress_percent};
use crate::outline;
use crate::reflow::reflow;
use crate::session::{SessionState, SessionStore};
use crate::theme::ThemeId;
use anyhow::{Context, Result};
use chrono::DateTime;
use crossterm::event::{KeyCode, KeyEvent};
use log::{error, info, warn};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Library,
    Reading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuKind {
    Contents,
    Bookmarks,
}

struct ActiveMenu {
    kind: MenuKind,
    menu: JumpMenu,
}

/// An opened document: its reflowed lines, derived indexes and live session.
struct OpenDocument {
    path: String,
    format: DocFormat,
    lines: Vec<String>,
    cursor: Cursor,
    state: SessionState,
}

impl OpenDocument {
    fn display_name(&self) -> String {
        Path::new(&self.path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.clone())
    }
}

pub struct App {
    store: SessionStore,
    theme: ThemeId,
    wrap_width: usize,
    mode: Mode,
    doc: Option<OpenDocument>,
    menu: Option<ActiveMenu>,
    library_entries: Vec<LibraryEntry>,
    library_state: ListState,
    viewport_height: usize,
    should_quit: bool,
}

impl App {
    pub fn new(store: SessionStore, wrap_width: usize) -> Result<Self> {
        let theme = match store.load_theme() {
            Ok(Some(name)) => ThemeId::from_name(&name),
            Ok(None) => ThemeId::default(),
            Err(e) => {
                warn!("failed to load theme: {e}");
                ThemeId::default()
            }
        };
        let mut app = Self {
            store,
            theme,
            wrap_width,
            mode: Mode::Library,
            doc: None,
            menu: None,
            library_entries: Vec::new(),
            library_state: ListState::default(),
            viewport_height: 20,
            should_quit: false,
        };
        app.refresh_library()
            .context("failed to build the library view")?;
        Ok(app)
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Open a document: extract, reflow, restore the saved session and
    /// overwrite the cached line count. Extraction failures degrade to a
    /// placeholder paragraph instead of surfacing.
    pub fn open_document(&mut self, doc_path: &str) {
        let path = Path::new(doc_path);
        let format = DocFormat::from_path(path);
        let paragraphs = match extract_paragraphs(path, format) {
            Ok(paragraphs) => paragraphs,
            Err(e) => {
                error!("extraction failed for {doc_path}: {e}");
                vec![format!("[No text could be extracted from {doc_path}]")]
            }
        };
        let lines = reflow(&paragraphs, self.wrap_width);

        let mut state = match self.store.load(doc_path) {
            Ok(state) => state,
            Err(e) => {
                error!("failed to load session for {doc_path}: {e}");
                SessionState::default()
            }
        };
        state.scroll = state.scroll.min(lines.len().saturating_sub(1));
        state.total_lines = lines.len();

        let mut cursor = Cursor::new();
        cursor.jump(state.scroll);

        info!(
            "opened {doc_path} ({}) with {} lines at scroll {}",
            format.name(),
            lines.len(),
            state.scroll
        );
        if let Err(e) = self.store.save_position(doc_path, state.scroll, lines.len()) {
            error!("failed to save session for {doc_path}: {e}");
        }

        self.doc = Some(OpenDocument {
            path: doc_path.to_string(),
            format,
            lines,
            cursor,
            state,
        });
        self.menu = None;
        self.mode = Mode::Reading;
    }

    fn refresh_library(&mut self) -> Result<()> {
        self.library_entries = library::build(&self.store, self.wrap_width)?;
        if self.library_entries.is_empty() {
            self.library_state.select(None);
        } else {
            let selected = self.library_state.selected().unwrap_or(0);
            self.library_state
                .select(Some(selected.min(self.library_entries.len() - 1)));
        }
        Ok(())
    }

    /// Persist the current reading position. Clamps before writing so a
    /// stale jump target never lands in the store.
    fn save_current(&mut self) {
        if let Some(doc) = &mut self.doc {
            let scroll = doc.cursor.scroll.min(doc.lines.len().saturating_sub(1));
            doc.state.scroll = scroll;
            if let Err(e) = self.store.save_position(&doc.path, scroll, doc.lines.len()) {
                error!("failed to save session for {}: {e}", doc.path);
            }
        }
    }

    fn close_document(&mut self) {
        self.save_current();
        self.doc = None;
        self.menu = None;
        self.mode = Mode::Library;
        if let Err(e) = self.refresh_library() {
            error!("failed to refresh library: {e}");
        }
    }

    fn quit(&mut self) {
        self.save_current();
        self.should_quit = true;
    }

    fn cycle_theme(&mut self) {
        self.theme = self.theme.next();
        if let Err(e) = self.store.save_theme(self.theme.name()) {
            error!("failed to save theme: {e}");
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.menu.is_some() {
            self.handle_menu_key(key.code);
            return;
        }
        match self.mode {
            Mode::Library => self.handle_library_key(key.code),
            Mode::Reading => self.handle_reading_key(key.code),
        }
    }

    fn handle_menu_key(&mut self, code: KeyCode) {
        let Some(active) = self.menu.as_mut() else {
            return;
        };
        // Deleting from the bookmark menu is handled here; the menu itself
        // only knows labels and targets.
        if active.kind == MenuKind::Bookmarks && code == KeyCode::Char('x') {
            if let (Some(index), Some(doc)) = (active.menu.selected_index(), self.doc.as_mut()) {
                bookmarks::delete(&mut doc.state, index);
                if let Err(e) = self.store.save_state(&doc.path, &doc.state) {
                    error!("failed to save bookmarks for {}: {e}", doc.path);
                }
                let rows = bookmark_rows(&doc.state);
                active.menu.set_rows(rows);
            }
            return;
        }
        match active.menu.handle_key(code) {
            JumpMenuAction::Pending => {}
            JumpMenuAction::Cancelled => self.menu = None,
            JumpMenuAction::Selected(line) => {
                if let Some(doc) = self.doc.as_mut() {
                    doc.cursor.jump(line);
                }
                self.menu = None;
            }
        }
    }

    fn handle_library_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('T') => self.cycle_theme(),
            KeyCode::Char('j') | KeyCode::Down => self.library_next(),
            KeyCode::Char('k') | KeyCode::Up => self.library_previous(),
            KeyCode::Enter => {
                if let Some(entry) = self
                    .library_state
                    .selected()
                    .and_then(|i| self.library_entries.get(i))
                {
                    let path = entry.path.clone();
                    self.open_document(&path);
                }
            }
            _ => {}
        }
    }

    fn handle_reading_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Tab | KeyCode::Esc => self.close_document(),
            KeyCode::Char('T') => self.cycle_theme(),
            KeyCode::Char('m') => self.add_bookmark(),
            KeyCode::Char('b') => self.open_bookmark_menu(),
            KeyCode::Char('t') => self.open_contents_menu(),
            _ => {
                let half_page = (self.viewport_height / 2).max(1);
                let Some(doc) = self.doc.as_mut() else {
                    return;
                };
                let total = doc.lines.len();
                match code {
                    KeyCode::Char('j') | KeyCode::Down => doc.cursor.scroll_down(1, total),
                    KeyCode::Char('k') | KeyCode::Up => doc.cursor.scroll_up(1),
                    KeyCode::Char('d') | KeyCode::PageDown => {
                        doc.cursor.scroll_down(half_page, total)
                    }
                    KeyCode::Char('u') | KeyCode::PageUp => doc.cursor.scroll_up(half_page),
                    KeyCode::Char('g') | KeyCode::Home => doc.cursor.jump(0),
                    KeyCode::Char('G') | KeyCode::End => {
                        doc.cursor.jump(total.saturating_sub(1))
                    }
                    _ => {}
                }
            }
        }
    }

    fn library_next(&mut self) {
        if self.library_entries.is_empty() {
            return;
        }
        let i = match self.library_state.selected() {
            Some(i) if i >= self.library_entries.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.library_state.select(Some(i));
    }

    fn library_previous(&mut self) {
        if self.library_entries.is_empty() {
            return;
        }
        let i = match self.library_state.selected() {
            Some(0) | None => self.library_entries.len() - 1,
            Some(i) => i - 1,
        };
        self.library_state.select(Some(i));
    }

    fn add_bookmark(&mut self) {
        let Some(doc) = self.doc.as_mut() else {
            return;
        };
        let scroll = doc.cursor.scroll.min(doc.lines.len().saturating_sub(1));
        let preview = bookmarks::preview_for_line(&doc.lines, scroll);
        bookmarks::add_or_merge(&mut doc.state, scroll, preview, bookmarks::DEFAULT_TOLERANCE);
        if let Err(e) = self.store.save_state(&doc.path, &doc.state) {
            error!("failed to save bookmark for {}: {e}", doc.path);
        }
    }

    fn open_bookmark_menu(&mut self) {
        let Some(doc) = self.doc.as_ref() else {
            return;
        };
        self.menu = Some(ActiveMenu {
            kind: MenuKind::Bookmarks,
            menu: JumpMenu::new("Bookmarks", bookmark_rows(&doc.state)),
        });
    }

    /// Contents depend on the format: Markdown gets its heading outline,
    /// PDFs their page map, plain text has no structure to jump through.
    fn open_contents_menu(&mut self) {
        let Some(doc) = self.doc.as_ref() else {
            return;
        };
        let (title, rows) = match doc.format {
            DocFormat::Markdown => (
                "Contents",
                outline::build_toc(&doc.lines)
                    .into_iter()
                    .map(|entry| {
                        let indent = "  ".repeat(entry.level.saturating_sub(1));
                        (format!("{indent}{}", entry.title), entry.line)
                    })
                    .collect::<Vec<_>>(),
            ),
            DocFormat::Pdf => (
                "Pages",
                outline::build_page_map(&doc.lines)
                    .into_iter()
                    .map(|marker| (format!("Page {}", marker.page), marker.line))
                    .collect(),
            ),
            DocFormat::Text => return,
        };
        if rows.is_empty() {
            return;
        }
        self.menu = Some(ActiveMenu {
            kind: MenuKind::Contents,
            menu: JumpMenu::new(title, rows),
        });
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = self.theme.palette();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        match self.mode {
            Mode::Library => self.draw_library(f, chunks[0]),
            Mode::Reading => self.draw_reading(f, chunks[0]),
        }

        let help_text = match (self.mode, self.menu.is_some()) {
            (_, true) => "j/k: Navigate | Enter: Jump | x: Delete Bookmark | Esc: Close",
            (Mode::Library, _) => "j/k: Navigate | Enter: Open | T: Theme | q: Quit",
            (Mode::Reading, _) => {
                "j/k: Scroll | d/u: Half Page | g/G: Start/End | t: Contents | m/b: Bookmarks | Tab: Library | q: Quit"
            }
        };
        let help = Paragraph::new(help_text)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.base_03)),
            )
            .style(Style::default().fg(palette.base_03));
        f.render_widget(help, chunks[1]);

        if let Some(active) = self.menu.as_mut() {
            active.menu.render(f, f.area(), palette);
        }
    }

    fn draw_library(&mut self, f: &mut Frame, area: Rect) {
        let palette = self.theme.palette();
        let (text_color, border_color, _bg) = palette.get_panel_colors(true);

        if self.library_entries.is_empty() {
            let hint = Paragraph::new(
                "No reading history yet.\n\nOpen a document with: lectern <file>",
            )
            .style(Style::default().fg(palette.base_03))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Library ")
                    .border_style(Style::default().fg(border_color)),
            );
            f.render_widget(hint, area);
            return;
        }

        let items: Vec<ListItem> = self
            .library_entries
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<40}", entry.display_name()),
                        Style::default().fg(text_color),
                    ),
                    Span::styled(
                        format!("{:>4}%  ", entry.progress),
                        Style::default().fg(palette.base_0b),
                    ),
                    Span::styled(format_stamp(&entry.timestamp), Style::default().fg(palette.base_03)),
                ]))
            })
            .collect();

        let (selection_bg, selection_fg) = palette.get_selection_colors(true);
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Library ")
                    .border_style(Style::default().fg(border_color)),
            )
            .highlight_style(Style::default().bg(selection_bg).fg(selection_fg))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, area, &mut self.library_state);
    }

    fn draw_reading(&mut self, f: &mut Frame, area: Rect) {
        let palette = self.theme.palette();
        let Some(doc) = self.doc.as_ref() else {
            return;
        };

        let progress = progress_percent(doc.cursor.scroll, doc.lines.len());
        let title = format!(" {} — {}% ", doc.display_name(), progress);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(palette.base_03));
        let inner = block.inner(area);
        f.render_widget(block, area);

        // The viewport height feeds half-page scrolling; it tracks resizes
        // because it is recomputed from the frame on every draw.
        self.viewport_height = inner.height as usize;

        let window = doc.cursor.visible_window(&doc.lines, self.viewport_height);
        let content = window.join("\n");
        let body = Paragraph::new(content).style(Style::default().fg(palette.base_06));
        f.render_widget(body, inner);
    }
}

fn bookmark_rows(state: &SessionState) -> Vec<(String, usize)> {
    state
        .bookmarks
        .iter()
        .map(|b| (b.preview.clone(), b.scroll))
        .collect()
}

/// Render an RFC 3339 stamp as "YYYY-MM-DD HH:MM"; entries that were never
/// stamped show as "never".
fn format_stamp(stamp: &str) -> String {
    if stamp.is_empty() {
        return "never".to_string();
    }
    match DateTime::parse_from_rfc3339(stamp) {
        Ok(parsed) => parsed.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => stamp.to_string(),
    }
}

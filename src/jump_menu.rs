use crate::theme::Base16Palette;
use crossterm::event::KeyCode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
};

/// Outcome of feeding one key event to a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpMenuAction {
    /// Menu stays open.
    Pending,
    /// A row was chosen; the payload is its target line.
    Selected(usize),
    Cancelled,
}

/// A synchronous jump menu: a list of `(label, target line)` rows rendered
/// as a centered popup. The caller keeps it open while `handle_key` returns
/// `Pending` and acts on `Selected`/`Cancelled`. Serves TOC, page and
/// bookmark navigation alike.
pub struct JumpMenu {
    title: String,
    rows: Vec<(String, usize)>,
    state: ListState,
}

impl JumpMenu {
    pub fn new(title: impl Into<String>, rows: Vec<(String, usize)>) -> Self {
        let mut state = ListState::default();
        if !rows.is_empty() {
            state.select(Some(0));
        }
        Self {
            title: title.into(),
            rows,
            state,
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.state.selected().filter(|i| *i < self.rows.len())
    }

    /// Replace the rows in place, keeping the selection near its old spot.
    /// Used after deleting a bookmark from the open menu.
    pub fn set_rows(&mut self, rows: Vec<(String, usize)>) {
        let selected = self.state.selected().unwrap_or(0);
        self.rows = rows;
        if self.rows.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(selected.min(self.rows.len() - 1)));
        }
    }

    pub fn next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= self.rows.len() - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn handle_key(&mut self, code: KeyCode) -> JumpMenuAction {
        match code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.next();
                JumpMenuAction::Pending
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.previous();
                JumpMenuAction::Pending
            }
            KeyCode::Enter => match self.selected_index() {
                Some(i) => JumpMenuAction::Selected(self.rows[i].1),
                None => JumpMenuAction::Cancelled,
            },
            KeyCode::Esc | KeyCode::Char('q') => JumpMenuAction::Cancelled,
            _ => JumpMenuAction::Pending,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let popup_area = centered_rect(60, 70, area);
        f.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|(label, target)| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:>5} ", target + 1), Style::default().fg(palette.base_03)),
                    Span::styled(label.clone(), Style::default().fg(palette.base_05)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" {} ", self.title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(palette.base_0c))
                    .style(Style::default().bg(palette.base_00)),
            )
            .highlight_style(
                Style::default()
                    .bg(palette.base_02)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        f.render_stateful_widget(list, popup_area, &mut self.state);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> JumpMenu {
        JumpMenu::new(
            "Contents",
            vec![
                ("Intro".to_string(), 0),
                ("Middle".to_string(), 10),
                ("End".to_string(), 20),
            ],
        )
    }

    #[test]
    fn test_enter_selects_target_line() {
        let mut m = menu();
        assert_eq!(m.handle_key(KeyCode::Char('j')), JumpMenuAction::Pending);
        assert_eq!(m.handle_key(KeyCode::Enter), JumpMenuAction::Selected(10));
    }

    #[test]
    fn test_escape_cancels() {
        let mut m = menu();
        assert_eq!(m.handle_key(KeyCode::Esc), JumpMenuAction::Cancelled);
    }

    #[test]
    fn test_selection_wraps() {
        let mut m = menu();
        m.previous();
        assert_eq!(m.selected_index(), Some(2));
        m.next();
        assert_eq!(m.selected_index(), Some(0));
    }

    #[test]
    fn test_empty_menu_enter_cancels() {
        let mut m = JumpMenu::new("Bookmarks", Vec::new());
        assert_eq!(m.handle_key(KeyCode::Enter), JumpMenuAction::Cancelled);
    }

    #[test]
    fn test_set_rows_clamps_selection() {
        let mut m = menu();
        m.previous(); // select last row
        m.set_rows(vec![("only".to_string(), 5)]);
        assert_eq!(m.selected_index(), Some(0));
        m.set_rows(Vec::new());
        assert_eq!(m.selected_index(), None);
    }
}

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::model::composer::CommandComposer;
use crate::model::config::AppConfig;
use crate::model::mode::Mode;
use crate::msg::{Direction as MoveDir, Msg};

pub struct App {
    pub mode: Mode,
    composer: CommandComposer,
    pub config: AppConfig,
    cursor: usize,
    filter_query: String,
    filter_results: Vec<usize>,
    filter_selected: usize,
    notifications: VecDeque<(String, Instant)>,
    pub should_quit: bool,
    accepted: Option<String>,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = config.catalog()?;
        let composer = CommandComposer::new(config.base_command(), catalog.toggles());

        Ok(Self {
            mode: Mode::Normal,
            composer,
            config,
            cursor: 0,
            filter_query: String::new(),
            filter_results: Vec::new(),
            filter_selected: 0,
            notifications: VecDeque::new(),
            should_quit: false,
            accepted: None,
        })
    }

    /// The command to hand back on stdout, set when the user accepts.
    pub fn accepted_command(&self) -> Option<&str> {
        self.accepted.as_deref()
    }

    pub fn command(&self) -> String {
        self.composer.command()
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Key(key) => self.handle_key(key)?,
            Msg::MoveCursor(dir) => self.move_cursor(dir),
            Msg::ToggleUnderCursor => self.composer.toggle(self.cursor),
            Msg::SelectAll => self.composer.set_all(true),
            Msg::SelectNone => self.composer.set_all(false),
            Msg::SetMode(mode) => self.mode = mode,
            Msg::ConfigChanged(path) => self.handle_config_changed(path),
            Msg::Accept => {
                self.accepted = Some(self.composer.command());
                self.should_quit = true;
            }
            Msg::Tick => self.expire_notifications(),
            Msg::Quit => self.should_quit = true,
            Msg::Resize(_w, _h) => {}
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.mode {
            Mode::Normal => self.handle_key_normal(key),
            Mode::Filter => self.handle_key_filter(key),
        }
    }

    fn handle_key_normal(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                self.accepted = Some(self.composer.command());
                self.should_quit = true;
            }
            KeyCode::Char(' ') | KeyCode::Char('x') => self.composer.toggle(self.cursor),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(MoveDir::Down),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(MoveDir::Up),
            KeyCode::Char('g') => self.move_cursor(MoveDir::Top),
            KeyCode::Char('G') => self.move_cursor(MoveDir::Bottom),
            KeyCode::Char('a') => self.composer.set_all(true),
            KeyCode::Char('n') => self.composer.set_all(false),
            KeyCode::Char('/') => self.open_filter(),
            KeyCode::Char('r') => self.reload_user_config(),
            _ => {}
        }
        Ok(())
    }

    fn handle_key_filter(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.close_filter(),
            KeyCode::Enter => {
                if let Some(&index) = self.filter_results.get(self.filter_selected) {
                    self.composer.toggle(index);
                    self.cursor = index;
                }
                self.close_filter();
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.filter_results.is_empty() {
                    self.filter_selected =
                        (self.filter_selected + 1).min(self.filter_results.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.filter_selected = self.filter_selected.saturating_sub(1);
            }
            KeyCode::Backspace => {
                self.filter_query.pop();
                self.refresh_filter_results();
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.filter_query.push(ch);
                self.refresh_filter_results();
            }
            _ => {}
        }
        Ok(())
    }

    fn move_cursor(&mut self, dir: MoveDir) {
        let max = self.composer.len().saturating_sub(1);
        self.cursor = match dir {
            MoveDir::Up => self.cursor.saturating_sub(1),
            MoveDir::Down => (self.cursor + 1).min(max),
            MoveDir::Top => 0,
            MoveDir::Bottom => max,
        };
    }

    fn open_filter(&mut self) {
        self.mode = Mode::Filter;
        self.filter_query.clear();
        self.filter_selected = 0;
        self.refresh_filter_results();
    }

    fn close_filter(&mut self) {
        self.mode = Mode::Normal;
        self.filter_query.clear();
        self.filter_results.clear();
        self.filter_selected = 0;
    }

    fn refresh_filter_results(&mut self) {
        self.filter_results.clear();

        if self.filter_query.is_empty() {
            self.filter_results = (0..self.composer.len()).collect();
        } else {
            let matcher = SkimMatcherV2::default();
            let mut scored: Vec<(i64, usize)> = self
                .composer
                .toggles()
                .iter()
                .enumerate()
                .filter_map(|(index, toggle)| {
                    let by_label = matcher.fuzzy_match(&toggle.label, &self.filter_query);
                    let by_value = matcher.fuzzy_match(&toggle.value, &self.filter_query);
                    by_label.max(by_value).map(|score| (score, index))
                })
                .collect();

            scored.sort_by(|a, b| b.0.cmp(&a.0));
            self.filter_results = scored.into_iter().map(|(_, index)| index).collect();
        }

        if self.filter_results.is_empty() {
            self.filter_selected = 0;
        } else if self.filter_selected >= self.filter_results.len() {
            self.filter_selected = self.filter_results.len() - 1;
        }
    }

    fn handle_config_changed(&mut self, path: PathBuf) {
        // The watcher covers the whole config directory; only the config
        // file itself matters.
        if AppConfig::user_config_path().as_deref() != Some(path.as_path()) {
            return;
        }

        match self.reload_config(&path) {
            Ok(()) => self.push_notification("config reloaded".to_string()),
            Err(err) => {
                tracing::warn!("config reload failed: {err:#}");
                self.push_notification(format!("config reload failed: {err}"));
            }
        }
    }

    fn reload_config(&mut self, path: &Path) -> Result<()> {
        let config = AppConfig::load_from(path)?;
        let catalog = config.catalog()?;

        self.composer.set_base(config.base_command());
        // Checked state carries over by value; values gone from the new
        // catalog drop their state.
        self.composer.replace_toggles(catalog.toggles());
        self.config = config;
        self.cursor = self.cursor.min(self.composer.len().saturating_sub(1));
        Ok(())
    }

    fn reload_user_config(&mut self) {
        let Some(path) = AppConfig::user_config_path() else {
            return;
        };
        if !path.exists() {
            self.push_notification("no user config to reload".to_string());
            return;
        }

        match self.reload_config(&path) {
            Ok(()) => self.push_notification("config reloaded".to_string()),
            Err(err) => {
                tracing::warn!("config reload failed: {err:#}");
                self.push_notification(format!("config reload failed: {err}"));
            }
        }
    }

    fn push_notification(&mut self, message: String) {
        let ttl = Duration::from_secs(self.config.ui.notification_secs);
        self.notifications.push_back((message, Instant::now() + ttl));
        while self.notifications.len() > 8 {
            self.notifications.pop_front();
        }
    }

    fn expire_notifications(&mut self) {
        let now = Instant::now();
        self.notifications.retain(|(_, deadline)| *deadline > now);
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(1),    // provider list
                Constraint::Length(3), // command panel
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_provider_list(frame, chunks[1]);
        self.render_command_panel(frame, chunks[2]);
        self.render_status_bar(frame, chunks[3]);

        if self.mode == Mode::Filter {
            self.render_filter_overlay(frame);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = Span::styled(
            format!(" {} ", self.config.command.package),
            Style::default()
                .bg(Color::Rgb(30, 30, 45))
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        let hints = Span::styled(
            "  Space: Toggle  a: All  n: None  /: Filter  r: Reload  Enter: Accept  q: Quit ",
            Style::default()
                .bg(Color::Rgb(20, 20, 30))
                .fg(Color::DarkGray),
        );

        frame.render_widget(
            Paragraph::new(Line::from(vec![title, hints]))
                .style(Style::default().bg(Color::Rgb(20, 20, 30))),
            area,
        );
    }

    fn render_provider_list(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = if self.composer.is_empty() {
            vec![Line::from(Span::styled(
                "No providers configured",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.composer
                .toggles()
                .iter()
                .enumerate()
                .map(|(idx, toggle)| {
                    let checkbox = if toggle.checked { "[x]" } else { "[ ]" };
                    let mut content = format!(" {checkbox} {}", toggle.label);
                    if toggle.label != toggle.value {
                        content.push_str(&format!("  ({})", toggle.value));
                    }

                    if idx == self.cursor {
                        Line::from(Span::styled(
                            content,
                            Style::default().fg(Color::Black).bg(Color::Cyan),
                        ))
                    } else if toggle.checked {
                        Line::from(Span::styled(content, Style::default().fg(Color::Green)))
                    } else {
                        Line::from(Span::styled(content, Style::default().fg(Color::Gray)))
                    }
                })
                .collect()
        };

        frame.render_widget(
            Paragraph::new(lines).style(Style::default().bg(Color::Rgb(12, 12, 18))),
            area,
        );
    }

    fn render_command_panel(&self, frame: &mut Frame, area: Rect) {
        let panel = Paragraph::new(Span::styled(
            self.composer.command(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
        .block(
            Block::default()
                .title(" Install Command ")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Rgb(15, 15, 24))),
        );
        frame.render_widget(panel, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mode_style = match self.mode {
            Mode::Normal => Style::default()
                .fg(Color::Black)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Mode::Filter => Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        };
        let mode_span = Span::styled(format!(" {} ", self.mode.label()), mode_style);

        let mut suffix = match self.mode {
            Mode::Filter => format!(" | /{}", self.filter_query),
            _ => String::new(),
        };

        if let Some((message, _)) = self.notifications.back() {
            suffix.push_str(&format!(" | {message}"));
        }

        let info = Span::styled(
            format!(
                " {}/{} providers{} ",
                self.composer.checked_count(),
                self.composer.len(),
                suffix
            ),
            Style::default().fg(Color::Gray).bg(Color::DarkGray),
        );

        let status = Paragraph::new(Line::from(vec![mode_span, info]))
            .style(Style::default().bg(Color::DarkGray));
        frame.render_widget(status, area);
    }

    fn render_filter_overlay(&self, frame: &mut Frame) {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        let input = Paragraph::new(self.filter_query.clone()).block(
            Block::default()
                .title(" Filter Providers ")
                .borders(Borders::ALL)
                .style(Style::default().bg(Color::Rgb(15, 15, 24))),
        );
        frame.render_widget(input, chunks[0]);

        let results: Vec<Line> = if self.filter_results.is_empty() {
            vec![Line::from(Span::styled(
                "No matches",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.filter_results
                .iter()
                .enumerate()
                .map(|(idx, &toggle_idx)| {
                    let toggle = &self.composer.toggles()[toggle_idx];
                    let checkbox = if toggle.checked { "[x]" } else { "[ ]" };
                    let label = format!("{checkbox} {}", toggle.label);

                    if idx == self.filter_selected {
                        Line::from(Span::styled(
                            format!("> {label}"),
                            Style::default().fg(Color::Black).bg(Color::Cyan),
                        ))
                    } else {
                        Line::from(Span::styled(
                            format!("  {label}"),
                            Style::default().fg(Color::Gray),
                        ))
                    }
                })
                .collect()
        };

        let result_block = Paragraph::new(results).block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT)
                .style(Style::default().bg(Color::Rgb(10, 10, 18))),
        );
        frame.render_widget(result_block, chunks[1]);

        let footer = Paragraph::new(" Enter: toggle  Esc: close  j/k: move ").block(
            Block::default().borders(Borders::ALL).style(
                Style::default()
                    .bg(Color::Rgb(15, 15, 24))
                    .fg(Color::DarkGray),
            ),
        );
        frame.render_widget(footer, chunks[2]);

        let cursor_x = chunks[0].x + 1 + self.filter_query.len() as u16;
        let cursor_y = chunks[0].y + 1;
        frame.set_cursor_position((cursor_x, cursor_y));
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
    use std::io::Write;

    fn test_config() -> AppConfig {
        toml::from_str(
            r#"
[command]
base = "pip install"
package = "ecologits"

[ui]
tick_ms = 50
notification_secs = 0

[[providers]]
value = "openai"
label = "OpenAI"

[[providers]]
value = "anthropic"
label = "Anthropic"

[[providers]]
value = "mistralai"
label = "Mistral AI"
"#,
        )
        .unwrap()
    }

    fn key(code: KeyCode) -> Msg {
        Msg::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn space_toggles_provider_under_cursor() {
        let mut app = App::new(test_config()).unwrap();
        assert_eq!(app.command(), "pip install ecologits");

        app.update(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(app.command(), "pip install ecologits[openai]");

        app.update(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(app.command(), "pip install ecologits");
    }

    #[test]
    fn cursor_movement_targets_other_providers() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char('j'))).unwrap();
        app.update(key(KeyCode::Char('j'))).unwrap();
        app.update(key(KeyCode::Char(' '))).unwrap();
        assert_eq!(app.command(), "pip install ecologits[mistralai]");

        // Clamped at the end of the list.
        app.update(key(KeyCode::Char('j'))).unwrap();
        app.update(key(KeyCode::Char('x'))).unwrap();
        assert_eq!(app.command(), "pip install ecologits");
    }

    #[test]
    fn select_all_and_none() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char('a'))).unwrap();
        assert_eq!(
            app.command(),
            "pip install ecologits[openai,anthropic,mistralai]"
        );

        app.update(key(KeyCode::Char('n'))).unwrap();
        assert_eq!(app.command(), "pip install ecologits");
    }

    #[test]
    fn enter_accepts_and_quits() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char(' '))).unwrap();
        app.update(key(KeyCode::Enter)).unwrap();
        assert!(app.should_quit);
        assert_eq!(
            app.accepted_command(),
            Some("pip install ecologits[openai]")
        );
    }

    #[test]
    fn quit_without_accepting_prints_nothing() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_quit);
        assert_eq!(app.accepted_command(), None);
    }

    #[test]
    fn filter_narrows_and_enter_toggles() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char('/'))).unwrap();
        assert_eq!(app.mode, Mode::Filter);
        assert_eq!(app.filter_results.len(), 3);

        app.update(key(KeyCode::Char('m'))).unwrap();
        app.update(key(KeyCode::Char('s'))).unwrap();
        app.update(key(KeyCode::Char('t'))).unwrap();
        assert_eq!(app.filter_results, vec![2]);

        app.update(key(KeyCode::Enter)).unwrap();
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.command(), "pip install ecologits[mistralai]");
        // Cursor follows the toggled row.
        assert_eq!(app.cursor, 2);
    }

    #[test]
    fn filter_esc_leaves_state_untouched() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char('/'))).unwrap();
        app.update(key(KeyCode::Char('z'))).unwrap();
        app.update(key(KeyCode::Esc)).unwrap();
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.command(), "pip install ecologits");
    }

    #[test]
    fn reload_preserves_checked_state_by_value() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char(' '))).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[command]
base = "pip install"
package = "ecologits"

[ui]
tick_ms = 50
notification_secs = 0

[[providers]]
value = "openai"

[[providers]]
value = "cohere"
"#
        )
        .unwrap();

        app.reload_config(file.path()).unwrap();
        assert_eq!(app.command(), "pip install ecologits[openai]");
        assert_eq!(app.composer.len(), 2);
    }

    #[test]
    fn reload_failure_keeps_current_catalog() {
        let mut app = App::new(test_config()).unwrap();
        app.update(key(KeyCode::Char(' '))).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "broken [").unwrap();

        assert!(app.reload_config(file.path()).is_err());
        assert_eq!(app.command(), "pip install ecologits[openai]");
    }

    #[test]
    fn tick_expires_notifications() {
        let mut app = App::new(test_config()).unwrap();
        // notification_secs = 0: expired as soon as a tick arrives.
        app.push_notification("hello".to_string());
        assert_eq!(app.notifications.len(), 1);
        std::thread::sleep(Duration::from_millis(2));
        app.update(Msg::Tick).unwrap();
        assert!(app.notifications.is_empty());
    }

    #[test]
    fn messages_drive_the_same_transitions_as_keys() {
        let mut app = App::new(test_config()).unwrap();
        app.update(Msg::MoveCursor(MoveDir::Down)).unwrap();
        app.update(Msg::ToggleUnderCursor).unwrap();
        assert_eq!(app.command(), "pip install ecologits[anthropic]");

        app.update(Msg::SelectAll).unwrap();
        assert_eq!(
            app.command(),
            "pip install ecologits[openai,anthropic,mistralai]"
        );
        app.update(Msg::SelectNone).unwrap();

        app.update(Msg::SetMode(Mode::Filter)).unwrap();
        assert_eq!(app.mode, Mode::Filter);
        app.update(Msg::SetMode(Mode::Normal)).unwrap();

        app.update(Msg::Accept).unwrap();
        assert!(app.should_quit);
        assert_eq!(app.accepted_command(), Some("pip install ecologits"));
    }
}

//! Interactive report state and TUI event loop.
//!
//! [`App`] owns the theme, the [`DataManager`] and the report built for the
//! selected year. Key handling is separate from the terminal loop so it can be
//! driven directly in tests.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame, Terminal,
};

use viability_core::error::{ReportError, Result};
use viability_data::reports::{select_year, ViabilityReport};
use viability_runtime::data_manager::DataManager;

use crate::report_view::{self, Section};
use crate::themes::Theme;

/// Root state of the interactive report.
pub struct App {
    pub theme: Theme,
    pub manager: DataManager,
    /// Year currently shown, `None` until data with at least one year loads.
    pub year: Option<i32>,
    /// Years present in the loaded data, ascending.
    pub years: Vec<i32>,
    pub section: Section,
    pub report: Option<ViabilityReport>,
    /// Message shown in the footer (load problems, bad year, etc.).
    pub status: Option<String>,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    /// Create the app and perform the first load.
    ///
    /// `requested_year` is honoured when the data has it; otherwise the
    /// latest year is shown and the footer says why.
    pub fn new(theme_name: &str, manager: DataManager, requested_year: Option<i32>) -> Self {
        let mut app = Self {
            theme: Theme::from_name(theme_name),
            manager,
            year: requested_year,
            years: Vec::new(),
            section: Section::Volumetry,
            report: None,
            status: None,
            should_quit: false,
        };
        app.reload(false);
        app
    }

    /// Fetch the dataset (cached unless `force`) and rebuild the report.
    pub fn reload(&mut self, force: bool) {
        let dataset = self.manager.get_data(force);
        self.years = dataset.available_years();
        self.status = None;

        let year = match select_year(dataset, self.year) {
            Ok(year) => Some(year),
            Err(err) => {
                self.status = Some(err.to_string());
                select_year(dataset, None).ok()
            }
        };
        self.year = year;

        self.report = match year.map(|y| ViabilityReport::build(dataset, y)) {
            Some(Ok(report)) => Some(report),
            Some(Err(err)) => {
                self.status = Some(err.to_string());
                None
            }
            None => None,
        };

        if self.status.is_none() {
            self.status = self.manager.last_error().map(str::to_string);
        }
        tracing::debug!(year = ?self.year, years = ?self.years, "report rebuilt");
    }

    /// Move `delta` steps through the available years, clamped at both ends.
    pub fn shift_year(&mut self, delta: isize) {
        let Some(current) = self.year else {
            return;
        };
        let Some(pos) = self.years.iter().position(|y| *y == current) else {
            return;
        };
        let target = pos
            .saturating_add_signed(delta)
            .min(self.years.len().saturating_sub(1));
        if target != pos {
            self.year = Some(self.years[target]);
            self.reload(false);
        }
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Left => self.shift_year(-1),
            KeyCode::Right => self.shift_year(1),
            KeyCode::Tab => self.section = self.section.next(),
            KeyCode::Char('r') => self.reload(true),
            KeyCode::Char('c') => {
                self.manager.invalidate_cache();
                self.reload(false);
            }
            KeyCode::Char(d) => {
                if let Some(section) = Section::from_digit(d) {
                    self.section = section;
                }
            }
            _ => {}
        }
    }

    /// Run the interactive report until `q` / `Ctrl+C`.
    ///
    /// Terminal setup, drawing and input failures surface as
    /// [`ReportError::Terminal`].
    pub fn run(self) -> Result<()> {
        self.run_terminal().map_err(terminal_error)
    }

    fn run_terminal(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(err) = terminal.draw(|frame| self.render(frame)) {
                break Err(err);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Ok(_) => {}
                    Err(err) => break Err(err),
                },
                Ok(false) => {}
                Err(err) => break Err(err),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);

        let titles: Vec<&str> = Section::ALL.iter().map(|s| s.title()).collect();
        let tabs = Tabs::new(titles)
            .select(self.section.index())
            .style(self.theme.dim)
            .highlight_style(self.theme.selected)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(tabs, chunks[1]);

        match &self.report {
            Some(report) => {
                report_view::render_section(frame, chunks[2], report, self.section, &self.theme)
            }
            None => {
                let message = self.status.as_deref().unwrap_or("Nothing loaded yet.");
                report_view::render_no_data(frame, chunks[2], message, &self.theme);
            }
        }

        self.render_footer(frame, chunks[3]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string());
        let count = self.report.as_ref().map_or(0, |r| r.transaction_count);
        let cache = self
            .manager
            .cache_age()
            .map(|age| format!("cached {}s ago", age.as_secs()))
            .unwrap_or_else(|| "not cached".to_string());

        let line = Line::from(vec![
            Span::styled(" Viability report ", self.theme.header),
            Span::styled("year ", self.theme.label),
            Span::styled(format!("◀ {} ▶", year), self.theme.selected),
            Span::styled(format!("  {} transactions", count), self.theme.text),
            Span::styled(
                format!("  {}  {}", self.manager.data_dir().display(), cache),
                self.theme.dim,
            ),
        ]);
        frame.render_widget(
            Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    /// Footer style for the status message: an error when nothing could be
    /// reported, a warning when a report is still shown.
    fn status_style(&self) -> Style {
        if self.report.is_none() {
            self.theme.error
        } else {
            self.theme.warning
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.status {
            Some(status) => Line::from(Span::styled(status.clone(), self.status_style())),
            None => Line::from(Span::styled(
                "←/→ year  Tab/1-4 section  r reload  c clear cache  q quit",
                self.theme.dim,
            )),
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn terminal_error(err: io::Error) -> ReportError {
    ReportError::Terminal(err.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::fs;
    use std::path::Path;

    fn write_fixture(dir: &Path) {
        fs::write(
            dir.join("clientes.json"),
            r#"{"items": [
                {"id": 1, "nome": "city hall", "organizacao": {"id": 2}},
                {"id": 3, "nome": "acme", "organizacao": {"id": 4}}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("transacoes_1.json"),
            r#"[
                {"data_transacao": "2023-05-02T10:00:00", "valor_bruto": 80, "cliente_id": 1},
                {"data_transacao": "2024-01-05T10:00:00", "valor_bruto": 100, "cliente_id": 1},
                {"data_transacao": "2024-03-05T10:00:00", "valor_bruto": 50, "cliente_id": 3}
            ]"#,
        )
        .unwrap();
    }

    fn app_with_fixture(year: Option<i32>) -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path());
        let app = App::new("dark", DataManager::new(3600, dir.path()), year);
        (dir, app)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_terminal_failures_map_to_terminal_error() {
        let err = terminal_error(io::Error::new(io::ErrorKind::Other, "not a tty"));
        assert!(matches!(err, ReportError::Terminal(_)));
        assert_eq!(err.to_string(), "Terminal error: not a tty");
    }

    #[test]
    fn test_new_selects_latest_year() {
        let (_dir, app) = app_with_fixture(None);
        assert_eq!(app.years, vec![2023, 2024]);
        assert_eq!(app.year, Some(2024));
        assert_eq!(app.report.as_ref().map(|r| r.transaction_count), Some(2));
        assert!(app.status.is_none());
    }

    #[test]
    fn test_unknown_requested_year_falls_back_with_status() {
        let (_dir, app) = app_with_fixture(Some(1999));
        assert_eq!(app.year, Some(2024));
        assert!(app.status.as_deref().unwrap_or("").contains("1999"));
        assert_eq!(app.status_style(), app.theme.warning);
    }

    #[test]
    fn test_arrow_keys_move_between_years() {
        let (_dir, mut app) = app_with_fixture(None);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.year, Some(2023));
        assert_eq!(app.report.as_ref().map(|r| r.year), Some(2023));
        press(&mut app, KeyCode::Left);
        assert_eq!(app.year, Some(2023));
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.year, Some(2024));
    }

    #[test]
    fn test_section_keys() {
        let (_dir, mut app) = app_with_fixture(None);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.section, Section::Operational);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.section, Section::Charts);
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.section, Section::Charts);
    }

    #[test]
    fn test_quit_keys() {
        let (_dir, mut app) = app_with_fixture(None);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);

        let (_dir, mut app) = app_with_fixture(None);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_clear_cache_reloads_without_quitting() {
        let (_dir, mut app) = app_with_fixture(None);
        press(&mut app, KeyCode::Char('c'));
        assert!(!app.should_quit);
        assert!(app.manager.cache_age().is_some());
        assert_eq!(app.year, Some(2024));
    }

    #[test]
    fn test_reload_picks_up_new_year() {
        let (dir, mut app) = app_with_fixture(None);
        fs::write(
            dir.path().join("transacoes_2.json"),
            r#"{"items": [{"data_transacao": "2025-02-01", "valor_bruto": 10}]}"#,
        )
        .unwrap();
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.years, vec![2023, 2024, 2025]);
        assert_eq!(app.year, Some(2024));
    }

    #[test]
    fn test_empty_directory_shows_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new("classic", DataManager::new(60, dir.path()), None);
        assert!(app.report.is_none());
        assert!(app.year.is_none());
        assert!(app.status.is_some());
        assert_eq!(app.status_style(), app.theme.error);

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("No transaction data found"));
    }

    #[test]
    fn test_render_every_section_does_not_panic() {
        let (_dir, mut app) = app_with_fixture(None);
        for _ in Section::ALL {
            let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
            terminal.draw(|f| app.render(f)).unwrap();
            press(&mut app, KeyCode::Tab);
        }
    }
}

//! Main TUI application.
//!
//! Renders the scroll buffer and translates key presses into control plane
//! calls. Control calls that block (start, stop, export) run inside
//! `block_in_place` so the event poller keeps going.

use std::io::{self, Stderr};
use std::panic::{set_hook, take_hook};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::cursor;
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use tokio::task::block_in_place;
use tracing::{debug, warn};
use tui_input::Input;
use tui_input::backend::crossterm::EventHandler as _;

use sift_pipeline::{ControlPlane, Pipeline, SessionState, SessionStatus};
use sift_sinks::{ExportFormat, ScrollBuffer, Viewport};

use super::action::Action;
use super::event::{Event, EventHandler};
use super::theme::Theme;
use super::ui::{self, Notice, Screen};

/// How long a notice stays under the table
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// What the packet view shows and how it exports
pub struct ViewConfig {
    pub scroll: Arc<ScrollBuffer>,
    pub export_format: ExportFormat,
    /// Shown in the header when the subscriber feed is on
    pub tap_socket: Option<String>,
}

enum Mode {
    Browse,
    /// Editing the capture filter
    Filter(Input),
}

/// Main TUI application.
pub struct App {
    terminal: Terminal<CrosstermBackend<Stderr>>,
    events: EventHandler,
    view: ViewConfig,
    viewport: Viewport,
    mode: Mode,
    theme: Theme,
    notice: Option<(Notice, Instant)>,
    should_quit: bool,
}

impl App {
    pub fn new(view: ViewConfig) -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stderr()))
            .context("failed to create terminal")?;

        Ok(Self {
            terminal,
            events: EventHandler::new(Duration::from_millis(250)),
            view,
            viewport: Viewport::default(),
            mode: Mode::Browse,
            theme: Theme::default(),
            notice: None,
            should_quit: false,
        })
    }

    /// Run until the user quits; the terminal is restored on every path
    pub async fn run(mut self, pipeline: &mut Pipeline) -> Result<()> {
        self.enter()?;
        let outcome = self.event_loop(pipeline).await;
        self.exit()?;
        outcome
    }

    async fn event_loop(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        loop {
            let status = pipeline.control_mut().status();
            self.draw(&status)?;

            match self.events.next().await {
                Some(Event::Key(key)) => self.handle_key(key, pipeline.control_mut()),
                Some(Event::Tick) | Some(Event::Resize) => {}
                None => break,
            }

            if self.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Enter TUI mode.
    fn enter(&mut self) -> Result<()> {
        Self::init_panic_hook();
        enable_raw_mode().context("failed to enable raw mode")?;
        crossterm::execute!(io::stderr(), EnterAlternateScreen, cursor::Hide)
            .context("failed to enter alternate screen")?;
        self.terminal.clear().context("failed to clear terminal")?;
        Ok(())
    }

    /// Exit TUI mode.
    fn exit(&mut self) -> Result<()> {
        Self::restore_terminal().context("failed to restore terminal")
    }

    fn init_panic_hook() {
        let original_hook = take_hook();
        set_hook(Box::new(move |panic_info| {
            let _ = Self::restore_terminal();
            original_hook(panic_info);
        }));
    }

    fn restore_terminal() -> Result<()> {
        if crossterm::terminal::is_raw_mode_enabled()? {
            disable_raw_mode()?;
            crossterm::execute!(io::stderr(), LeaveAlternateScreen, cursor::Show)?;
        }
        Ok(())
    }

    /// Rows the table can show at the current terminal size
    fn page_height(&self) -> Result<usize> {
        let size = self.terminal.size().context("failed to read terminal size")?;
        let area = Rect::new(0, 0, size.width, size.height);
        Ok(ui::table_rows(area, matches!(self.mode, Mode::Filter(_))))
    }

    fn draw(&mut self, status: &SessionStatus) -> Result<()> {
        if self
            .notice
            .as_ref()
            .is_some_and(|(_, shown)| shown.elapsed() >= NOTICE_TTL)
        {
            self.notice = None;
        }

        let height = self.page_height()?;
        let total = self.view.scroll.len();
        let range = self.viewport.visible(total, height);
        let first_row = range.start;
        let rows = self.view.scroll.window(range);

        let screen = Screen {
            status,
            rows: &rows,
            first_row,
            total,
            following: self.viewport.is_following(),
            prompt: match &self.mode {
                Mode::Filter(input) => Some(input),
                Mode::Browse => None,
            },
            notice: self.notice.as_ref().map(|(n, _)| n),
            tap_socket: self.view.tap_socket.as_deref(),
        };
        let theme = &self.theme;

        self.terminal
            .draw(|frame| ui::render(frame, &screen, theme))
            .context("failed to draw frame")?;
        Ok(())
    }

    fn show(&mut self, notice: Notice) {
        self.notice = Some((notice, Instant::now()));
    }

    fn handle_key(&mut self, key: KeyEvent, control: &mut ControlPlane) {
        match &mut self.mode {
            Mode::Filter(input) => match key.code {
                KeyCode::Enter => {
                    let filter = input.value().trim().to_string();
                    self.mode = Mode::Browse;
                    self.apply_filter(&filter, control);
                }
                KeyCode::Esc => self.mode = Mode::Browse,
                _ => {
                    input.handle_event(&CrosstermEvent::Key(key));
                }
            },
            Mode::Browse => {
                if let Some(action) = Action::from_key(key) {
                    self.dispatch(action, control);
                }
            }
        }
    }

    fn dispatch(&mut self, action: Action, control: &mut ControlPlane) {
        let len = self.view.scroll.len();
        let height = match self.page_height() {
            Ok(h) => h.max(1),
            Err(e) => {
                warn!(error = %e, "failed to read terminal size");
                1
            }
        };
        debug!(?action, "key action");

        match action {
            Action::Quit => self.should_quit = true,
            Action::ScrollUp => self.viewport.up(1, len, height),
            Action::ScrollDown => self.viewport.down(1, len, height),
            Action::PageUp => self.viewport.up(height, len, height),
            Action::PageDown => self.viewport.down(height, len, height),
            Action::Top => self.viewport.top(),
            Action::Bottom => self.viewport.bottom(),
            Action::TogglePause => self.toggle_pause(control),
            Action::EditFilter => {
                let current = control.status().filter;
                self.mode = Mode::Filter(Input::new(current));
            }
            Action::Export => self.export(control),
            Action::Clear => {
                control.clear();
                self.viewport.bottom();
                self.show(Notice::info("cleared"));
            }
        }
    }

    fn toggle_pause(&mut self, control: &mut ControlPlane) {
        let status = control.status();
        let outcome = match status.state {
            SessionState::Running => control.pause().map(|()| "capture paused"),
            SessionState::Paused => control.resume().map(|()| "capture resumed"),
            SessionState::Idle => {
                let Some(source) = status.source else {
                    self.show(Notice::error("no source to restart"));
                    return;
                };
                block_in_place(|| control.start(source, &status.filter)).map(|()| "capture started")
            }
        };

        match outcome {
            Ok(text) => self.show(Notice::info(text)),
            Err(e) => self.show(Notice::error(e.to_string())),
        }
    }

    /// Restart the capture with a new filter, or start one if it has ended
    fn apply_filter(&mut self, filter: &str, control: &mut ControlPlane) {
        let status = control.status();
        let outcome = match (status.state, status.source) {
            (SessionState::Idle, Some(source)) => block_in_place(|| control.start(source, filter)),
            _ => block_in_place(|| control.reconfigure_filter(filter)),
        };

        match outcome {
            Ok(()) if filter.is_empty() => self.show(Notice::info("filter cleared")),
            Ok(()) => self.show(Notice::info(format!("filter: {filter}"))),
            Err(e) => self.show(Notice::error(e.to_string())),
        }
    }

    fn export(&mut self, control: &mut ControlPlane) {
        let format = self.view.export_format;
        match block_in_place(|| control.export(format, None)) {
            Ok(report) => {
                let paths = report
                    .paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.show(Notice::info(format!(
                    "exported {} records to {paths}",
                    report.records
                )));
            }
            Err(e) => self.show(Notice::error(e.to_string())),
        }
    }
}

//! Rendering for the packet view.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};
use tui_input::Input;

use sift_pipeline::{SessionState, SessionStatus};
use sift_protocol::PacketRecord;

use super::theme::Theme;

const COLUMNS: [&str; 8] = [
    "Time",
    "Source",
    "Destination",
    "Protocol",
    "Src Port",
    "Dst Port",
    "Size",
    "Payload",
];

/// One-line message under the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Everything a frame needs
pub struct Screen<'a> {
    pub status: &'a SessionStatus,
    /// Visible records, oldest first
    pub rows: &'a [PacketRecord],
    /// Index of `rows[0]` in the scroll buffer
    pub first_row: usize,
    /// Records in the scroll buffer
    pub total: usize,
    pub following: bool,
    /// Filter being edited, if the prompt is open
    pub prompt: Option<&'a Input>,
    pub notice: Option<&'a Notice>,
    pub tap_socket: Option<&'a str>,
}

fn areas(area: Rect, prompting: bool) -> [Rect; 5] {
    let prompt_height = if prompting { 3 } else { 0 };
    Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(prompt_height),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area)
}

/// Number of record rows the table shows in `area`
pub fn table_rows(area: Rect, prompting: bool) -> usize {
    let [_, table, ..] = areas(area, prompting);
    // borders and the column header
    table.height.saturating_sub(3) as usize
}

pub fn render(frame: &mut Frame, screen: &Screen<'_>, theme: &Theme) {
    let [header, table, prompt, notice, footer] = areas(frame.area(), screen.prompt.is_some());

    render_header(frame, header, screen, theme);
    render_table(frame, table, screen, theme);
    if let Some(input) = screen.prompt {
        render_prompt(frame, prompt, input, theme);
    }
    if let Some(n) = screen.notice {
        let style = if n.is_error {
            theme.error_style()
        } else {
            theme.success_style()
        };
        frame.render_widget(Paragraph::new(format!(" {}", n.text)).style(style), notice);
    }
    render_footer(frame, footer, screen, theme);
}

fn render_header(frame: &mut Frame, area: Rect, screen: &Screen<'_>, theme: &Theme) {
    let status = screen.status;
    let source = status
        .source
        .as_ref()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());
    let filter = if status.filter.is_empty() {
        "(none)"
    } else {
        status.filter.as_str()
    };

    let mut spans = vec![
        Span::styled(" sift ", theme.header_style()),
        Span::styled(source, theme.brand_style()),
        Span::raw("  filter: "),
        Span::raw(filter.to_string()),
        Span::raw("  "),
    ];
    spans.extend(state_spans(status, theme));
    if let Some(socket) = screen.tap_socket {
        spans.push(Span::styled(format!("  tap {socket}"), theme.muted_style()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn state_spans(status: &SessionStatus, theme: &Theme) -> Vec<Span<'static>> {
    match status.state {
        SessionState::Running => vec![Span::styled("● running", theme.success_style())],
        SessionState::Paused => vec![Span::styled("‖ paused", theme.warning_style())],
        SessionState::Idle => {
            let mut spans = vec![Span::styled("○ idle", theme.muted_style())];
            if let Some(reason) = &status.last_exit {
                spans.push(Span::styled(format!(" ({reason})"), theme.muted_style()));
            }
            spans
        }
    }
}

fn render_table(frame: &mut Frame, area: Rect, screen: &Screen<'_>, theme: &Theme) {
    let rows = screen.rows.iter().map(|r| {
        Row::new(vec![
            Cell::from(r.captured_at.as_str()),
            Cell::from(r.source_addr.as_str()),
            Cell::from(r.dest_addr.as_str()),
            Cell::from(r.protocol.as_str()).style(theme.protocol_style(&r.protocol)),
            Cell::from(r.source_port.as_str()),
            Cell::from(r.dest_port.as_str()),
            Cell::from(r.size_bytes.to_string()),
            Cell::from(r.payload_summary.as_str()),
        ])
    });

    let widths = [
        Constraint::Length(8),
        Constraint::Length(22),
        Constraint::Length(22),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Min(10),
    ];

    let border = if screen.prompt.is_some() {
        theme.unfocused_border()
    } else {
        theme.focused_border()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(" Packets ")
        .title_top(Line::from(position(screen)).right_aligned());

    let table = Table::new(rows, widths)
        .header(Row::new(COLUMNS).style(theme.header_style()))
        .block(block);
    frame.render_widget(table, area);
}

/// Scroll position label for the table title
fn position(screen: &Screen<'_>) -> String {
    if screen.following {
        return format!(" live {} ", screen.total);
    }
    let end = screen.first_row + screen.rows.len();
    let percent = if screen.total == 0 {
        100
    } else {
        end * 100 / screen.total
    };
    format!(" {end}/{} {percent}% ", screen.total)
}

fn render_prompt(frame: &mut Frame, area: Rect, input: &Input, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.focused_border())
        .title(" Capture filter ");
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll = input.visual_scroll(inner_width);

    let paragraph = Paragraph::new(input.value())
        .scroll((0, scroll as u16))
        .block(block);
    frame.render_widget(paragraph, area);

    let cursor = input.visual_cursor().saturating_sub(scroll) as u16;
    frame.set_cursor_position((area.x + 1 + cursor, area.y + 1));
}

fn render_footer(frame: &mut Frame, area: Rect, screen: &Screen<'_>, theme: &Theme) {
    let keys = if screen.prompt.is_some() {
        " enter apply  esc cancel"
    } else {
        " q quit  ↑↓ scroll  g/G top/bottom  e pause  b filter  d export  c clear"
    };
    let counts = format!(
        "records {}  dropped {} ",
        screen.status.record_count, screen.status.dropped
    );

    let [left, right] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(counts.chars().count() as u16),
    ])
    .areas(area);
    frame.render_widget(Paragraph::new(keys).style(theme.muted_style()), left);
    frame.render_widget(Paragraph::new(counts).style(theme.muted_style()), right);
}

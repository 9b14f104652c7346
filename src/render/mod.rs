//! Terminal rendering of stack events and outputs

use chrono::Local;
use crossterm::style::{Color, Stylize};
use std::io::Write;
use tracing::warn;

use crate::stack::{StackEvent, StackOutput, StatusKind};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_WIDTH: usize = 19;
const RESOURCE_ID_WIDTH: usize = 32;
const RESOURCE_TYPE_WIDTH: usize = 36;
const STATUS_WIDTH: usize = 32;
/// Reason column never shrinks below this
const MIN_REASON_WIDTH: usize = 24;
/// Used when the terminal size cannot be queried
pub const DEFAULT_TERMINAL_WIDTH: usize = 160;

/// Consumer of the ordered event stream
pub trait Renderer {
    fn render_event(&mut self, event: &StackEvent);

    fn render_outputs(&mut self, stack_name: &str, outputs: &[StackOutput]);
}

/// Column layout writer for a terminal or any `Write`
pub struct TerminalRenderer<W: Write> {
    out: W,
    color: bool,
    width: usize,
}

impl TerminalRenderer<std::io::Stdout> {
    /// Stdout renderer sized to the current terminal
    pub fn stdout(color: bool) -> Self {
        let width = crossterm::terminal::size()
            .map(|(cols, _)| cols as usize)
            .unwrap_or(DEFAULT_TERMINAL_WIDTH);
        Self::new(std::io::stdout(), color, width)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, color: bool, width: usize) -> Self {
        Self { out, color, width }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn status_color(kind: StatusKind) -> Color {
        match kind {
            StatusKind::InProgress => Color::Yellow,
            StatusKind::Complete => Color::Green,
            StatusKind::Failed => Color::Red,
        }
    }

    fn reason_width(&self) -> usize {
        let fixed = TIMESTAMP_WIDTH + 2 + RESOURCE_ID_WIDTH + RESOURCE_TYPE_WIDTH + STATUS_WIDTH + 3;
        self.width.saturating_sub(fixed).max(MIN_REASON_WIDTH)
    }

    /// Format one event as a single line, without the trailing newline
    pub fn format_event(&self, event: &StackEvent) -> String {
        let timestamp = event.timestamp.with_timezone(&Local).format(TIMESTAMP_FORMAT);

        let status = format!("{:<width$}", event.resource_status, width = STATUS_WIDTH);
        let status = if self.color {
            status.with(Self::status_color(event.status_kind)).to_string()
        } else {
            status
        };

        let reason = event
            .resource_status_reason
            .as_deref()
            .map(|r| truncate(&r.replace(['\n', '\r'], " "), self.reason_width()))
            .unwrap_or_default();

        format!(
            "{}  {:<id_w$} {:<type_w$} {} {}",
            timestamp,
            event.logical_resource_id,
            event.resource_type,
            status,
            reason,
            id_w = RESOURCE_ID_WIDTH,
            type_w = RESOURCE_TYPE_WIDTH,
        )
        .trim_end()
        .to_string()
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write output: {}", e);
        }
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render_event(&mut self, event: &StackEvent) {
        let line = self.format_event(event);
        self.write_line(&line);
    }

    fn render_outputs(&mut self, stack_name: &str, outputs: &[StackOutput]) {
        if outputs.is_empty() {
            self.write_line(&format!("No outputs for {}", stack_name));
            return;
        }

        let header = format!("Outputs for {}:", stack_name);
        let header = if self.color {
            header.bold().to_string()
        } else {
            header
        };
        self.write_line(&header);

        let key_width = outputs.iter().map(|o| o.key.len()).max().unwrap_or(0);
        for output in outputs {
            let mut line = format!("  {:<width$} = {}", output.key, output.value, width = key_width);
            if let Some(description) = &output.description {
                line.push_str(&format!("  # {}", description));
            }
            self.write_line(&line);
        }
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

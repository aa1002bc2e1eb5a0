//! Terminal presentation
//!
//! [`TerminalRenderer`] prints a growing output buffer incrementally: each
//! update re-decodes the whole buffer and writes only the part not yet
//! printed. A trailing escape sequence that is still incomplete is held back
//! until the rest of it arrives.
//!
//! The table helpers render snapshot lists with `prettytable`.

use std::io::Write;

use colored::{Color, ColoredString, Colorize};
use prettytable::{row, Table};

use crate::ansi::{self, AnsiColor, AnsiSegment};
use crate::api::{AccountInfo, AuthStatus, BrowseResult, ProjectInfo, RepoInfo, SessionInfo, SessionStatus};
use crate::connection::ConnectionStatus;
use crate::error::Result;
use crate::protocol::{Frame, FramePayload};
use crate::store::SessionTemplate;

fn terminal_color(color: AnsiColor) -> Color {
    match color {
        AnsiColor::Black => Color::Black,
        AnsiColor::Red => Color::Red,
        AnsiColor::Green => Color::Green,
        AnsiColor::Yellow => Color::Yellow,
        AnsiColor::Blue => Color::Blue,
        AnsiColor::Magenta => Color::Magenta,
        AnsiColor::Cyan => Color::Cyan,
        AnsiColor::White => Color::White,
        AnsiColor::BrightBlack => Color::BrightBlack,
        AnsiColor::BrightRed => Color::BrightRed,
        AnsiColor::BrightGreen => Color::BrightGreen,
        AnsiColor::BrightYellow => Color::BrightYellow,
        AnsiColor::BrightBlue => Color::BrightBlue,
        AnsiColor::BrightMagenta => Color::BrightMagenta,
        AnsiColor::BrightCyan => Color::BrightCyan,
        AnsiColor::BrightWhite => Color::BrightWhite,
    }
}

/// Apply a decoded style to `text`
pub fn styled(text: &str, segment: &AnsiSegment<'_>) -> ColoredString {
    let style = segment.style;
    let mut out = text.normal();
    if let Some(color) = style.color {
        out = out.color(terminal_color(color));
    }
    if let Some(color) = style.bg_color {
        out = out.on_color(terminal_color(color));
    }
    if style.bold {
        out = out.bold();
    }
    if style.dim {
        out = out.dimmed();
    }
    if style.underline {
        out = out.underline();
    }
    out
}

/// Incremental printer for an append-only output buffer
#[derive(Debug)]
pub struct TerminalRenderer<W: Write> {
    out: W,
    printed: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    /// Bytes of the buffer already written
    pub fn printed(&self) -> usize {
        self.printed
    }

    /// Forget what was printed, e.g. after the buffer was cleared
    pub fn reset(&mut self) {
        self.printed = 0;
    }

    /// Print whatever `buffer` gained since the last call
    ///
    /// A buffer shorter than what was already printed is treated as a new
    /// buffer and printed from the start.
    pub fn update(&mut self, buffer: &str) -> Result<()> {
        if buffer.len() < self.printed {
            self.reset();
        }
        let stable = ansi::stable_len(buffer);
        if stable <= self.printed {
            return Ok(());
        }

        for segment in ansi::decode(&buffer[..stable]) {
            if segment.end() <= self.printed {
                continue;
            }
            let start = self.printed.max(segment.offset) - segment.offset;
            let text = &segment.text[start..];
            if segment.style.is_plain() {
                write!(self.out, "{}", text)?;
            } else {
                write!(self.out, "{}", styled(text, &segment))?;
            }
        }
        self.out.flush()?;
        self.printed = stable;
        Ok(())
    }

    /// Print a non-output frame as its own line
    pub fn frame(&mut self, frame: &Frame) -> Result<()> {
        if let Some(line) = frame_line(frame) {
            writeln!(self.out, "{}", line)?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One-line rendering of a frame that is not plain output
pub fn frame_line(frame: &Frame) -> Option<ColoredString> {
    let text = frame.display_text();
    let line = match &frame.payload {
        FramePayload::Output { .. } => return None,
        FramePayload::Status { .. } => format!("[status] {}", text).cyan(),
        FramePayload::Error { .. } => format!("[error] {}", text).red().bold(),
        FramePayload::AccountSwitch { .. } => format!("[account] {}", text).yellow(),
        FramePayload::TaskComplete { .. } => format!("[done] {}", text).green().bold(),
        FramePayload::Unknown { kind, .. } => format!("[{}] {}", kind, text).dimmed(),
    };
    Some(line)
}

/// Colored connection status label
pub fn connection_badge(status: ConnectionStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        ConnectionStatus::Open => label.green(),
        ConnectionStatus::Connecting => label.yellow(),
        ConnectionStatus::Closed => label.dimmed(),
        ConnectionStatus::Error => label.red(),
    }
}

fn session_status(status: SessionStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        SessionStatus::Running => label.green(),
        SessionStatus::Starting | SessionStatus::Idle => label.normal(),
        SessionStatus::RateLimited => label.yellow(),
        SessionStatus::Error => label.red(),
        SessionStatus::Stopped | SessionStatus::Unknown => label.dimmed(),
    }
}

fn auth_status(status: AuthStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        AuthStatus::Authenticated => label.green(),
        AuthStatus::Authenticating => label.yellow(),
        AuthStatus::NeedsAuth | AuthStatus::Error => label.red(),
    }
}

pub fn sessions_table(sessions: &[SessionInfo]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["ID", "Name", "Project", "Account", "Status", "Messages", "Last Activity"]);
    for session in sessions {
        table.add_row(row![
            session.id,
            session.name,
            session.project_name,
            session.account_id,
            session_status(session.status),
            session.message_count,
            session.last_activity
        ]);
    }
    table
}

pub fn accounts_table(accounts: &[AccountInfo]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["ID", "Name", "Tier", "Auth", "Rate Limited", "Usage", "Sessions"]);
    for account in accounts {
        table.add_row(row![
            account.id,
            account.name,
            account.tier,
            auth_status(account.auth_status),
            if account.is_rate_limited { "Yes" } else { "No" },
            format!(
                "{}/{} ({:.0}%)",
                account.messages_today, account.daily_estimate, account.usage_pct
            ),
            account.active_sessions
        ]);
    }
    table
}

pub fn projects_table(projects: &[ProjectInfo]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["ID", "Name", "Repository", "Sessions", "Updated"]);
    for project in projects {
        table.add_row(row![
            project.id,
            project.name,
            project.repo_path,
            project.session_count,
            project.updated_at
        ]);
    }
    table
}

pub fn repos_table(repos: &[RepoInfo]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["Name", "Path", "Branch", "Compose", "Sessions"]);
    for repo in repos {
        table.add_row(row![
            repo.name,
            repo.path,
            repo.default_branch,
            if repo.docker_compose { "Yes" } else { "No" },
            repo.active_sessions
        ]);
    }
    table
}

pub fn browse_table(result: &BrowseResult) -> Table {
    let mut table = Table::new();
    table.add_row(row!["Directory", "Path", "Git"]);
    for entry in &result.directories {
        table.add_row(row![
            entry.name,
            entry.path,
            if entry.is_git_repo { "Yes" } else { "" }
        ]);
    }
    table
}

pub fn templates_table(templates: &[SessionTemplate]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["ID", "Name", "Project", "Account", "Created"]);
    for template in templates {
        table.add_row(row![
            template.id,
            template.name,
            template.project_name,
            template.account_id.as_deref().unwrap_or("-"),
            template.created_at
        ]);
    }
    table
}

//! Live session stream
//!
//! Selects a session, prints its decoded output as it arrives and sends each
//! stdin line as a chat message. The stored navigation tab is `chat` while
//! attached. Lines starting with `/` are local commands:
//!
//! - `/quit` leaves
//! - `/reconnect` re-opens a dropped stream, keeping the output
//! - `/clear` clears the output buffer

use std::io::Write;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cache::ControlMessage;
use crate::client::CockpitClient;
use crate::connection::ConnectionStatus;
use crate::error::Result;
use crate::notify::TaskCompleteNotifier;
use crate::protocol::Frame;
use crate::render::{self, TerminalRenderer};
use crate::store::{StoreState, Tab};

/// A line typed while attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachInput<'a> {
    Quit,
    Reconnect,
    Clear,
    Message(&'a str),
    Empty,
}

/// Classify one stdin line
pub fn parse_input(line: &str) -> AttachInput<'_> {
    match line.trim() {
        "" => AttachInput::Empty,
        "/quit" | "/exit" => AttachInput::Quit,
        "/reconnect" => AttachInput::Reconnect,
        "/clear" => AttachInput::Clear,
        _ => AttachInput::Message(line),
    }
}

/// Tracks what of the stream state was already shown
///
/// A reconnect of the same session keeps its output and messages, so only a
/// different session, a new origin or an explicit clear starts the view
/// over.
struct StreamView<W: Write> {
    renderer: TerminalRenderer<W>,
    session_id: Option<String>,
    origin: u64,
    clears: u64,
    seen_messages: usize,
    status: ConnectionStatus,
    notifier: TaskCompleteNotifier,
}

impl<W: Write> StreamView<W> {
    fn new(out: W) -> Self {
        Self {
            renderer: TerminalRenderer::new(out),
            session_id: None,
            origin: 0,
            clears: 0,
            seen_messages: 0,
            status: ConnectionStatus::Closed,
            notifier: TaskCompleteNotifier::new(),
        }
    }

    /// Route a task-completion notification through the cache control
    /// channel
    async fn notify(&self, client: &CockpitClient, frame: &Frame) {
        if !client.notifications().has_permission() {
            return;
        }
        let Some(options) = self.notifier.observe(frame) else {
            return;
        };
        let message = ControlMessage::ShowNotification { options };
        if let Err(e) = client.orchestrator().handle_message(message).await {
            tracing::warn!(error = %e, "Task notification failed");
        }
    }

    async fn show(&mut self, client: &CockpitClient, state: &StoreState) -> Result<()> {
        let stream = &state.stream;
        let continues = stream.session_id == self.session_id
            && stream.origin == self.origin
            && stream.clears == self.clears
            && stream.messages.len() >= self.seen_messages;
        if !continues {
            self.session_id = stream.session_id.clone();
            self.origin = stream.origin;
            self.clears = stream.clears;
            self.seen_messages = 0;
            self.renderer.reset();
        }

        self.renderer.update(&stream.output_buffer)?;

        for frame in &stream.messages[self.seen_messages..] {
            self.renderer.frame(frame)?;
            self.notify(client, frame).await;
        }
        self.seen_messages = stream.messages.len();

        if stream.status != self.status {
            self.status = stream.status;
            eprintln!("{} {}", "connection:".dimmed(), render::connection_badge(stream.status));
            if let Some(error) = &stream.last_error {
                eprintln!("{}", error.red());
            }
            if stream.status == ConnectionStatus::Closed && stream.session_id.is_some() {
                eprintln!("{}", "Stream closed. Type /reconnect to re-open it.".dimmed());
            }
        }
        Ok(())
    }
}

/// Attach to `session_id` until `/quit`, end of input or Ctrl-C
pub async fn run_attach(client: &CockpitClient, session_id: &str) -> Result<()> {
    let store_task = client.attach_store();
    let mut states = client.store().subscribe();

    client.notifications().request_permission().await;
    client.select_session(Some(session_id)).await?;
    client.store().set_active_tab(Tab::Chat)?;
    tracing::info!(session_id, "Attached");

    let mut view = StreamView::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                view.show(client, &state).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line) {
                    AttachInput::Quit => break,
                    AttachInput::Empty => {}
                    AttachInput::Reconnect => {
                        if !client.connections().reconnect().await {
                            eprintln!("{}", "Stream is still live".dimmed());
                        }
                    }
                    AttachInput::Clear => client.connections().clear_output().await,
                    AttachInput::Message(text) => {
                        if !client.connections().send(text).await {
                            eprintln!("{}", "Not connected; message dropped".yellow());
                        }
                    }
                }
            }
        }
    }

    client.connections().close().await;
    store_task.abort();
    client.store().set_active_tab(Tab::Sessions)?;
    tracing::info!(session_id, "Detached");
    Ok(())
}

//! Printing the rendered transcript.
//!
//! `text` prints committed text as it becomes safe, so the terminal follows
//! the stream. `html` and `json` print the final rendering once the stream ends.

use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use glint_core::config::RenderConfig;
use glint_core::transcript::{Role, TranscriptSnapshot};
use glint_render::{TranscriptView, to_html};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Committed markdown, printed incrementally
    Text,
    /// One HTML fragment per message
    Html,
    /// The rendered messages as JSON
    Json,
}

pub struct Printer<W: Write> {
    out: W,
    format: OutputFormat,
    view: TranscriptView,
    /// Bytes of each message's text already written (text format).
    printed: Vec<usize>,
    /// Message currently being written (text format).
    current: Option<usize>,
}

impl Printer<io::Stdout> {
    pub fn stdout(format: OutputFormat, config: &RenderConfig) -> Self {
        Self::new(io::stdout(), format, config)
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat, config: &RenderConfig) -> Self {
        Self {
            out,
            format,
            view: TranscriptView::new(config),
            printed: Vec::new(),
            current: None,
        }
    }

    /// Renders every published snapshot until the publisher goes away.
    pub async fn follow(&mut self, mut rx: watch::Receiver<TranscriptSnapshot>) -> Result<()> {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            self.update(&snapshot)?;
            if rx.changed().await.is_err() {
                return Ok(());
            }
        }
    }

    /// Syncs the view and writes whatever became visible.
    pub fn update(&mut self, snapshot: &TranscriptSnapshot) -> Result<()> {
        let changed = self.view.sync(snapshot);
        if self.format == OutputFormat::Text {
            for index in changed {
                self.print_text(index)?;
            }
            self.out.flush()?;
        }
        Ok(())
    }

    /// Writes the final rendering of `snapshot`.
    pub fn finish(&mut self, snapshot: &TranscriptSnapshot) -> Result<()> {
        self.update(snapshot)?;
        match self.format {
            OutputFormat::Text => {
                if self.current.is_some() {
                    writeln!(self.out)?;
                }
            }
            OutputFormat::Html => {
                for message in self.view.messages() {
                    writeln!(
                        self.out,
                        "<div class=\"message {}\">{}</div>",
                        message.role,
                        to_html(&message.nodes)
                    )?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, self.view.messages())?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn print_text(&mut self, index: usize) -> Result<()> {
        let Some(message) = self.view.get(index) else {
            return Ok(());
        };
        // The prompt is already on the user's screen.
        if message.role == Role::User {
            return Ok(());
        }

        if self.printed.len() <= index {
            self.printed.resize(index + 1, 0);
        }
        let Some(fresh) = message
            .text
            .get(self.printed[index]..)
            .filter(|fresh| !fresh.is_empty())
        else {
            return Ok(());
        };

        if self.current != Some(index) {
            if self.current.is_some() {
                write!(self.out, "\n\n")?;
            }
            self.current = Some(index);
        }
        self.out.write_all(fresh.as_bytes())?;
        self.printed[index] = message.text.len();
        Ok(())
    }
}

//! Line-oriented terminal rendering of a chat transcript.

use std::io::{self, IsTerminal, Stderr, Stdout, Write};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossterm::cursor::{MoveTo, MoveToColumn, MoveToPreviousLine};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;

use crate::ui::surface::{ChatSurface, HtmlDocument, Notice};
use crate::utils::html::markup_to_plain;

/// Text other writers put on the terminal a [`TerminalSurface`] draws to.
///
/// Log lines and notices written through a [`ConsoleWriter`] land below the
/// transcript; the surface needs their line count to find its own lines
/// again when it redraws. Nothing is recorded until a surface starts sharing
/// the terminal.
#[derive(Clone, Debug, Default)]
pub struct SharedConsole {
    pending: Arc<Mutex<String>>,
    tracking: Arc<AtomicBool>,
}

impl SharedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `inner` so that everything written to it is recorded.
    pub fn wrap<W: Write>(&self, inner: W) -> ConsoleWriter<W> {
        ConsoleWriter {
            inner,
            console: self.clone(),
        }
    }

    pub fn stderr(&self) -> ConsoleWriter<Stderr> {
        self.wrap(io::stderr())
    }

    fn set_tracking(&self, tracking: bool) {
        self.tracking.store(tracking, Ordering::Relaxed);
    }

    fn record(&self, bytes: &[u8]) {
        if !self.tracking.load(Ordering::Relaxed) {
            return;
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_str(&String::from_utf8_lossy(bytes));
        }
    }

    /// Drains the text recorded since the last call.
    fn take(&self) -> String {
        self.pending
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }
}

impl<'a> MakeWriter<'a> for SharedConsole {
    type Writer = ConsoleWriter<Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        self.stderr()
    }
}

/// A writer whose output is recorded on a [`SharedConsole`].
pub struct ConsoleWriter<W> {
    inner: W,
    console: SharedConsole,
}

impl<W: Write> Write for ConsoleWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.console.record(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Mirrors an [`HtmlDocument`] as plain text on a writer.
///
/// Only the changed tail is written after each update. When an update
/// rewrites text that was already printed (the thinking placeholder, a
/// growing reply) and the writer is a terminal, the cursor is moved back to
/// the first changed line and everything below it is redrawn. Lines other
/// writers printed in between are counted through the [`SharedConsole`] and
/// reprinted above the redrawn tail.
pub struct TerminalSurface<W: Write = Stdout> {
    document: HtmlDocument,
    out: W,
    ansi: bool,
    printed: String,
    console: Option<SharedConsole>,
    notices: Vec<Notice>,
    send_label: String,
}

impl TerminalSurface<Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let ansi = out.is_terminal();
        Self::new(out, ansi)
    }

    /// Like [`TerminalSurface::stdout`], accounting for `console` output
    /// when stdout and stderr are the same terminal.
    pub fn stdout_sharing(console: &SharedConsole) -> Self {
        let surface = Self::stdout();
        if surface.ansi && io::stderr().is_terminal() {
            surface.sharing_terminal_with(console.clone())
        } else {
            surface
        }
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, left), right)| left != right)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()))
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, ansi: bool) -> Self {
        Self {
            document: HtmlDocument::new(),
            out,
            ansi,
            printed: String::new(),
            console: None,
            notices: Vec::new(),
            send_label: "Send".to_string(),
        }
    }

    pub fn sharing_terminal_with(mut self, console: SharedConsole) -> Self {
        console.set_tracking(true);
        console.take();
        self.console = Some(console);
        self
    }

    pub fn document(&self) -> &HtmlDocument {
        &self.document
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn send_label(&self) -> &str {
        &self.send_label
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    fn write_update(&mut self, plain: &str, common: usize, external: &str) -> io::Result<()> {
        if common >= self.printed.len() {
            queue!(self.out, Print(&plain[common..]))?;
            return self.out.flush();
        }
        let line_start = plain[..common].rfind('\n').map_or(0, |idx| idx + 1);
        if !self.ansi {
            // Without cursor control the rewritten tail is printed afresh.
            queue!(self.out, Print("\n"), Print(&plain[line_start..]))?;
            return self.out.flush();
        }
        let lines_up =
            self.printed[line_start..].matches('\n').count() + external.matches('\n').count();
        match u16::try_from(lines_up).unwrap_or(u16::MAX) {
            0 => queue!(self.out, MoveToColumn(0))?,
            n => queue!(self.out, MoveToPreviousLine(n))?,
        }
        queue!(
            self.out,
            Clear(ClearType::FromCursorDown),
            Print(external),
            Print(&plain[line_start..])
        )?;
        self.out.flush()
    }

    fn sync(&mut self) {
        let plain = markup_to_plain(self.document.markup());
        let external = self
            .console
            .as_ref()
            .map(SharedConsole::take)
            .unwrap_or_default();
        let mut common = common_prefix_len(&self.printed, &plain);
        while !plain.is_char_boundary(common) {
            common -= 1;
        }
        if let Err(err) = self.write_update(&plain, common, &external) {
            warn!(error = %err, "failed to write transcript");
        }
        self.printed = plain;
    }
}

impl<W: Write> ChatSurface for TerminalSurface<W> {
    fn end(&self) -> usize {
        self.document.end()
    }

    fn insert(&mut self, range: Range<usize>, markup: &str) -> Range<usize> {
        let range = self.document.insert(range, markup);
        self.sync();
        range
    }

    fn clear(&mut self) {
        self.document.clear();
        self.printed.clear();
        if let Some(console) = &self.console {
            console.take();
        }
        let reset = if self.ansi {
            queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))
        } else {
            queue!(self.out, Print("\n"))
        };
        if let Err(err) = reset.and_then(|_| self.out.flush()) {
            warn!(error = %err, "failed to clear terminal");
        }
    }

    fn set_send_enabled(&mut self, enabled: bool, label: &str) {
        self.document.set_send_enabled(enabled, label);
        self.send_label = label.to_string();
    }

    fn show_notice(&mut self, title: &str, message: &str) {
        let line = format!("[{title}] {message}\n");
        let written = match &self.console {
            Some(console) => console.stderr().write_all(line.as_bytes()),
            None => io::stderr().write_all(line.as_bytes()),
        };
        if let Err(err) = written {
            warn!(error = %err, "failed to show notice");
        }
        self.document.show_notice(title, message);
        self.notices.push(Notice {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

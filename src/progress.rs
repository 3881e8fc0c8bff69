//! Terminal progress for index builds.
//!
//! Log lines written while a bar is active go through [`LogWriterFactory`]
//! so they print above the bar instead of tearing it.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";

static BARS: OnceLock<MultiProgress> = OnceLock::new();

fn bars() -> &'static MultiProgress {
    BARS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// Per-document progress of an index build; inert when disabled or empty
pub struct IndexProgress {
    bar: Option<ProgressBar>,
}

impl IndexProgress {
    pub fn start(documents: usize, enabled: bool) -> Self {
        if !enabled || documents == 0 {
            return Self::disabled();
        }

        let bar = bars().add(ProgressBar::new(documents as u64));
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        bar.set_message("Indexing documents");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    pub fn disabled() -> Self {
        Self { bar: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Advance by one document, showing its name
    pub fn document_done(&self, file_name: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(file_name.to_string());
            bar.inc(1);
        }
    }

    pub fn finish(self) {
        if let Some(bar) = self.bar {
            bar.finish_with_message("Documents indexed");
        }
    }
}

/// `MakeWriter` for tracing that prints whole lines above active bars
#[derive(Default, Clone)]
pub struct LogWriterFactory;

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter::default()
    }
}

/// Buffers partial writes and emits complete lines
#[derive(Default)]
pub struct LineWriter {
    pending: String,
}

impl LineWriter {
    fn emit(line: &str) {
        let _ = bars().println(line.trim_end_matches('\r'));
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        while let Some(end) = self.pending.find('\n') {
            Self::emit(&self.pending[..end]);
            self.pending.drain(..=end);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            Self::emit(&self.pending);
            self.pending.clear();
        }
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

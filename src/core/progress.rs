//! Progress reporting for file indexing using indicatif.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

fn file_progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("valid template")
        .progress_chars("#>-")
}

/// A thread-safe progress tracker for parallel operations.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a visible progress tracker with the given total count.
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(file_progress_style());
        bar.set_message(message.to_string());
        Self { bar }
    }

    /// Create a hidden progress tracker (for non-TTY output).
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);
        Self { bar }
    }

    /// Visible only when requested and stderr is a terminal.
    pub fn for_files(total: usize, message: &str, visible: bool) -> Self {
        if visible && std::io::stderr().is_terminal() {
            Self::new(total, message)
        } else {
            Self::hidden(total)
        }
    }

    /// Increment the progress counter by one.
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Finish and clear the progress bar.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

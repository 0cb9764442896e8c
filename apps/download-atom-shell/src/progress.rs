//! Download progress display.
//!
//! Purely advisory: the bar is only drawn when stderr is an interactive
//! terminal (and never on Windows), and nothing in the pipeline depends on
//! it.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for a single download.
#[derive(Debug)]
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Creates a reporter, visible only when the terminal is interactive.
    #[must_use]
    pub fn new(total: Option<u64>) -> Self {
        if should_draw() {
            Self::visible(total)
        } else {
            Self::hidden()
        }
    }

    /// A reporter that draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    fn visible(total: Option<u64>) -> Self {
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(bar_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(spinner_style());
                bar.enable_steady_tick(Duration::from_millis(120));
                bar
            }
        };
        Self { bar }
    }

    /// Records `bytes` more bytes received.
    pub fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    /// Bytes recorded so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Removes the bar after a completed download.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Leaves the bar where it stopped after a failed download.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

fn should_draw() -> bool {
    !cfg!(windows) && std::io::stderr().is_terminal()
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("downloading [{bar:20}] {percent}% {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("= ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("downloading {spinner} {bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

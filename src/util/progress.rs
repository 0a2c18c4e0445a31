//! Progress display for exports.
//!
//! Drawn on stderr only when it is a terminal, so piped CSV output and
//! scripted runs never see control sequences.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, stderr};
use std::time::Duration;

/// Progress is shown only if stderr is an interactive terminal.
#[must_use]
pub fn should_show_progress() -> bool {
    stderr().is_terminal()
}

/// Spinner for work of unknown length.
#[must_use]
pub fn create_spinner(message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    if show {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Bar bounded by a known issue limit.
#[must_use]
pub fn create_progress_bar(total: u64, message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if show {
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .map(|style| style.progress_chars("=>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message(message.to_string());
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Tracks exported rows and fetched pages.
pub struct ExportProgress {
    bar: ProgressBar,
    pages: usize,
}

impl ExportProgress {
    /// A bar when the row limit is known, otherwise a spinner.
    #[must_use]
    pub fn new(max_issues: Option<usize>, show: bool) -> Self {
        let bar = match max_issues {
            Some(limit) => create_progress_bar(limit as u64, "Exporting issues", show),
            None => create_spinner("Exporting issues", show),
        };
        Self { bar, pages: 0 }
    }

    pub fn page_fetched(&mut self, issues: usize) {
        self.pages += 1;
        self.bar
            .set_message(format!("page {} ({issues} issues)", self.pages));
    }

    pub fn row_written(&self) {
        self.bar.inc(1);
    }

    #[must_use]
    pub fn rows(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}

//! Download progress reporting.
//!
//! Visible bars are registered with one process-wide [`MultiProgress`], so
//! log output can clear them out of the way (see [`suspend`]).

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::OnceLock;

static BARS: OnceLock<MultiProgress> = OnceLock::new();

fn bars() -> &'static MultiProgress {
    BARS.get_or_init(MultiProgress::new)
}

/// Run `f` with every visible bar hidden, redrawing them afterwards.
pub fn suspend<F: FnOnce() -> R, R>(f: F) -> R {
    bars().suspend(f)
}

/// Progress of the network download, as a percentage when the size is known
/// and as a byte counter otherwise.
#[derive(Clone)]
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new(size_hint: Option<u64>, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }

        let bar = match size_hint {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg} [{bar:40.cyan/blue}] {percent:>3}% {bytes}/{total_bytes} ({bytes_per_sec})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{msg} {spinner} {bytes} ({bytes_per_sec})")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message("Downloading");
        Self {
            bar: bars().add(bar),
        }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn advance(&self, bytes: usize) {
        self.bar.inc(bytes as u64);
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Download done");
    }

    pub fn abandon(&self) {
        self.bar.abandon_with_message("Download failed");
    }
}

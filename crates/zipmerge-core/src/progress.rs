//! Stage status lines.
//!
//! On a TTY every pipeline stage (products, locations, census, merge) gets a
//! spinner line that ends with its outcome. Off a TTY nothing is drawn and
//! the outcome is logged instead.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Owner of all stage lines of one command.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Detects whether stderr is a terminal.
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Context that never draws (tests, library callers).
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    pub fn stage_line(&self, name: &str) -> StageLine {
        let bar = if self.is_tty {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}")
                    .expect("invalid template"),
            );
            pb.set_prefix(name.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        StageLine {
            name: name.to_string(),
            bar,
            started: Instant::now(),
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// For the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// One stage's spinner line.
pub struct StageLine {
    name: String,
    bar: ProgressBar,
    started: Instant,
}

impl StageLine {
    pub fn message(&self, msg: impl Into<String>) {
        let msg = msg.into();
        if self.bar.is_hidden() {
            log::debug!("{}: {msg}", self.name);
        }
        self.bar.set_message(msg);
    }

    /// Stop the spinner, leaving the outcome and elapsed time on screen.
    pub fn finish(self, outcome: &str) {
        let line = format!("{outcome} in {:.1}s", self.started.elapsed().as_secs_f64());
        if self.bar.is_hidden() {
            log::info!("{}: {line}", self.name);
        }
        self.bar.finish_with_message(line);
    }

    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }
}

/// Thousands-separated count, e.g. `12,345`.
pub fn fmt_num(n: usize) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.char_indices() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

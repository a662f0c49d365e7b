//! CLI progress bar over the discovered task list.
//!
//! Two-phase scheduling pays off here: by the time transfers start the exact
//! file count is known, so the bar has a real length instead of a spinner.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

pub struct MirrorProgress {
    bar: Option<ProgressBar>,
}

impl MirrorProgress {
    pub fn new(total: usize, enabled: bool) -> Self {
        if !enabled || total == 0 {
            return Self { bar: None };
        }

        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(style);
        bar.set_prefix("mirroring");
        Self { bar: Some(bar) }
    }

    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for MirrorProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

//! Progress reporting for gate computation

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use moegate_application::GateProgressNotifier;
use moegate_domain::Expert;
use std::sync::Mutex;

/// Reports per-expert progress with a progress bar on stderr
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl GateProgressNotifier for ProgressReporter {
    fn on_experts_start(&self, total: usize) {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(Self::bar_style());
        pb.set_prefix("expert prompts");
        pb.set_message("Starting...");

        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_expert_complete(&self, _index: usize, expert: &Expert) {
        if let Ok(bar) = self.bar.lock() {
            if let Some(pb) = bar.as_ref() {
                pb.set_message(format!("{} {}", "v".green(), expert.name()));
                pb.inc(1);
            }
        }
    }

    fn on_experts_complete(&self) {
        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_with_message(format!("{}", "done".green()));
            }
        }
    }
}

//! Progress reporting

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;

/// Progress reporter for the initial copier
pub struct ProgressReporter {
    scan_bar: ProgressBar,
    apply_bar: ProgressBar,
    apply_started_at: Option<Instant>,
    copied_bytes: u64,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let scan_bar = ProgressBar::new_spinner();
        scan_bar.enable_steady_tick(std::time::Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            scan_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }

        let apply_bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} actions | {msg}")
        {
            apply_bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            scan_bar,
            apply_bar,
            apply_started_at: None,
            copied_bytes: 0,
        }
    }

    /// Progress bars that draw nothing, for non-interactive runs
    pub fn hidden() -> Self {
        let reporter = Self::new();
        reporter.scan_bar.disable_steady_tick();
        reporter
            .scan_bar
            .set_draw_target(indicatif::ProgressDrawTarget::hidden());
        reporter
            .apply_bar
            .set_draw_target(indicatif::ProgressDrawTarget::hidden());
        reporter
    }

    /// Mark start of scanning a root.
    pub fn start_scan(&self, root: &Path) {
        self.scan_bar
            .set_message(format!("Scanning {}...", root.display()));
    }

    /// Update scanning counters.
    pub fn update_scan(&self, root: &Path, setups: u64, bytes: u64) {
        self.scan_bar.set_message(format!(
            "Scanning {}... {} setups | {}",
            root.display(),
            setups,
            HumanBytes(bytes)
        ));
    }

    /// Mark completion of scanning.
    pub fn finish_scan(&self, roots: usize, tracks: usize, setups: usize, bytes: u64) {
        self.scan_bar.finish_with_message(format!(
            "Scanned {} root(s): {} tracks, {} setups | {}",
            roots,
            tracks,
            setups,
            HumanBytes(bytes)
        ));
    }

    pub fn start_apply(&mut self, total_actions: u64) {
        self.apply_started_at = Some(Instant::now());
        self.copied_bytes = 0;
        self.apply_bar.set_length(total_actions);
        self.apply_bar.set_position(0);
        self.apply_bar.set_message("Starting...".to_string());
    }

    /// Update current action indicator.
    pub fn set_current_action(&self, action: &str, path: Option<&Path>) {
        let path_display = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string());
        self.apply_bar
            .set_message(format!("{} {}", action, path_display));
    }

    /// Mark one action complete.
    pub fn complete_action(&mut self, bytes: u64) {
        self.copied_bytes = self.copied_bytes.saturating_add(bytes);
        self.apply_bar.inc(1);

        let throughput = self.current_throughput_bps();
        self.apply_bar.set_message(format!(
            "{} copied | {}/s",
            HumanBytes(self.copied_bytes),
            HumanBytes(throughput)
        ));
    }

    /// Surface an action error above the bar.
    pub fn action_error(&self, action: &str, path: Option<&Path>, err: &str) {
        let path_display = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string());
        self.apply_bar
            .println(format!("ERROR {} {}: {}", action, path_display, err));
    }

    pub fn finish_apply(
        &self,
        succeeded: usize,
        failed: usize,
        bytes: u64,
        renames: usize,
        copies: usize,
    ) {
        self.apply_bar.finish_with_message(format!(
            "Actions complete: {} succeeded, {} failed | {} renames, {} copies | {} total",
            succeeded,
            failed,
            renames,
            copies,
            HumanBytes(bytes)
        ));
    }

    fn current_throughput_bps(&self) -> u64 {
        match self.apply_started_at {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.copied_bytes as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

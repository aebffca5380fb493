use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use geocode_index::{BuildPhase, IndexProgress};

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Feed builder progress into a spinner
pub fn apply_progress(pb: &ProgressBar, progress: &IndexProgress) {
    match progress.phase {
        BuildPhase::Reading => {
            let source = progress.source.as_deref().unwrap_or("?");
            if progress.processed > 0 {
                pb.set_message(format!("{} ({} records)", source, progress.processed));
            } else {
                pb.set_message(format!("Reading {}", source));
            }
        }
        BuildPhase::Loading | BuildPhase::Publishing => {
            pb.set_message(progress.message.clone());
        }
    }
}

pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}

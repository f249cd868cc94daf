use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.elapsed()
        );
    }
}

/// Format a count with thousands separators.
pub fn fmt_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Make a page title usable as a directory / file name.
pub fn sanitise_group_name(title: &str, fallback: &str) -> String {
    let name = title.trim().replace(['/', '\\'], "_");
    if name.is_empty() {
        fallback.replace(['/', '\\'], "_")
    } else {
        name
    }
}

/// Create `<group_dir>/<date>-<n>/` for the smallest `n >= 1` not taken yet.
pub fn allocate_run_folder(group_dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    let stamp = date.format("%Y-%m-%d");
    let mut n = 1u32;
    loop {
        let candidate = group_dir.join(format!("{}-{}", stamp, n));
        if !candidate.exists() {
            std::fs::create_dir_all(&candidate)
                .with_context(|| format!("Could not create run folder {:?}", candidate))?;
            debug!("Directory {:?} created", candidate);
            return Ok(candidate);
        }
        n += 1;
    }
}

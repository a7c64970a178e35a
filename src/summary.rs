// Run summary
//
// Counters collected over one packaging run, logged and printed when it ends.

use crate::services::assembler::PackageReport;
use crate::services::sweep::SweepReport;
use camino::Utf8PathBuf;
use std::fmt;
use std::time::{Duration, Instant};

/// Counts and outputs of one packaging run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Scripts translated into profiles
    pub scripts_converted: usize,

    /// Scripts skipped by name
    pub scripts_skipped: usize,

    /// Scripts that could not be translated
    pub scripts_failed: usize,

    /// Files copied verbatim into the package
    pub files_copied: usize,

    /// Backup files copied under their base name
    pub backups_applied: usize,

    /// Files and directories left out of the package
    pub entries_skipped: usize,

    /// Profiles copied into the package root
    pub profiles_merged: usize,

    /// Final archive location
    pub archive: Option<Utf8PathBuf>,

    start_time: Instant,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            scripts_converted: 0,
            scripts_skipped: 0,
            scripts_failed: 0,
            files_copied: 0,
            backups_applied: 0,
            entries_skipped: 0,
            profiles_merged: 0,
            archive: None,
            start_time: Instant::now(),
        }
    }

    pub fn record_sweep(&mut self, report: &SweepReport) {
        self.scripts_converted = report.converted_count();
        self.scripts_skipped = report.skipped_count();
        self.scripts_failed = report.failed_count();
    }

    pub fn record_package(&mut self, report: &PackageReport) {
        self.files_copied = report.copied;
        self.backups_applied = report.backups_applied;
        self.entries_skipped = report.skipped();
    }

    pub fn record_merged(&mut self, count: usize) {
        self.profiles_merged = count;
    }

    pub fn set_archive(&mut self, archive: Utf8PathBuf) {
        self.archive = Some(archive);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log the summary at info level
    pub fn log_summary(&self) {
        tracing::info!("=== Run Summary ===");
        tracing::info!(
            "Scripts: {} converted, {} skipped, {} failed",
            self.scripts_converted,
            self.scripts_skipped,
            self.scripts_failed
        );
        tracing::info!(
            "Package: {} files copied, {} from backups, {} skipped, {} profiles merged",
            self.files_copied,
            self.backups_applied,
            self.entries_skipped,
            self.profiles_merged
        );
        if let Some(archive) = &self.archive {
            tracing::info!("Archive: {}", archive);
        }
        tracing::info!("Elapsed: {:.2}s", self.elapsed().as_secs_f64());
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scripts: {} converted, {} skipped, {} failed",
            self.scripts_converted, self.scripts_skipped, self.scripts_failed
        )?;
        writeln!(
            f,
            "Package: {} files, {} from backups, {} profiles",
            self.files_copied, self.backups_applied, self.profiles_merged
        )?;
        match &self.archive {
            Some(archive) => write!(f, "Done. Zip path: {}", archive),
            None => write!(f, "No archive produced"),
        }
    }
}

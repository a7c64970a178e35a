//! End-to-end run: sweep scripts, assemble the package, merge profiles, archive.

use crate::services::archiver::{ArchiveError, create_archive};
use crate::services::assembler::{PackageError, assemble_package};
use crate::services::extensions::ExcludedExtensionSet;
use crate::services::merger::{MergeError, merge_profiles};
use crate::services::sweep::convert_all;
use crate::services::translator::ScriptTranslator;
use crate::summary::RunSummary;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Exit code when the source root does not exist
pub const EXIT_MISSING_SOURCE: u8 = 1;

/// Exit code when the package, merge or archive step fails
pub const EXIT_PACKAGE_FAILED: u8 = 3;

/// Fatal errors of a packaging run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source root does not exist: {0}")]
    MissingSourceRoot(Utf8PathBuf),

    #[error("Package assembly failed: {0}")]
    Package(#[from] PackageError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Archive creation failed: {0}")]
    Archive(#[from] ArchiveError),
}

impl PipelineError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::MissingSourceRoot(_) => EXIT_MISSING_SOURCE,
            PipelineError::Package(_) | PipelineError::Merge(_) | PipelineError::Archive(_) => {
                EXIT_PACKAGE_FAILED
            }
        }
    }
}

/// Inputs of one packaging run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub source_root: Utf8PathBuf,
    pub profile_dir: Utf8PathBuf,
    pub package_dir: Utf8PathBuf,
    pub zip_output: Utf8PathBuf,
    /// Lowercase script file names the sweep skips
    pub excluded_scripts: Vec<String>,
    pub excluded_extensions: ExcludedExtensionSet,
}

/// Run every step in order.
///
/// Script failures are recorded in the summary; everything after the sweep is fatal.
pub fn run(
    options: &PipelineOptions,
    translator: &ScriptTranslator,
) -> Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::new();

    if !options.source_root.exists() {
        return Err(PipelineError::MissingSourceRoot(options.source_root.clone()));
    }

    tracing::info!("Excluded extensions: {}", options.excluded_extensions);
    tracing::info!(
        "Using target version for JSON: {}",
        translator.options().target_version
    );

    let report = convert_all(
        translator,
        &options.source_root,
        &options.profile_dir,
        &options.excluded_scripts,
    );
    tracing::info!(
        "Converted {} .bat files to JSON in {}",
        report.converted_count(),
        options.profile_dir
    );
    summary.record_sweep(&report);

    let package = assemble_package(
        &options.source_root,
        &options.package_dir,
        &options.excluded_extensions,
    )?;
    summary.record_package(&package);

    let merged = merge_profiles(&options.profile_dir, &options.package_dir)?;
    summary.record_merged(merged.len());

    let archive = create_archive(&options.package_dir, &options.zip_output)?;
    summary.set_archive(archive);

    Ok(summary)
}

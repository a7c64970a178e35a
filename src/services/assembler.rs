use crate::services::extensions::ExcludedExtensionSet;
use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use walkdir::WalkDir;

/// Directories never copied or visited (service state and CI configuration).
pub const EXCLUDED_DIR_NAMES: [&str; 2] = [".service", ".github"];

/// Files never copied, matched case-insensitively.
pub const EXCLUDED_FILE_NAMES: [&str; 2] = [".gitignore", "LICENSE.txt"];

/// Suffix of a file that replaces (or supplies) its base file in the package.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Errors that abort package assembly
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(Utf8PathBuf),

    #[error("Package directory {dest} is or contains the source directory {source_dir}")]
    DestinationContainsSource {
        source_dir: Utf8PathBuf,
        dest: Utf8PathBuf,
    },

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

fn io_error(action: &'static str, path: &Utf8Path) -> impl FnOnce(io::Error) -> PackageError {
    let path = path.to_path_buf();
    move |source| PackageError::Io {
        action,
        path,
        source,
    }
}

/// What the assembler does with one entry of the source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    CopyAsIs,
    CopyBackupAsBase,
    SkipExcludedExtension,
    SkipExcludedName,
    SkipExcludedDirectory,
}

/// Decision for one file of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// File name in the source directory
    pub source: String,
    /// File name in the destination directory, if copied
    pub target: Option<String>,
    pub decision: CopyDecision,
}

impl PlannedFile {
    fn copy(source: &str, target: &str, decision: CopyDecision) -> Self {
        Self {
            source: source.to_string(),
            target: Some(target.to_string()),
            decision,
        }
    }

    fn skip(source: &str, decision: CopyDecision) -> Self {
        Self {
            source: source.to_string(),
            target: None,
            decision,
        }
    }
}

/// Tally of copy decisions for one assembly run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    pub copied: usize,
    pub backups_applied: usize,
    pub skipped_extension: usize,
    pub skipped_name: usize,
    pub skipped_directories: usize,
}

impl PackageReport {
    fn record(&mut self, decision: CopyDecision) {
        match decision {
            CopyDecision::CopyAsIs => self.copied += 1,
            CopyDecision::CopyBackupAsBase => self.backups_applied += 1,
            CopyDecision::SkipExcludedExtension => self.skipped_extension += 1,
            CopyDecision::SkipExcludedName => self.skipped_name += 1,
            CopyDecision::SkipExcludedDirectory => self.skipped_directories += 1,
        }
    }

    /// Files written to the package, backups included.
    pub fn files_written(&self) -> usize {
        self.copied + self.backups_applied
    }

    /// Files and directories left out of the package.
    pub fn skipped(&self) -> usize {
        self.skipped_extension + self.skipped_name + self.skipped_directories
    }
}

pub fn is_excluded_dir_name(name: &str) -> bool {
    EXCLUDED_DIR_NAMES
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
}

pub fn is_excluded_file_name(name: &str) -> bool {
    EXCLUDED_FILE_NAMES
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
}

/// Decide what happens to every file of one directory listing.
///
/// Backups are resolved first: `<base>.backup` is copied as `<base>` unless the
/// base extension is excluded, in which case both files are dropped. Either way
/// both names are handled, whether or not `<base>` exists. The remaining files are
/// filtered by name and extension. Output is sorted by source name.
pub fn plan_directory(file_names: &[String], excluded: &ExcludedExtensionSet) -> Vec<PlannedFile> {
    let names: BTreeSet<&str> = file_names.iter().map(String::as_str).collect();
    let mut handled: BTreeSet<&str> = BTreeSet::new();
    let mut plan = Vec::new();

    for &name in &names {
        let Some(base) = name.strip_suffix(BACKUP_SUFFIX) else {
            continue;
        };
        if base.is_empty() {
            continue;
        }

        if excluded.excludes_file(base) {
            plan.push(PlannedFile::skip(name, CopyDecision::SkipExcludedExtension));
            if names.contains(base) && !base.ends_with(BACKUP_SUFFIX) {
                plan.push(PlannedFile::skip(base, CopyDecision::SkipExcludedExtension));
            }
        } else {
            plan.push(PlannedFile::copy(name, base, CopyDecision::CopyBackupAsBase));
        }

        handled.insert(name);
        handled.insert(base);
    }

    for &name in &names {
        if handled.contains(name) {
            continue;
        }

        let planned = if is_excluded_file_name(name) {
            PlannedFile::skip(name, CopyDecision::SkipExcludedName)
        } else if excluded.excludes_file(name) {
            PlannedFile::skip(name, CopyDecision::SkipExcludedExtension)
        } else {
            PlannedFile::copy(name, name, CopyDecision::CopyAsIs)
        };
        plan.push(planned);
    }

    plan.sort_by(|a, b| a.source.cmp(&b.source));
    plan
}

/// Copy `src` to `dst` keeping access and modification times.
pub fn copy_preserving_times(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let metadata = fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
}

/// Rebuild `dest` from `source`.
///
/// Any existing `dest` is deleted first, so the result depends only on the source
/// tree and `excluded`. Any filesystem error aborts the assembly; a partial
/// package is never reported as success.
pub fn assemble_package(
    source: &Utf8Path,
    dest: &Utf8Path,
    excluded: &ExcludedExtensionSet,
) -> Result<PackageReport, PackageError> {
    if !source.is_dir() {
        return Err(PackageError::SourceNotFound(source.to_path_buf()));
    }

    ensure_source_outside(source, dest)?;
    reset_destination(dest)?;

    // A destination nested in the source must not be copied into itself
    let nested_dest = nested_destination(source, dest);

    let mut report = PackageReport::default();
    let mut pruned: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let excluded_name = entry.file_name().to_str().is_some_and(is_excluded_dir_name);
            let is_dest = nested_dest.as_deref() == Some(entry.path());
            if excluded_name || is_dest {
                pruned.push(entry.path().to_path_buf());
                return false;
            }
            true
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(PackageError::NonUtf8Path)?;
        let rel = dir.strip_prefix(source).unwrap_or(Utf8Path::new(""));
        let target_dir = dest.join(rel);
        fs::create_dir_all(&target_dir).map_err(io_error("create directory", &target_dir))?;

        let files = list_files(&dir)?;
        for planned in plan_directory(&files, excluded) {
            let src_file = dir.join(&planned.source);
            report.record(planned.decision);

            match (&planned.target, planned.decision) {
                (Some(target), decision) => {
                    let dst_file = target_dir.join(target);
                    copy_preserving_times(&src_file, &dst_file)
                        .map_err(io_error("copy file", &src_file))?;
                    match decision {
                        CopyDecision::CopyBackupAsBase => tracing::info!(
                            "Copied (backup replaces original): {} -> {}",
                            src_file,
                            dst_file
                        ),
                        _ => tracing::debug!("Copied: {} -> {}", src_file, dst_file),
                    }
                }
                (None, CopyDecision::SkipExcludedName) => {
                    tracing::info!("Skipping excluded file: {}", src_file)
                }
                (None, _) => {
                    tracing::info!("Skipping file with excluded extension: {}", src_file)
                }
            }
        }
    }

    for dir in &pruned {
        tracing::info!("Skipping excluded directory: {}", dir.display());
        report.record(CopyDecision::SkipExcludedDirectory);
    }

    remove_excluded_dirs(dest)?;

    tracing::info!(
        "Package assembled at {}: {} copied, {} from backups, {} skipped",
        dest,
        report.copied,
        report.backups_applied,
        report.skipped()
    );

    Ok(report)
}

/// Refuse a destination that equals the source or one of its ancestors;
/// resetting it would delete the source tree.
fn ensure_source_outside(source: &Utf8Path, dest: &Utf8Path) -> Result<(), PackageError> {
    if !dest.exists() {
        return Ok(());
    }

    let source_abs = source
        .canonicalize()
        .map_err(io_error("resolve path", source))?;
    let dest_abs = dest.canonicalize().map_err(io_error("resolve path", dest))?;

    if source_abs.starts_with(&dest_abs) {
        return Err(PackageError::DestinationContainsSource {
            source_dir: source.to_path_buf(),
            dest: dest.to_path_buf(),
        });
    }
    Ok(())
}

fn reset_destination(dest: &Utf8Path) -> Result<(), PackageError> {
    if dest.is_dir() {
        fs::remove_dir_all(dest).map_err(io_error("remove directory", dest))?;
    } else if dest.exists() {
        fs::remove_file(dest).map_err(io_error("remove file", dest))?;
    }
    fs::create_dir_all(dest).map_err(io_error("create directory", dest))
}

fn nested_destination(source: &Utf8Path, dest: &Utf8Path) -> Option<PathBuf> {
    let source_abs = source.canonicalize().ok()?;
    let dest_abs = dest.canonicalize().ok()?;
    let rel = dest_abs.strip_prefix(&source_abs).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(source.as_std_path().join(rel))
}

/// Names of the regular files (symlinks followed) directly inside `dir`.
fn list_files(dir: &Utf8Path) -> Result<Vec<String>, PackageError> {
    let mut files = Vec::new();
    for entry in dir.read_dir_utf8().map_err(io_error("list directory", dir))? {
        let entry = entry.map_err(io_error("list directory", dir))?;
        if entry.path().is_file() {
            files.push(entry.file_name().to_string());
        }
    }
    Ok(files)
}

/// Last pass over the package root in case an excluded directory slipped in.
fn remove_excluded_dirs(dest: &Utf8Path) -> Result<(), PackageError> {
    for entry in dest.read_dir_utf8().map_err(io_error("list directory", dest))? {
        let entry = entry.map_err(io_error("list directory", dest))?;
        if !is_excluded_dir_name(entry.file_name()) {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(io_error("remove directory", path))?;
        } else {
            fs::remove_file(path).map_err(io_error("remove file", path))?;
        }
        tracing::warn!("Removed excluded entry from package: {}", path);
    }
    Ok(())
}

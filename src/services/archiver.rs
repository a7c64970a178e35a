//! Zip archive of an assembled package.
//!
//! The archive root is the package directory itself: unpacking it yields the
//! package's children directly, with no wrapper folder.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Datelike, Local, Timelike};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors that can occur while producing the archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Package directory not found: {0}")]
    PackageNotFound(Utf8PathBuf),

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to walk package directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Could not move archive from {produced} to {requested}: {source}")]
    Relocation {
        produced: Utf8PathBuf,
        requested: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(action: &'static str, path: &Utf8Path) -> impl FnOnce(io::Error) -> ArchiveError {
    let path = path.to_path_buf();
    move |source| ArchiveError::Io {
        action,
        path,
        source,
    }
}

/// Path the zip is first written to: the requested path with a `.zip` extension.
pub fn produced_archive_path(requested: &Utf8Path) -> Utf8PathBuf {
    requested.with_extension("zip")
}

/// Zip the contents of `package_dir` into `zip_output`.
///
/// The archive is written next to `zip_output` with a `.zip` extension and moved to
/// `zip_output` when that name differs. Returns the final archive path.
pub fn create_archive(
    package_dir: &Utf8Path,
    zip_output: &Utf8Path,
) -> Result<Utf8PathBuf, ArchiveError> {
    if !package_dir.is_dir() {
        return Err(ArchiveError::PackageNotFound(package_dir.to_path_buf()));
    }

    let produced = produced_archive_path(zip_output);
    if let Some(parent) = produced.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error("create directory", parent))?;
    }

    write_zip(package_dir, &produced)?;

    if produced != zip_output {
        fs::rename(&produced, zip_output).map_err(|source| ArchiveError::Relocation {
            produced: produced.clone(),
            requested: zip_output.to_path_buf(),
            source,
        })?;
        tracing::debug!("Moved archive {} -> {}", produced, zip_output);
    }

    tracing::info!("Created zip: {}", zip_output);
    Ok(zip_output.to_path_buf())
}

fn write_zip(package_dir: &Utf8Path, archive: &Utf8Path) -> Result<(), ArchiveError> {
    let file = File::create(archive).map_err(io_error("create archive", archive))?;
    // An archive written inside the package must not swallow itself
    let archive_abs = archive.canonicalize().ok();

    let mut writer = ZipWriter::new(BufWriter::new(file));
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let dir_options = SimpleFileOptions::default();

    let mut entries = 0usize;
    for entry in WalkDir::new(package_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_file()
            && archive_abs.is_some()
            && path.canonicalize().ok() == archive_abs
        {
            continue;
        }

        let rel = path.strip_prefix(package_dir.as_std_path()).unwrap_or(path);
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let modified = entry
            .metadata()
            .ok()
            .and_then(|metadata| metadata.modified().ok())
            .map(zip_timestamp)
            .unwrap_or_default();

        if entry.file_type().is_dir() {
            writer.add_directory(name, dir_options.last_modified_time(modified))?;
        } else if path.is_file() {
            writer.start_file(name, file_options.last_modified_time(modified))?;
            let mut src = File::open(path).map_err(|source| ArchiveError::Io {
                action: "read",
                path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
                source,
            })?;
            io::copy(&mut src, &mut writer).map_err(io_error("write archive", archive))?;
        }
        entries += 1;
    }

    writer
        .finish()?
        .flush()
        .map_err(io_error("write archive", archive))?;
    tracing::debug!("Wrote {} entries to {}", entries, archive);
    Ok(())
}

/// Local wall-clock time of `modified` in the zip's DOS format.
///
/// Times outside the representable 1980-2107 range become the format's epoch.
fn zip_timestamp(modified: SystemTime) -> zip::DateTime {
    let local: chrono::DateTime<Local> = modified.into();
    let Ok(year) = u16::try_from(local.year()) else {
        return zip::DateTime::default();
    };

    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}

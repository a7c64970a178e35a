//! Flat copy of the generated profiles into the package root.

use crate::services::assembler::copy_preserving_times;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Extension of the generated profile files.
pub const PROFILE_EXTENSION: &str = "json";

#[derive(Error, Debug)]
#[error("Failed to merge {path} into the package: {source}")]
pub struct MergeError {
    pub path: Utf8PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Copy every `*.json` file directly inside `profile_dir` into `package_dir`.
///
/// Subdirectories are not descended. A missing `profile_dir` merges nothing.
/// Returns the paths written inside the package.
pub fn merge_profiles(
    profile_dir: &Utf8Path,
    package_dir: &Utf8Path,
) -> Result<Vec<Utf8PathBuf>, MergeError> {
    if !profile_dir.is_dir() {
        tracing::debug!("No profile directory at {}, nothing to merge", profile_dir);
        return Ok(Vec::new());
    }

    let to_merge_error = |path: &Utf8Path| {
        let path = path.to_path_buf();
        move |source| MergeError { path, source }
    };

    let mut profiles = Vec::new();
    for entry in profile_dir
        .read_dir_utf8()
        .map_err(to_merge_error(profile_dir))?
    {
        let entry = entry.map_err(to_merge_error(profile_dir))?;
        let path = entry.path();
        let is_profile = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PROFILE_EXTENSION));
        if is_profile && path.is_file() {
            profiles.push(path.to_path_buf());
        }
    }
    profiles.sort();

    let mut merged = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let Some(name) = profile.file_name() else {
            continue;
        };
        let dst = package_dir.join(name);
        copy_preserving_times(&profile, &dst).map_err(to_merge_error(profile.as_path()))?;
        tracing::info!("Included JSON: {} -> {}", profile, dst);
        merged.push(dst);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_profile_dir_merges_nothing() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let merged = merge_profiles(&root.join("absent"), &root).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_only_top_level_json_copied() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let profiles = root.join("profiles");
        let package = root.join("package");
        fs::create_dir_all(profiles.join("nested")).unwrap();
        fs::create_dir_all(&package).unwrap();

        fs::write(profiles.join("general.json"), "{}").unwrap();
        fs::write(profiles.join("UPPER.JSON"), "{}").unwrap();
        fs::write(profiles.join("notes.txt"), "x").unwrap();
        fs::write(profiles.join("nested/deep.json"), "{}").unwrap();

        let merged = merge_profiles(&profiles, &package).unwrap();

        assert_eq!(
            merged,
            vec![package.join("UPPER.JSON"), package.join("general.json")]
        );
        assert!(!package.join("notes.txt").exists());
        assert!(!package.join("deep.json").exists());
    }
}

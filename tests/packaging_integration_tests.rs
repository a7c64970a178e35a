//! Integration tests for package assembly, profile merging and archiving
//!
//! These tests verify:
//! - Backup override with and without the base file
//! - Exclusion rules for directories, file names and extensions
//! - Repeatable assembly (the destination is rebuilt from scratch)
//! - Archive layout (package contents at the archive root)
//! - A full run through the pipeline

use batpack::ScriptTranslator;
use batpack::services::extensions::ExcludedExtensionSet;
use batpack::services::pipeline::{self, PipelineError, PipelineOptions};
use batpack::services::{PackageError, assemble_package, create_archive, merge_profiles};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use tempfile::TempDir;

fn create_test_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, path)
}

fn write(path: &Utf8Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Relative paths of every file under `root`, with `/` separators.
fn tree(root: &Utf8Path) -> BTreeSet<String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root.as_std_path()).unwrap();
            rel.to_string_lossy().replace('\\', "/")
        })
        .collect()
}

/// Every file under `root` with its contents, keyed by relative path.
fn tree_contents(root: &Utf8Path) -> BTreeMap<String, Vec<u8>> {
    tree(root)
        .into_iter()
        .map(|rel| {
            let bytes = fs::read(root.join(&rel)).unwrap();
            (rel, bytes)
        })
        .collect()
}

fn zip_names(archive: &Utf8Path) -> BTreeSet<String> {
    let archive = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

/// Source tree resembling a real release folder.
fn create_source_tree(root: &Utf8Path) {
    write(&root.join("general.bat"), "start \"t\" \"%~dp0bin\\winws.exe\" --wf-tcp=80 ^\n--new\n");
    write(&root.join("service.bat"), "@echo off\n");
    write(&root.join("bin/winws.exe"), "binary");
    write(&root.join("bin/WinDivert.dll"), "library");
    write(&root.join("lists/list-general.txt"), "discord.com\n");
    write(&root.join("lists/ipset-all.txt"), "original");
    write(&root.join("lists/ipset-all.txt.backup"), "from backup");
    write(&root.join("lists/list-exclude.txt.backup"), "backup only");
    write(&root.join("lists/tool.exe.backup"), "excluded backup");
    write(&root.join("readme.md"), "# readme\n");
    write(&root.join("License.TXT"), "license");
    write(&root.join(".gitignore"), "*.log\n");
    write(&root.join(".service/version.txt"), "1.0");
    write(&root.join(".github/workflows/ci.yml"), "on: push\n");
    write(&root.join("utils/.github/keep.txt"), "nested excluded dir");
}

#[test]
fn test_assemble_applies_every_rule() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    let dest = dir.join("pkg");
    create_source_tree(&source);

    let report = assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();

    let expected: BTreeSet<String> = [
        "lists/ipset-all.txt",
        "lists/list-exclude.txt",
        "lists/list-general.txt",
        "readme.md",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(tree(&dest), expected);

    assert_eq!(fs::read_to_string(dest.join("lists/ipset-all.txt")).unwrap(), "from backup");
    assert_eq!(fs::read_to_string(dest.join("lists/list-exclude.txt")).unwrap(), "backup only");
    assert!(!dest.join("lists/tool.exe").exists());
    assert!(!dest.join(".service").exists());
    assert!(!dest.join(".github").exists());
    assert!(!dest.join("utils/.github").exists());

    assert_eq!(report.backups_applied, 2);
    assert_eq!(report.files_written(), 4);
}

#[test]
fn test_assemble_is_repeatable() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    let dest = dir.join("pkg");
    create_source_tree(&source);

    // Leftovers from an earlier run must disappear
    write(&dest.join("stale.txt"), "old");

    assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();
    let first = tree_contents(&dest);

    // Files in the package are overwritten wholesale on the next run
    fs::write(dest.join("readme.md"), "edited in place").unwrap();
    assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();
    let second = tree_contents(&dest);

    assert_eq!(first, second);
    assert!(!first.contains_key("stale.txt"));
    assert_eq!(second["readme.md"], b"# readme\n".to_vec());
    assert_eq!(second["lists/ipset-all.txt"], b"from backup".to_vec());
}

#[test]
fn test_backup_of_excluded_script_dropped() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    let dest = dir.join("pkg");
    write(&source.join("foo.bat"), "@echo off\n");
    write(&source.join("foo.bat.backup"), "@echo on\n");
    write(&source.join("keep.txt"), "keep");

    assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();

    let expected: BTreeSet<String> = ["keep.txt".to_string()].into_iter().collect();
    assert_eq!(tree(&dest), expected);
}

#[test]
fn test_custom_extension_list_replaces_default() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    let dest = dir.join("pkg");
    write(&source.join("app.exe"), "binary");
    write(&source.join("debug.LOG"), "log");

    let excluded = ExcludedExtensionSet::from_csv(Some("log"));
    assemble_package(&source, &dest, &excluded).unwrap();

    assert!(dest.join("app.exe").is_file());
    assert!(!dest.join("debug.LOG").exists());
}

#[test]
fn test_modification_time_preserved() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    let dest = dir.join("pkg");
    write(&source.join("data.txt"), "data");

    let mtime = filetime::FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(&source.join("data.txt"), mtime).unwrap();

    assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();

    let metadata = fs::metadata(dest.join("data.txt")).unwrap();
    assert_eq!(filetime::FileTime::from_last_modification_time(&metadata), mtime);
}

#[test]
fn test_package_inside_source_not_copied_into_itself() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    let dest = source.join("dist");
    write(&source.join("readme.md"), "readme");

    assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();
    assemble_package(&source, &dest, &ExcludedExtensionSet::default()).unwrap();

    let expected: BTreeSet<String> = ["readme.md".to_string()].into_iter().collect();
    assert_eq!(tree(&dest), expected);
}

#[test]
fn test_package_equal_to_source_is_refused() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("release");
    write(&source.join("readme.md"), "readme");
    write(&source.join("lists/list-general.txt"), "discord.com");

    let err = assemble_package(&source, &source, &ExcludedExtensionSet::default()).unwrap_err();

    assert!(matches!(err, PackageError::DestinationContainsSource { .. }));
    assert_eq!(fs::read_to_string(source.join("readme.md")).unwrap(), "readme");
    assert!(source.join("lists/list-general.txt").is_file());
}

#[test]
fn test_package_above_source_is_refused() {
    let (_temp_dir, dir) = create_test_dir();
    let package = dir.join("release");
    let source = package.join("src");
    write(&source.join("readme.md"), "readme");

    let err = assemble_package(&source, &package, &ExcludedExtensionSet::default()).unwrap_err();

    assert!(matches!(err, PackageError::DestinationContainsSource { .. }));
    assert!(source.join("readme.md").is_file());
}

#[test]
fn test_pipeline_refuses_package_containing_source() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("release/src");
    write(&source.join("readme.md"), "readme");

    let options = PipelineOptions {
        source_root: source.clone(),
        profile_dir: dir.join("json"),
        package_dir: dir.join("release"),
        zip_output: dir.join("release.zip"),
        excluded_scripts: Vec::new(),
        excluded_extensions: ExcludedExtensionSet::default(),
    };

    let err = pipeline::run(&options, &ScriptTranslator::default()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(source.join("readme.md").is_file());
    assert!(!dir.join("release.zip").exists());
}

#[test]
fn test_merge_copies_top_level_profiles_only() {
    let (_temp_dir, dir) = create_test_dir();
    let profiles = dir.join("json");
    let package = dir.join("pkg");
    fs::create_dir_all(&package).unwrap();
    write(&profiles.join("general.json"), "{}");
    write(&profiles.join("ALT.JSON"), "{}");
    write(&profiles.join("notes.txt"), "");
    write(&profiles.join("old/legacy.json"), "{}");

    let merged = merge_profiles(&profiles, &package).unwrap();

    assert_eq!(merged, vec![package.join("ALT.JSON"), package.join("general.json")]);
    assert!(!package.join("legacy.json").exists());
    assert!(!package.join("notes.txt").exists());
}

#[test]
fn test_archive_has_no_wrapper_folder() {
    let (_temp_dir, dir) = create_test_dir();
    let package = dir.join("pkg");
    write(&package.join("general.json"), "{}");
    write(&package.join("lists/list-general.txt"), "discord.com");
    fs::create_dir_all(package.join("empty")).unwrap();

    let archive = create_archive(&package, &dir.join("out/release.zip")).unwrap();
    assert_eq!(archive, dir.join("out/release.zip"));

    let names = zip_names(&archive);
    assert!(names.contains("general.json"));
    assert!(names.contains("lists/list-general.txt"));
    assert!(names.contains("lists/"));
    assert!(names.contains("empty/"));
    assert!(names.iter().all(|n| !n.starts_with("pkg")));
}

#[test]
fn test_archive_is_reproducible() {
    let (_temp_dir, dir) = create_test_dir();
    let package = dir.join("pkg");
    write(&package.join("readme.md"), "readme");
    write(&package.join("lists/list-general.txt"), "discord.com");

    let mtime = filetime::FileTime::from_unix_time(1_600_000_000, 0);
    for path in ["readme.md", "lists/list-general.txt", "lists", ""] {
        filetime::set_file_mtime(package.join(path), mtime).unwrap();
    }

    let first = create_archive(&package, &dir.join("first.zip")).unwrap();
    // DOS timestamps have a two second resolution
    std::thread::sleep(std::time::Duration::from_millis(2100));
    let second = create_archive(&package, &dir.join("second.zip")).unwrap();

    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
}

#[test]
fn test_archive_moved_to_requested_name() {
    let (_temp_dir, dir) = create_test_dir();
    let package = dir.join("pkg");
    write(&package.join("readme.md"), "readme");

    let requested = dir.join("release.pack");
    let archive = create_archive(&package, &requested).unwrap();

    assert_eq!(archive, requested);
    assert!(requested.is_file());
    assert!(!dir.join("release.zip").exists());
    assert!(zip_names(&requested).contains("readme.md"));
}

#[test]
fn test_archive_inside_package_excludes_itself() {
    let (_temp_dir, dir) = create_test_dir();
    let package = dir.join("pkg");
    write(&package.join("readme.md"), "readme");

    let archive = create_archive(&package, &package.join("release.zip")).unwrap();
    let names = zip_names(&archive);

    assert!(names.contains("readme.md"));
    assert!(!names.contains("release.zip"));
}

#[test]
fn test_full_pipeline_run() {
    let (_temp_dir, dir) = create_test_dir();
    let source = dir.join("src");
    create_source_tree(&source);

    let options = PipelineOptions {
        source_root: source.clone(),
        profile_dir: dir.join("json"),
        package_dir: dir.join("pkg"),
        zip_output: dir.join("release.zip"),
        excluded_scripts: vec!["service.bat".to_string()],
        excluded_extensions: ExcludedExtensionSet::default(),
    };

    let summary = pipeline::run(&options, &ScriptTranslator::default()).unwrap();

    assert_eq!(summary.scripts_converted, 1);
    assert_eq!(summary.scripts_skipped, 1);
    assert_eq!(summary.scripts_failed, 0);
    assert_eq!(summary.profiles_merged, 1);
    assert_eq!(summary.archive.as_deref(), Some(dir.join("release.zip").as_path()));

    assert!(dir.join("pkg/general.json").is_file());
    assert!(!dir.join("pkg/general.bat").exists());

    let names = zip_names(&dir.join("release.zip"));
    assert!(names.contains("general.json"));
    assert!(names.contains("lists/ipset-all.txt"));
    assert!(!names.iter().any(|n| n.ends_with(".bat") || n.ends_with(".exe")));
    assert!(summary.to_string().ends_with(&format!("Done. Zip path: {}", dir.join("release.zip"))));
}

#[test]
fn test_pipeline_with_missing_source_root() {
    let (_temp_dir, dir) = create_test_dir();

    let options = PipelineOptions {
        source_root: dir.join("missing"),
        profile_dir: dir.join("json"),
        package_dir: dir.join("pkg"),
        zip_output: dir.join("release.zip"),
        excluded_scripts: Vec::new(),
        excluded_extensions: ExcludedExtensionSet::default(),
    };

    let err = pipeline::run(&options, &ScriptTranslator::default()).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSourceRoot(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(!dir.join("pkg").exists());
    assert!(!dir.join("release.zip").exists());
}

//! Discovery and bulk translation of launcher scripts.

use crate::services::translator::{ScriptTranslator, output_file_name};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fs;
use walkdir::WalkDir;

/// Extension of the legacy launcher scripts.
pub const SCRIPT_EXTENSION: &str = "bat";

/// What happened to one discovered script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Converted { output: Utf8PathBuf },
    Skipped,
    Failed { reason: String },
}

/// Outcome of every discovered script, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub outcomes: IndexMap<Utf8PathBuf, ScriptOutcome>,
}

impl SweepReport {
    /// Paths of the profile files written by the sweep.
    pub fn converted(&self) -> Vec<&Utf8Path> {
        self.outcomes
            .values()
            .filter_map(|outcome| match outcome {
                ScriptOutcome::Converted { output } => Some(output.as_path()),
                _ => None,
            })
            .collect()
    }

    pub fn converted_count(&self) -> usize {
        self.count(|o| matches!(o, ScriptOutcome::Converted { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ScriptOutcome::Skipped))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ScriptOutcome::Failed { .. }))
    }

    /// Failed scripts with their reasons.
    pub fn failures(&self) -> Vec<(&Utf8Path, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(path, outcome)| match outcome {
                ScriptOutcome::Failed { reason } => Some((path.as_path(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&ScriptOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

/// Split a comma list of script names into lowercase names for exact matching.
pub fn parse_script_exclusions(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Find every `.bat` file under `root` (extension matched case-insensitively), sorted.
pub fn discover_scripts(root: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut scripts = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => {
                if path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
                {
                    scripts.push(path);
                }
            }
            Err(path) => tracing::warn!("Skipping non UTF-8 path: {}", path.display()),
        }
    }

    scripts
}

/// Translate every script under `root` and write the profiles into `output_dir`.
///
/// `excluded` holds lowercase file names to skip. A script that cannot be read,
/// translated or written is recorded as failed and the sweep moves on. So is a
/// script whose profile name (compared case-insensitively) was already written
/// by an earlier script; the first profile is kept.
pub fn convert_all(
    translator: &ScriptTranslator,
    root: &Utf8Path,
    output_dir: &Utf8Path,
    excluded: &[String],
) -> SweepReport {
    let scripts = discover_scripts(root);
    tracing::info!("Found {} .{} files under {}", scripts.len(), SCRIPT_EXTENSION, root);

    let mut report = SweepReport::default();
    // Lowercased profile file name -> script that claimed it
    let mut claimed: HashMap<String, Utf8PathBuf> = HashMap::new();

    for script in scripts {
        let name = script.file_name().unwrap_or_default().to_lowercase();
        if excluded.contains(&name) {
            tracing::info!("Skipping excluded: {}", script);
            report.outcomes.insert(script, ScriptOutcome::Skipped);
            continue;
        }

        let profile_name = output_file_name(script.file_stem().unwrap_or(script.as_str()));
        if let Some(first) = claimed.get(&profile_name.to_lowercase()) {
            tracing::warn!(
                "Not converting {}: {} was already written for {}",
                script,
                profile_name,
                first
            );
            let reason = format!("profile {} already written for {}", profile_name, first);
            report.outcomes.insert(script, ScriptOutcome::Failed { reason });
            continue;
        }

        let outcome = match convert_script(translator, &script, output_dir) {
            Ok(output) => {
                tracing::info!("Converted: {} -> {}", script, output);
                claimed.insert(profile_name.to_lowercase(), script.clone());
                ScriptOutcome::Converted { output }
            }
            Err(e) => {
                tracing::warn!("Failed to convert {}: {:#}", script, e);
                ScriptOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        };
        report.outcomes.insert(script, outcome);
    }

    report
}

/// Translate one script and write its profile into `output_dir`.
pub fn convert_script(
    translator: &ScriptTranslator,
    script: &Utf8Path,
    output_dir: &Utf8Path,
) -> Result<Utf8PathBuf> {
    convert_script_labeled(translator, script, output_dir, None)
}

/// Like [`convert_script`], with an explicit display label.
pub fn convert_script_labeled(
    translator: &ScriptTranslator,
    script: &Utf8Path,
    output_dir: &Utf8Path,
    label: Option<&str>,
) -> Result<Utf8PathBuf> {
    let config = translator.translate_file_labeled(script, label)?;
    let stem = script.file_stem().unwrap_or(script.as_str());

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir))?;

    let output = output_dir.join(output_file_name(stem));
    let json = config
        .to_json_pretty()
        .context("Failed to serialize launch profile")?;
    fs::write(&output, json).with_context(|| format!("Failed to write profile: {}", output))?;

    Ok(output)
}

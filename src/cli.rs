//! Command-line definitions.
//!
//! The primary workflow takes positional arguments:
//!
//! ```text
//! batpack <source_root> <output_json_folder> <package_dir> <zip_output_path>
//!         [exclude_bat_csv] [exclude_ext_csv] [target_version]
//! ```
//!
//! `exclude_ext_csv` falls back to `EXCLUDE_EXTS` and `target_version` to
//! `TARGET_VERSION`. Subcommands cover single-script conversion and writing
//! a default settings file.

use crate::config::SETTINGS_FILE_NAME;
use crate::models::{NamingPolicy, PackSettings, QuoteStripping, TranslatorOptions};
use crate::services::extensions::{ExcludedExtensionSet, normalize_extensions};
use crate::services::pipeline::PipelineOptions;
use crate::services::sweep::parse_script_exclusions;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Exit code when settings or logging cannot be initialized
pub const EXIT_SETUP_FAILED: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "batpack")]
#[command(version)]
#[command(about = "Convert batch launcher scripts into launch profiles and build a distributable package", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub pack: PackArgs,

    /// Settings file (YAML)
    #[arg(long, global = true, default_value = SETTINGS_FILE_NAME)]
    pub settings: Utf8PathBuf,

    /// Also write daily rotated log files into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<Utf8PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a single launcher script into a profile
    Convert(ConvertArgs),

    /// Write the default settings file
    InitSettings {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

/// Arguments of the `convert` subcommand
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// Script to translate
    pub script: Utf8PathBuf,

    /// Directory for the profile (defaults to the script's directory)
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Label used for the display name instead of the file name
    #[arg(short, long, conflicts_with = "prompt")]
    pub name: Option<String>,

    /// Ask for the label on stdin
    #[arg(long)]
    pub prompt: bool,

    /// Version written into the profile's target
    #[arg(long, env = "TARGET_VERSION")]
    pub target_version: Option<String>,

    #[command(flatten)]
    pub translate: TranslateArgs,
}

impl ConvertArgs {
    /// Translator options for one script.
    ///
    /// A typed label is shown after the fixed prefix (`decorated`) unless
    /// `--naming` says otherwise.
    pub fn translator_options(&self, settings: &PackSettings, labeled: bool) -> TranslatorOptions {
        let mut options = settings.translator.clone();
        if labeled {
            options.naming = NamingPolicy::Decorated;
        }
        self.translate.apply(&mut options);
        apply_target_version(&mut options, self.target_version.as_deref());
        options
    }
}

/// Positional arguments of the packaging workflow
#[derive(Args, Debug, Default)]
pub struct PackArgs {
    /// Tree containing the launcher scripts and package files
    #[arg(required = true)]
    pub source_root: Option<Utf8PathBuf>,

    /// Folder receiving the generated profiles
    #[arg(required = true)]
    pub output_json_folder: Option<Utf8PathBuf>,

    /// Package directory, recreated on every run
    #[arg(required = true)]
    pub package_dir: Option<Utf8PathBuf>,

    /// Path of the final zip archive
    #[arg(required = true)]
    pub zip_output_path: Option<Utf8PathBuf>,

    /// Comma list of script file names to skip
    pub exclude_bat_csv: Option<String>,

    /// Comma list of extensions left out of the package
    #[arg(env = "EXCLUDE_EXTS")]
    pub exclude_ext_csv: Option<String>,

    /// Version written into each profile's target
    #[arg(env = "TARGET_VERSION")]
    pub target_version: Option<String>,

    #[command(flatten)]
    pub translate: TranslateArgs,
}

/// Translator switches shared by the workflow and `convert`
#[derive(Args, Debug, Default, Clone)]
pub struct TranslateArgs {
    /// How display names are derived
    #[arg(long, value_enum)]
    pub naming: Option<NamingPolicy>,

    /// Keep quote characters in the startup command
    #[arg(long)]
    pub preserve_quotes: bool,

    /// Replace `=` with a space in the startup command
    #[arg(long)]
    pub equals_as_space: bool,

    /// Encoding label tried when a script is not valid UTF-8 (e.g. ibm866)
    #[arg(long)]
    pub fallback_encoding: Option<String>,
}

impl TranslateArgs {
    /// Apply command-line switches on top of the settings.
    pub fn apply(&self, options: &mut TranslatorOptions) {
        if let Some(naming) = self.naming {
            options.naming = naming;
        }
        if self.preserve_quotes {
            options.quote_stripping = QuoteStripping::Preserve;
        }
        if self.equals_as_space {
            options.equals_as_space = true;
        }
        if let Some(label) = &self.fallback_encoding {
            options.fallback_encoding = Some(label.clone());
        }
    }
}

impl PackArgs {
    /// Translator options: settings first, then command line.
    pub fn translator_options(&self, settings: &PackSettings) -> TranslatorOptions {
        let mut options = settings.translator.clone();
        self.translate.apply(&mut options);
        apply_target_version(&mut options, self.target_version.as_deref());
        options
    }

    /// Excluded extensions: command line or `EXCLUDE_EXTS`, then settings, then the default set.
    pub fn excluded_extensions(&self, settings: &PackSettings) -> ExcludedExtensionSet {
        let from_args = self
            .exclude_ext_csv
            .as_deref()
            .filter(|csv| !normalize_extensions(csv).is_empty());

        ExcludedExtensionSet::from_csv(from_args.or(Some(settings.excluded_extensions.as_str())))
    }

    /// Script names to skip: command line plus settings, lowercased.
    pub fn excluded_scripts(&self, settings: &PackSettings) -> Vec<String> {
        let mut names = self
            .exclude_bat_csv
            .as_deref()
            .map(parse_script_exclusions)
            .unwrap_or_default();

        for name in &settings.excluded_scripts {
            let name = name.trim().to_lowercase();
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Pipeline inputs, or `None` if a required path is missing.
    pub fn pipeline_options(&self, settings: &PackSettings) -> Option<PipelineOptions> {
        Some(PipelineOptions {
            source_root: self.source_root.clone()?,
            profile_dir: self.output_json_folder.clone()?,
            package_dir: self.package_dir.clone()?,
            zip_output: self.zip_output_path.clone()?,
            excluded_scripts: self.excluded_scripts(settings),
            excluded_extensions: self.excluded_extensions(settings),
        })
    }
}

fn apply_target_version(options: &mut TranslatorOptions, version: Option<&str>) {
    if let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) {
        options.target_version = version.to_string();
    }
}

//! batpack - batch launcher to launch profile converter and package builder
//!
//! Main entry point for the command line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments (usage errors exit with code 2)
//! 2. Load settings: defaults, then `batpack.yaml`, then `BATPACK_*` variables
//! 3. Initialize logging (stderr, plus daily files when a log directory is set)
//! 4. Run the requested command:
//!    - default: sweep scripts, assemble the package, merge profiles, zip it
//!    - `convert`: translate a single script
//!    - `init-settings`: write the default settings file
//!
//! The run summary is printed to stdout; everything else is logged.

use anyhow::{Context, Result};
use batpack::cli::{Cli, Commands, ConvertArgs, EXIT_SETUP_FAILED};
use batpack::services::pipeline::{self, EXIT_MISSING_SOURCE};
use batpack::services::sweep::convert_script_labeled;
use batpack::config::InitOutcome;
use batpack::{APP_NAME, ConfigManager, PackSettings, ScriptTranslator, VERSION};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.settings);
    let settings = match config_manager.load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_SETUP_FAILED);
        }
    };

    let log_dir = cli.log_dir.clone().or_else(|| settings.log_dir.clone());
    let debug = cli.debug || settings.debug;
    let _guard = match batpack::logging::setup_logging(log_dir.as_deref(), APP_NAME, debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_SETUP_FAILED);
        }
    };

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match &cli.command {
        Some(Commands::Convert(args)) => run_convert(&settings, args),
        Some(Commands::InitSettings { force }) => run_init_settings(&config_manager, *force),
        None => run_package(&cli, &settings),
    }
}

/// Full packaging run.
fn run_package(cli: &Cli, settings: &PackSettings) -> ExitCode {
    // clap enforces the positional paths when no subcommand is given
    let Some(options) = cli.pack.pipeline_options(settings) else {
        eprintln!("Error: source_root, output_json_folder, package_dir and zip_output_path are required");
        return ExitCode::from(2);
    };

    let translator = ScriptTranslator::new(cli.pack.translator_options(settings));

    match pipeline::run(&options, &translator) {
        Ok(summary) => {
            summary.log_summary();
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Translate one script into a profile.
fn run_convert(settings: &PackSettings, args: &ConvertArgs) -> ExitCode {
    let script = args.script.as_path();
    let result = resolve_label(args.name.as_deref(), args.prompt).and_then(|label| {
        let translator = ScriptTranslator::new(args.translator_options(settings, label.is_some()));
        let output_dir = args
            .output
            .clone()
            .unwrap_or_else(|| script_dir(script));
        convert_script_labeled(&translator, script, &output_dir, label.as_deref())
    });

    match result {
        Ok(path) => {
            tracing::info!("Converted {} -> {}", script, path);
            println!("{}", path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_MISSING_SOURCE)
        }
    }
}

fn resolve_label(name: Option<&str>, prompt: bool) -> Result<Option<String>> {
    match name {
        Some(name) => Ok(Some(name.to_string())),
        None if prompt => prompt_label(),
        None => Ok(None),
    }
}

fn script_dir(script: &Utf8Path) -> Utf8PathBuf {
    script
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."))
        .to_path_buf()
}

/// Write the settings file with defaults, keeping a valid existing one unless forced.
fn run_init_settings(config_manager: &ConfigManager, force: bool) -> ExitCode {
    match config_manager.init_settings(force) {
        Ok(InitOutcome::Written) => {
            println!("{}", config_manager.settings_path());
            ExitCode::SUCCESS
        }
        Ok(InitOutcome::Kept(existing)) => {
            tracing::warn!(
                "Settings file already exists at {}, use --force to overwrite",
                config_manager.settings_path()
            );
            tracing::info!(
                "Existing settings: target version {}, naming {:?}, excluded extensions {}",
                existing.translator.target_version,
                existing.translator.naming,
                existing.excluded_extensions
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_SETUP_FAILED)
        }
    }
}

/// Ask for a display label on stdin; an empty answer keeps the file name.
fn prompt_label() -> Result<Option<String>> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "Enter config name [$LOADSTRING(general) - ...]: ")
        .and_then(|_| stdout.flush())
        .context("Failed to write prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read config name")?;

    let label = line.trim();
    Ok((!label.is_empty()).then(|| label.to_string()))
}

use crate::models::PackSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Default settings file name, looked up in the working directory.
pub const SETTINGS_FILE_NAME: &str = "batpack.yaml";

/// Prefix of environment variables overriding settings (`BATPACK_DEBUG=true`).
///
/// Nested keys use a double underscore: `BATPACK_TRANSLATOR__TARGET_VERSION=72.0`.
pub const ENV_PREFIX: &str = "BATPACK";

/// Result of [`ConfigManager::init_settings`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Defaults were written
    Written,
    /// A valid settings file was already present
    Kept(PackSettings),
}

/// Configuration manager for loading and saving the run settings.
///
/// Settings are layered, later sources winning:
/// 1. built-in defaults
/// 2. the YAML settings file (optional)
/// 3. `BATPACK_*` environment variables
///
/// Command-line values are applied on top by the caller.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for the settings file at `settings_path`.
    ///
    /// The file does not need to exist.
    pub fn new<P: AsRef<Utf8Path>>(settings_path: P) -> Self {
        Self {
            settings_path: settings_path.as_ref().to_path_buf(),
        }
    }

    /// Load settings from the file and the environment.
    ///
    /// # Returns
    /// The layered PackSettings; defaults when neither source sets anything
    pub fn load_settings(&self) -> Result<PackSettings> {
        if self.settings_path.exists() {
            tracing::debug!("Loading settings from {}", self.settings_path);
        } else {
            tracing::debug!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let layered = config::Config::builder()
            .add_source(
                config::File::from(self.settings_path.as_std_path())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: PackSettings = layered
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        Ok(settings)
    }

    /// Load only the settings file, ignoring the environment.
    ///
    /// # Returns
    /// The parsed PackSettings, or defaults if the file doesn't exist
    pub fn load_file_settings(&self) -> Result<PackSettings> {
        if !self.settings_path.exists() {
            return Ok(PackSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: PackSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        Ok(settings)
    }

    /// Save the settings file, creating its directory if needed.
    ///
    /// # Arguments
    /// * `settings` - The PackSettings to save
    pub fn save_settings(&self, settings: &PackSettings) -> Result<()> {
        if let Some(parent) = self.settings_path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {}", parent))?;
        }

        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write the default settings file.
    ///
    /// An existing file is kept unless `force` is set; it is parsed so that a
    /// broken file is reported instead of silently left in place.
    pub fn init_settings(&self, force: bool) -> Result<InitOutcome> {
        if self.settings_path.exists() && !force {
            let existing = self.load_file_settings().with_context(|| {
                format!(
                    "Existing settings file is invalid, use --force to replace it: {}",
                    self.settings_path
                )
            })?;
            return Ok(InitOutcome::Kept(existing));
        }

        self.save_settings(&PackSettings::default())?;
        Ok(InitOutcome::Written)
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NamingPolicy;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(dir.join(SETTINGS_FILE_NAME));
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let settings = manager.load_file_settings().unwrap();
        assert_eq!(settings, PackSettings::default());
    }

    #[test]
    fn test_save_and_load_file_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut settings = PackSettings::default();
        settings.translator.naming = NamingPolicy::Decorated;
        settings.excluded_scripts = vec!["service.bat".to_string()];
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_file_settings().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_init_settings_keeps_existing_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.settings_path(), "excluded_scripts:\n  - service.bat\n").unwrap();

        match manager.init_settings(false).unwrap() {
            InitOutcome::Kept(settings) => {
                assert_eq!(settings.excluded_scripts, vec!["service.bat".to_string()])
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            fs::read_to_string(manager.settings_path()).unwrap(),
            "excluded_scripts:\n  - service.bat\n"
        );
    }

    #[test]
    fn test_init_settings_rejects_broken_file_without_force() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.settings_path(), "debug: [not a bool\n").unwrap();

        assert!(manager.init_settings(false).is_err());

        assert_eq!(manager.init_settings(true).unwrap(), InitOutcome::Written);
        assert_eq!(manager.load_file_settings().unwrap(), PackSettings::default());
    }
}

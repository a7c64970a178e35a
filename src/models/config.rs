use crate::models::launch_profile::DEFAULT_TARGET_VERSION;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// How a profile's display name is derived from the script name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    /// Substitute localized markers inside the name (`general`, `(ALT`, parentheses).
    #[default]
    Template,
    /// Fixed `$LOADSTRING(general) - ` prefix followed by the raw name.
    Decorated,
}

/// How quote characters are treated in the reconstructed command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStripping {
    /// Drop `\"` sequences and bare `"` characters.
    #[default]
    Strict,
    /// Leave quotes in place.
    Preserve,
}

/// Options threaded through the script translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorOptions {
    #[serde(default = "default_target_version")]
    pub target_version: String,

    #[serde(default)]
    pub naming: NamingPolicy,

    #[serde(default)]
    pub quote_stripping: QuoteStripping,

    /// Replace `=` with a space in the command. Only some legacy script sets need this.
    #[serde(default)]
    pub equals_as_space: bool,

    /// Encoding label (e.g. `ibm866`) tried when a script is not valid UTF-8.
    #[serde(default)]
    pub fallback_encoding: Option<String>,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            target_version: default_target_version(),
            naming: NamingPolicy::default(),
            quote_stripping: QuoteStripping::default(),
            equals_as_space: false,
            fallback_encoding: None,
        }
    }
}

/// Run settings loaded from `batpack.yaml` and `BATPACK_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSettings {
    #[serde(default)]
    pub translator: TranslatorOptions,

    /// Comma list used when no extension list is given on the command line.
    #[serde(default = "default_excluded_extensions")]
    pub excluded_extensions: String,

    /// Script file names skipped by the sweep.
    #[serde(default)]
    pub excluded_scripts: Vec<String>,

    #[serde(default)]
    pub log_dir: Option<Utf8PathBuf>,

    #[serde(default)]
    pub debug: bool,
}

impl Default for PackSettings {
    fn default() -> Self {
        Self {
            translator: TranslatorOptions::default(),
            excluded_extensions: default_excluded_extensions(),
            excluded_scripts: Vec::new(),
            log_dir: None,
            debug: false,
        }
    }
}

fn default_target_version() -> String {
    DEFAULT_TARGET_VERSION.to_string()
}

fn default_excluded_extensions() -> String {
    ".exe,.dll,.sys,.bat".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translator_defaults() {
        let options = TranslatorOptions::default();
        assert_eq!(options.target_version, "71.2");
        assert_eq!(options.naming, NamingPolicy::Template);
        assert_eq!(options.quote_stripping, QuoteStripping::Strict);
        assert!(!options.equals_as_space);
        assert!(options.fallback_encoding.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "translator:\n  naming: decorated\nexcluded_scripts:\n  - service.bat\n";
        let settings: PackSettings = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(settings.translator.naming, NamingPolicy::Decorated);
        assert_eq!(settings.translator.target_version, "71.2");
        assert_eq!(settings.excluded_extensions, ".exe,.dll,.sys,.bat");
        assert_eq!(settings.excluded_scripts, vec!["service.bat".to_string()]);
    }
}

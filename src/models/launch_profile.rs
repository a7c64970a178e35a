use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schema marker written into every launch profile.
pub const SCHEMA_TAG: &str = "IC:v1.0";

/// Application id of the launch target.
pub const TARGET_APP_ID: &str = "CSZTBN012";

/// Version written into the target pair when nothing else is configured.
pub const DEFAULT_TARGET_VERSION: &str = "71.2";

/// First variable of every profile; maps the game filter flag to a port range.
pub const GAME_FILTER_VARIABLE: &str =
    "%GameFilter%=$LOCALCONDITION(useGameFilter==true ? 1024-65535 : 0)";

/// Raised when a profile would be built without a startup command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("startup command is empty")]
pub struct EmptyStartupCommand;

/// Target application pair, serialized as a two-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor(pub String, pub String);

impl TargetDescriptor {
    /// Target pair for the launch application at `version`.
    pub fn for_version(version: impl Into<String>) -> Self {
        Self(TARGET_APP_ID.to_string(), version.into())
    }

    pub fn app_id(&self) -> &str {
        &self.0
    }

    pub fn version(&self) -> &str {
        &self.1
    }
}

/// Launch parameters toggled by the consuming application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParams {
    #[serde(rename = "useGameFilter")]
    pub use_game_filter: bool,
}

/// A launch profile translated from one batch script.
///
/// Serializes to the structured config document:
///
/// ```json
/// {
///     "meta": "IC:v1.0",
///     "name": "...",
///     "target": ["CSZTBN012", "71.2"],
///     "jparams": { "useGameFilter": false },
///     "variables": ["%GameFilter%=...", "%BIN%=..."],
///     "startup_string": "winws.exe --wf-tcp=80,443"
/// }
/// ```
///
/// `jparams` is the written spelling; documents using `params` still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedConfig {
    #[serde(rename = "meta")]
    schema_tag: String,

    #[serde(rename = "name")]
    display_name: String,

    target: TargetDescriptor,

    #[serde(rename = "jparams", alias = "params")]
    parameters: LaunchParams,

    variables: Vec<String>,

    #[serde(rename = "startup_string")]
    startup_command: String,
}

impl TranslatedConfig {
    /// Build a profile. Fails if `startup_command` is empty or whitespace.
    pub fn new(
        display_name: impl Into<String>,
        target: TargetDescriptor,
        variables: Vec<String>,
        startup_command: impl Into<String>,
    ) -> Result<Self, EmptyStartupCommand> {
        let startup_command = startup_command.into();
        if startup_command.trim().is_empty() {
            return Err(EmptyStartupCommand);
        }

        Ok(Self {
            schema_tag: SCHEMA_TAG.to_string(),
            display_name: display_name.into(),
            target,
            parameters: LaunchParams::default(),
            variables,
            startup_command,
        })
    }

    pub fn schema_tag(&self) -> &str {
        &self.schema_tag
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    pub fn parameters(&self) -> &LaunchParams {
        &self.parameters
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn startup_command(&self) -> &str {
        &self.startup_command
    }

    /// Pretty JSON with a four-space indent; non-ASCII text is kept verbatim.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only ever emits valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Parse a profile document, enforcing the non-empty startup command.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        if config.startup_command.trim().is_empty() {
            return Err(EmptyStartupCommand.into());
        }
        Ok(config)
    }
}

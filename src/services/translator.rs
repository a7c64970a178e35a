use crate::models::{
    GAME_FILTER_VARIABLE, NamingPolicy, QuoteStripping, TargetDescriptor, TranslatedConfig,
    TranslatorOptions,
};
use camino::{Utf8Path, Utf8PathBuf};
use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::fs;
use thiserror::Error;

/// Token a batch script uses for its own directory.
const SCRIPT_DIR_TOKEN: &str = "%~dp0";

/// Expression the consuming application evaluates to the profile directory.
const CURRENT_DIR_CALL: &str = "$GETCURRENTDIR()/";

/// Relative path to the bundled binaries; the launcher resolves them itself.
const BIN_PREFIX: &str = r"%~dp0..\bin\";

const CONTINUATION: char = '^';

/// Errors that can occur while translating a script
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Empty startup parameters for {0}. The file may be damaged or not compatible")]
    MalformedScript(String),

    #[error("Failed to read script {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Variables and command recovered from a script before it becomes a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    /// `%NAME%=value` entries, starting with the game filter variable
    pub variables: Vec<String>,

    /// Normalized command line; empty when the script has no usable `start` line
    pub command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Accumulating,
}

/// Translator from batch launcher scripts to launch profiles.
///
/// Scripts are scanned line by line:
/// - blank lines, `::` comments and `rem` remarks are skipped
/// - `set NAME=VALUE` / `set "NAME=VALUE"` lines become `%NAME%=VALUE` variables
/// - a `start` line opens the command; lines ending in `^` continue it and the
///   first line without `^` closes it
///
/// The joined command is then stripped of continuation markers, script-directory
/// references, `POPD`, the `..\bin\` prefix and (by default) quotes.
pub struct ScriptTranslator {
    options: TranslatorOptions,

    /// `rem` as a whole word at the start of a line
    remark_pattern: Regex,

    /// `set NAME=VALUE`, value optionally quoted
    set_pattern: Regex,

    /// `start` as a whole word at the start of a line
    start_keyword: Regex,

    /// `start`, optional quoted title, optional `/min` with its argument
    start_clause: Regex,

    whitespace: Regex,
}

impl ScriptTranslator {
    /// Create a translator with compiled patterns
    pub fn new(options: TranslatorOptions) -> Self {
        Self {
            options,
            remark_pattern: Regex::new(r"(?i)^rem(?:$|\W)").expect("Invalid remark regex"),
            set_pattern: Regex::new(r#"(?i)^set\s+"?(\w+)=(.*?)"?$"#).expect("Invalid set regex"),
            start_keyword: Regex::new(r"(?i)^start\b").expect("Invalid start regex"),
            start_clause: Regex::new(r#"(?i)^start\b\s*(?:"[^"]*"\s*)?(?:/min\s+(?:"[^"]*"|\S+)\s*)?"#)
                .expect("Invalid start clause regex"),
            whitespace: Regex::new(r"\s+").expect("Invalid whitespace regex"),
        }
    }

    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Scan a script and rebuild its variables and command line.
    ///
    /// Never fails; an unusable script yields an empty `command`.
    pub fn parse(&self, text: &str) -> ParsedScript {
        let mut variables = vec![GAME_FILTER_VARIABLE.to_string()];
        let mut fragments: Vec<String> = Vec::new();
        let mut state = ScanState::Idle;

        for raw in text.lines() {
            let line = raw.trim();

            if line.is_empty() || line.starts_with("::") || self.remark_pattern.is_match(line) {
                continue;
            }

            if let Some(caps) = self.set_pattern.captures(line) {
                let value = caps[2]
                    .replace(SCRIPT_DIR_TOKEN, CURRENT_DIR_CALL)
                    .trim_matches('"')
                    .to_string();
                variables.push(format!("%{}%={}", caps[1].to_uppercase(), value));
                continue;
            }

            if self.start_keyword.is_match(line) {
                state = ScanState::Accumulating;
                let rest = self.start_clause.replace(line, "");
                let rest = rest.trim().trim_end_matches(CONTINUATION).trim();
                if !rest.is_empty() {
                    fragments.push(rest.to_string());
                }
                continue;
            }

            if state == ScanState::Accumulating {
                match line.strip_suffix(CONTINUATION) {
                    Some(continued) => fragments.push(continued.trim().to_string()),
                    None => {
                        fragments.push(line.to_string());
                        state = ScanState::Idle;
                    }
                }
            }
        }

        let command = self.normalize_command(&fragments.join(" "));
        tracing::debug!(
            "Parsed script: {} variables, {} command fragments",
            variables.len(),
            fragments.len()
        );

        ParsedScript { variables, command }
    }

    fn normalize_command(&self, joined: &str) -> String {
        let mut command: String = joined
            .chars()
            .filter(|c| *c != CONTINUATION && *c != '\n' && *c != '\r')
            .collect();

        // The bin prefix contains the directory token, so it goes first
        command = command
            .replace(BIN_PREFIX, "")
            .replace(SCRIPT_DIR_TOKEN, "")
            .replace("POPD", "");

        if self.options.quote_stripping == QuoteStripping::Strict {
            command = command.replace("\\\"", "").replace('"', "");
        }

        if self.options.equals_as_space {
            command = command.replace('=', " ");
        }

        self.whitespace.replace_all(&command, " ").trim().to_string()
    }

    /// Translate script text; `stem` is the script file name without extension.
    pub fn translate(&self, text: &str, stem: &str) -> Result<TranslatedConfig, TranslateError> {
        self.translate_labeled(text, stem, stem)
    }

    /// Translate script text using `label` instead of the file stem for the display name.
    pub fn translate_labeled(
        &self,
        text: &str,
        stem: &str,
        label: &str,
    ) -> Result<TranslatedConfig, TranslateError> {
        let parsed = self.parse(text);
        let name = display_name(self.options.naming, label);

        TranslatedConfig::new(
            name,
            TargetDescriptor::for_version(self.options.target_version.clone()),
            parsed.variables,
            parsed.command,
        )
        .map_err(|_| TranslateError::MalformedScript(stem.to_string()))
    }

    /// Read and translate a script file, decoding it lossily.
    pub fn translate_file(&self, path: &Utf8Path) -> Result<TranslatedConfig, TranslateError> {
        self.translate_file_labeled(path, None)
    }

    /// Read and translate a script file with an optional display label.
    pub fn translate_file_labeled(
        &self,
        path: &Utf8Path,
        label: Option<&str>,
    ) -> Result<TranslatedConfig, TranslateError> {
        let bytes = fs::read(path).map_err(|source| TranslateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let text = decode_script(&bytes, self.options.fallback_encoding.as_deref());
        let stem = path.file_stem().unwrap_or(path.as_str());

        self.translate_labeled(&text, stem, label.unwrap_or(stem))
            .map_err(|e| match e {
                TranslateError::MalformedScript(_) => {
                    TranslateError::MalformedScript(path.to_string())
                }
                other => other,
            })
    }
}

impl Default for ScriptTranslator {
    fn default() -> Self {
        Self::new(TranslatorOptions::default())
    }
}

/// Display name for a profile under `policy`.
pub fn display_name(policy: NamingPolicy, label: &str) -> String {
    match policy {
        NamingPolicy::Template => template_name(label),
        NamingPolicy::Decorated => format!("$LOADSTRING(general) - {}", label),
    }
}

// Parentheses of the label are dropped; those of the inserted placeholders stay.
fn template_name(label: &str) -> String {
    let mut name = String::with_capacity(label.len() + 32);
    let mut rest = label;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("general") {
            name.push_str("$LOADSTRING(general) ");
            rest = after;
        } else if let Some(after) = rest.strip_prefix("(ALT") {
            name.push_str("$LOADSTRING(alt) ");
            rest = after;
        } else {
            if c != '(' && c != ')' {
                name.push(c);
            }
            rest = &rest[c.len_utf8()..];
        }
    }

    name
}

/// File name a profile is written under: the stem without spaces or parentheses.
pub fn output_file_name(stem: &str) -> String {
    let slug: String = stem
        .chars()
        .filter(|c| !matches!(c, ' ' | '(' | ')'))
        .collect();
    format!("{}.json", slug)
}

/// Decode script bytes, never failing.
///
/// A BOM selects its encoding; otherwise UTF-8 is assumed. If the UTF-8 decode hit
/// invalid bytes and `fallback` names a known encoding, that encoding is used instead.
pub fn decode_script(bytes: &[u8], fallback: Option<&str>) -> String {
    let (text, encoding, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }

    if let Some(fallback) = fallback.and_then(|label| Encoding::for_label(label.as_bytes())) {
        tracing::debug!(
            "Script is not valid {}, decoding as {}",
            encoding.name(),
            fallback.name()
        );
        let (text, _, _) = fallback.decode(bytes);
        return text.into_owned();
    }

    tracing::warn!("Script contains invalid {} bytes, replaced", encoding.name());
    text.into_owned()
}

//! Normalization of user-supplied extension lists.

use camino::Utf8Path;
use std::collections::BTreeSet;

/// Extensions left out of a package when no list is supplied:
/// native binaries and the batch scripts themselves.
pub const DEFAULT_EXCLUDED_EXTENSIONS: [&str; 4] = [".exe", ".dll", ".sys", ".bat"];

/// Turn a comma list such as `"EXE, .dll,,sys"` into lowercase, dot-prefixed extensions.
///
/// Empty tokens are dropped and duplicates collapse.
pub fn normalize_extensions(csv: &str) -> BTreeSet<String> {
    csv.split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.starts_with('.') {
                token
            } else {
                format!(".{}", token)
            }
        })
        .collect()
}

/// Set of extensions never copied into a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedExtensionSet {
    extensions: BTreeSet<String>,
}

impl ExcludedExtensionSet {
    /// Parse `csv`, substituting the default set when it yields nothing.
    pub fn from_csv(csv: Option<&str>) -> Self {
        let extensions = csv.map(normalize_extensions).unwrap_or_default();
        if extensions.is_empty() {
            return Self::default();
        }
        Self { extensions }
    }

    /// True if `ext` (with or without its dot, any case) is excluded.
    pub fn contains(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        if ext.starts_with('.') {
            self.extensions.contains(&ext)
        } else {
            self.extensions.contains(&format!(".{}", ext))
        }
    }

    /// True if the final extension of `name` is excluded.
    ///
    /// Dotfiles such as `.gitignore` have no extension.
    pub fn excludes_file(&self, name: &str) -> bool {
        Utf8Path::new(name)
            .extension()
            .is_some_and(|ext| self.contains(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for ExcludedExtensionSet {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl std::fmt::Display for ExcludedExtensionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(", "))
    }
}

// src/enumerator/filter.rs

/// Case-insensitive extension filter for directory listings.
///
/// Entries are normalized once: trimmed, a leading `.` stripped, lowercased,
/// empties and duplicates dropped. A filter built from no entries accepts
/// every name; one whose entries all normalize away (`["."]`, `[" "]`)
/// accepts none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    /// Dotted lowercase suffixes, e.g. `.gbc`
    suffixes: Vec<String>,
    accept_all: bool,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = Vec::new();
        let mut given = false;

        for ext in extensions {
            given = true;
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() {
                continue;
            }

            let suffix = format!(".{ext}");
            if !suffixes.contains(&suffix) {
                suffixes.push(suffix);
            }
        }

        if given && suffixes.is_empty() {
            tracing::warn!("extension filter has no usable entries, nothing will match");
        }

        Self {
            suffixes,
            accept_all: !given,
        }
    }

    /// Filter that accepts every file.
    pub fn any() -> Self {
        Self {
            suffixes: Vec::new(),
            accept_all: true,
        }
    }

    /// True when no extensions were given, so every name passes.
    pub fn is_empty(&self) -> bool {
        self.accept_all
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.accept_all {
            return true;
        }

        let name = name.to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::any()
    }
}

use crate::config::BuildMode;
use crate::errors::{PurgeError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Usage of a single token across the scanned files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of occurrences
    pub count: usize,

    /// Files the token was found in, in scan order
    pub files: Vec<String>,
}

/// Union of the tokens found across all content files.
///
/// Iteration order is first-seen order, so two scans of the same files in
/// the same order produce identical keep-lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepList {
    tokens: IndexMap<String, TokenUsage>,
}

impl KeepList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `token` in `file`
    pub fn insert(&mut self, token: &str, file: &str) {
        let usage = self.tokens.entry(token.to_string()).or_default();
        usage.count += 1;
        if !usage.files.iter().any(|f| f == file) {
            usage.files.push(file.to_string());
        }
    }

    /// Record every token of one file
    pub fn extend<I, S>(&mut self, tokens: I, file: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for token in tokens {
            self.insert(token.as_ref(), file);
        }
    }

    /// Fold another keep-list into this one
    pub fn merge(&mut self, other: KeepList) {
        for (token, usage) in other.tokens {
            let entry = self.tokens.entry(token).or_default();
            entry.count += usage.count;
            for file in usage.files {
                if !entry.files.contains(&file) {
                    entry.files.push(file);
                }
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    pub fn usage(&self, token: &str) -> Option<&TokenUsage> {
        self.tokens.get(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Unique tokens in first-seen order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenUsage)> {
        self.tokens.iter().map(|(token, usage)| (token.as_str(), usage))
    }

    /// Snapshot the keep-list as a serialisable manifest
    pub fn to_manifest(&self, files_scanned: usize, mode: BuildMode) -> KeepListManifest {
        let mut by_count: Vec<TopToken> = self
            .tokens
            .iter()
            .map(|(token, usage)| TopToken {
                token: token.clone(),
                count: usage.count,
                file_count: usage.files.len(),
            })
            .collect();
        // Stable sort keeps first-seen order among equal counts
        by_count.sort_by(|a, b| b.count.cmp(&a.count));
        by_count.truncate(10);

        KeepListManifest {
            metadata: KeepListMetadata {
                version: "1.0.0".to_string(),
                generated_at: Utc::now(),
                files_scanned,
                token_count: self.tokens.len(),
                build_mode: mode,
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tokens: self.tokens.clone(),
            top_tokens: by_count,
        }
    }
}

impl<S: AsRef<str>> FromIterator<S> for KeepList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut keep_list = KeepList::new();
        for token in iter {
            keep_list
                .tokens
                .entry(token.as_ref().to_string())
                .or_default()
                .count += 1;
        }
        keep_list
    }
}

/// Metadata for the keep-list manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepListMetadata {
    /// Version of the manifest format
    pub version: String,

    /// Timestamp when the manifest was generated
    pub generated_at: DateTime<Utc>,

    /// Number of content files scanned
    pub files_scanned: usize,

    /// Number of unique tokens
    pub token_count: usize,

    pub build_mode: BuildMode,

    pub tool_version: String,
}

/// Most frequent tokens, for a quick look at what dominates the keep-list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopToken {
    pub token: String,
    pub count: usize,
    pub file_count: usize,
}

/// Keep-list as handed to the pruning stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepListManifest {
    pub metadata: KeepListMetadata,

    /// Map of tokens to their usage
    pub tokens: IndexMap<String, TokenUsage>,

    pub top_tokens: Vec<TopToken>,
}

impl KeepListManifest {
    /// Convert manifest to pretty JSON string
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the manifest as pretty JSON, atomically
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let content = self.to_pretty_json()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        write_atomic(path, &content).map_err(|e| PurgeError::OutputError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Write file atomically by writing to temp file then renaming
pub(crate) fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp_name);

    let mut file = std::fs::File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    std::fs::rename(&temp_path, path)
}

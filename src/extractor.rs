//! Candidate class-name extraction from template sources.
//!
//! A token is a maximal run of `[A-Za-z0-9\-_:/]`. Everything else is a
//! separator. The result over-includes (URL fragments, attribute names,
//! pseudo-class fragments such as `:hover`) and that is fine for a keep-list:
//! an extra selector only costs bytes, a missing one breaks the page.

use crate::config::ExtractorRule;
use crate::errors::Result;
use regex::Regex;
use std::collections::HashMap;
use std::iter::FusedIterator;
use std::path::Path;

/// Returns whether `c` may appear inside a token.
pub fn is_token_char(c: char) -> bool {
    c.is_ascii() && is_token_byte(c as u8)
}

#[inline]
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'/')
}

/// Extract every token of `content`, left to right.
///
/// The sequence is produced lazily. Cloning the iterator (or calling this
/// function again) restarts it from the same position.
pub fn extract(content: &str) -> Tokens<'_> {
    Tokens { content, pos: 0 }
}

/// Lazy iterator over the tokens of a string. See [`extract`].
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.content.as_bytes();

        // Token bytes are all ASCII, so every cut lands on a char boundary.
        let Some(offset) = bytes[self.pos..].iter().position(|&b| is_token_byte(b)) else {
            self.pos = bytes.len();
            return None;
        };
        let start = self.pos + offset;
        let end = bytes[start..]
            .iter()
            .position(|&b| !is_token_byte(b))
            .map_or(bytes.len(), |len| start + len);

        self.pos = end;
        Some(&self.content[start..end])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.content.len() - self.pos;
        // Tokens are separated by at least one byte.
        (0, Some(remaining.div_ceil(2)))
    }
}

impl FusedIterator for Tokens<'_> {}

/// Token extraction strategy for one kind of file
#[derive(Debug, Clone)]
pub enum Extractor {
    /// The built-in character-class scanner ([`extract`])
    Default,
    /// Every non-empty match of a user supplied regular expression
    Pattern(Regex),
}

impl Extractor {
    /// Build an extractor from an optional pattern
    pub fn from_pattern(pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(pattern) => Ok(Self::Pattern(Regex::new(pattern)?)),
            None => Ok(Self::Default),
        }
    }

    /// Run the extractor over `content`
    pub fn tokens<'a>(&self, content: &'a str) -> Vec<&'a str> {
        match self {
            Self::Default => extract(content).collect(),
            Self::Pattern(regex) => regex
                .find_iter(content)
                .map(|m| m.as_str())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }
}

/// Extractors keyed by file extension
#[derive(Debug, Clone)]
pub struct ExtractorSet {
    by_extension: HashMap<String, Extractor>,
    fallback: Extractor,
}

impl ExtractorSet {
    /// Build the set from configuration rules. Later rules win when two rules
    /// name the same extension.
    pub fn from_rules(rules: &[ExtractorRule]) -> Result<Self> {
        let mut by_extension = HashMap::new();

        for rule in rules {
            let extractor = Extractor::from_pattern(rule.pattern.as_deref())?;
            for extension in &rule.extensions {
                let key = extension.trim_start_matches('.').to_ascii_lowercase();
                by_extension.insert(key, extractor.clone());
            }
        }

        Ok(Self {
            by_extension,
            fallback: Extractor::Default,
        })
    }

    /// Extractor for a file, by extension; unknown extensions use the default scanner
    pub fn for_path(&self, path: &Path) -> &Extractor {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.by_extension.get(&ext.to_ascii_lowercase()))
            .unwrap_or(&self.fallback)
    }

    /// Number of extensions with an explicit extractor
    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl Default for ExtractorSet {
    fn default() -> Self {
        Self {
            by_extension: HashMap::new(),
            fallback: Extractor::Default,
        }
    }
}

//! Content file discovery and parallel token scanning.

use crate::errors::{PurgeError, Result};
use crate::extractor::ExtractorSet;
use crate::keep_list::KeepList;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum file size in bytes (default: 10MB)
    pub max_file_size: u64,
    /// Allow symbolic links
    pub allow_symlinks: bool,
    /// Symlink targets must resolve inside this directory
    pub working_directory: PathBuf,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
            allow_symlinks: false,
            working_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

/// Options for [`scan`]
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Fixed number of worker threads; rayon's global pool otherwise
    pub jobs: Option<usize>,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

/// Collect files matching the given patterns, with security checks.
///
/// Returns each path with its size in bytes, in pattern order, without
/// duplicates.
pub fn collect_files(
    patterns: &[String],
    exclude_patterns: &[String],
    security: &SecurityConfig,
) -> Result<Vec<(PathBuf, u64)>> {
    let exclude = exclude_patterns
        .iter()
        .map(|pattern| glob::Pattern::new(pattern))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut files = Vec::new();
    let mut seen = HashSet::new();
    let mut skipped_count = 0;

    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            let path = entry?;

            if exclude.iter().any(|p| p.matches_path(&path)) {
                continue;
            }

            // Paths matched by several patterns are checked once, accepted or not
            if path.is_dir() || !seen.insert(path.clone()) {
                continue;
            }

            if let Err(e) = validate_input_file(&path, security) {
                warn!("Skipping file - {}", e);
                skipped_count += 1;
                continue;
            }

            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            files.push((path, size));
        }
    }

    if skipped_count > 0 {
        warn!("Skipped {} files due to security constraints", skipped_count);
    }

    Ok(files)
}

/// Check if a file is safe to read
fn validate_input_file(path: &Path, security: &SecurityConfig) -> Result<()> {
    if path.is_symlink() {
        if !security.allow_symlinks {
            return Err(PurgeError::SecurityError(format!(
                "Symbolic link not allowed: {}",
                path.display()
            )));
        }

        let target = path.canonicalize().map_err(|e| {
            PurgeError::SecurityError(format!(
                "Cannot resolve symlink target for '{}': {}",
                path.display(),
                e
            ))
        })?;
        let working_dir = security
            .working_directory
            .canonicalize()
            .unwrap_or_else(|_| security.working_directory.clone());

        if !target.starts_with(&working_dir) {
            return Err(PurgeError::SecurityError(format!(
                "Symlink target '{}' is outside working directory",
                target.display()
            )));
        }
    }

    let metadata = fs::metadata(path).map_err(|e| {
        PurgeError::SecurityError(format!(
            "Cannot read file metadata for '{}': {}",
            path.display(),
            e
        ))
    })?;

    if metadata.len() > security.max_file_size {
        return Err(PurgeError::SecurityError(format!(
            "File '{}' exceeds maximum size limit ({} MB > {} MB)",
            path.display(),
            metadata.len() / (1024 * 1024),
            security.max_file_size / (1024 * 1024)
        )));
    }

    Ok(())
}

/// Tokens of one file's content, using the extractor for its extension
pub fn scan_content(content: &str, path: &Path, extractors: &ExtractorSet) -> Vec<String> {
    extractors
        .for_path(path)
        .tokens(content)
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn scan_file(path: &Path, extractors: &ExtractorSet) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(scan_content(&content, path, extractors))
}

/// Scan all files in parallel and union their tokens.
///
/// Files are read concurrently but folded into the keep-list in the order
/// given, so the result does not depend on scheduling.
pub fn scan(files: &[PathBuf], extractors: &ExtractorSet, options: &ScanOptions) -> Result<KeepList> {
    let progress = options.show_progress.then(|| new_progress_bar(files.len() as u64));

    let run = || -> Result<Vec<Vec<String>>> {
        files
            .par_iter()
            .map(|path| {
                let tokens = scan_file(path, extractors)?;
                if let Some(pb) = &progress {
                    pb.inc(1);
                    pb.set_message(format!(
                        "Scanning: {}",
                        path.file_name().unwrap_or_default().to_string_lossy()
                    ));
                }
                Ok(tokens)
            })
            .collect()
    };

    let per_file = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()?
            .install(run)?,
        None => run()?,
    };

    let mut keep_list = KeepList::new();
    for (path, tokens) in files.iter().zip(per_file) {
        debug!("{}: {} tokens", path.display(), tokens.len());
        keep_list.extend(tokens, &path.display().to_string());
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!("✓ {} unique tokens", keep_list.len()));
    }

    Ok(keep_list)
}

fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb
}

pub mod args;
pub mod config;
pub mod content;
pub mod errors;
pub mod extractor;
pub mod keep_list;
pub mod pipeline;

pub use args::{BuildArgs, Cli, Commands, TokensArgs};
pub use config::{BuildMode, ExtractorRule, PipelineConfig, PluginConfig, PurgeConfig, UtilitiesConfig};
pub use content::{collect_files, scan, scan_content, ScanOptions, SecurityConfig};
pub use errors::{PurgeError, Result};
pub use extractor::{extract, is_token_char, Extractor, ExtractorSet, Tokens};
pub use keep_list::{KeepList, KeepListManifest, TokenUsage};
pub use pipeline::{CommandStage, Pipeline, PurgeStage, Stage, UtilityStage};

use indexmap::IndexSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Performance statistics
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub total_duration: Duration,
    pub scan_duration: Duration,
    pub pipeline_duration: Duration,
    pub bytes_scanned: u64,
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct BuildResult {
    pub css: String,
    pub keep_list: KeepList,
    pub mode: BuildMode,
    pub stages: Vec<String>,
    pub files_scanned: usize,
    pub stats: BuildStats,
}

/// Load the configuration named by `path`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Scan the content files, then run the input stylesheet through the pipeline
pub fn build(args: &BuildArgs) -> Result<BuildResult> {
    let start_time = Instant::now();
    let mut stats = BuildStats::default();

    args.validate().map_err(PurgeError::InvalidInput)?;

    let mut config = load_config(args.config.as_deref())?;
    if !args.content.is_empty() {
        config.content = args.content.clone();
    }
    if args.no_preflight {
        config.utilities.preflight = false;
    }
    let mode = args.mode;
    let security = SecurityConfig::default();

    validate_output_path(&args.output, &security)?;
    if let Some(keep_list_path) = &args.keep_list {
        validate_output_path(keep_list_path, &security)?;
    }
    if mode.is_production() {
        validate_output_path(&config.purge.keep_list, &security)?;
    }

    info!("Building {} in {} mode", args.input.display(), mode);
    debug!("Content patterns: {:?}", config.content);

    let files = collect_files(&config.content, &args.exclude, &security)?;
    if files.is_empty() {
        return Err(PurgeError::NoFilesFound);
    }
    stats.bytes_scanned = files.iter().map(|(_, size)| size).sum();
    info!(
        "Found {} content files ({:.2} MB)",
        files.len(),
        stats.bytes_scanned as f64 / (1024.0 * 1024.0)
    );

    let scan_start = Instant::now();
    let extractors = ExtractorSet::from_rules(&config.extractors)?;
    let paths: Vec<PathBuf> = files.into_iter().map(|(path, _)| path).collect();
    let options = ScanOptions {
        jobs: args.jobs,
        show_progress: !args.verbose,
    };
    let keep_list = scan(&paths, &extractors, &options)?;
    stats.scan_duration = scan_start.elapsed();
    info!("Keep-list has {} unique tokens", keep_list.len());

    if let (Some(path), false) = (&args.keep_list, args.dry_run) {
        keep_list.to_manifest(paths.len(), mode).write_to(path)?;
    }

    let input = fs::read_to_string(&args.input).map_err(|e| {
        PurgeError::InputError(format!("Failed to read {}: {}", args.input.display(), e))
    })?;

    // A dry run still exercises the pruner, against a scratch keep-list
    let _scratch = if args.dry_run && mode.is_production() {
        let dir = tempfile::tempdir()?;
        config.purge.keep_list = dir.path().join("keep-list.json");
        Some(dir)
    } else {
        None
    };

    let pipeline_start = Instant::now();
    let pipeline = Pipeline::assemble(&config, mode, &keep_list, paths.len())?;
    let css = pipeline.run(&input)?;
    stats.pipeline_duration = pipeline_start.elapsed();

    if !args.dry_run {
        write_output(&args.output, &css)?;
    }

    stats.total_duration = start_time.elapsed();
    info!(
        "Done in {:.2}s (scan {:.2}s, pipeline {:.2}s)",
        stats.total_duration.as_secs_f64(),
        stats.scan_duration.as_secs_f64(),
        stats.pipeline_duration.as_secs_f64()
    );

    Ok(BuildResult {
        css,
        mode,
        stages: pipeline.stage_names().into_iter().map(str::to_string).collect(),
        files_scanned: paths.len(),
        keep_list,
        stats,
    })
}

/// Validate that a path is safe (no path traversal)
fn validate_output_path(path: &Path, security: &SecurityConfig) -> Result<()> {
    if path.is_absolute() {
        return Ok(());
    }

    let escapes = path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        let working_dir = security
            .working_directory
            .canonicalize()
            .unwrap_or_else(|_| security.working_directory.clone());
        let mut resolved = working_dir.clone();
        for component in path.components() {
            match component {
                std::path::Component::ParentDir => {
                    resolved.pop();
                }
                std::path::Component::CurDir => {}
                other => resolved.push(other),
            }
        }
        if !resolved.starts_with(&working_dir) {
            return Err(PurgeError::SecurityError(format!(
                "Output path '{}' appears to use path traversal",
                path.display()
            )));
        }
    }

    Ok(())
}

fn write_output(path: &Path, css: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    keep_list::write_atomic(path, css).map_err(|e| PurgeError::OutputError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Render the tokens of `input` the way the tokens command prints them
pub fn render_tokens(input: &str, args: &TokensArgs, extractors: &ExtractorSet) -> Result<String> {
    let file_name = match &args.extension {
        Some(ext) => format!("stdin.{}", ext.trim_start_matches('.')),
        None => "stdin".to_string(),
    };
    let tokens = extractors.for_path(Path::new(&file_name)).tokens(input);

    let tokens: Vec<&str> = if args.unique {
        tokens.into_iter().collect::<IndexSet<_>>().into_iter().collect()
    } else {
        tokens
    };

    if args.json {
        let mut rendered = serde_json::to_string(&tokens)?;
        rendered.push('\n');
        Ok(rendered)
    } else {
        Ok(tokens.iter().map(|token| format!("{}\n", token)).collect())
    }
}

/// Handle tokens command - read text from stdin, print its tokens to stdout
pub async fn handle_tokens_command(args: TokensArgs) -> Result<()> {
    use tokio::io::{self, AsyncReadExt, AsyncWriteExt};

    let config = load_config(args.config.as_deref())?;
    let extractors = ExtractorSet::from_rules(&config.extractors)?;

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| PurgeError::InputError(format!("Failed to read from stdin: {}", e)))?;

    let rendered = render_tokens(&input, &args, &extractors)?;

    let mut stdout = io::stdout();
    stdout
        .write_all(rendered.as_bytes())
        .await
        .map_err(|e| PurgeError::OutputError {
            path: "stdout".to_string(),
            message: e.to_string(),
        })?;
    stdout.flush().await.map_err(|e| PurgeError::OutputError {
        path: "stdout".to_string(),
        message: e.to_string(),
    })?;

    Ok(())
}

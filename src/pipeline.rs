//! CSS pipeline assembly and stages.
//!
//! Every stage has the same contract: CSS text in, CSS text out. Stages run
//! in the order they were added.

use crate::config::{BuildMode, PipelineConfig};
use crate::errors::{PurgeError, Result};
use crate::keep_list::{KeepList, KeepListManifest};
use regex::{Captures, Regex};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::time::Instant;
use tailwind_rs::TailwindBuilder;
use tracing::{debug, info};

/// Placeholder in command arguments replaced by the keep-list path
pub const KEEP_LIST_PLACEHOLDER: &str = "{keep_list}";

/// One transformation step of the pipeline
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, css: &str) -> Result<String>;
}

/// Expands `@tailwind` directives into utility CSS for the keep-list tokens
pub struct UtilityStage {
    tokens: Vec<String>,
    preflight: bool,
}

fn directive_regex() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(r"@tailwind\s+(?:base|components|utilities)\s*;")
            .expect("@tailwind directive pattern is valid")
    })
}

impl UtilityStage {
    pub fn new(keep_list: &KeepList, preflight: bool) -> Self {
        Self {
            tokens: keep_list.tokens().map(str::to_string).collect(),
            preflight,
        }
    }

    fn generate(&self) -> Result<String> {
        let mut builder = TailwindBuilder::default();
        builder.preflight.disable = !self.preflight;

        // Most tokens are not utilities (tag names, attribute names...);
        // the builder rejects those and they are simply skipped.
        let traced = self
            .tokens
            .iter()
            .filter(|token| builder.trace(token, false).is_ok())
            .count();
        debug!("traced {} of {} tokens as utilities", traced, self.tokens.len());

        builder
            .bundle()
            .map_err(|e| PurgeError::TailwindError(format!("Failed to generate CSS: {:?}", e)))
    }
}

impl Stage for UtilityStage {
    fn name(&self) -> &str {
        "utilities"
    }

    fn process(&self, css: &str) -> Result<String> {
        let directives = directive_regex();
        if !directives.is_match(css) {
            return Ok(css.to_string());
        }

        let bundle = self.generate()?;
        let mut emitted = false;
        let expanded = directives.replace_all(css, |_: &Captures| {
            if emitted {
                String::new()
            } else {
                emitted = true;
                bundle.clone()
            }
        });

        Ok(expanded.into_owned())
    }
}

/// Runs an external program with the CSS on stdin and reads CSS from stdout
pub struct CommandStage {
    name: String,
    program: String,
    args: Vec<String>,
}

impl CommandStage {
    /// `command` is the program followed by its arguments
    pub fn new(name: impl Into<String>, command: &[String]) -> Result<Self> {
        let name = name.into();
        let (program, args) = command.split_first().ok_or_else(|| PurgeError::ConfigError {
            message: format!("Stage '{}' has an empty command", name),
        })?;

        Ok(Self {
            name,
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Replace `placeholder` with `value` in every argument
    pub fn with_placeholder(mut self, placeholder: &str, value: &str) -> Self {
        for arg in &mut self.args {
            if arg.contains(placeholder) {
                *arg = arg.replace(placeholder, value);
            }
        }
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn failed(&self, message: String) -> PurgeError {
        PurgeError::StageFailed {
            stage: self.name.clone(),
            message,
        }
    }
}

impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, css: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failed(format!("failed to start '{}': {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failed("stdin was not captured".to_string()))?;

        // Feed stdin from a separate thread while stdout is drained, so a
        // process that writes before it finishes reading cannot block us.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(css.as_bytes()));
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output?;
        if !output.status.success() {
            return Err(self.failed(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            // The program may legitimately stop reading early
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(self.failed(format!("failed to write stdin: {}", e))),
            Err(_) => return Err(self.failed("stdin writer panicked".to_string())),
        }

        String::from_utf8(output.stdout)
            .map_err(|_| self.failed("produced non-UTF-8 output".to_string()))
    }
}

/// Writes the keep-list for the pruning tool, then runs it
pub struct PurgeStage {
    keep_list_path: PathBuf,
    manifest: KeepListManifest,
    command: CommandStage,
}

impl PurgeStage {
    pub fn new(keep_list_path: PathBuf, manifest: KeepListManifest, command: &[String]) -> Result<Self> {
        let path = keep_list_path.display().to_string();
        let command = CommandStage::new("purge", command)?.with_placeholder(KEEP_LIST_PLACEHOLDER, &path);

        Ok(Self {
            keep_list_path,
            manifest,
            command,
        })
    }
}

impl Stage for PurgeStage {
    fn name(&self) -> &str {
        self.command.name()
    }

    fn process(&self, css: &str) -> Result<String> {
        self.manifest.write_to(&self.keep_list_path)?;
        debug!(
            "wrote {} tokens to {}",
            self.manifest.metadata.token_count,
            self.keep_list_path.display()
        );
        self.command.process(css)
    }
}

/// Ordered list of stages
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn push(&mut self, stage: impl Stage + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Build the pipeline for `mode`: utilities, then the enabled plugins,
    /// then pruning in production only.
    pub fn assemble(
        config: &PipelineConfig,
        mode: BuildMode,
        keep_list: &KeepList,
        files_scanned: usize,
    ) -> Result<Self> {
        config.validate(mode)?;

        let mut pipeline = Self::new();
        pipeline.push(UtilityStage::new(keep_list, config.utilities.preflight));

        for plugin in config.plugins.iter().filter(|p| p.enabled) {
            pipeline.push(CommandStage::new(plugin.name.clone(), &plugin.command)?);
        }

        if mode.is_production() {
            pipeline.push(PurgeStage::new(
                config.purge.keep_list.clone(),
                keep_list.to_manifest(files_scanned, mode),
                &config.purge.command,
            )?);
        }

        info!("{} pipeline: {}", mode, pipeline.stage_names().join(" -> "));
        Ok(pipeline)
    }

    /// Run every stage in order
    pub fn run(&self, css: &str) -> Result<String> {
        let mut current = css.to_string();
        for stage in &self.stages {
            let start = Instant::now();
            current = stage.process(&current)?;
            debug!(
                "stage '{}' done in {:.2}ms ({} bytes)",
                stage.name(),
                start.elapsed().as_secs_f64() * 1000.0,
                current.len()
            );
        }
        Ok(current)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

use std::fs;
use std::path::Path;
use tailwind_purge::{build, render_tokens, BuildArgs, BuildMode, ExtractorSet, PurgeError, TokensArgs};
use tempfile::TempDir;

const STYLESHEET: &str = ".btn-primary { color: white; }\n.unused { color: red; }\n";

fn write_templates(dir: &Path) {
    fs::write(
        dir.join("Main.elm"),
        r#"view model = button [ class "btn-primary md:text-lg" ] [ text "Go" ]"#,
    )
    .unwrap();
    fs::write(dir.join("layout.pug"), "div.container(class=\"p-4\")\n  block content\n").unwrap();
    fs::write(dir.join("notes.txt"), "not-scanned").unwrap();
}

fn write_config(dir: &Path, purge_command: &[&str]) -> std::path::PathBuf {
    let config = serde_json::json!({
        "content": [
            format!("{}/*.elm", dir.display()),
            format!("{}/*.pug", dir.display()),
        ],
        "plugins": [
            { "name": "autoprefixer", "command": ["cat"] },
            { "name": "preset-env", "command": ["false"], "enabled": false }
        ],
        "purge": {
            "command": purge_command,
            "keep_list": dir.join("out/keep.json"),
        }
    });
    let path = dir.join("pipeline.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn args(dir: &Path, mode: BuildMode) -> BuildArgs {
    let input = dir.join("main.css");
    fs::write(&input, STYLESHEET).unwrap();

    BuildArgs {
        input,
        output: dir.join("dist/main.css"),
        config: None,
        mode,
        content: Vec::new(),
        exclude: Vec::new(),
        keep_list: None,
        jobs: Some(2),
        no_preflight: true,
        dry_run: false,
        verbose: true,
    }
}

#[test]
fn test_development_build_skips_purge() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let mut args = args(temp_dir.path(), BuildMode::Development);
    args.config = Some(write_config(temp_dir.path(), &["false"]));

    let result = build(&args).unwrap();
    assert_eq!(result.stages, vec!["utilities", "autoprefixer"]);
    assert_eq!(result.files_scanned, 2);
    assert!(result.keep_list.contains("btn-primary"));
    assert!(result.keep_list.contains("md:text-lg"));
    assert!(result.keep_list.contains("container"));
    assert!(!result.keep_list.contains("not-scanned"));

    assert_eq!(result.css, STYLESHEET);
    assert_eq!(fs::read_to_string(&args.output).unwrap(), STYLESHEET);
    assert!(!temp_dir.path().join("out/keep.json").exists());
}

#[test]
fn test_production_build_runs_purge_with_keep_list() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    // Stand-in pruner: keeps only lines whose class is in the keep-list
    let pruner = r#"while IFS= read -r line; do
  class=$(printf '%s' "$line" | sed -n 's/^\.\([^ ]*\) .*/\1/p')
  if grep -q "\"$class\"" "$0"; then printf '%s\n' "$line"; fi
done"#;
    let mut args = args(temp_dir.path(), BuildMode::Production);
    args.config = Some(write_config(temp_dir.path(), &["sh", "-c", pruner, "{keep_list}"]));

    let result = build(&args).unwrap();
    assert_eq!(result.mode, BuildMode::Production);
    assert_eq!(result.stages, vec!["utilities", "autoprefixer", "purge"]);
    assert_eq!(result.css, ".btn-primary { color: white; }\n");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(temp_dir.path().join("out/keep.json")).unwrap()).unwrap();
    assert_eq!(manifest["metadata"]["build_mode"], "production");
    assert_eq!(manifest["metadata"]["files_scanned"], 2);
    assert!(manifest["tokens"]["btn-primary"].is_object());
}

#[test]
fn test_production_dry_run_leaves_keep_list_unwritten() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let pruner = r#"grep -q '"btn-primary"' "$0" && cat"#;
    let mut args = args(temp_dir.path(), BuildMode::Production);
    args.config = Some(write_config(temp_dir.path(), &["sh", "-c", pruner, "{keep_list}"]));
    args.dry_run = true;

    let result = build(&args).unwrap();
    assert_eq!(result.stages, vec!["utilities", "autoprefixer", "purge"]);
    assert_eq!(result.css, STYLESHEET);
    assert!(!temp_dir.path().join("out/keep.json").exists());
    assert!(!temp_dir.path().join("out").exists());
    assert!(!args.output.exists());
}

#[test]
fn test_purge_keep_list_path_traversal_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let config = serde_json::json!({
        "content": [format!("{}/*.pug", temp_dir.path().display())],
        "purge": {
            "command": ["cat"],
            "keep_list": "../../../../../../../../../../escape/keep.json",
        }
    });
    let config_path = temp_dir.path().join("pipeline.json");
    fs::write(&config_path, config.to_string()).unwrap();

    let mut args = args(temp_dir.path(), BuildMode::Production);
    args.config = Some(config_path.clone());
    assert!(matches!(build(&args), Err(PurgeError::SecurityError(_))));

    // Only production writes the purge keep-list
    args.mode = BuildMode::Development;
    assert!(build(&args).is_ok());
}

#[test]
fn test_production_without_purge_command_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let mut args = args(temp_dir.path(), BuildMode::Production);
    args.content = vec![format!("{}/*.pug", temp_dir.path().display())];

    assert!(matches!(build(&args), Err(PurgeError::ConfigError { .. })));
}

#[test]
fn test_failing_plugin_aborts_build() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let config = serde_json::json!({
        "content": [format!("{}/*.pug", temp_dir.path().display())],
        "plugins": [{ "name": "broken", "command": ["sh", "-c", "echo nope >&2; exit 1"] }]
    });
    let config_path = temp_dir.path().join("pipeline.json");
    fs::write(&config_path, config.to_string()).unwrap();

    let mut args = args(temp_dir.path(), BuildMode::Development);
    args.config = Some(config_path);

    match build(&args) {
        Err(PurgeError::StageFailed { stage, message }) => {
            assert_eq!(stage, "broken");
            assert!(message.contains("nope"));
        }
        other => panic!("expected StageFailed, got {:?}", other.map(|r| r.stages)),
    }
    assert!(!args.output.exists());
}

#[test]
fn test_no_content_files() {
    let temp_dir = TempDir::new().unwrap();

    let mut args = args(temp_dir.path(), BuildMode::Development);
    args.content = vec![format!("{}/*.elm", temp_dir.path().display())];

    assert!(matches!(build(&args), Err(PurgeError::NoFilesFound)));
}

#[test]
fn test_dry_run_and_keep_list_output() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let mut args = args(temp_dir.path(), BuildMode::Development);
    args.content = vec![format!("{}/*.elm", temp_dir.path().display())];
    args.keep_list = Some(temp_dir.path().join("keep.json"));

    args.dry_run = true;
    let result = build(&args).unwrap();
    assert_eq!(result.files_scanned, 1);
    assert!(!args.output.exists());
    assert!(!temp_dir.path().join("keep.json").exists());

    args.dry_run = false;
    build(&args).unwrap();
    assert!(args.output.exists());
    let keep_list = fs::read_to_string(temp_dir.path().join("keep.json")).unwrap();
    assert!(keep_list.contains("\"md:text-lg\""));
}

#[test]
fn test_exclude_patterns() {
    let temp_dir = TempDir::new().unwrap();
    write_templates(temp_dir.path());

    let mut args = args(temp_dir.path(), BuildMode::Development);
    args.content = vec![format!("{}/*", temp_dir.path().display())];
    args.exclude = vec!["*.css".to_string(), "*.txt".to_string()];

    let result = build(&args).unwrap();
    assert_eq!(result.files_scanned, 2);
    assert!(!result.keep_list.contains("not-scanned"));
}

#[test]
fn test_render_tokens() {
    let extractors = ExtractorSet::default();
    let input = "p-4 flex p-4";

    let plain = render_tokens(input, &TokensArgs::default(), &extractors).unwrap();
    assert_eq!(plain, "p-4\nflex\np-4\n");

    let args = TokensArgs {
        unique: true,
        json: true,
        ..TokensArgs::default()
    };
    assert_eq!(render_tokens(input, &args, &extractors).unwrap(), "[\"p-4\",\"flex\"]\n");

    assert_eq!(render_tokens("", &TokensArgs::default(), &extractors).unwrap(), "");
}

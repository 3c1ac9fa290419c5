use clap::Parser;
use tailwind_purge::{build, handle_tokens_command, Cli, Commands};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Build(args) if args.verbose);
    tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Build(args) => match build(&args) {
            Ok(result) => {
                println!("Build successful ({} mode)", result.mode);
                println!("  - Scanned {} files", result.files_scanned);
                println!("  - Keep-list has {} unique tokens", result.keep_list.len());
                println!("  - Stages: {}", result.stages.join(" -> "));
                if args.dry_run {
                    println!("  - Dry run, {} bytes of CSS not written", result.css.len());
                }
                Ok(())
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Tokens(args) => {
            handle_tokens_command(args).await?;
            Ok(())
        }
    }
}

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use starter_cli::{
    commands::{plan as plan_cmd, prepare, run as run_cmd},
    config::{load_config, resolve_config_path},
};

#[derive(Debug, Parser)]
#[command(name = "starter", about = "Conditional resource loader", version)]
struct Cli {
    /// Path to the manifest (defaults to ./starter.toml, then the user config dir)
    #[arg(short, long, env = "STARTER_MANIFEST", value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Enable diagnostics and debug logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate every resource and load the matching ones
    Run(RunArgs),

    /// Evaluate conditions only and show what would load
    Plan,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Give up if the pass has not settled after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let path = resolve_config_path(cli.manifest);
    let manifest = match load_config(&path) {
        Ok(manifest) => manifest,
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    };
    let debug = cli.debug || manifest.debug;
    init_tracing(debug);
    tracing::debug!(path = %path.display(), resources = manifest.resources.len(), "manifest loaded");

    match cli.command {
        Some(Commands::Run(args)) => {
            let prepared = prepare(manifest, debug);
            let timeout = args.timeout_ms.map(Duration::from_millis);
            let report = run_cmd::run(&prepared, timeout).await?;
            print!("{}", run_cmd::render(&prepared, &report));
        }
        Some(Commands::Plan) => {
            let prepared = prepare(manifest, debug);
            let entries = plan_cmd::plan(&prepared);
            print!("{}", plan_cmd::render(&prepared, &entries));
        }
        None => {
            println!(
                "Loaded manifest from {} ({} resources)",
                path.display(),
                manifest.resources.len()
            );
        }
    }

    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

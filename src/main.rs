use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use version_gate::cli::orchestration::{run_gate_workflow, GateWorkflowArgs};
use version_gate::{config, ui};

#[derive(clap::Parser)]
#[command(
    name = "version-gate",
    version,
    about = "Tag and release a repository when its manifest version changes"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, help = "Manifest file holding the version")]
    manifest: Option<String>,

    #[arg(long, help = "Dotted path of the version field (e.g. package.version)")]
    field: Option<String>,

    #[arg(long, help = "Remote to fetch tags from and push to")]
    remote: Option<String>,

    #[arg(long, env = "GITHUB_REPOSITORY", help = "Repository as OWNER/REPO")]
    repository: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", help = "Release API base URL")]
    api_url: Option<String>,

    #[arg(
        long,
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "Token for pushing tags and creating releases"
    )]
    token: Option<String>,

    #[arg(long, env = "GITHUB_OUTPUT", hide_env_values = true, help = "File receiving step outputs")]
    step_output: Option<PathBuf>,

    #[arg(short = 'C', long, default_value = ".", help = "Repository checkout to operate on")]
    path: PathBuf,

    #[arg(long, help = "Check the tag against local tags only")]
    no_fetch: bool,

    #[arg(long, help = "Create a missing release when the tag already exists")]
    repair_release: bool,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[arg(short, long, help = "Silence log output")]
    quiet: bool,
}

fn init_tracing(args: &Args) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match args.verbose {
        // warnings are already printed by the ui layer
        0 if args.quiet => EnvFilter::new("off"),
        0 => EnvFilter::new("error"),
        1 => EnvFilter::new("version_gate=info,warn"),
        2 => EnvFilter::new("version_gate=debug,info"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(args.verbose >= 2),
        )
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    // Load configuration
    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            std::process::exit(1);
        }
    };

    let workflow_args = GateWorkflowArgs {
        repo_path: args.path,
        manifest: args.manifest,
        field: args.field,
        remote: args.remote,
        repository: args.repository,
        api_url: args.api_url,
        token: args.token,
        no_fetch: args.no_fetch,
        repair_release: args.repair_release,
        dry_run: args.dry_run,
        step_output: args.step_output,
    };

    match run_gate_workflow(&workflow_args, config) {
        Ok(result) => {
            for warning in &result.warnings {
                ui::display_boundary_warning(warning);
            }
            ui::display_outcome(&result.outcome);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = ?e, "Gate run failed");
            ui::display_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

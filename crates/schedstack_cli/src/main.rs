//! SCHEDSTACK CLI
//!
//! Reads the stack configuration, builds the resource graph, diffs it against
//! the last applied manifest and applies it.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use schedstack_core::ConfigValidator;
use schedstack_plan::{ResourceGraph, StackBlueprint, StackBuilder};
use schedstack_provision::{ChangeSet, DeployContext, Deployed, ManifestEngine, ProvisioningEngine};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "schedstack")]
#[command(about = "SCHEDSTACK - Scheduled container job stack builder", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
    /// Directory manifests are written to
    #[arg(short, long, default_value = "stack.out")]
    out: PathBuf,
    /// Blueprint overriding the built-in stack layout
    #[arg(short, long)]
    blueprint: Option<PathBuf>,
    /// Build and diff without applying
    #[arg(long)]
    check: bool,
    /// Target account
    #[arg(long, env = "SCHEDSTACK_ACCOUNT")]
    account: Option<String>,
    /// Target region
    #[arg(long, env = "SCHEDSTACK_REGION")]
    region: Option<String>,
    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

/// What a run produced
#[derive(Debug)]
enum Outcome {
    /// `--check`: built and diffed only
    Checked {
        graph: ResourceGraph,
        changes: ChangeSet,
    },
    /// Graph handed to the engine
    Applied(Deployed),
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schedstack=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_blueprint(path: Option<&Path>) -> Result<StackBlueprint> {
    let Some(path) = path else {
        return Ok(StackBlueprint::default());
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading blueprint {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("parsing blueprint {}", path.display()))
}

fn run(cli: &Cli) -> Result<Outcome> {
    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("reading configuration {}", cli.config.display()))?;
    let config = ConfigValidator::new().parse(&text)?;

    let blueprint = load_blueprint(cli.blueprint.as_deref())?;
    let graph = StackBuilder::new(blueprint).build(&config)?;
    tracing::info!(stack = %graph.stack, resources = graph.len(), digest = %graph.digest(), "stack built");

    let engine = ManifestEngine::new(&cli.out);
    if cli.check {
        let current = engine.current(&graph.stack)?;
        let changes = engine.diff(&graph, &current);
        tracing::info!(stack = %graph.stack, %changes, "check complete, nothing applied");
        return Ok(Outcome::Checked { graph, changes });
    }

    let ctx = DeployContext::new()
        .with_account(cli.account.clone())
        .with_region(cli.region.clone());
    let deployed = engine.apply(&graph, &ctx)?;
    tracing::info!(stack = %deployed.stack, changes = %deployed.changes, "stack applied");
    Ok(Outcome::Applied(deployed))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(&cli)? {
        Outcome::Checked { graph, changes } => {
            println!("Stack: {} ({} resources)", graph.stack, graph.len());
            println!("Digest: {}", graph.digest());
            println!("Changes: {changes}");
            for resource in graph.iter() {
                if let Some(kind) = changes.kind_of(resource.id) {
                    println!("  {kind:?} {} {}", resource.kind.type_name(), resource.logical_name);
                }
            }
        }
        Outcome::Applied(deployed) => {
            println!("Applied stack: {}", deployed.stack);
            println!("Digest: {}", deployed.digest);
            println!("Changes: {}", deployed.changes);
            if let Some(path) = deployed.location {
                println!("Manifest: {}", path.display());
            }
        }
    }
    Ok(())
}

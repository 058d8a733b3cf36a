use anyhow::Result;
use clap::Parser;
use mp_crm_audit::normalize::NullPolicy;
use mp_crm_audit::{run_audit, AuditConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mp-crm-audit")]
#[command(about = "Reconcile a Marketplace export against a CRM export")]
struct Args {
    /// Directory the input and output paths are resolved against (default: current directory)
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// JSON file overriding the default key, fields and paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How absent cells are normalized
    #[arg(long, value_enum)]
    null_policy: Option<NullPolicy>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AuditConfig::load(path)?,
        None => AuditConfig::default(),
    };
    if let Some(dir) = args.base_dir {
        config.base_dir = dir;
    }
    if let Some(policy) = args.null_policy {
        config.null_policy = policy;
    }

    info!("MP CRM audit starting...");
    let (outcome, paths) = run_audit(&config)?;

    print!("{}", outcome.summary);
    println!("Audit reports written to: {}", paths.output_dir.display());

    Ok(())
}

//! kitgc - garbage collect unused Camel K IntegrationKits
//!
//! Deletes IntegrationKits no Integration references. With `--remove-images`
//! unused image layers are squashed and unused images are deleted from the
//! image registry as well.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use kitgc::cli::{self, ConfigSubcommand};
use kitgc::config::ConfigLoader;
use kitgc::{GarbageCollector, GcOptions, KubeCluster, OciRegistry};

/// Garbage collect unused resources
///
/// IntegrationKits that aren't referenced by integrations will be removed.
#[derive(Parser, Debug)]
#[command(name = "kitgc")]
#[command(about = "Garbage collect unused Camel K IntegrationKits", long_about = None)]
struct Args {
    /// Namespace to collect in (defaults to the kubeconfig namespace)
    #[arg(long, short = 'n')]
    namespace: Option<String>,

    /// Do not ask user to confirm resources to be deleted
    #[arg(long = "assumeyes", short = 'y')]
    assume_yes: bool,

    /// Only list resources to be deleted without removing them
    #[arg(long, short = 'd')]
    dry_run: bool,

    /// Also delete unused images from the image registry. Image layers that
    /// are not used will be squashed into new images and Integrations whose
    /// image changed will be redeployed. Requires push and delete rights on
    /// the image registry.
    #[arg(long, short = 'r')]
    remove_images: bool,

    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    cli::init_logging(args.debug);

    match args.command {
        Some(Command::Config { subcommand }) => {
            return cli::handle_config_command(subcommand, args.config.as_deref());
        }
        Some(Command::Version) => {
            cli::display_version();
            return Ok(());
        }
        None => {}
    }

    let config = ConfigLoader::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing::debug!("Initializing Kubernetes client");
    let client = kitgc::kube::create_client(args.context.as_deref()).await?;
    let namespace = args
        .namespace
        .or_else(|| Some(config.namespace.clone()).filter(|ns| !ns.is_empty()))
        .unwrap_or_else(|| client.default_namespace().to_string());

    let options = GcOptions {
        namespace,
        dry_run: args.dry_run,
        assume_yes: args.assume_yes,
        remove_images: args.remove_images || config.remove_images,
    };
    tracing::debug!("Running with {:?}", options);

    let cluster = KubeCluster::new(client);
    let registry = OciRegistry::new(config.registry.credentials());
    let mut collector = GarbageCollector::new(
        &cluster,
        &registry,
        config.default_platform.clone(),
        config.registry.insecure_registries.clone(),
    );

    let mut input = std::io::stdin().lock();
    let mut out = std::io::stdout().lock();
    let mut err = std::io::stderr();
    let outcome = cli::run_gc(&mut collector, &options, &mut input, &mut out, &mut err).await?;
    tracing::debug!("Finished: {:?}", outcome);
    Ok(())
}

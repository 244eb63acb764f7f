use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use pyprune_core::{ConfigManager, PruneConfig, PruneRules};
use pyprune_engine::{PruneEngine, PruneReport};
use pyprune_metadata::{MetadataService, NoMetadata, PythonMetadataService};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

#[derive(Parser)]
#[command(name = "pyprune")]
#[command(about = "Remove unused packages from requirements.txt", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (pretty, json)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Automatically remove unused packages
    ///
    /// Scans Python code and uses installed package metadata to identify and
    /// remove unused dependencies from requirements.txt.
    #[command(visible_alias = "prune")]
    Tidy {
        /// Project directory containing the manifest
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Report what would be removed without rewriting the manifest
        #[arg(long)]
        dry_run: bool,

        /// Skip the installed-metadata lookup and match names only
        #[arg(long)]
        no_metadata: bool,

        /// Python interpreter used for the metadata lookup
        #[arg(long, env = "PYPRUNE_PYTHON")]
        python: Option<String>,

        /// Manifest file name inside the project directory
        #[arg(long)]
        manifest: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Tidy {
            path,
            dry_run,
            no_metadata,
            python,
            manifest,
        } => {
            let manager = ConfigManager::load(path).context("Failed to load configuration")?;
            let mut config = manager.config().clone();
            if let Some(python) = python {
                config.metadata.python = Some(python.clone());
            }
            if let Some(manifest) = manifest {
                config.prune.manifest = manifest.clone();
            }
            if *no_metadata {
                config.metadata.enabled = false;
            }

            init_tracing(&config, cli.verbose);
            if let Some(config_path) = manager.config_path() {
                info!("Using config file {}", config_path.display());
            }

            let report = tidy(path, &config, *dry_run)?;
            print_report(&cli.output, &report)
        }
    }
}

fn init_tracing(config: &PruneConfig, verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&config.logging.level)
        }
    });

    let subscriber = Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn tidy(path: &Path, config: &PruneConfig, dry_run: bool) -> Result<PruneReport> {
    let rules = PruneRules::from_config(config).context("Failed to build pruning rules")?;

    let service: Box<dyn MetadataService> = if config.metadata.enabled {
        let interpreter = config.metadata.interpreter(path);
        info!("Using interpreter {}", interpreter.display());
        Box::new(
            PythonMetadataService::new(interpreter)
                .with_timeout_secs(config.metadata.timeout_secs),
        )
    } else {
        Box::new(NoMetadata)
    };

    let report = PruneEngine::new(config, &rules, service.as_ref())
        .dry_run(dry_run)
        .run(path)?;
    Ok(report)
}

fn print_report(format: &OutputFormat, report: &PruneReport) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Pretty => {
            for name in &report.removed {
                let verb = if report.dry_run { "Would remove" } else { "Removing" };
                println!("{}: {} (Not imported)", verb.yellow(), name.bold());
            }

            if report.is_clean() {
                println!("\n{}", "Everything looks clean.".green());
            } else if report.written {
                println!(
                    "\n{} Removed {} packages.",
                    "Done!".green().bold(),
                    report.removed.len()
                );
            } else {
                println!(
                    "\n{} {} packages would be removed from {}.",
                    "Dry run:".cyan().bold(),
                    report.removed.len(),
                    report.manifest.display()
                );
            }
        }
    }
    Ok(())
}

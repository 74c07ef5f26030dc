use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::{Path, PathBuf};
use toscheck_core::{Checker, Config, Construct, Invocation, OutputFormat, ProcessorRegistry};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser)]
#[command(name = "toscheck")]
#[command(about = "Validate TOSCA service templates and their import trees", long_about = None)]
struct Cli {
    /// Config file (default: ./toscheck.toml, then the user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Do not load the common TOSCA types
    #[arg(long, global = true)]
    no_commons: bool,

    /// Additional directory to search for imports
    #[arg(short = 'I', long = "include", global = true)]
    include: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a document, or every YAML document below a directory
    Check {
        path: PathBuf,

        /// Processors to run on the checked catalog: name[:key=value,...]
        processors: Vec<String>,

        /// Report format: text or json
        #[arg(long)]
        format: Option<String>,
    },
    /// Show the hierarchy of a type after checking
    Hierarchy {
        path: PathBuf,

        /// Construct of the type: node, capability, data, ...
        construct: String,

        #[arg(value_name = "TYPE")]
        type_name: String,
    },
    /// List the available processors
    Processors,
    /// Print the default configuration
    Config,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(file) => Config::from_file(file).wrap_err_with(|| format!("Loading {}", file.display()))?,
        None => Config::load().wrap_err("Loading configuration")?,
    };
    if cli.no_commons {
        config.checker.use_commons = false;
    }
    config
        .checker
        .search_paths
        .extend(cli.include.iter().map(|dir| dir.display().to_string()));

    init_tracing(&config.logging.level);
    debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::Check {
            path,
            processors,
            format,
        } => {
            if let Some(format) = format {
                config.report.format = format;
            }
            let format = config.report.output_format()?;
            let clean = check(&config, &path, &processors, format)?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Hierarchy {
            path,
            construct,
            type_name,
        } => {
            let construct: Construct = construct.parse().map_err(|e: String| eyre!(e))?;
            let mut checker = Checker::with_config(&config.checker)?;
            let catalog = checker.check_path(&path)?;
            let chain: Vec<_> = catalog.hierarchy(construct, &type_name).collect();
            if chain.is_empty() {
                return Err(eyre!("Unknown {} type: {}", construct, type_name));
            }
            for (depth, (name, _)) in chain.iter().enumerate() {
                println!("{}{}", "  ".repeat(depth), name);
            }
        }
        Commands::Processors => {
            for processor in ProcessorRegistry::new().list() {
                println!("{:<10} {}", processor.name(), processor.description());
            }
        }
        Commands::Config => {
            print!("{}", Config::default_config_string());
        }
    }

    Ok(())
}

/// Checks `path`, prints every report, then runs the processors.
///
/// Returns false if any target or processor reported errors.
fn check(config: &Config, path: &Path, processors: &[String], format: OutputFormat) -> Result<bool> {
    let invocations = processors
        .iter()
        .map(|p| p.parse::<Invocation>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut checker = Checker::with_config(&config.checker)?;
    let catalog = checker
        .check_path(path)
        .wrap_err_with(|| format!("Checking {}", path.display()))?;

    let mut clean = match format {
        OutputFormat::Text => render::print_text(&catalog, config.report.show_imports),
        OutputFormat::Json => render::print_json(&catalog, config.report.show_imports)?,
    };

    let registry = ProcessorRegistry::new();
    for invocation in &invocations {
        let report = registry.run(invocation, &catalog)?;
        if report.has_errors() {
            eprintln!("Processor {}: {}", invocation.name, report);
            clean = false;
        }
    }
    Ok(clean)
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

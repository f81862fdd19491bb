//! ckern: command-line driver for the kernel compiler.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::inspect::Stage;
use manifest::CkernManifest;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "warn,ckern=info";

#[derive(Parser)]
#[command(name = "ckern", version, about = "Compile C math kernels to GLSL and JavaScript")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize AST dumps and write kernel bundles
    Compile {
        /// pycparser JSON dumps
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output directory (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Manifest path (default: nearest ckern.toml)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Link an entry point and print its source
    Export {
        /// Entry point function
        entry: String,
        /// Kernel bundles to load
        #[arg(long = "bundle", required = true)]
        bundles: Vec<PathBuf>,
        /// Target dialect (glsl100, glsl300, js)
        #[arg(long)]
        target: Option<String>,
        /// Write GLSL 100 uniform values as JSON to this file
        #[arg(long)]
        uniforms: Option<PathBuf>,
        /// Manifest path (default: nearest ckern.toml)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print a unit as C source
    Inspect {
        /// pycparser JSON dump
        input: PathBuf,
        /// Which form to print
        #[arg(long, value_enum, default_value_t = Stage::Transformed)]
        stage: Stage,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Compile {
            inputs,
            out,
            manifest,
        } => {
            let manifest = load_manifest(&cwd, manifest.as_deref())?;
            let out_dir = out.unwrap_or(cwd);
            commands::compile::run(&inputs, &out_dir, &manifest.extract_config())?;
            Ok(())
        }

        Commands::Export {
            entry,
            bundles,
            target,
            uniforms,
            manifest,
        } => {
            let manifest = load_manifest(&cwd, manifest.as_deref())?;
            let target = target
                .as_deref()
                .or(manifest.default_target())
                .unwrap_or(commands::export::DEFAULT_TARGET);
            commands::export::run(&entry, &bundles, target, uniforms.as_deref())
        }

        Commands::Inspect { input, stage } => commands::inspect::run(&input, stage),
    }
}

/// An explicit manifest path, else the nearest `ckern.toml`, else defaults.
fn load_manifest(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<CkernManifest> {
    if let Some(path) = explicit {
        return CkernManifest::load(path);
    }
    Ok(CkernManifest::find_and_load(cwd)?
        .map(|(manifest, _)| manifest)
        .unwrap_or_default())
}

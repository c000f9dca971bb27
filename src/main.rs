/*
 * markwiki-cli
 * Main entry point.
 *
 * This binary currently supports the `build` subcommand, which renders every
 * wiki page file found under an input directory into a static HTML site,
 * using the markwiki-core engine for header parsing, markup expansion, and
 * the link graph.
 */

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

mod build;

/// Markwiki CLI – utilities for working with wiki-text page files.
///
/// Current focus: `build` subcommand.
/// Future: `serve`, `validate`, exports, etc.
#[derive(Parser, Debug)]
#[command(name = "markwiki", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a static HTML site from a directory of `.wiki` page files.
    ///
    /// Each file becomes one page; its path relative to the input directory
    /// (minus the extension, underscores read as spaces) is the page title.
    /// Pages are saved into an in-memory store first so links, labels, and
    /// backlinks resolve across the whole set.
    Build(BuildArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
struct BuildArgs {
    /// Input directory containing `.wiki` page files (required).
    #[arg(long, value_name = "DIR")]
    input: PathBuf,

    /// Output directory (will be created or replaced).
    #[arg(long, default_value = "./site", value_name = "DIR")]
    output: PathBuf,

    /// Emit an intermediate JSON model (markwiki-data.json).
    #[arg(long)]
    emit_json: bool,

    /// Verbose logging (debug-level engine output on stderr).
    #[arg(long)]
    verbose: bool,

    /// Treat warnings as errors (fail the build if any warning occurs).
    #[arg(long)]
    strict: bool,
}

/// Public-facing build options passed to the build layer.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub emit_json: bool,
    pub verbose: bool,
    pub strict: bool,
}

impl BuildOptions {
    fn from_args(a: &BuildArgs) -> Result<Self> {
        if !a.input.exists() {
            bail!("Input directory does not exist: {}", a.input.display());
        }
        if !a.input.is_dir() {
            bail!("Input must be a directory: {}", a.input.display());
        }
        Ok(Self {
            input: a.input.clone(),
            output: a.output.clone(),
            emit_json: a.emit_json,
            verbose: a.verbose,
            strict: a.strict,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => {
            let opts = BuildOptions::from_args(&args)?;
            let default_level = if opts.verbose { "debug" } else { "warn" };
            env_logger::init_from_env(env_logger::Env::default().default_filter_or(default_level));
            build::run_build(opts)?;
        }
    }

    Ok(())
}

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sdl_dialect::inline::inline_fragments;
use sdl_dialect::Dialect;
use sdl_dialect::Pipeline;
use tracing_subscriber::EnvFilter;

/// Reconcile a dual-sourced GraphQL schema and re-emit it for the code
/// generator or the storage engine.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Schema file to compile, or `-` to read from stdin.
    schema: PathBuf,

    /// Emit the storage-engine dialect instead of the generator dialect.
    #[arg(long)]
    storage: bool,

    /// Inline `<<name>>` auth fragments from this directory before
    /// compiling.
    #[arg(long, value_name = "DIR")]
    auth_dir: Option<PathBuf>,

    /// Compile without printing the result.
    #[arg(long)]
    quiet: bool,

    /// Dump the syntax tree to stderr after compiling.
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut source = String::new();
    if args.schema.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut source)
            .context("reading schema from stdin")?;
    } else {
        source = std::fs::read_to_string(&args.schema)
            .with_context(|| format!("reading {}", args.schema.display()))?;
    }

    if let Some(auth_dir) = &args.auth_dir {
        source = inline_fragments(&source, auth_dir)?;
    }

    let dialect = if args.storage {
        Dialect::Storage
    } else {
        Dialect::Generator
    };
    let compiled = Pipeline::new(dialect).compile(&source)?;

    if !args.quiet {
        println!("{}", compiled.output);
    }
    if args.debug {
        eprintln!("{:#?}", compiled.tree);
    }
    Ok(())
}

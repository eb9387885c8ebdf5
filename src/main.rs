//! `asm-embed <assembly_file>`: embed one file, write `embeddings/<stem>_embedding.json`.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use asm_embed::AppConfig;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asm-embed", version)]
#[command(about = "Embed an assembly source file with a pretrained code encoder", long_about = None)]
struct Cli {
    /// Source file to embed
    #[arg(value_name = "assembly_file")]
    file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(_) => {
            println!("{}", Cli::command().render_usage());
            process::exit(1);
        }
    };

    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = asm_embed::run(&cli.file, &config)?;
    println!("Embedding saved to {}", output.display());

    Ok(())
}

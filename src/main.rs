use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use md2pdf::config::{CONFIG_FILE, Config};

#[derive(Parser)]
#[command(name = "md2pdf")]
#[command(about = "Convert a Markdown file to a styled PDF")]
struct Cli {
    /// Input Markdown file [default: submission-file.md]
    input: Option<PathBuf>,

    /// Output PDF file [default: submission-file.pdf]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the intermediate HTML document
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,

    /// Config file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log every stage in detail
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = Config::load(&cli.config);
    if let Some(input) = cli.input {
        config.files.input = input;
    }
    if let Some(output) = cli.output {
        config.files.output = output;
    }
    if let Some(html) = cli.html {
        config.files.html = Some(html);
    }

    let summary = md2pdf::run(&config).with_context(|| {
        format!(
            "converting {} to {}",
            config.files.input.display(),
            config.files.output.display()
        )
    })?;

    println!("Created {}", summary.output.display());
    Ok(())
}

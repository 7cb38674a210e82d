use anyhow::Result;
use clap::Parser;
use recast::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}

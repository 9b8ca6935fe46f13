use std::process::ExitCode;

use chromlm::cli::{Cli, run};
use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    run(Cli::parse()).await
}

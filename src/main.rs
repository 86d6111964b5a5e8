mod cli;
mod execute;

use clap::Parser;
use crate::cli::CLI;
use anyhow::Result;

fn main() -> Result<()>{
    let cli = CLI::parse();
    init_logging(cli.verbose);
    execute::execute(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

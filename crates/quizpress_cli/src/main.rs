mod cli;
mod commands;
mod logging;
mod render;

use clap::Parser;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log_destination(), cli.log_level());
    commands::dispatch(cli)
}

use adflow_api::cli::{Cli, run};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let code = run(Cli::parse())?;
    std::process::exit(code);
}

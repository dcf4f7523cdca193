//! The main entry point for the `besched` command line tool.
use anyhow::Result;
use human_panic::setup_panic;

fn main() -> Result<()> {
    setup_panic!();

    besched::cli::run_cli()
}

//! blockextract CLI entry point.

use blockextract::cli::{self, Cli, Commands, EXIT_ERROR};
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Extract(args) => cli::run_extract(args),
        Commands::Batch(args) => cli::run_batch(args),
        Commands::Select(args) => cli::run_select(args),
        Commands::Mark(args) => cli::run_mark(args),
        Commands::Convert(args) => cli::run_convert(args),
        Commands::Findings(args) => cli::run_findings(args),
        Commands::Diff(args) => cli::run_diff(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

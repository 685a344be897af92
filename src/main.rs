use clap::Parser;

use dlogcover::cli::Cli;
use dlogcover::commands::run_analyze;

fn main() {
    let cli = Cli::parse();
    std::process::exit(run_analyze(&cli));
}

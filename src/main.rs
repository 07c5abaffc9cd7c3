//! codeseer CLI entry point.

use codeseer::cli::{self, Cli, EXIT_ERROR};
use codeseer::logging;

fn main() {
    let cli = Cli::parse_with_fixed_args(std::env::args_os());
    logging::init_logger(cli.debug);

    let exit_code = match cli::run_scan(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}

/// sqlscript CLI
///
/// Runs JSON-encoded scripts, an interactive session on stdin, or prints the
/// effective configuration.
use sqlscript_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// GraphScript CLI
///
/// Runs, checks and compiles automation scripts against the bundled tools.

use graphscript_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

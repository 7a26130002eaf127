//! ledgerdb CLI entry point.
//!
//! Parses arguments and dispatches to a CLI command; never touches the
//! storage engine directly — that lives behind `ledgerdb::cli::run_command`.

use std::process;

use ledgerdb::cli::{Cli, run_command};

fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = run_command(cli.command) {
        let error_json = serde_json::json!({
            "status": "error",
            "code": e.code_str(),
            "message": e.message(),
        });

        eprintln!("{error_json}");
        process::exit(1);
    }
}

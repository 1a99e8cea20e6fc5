//! Binary entry point for the key/value store.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match abci_kvstore::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be installed yet, so report on stderr directly.
            let _ = writeln!(io::stderr().lock(), "abci-kvstore: {error}");
            ExitCode::FAILURE
        }
    }
}

//! Writes a fresh base64 key pair into the chosen directory.

use clap::Parser;
use secretconf::cli::{init_logging, run_keygen, KeygenCli};

fn main() {
    init_logging();
    if let Err(error) = run_keygen(KeygenCli::parse()) {
        eprintln!("hush-keygen failed: {error:#}");
        std::process::exit(1);
    }
}

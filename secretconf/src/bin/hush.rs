//! Interactive editor for one section of a secret configuration file.

use clap::Parser;
use secretconf::cli::{init_logging, run_hush, HushCli};

fn main() {
    init_logging();
    if let Err(error) = run_hush(HushCli::parse()) {
        eprintln!("hush failed: {error:#}");
        std::process::exit(1);
    }
}

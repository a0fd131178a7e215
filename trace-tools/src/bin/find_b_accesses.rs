//! Report accesses to an address region as CSV

use std::io::{self, BufWriter};
use std::process::ExitCode;

use trace_tools::cli::{self, ScanArgs};
use trace_tools::{logging, scan};

fn main() -> ExitCode {
    logging::setup_logger();
    let args = cli::parse_or_exit::<ScanArgs>();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::report(scan::run(&args, &mut out))
}

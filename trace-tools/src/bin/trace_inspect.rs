//! Dump records of a binary instruction trace

use std::io::{self, BufWriter};
use std::process::ExitCode;

use trace_tools::cli::{self, InspectArgs};
use trace_tools::{inspect, logging};

fn main() -> ExitCode {
    logging::setup_logger();
    let args = cli::parse_or_exit::<InspectArgs>();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::report(inspect::run(&args, &mut out))
}

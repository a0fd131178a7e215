//! Insert part of every iteration's B block into its A block

use std::io::{self, BufWriter};
use std::process::ExitCode;

use trace_tools::cli::{self, BulkArgs};
use trace_tools::{bulk, logging};

fn main() -> ExitCode {
    logging::setup_logger();
    let args = cli::parse_or_exit::<BulkArgs>();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::report(bulk::run(&args, &mut out))
}

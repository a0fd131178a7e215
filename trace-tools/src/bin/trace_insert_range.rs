//! Insert a copy of a record range before an index

use std::io::{self, BufWriter};
use std::process::ExitCode;

use trace_tools::cli::{self, InsertArgs};
use trace_tools::{insert, logging};

fn main() -> ExitCode {
    logging::setup_logger();
    let args = cli::parse_or_exit::<InsertArgs>();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::report(insert::run(&args, &mut out))
}

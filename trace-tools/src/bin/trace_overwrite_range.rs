//! Overwrite a record range with a copy of another range

use std::io::{self, BufWriter};
use std::process::ExitCode;

use trace_tools::cli::{self, OverwriteArgs};
use trace_tools::{logging, overwrite};

fn main() -> ExitCode {
    logging::setup_logger();
    let args = cli::parse_or_exit::<OverwriteArgs>();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::report(overwrite::run(&args, &mut out))
}

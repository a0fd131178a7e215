//! Insert part of region B at a relative position in region A

use std::io::{self, BufWriter};
use std::process::ExitCode;

use trace_tools::cli::{self, ParametricArgs};
use trace_tools::{logging, parametric};

fn main() -> ExitCode {
    logging::setup_logger();
    let args = cli::parse_or_exit::<ParametricArgs>();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    cli::report(parametric::run(&args, &mut out))
}

//! Command line configuration for the trace tools
//!
//! One argument struct per binary. Defaults live here and nowhere else.

use clap::{Args, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use trace_format::TraceError;

use crate::bulk::BulkInsert;
use crate::insert::InsertRange;
use crate::overwrite::OverwriteRange;
use crate::parametric::ParametricInsert;
use crate::scan::Region;

/// Default number of records printed by the inspector
pub const DEFAULT_INSPECT_MAX: u64 = 100;

/// Default bulk iteration stride for `--every`
pub const DEFAULT_EVERY: u64 = 1;

/// Parse an unsigned integer given in decimal or `0x`-prefixed hex.
pub fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

/// Dump records of a trace in human readable form.
#[derive(Parser, Debug, Clone)]
#[command(name = "trace_inspect", version, about = "Dump records of a binary instruction trace.")]
pub struct InspectArgs {
    /// Path to the raw binary trace file
    #[arg(long)]
    pub trace: PathBuf,

    /// Index of the first record to display
    #[arg(long, default_value_t = 0)]
    pub start: u64,

    /// Maximum number of records to display
    #[arg(long, default_value_t = DEFAULT_INSPECT_MAX)]
    pub max: u64,

    /// Print one JSON object per record with every decoded field
    #[arg(long)]
    pub json: bool,

    /// Append the raw record bytes in hex to each text line
    #[arg(long, conflicts_with = "json")]
    pub raw: bool,
}

/// Find accesses to an address region.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "find_b_accesses",
    version,
    about = "Report every memory access that falls inside [base, base + size) as CSV."
)]
pub struct ScanArgs {
    /// Path to the raw binary trace file
    #[arg(long)]
    pub trace: PathBuf,

    /// Base address of the region (hex with 0x prefix, or decimal)
    #[arg(long = "b-base", value_parser = parse_u64)]
    pub b_base: u64,

    /// Size of the region in bytes
    #[arg(long = "b-size", value_parser = parse_u64)]
    pub b_size: u64,

    /// Stop after this many hits, 0 means unlimited
    #[arg(long = "max-hits", default_value_t = 0)]
    pub max_hits: u64,
}

impl ScanArgs {
    pub fn region(&self) -> Region {
        Region::new(self.b_base, self.b_size)
    }
}

/// Input/output options shared by the editing tools
#[derive(Args, Debug, Clone)]
pub struct EditIo {
    /// Input trace file
    #[arg(long = "in")]
    pub input: PathBuf,

    /// Output trace file, required unless --dry-run is given
    #[arg(long = "out", required_unless_present = "dry_run")]
    pub output: Option<PathBuf>,

    /// Validate and print the plan without writing anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// With --dry-run, also print the plan as JSON on stdout
    #[arg(long, requires = "dry_run")]
    pub json: bool,
}

impl EditIo {
    /// Output path of a non dry run.
    ///
    /// Refuses an output that is the input file itself, since creating the
    /// output truncates it before it has been read.
    pub fn output_path(&self) -> crate::Result<&Path> {
        let output = self
            .output
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--out is required unless --dry-run is given"))?;
        if crate::same_file(&self.input, output) {
            return Err(TraceError::InvalidParameter(format!(
                "output {} is the same file as input {}",
                output.display(),
                self.input.display()
            ))
            .into());
        }
        Ok(output)
    }
}

/// Overwrite a range of records with a copy of another range.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trace_overwrite_range",
    version,
    about = "Copy records [src-begin, src-end) over [dst-begin, dst-begin + len). Trace length is unchanged."
)]
pub struct OverwriteArgs {
    #[command(flatten)]
    pub io: EditIo,

    /// Source range start index, inclusive
    #[arg(long = "src-begin")]
    pub src_begin: u64,

    /// Source range end index, exclusive
    #[arg(long = "src-end")]
    pub src_end: u64,

    /// Destination start index
    #[arg(long = "dst-begin")]
    pub dst_begin: u64,
}

impl OverwriteArgs {
    pub fn operation(&self) -> OverwriteRange {
        OverwriteRange {
            src_begin: self.src_begin,
            src_end: self.src_end,
            dst_begin: self.dst_begin,
        }
    }
}

/// Insert a copy of a range of records before an index.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trace_insert_range",
    version,
    about = "Insert a copy of records [src-begin, src-end) before index insert-at. Trace grows by the source length."
)]
pub struct InsertArgs {
    #[command(flatten)]
    pub io: EditIo,

    /// Source range start index, inclusive
    #[arg(long = "src-begin")]
    pub src_begin: u64,

    /// Source range end index, exclusive
    #[arg(long = "src-end")]
    pub src_end: u64,

    /// Records are inserted before this index; the total record count appends
    #[arg(long = "insert-at")]
    pub insert_at: u64,
}

impl InsertArgs {
    pub fn operation(&self) -> InsertRange {
        InsertRange {
            src_begin: self.src_begin,
            src_end: self.src_end,
            insert_at: self.insert_at,
        }
    }
}

/// Insert part of region B at a relative position inside region A.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trace_insert_b_at_a",
    version,
    about = "Insert the first b-ratio of region B at position a-pos within region A."
)]
pub struct ParametricArgs {
    #[command(flatten)]
    pub io: EditIo,

    /// Region A start index, inclusive
    #[arg(long = "a-begin")]
    pub a_begin: u64,

    /// Region A end index, exclusive
    #[arg(long = "a-end")]
    pub a_end: u64,

    /// Region B start index, inclusive
    #[arg(long = "b-begin")]
    pub b_begin: u64,

    /// Region B end index, exclusive
    #[arg(long = "b-end")]
    pub b_end: u64,

    /// Position within A to insert at: 0.0 = start, 0.5 = middle, 1.0 = end
    #[arg(long = "a-pos")]
    pub a_pos: f64,

    /// Fraction of B to insert, in (0.0, 1.0]
    #[arg(long = "b-ratio")]
    pub b_ratio: f64,
}

impl ParametricArgs {
    pub fn operation(&self) -> ParametricInsert {
        ParametricInsert {
            a_begin: self.a_begin,
            a_end: self.a_end,
            b_begin: self.b_begin,
            b_end: self.b_end,
            a_pos: self.a_pos,
            b_ratio: self.b_ratio,
        }
    }
}

/// Apply the parametric insertion to every repeated A/B iteration.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "trace_insert_all_iters",
    version,
    about = "Insert part of each iteration's B block at a relative position inside its A block."
)]
pub struct BulkArgs {
    #[command(flatten)]
    pub io: EditIo,

    /// Start index of the first A block
    #[arg(long = "first-a-begin")]
    pub first_a_begin: u64,

    /// Length of each A block in records
    #[arg(long = "a-len")]
    pub a_len: u64,

    /// Length of each B block in records
    #[arg(long = "b-len")]
    pub b_len: u64,

    /// Number of repeated A/B iterations
    #[arg(long)]
    pub iterations: u64,

    /// Position within each A block to insert at, in [0.0, 1.0]
    #[arg(long = "a-pos")]
    pub a_pos: f64,

    /// Fraction of each B block to insert, in (0.0, 1.0]
    #[arg(long = "b-ratio")]
    pub b_ratio: f64,

    /// Only touch iterations whose index is a multiple of this; 0 disables insertion
    #[arg(long, default_value_t = DEFAULT_EVERY)]
    pub every: u64,
}

impl BulkArgs {
    pub fn operation(&self) -> BulkInsert {
        BulkInsert {
            first_a_begin: self.first_a_begin,
            a_len: self.a_len,
            b_len: self.b_len,
            iterations: self.iterations,
            a_pos: self.a_pos,
            b_ratio: self.b_ratio,
            every: self.every,
        }
    }
}

/// Parse the process arguments. Help and version exit 0, usage errors exit 1.
pub fn parse_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

/// Turn the outcome of a tool into its exit status.
///
/// The error chain is printed to stderr directly so that no log filter can hide it.
pub fn report(result: crate::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

//! Exit codes and output streams of the installed binaries

mod common;

use common::{arg, read_ips, write_numbered};
use std::process::{Command, Output};

fn run(bin: &str, args: &[&str]) -> Output {
    Command::new(bin).args(args).output().unwrap()
}

fn run_with_log_filter(bin: &str, filter: &str, args: &[&str]) -> Output {
    Command::new(bin).env("RUST_LOG", filter).args(args).output().unwrap()
}

#[test]
fn test_help_exits_zero() {
    let output = run(env!("CARGO_BIN_EXE_trace_inspect"), &["--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--trace"));
}

#[test]
fn test_usage_error_exits_one() {
    let output = run(env!("CARGO_BIN_EXE_trace_overwrite_range"), &["--in", "x.bin"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_inspect_writes_records_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let trace = write_numbered(dir.path(), "t.bin", 5);

    let output = run(
        env!("CARGO_BIN_EXE_trace_inspect"),
        &["--trace", arg(&trace), "--start", "3"],
    );
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout.lines().collect::<Vec<_>>(),
        vec!["idx=3 ip=0x67 src_mem=[] dst_mem=[]", "idx=4 ip=0x68 src_mem=[] dst_mem=[]"]
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("Reached end of file"));
}

#[test]
fn test_scan_prints_csv_header_only_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let trace = write_numbered(dir.path(), "t.bin", 3);

    let output = run(
        env!("CARGO_BIN_EXE_find_b_accesses"),
        &["--trace", arg(&trace), "--b-base", "0x1000", "--b-size", "64"],
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "idx,kind,ip,addr,offset\n");
}

#[test]
fn test_validation_failure_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_numbered(dir.path(), "in.bin", 10);
    let out = dir.path().join("out.bin");

    let output = run(
        env!("CARGO_BIN_EXE_trace_insert_range"),
        &[
            "--in",
            arg(&input),
            "--out",
            arg(&out),
            "--src-begin",
            "4",
            "--src-end",
            "2",
            "--insert-at",
            "0",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("src_begin (4) must be less than src_end (2)"), "{stderr}");
    assert!(!out.exists());
}

#[test]
fn test_zero_region_size_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let trace = write_numbered(dir.path(), "t.bin", 3);

    let output = run(
        env!("CARGO_BIN_EXE_find_b_accesses"),
        &["--trace", arg(&trace), "--b-base", "0x1000", "--b-size", "0"],
    );
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_overwrite_binary_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_numbered(dir.path(), "in.bin", 10);
    let out = dir.path().join("out.bin");

    let output = run(
        env!("CARGO_BIN_EXE_trace_overwrite_range"),
        &[
            "--in",
            arg(&input),
            "--out",
            arg(&out),
            "--src-begin",
            "7",
            "--src-end",
            "9",
            "--dst-begin",
            "2",
        ],
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert_eq!(read_ips(&out)[2..4], [107, 108]);
}

#[test]
fn test_errors_survive_any_log_filter() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_numbered(dir.path(), "in.bin", 10);
    let out = dir.path().join("out.bin");
    let args = [
        "--in",
        arg(&input),
        "--out",
        arg(&out),
        "--src-begin",
        "4",
        "--src-end",
        "2",
        "--insert-at",
        "0",
    ];

    for filter in ["off", "trace_format=debug"] {
        let output =
            run_with_log_filter(env!("CARGO_BIN_EXE_trace_insert_range"), filter, &args);
        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("src_begin (4) must be less than src_end (2)"),
            "RUST_LOG={filter}: {stderr}"
        );
    }
}

#[test]
fn test_output_onto_input_keeps_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_numbered(dir.path(), "in.bin", 10);
    let before = std::fs::read(&input).unwrap();

    let output = run(
        env!("CARGO_BIN_EXE_trace_overwrite_range"),
        &[
            "--in",
            arg(&input),
            "--out",
            arg(&input),
            "--src-begin",
            "7",
            "--src-end",
            "9",
            "--dst-begin",
            "2",
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("same file as input"));
    assert_eq!(std::fs::read(&input).unwrap(), before);
}

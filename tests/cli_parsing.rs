//! Tests for CLI argument parsing.
//!
//! The binary's CLI struct lives in main.rs and cannot be imported, so these
//! tests parse against a mirror of it to pin the argument surface.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use geo_gate::{LogFormat, LogLevel};

#[derive(Debug, clap::Parser)]
#[command(name = "geo_gate")]
struct TestCli {
    ip: IpAddr,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    form_id: Option<String>,
    #[arg(long)]
    submission: bool,
    #[arg(long, default_value = "./geo_gate.db")]
    db_path: PathBuf,
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
    #[arg(long, value_enum, default_value = "plain")]
    log_format: LogFormat,
}

#[test]
fn test_minimal_invocation() {
    let cli = TestCli::parse_from(["geo_gate", "8.8.8.8"]);
    assert_eq!(cli.ip, "8.8.8.8".parse::<IpAddr>().unwrap());
    assert!(cli.config.is_none());
    assert!(!cli.submission);
    assert_eq!(cli.db_path, PathBuf::from("./geo_gate.db"));
}

#[test]
fn test_full_invocation() {
    let cli = TestCli::parse_from([
        "geo_gate",
        "2001:4860:4860::8888",
        "--config",
        "policy.json",
        "--form-id",
        "7",
        "--submission",
        "--log-level",
        "debug",
        "--log-format",
        "json",
    ]);
    assert!(cli.ip.is_ipv6());
    assert_eq!(cli.config, Some(PathBuf::from("policy.json")));
    assert_eq!(cli.form_id.as_deref(), Some("7"));
    assert!(cli.submission);
}

#[test]
fn test_invalid_ip_rejected() {
    assert!(TestCli::try_parse_from(["geo_gate", "not-an-ip"]).is_err());
}

#[test]
fn test_invalid_log_level_rejected() {
    assert!(TestCli::try_parse_from(["geo_gate", "8.8.8.8", "--log-level", "loud"]).is_err());
}

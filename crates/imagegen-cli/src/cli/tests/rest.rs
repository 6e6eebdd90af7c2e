//! Tests for validate, preflight and status.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_validate() {
    match parse(&["imagegen", "validate", "content/my-post/images.json"]) {
        CliCommand::Validate { manifest_path } => {
            assert_eq!(manifest_path, Path::new("content/my-post/images.json"));
        }
        _ => panic!("expected Validate"),
    }
}

#[test]
fn cli_parse_preflight() {
    match parse(&["imagegen", "preflight", "my-post"]) {
        CliCommand::Preflight { slug } => assert_eq!(slug, "my-post"),
        _ => panic!("expected Preflight"),
    }
}

#[test]
fn cli_parse_status() {
    match parse(&["imagegen", "status", "my-post"]) {
        CliCommand::Status { slug } => assert_eq!(slug, "my-post"),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["imagegen", "publish", "x"]).is_err());
}

//! Tests for the generate subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_generate() {
    match parse(&["imagegen", "generate", "my-post"]) {
        CliCommand::Generate {
            slug,
            force,
            skip_preflight,
            concurrency,
        } => {
            assert_eq!(slug, "my-post");
            assert!(!force);
            assert!(!skip_preflight);
            assert!(concurrency.is_none());
        }
        _ => panic!("expected Generate"),
    }
}

#[test]
fn cli_parse_generate_flags() {
    match parse(&[
        "imagegen",
        "generate",
        "my-post",
        "--force",
        "--skip-preflight",
        "--concurrency",
        "4",
    ]) {
        CliCommand::Generate {
            force,
            skip_preflight,
            concurrency,
            ..
        } => {
            assert!(force);
            assert!(skip_preflight);
            assert_eq!(concurrency, Some(4));
        }
        _ => panic!("expected Generate with flags"),
    }
}

#[test]
fn cli_parse_generate_requires_slug() {
    assert!(Cli::try_parse_from(["imagegen", "generate"]).is_err());
}

#[test]
fn cli_parse_generate_rejects_bad_concurrency() {
    assert!(Cli::try_parse_from(["imagegen", "generate", "x", "--concurrency", "many"]).is_err());
}

//! # cowrite CLI
//!
//! Command-line utilities for inspecting and replaying edit batches.

use anyhow::{Context, Result};
use cowrite_core::{transform_batch, Operation};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "transform" => {
            if args.len() < 3 {
                eprintln!("Usage: cowrite transform <ops.json>");
                std::process::exit(1);
            }
            let ops = load_operations(Path::new(&args[2]))?;
            let transformed = transform_batch(ops);
            let json =
                serde_json::to_string_pretty(&transformed).context("Failed to encode operations")?;
            println!("{json}");
        }
        "replay" => {
            if args.len() < 3 {
                eprintln!("Usage: cowrite replay <ops.json> [base-text]");
                std::process::exit(1);
            }
            let ops = load_operations(Path::new(&args[2]))?;
            let base = args.get(3).map_or("", String::as_str);
            println!("{}", replay(base, ops));
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Read a JSON array of operations from `path`.
fn load_operations(path: &Path) -> Result<Vec<Operation>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid operations in {}", path.display()))
}

/// Transform a concurrent batch and apply it to `base`.
fn replay(base: &str, ops: Vec<Operation>) -> String {
    transform_batch(ops)
        .iter()
        .fold(base.to_string(), |text, op| op.apply_to(&text))
}

fn print_help() {
    println!(
        r#"cowrite CLI

USAGE:
    cowrite <COMMAND> [OPTIONS]

COMMANDS:
    transform <ops.json>             Print a concurrent batch in canonical, transformed order
    replay <ops.json> [base-text]    Transform a batch and print the resulting text
    help                             Show this help message

The operations file holds a JSON array of operations, e.g.
    [{{"id":"…","kind":"insert","position":0,"content":"hi","author":"alice",
      "timestamp":"2024-05-01T12:00:00Z","session":"notes"}}]

EXAMPLES:
    cowrite transform edits.json
    cowrite replay edits.json "hello world"
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BATCH: &str = r#"[
        {"id":"00000000-0000-0000-0000-000000000002","kind":"insert","position":0,"content":"B","author":"b","timestamp":"2024-05-01T12:00:02Z","session":"s"},
        {"id":"00000000-0000-0000-0000-000000000001","kind":"insert","position":0,"content":"A","author":"a","timestamp":"2024-05-01T12:00:01Z","session":"s"},
        {"id":"00000000-0000-0000-0000-000000000003","kind":"delete","position":0,"length":2,"author":"c","timestamp":"2024-05-01T12:00:03Z","session":"s"}
    ]"#;

    fn batch_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_and_replay_batch() {
        let file = batch_file(BATCH);
        let ops = load_operations(file.path()).unwrap();

        assert_eq!(ops.len(), 3);
        assert_eq!(replay("xyz", ops), "ABz");
    }

    #[test]
    fn malformed_batch_reports_path() {
        let file = batch_file(r#"[{"id":"00000000-0000-0000-0000-000000000001","kind":"delete","position":0,"author":"a","timestamp":"2024-05-01T12:00:01Z","session":"s"}]"#);

        let err = load_operations(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("no length"));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_operations(&dir.path().join("absent.json")).is_err());
    }
}

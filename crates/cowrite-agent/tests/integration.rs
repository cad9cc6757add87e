use cowrite_core::Operation;
use cowrite_proto::{DocumentSnapshot, EditMessage};
use std::io::Write;
use std::process::{Command, Stdio};

#[test]
fn agent_streams_snapshots_for_edits() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_cowrite-agent"))
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let edits = [
        EditMessage::new(Operation::insert("notes", "alice", 0, "shared text")),
        EditMessage::new(Operation::insert("notes", "bob", 0, "our ")).with_base_version(1),
        EditMessage::new(Operation::delete("notes", "carol", 6, 5)).with_base_version(1),
    ];

    {
        let mut stdin = child.stdin.take().unwrap();
        for edit in &edits {
            writeln!(stdin, "{}", edit.to_json().unwrap()).unwrap();
        }
        writeln!(stdin, "{{\"garbage\": true}}").unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let snapshots: Vec<_> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| DocumentSnapshot::from_json(l).unwrap())
        .collect();

    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0].content, "shared text");
    assert_eq!(snapshots[1].content, "our shared text");
    assert_eq!(snapshots[2].content, "our shared");
    assert_eq!(snapshots[2].version, 3);
}

#[test]
fn agent_rejects_invalid_configuration() {
    let output = Command::new(env!("CARGO_BIN_EXE_cowrite-agent"))
        .env("COWRITE_HISTORY_LIMIT", "many")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();

    assert!(!output.success());
}

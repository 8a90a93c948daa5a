//! Integration tests for the cairn binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cairn_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cairn"))
}

fn write_doc(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod help_command {
    use super::*;

    #[test]
    fn shows_help_with_flag() {
        cairn_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }

    #[test]
    fn shows_version_with_flag() {
        cairn_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod events_command {
    use super::*;

    #[test]
    fn prints_one_event_per_line() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "# Hi\n");

        cairn_cmd()
            .arg("events")
            .arg(&doc)
            .assert()
            .success()
            .stdout(predicate::str::contains("Start(Heading { level: 1 })"))
            .stdout(predicate::str::contains("  Text(\"Hi\")"));
    }

    #[test]
    fn json_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "~~gone~~\n");

        let output = cairn_cmd()
            .args(["events", "--json"])
            .arg(&doc)
            .output()
            .unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value[1]["tag"]["kind"], "strikethrough");
    }

    #[test]
    fn commonmark_flag_disables_extensions() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "~~kept~~\n");

        cairn_cmd()
            .args(["--commonmark", "events"])
            .arg(&doc)
            .assert()
            .success()
            .stdout(predicate::str::contains("Strikethrough").not());
    }

    #[test]
    fn reads_stdin() {
        cairn_cmd()
            .args(["events", "-"])
            .write_stdin("plain\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Start(Paragraph)"));
    }

    #[test]
    fn missing_file_is_an_error() {
        cairn_cmd()
            .args(["events", "does-not-exist.md"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("failed to read"));
    }
}

mod fmt_command {
    use super::*;

    #[test]
    fn rewrites_canonically() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "Title\n=====\n\n* one\n* two\n");

        cairn_cmd()
            .arg("fmt")
            .arg(&doc)
            .assert()
            .success()
            .stdout("# Title\n\n- one\n- two\n");
    }
}

mod stats_command {
    use super::*;

    #[test]
    fn counts_blocks() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "# t\n\n- a\n- b\n\n| x |\n| - |\n");

        cairn_cmd()
            .arg("stats")
            .arg(&doc)
            .assert()
            .success()
            .stdout(predicate::str::contains("List items:     2"))
            .stdout(predicate::str::contains("Tables:         1"));
    }

    #[test]
    fn json_includes_options() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "text\n");

        let output = cairn_cmd()
            .args(["stats", "-j"])
            .arg(&doc)
            .output()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["options"]["profile"], "gfm");
        assert_eq!(value["stats"]["paragraphs"], 1);
    }
}

mod check_command {
    use super::*;

    #[test]
    fn clean_document_succeeds() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "[a]\n\n[a]: /x\n");

        cairn_cmd()
            .arg("check")
            .arg(&doc)
            .assert()
            .success()
            .stdout(predicate::str::contains("no diagnostics"));
    }

    #[test]
    fn diagnostics_exit_with_one() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "[a]: /x\n[a]: /y\n");

        cairn_cmd()
            .arg("check")
            .arg(&doc)
            .assert()
            .code(1)
            .stdout(predicate::str::contains(":2: duplicate-link-definition"));
    }

    #[test]
    fn config_file_changes_policy() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "> > > deep\n");
        let config = write_doc(&dir, "cairn.toml", "[parser]\nmax-nesting-depth = 1\n");

        cairn_cmd()
            .arg("--config")
            .arg(&config)
            .arg("check")
            .arg(&doc)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("nesting-limit"));
    }

    #[test]
    fn bad_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let doc = write_doc(&dir, "a.md", "x\n");
        let config = write_doc(&dir, "cairn.toml", "[parser]\nprofile = \"nope\"\n");

        cairn_cmd()
            .arg("--config")
            .arg(&config)
            .arg("check")
            .arg(&doc)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid config"));
    }
}

//! CLI tests: `evalstat stats` and `evalstat compare` over files on disk

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const METADATA: &str = r#"[
  {"score_id": "accuracy", "scoring_type": "NUMERIC"},
  {"score_id": "topic", "scoring_type": "NOMINAL"},
  {
    "score_id": "quality",
    "scoring_type": "ORDINAL",
    "scale": [
      {"label": "Bad", "value": 1},
      {"label": "Ok", "value": 2},
      {"label": "Good", "value": 3}
    ],
    "ordinal_config": {"acceptable_set": ["Good"]}
  }
]"#;

/// Temporary directory holding `scores.jsonl` and `metadata.json`
struct Inputs {
    dir: TempDir,
}

impl Inputs {
    fn new(records: &[String]) -> Self {
        Self::with_metadata(METADATA, records)
    }

    fn with_metadata(metadata: &str, records: &[String]) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("metadata.json"), metadata).unwrap();
        fs::write(dir.path().join("scores.jsonl"), records.join("\n")).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("evalstat");
        cmd.arg(subcommand)
            .arg("--scores")
            .arg(self.path("scores.jsonl"))
            .arg("--metadata")
            .arg(self.path("metadata.json"))
            .arg("--evaluation")
            .arg("ev1");
        cmd
    }
}

fn record(score: &str, experiment: Option<&str>, row: u64, value: &str) -> String {
    let experiment = experiment
        .map(|e| format!(r#""experiment_id":"{}","#, e))
        .unwrap_or_default();
    format!(
        r#"{{"evaluation_id":"ev1","score_id":"{}",{}"row_key":{},"status":"DONE","value":{}}}"#,
        score, experiment, row, value
    )
}

fn experiment_records() -> Vec<String> {
    let mut records = Vec::new();
    for row in 1..=6u64 {
        records.push(record("accuracy", Some("a"), row, &format!("{}", row as f64 / 10.0)));
        records.push(record("accuracy", Some("b"), row, &format!("{}", row as f64 / 10.0 + 0.5)));
        records.push(record("quality", Some("a"), row, r#""Ok""#));
        records.push(record("quality", Some("b"), row, r#""Good""#));
    }
    records
}

#[test]
fn test_stats_text_output() {
    let inputs = Inputs::new(&[
        record("accuracy", None, 1, "1.0"),
        record("accuracy", None, 2, "3.0"),
        record("topic", None, 1, r#""billing""#),
        record("topic", None, 2, r#""billing""#),
    ]);

    inputs
        .command("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("== accuracy [numeric] =="))
        .stdout(predicate::str::contains("mean:     2.0000"))
        .stdout(predicate::str::contains("mode:     billing"));
}

#[test]
fn test_stats_json_output() {
    let inputs = Inputs::new(&experiment_records());

    let output = inputs
        .command("stats")
        .arg("--experiment")
        .arg("a")
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["evaluation_id"], "ev1");
    assert_eq!(json["scope"], "experiment:a");
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["score_id"], "accuracy");
    assert_eq!(entries[0]["stats"]["type"], "numeric");
    assert_eq!(entries[1]["stats"]["pass_rate"]["proportion"], 0.0);
}

#[test]
fn test_compare_json_output() {
    let inputs = Inputs::new(&experiment_records());

    let output = inputs
        .command("compare")
        .args(["--experiment-a", "a", "--experiment-b", "b", "--score", "quality"])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["scoring_type"], "ORDINAL");
    assert_eq!(json["ordinal"]["n_paired"], 6);
    assert_eq!(json["ordinal"]["delta_pass_rate"]["delta"], 1.0);
    assert_eq!(json["ordinal"]["win_rate"], 1.0);
    assert!(json.get("numeric").is_none());
}

#[test]
fn test_compare_text_output() {
    let inputs = Inputs::new(&experiment_records());

    inputs
        .command("compare")
        .args(["--experiment-a", "a", "--experiment-b", "b", "--score", "accuracy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accuracy: a (A) vs b (B), 6 paired row(s)"))
        .stdout(predicate::str::contains("win/loss/tie: 1.000 / 0.000 / 0.000"));
}

#[test]
fn test_compare_unknown_score_fails() {
    let inputs = Inputs::new(&experiment_records());

    inputs
        .command("compare")
        .args(["--experiment-a", "a", "--experiment-b", "b", "--score", "fluency"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Score not found: fluency"));
}

#[test]
fn test_stats_reports_failed_scores() {
    let inputs = Inputs::new(&[
        record("accuracy", None, 1, "1.0"),
        record("fluency", None, 1, "0.5"),
    ]);

    inputs
        .command("stats")
        .assert()
        .failure()
        .stdout(predicate::str::contains("== accuracy [numeric] =="))
        .stdout(predicate::str::contains("fluency: Score not found"))
        .stderr(predicate::str::contains("Statistics failed for 1 score(s)"));
}

#[test]
fn test_unreadable_definition_fails_only_its_score() {
    let metadata = r#"[
      {"score_id": "accuracy", "scoring_type": "NUMERIC"},
      {"score_id": "verdict", "scoring_type": "BOOLEAN"}
    ]"#;
    let inputs = Inputs::with_metadata(
        metadata,
        &[record("accuracy", None, 1, "1.0"), record("verdict", None, 1, r#""yes""#)],
    );

    inputs
        .command("stats")
        .assert()
        .failure()
        .stdout(predicate::str::contains("== accuracy [numeric] =="))
        .stdout(predicate::str::contains("verdict: Score verdict has an unreadable definition"))
        .stderr(predicate::str::contains("Statistics failed for 1 score(s)"));
}

#[test]
fn test_malformed_scores_file() {
    let inputs = Inputs::new(&[record("accuracy", None, 1, "1.0"), "{not json".to_string()]);

    inputs
        .command("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_config_file_is_validated() {
    let inputs = Inputs::new(&experiment_records());
    let config = inputs.path("evalstat.toml");
    fs::write(&config, "significance_level = 1.5\n").unwrap();

    inputs
        .command("stats")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("significance_level"));
}

#[test]
fn test_debug_flag_logs_to_stderr() {
    let inputs = Inputs::new(&experiment_records());

    inputs
        .command("stats")
        .args(["--experiment", "a", "--debug"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Computed statistics"));
}

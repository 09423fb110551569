//! CLI behaviour of the proteogenomix binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn proteogenomix(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("proteogenomix").unwrap();
    cmd.current_dir(dir.path()).env("RUST_LOG", "error");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    proteogenomix(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("evaluate"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("init-config"));
}

#[test]
fn fast_run_on_demo_records_completes() {
    let dir = tempfile::tempdir().unwrap();
    let output = proteogenomix(&dir)
        .args(["run", "--owner", "alice", "--name", "demo", "--fast"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["analysis"]["status"], "completed");
    assert_eq!(report["analysis"]["progress"], 100);
    assert_eq!(report["biomarkers"][0]["name"], "BRCA1_KRS_L_17");
    assert_eq!(report["artifacts"].as_array().unwrap().len(), 6);
}

#[test]
fn run_rejects_blank_name() {
    let dir = tempfile::tempdir().unwrap();
    proteogenomix(&dir)
        .args(["run", "--owner", "alice", "--name", " ", "--fast"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("analysis name is required"));
}

#[test]
fn evaluate_prints_candidates_for_fasta_and_csv() {
    let dir = tempfile::tempdir().unwrap();
    for file in ["panel.fasta", "panel.csv"] {
        proteogenomix(&dir)
            .arg("evaluate")
            .arg(fixture(file))
            .assert()
            .success()
            .stdout(predicate::str::contains("BRCA1_KRS_L_17"))
            .stdout(predicate::str::contains("PEP1").not());
    }
}

#[test]
fn validate_rejects_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reads.bam");
    std::fs::write(&path, b"binary").unwrap();

    proteogenomix(&dir)
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file type 'bam'"));
}

#[test]
fn validate_honours_configured_size_limit() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("proteogenomix.toml"),
        "[upload]\nmax_file_size_bytes = 16\n",
    )
    .unwrap();

    proteogenomix(&dir)
        .arg("validate")
        .arg(fixture("panel.fasta"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("the limit is 16 bytes"));

    proteogenomix(&dir)
        .arg("validate")
        .arg(fixture("panel.csv"))
        .env("PROTEOGENOMIX_UPLOAD__MAX_FILE_SIZE_BYTES", "1048576")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"csv\""));
}

#[test]
fn init_config_writes_defaults_once() {
    let dir = tempfile::tempdir().unwrap();

    proteogenomix(&dir).arg("init-config").assert().success();
    let written = std::fs::read_to_string(dir.path().join("proteogenomix.toml")).unwrap();
    assert!(written.contains("start_delay_ms = 1000"));
    assert!(written.contains("max_file_size_bytes = 104857600"));

    proteogenomix(&dir)
        .arg("init-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[cfg(feature = "database")]
#[test]
fn runs_persist_across_invocations_with_a_database() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("proteogenomix.toml"),
        format!(
            "[database]\nurl = \"sqlite://{}\"\nmax_connections = 2\nauto_migrate = true\n",
            dir.path().join("runs.db").display()
        ),
    )
    .unwrap();

    for name in ["first", "second"] {
        proteogenomix(&dir)
            .args(["run", "--owner", "alice", "--name", name, "--fast"])
            .assert()
            .success();
    }

    let output = proteogenomix(&dir)
        .args(["list", "--owner", "alice"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let analyses: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(analyses.as_array().unwrap().len(), 2);
    assert!(!dir.path().join("runs.db-wal").exists());
}

#[test]
fn paired_proteomics_and_genomics_files_are_integrated() {
    let dir = tempfile::tempdir().unwrap();
    let residues = "ACDEFGHIKLMNPQSTVWYKRS".repeat(5);
    let proteomics = dir.path().join("proteins.fasta");
    let genomics = dir.path().join("genes.fasta");
    std::fs::write(&proteomics, format!(">ID=P38398 Breast cancer type 1\n{residues}\n")).unwrap();
    std::fs::write(&genomics, format!(">gene=BRCA1 chr=17\n{residues}\n")).unwrap();

    let output = proteogenomix(&dir)
        .args(["run", "--owner", "alice", "--name", "paired", "--fast"])
        .arg("--input")
        .arg(&proteomics)
        .arg("--genomics")
        .arg(&genomics)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["analysis"]["status"], "completed");
    assert_eq!(report["biomarkers"][0]["gene_name"], "BRCA1");
    assert_eq!(report["biomarkers"][0]["protein_name"], "P38398");
    assert_eq!(report["biomarkers"][0]["chromosome"], "17");
}

#[test]
fn genomics_without_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    proteogenomix(&dir)
        .args(["run", "--owner", "alice", "--name", "x", "--fast"])
        .arg("--genomics")
        .arg(fixture("panel.fasta"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input"));
}

// End-to-end tests for the medx binary: exit codes, stdout JSON contract,
// report files.
//
// Run with: cargo test -p medx-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn medx() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_medx"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    medx().current_dir(dir).args(args).output().expect("spawn medx")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed)
        .unwrap_or_else(|e| panic!("stdout must be valid JSON.\nParse error: {e}\nstdout:\n{trimmed}"))
}

/// A run directory with metadata, mutation and timing tables plus a config.
fn workspace() -> TempDir {
    let dir = tempdir().unwrap();
    let p = dir.path();
    fs::write(
        p.join("metadata_truth.csv"),
        "Examen;Nom;Sexe\n25EM001;Dupont;F\n25EM002;Martin;M\n",
    )
    .unwrap();
    fs::write(
        p.join("metadata_model.csv"),
        "Examen;Nom;Sexe\n25EM001;DUPONT;F\n25EM002;Martin;F\n",
    )
    .unwrap();
    fs::write(
        p.join("mutations_truth.csv"),
        "Examen,Gene,Mutation\n25EM001,BRAF,p.(Val600Glu)\n25EM002,KRAS,p.(Gly12Cys)\n25EM002,TP53,p.(Arg175His)\n",
    )
    .unwrap();
    fs::write(
        p.join("mutations_model.csv"),
        "Examen,Gene,Mutation\n25EM001,braf,p.(Val600Glu)\n25EM002,KRAS,p.(Gly12Cys)\n25EM002,TP53,p.(Arg175His)\n25EM002,EGFR,p.(Leu858Arg)\n",
    )
    .unwrap();
    fs::write(
        p.join("times.csv"),
        "Examen,Time_Metadata,Time_Mutation\n25EM001,2,4\n25EM002,4,8\n",
    )
    .unwrap();
    fs::write(
        p.join("eval.toml"),
        r#"
name = "cli-run"
key_column = "Examen"

[metadata]
model = "metadata_model.csv"
truth = "metadata_truth.csv"

[mutations]
model = "mutations_model.csv"
truth = "mutations_truth.csv"
required_column = "Mutation"

[timings]
file = "times.csv"

[output]
mismatches = "mismatches.csv"
"#,
    )
    .unwrap();
    dir
}

// ===========================================================================
// medx run
// ===========================================================================

#[test]
fn run_json_contract() {
    let dir = workspace();
    let output = run_in(dir.path(), &["run", "eval.toml", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let val = assert_single_json(&output);
    assert_eq!(val["meta"]["config_name"], "cli-run");
    assert_eq!(val["metadata"]["exact"]["total_keys"], 2);
    assert_eq!(val["metadata"]["exact"]["exact_matches"], 1);
    assert_eq!(val["mutations"]["exact"]["matched_keys"], 1);
    assert_eq!(val["mutations"]["similarity"]["hallucinations"], 1);
    assert_eq!(val["timings"].as_array().unwrap().len(), 2);

    let err = stderr(&output);
    assert!(err.contains("---- Evaluating cli-run ----"));
    assert!(err.contains("Examen 25EM002: values differ: Sexe"));

    let mismatches = fs::read_to_string(dir.path().join("mismatches.csv")).unwrap();
    assert!(mismatches.starts_with("dataset,key,reason,model,truth\n"));
    assert!(mismatches.contains("mutations,25EM002,row sets differ"));
}

#[test]
fn run_without_json_keeps_stdout_empty() {
    let dir = workspace();
    let output = run_in(dir.path(), &["run", "eval.toml", "--output", "result.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(output.stdout.is_empty());

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("result.json")).unwrap()).unwrap();
    assert_eq!(written["meta"]["key_column"], "Examen");
}

#[test]
fn run_min_accuracy_not_met_exits_5() {
    let dir = workspace();
    let output = run_in(dir.path(), &["run", "eval.toml", "--min-accuracy", "0.9"]);
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("accuracy below 0.9"));

    let output = run_in(dir.path(), &["run", "eval.toml", "--min-accuracy", "0.5"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn missing_table_exits_4() {
    let dir = workspace();
    fs::remove_file(dir.path().join("times.csv")).unwrap();
    let output = run_in(dir.path(), &["run", "eval.toml"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("times.csv"));
}

// ===========================================================================
// medx validate
// ===========================================================================

#[test]
fn validate_accepts_good_config() {
    let dir = workspace();
    let output = run_in(dir.path(), &["validate", "eval.toml"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("datasets: metadata, mutations, timings"));
}

#[test]
fn validate_rejects_bad_threshold_with_exit_3() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("bad.toml"),
        "name = \"bad\"\nkey_column = \"Examen\"\nthreshold = 0\n[metadata]\nmodel = \"m.csv\"\ntruth = \"t.csv\"\n",
    )
    .unwrap();
    let output = run_in(dir.path(), &["validate", "bad.toml"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).starts_with("error: "));
}

// ===========================================================================
// medx metadata / mutations
// ===========================================================================

#[test]
fn metadata_command_writes_xlsx_mismatches() {
    let dir = workspace();
    let output = run_in(
        dir.path(),
        &[
            "metadata",
            "metadata_model.csv",
            "metadata_truth.csv",
            "--key",
            "Examen",
            "--mismatches",
            "mm.xlsx",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let xlsx = dir.path().join("mm.xlsx");
    assert!(xlsx.exists());
    assert!(fs::metadata(&xlsx).unwrap().len() > 100);
}

#[test]
fn metadata_unknown_key_column_exits_2() {
    let dir = workspace();
    let output = run_in(
        dir.path(),
        &["metadata", "metadata_model.csv", "metadata_truth.csv", "--key", "Exam"],
    );
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert!(err.contains("missing key column 'Exam'"));
    assert!(err.contains("hint:"));
}

#[test]
fn sheet_options_apply_per_side() {
    let dir = workspace();
    let p = dir.path();
    let model = medx_io::load_table(&p.join("metadata_model.csv"), None).unwrap();
    let truth = medx_io::load_table(&p.join("metadata_truth.csv"), None).unwrap();
    medx_io::xlsx::write_table(&model, &p.join("model.xlsx"), "Model").unwrap();
    medx_io::xlsx::write_table(&truth, &p.join("truth.xlsx"), "Verified").unwrap();

    let base = ["metadata", "model.xlsx", "truth.xlsx", "--key", "Examen", "--json"];

    let mut model_only = base.to_vec();
    model_only.extend(["--sheet", "Model"]);
    let output = run_in(p, &model_only);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(assert_single_json(&output)["metadata"]["exact"]["total_keys"], 2);

    let mut both = model_only.clone();
    both.extend(["--truth-sheet", "Verified"]);
    assert!(run_in(p, &both).status.success());

    let mut wrong = base.to_vec();
    wrong.extend(["--truth-sheet", "Model"]);
    let output = run_in(p, &wrong);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("no sheet named 'Model'"));
}

#[test]
fn mutations_command_json() {
    let dir = workspace();
    let output = run_in(
        dir.path(),
        &[
            "mutations",
            "mutations_model.csv",
            "mutations_truth.csv",
            "--key",
            "Examen",
            "--required",
            "Mutation",
            "--json",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let val = assert_single_json(&output);
    assert!(val.get("metadata").is_none());
    let penalty = val["mutations"]["similarity"]["penalty"].as_f64().unwrap();
    assert!((penalty - 0.75).abs() < 1e-9);
}

#[test]
fn out_of_range_threshold_is_usage_error() {
    let dir = workspace();
    let output = run_in(
        dir.path(),
        &["mutations", "mutations_model.csv", "mutations_truth.csv", "--key", "Examen", "--threshold", "2"],
    );
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// medx inspect / times
// ===========================================================================

#[test]
fn inspect_shows_both_datasets() {
    let dir = workspace();
    let output = run_in(
        dir.path(),
        &[
            "inspect",
            "25EM002",
            "--key",
            "Examen",
            "--metadata",
            "metadata_model.csv",
            "metadata_truth.csv",
            "--mutations",
            "mutations_model.csv",
            "mutations_truth.csv",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("metadata for 25EM002:"));
    assert!(stdout.contains("mutations for 25EM002:"));
    assert!(stdout.contains("'EGFR'"));
}

#[test]
fn inspect_requires_a_dataset() {
    let dir = workspace();
    let output = run_in(dir.path(), &["inspect", "25EM002", "--key", "Examen"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn times_default_columns() {
    let dir = workspace();
    let output = run_in(dir.path(), &["times", "times.csv"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Time_Metadata - Avg: 3.00s"));
    assert!(stdout.contains("Time_Mutation - Avg: 6.00s"));
}

// ===========================================================================
// medx check
// ===========================================================================

#[test]
fn check_strict_reports_ungrounded_values() {
    let dir = workspace();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("25EM001.txt"), "Gene BRAF, variant p.(Val600Glu)\n").unwrap();
    fs::write(
        docs.join("25EM002.txt"),
        "KRAS p.(Gly12Cys)\nTP53 p.(Arg175His)\n",
    )
    .unwrap();

    let args = [
        "check",
        "mutations_model.csv",
        "--key",
        "Examen",
        "--docs",
        "docs",
        "--value",
        "Mutation",
        "--output",
        "findings.csv",
    ];
    let output = run_in(dir.path(), &args);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("p.(Leu858Arg)"));

    let findings = fs::read_to_string(dir.path().join("findings.csv")).unwrap();
    assert!(findings.contains("value not found in document"));

    let mut strict = args.to_vec();
    strict.push("--strict");
    let output = run_in(dir.path(), &strict);
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn check_missing_docs_dir_exits_4() {
    let dir = workspace();
    let output = run_in(
        dir.path(),
        &["check", "mutations_model.csv", "--key", "Examen", "--docs", "nowhere"],
    );
    assert_eq!(output.status.code(), Some(4));
}

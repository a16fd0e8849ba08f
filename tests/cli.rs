mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

use common::{TestWorkspace, UF_FIXTURE, fixture_path};

fn census_tables() -> Command {
    Command::cargo_bin("census-tables").expect("binary exists")
}

fn fixture_arg() -> String {
    fixture_path(UF_FIXTURE).to_str().unwrap().to_string()
}

#[test]
fn clean_writes_normalized_csv() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("clean.csv");
    census_tables()
        .args(["clean", "-i", &fixture_arg(), "-o", output.to_str().unwrap()])
        .assert()
        .success();

    let contents = std::fs::read_to_string(&output).expect("read output");
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("NIV_TERR;COD_TERR;NOM_TERR;SIST_CRIA;GAL_TOTAL;V_GAL_VEND;N_TRAB_TOTAL;REGIAO")
    );
    assert_eq!(
        lines.next(),
        Some("UF;35;São Paulo;Produtores de ovos para consumo;1234567;98765.43;1200;Sudeste")
    );
    assert!(contents.contains("Amazonas;Outros produtores;12345;;80;Norte"));
}

#[test]
fn clean_preview_renders_table() {
    census_tables()
        .args(["clean", "-i", &fixture_arg(), "--preview", "2"])
        .assert()
        .success()
        .stdout(contains("NOM_TERR").and(contains("Minas Gerais")))
        .stdout(contains("Paraná").not());
}

#[test]
fn clean_reads_stdin() {
    census_tables()
        .args(["clean", "-i", "-", "--input-encoding", "utf-8"])
        .write_stdin("UF;VALOR\nSP;1.000,5\n")
        .assert()
        .success()
        .stdout(contains("SP;1000.5"));
}

#[test]
fn porte_reports_three_groups() {
    census_tables()
        .args(["porte", "-i", &fixture_arg(), "--column", "gal_total"])
        .assert()
        .success()
        .stdout(contains("Pequeno (<").and(contains("Grande (≥")))
        .stdout(contains("33.33%"));
}

#[test]
fn porte_json_flags_reduced_groups() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("sparse.csv", "UF;GAL_TOTAL\nSP;5\nMG;5\nRJ;500\n");
    let assert = census_tables()
        .args([
            "porte",
            "-i",
            input.to_str().unwrap(),
            "--column",
            "GAL_TOTAL",
            "--json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(json["strategy"], "fixed_threshold");
    assert_eq!(json["requested"], 3);
    assert_eq!(json["counts"], serde_json::json!([2, 1]));
}

#[test]
fn rank_sums_metric_by_entity() {
    census_tables()
        .args([
            "rank",
            "-i",
            &fixture_arg(),
            "--by",
            "NOM_TERR",
            "--metric",
            "GAL_TOTAL",
            "-n",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("top").and(contains("Paraná")))
        .stdout(contains("bottom").and(contains("Amazonas")));
}

#[test]
fn rank_filters_by_region() {
    let assert = census_tables()
        .args([
            "rank",
            "-i",
            &fixture_arg(),
            "--by",
            "NOM_TERR",
            "--metric",
            "GAL_TOTAL",
            "--region",
            "sul",
            "--json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(json["top"][0]["entity"], "Paraná");
    assert_eq!(json["top"][1]["entity"], "Rio Grande do Sul");
    assert_eq!(json["middle"], serde_json::json!([]));
    assert_eq!(json["bottom"], serde_json::json!([]));
}

#[test]
fn correlate_lists_pairs_with_descriptions() {
    census_tables()
        .args([
            "correlate",
            "-i",
            &fixture_arg(),
            "-C",
            "GAL_TOTAL,N_TRAB_TOTAL",
        ])
        .assert()
        .success()
        .stdout(contains("Total efetivo de galinhas").and(contains("Total de trabalhadores")));
}

#[test]
fn unknown_column_reports_error() {
    census_tables()
        .args(["porte", "-i", &fixture_arg(), "--column", "NOPE"])
        .assert()
        .failure()
        .stderr(contains("error:").and(contains("NOPE")));
}

#[test]
fn unsupported_config_version_fails() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("census.yml", "version: 7\n");
    census_tables()
        .args([
            "--config",
            config.to_str().unwrap(),
            "clean",
            "-i",
            &fixture_arg(),
        ])
        .assert()
        .failure()
        .stderr(contains("unsupported configuration version 7"));
}

#[test]
fn malformed_rows_fail_with_row_number() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_latin1("ragged.csv", "UF;VALOR\nSP;1\nMG\n");
    census_tables()
        .args(["clean", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Row 3 has 1 field(s)"));
}

#[test]
fn latin_1_label_is_accepted_on_the_command_line() {
    census_tables()
        .args([
            "clean",
            "-i",
            &fixture_arg(),
            "--input-encoding",
            "latin-1",
            "--preview",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("São Paulo"));
}

#[test]
fn rank_rejects_mean_of_row_counts() {
    census_tables()
        .args(["rank", "-i", &fixture_arg(), "--by", "NOM_TERR", "--mean"])
        .assert()
        .failure()
        .stderr(contains("--mean needs a numeric --metric column"));
}

#[test]
fn rank_mean_averages_metric() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("mean.csv", "UF;VALOR\nSP;10\nSP;20\nMG;12\n");
    let assert = census_tables()
        .args([
            "rank",
            "-i",
            input.to_str().unwrap(),
            "--by",
            "UF",
            "--metric",
            "VALOR",
            "--mean",
            "-n",
            "1",
            "--json",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(json["top"][0]["entity"], "SP");
    assert_eq!(json["top"][0]["value"], 15.0);
}

#[test]
fn clean_output_survives_reingestion() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("precise.csv", "UF;VALOR\nSP;1.234,5678\nMG;0,5\n");
    let first = workspace.path().join("first.csv");
    census_tables()
        .args([
            "clean",
            "-i",
            input.to_str().unwrap(),
            "-o",
            first.to_str().unwrap(),
            "--input-encoding",
            "utf-8",
        ])
        .assert()
        .success();
    let written = std::fs::read_to_string(&first).expect("read output");
    assert!(written.contains("SP;1234.57"), "{written}");

    census_tables()
        .args([
            "clean",
            "-i",
            first.to_str().unwrap(),
            "--input-encoding",
            "utf-8",
        ])
        .assert()
        .success()
        .stdout(contains("SP;1234.57").and(contains("MG;0.5")));
}

mod common;

use std::fs;

use assert_cmd::Command;
use csv_valuetypes::store::ColumnDefinitions;
use predicates::str::contains;

use common::{MIXED_CSV, TestWorkspace};

fn bin() -> Command {
    Command::cargo_bin("csv-valuetypes").expect("binary exists")
}

fn guess_into(workspace: &TestWorkspace) -> std::path::PathBuf {
    let input = workspace.write("mixed.csv", MIXED_CSV);
    let defs = workspace.file("defs.yml");
    bin()
        .args([
            "guess",
            "-i",
            input.to_str().unwrap(),
            "-o",
            defs.to_str().unwrap(),
        ])
        .assert()
        .success();
    defs
}

#[test]
fn types_lists_builtins_by_name() {
    bin()
        .arg("types")
        .assert()
        .success()
        .stdout(contains("categorical"))
        .stdout(contains("Float"))
        .stdout(contains("100"));
}

#[test]
fn types_renders_picker_markup() {
    bin()
        .args(["types", "--html", "--current", "matrix"])
        .assert()
        .success()
        .stdout(contains("<option value=\"matrix\" selected=\"selected\">Matrix</option>"))
        .stdout(contains("<option value=\"\"></option>"));
}

#[test]
fn guess_prints_types_and_writes_definitions() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("mixed.csv", MIXED_CSV);
    let defs = workspace.file("defs.yml");
    bin()
        .args([
            "guess",
            "-i",
            input.to_str().unwrap(),
            "-o",
            defs.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("column"))
        .stdout(contains("vector"));

    let definitions = ColumnDefinitions::load(&defs).expect("load definitions");
    let types = definitions
        .columns
        .iter()
        .map(|c| c.definition.type_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(types, vec!["real", "real", "categorical", "string", "matrix"]);
    let score = definitions.column("score").expect("score");
    assert_eq!(
        score.definition.numerical_options().and_then(|o| o.range),
        Some([0.5, 9.0])
    );
    let vector = definitions.column("vector").expect("vector");
    assert_eq!(
        vector.definition.matrix_options().and_then(|o| o.data_length),
        Some(3)
    );
}

#[test]
fn threshold_flag_changes_the_guess() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("mixed.csv", MIXED_CSV);
    let defs = workspace.file("defs.yml");
    bin()
        .args([
            "guess",
            "-i",
            input.to_str().unwrap(),
            "-o",
            defs.to_str().unwrap(),
            "--threshold",
            "categorical=0.9",
        ])
        .assert()
        .success();
    let definitions = ColumnDefinitions::load(&defs).expect("load definitions");
    assert_eq!(
        definitions.column("group").expect("group").definition.type_id,
        "string"
    );
}

#[test]
fn validate_reports_and_strict_fails_on_invalid_rows() {
    let workspace = TestWorkspace::new();
    let defs = guess_into(&workspace);
    let changed = workspace.write(
        "changed.csv",
        "id,score,group,label,vector\n1,2,a,x,\"[1]\"\n2,oops,c,y,\"[2]\"\n",
    );

    bin()
        .args([
            "validate",
            "-i",
            changed.to_str().unwrap(),
            "-d",
            defs.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("group invalid: 1: 'c'"))
        .stdout(contains("score invalid: 1: 'oops'"));

    bin()
        .args([
            "validate",
            "-i",
            changed.to_str().unwrap(),
            "-d",
            defs.to_str().unwrap(),
            "--strict",
        ])
        .assert()
        .failure()
        .stderr(contains("2 invalid row(s)"));
}

#[test]
fn validate_fails_when_a_column_is_missing() {
    let workspace = TestWorkspace::new();
    let defs = guess_into(&workspace);
    let narrow = workspace.write("narrow.csv", "id\n1\n");
    bin()
        .args([
            "validate",
            "-i",
            narrow.to_str().unwrap(),
            "-d",
            defs.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("column 'score' is not present"));
}

#[test]
fn edit_updates_numerical_range_from_stdin() {
    let workspace = TestWorkspace::new();
    let defs = guess_into(&workspace);
    bin()
        .args(["edit", "-d", defs.to_str().unwrap(), "-c", "score"])
        .write_stdin("-5\n5\n")
        .assert()
        .success()
        .stdout(contains("Edit Numerical Range"));
    let definitions = ColumnDefinitions::load(&defs).expect("load definitions");
    let score = definitions.column("score").expect("score");
    assert_eq!(
        score.definition.numerical_options().and_then(|o| o.range),
        Some([-5.0, 5.0])
    );
}

#[test]
fn edit_can_switch_type_and_cancel_keeps_file() {
    let workspace = TestWorkspace::new();
    let defs = guess_into(&workspace);
    let before = fs::read_to_string(&defs).expect("read definitions");

    bin()
        .args(["edit", "-d", defs.to_str().unwrap(), "-c", "label"])
        .write_stdin("q\n")
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&defs).expect("read definitions"), before);

    bin()
        .args([
            "edit",
            "-d",
            defs.to_str().unwrap(),
            "-c",
            "label",
            "--type",
            "categorical",
        ])
        .write_stdin("low\tred\nhigh\n.\n")
        .assert()
        .success();
    let definitions = ColumnDefinitions::load(&defs).expect("load definitions");
    let label = &definitions.column("label").expect("label").definition;
    assert_eq!(label.type_id, "categorical");
    let names = label
        .categorical_options()
        .and_then(|o| o.categories.as_ref())
        .map(|categories| categories.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
    assert_eq!(names, Some(vec!["low".to_string(), "high".to_string()]));
}

#[test]
fn unknown_edit_column_is_an_error() {
    let workspace = TestWorkspace::new();
    let defs = guess_into(&workspace);
    bin()
        .args(["edit", "-d", defs.to_str().unwrap(), "-c", "nope"])
        .assert()
        .failure()
        .stderr(contains("Column 'nope' not found"));
}

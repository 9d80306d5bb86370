use std::path::Path;
use std::process::{Command, Output};

fn aldoc_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_aldoc"));
    cmd.current_dir(dir);
    cmd.env_remove("ALDOC_LOG");
    cmd
}

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn run(dir: &Path, args: &[&str]) -> Output {
    aldoc_cmd(dir).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn check_reports_incomplete_documentation() {
    let check = run(&fixture("basic"), &["check"]);
    assert_eq!(check.status.code(), Some(1), "stderr: {}", stderr(&check));
    assert_eq!(
        stdout(&check),
        "\
src/Sales.Codeunit.al:1:1: information[DOC0001] Documentation for codeunit 'Sales Mgt.' is missing.
src/Sales.Codeunit.al:5:5: information[DOC0010,DOC0020,DOC0030,DOC0021] Documentation for procedure 'Post' is incomplete: summary missing, parameter 'Qty' missing, return value missing, parameter 'Old' unnecessary.
src/Sales.Codeunit.al:10:5: information[DOC0010] Documentation for procedure 'Reset' is incomplete: summary missing.
"
    );
    assert!(stderr(&check).contains("3 findings in 1 files"));
}

#[test]
fn check_json_output() {
    let check = run(&fixture("basic"), &["check", "--format", "json"]);
    assert_eq!(check.status.code(), Some(1));

    let findings: serde_json::Value = serde_json::from_str(&stdout(&check)).unwrap();
    let findings = findings.as_array().unwrap();
    assert_eq!(findings.len(), 3);
    assert_eq!(findings[0]["target"], "Object");
    assert_eq!(findings[0]["missing"][0], "DocumentationMissing");
    assert_eq!(findings[1]["name"], "Post");
    assert_eq!(findings[1]["missing"][1]["ParameterMissing"], "Qty");
    assert_eq!(findings[1]["missing"][3]["ParameterUnnecessary"], "Old");
    assert_eq!(findings[1]["severity"], "information");
    assert_eq!(findings[2]["range"]["start"]["line"], 9);
}

#[test]
fn check_markdown_output() {
    let check = run(&fixture("basic"), &["check", "--format", "markdown"]);
    let out = stdout(&check);
    assert!(out.starts_with("## src/Sales.Codeunit.al\n\n"));
    assert!(out.contains("- line 10: `DOC0010` Documentation for procedure 'Reset' is incomplete: summary missing."));
}

#[test]
fn clean_workspace_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.json"), "{}").unwrap();
    std::fs::write(
        dir.path().join("Done.al"),
        "/// <summary>Done.</summary>\ncodeunit 1 Done\n{\n    /// <summary>Runs.</summary>\n    procedure Run()\n    begin\n    end;\n}\n",
    )
    .unwrap();

    let check = run(dir.path(), &["check"]);
    assert!(check.status.success(), "stdout: {}", stdout(&check));
    assert!(stdout(&check).is_empty());
    assert!(stderr(&check).contains("All 1 objects documented"));
}

#[test]
fn byte_order_mark_prose_and_wrapped_attribute_are_clean() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.json"), "{}").unwrap();
    std::fs::write(
        dir.path().join("Sub.al"),
        "\u{feff}/// <summary>Posts A & B when A < B.</summary>\ncodeunit 2 Sub\n{\n    /// <summary>Reacts.</summary>\n    [EventSubscriber(ObjectType::Codeunit, Codeunit::\"Sales-Post\",\n        'OnAfterPost', '', false, false)]\n    local procedure OnAfterPost()\n    begin\n    end;\n}\n",
    )
    .unwrap();

    let check = run(dir.path(), &["check"]);
    assert!(check.status.success(), "stdout: {}", stdout(&check));
    assert!(stderr(&check).contains("All 1 objects documented"));
}

#[test]
fn config_changes_severity_and_scope() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".aldoc.toml"),
        "severity = \"warning\"\ncheck_object_documentation = false\naccess_levels = [\"Public\"]\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("A.al"),
        "codeunit 1 A\n{\n    procedure Open()\n    begin\n    end;\n\n    local procedure Hidden()\n    begin\n    end;\n}\n",
    )
    .unwrap();

    let check = run(dir.path(), &["check"]);
    assert_eq!(check.status.code(), Some(1));
    assert_eq!(
        stdout(&check),
        "A.al:3:5: warning[DOC0001] Documentation for procedure 'Open' is missing.\n"
    );
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".aldoc.toml"), "severity = [").unwrap();

    let check = run(dir.path(), &["check"]);
    assert_eq!(check.status.code(), Some(2));
    assert!(stderr(&check).contains("# Error: Invalid TOML"));
}

#[test]
fn show_prints_the_model() {
    let show = run(&fixture("basic"), &["show", "src/Sales.Codeunit.al"]);
    assert!(show.status.success(), "stderr: {}", stderr(&show));
    assert_eq!(
        stdout(&show),
        "\
codeunit 50100 \"Sales Mgt.\" (line 1) undocumented
  procedure Post (line 5) documented
    param Qty: Decimal undocumented
    returns Boolean undocumented
  procedure Reset (line 10) documented
"
    );

    let json = run(&fixture("basic"), &["show", "src/Sales.Codeunit.al", "--json"]);
    let object: serde_json::Value = serde_json::from_str(&stdout(&json)).unwrap();
    assert_eq!(object["name"], "Sales Mgt.");
    assert_eq!(object["id"], 50100);
    assert_eq!(object["procedures"].as_array().unwrap().len(), 2);
}

#[test]
fn synth_from_cursor_line() {
    let synth = run(&fixture("basic"), &["synth", "src/Sales.Codeunit.al", "9"]);
    assert!(synth.status.success(), "stderr: {}", stderr(&synth));
    assert_eq!(stdout(&synth), "    /// <summary>\n    /// ${1:Reset.}\n    /// </summary>\n");
}

#[test]
fn synth_from_header_line() {
    let synth = run(&fixture("basic"), &["synth", "src/Sales.Codeunit.al", "5"]);
    assert!(synth.status.success());
    assert_eq!(
        stdout(&synth),
        "    /// <summary>\n    /// ${1:Post.}\n    /// </summary>\n    /// <param name=\"Qty\">${2:Decimal.}</param>\n    /// <returns>${3:Return value of type Boolean.}</returns>\n"
    );
}

#[test]
fn synth_on_body_line_is_an_error() {
    let synth = run(&fixture("basic"), &["synth", "src/Sales.Codeunit.al", "6"]);
    assert_eq!(synth.status.code(), Some(2));
    assert!(stderr(&synth).contains("# Error: No Declaration"));
}

#[test]
fn hover_follows_inheritdoc() {
    let hover = run(&fixture("basic"), &["hover", "src/Cash.Codeunit.al", "7"]);
    assert!(hover.status.success(), "stderr: {}", stderr(&hover));
    let out = stdout(&hover);
    assert!(out.starts_with("<!-- inherited from IPayment.Pay (src/IPayment.Interface.al:11) -->\n"));
    assert!(out.contains("Pays the amount."));
}

#[test]
fn definition_points_at_interface_procedure() {
    let definition = run(&fixture("basic"), &["definition", "src/Cash.Codeunit.al", "6"]);
    assert!(definition.status.success(), "stderr: {}", stderr(&definition));
    assert!(stdout(&definition).trim_end().ends_with("src/IPayment.Interface.al:11"));

    let plain = run(&fixture("basic"), &["definition", "src/Sales.Codeunit.al", "5"]);
    assert_eq!(plain.status.code(), Some(1));
}

#[test]
fn missing_file_is_reported() {
    let show = run(&fixture("basic"), &["show", "src/Nope.al"]);
    assert_eq!(show.status.code(), Some(2));
    assert!(stderr(&show).contains("# Error: File Not Found"));
}
